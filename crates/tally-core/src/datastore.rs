//! Persistence for time entries, LinkedIn metrics and timesheet settings.
//!
//! Two backends implement [`TimesheetStore`]: [`LocalStore`] keeps one JSON
//! file per collection in the data directory, [`SharedDocumentStore`] keeps
//! everything in a single shared document that several clients write
//! wholesale (last writer wins). The backend is chosen once, in
//! [`open_store`].

mod local;
mod shared;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub use local::LocalStore;
pub use shared::{SharedDocument, SharedDocumentStore};

use crate::config::{Config, StorageBackend};
use crate::linkedin::LinkedInMetrics;
use crate::timesheet::{MonthConfig, TimeEntries};

/// Everything a presentation layer needs from the active backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entries: TimeEntries,
    pub config: MonthConfig,
    pub linkedin: LinkedInMetrics,
}

pub type Subscriber = Box<dyn FnMut(&Snapshot)>;

pub trait TimesheetStore {
    fn backend(&self) -> StorageBackend;

    /// In-memory mirror of the backend.
    fn snapshot(&self) -> &Snapshot;

    /// Registers `on_change` and calls it once with the current snapshot.
    fn subscribe(&mut self, on_change: Subscriber);

    /// Picks up changes written by other clients. Returns whether the
    /// snapshot changed (subscribers have then been notified).
    fn refresh(&mut self) -> anyhow::Result<bool>;

    fn replace_entries(&mut self, entries: TimeEntries) -> anyhow::Result<()>;

    fn replace_linkedin_metrics(&mut self, metrics: LinkedInMetrics) -> anyhow::Result<()>;

    fn replace_config(&mut self, config: MonthConfig) -> anyhow::Result<()>;

    /// Message of the most recent failed read or write, if any.
    fn last_error(&self) -> Option<&str>;
}

/// Opens the backend selected by `storage.backend`.
#[tracing::instrument(skip(cfg, data_dir))]
pub fn open_store(cfg: &Config, data_dir: &Path) -> anyhow::Result<Box<dyn TimesheetStore>> {
    let backend = cfg.storage_backend()?;
    info!(?backend, data_dir = %data_dir.display(), "opening timesheet store");

    match backend {
        StorageBackend::Local => Ok(Box::new(LocalStore::open(data_dir)?)),
        StorageBackend::Shared => {
            let path = cfg
                .shared_document_path()
                .unwrap_or_else(|| data_dir.join(shared::DEFAULT_DOCUMENT_FILE));
            Ok(Box::new(SharedDocumentStore::open(&path)?))
        }
    }
}

fn notify(subscribers: &mut [Subscriber], snapshot: &Snapshot) {
    debug!(subscribers = subscribers.len(), "notifying subscribers");
    for subscriber in subscribers.iter_mut() {
        subscriber(snapshot);
    }
}

#[tracing::instrument(skip(path))]
fn load_json<T>(path: &Path) -> anyhow::Result<Option<T>>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        debug!(file = %path.display(), "json file missing; using defaults");
        return Ok(None);
    }

    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value = serde_json::from_str(&raw).with_context(|| format!("failed parsing {}", path.display()))?;
    Ok(Some(value))
}

#[tracing::instrument(skip(path, value))]
fn save_json_atomic<T>(path: &Path, value: &T) -> anyhow::Result<()>
where
    T: Serialize,
{
    debug!(file = %path.display(), "saving json atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, value)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

fn ensure_dir(dir: &Path) -> anyhow::Result<PathBuf> {
    let dir = dir.to_path_buf();
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}
