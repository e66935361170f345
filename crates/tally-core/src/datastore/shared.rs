use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Snapshot, Subscriber, TimesheetStore, ensure_dir, load_json, notify, save_json_atomic};
use crate::config::StorageBackend;
use crate::linkedin::LinkedInMetrics;
use crate::timesheet::{MonthConfig, TimeEntries};

pub const COLLECTION: &str = "timesheets";
pub const DOCUMENT_ID: &str = "shared-timesheet";
pub const DEFAULT_DOCUMENT_FILE: &str = "shared-timesheet.json";

/// The shared document as stored: `timeData`, `linkedInData`, `config`,
/// `lastUpdated`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDocument {
    #[serde(default)]
    pub time_data: TimeEntries,
    #[serde(default)]
    pub linked_in_data: LinkedInMetrics,
    #[serde(default)]
    pub config: MonthConfig,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl SharedDocument {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.time_data.clone().compact(),
            config: self.config.clone(),
            linkedin: self.linked_in_data.clone(),
        }
    }
}

/// A single document shared between clients.
///
/// Every replace re-reads the document, swaps one field and writes the
/// whole document back with a fresh `lastUpdated`; there is no merge and
/// no version check, so concurrent writers race and the last one wins.
/// The in-memory mirror is updated before the write and is not rolled back
/// when the write fails; [`TimesheetStore::refresh`] brings it back in line
/// with the document.
///
/// A document that no longer parses blocks every replace, since the read
/// half of the cycle fails first. Writes resume once the file is fixed or
/// removed; removing it starts a fresh document from the next replace.
pub struct SharedDocumentStore {
    pub path: PathBuf,
    snapshot: Snapshot,
    seen_revision: Option<DateTime<Utc>>,
    subscribers: Vec<Subscriber>,
    last_error: Option<String>,
}

impl std::fmt::Debug for SharedDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDocumentStore")
            .field("path", &self.path)
            .field("seen_revision", &self.seen_revision)
            .field("subscribers", &self.subscribers.len())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl SharedDocumentStore {
    /// Opens the document at `path`. A missing document reads as empty; an
    /// unreadable one is reported through `last_error` rather than failing.
    #[tracing::instrument(skip(path))]
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }

        let mut store = Self {
            path: path.to_path_buf(),
            snapshot: Snapshot::default(),
            seen_revision: None,
            subscribers: vec![],
            last_error: None,
        };

        match store.read_document() {
            Ok(Some(doc)) => {
                store.snapshot = doc.snapshot();
                store.seen_revision = doc.last_updated;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    path = %store.path.display(),
                    error = %format!("{err:#}"),
                    "shared document unreadable; starting empty, fix or remove the file to resume writes"
                );
                store.last_error = Some(format!("{err:#}"));
            }
        }

        info!(
            collection = COLLECTION,
            document = DOCUMENT_ID,
            path = %store.path.display(),
            entries = store.snapshot.entries.len(),
            revision = ?store.seen_revision,
            "opened shared document"
        );
        Ok(store)
    }

    fn read_document(&self) -> anyhow::Result<Option<SharedDocument>> {
        load_json(&self.path).context("failed to read shared document")
    }

    /// Read-modify-write of the whole document.
    fn write_with<F>(&mut self, apply: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut SharedDocument),
    {
        let result = self.read_document().and_then(|doc| {
            let mut doc = doc.unwrap_or_default();
            apply(&mut doc);
            doc.last_updated = Some(Utc::now());
            save_json_atomic(&self.path, &doc).context("failed to write shared document")?;
            Ok(doc)
        });

        match result {
            Ok(doc) => {
                debug!(revision = ?doc.last_updated, "shared document written");
                self.last_error = None;
                self.apply_document(doc);
                Ok(())
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "shared document write failed; an unreadable document must be fixed or removed before writes resume"
                );
                self.last_error = Some(format!("{err:#}"));
                Err(err)
            }
        }
    }

    fn apply_document(&mut self, doc: SharedDocument) {
        self.seen_revision = doc.last_updated;
        self.snapshot = doc.snapshot();
        notify(&mut self.subscribers, &self.snapshot);
    }
}

impl TimesheetStore for SharedDocumentStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Shared
    }

    fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn subscribe(&mut self, mut on_change: Subscriber) {
        on_change(&self.snapshot);
        self.subscribers.push(on_change);
    }

    #[tracing::instrument(skip(self))]
    fn refresh(&mut self) -> anyhow::Result<bool> {
        let doc = match self.read_document() {
            Ok(doc) => doc.unwrap_or_default(),
            Err(err) => {
                self.last_error = Some(format!("{err:#}"));
                return Err(err);
            }
        };

        if doc.last_updated == self.seen_revision && doc.snapshot() == self.snapshot {
            return Ok(false);
        }

        info!(
            previous = ?self.seen_revision,
            current = ?doc.last_updated,
            "shared document changed"
        );
        self.apply_document(doc);
        Ok(true)
    }

    #[tracing::instrument(skip(self, entries), fields(count = entries.len()))]
    fn replace_entries(&mut self, entries: TimeEntries) -> anyhow::Result<()> {
        self.snapshot.entries = entries.clone();
        self.write_with(move |doc| doc.time_data = entries)
    }

    #[tracing::instrument(skip(self, metrics), fields(count = metrics.len()))]
    fn replace_linkedin_metrics(&mut self, metrics: LinkedInMetrics) -> anyhow::Result<()> {
        self.snapshot.linkedin = metrics.clone();
        self.write_with(move |doc| doc.linked_in_data = metrics)
    }

    #[tracing::instrument(skip(self, config))]
    fn replace_config(&mut self, config: MonthConfig) -> anyhow::Result<()> {
        self.snapshot.config = config.clone();
        self.write_with(move |doc| doc.config = config)
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
