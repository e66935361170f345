use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use super::{Snapshot, Subscriber, TimesheetStore, ensure_dir, load_json, save_json_atomic};
use crate::config::StorageBackend;
use crate::linkedin::LinkedInMetrics;
use crate::timesheet::{MonthConfig, TimeEntries};

pub const ENTRIES_FILE: &str = "timesheet.json";
pub const CONFIG_FILE: &str = "timesheet-config.json";
pub const LINKEDIN_FILE: &str = "linkedin.json";

/// One JSON file per collection, overwritten synchronously on every replace.
pub struct LocalStore {
    pub data_dir: PathBuf,
    pub entries_path: PathBuf,
    pub config_path: PathBuf,
    pub linkedin_path: PathBuf,
    snapshot: Snapshot,
    subscribers: Vec<Subscriber>,
    last_error: Option<String>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("data_dir", &self.data_dir)
            .field("entries", &self.snapshot.entries.len())
            .field("linkedin", &self.snapshot.linkedin.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl LocalStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = ensure_dir(data_dir)?;
        let entries_path = data_dir.join(ENTRIES_FILE);
        let config_path = data_dir.join(CONFIG_FILE);
        let linkedin_path = data_dir.join(LINKEDIN_FILE);

        let entries: TimeEntries = load_json(&entries_path)
            .context("failed to load time entries")?
            .unwrap_or_default();
        let config: MonthConfig = load_json(&config_path)
            .context("failed to load timesheet config")?
            .unwrap_or_default();
        let linkedin: LinkedInMetrics = load_json(&linkedin_path)
            .context("failed to load linkedin metrics")?
            .unwrap_or_default();

        info!(
            data_dir = %data_dir.display(),
            entries = entries.len(),
            activities = config.activities.len(),
            linkedin_weeks = linkedin.len(),
            "opened local store"
        );

        Ok(Self {
            data_dir,
            entries_path,
            config_path,
            linkedin_path,
            snapshot: Snapshot {
                entries: entries.compact(),
                config,
                linkedin,
            },
            subscribers: vec![],
            last_error: None,
        })
    }

    fn record<T>(&mut self, result: anyhow::Result<T>) -> anyhow::Result<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "local write failed");
                self.last_error = Some(format!("{err:#}"));
                Err(err)
            }
        }
    }
}

impl TimesheetStore for LocalStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }

    fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn subscribe(&mut self, mut on_change: Subscriber) {
        on_change(&self.snapshot);
        self.subscribers.push(on_change);
    }

    fn refresh(&mut self) -> anyhow::Result<bool> {
        Ok(false)
    }

    #[tracing::instrument(skip(self, entries), fields(count = entries.len()))]
    fn replace_entries(&mut self, entries: TimeEntries) -> anyhow::Result<()> {
        let result = save_json_atomic(&self.entries_path, &entries).context("failed to save time entries");
        self.record(result)?;
        self.snapshot.entries = entries;
        Ok(())
    }

    #[tracing::instrument(skip(self, metrics), fields(count = metrics.len()))]
    fn replace_linkedin_metrics(&mut self, metrics: LinkedInMetrics) -> anyhow::Result<()> {
        let result = save_json_atomic(&self.linkedin_path, &metrics).context("failed to save linkedin metrics");
        self.record(result)?;
        self.snapshot.linkedin = metrics;
        Ok(())
    }

    #[tracing::instrument(skip(self, config))]
    fn replace_config(&mut self, config: MonthConfig) -> anyhow::Result<()> {
        let result = save_json_atomic(&self.config_path, &config).context("failed to save timesheet config");
        self.record(result)?;
        self.snapshot.config = config;
        Ok(())
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
