use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::timesheet::{TimeEntries, month_key};

pub const CSV_HEADER: &str = "Date,Activity,Hours";

/// CSV for one month: header plus one row per stored day in key order.
///
/// Fields are joined with commas as-is; an activity containing a comma will
/// shift the columns of its row.
pub fn month_csv(entries: &TimeEntries, month: NaiveDate) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    lines.extend(
        entries
            .in_month(month)
            .map(|(date, entry)| format!("{},{},{}", date, entry.activity, entry.hours)),
    );
    debug!(month = %month_key(month), rows = lines.len() - 1, "rendered csv");
    lines.join("\n")
}

pub fn csv_file_name(month: NaiveDate) -> String {
    format!("timesheet-{}.csv", month_key(month))
}

/// Writes the month's CSV to `path`, or to `dir/timesheet-YYYY-MM.csv` when
/// `path` is a directory.
#[tracing::instrument(skip(entries))]
pub fn write_month_csv(
    entries: &TimeEntries,
    month: NaiveDate,
    path: &Path,
) -> anyhow::Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(csv_file_name(month))
    } else {
        path.to_path_buf()
    };
    fs::write(&target, month_csv(entries, month))
        .with_context(|| format!("failed writing {}", target.display()))?;
    info!(file = %target.display(), "exported timesheet csv");
    Ok(target)
}
