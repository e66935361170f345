use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ACTIVITY: &str = "LinkedIn Stuff";
pub const DEFAULT_HOURS: f64 = 2.0;
pub const DEFAULT_MAX_HOURS: f64 = 12.0;
pub const MAX_HOURS_PER_DAY: f64 = 24.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub activity: String,
    pub hours: f64,
}

impl TimeEntry {
    pub fn new(activity: impl Into<String>, hours: f64) -> Self {
        Self {
            activity: activity.into(),
            hours,
        }
    }
}

/// Sparse per-day log keyed by `YYYY-MM-DD`. A missing key means zero hours;
/// zero-hour entries are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeEntries(BTreeMap<String, TimeEntry>);

impl TimeEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&TimeEntry> {
        self.0.get(&date_key(date))
    }

    pub fn hours_on(&self, date: NaiveDate) -> f64 {
        self.get(date).map(|entry| entry.hours).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TimeEntry)> {
        self.0.iter()
    }

    /// Entries whose key starts with the month's `YYYY-MM` prefix, in key order.
    pub fn in_month(&self, month: NaiveDate) -> impl Iterator<Item = (&String, &TimeEntry)> {
        let prefix = month_key(month);
        self.0
            .iter()
            .filter(move |(key, _)| key.starts_with(&prefix))
    }

    pub fn total_for_month(&self, month: NaiveDate) -> f64 {
        self.in_month(month).map(|(_, entry)| entry.hours).sum()
    }

    /// Returns the map with `entry` stored for `date`; zero hours removes the key.
    pub fn with_saved(&self, date: NaiveDate, entry: TimeEntry) -> Self {
        let mut next = self.clone();
        let key = date_key(date);
        if entry.hours == 0.0 {
            next.0.remove(&key);
        } else {
            next.0.insert(key, entry);
        }
        next
    }

    pub fn without(&self, date: NaiveDate) -> Self {
        let mut next = self.clone();
        next.0.remove(&date_key(date));
        next
    }

    /// Drops any zero-hour keys that may have come from an older document.
    pub fn compact(mut self) -> Self {
        self.0.retain(|_, entry| entry.hours != 0.0);
        self
    }
}

impl FromIterator<(String, TimeEntry)> for TimeEntries {
    fn from_iter<I: IntoIterator<Item = (String, TimeEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// User-editable timesheet settings, shared by every month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthConfig {
    pub activities: Vec<String>,
    pub max_hours: f64,
}

impl Default for MonthConfig {
    fn default() -> Self {
        Self {
            activities: vec![DEFAULT_ACTIVITY.to_string(), "Paid Vacation".to_string()],
            max_hours: DEFAULT_MAX_HOURS,
        }
    }
}

impl MonthConfig {
    /// Appends `name` unless an identical activity already exists.
    pub fn add_activity(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.activities.iter().any(|a| a == name) {
            return false;
        }
        self.activities.push(name.to_string());
        true
    }

    pub fn remove_activity(&mut self, name: &str) -> bool {
        let before = self.activities.len();
        self.activities.retain(|a| a != name.trim());
        before != self.activities.len()
    }

    pub fn has_activity(&self, name: &str) -> bool {
        self.activities.iter().any(|a| a == name)
    }

    pub fn default_activity(&self) -> &str {
        if self.has_activity(DEFAULT_ACTIVITY) {
            DEFAULT_ACTIVITY
        } else {
            self.activities
                .first()
                .map(String::as_str)
                .unwrap_or(DEFAULT_ACTIVITY)
        }
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn month_key(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn zero_hours_removes_the_key() {
        let entries = TimeEntries::new().with_saved(ymd(2024, 5, 6), TimeEntry::new("LinkedIn Stuff", 3.5));
        assert_eq!(entries.hours_on(ymd(2024, 5, 6)), 3.5);

        let cleared = entries.with_saved(ymd(2024, 5, 6), TimeEntry::new("", 0.0));
        assert!(cleared.is_empty());
        assert_eq!(cleared.hours_on(ymd(2024, 5, 6)), 0.0);
    }

    #[test]
    fn month_total_ignores_other_months() {
        let entries = TimeEntries::new()
            .with_saved(ymd(2024, 4, 30), TimeEntry::new("a", 8.0))
            .with_saved(ymd(2024, 5, 1), TimeEntry::new("a", 2.0))
            .with_saved(ymd(2024, 5, 31), TimeEntry::new("b", 1.5))
            .with_saved(ymd(2025, 5, 2), TimeEntry::new("a", 4.0));

        assert_eq!(entries.total_for_month(ymd(2024, 5, 20)), 3.5);
        let keys: Vec<_> = entries.in_month(ymd(2024, 5, 1)).map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["2024-05-01", "2024-05-31"]);
    }

    #[test]
    fn serializes_as_plain_map() {
        let entries = TimeEntries::new().with_saved(ymd(2024, 5, 6), TimeEntry::new("Paid Vacation", 2.0));
        let json = serde_json::to_string(&entries).expect("serialize");
        assert_eq!(json, r#"{"2024-05-06":{"activity":"Paid Vacation","hours":2.0}}"#);
    }

    #[test]
    fn compact_drops_zero_entries() {
        let entries: TimeEntries = [
            ("2024-05-01".to_string(), TimeEntry::new("a", 0.0)),
            ("2024-05-02".to_string(), TimeEntry::new("a", 1.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(entries.compact().len(), 1);
    }

    #[test]
    fn activities_stay_distinct() {
        let mut config = MonthConfig::default();
        assert_eq!(config.max_hours, 12.0);
        assert!(!config.add_activity("Paid Vacation"));
        assert!(config.add_activity(" Training "));
        assert_eq!(config.activities.len(), 3);
        assert!(config.remove_activity("LinkedIn Stuff"));
        assert_eq!(config.default_activity(), "Paid Vacation");

        let json = serde_json::to_string(&config).expect("serialize");
        assert!(json.contains("\"maxHours\":12.0"));
    }
}
