//! Monthly hour accounting and the save-time limit check.

use std::collections::BTreeMap;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::calendar::{days_in_month, days_of_month, first_day_of_month, is_weekend};
use crate::timesheet::{MAX_HOURS_PER_DAY, MonthConfig, TimeEntries, TimeEntry};

pub const DEFAULT_PER_WEEKDAY_HOURS: f64 = 2.0;

/// How saves are capped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitPolicy {
    /// Each entry is capped by `MonthConfig::max_hours`; no monthly total.
    PerEntry,
    /// The month may hold `weekdays * per_weekday_hours` in total.
    MonthlyCap { per_weekday_hours: f64 },
}

impl Default for LimitPolicy {
    fn default() -> Self {
        LimitPolicy::MonthlyCap {
            per_weekday_hours: DEFAULT_PER_WEEKDAY_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub month: NaiveDate,
    pub total_hours: f64,
    pub weekday_count: u32,
    /// `None` under [`LimitPolicy::PerEntry`].
    pub monthly_limit: Option<f64>,
    pub average_per_day: f64,
    pub per_day: BTreeMap<NaiveDate, f64>,
}

impl MonthSummary {
    pub fn remaining(&self) -> Option<f64> {
        self.monthly_limit.map(|limit| limit - self.total_hours)
    }
}

/// Saturday and Sunday are excluded; holidays still count.
pub fn weekday_count(month: NaiveDate) -> u32 {
    days_of_month(month).filter(|day| !is_weekend(*day)).count() as u32
}

pub fn monthly_limit(month: NaiveDate, policy: LimitPolicy) -> Option<f64> {
    match policy {
        LimitPolicy::PerEntry => None,
        LimitPolicy::MonthlyCap { per_weekday_hours } => {
            Some(weekday_count(month) as f64 * per_weekday_hours)
        }
    }
}

pub fn compute_month_summary(
    entries: &TimeEntries,
    month: NaiveDate,
    policy: LimitPolicy,
) -> MonthSummary {
    let month = first_day_of_month(month.year(), month.month());
    let total_hours = entries.total_for_month(month);
    let per_day: BTreeMap<NaiveDate, f64> = days_of_month(month)
        .filter_map(|day| entries.get(day).map(|entry| (day, entry.hours)))
        .collect();
    let days = days_in_month(month.year(), month.month());
    let average_per_day = if days > 0 {
        total_hours / days as f64
    } else {
        0.0
    };

    MonthSummary {
        month,
        total_hours,
        weekday_count: weekday_count(month),
        monthly_limit: monthly_limit(month, policy),
        average_per_day,
        per_day,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitViolation {
    MonthlyCap,
    PerEntryCap,
}

/// Result of checking a prospective save. Not an error: the caller decides
/// whether to persist based on `allowed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveCheck {
    pub allowed: bool,
    pub hours_after_save: f64,
    pub limit: Option<f64>,
    pub violation: Option<LimitViolation>,
}

/// Checks whether setting `date` to `new_hours` is allowed.
///
/// Zero always passes (it is a delete). Any other value above `maxHours` is
/// refused under both policies. Under the monthly cap only increases that end
/// above the limit are blocked, so reductions on an over-cap month still go
/// through.
pub fn check_save(
    entries: &TimeEntries,
    date: NaiveDate,
    new_hours: f64,
    policy: LimitPolicy,
    config: &MonthConfig,
) -> SaveCheck {
    let current = entries.hours_on(date);
    let total = entries.total_for_month(date);
    let hours_after_save = total - current + new_hours;

    if new_hours == 0.0 {
        return SaveCheck {
            allowed: true,
            hours_after_save,
            limit: monthly_limit(date, policy),
            violation: None,
        };
    }

    if new_hours > config.max_hours {
        return SaveCheck {
            allowed: false,
            hours_after_save,
            limit: Some(config.max_hours),
            violation: Some(LimitViolation::PerEntryCap),
        };
    }

    match policy {
        LimitPolicy::PerEntry => SaveCheck {
            allowed: true,
            hours_after_save,
            limit: Some(config.max_hours),
            violation: None,
        },
        LimitPolicy::MonthlyCap { .. } => {
            let limit = monthly_limit(date, policy);
            let over = limit.is_some_and(|limit| hours_after_save > limit) && new_hours > current;
            SaveCheck {
                allowed: !over,
                hours_after_save,
                limit,
                violation: over.then_some(LimitViolation::MonthlyCap),
            }
        }
    }
}

/// Outcome of [`plan_save`]: the check plus the map to persist when allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePlan {
    pub check: SaveCheck,
    pub next: Option<TimeEntries>,
}

/// Runs the single-day state machine: absent/present -> present on an allowed
/// positive save, -> absent on zero, unchanged on a rejected save.
pub fn plan_save(
    entries: &TimeEntries,
    date: NaiveDate,
    entry: TimeEntry,
    policy: LimitPolicy,
    config: &MonthConfig,
) -> anyhow::Result<SavePlan> {
    if !entry.hours.is_finite() || entry.hours < 0.0 || entry.hours > MAX_HOURS_PER_DAY {
        return Err(anyhow!(
            "hours must be between 0 and {MAX_HOURS_PER_DAY}, got {}",
            entry.hours
        ));
    }

    let check = check_save(entries, date, entry.hours, policy, config);
    if !check.allowed {
        info!(
            %date,
            hours = entry.hours,
            hours_after_save = check.hours_after_save,
            limit = ?check.limit,
            violation = ?check.violation,
            "save rejected by hour limit"
        );
        return Ok(SavePlan { check, next: None });
    }

    debug!(%date, hours = entry.hours, hours_after_save = check.hours_after_save, "save allowed");
    Ok(SavePlan {
        check,
        next: Some(entries.with_saved(date, entry)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    const CAP: LimitPolicy = LimitPolicy::MonthlyCap { per_weekday_hours: 2.0 };

    /// Twenty days of 2 hours in May 2024 (23 weekdays, limit 46).
    fn forty_hours_in_may() -> TimeEntries {
        (1..=20)
            .map(|day| (format!("2024-05-{day:02}"), TimeEntry::new("LinkedIn Stuff", 2.0)))
            .collect()
    }

    #[test]
    fn twenty_two_weekdays_give_limit_44() {
        // April 2024 has 22 weekdays.
        let summary = compute_month_summary(&TimeEntries::new(), ymd(2024, 4, 10), CAP);
        assert_eq!(summary.weekday_count, 22);
        assert_eq!(summary.monthly_limit, Some(44.0));
        assert_eq!(summary.total_hours, 0.0);
        assert_eq!(summary.average_per_day, 0.0);
    }

    #[test]
    fn holidays_do_not_reduce_weekdays() {
        // May 2024 has May 1, May 3 and May 30 as weekday holidays.
        assert_eq!(weekday_count(ymd(2024, 5, 1)), 23);
    }

    #[test]
    fn totals_only_count_the_target_month() {
        let entries = forty_hours_in_may()
            .with_saved(ymd(2024, 4, 30), TimeEntry::new("x", 7.0))
            .with_saved(ymd(2024, 6, 1), TimeEntry::new("x", 5.0));
        let summary = compute_month_summary(&entries, ymd(2024, 5, 31), CAP);
        assert_eq!(summary.total_hours, 40.0);
        assert_eq!(summary.per_day.len(), 20);
        assert_eq!(summary.month, ymd(2024, 5, 1));
        assert!((summary.average_per_day - 40.0 / 31.0).abs() < 1e-9);
        assert_eq!(summary.remaining(), Some(6.0));
    }

    #[test]
    fn increase_past_limit_is_rejected() {
        // April: limit 44; 40 hours logged on 20 days.
        let entries: TimeEntries = (1..=20)
            .map(|day| (format!("2024-04-{day:02}"), TimeEntry::new("a", 2.0)))
            .collect();
        let config = MonthConfig::default();

        let check = check_save(&entries, ymd(2024, 4, 25), 6.0, CAP, &config);
        assert!(!check.allowed);
        assert_eq!(check.hours_after_save, 46.0);
        assert_eq!(check.limit, Some(44.0));
        assert_eq!(check.violation, Some(LimitViolation::MonthlyCap));

        let check = check_save(&entries, ymd(2024, 4, 25), 4.0, CAP, &config);
        assert!(check.allowed);
        assert_eq!(check.hours_after_save, 44.0);
    }

    #[test]
    fn decrease_is_allowed_even_over_cap() {
        let entries: TimeEntries = (1..=23)
            .map(|day| (format!("2024-04-{day:02}"), TimeEntry::new("a", 4.0)))
            .collect();
        let config = MonthConfig::default();

        let check = check_save(&entries, ymd(2024, 4, 2), 2.0, CAP, &config);
        assert!(check.allowed);
        assert_eq!(check.hours_after_save, 90.0);

        let same = check_save(&entries, ymd(2024, 4, 2), 4.0, CAP, &config);
        assert!(same.allowed);
    }

    #[test]
    fn zero_bypasses_the_cap() {
        let entries: TimeEntries = (1..=23)
            .map(|day| (format!("2024-04-{day:02}"), TimeEntry::new("a", 4.0)))
            .collect();
        let plan = plan_save(&entries, ymd(2024, 4, 2), TimeEntry::new("", 0.0), CAP, &MonthConfig::default())
            .expect("plan");
        assert!(plan.check.allowed);
        let next = plan.next.expect("persistable");
        assert_eq!(next.len(), 22);
        assert!(next.get(ymd(2024, 4, 2)).is_none());
    }

    #[test]
    fn rejected_save_keeps_prior_state() {
        let entries: TimeEntries = (1..=20)
            .map(|day| (format!("2024-04-{day:02}"), TimeEntry::new("a", 2.0)))
            .collect();
        let plan = plan_save(&entries, ymd(2024, 4, 25), TimeEntry::new("a", 6.0), CAP, &MonthConfig::default())
            .expect("plan");
        assert!(plan.next.is_none());
        assert_eq!(plan.check.hours_after_save, 46.0);
    }

    #[test]
    fn per_entry_policy_caps_single_days_only() {
        let mut config = MonthConfig::default();
        config.max_hours = 8.0;
        let entries = forty_hours_in_may();

        let summary = compute_month_summary(&entries, ymd(2024, 5, 1), LimitPolicy::PerEntry);
        assert_eq!(summary.monthly_limit, None);

        let ok = check_save(&entries, ymd(2024, 5, 21), 8.0, LimitPolicy::PerEntry, &config);
        assert!(ok.allowed);
        assert_eq!(ok.hours_after_save, 48.0);

        let over = check_save(&entries, ymd(2024, 5, 21), 8.5, LimitPolicy::PerEntry, &config);
        assert!(!over.allowed);
        assert_eq!(over.violation, Some(LimitViolation::PerEntryCap));
    }

    #[test]
    fn max_hours_applies_under_the_monthly_cap() {
        let config = MonthConfig {
            max_hours: 4.0,
            ..MonthConfig::default()
        };
        let entries = TimeEntries::new();
        let day = ymd(2024, 5, 6);

        let plan = plan_save(&entries, day, TimeEntry::new("a", 20.0), LimitPolicy::default(), &config).expect("plan");
        assert!(!plan.check.allowed);
        assert!(plan.next.is_none());
        assert_eq!(plan.check.limit, Some(4.0));
        assert_eq!(plan.check.violation, Some(LimitViolation::PerEntryCap));

        let at_cap = check_save(&entries, day, 4.0, LimitPolicy::default(), &config);
        assert!(at_cap.allowed);
        assert_eq!(at_cap.limit, Some(46.0));

        let over_cap_day = entries.with_saved(day, TimeEntry::new("a", 9.0));
        let cleared = check_save(&over_cap_day, day, 0.0, LimitPolicy::default(), &config);
        assert!(cleared.allowed);
        assert_eq!(cleared.violation, None);
    }

    #[test]
    fn out_of_range_hours_are_errors() {
        let config = MonthConfig::default();
        let entries = TimeEntries::new();
        assert!(plan_save(&entries, ymd(2024, 5, 1), TimeEntry::new("a", -1.0), CAP, &config).is_err());
        assert!(plan_save(&entries, ymd(2024, 5, 1), TimeEntry::new("a", 24.5), CAP, &config).is_err());
        assert!(plan_save(&entries, ymd(2024, 5, 1), TimeEntry::new("a", f64::NAN), CAP, &config).is_err());
    }

    #[test]
    fn configurable_cap() {
        let policy = LimitPolicy::MonthlyCap { per_weekday_hours: 3.0 };
        assert_eq!(monthly_limit(ymd(2024, 4, 1), policy), Some(66.0));
    }
}
