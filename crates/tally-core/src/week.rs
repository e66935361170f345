use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;

use crate::calendar::{add_days, start_of_week};

/// ISO week-year and week number, rendered as `YYYY-W` (no zero padding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let week_re = Regex::new(r"^(?P<year>\d{4})-W?(?P<week>\d{1,2})$")
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
        let caps = week_re
            .captures(s.trim())
            .ok_or_else(|| anyhow!("expected week as YYYY-W, got: {s}"))?;
        let year: i32 = caps["year"].parse()?;
        let week: u32 = caps["week"].parse()?;
        let key = Self { year, week };
        if key.monday().is_none() {
            return Err(anyhow!("week {week} does not exist in {year}"));
        }
        Ok(key)
    }
}

/// A Monday..Sunday week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekSpan {
    pub key: WeekKey,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekSpan {
    pub fn containing(date: NaiveDate) -> Self {
        let start = start_of_week(date);
        Self {
            key: WeekKey::of(date),
            start,
            end: add_days(start, 6),
        }
    }

    pub fn from_key(key: WeekKey) -> Option<Self> {
        key.monday().map(Self::containing)
    }

    pub fn previous(&self) -> Self {
        Self::containing(add_days(self.start, -7))
    }

    pub fn next(&self) -> Self {
        Self::containing(add_days(self.start, 7))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.contains(today)
    }

    /// `3-9 Jun` inside one month, `30 Jun - 6 Jul` across two.
    pub fn label(&self) -> String {
        if self.start.month() == self.end.month() {
            format!(
                "{}-{} {}",
                self.start.day(),
                self.end.day(),
                self.start.format("%b")
            )
        } else {
            format!(
                "{} {} - {} {}",
                self.start.day(),
                self.start.format("%b"),
                self.end.day(),
                self.end.format("%b")
            )
        }
    }
}
