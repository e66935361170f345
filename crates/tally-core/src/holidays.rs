//! Public holidays observed by the timesheet calendar.
//!
//! Fixed-date holidays are instantiated per year; the movable ones hang off
//! Easter Sunday, which is computed with the anonymous Gregorian algorithm
//! (Meeus/Jones/Butcher) using integer arithmetic only.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, NaiveDate};
use tracing::trace;

const FIXED_HOLIDAYS: &[(u32, u32, &str)] = &[
    (1, 1, "Nowy Rok"),
    (1, 6, "Trzech Króli"),
    (5, 1, "Święto Pracy"),
    (5, 3, "Święto Konstytucji 3 Maja"),
    (8, 15, "Wniebowzięcie NMP"),
    (11, 1, "Wszystkich Świętych"),
    (11, 11, "Święto Niepodległości"),
    (12, 25, "Boże Narodzenie"),
    (12, 26, "Drugi Dzień Świąt"),
];

pub const EASTER_SUNDAY: &str = "Wielkanoc";
pub const EASTER_MONDAY: &str = "Poniedziałek Wielkanocny";
pub const CORPUS_CHRISTI: &str = "Boże Ciało";

pub type HolidayMap = BTreeMap<NaiveDate, &'static str>;

/// Easter Sunday for `year` in the Gregorian calendar.
///
/// Returns `None` only when the resulting date is outside chrono's range.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

pub fn easter_monday(year: i32) -> Option<NaiveDate> {
    easter_sunday(year)?.checked_add_days(Days::new(1))
}

pub fn corpus_christi(year: i32) -> Option<NaiveDate> {
    easter_sunday(year)?.checked_add_days(Days::new(60))
}

fn fixed_holidays(year: i32) -> HolidayMap {
    FIXED_HOLIDAYS
        .iter()
        .filter_map(|&(month, day, name)| {
            NaiveDate::from_ymd_opt(year, month, day).map(|date| (date, name))
        })
        .collect()
}

fn movable_holidays(year: i32) -> HolidayMap {
    let mut out = HolidayMap::new();
    if let Some(date) = easter_sunday(year) {
        out.insert(date, EASTER_SUNDAY);
    }
    if let Some(date) = easter_monday(year) {
        out.insert(date, EASTER_MONDAY);
    }
    if let Some(date) = corpus_christi(year) {
        out.insert(date, CORPUS_CHRISTI);
    }
    out
}

/// Movable holidays overwrite fixed ones that land on the same date.
fn merge_holidays(fixed: HolidayMap, movable: HolidayMap) -> HolidayMap {
    let mut merged = fixed;
    for (date, name) in movable {
        if let Some(previous) = merged.insert(date, name) {
            trace!(%date, replaced = previous, by = name, "movable holiday replaced fixed holiday");
        }
    }
    merged
}

/// Every holiday of `year`, keyed by date. Keys render as `YYYY-MM-DD`.
pub fn holidays_for_year(year: i32) -> HolidayMap {
    merge_holidays(fixed_holidays(year), movable_holidays(year))
}

/// Holiday name for `date`, if any. Recomputes the whole year on each call;
/// use [`HolidayCalendar`] when looking up many days.
pub fn is_holiday(date: NaiveDate) -> Option<&'static str> {
    holidays_for_year(date.year()).get(&date).copied()
}

/// Per-year memo over [`holidays_for_year`].
#[derive(Debug, Default, Clone)]
pub struct HolidayCalendar {
    years: HashMap<i32, HolidayMap>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn year(&mut self, year: i32) -> &HolidayMap {
        self.years
            .entry(year)
            .or_insert_with(|| holidays_for_year(year))
    }

    pub fn holiday_name(&mut self, date: NaiveDate) -> Option<&'static str> {
        self.year(date.year()).get(&date).copied()
    }
}
