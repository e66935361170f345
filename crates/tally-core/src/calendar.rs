use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::debug;

use crate::holidays::HolidayCalendar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub is_today: bool,
    pub holiday: Option<&'static str>,
    /// Only ever set by [`GridMode::WeekAnchored`].
    pub out_of_month: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCell {
    Day(DayCell),
    Padding,
}

impl CalendarCell {
    pub fn day(&self) -> Option<&DayCell> {
        match self {
            CalendarCell::Day(cell) => Some(cell),
            CalendarCell::Padding => None,
        }
    }

    pub fn is_padding(&self) -> bool {
        matches!(self, CalendarCell::Padding)
    }
}

/// Seven Monday-first cells tagged with the ISO week of the Monday slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Week {
    pub iso_week: u32,
    pub monday: NaiveDate,
    pub cells: Vec<CalendarCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridMode {
    /// Days outside the month become [`CalendarCell::Padding`].
    #[default]
    Padded,
    /// Whole calendar weeks; neighbouring-month days are kept and flagged.
    WeekAnchored,
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Monday = 0 .. Sunday = 6.
pub fn monday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

pub fn first_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month >= 12 {
        (year.saturating_add(1), 1_u32)
    } else {
        (year, month + 1)
    };
    add_days(first_day_of_month(next_year, next_month), -1)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    last_day_of_month(year, month).day()
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    add_days(day, -(monday_index(day) as i64))
}

/// Moves by whole months, clamping the day to the target month's length.
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;

    while month < 1 {
        month += 12;
        year = year.saturating_sub(1);
    }
    while month > 12 {
        month -= 12;
        year = year.saturating_add(1);
    }

    let month = month as u32;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

/// Every date of the month containing `month`, in order.
pub fn days_of_month(month: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let first = first_day_of_month(month.year(), month.month());
    first
        .iter_days()
        .take(days_in_month(month.year(), month.month()) as usize)
}

pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

fn day_cell(
    date: NaiveDate,
    today: NaiveDate,
    holidays: &mut HolidayCalendar,
    out_of_month: bool,
) -> DayCell {
    DayCell {
        date,
        is_weekend: is_weekend(date),
        is_today: date == today,
        holiday: holidays.holiday_name(date),
        out_of_month,
    }
}

/// Builds the Monday-first grid for the month containing `month`.
///
/// `today` is supplied by the caller so cells can be flagged without reading
/// the clock. The flat sequence always has a multiple of seven cells.
pub fn build_month_grid(
    month: NaiveDate,
    today: NaiveDate,
    mode: GridMode,
    holidays: &mut HolidayCalendar,
) -> Vec<Week> {
    let first = first_day_of_month(month.year(), month.month());
    let last = last_day_of_month(month.year(), month.month());
    let leading = monday_index(first) as i64;
    let grid_start = add_days(first, -leading);

    let mut flat = Vec::with_capacity(42);
    for offset in 0..leading {
        let date = add_days(grid_start, offset);
        flat.push(match mode {
            GridMode::Padded => CalendarCell::Padding,
            GridMode::WeekAnchored => CalendarCell::Day(day_cell(date, today, holidays, true)),
        });
    }
    for date in first.iter_days().take_while(|date| *date <= last) {
        flat.push(CalendarCell::Day(day_cell(date, today, holidays, false)));
    }
    while flat.len() % 7 != 0 {
        let date = add_days(grid_start, flat.len() as i64);
        flat.push(match mode {
            GridMode::Padded => CalendarCell::Padding,
            GridMode::WeekAnchored => CalendarCell::Day(day_cell(date, today, holidays, true)),
        });
    }

    let weeks: Vec<Week> = flat
        .chunks(7)
        .enumerate()
        .map(|(row, cells)| {
            let monday = add_days(grid_start, row as i64 * 7);
            Week {
                iso_week: iso_week_number(monday),
                monday,
                cells: cells.to_vec(),
            }
        })
        .collect();

    debug!(
        month = %first.format("%Y-%m"),
        ?mode,
        leading,
        weeks = weeks.len(),
        "built month grid"
    );
    weeks
}
