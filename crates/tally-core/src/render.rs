use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{CalendarCell, DayCell, Week};
use crate::config::Config;
use crate::holidays::HolidayMap;
use crate::hours::{LimitViolation, MonthSummary, SaveCheck};
use crate::linkedin::{MetricChange, Trend, TrendPoint};
use crate::timesheet::{MonthConfig, TimeEntries};
use crate::week::WeekSpan;

const WEEKDAY_HEADERS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => io::stdout().is_terminal(),
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, weeks, entries, summary))]
    pub fn print_month(
        &self,
        weeks: &[Week],
        entries: &TimeEntries,
        summary: &MonthSummary,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_month(&mut out, weeks, entries, summary)
    }

    /// Month grid: one row per week tagged with its ISO number, each day
    /// showing the day of month and logged hours. Holidays are listed below.
    pub fn write_month<W: Write>(
        &self,
        out: &mut W,
        weeks: &[Week],
        entries: &TimeEntries,
        summary: &MonthSummary,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&summary.month.format("%B %Y").to_string(), "1"))?;
        writeln!(out)?;

        let mut headers = vec!["Wk".to_string()];
        headers.extend(WEEKDAY_HEADERS.iter().map(ToString::to_string));

        let rows = weeks
            .iter()
            .map(|week| {
                let mut row = vec![self.paint(&week.iso_week.to_string(), "33")];
                row.extend(week.cells.iter().map(|cell| self.grid_cell(cell, entries)));
                row
            })
            .collect();
        write_table(&mut *out, headers, rows)?;

        let holidays: Vec<&DayCell> = weeks
            .iter()
            .flat_map(|week| week.cells.iter())
            .filter_map(CalendarCell::day)
            .filter(|cell| cell.holiday.is_some() && !cell.out_of_month)
            .collect();
        if !holidays.is_empty() {
            writeln!(out)?;
            for cell in holidays {
                writeln!(
                    out,
                    "{} {}",
                    self.paint(&cell.date.format("%d %b").to_string(), "31"),
                    cell.holiday.unwrap_or_default()
                )?;
            }
        }

        writeln!(out)?;
        self.write_summary_line(out, summary)
    }

    fn grid_cell(&self, cell: &CalendarCell, entries: &TimeEntries) -> String {
        let Some(day) = cell.day() else {
            return String::new();
        };

        let hours = entries.get(day.date).map(|entry| entry.hours);
        let marker = if day.holiday.is_some() { "*" } else { "" };
        let text = match hours {
            Some(hours) => format!("{:>2}{marker} {}h", day.date.day(), format_hours(hours)),
            None => format!("{:>2}{marker}", day.date.day()),
        };

        if day.out_of_month {
            self.paint(&text, "2")
        } else if day.is_today {
            self.paint(&text, "7")
        } else if day.holiday.is_some() {
            self.paint(&text, "31")
        } else if day.is_weekend {
            self.paint(&text, "90")
        } else if hours.is_some() {
            self.paint(&text, "32")
        } else {
            text
        }
    }

    fn write_summary_line<W: Write>(&self, out: &mut W, summary: &MonthSummary) -> anyhow::Result<()> {
        match summary.monthly_limit {
            Some(limit) => writeln!(
                out,
                "Total {}h of {}h ({} weekdays), avg {:.1}h/day",
                format_hours(summary.total_hours),
                format_hours(limit),
                summary.weekday_count,
                summary.average_per_day
            )?,
            None => writeln!(
                out,
                "Total {}h ({} weekdays), avg {:.1}h/day",
                format_hours(summary.total_hours),
                summary.weekday_count,
                summary.average_per_day
            )?,
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, summary))]
    pub fn print_summary(&self, summary: &MonthSummary) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_summary(&mut out, summary)
    }

    pub fn write_summary<W: Write>(&self, out: &mut W, summary: &MonthSummary) -> anyhow::Result<()> {
        writeln!(out, "month          {}", summary.month.format("%Y-%m"))?;
        writeln!(out, "total hours    {}", format_hours(summary.total_hours))?;
        writeln!(out, "weekdays       {}", summary.weekday_count)?;
        match (summary.monthly_limit, summary.remaining()) {
            (Some(limit), Some(remaining)) => {
                writeln!(out, "monthly limit  {}", format_hours(limit))?;
                let remaining_text = format_hours(remaining);
                let remaining_text = if remaining < 0.0 {
                    self.paint(&remaining_text, "31")
                } else {
                    remaining_text
                };
                writeln!(out, "remaining      {remaining_text}")?;
            }
            _ => writeln!(out, "monthly limit  none (per-entry cap)")?,
        }
        writeln!(out, "avg per day    {:.1}", summary.average_per_day)?;
        writeln!(out, "days logged    {}", summary.per_day.len())?;
        Ok(())
    }

    pub fn print_save_rejection(&self, date: NaiveDate, hours: f64, check: &SaveCheck) {
        let limit = check.limit.map(format_hours).unwrap_or_else(|| "-".to_string());
        let label = self.paint("rejected:", "31");
        match check.violation {
            Some(LimitViolation::PerEntryCap) => eprintln!(
                "{label} {}h on {date} is above the per-entry maximum of {limit}h",
                format_hours(hours)
            ),
            _ => eprintln!(
                "{label} saving {}h on {date} would bring the month to {}h, above the limit of {limit}h",
                format_hours(hours),
                format_hours(check.hours_after_save)
            ),
        }
    }

    #[tracing::instrument(skip(self, holidays))]
    pub fn print_holidays(&self, holidays: &HolidayMap) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write_holidays(&mut out, holidays)
    }

    #[tracing::instrument(skip(self, config))]
    pub fn print_activities(&self, config: &MonthConfig) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let default = config.default_activity();
        for activity in &config.activities {
            if activity == default {
                writeln!(out, "{} (default)", self.paint(activity, "1"))?;
            } else {
                writeln!(out, "{activity}")?;
            }
        }
        writeln!(out, "max hours per entry: {}", format_hours(config.max_hours))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, span, changes))]
    pub fn print_dashboard(
        &self,
        span: &WeekSpan,
        today: NaiveDate,
        changes: &[MetricChange],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_dashboard(&mut out, span, today, changes)
    }

    pub fn write_dashboard<W: Write>(
        &self,
        out: &mut W,
        span: &WeekSpan,
        today: NaiveDate,
        changes: &[MetricChange],
    ) -> anyhow::Result<()> {
        let current = if span.is_current(today) { " (current)" } else { "" };
        writeln!(
            out,
            "{} {}{current}",
            self.paint(&format!("Week {}", span.key), "1"),
            span.label()
        )?;

        if changes.is_empty() {
            writeln!(out, "no LinkedIn data for this week")?;
            return Ok(());
        }

        let headers = ["Metric", "Value", "Previous", "Change", "%"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let rows = changes
            .iter()
            .map(|change| {
                let value = match change.max {
                    Some(max) => format!("{} / {}", format_score(change.value), format_score(max)),
                    None => format_score(change.value),
                };
                let (arrow, code) = match change.trend() {
                    Trend::Up => ("▲", "32"),
                    Trend::Down => ("▼", "31"),
                    Trend::Flat => ("=", "90"),
                };
                vec![
                    change.title.to_string(),
                    value,
                    change.previous.map(format_score).unwrap_or_else(|| "-".to_string()),
                    self.paint(&format!("{arrow} {:+}", round_two(change.change)), code),
                    format!("{:+.1}%", change.change_percent),
                ]
            })
            .collect();
        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, points))]
    pub fn print_trend(&self, points: &[TrendPoint]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write_trend(&mut out, points)
    }
}

pub fn write_holidays<W: Write>(out: &mut W, holidays: &HolidayMap) -> anyhow::Result<()> {
    let headers = ["Date", "Day", "Holiday"].iter().map(ToString::to_string).collect();
    let rows = holidays
        .iter()
        .map(|(date, name)| {
            vec![
                date.to_string(),
                date.format("%a").to_string(),
                (*name).to_string(),
            ]
        })
        .collect();
    write_table(out, headers, rows)
}

pub fn write_trend<W: Write>(out: &mut W, points: &[TrendPoint]) -> anyhow::Result<()> {
    let headers = [
        "Week",
        "Followers",
        "Brand",
        "People",
        "Insights",
        "Relationships",
        "SSI",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    let rows = points
        .iter()
        .map(|point| {
            vec![
                point.key.to_string(),
                point.followers.to_string(),
                format_score(point.ssi.establish_brand),
                format_score(point.ssi.find_people),
                format_score(point.ssi.engage_insights),
                format_score(point.ssi.build_relationships),
                format_score(point.ssi.total),
            ]
        })
        .collect();
    write_table(out, headers, rows)
}

/// Hours with at most two decimals and no trailing zeros.
pub fn format_hours(hours: f64) -> String {
    format!("{}", round_two(hours))
}

fn format_score(value: f64) -> String {
    format!("{}", round_two(value))
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Renderer {
    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, width) in widths.iter().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{GridMode, build_month_grid};
    use crate::holidays::{HolidayCalendar, holidays_for_year};
    use crate::hours::{LimitPolicy, compute_month_summary};
    use crate::timesheet::TimeEntry;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn color_setting_is_validated() {
        let mut cfg = Config::default();
        cfg.set("color", "OFF");
        let renderer = Renderer::new(&cfg).expect("color off");
        assert!(!renderer.color);
        assert_eq!(renderer.paint("x", "31"), "x");

        cfg.set("color", "sometimes");
        let err = Renderer::new(&cfg).expect_err("unknown color word");
        assert!(err.to_string().contains("invalid color setting: sometimes"));
    }

    #[test]
    fn table_pads_around_ansi_codes() {
        let out = render(|buf| {
            write_table(
                buf,
                vec!["A".to_string(), "B".to_string()],
                vec![vec!["\x1b[31mred\x1b[0m".to_string(), "x".to_string()]],
            )
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "A   B ");
        assert_eq!(strip_ansi(lines[2]), "red x ");
    }

    #[test]
    fn month_view_lists_hours_and_holidays() {
        let month = ymd(2024, 5, 1);
        let entries = TimeEntries::new().with_saved(ymd(2024, 5, 6), TimeEntry::new("LinkedIn Stuff", 2.5));
        let mut holidays = HolidayCalendar::new();
        let weeks = build_month_grid(month, ymd(2024, 5, 20), GridMode::Padded, &mut holidays);
        let summary = compute_month_summary(&entries, month, LimitPolicy::default());

        let out = render(|buf| Renderer::plain().write_month(buf, &weeks, &entries, &summary));
        assert!(out.starts_with("May 2024"));
        assert!(out.contains(" 6 2.5h"));
        assert!(out.contains(" 1*"));
        assert!(out.contains("Święto Konstytucji 3 Maja"));
        assert!(out.contains("Total 2.5h of 46h (23 weekdays), avg 0.1h/day"));
    }

    #[test]
    fn summary_without_monthly_limit() {
        let summary = compute_month_summary(&TimeEntries::new(), ymd(2024, 4, 1), LimitPolicy::PerEntry);
        let out = render(|buf| Renderer::plain().write_summary(buf, &summary));
        assert!(out.contains("weekdays       22"));
        assert!(out.contains("monthly limit  none"));
    }

    #[test]
    fn holiday_table_has_a_row_per_holiday() {
        let out = render(|buf| write_holidays(buf, &holidays_for_year(2024)));
        assert_eq!(out.lines().count(), 2 + 12);
        assert!(out.contains("2024-03-31 Sun Wielkanoc"));
    }

    #[test]
    fn hours_are_trimmed() {
        assert_eq!(format_hours(8.0), "8");
        assert_eq!(format_hours(0.1 + 0.2), "0.3");
        assert_eq!(format_hours(2.5), "2.5");
    }
}
