use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{GridMode, build_month_grid, first_day_of_month};
use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::TimesheetStore;
use crate::datetime::{parse_day_arg, parse_month_arg, parse_year_arg};
use crate::export::{month_csv, write_month_csv};
use crate::holidays::{HolidayCalendar, holidays_for_year};
use crate::hours::{LimitPolicy, compute_month_summary, plan_save};
use crate::linkedin::{LinkedInForm, clear_week, dashboard, metric_for, save_week, trend_series};
use crate::render::{Renderer, format_hours};
use crate::timesheet::{DEFAULT_HOURS, MAX_HOURS_PER_DAY, TimeEntry};
use crate::week::{WeekKey, WeekSpan};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "month",
        "week",
        "log",
        "clear",
        "summary",
        "export",
        "holidays",
        "activities",
        "maxhours",
        "ssi",
        "ssi-save",
        "ssi-clear",
        "ssi-trend",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv, now))]
pub fn dispatch(
    store: &mut dyn TimesheetStore,
    cfg: &Config,
    renderer: &Renderer,
    inv: Invocation,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();

    debug!(command, args = ?args, backend = ?store.backend(), %today, "dispatching command");

    match command {
        "month" => cmd_month(store, cfg, renderer, args, today, GridMode::Padded),
        "week" => cmd_week(store, cfg, renderer, args, today),
        "log" => cmd_log(store, cfg, renderer, args, today),
        "clear" => cmd_clear(store, args, today),
        "summary" => cmd_summary(store, cfg, renderer, args, today),
        "export" => cmd_export(store, args, today),
        "holidays" => cmd_holidays(renderer, args, today),
        "activities" => cmd_activities(store, renderer, args),
        "maxhours" => cmd_maxhours(store, args),
        "ssi" => cmd_ssi(store, renderer, args, today),
        "ssi-save" => cmd_ssi_save(store, args, today, now),
        "ssi-clear" => cmd_ssi_clear(store, args, today),
        "ssi-trend" => cmd_ssi_trend(store, renderer),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// `key:value` (or `key=value`) modifiers accepted after a command.
#[derive(Debug, Clone, PartialEq)]
enum Mod {
    Activity(String),
    File(Option<PathBuf>),
    Followers(String),
    Brand(String),
    People(String),
    Insights(String),
    Relationships(String),
}

fn parse_one_mod(tok: &str) -> Option<Mod> {
    let (key, value) = tok.split_once(':').or_else(|| tok.split_once('='))?;
    let value = value.trim().to_string();

    match key.to_ascii_lowercase().as_str() {
        "activity" | "act" => Some(Mod::Activity(value)),
        "file" | "out" => {
            if value.is_empty() {
                Some(Mod::File(None))
            } else {
                Some(Mod::File(Some(PathBuf::from(value))))
            }
        }
        "followers" => Some(Mod::Followers(value)),
        "brand" => Some(Mod::Brand(value)),
        "people" => Some(Mod::People(value)),
        "insights" => Some(Mod::Insights(value)),
        "relationships" | "rel" => Some(Mod::Relationships(value)),
        _ => None,
    }
}

/// Splits arguments into positional words and modifiers.
fn split_args(args: &[String]) -> (Vec<&str>, Vec<Mod>) {
    let mut words = Vec::new();
    let mut mods = Vec::new();
    for arg in args {
        match parse_one_mod(arg) {
            Some(one_mod) => mods.push(one_mod),
            None => words.push(arg.as_str()),
        }
    }
    (words, mods)
}

fn reject_extra(words: &[&str], expected: usize) -> anyhow::Result<()> {
    if words.len() > expected {
        return Err(anyhow!("unexpected argument: {}", words[expected]));
    }
    Ok(())
}

fn month_from(words: &[&str], today: NaiveDate) -> anyhow::Result<NaiveDate> {
    match words.first() {
        Some(word) => parse_month_arg(word, today),
        None => Ok(first_day_of_month(today.year(), today.month())),
    }
}

#[instrument(skip(store, cfg, renderer, args))]
fn cmd_month(
    store: &mut dyn TimesheetStore,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
    mode: GridMode,
) -> anyhow::Result<()> {
    let (words, _) = split_args(args);
    reject_extra(&words, 1)?;
    let month = month_from(&words, today)?;
    show_month(store, cfg, renderer, month, today, mode)
}

fn show_month(
    store: &dyn TimesheetStore,
    cfg: &Config,
    renderer: &Renderer,
    month: NaiveDate,
    today: NaiveDate,
    mode: GridMode,
) -> anyhow::Result<()> {
    let policy = cfg.limit_policy()?;
    let mut holidays = HolidayCalendar::new();
    let weeks = build_month_grid(month, today, mode, &mut holidays);
    let entries = &store.snapshot().entries;
    let summary = compute_month_summary(entries, month, policy);
    renderer.print_month(&weeks, entries, &summary)
}

#[instrument(skip(store, cfg, renderer, args))]
fn cmd_week(
    store: &mut dyn TimesheetStore,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let (words, _) = split_args(args);
    reject_extra(&words, 1)?;
    let date = match words.first() {
        Some(word) => parse_day_arg(word, today)?,
        None => today,
    };
    let month = first_day_of_month(date.year(), date.month());
    show_month(store, cfg, renderer, month, today, GridMode::WeekAnchored)
}

#[instrument(skip(store, cfg, renderer, args))]
fn cmd_log(
    store: &mut dyn TimesheetStore,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command log");

    let (words, mods) = split_args(args);
    reject_extra(&words, 2)?;
    let date_arg = words
        .first()
        .ok_or_else(|| anyhow!("usage: log <YYYY-MM-DD> [hours] [activity:<name>]"))?;
    let date = parse_day_arg(date_arg, today)?;
    let hours = match words.get(1) {
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("invalid hours: {raw}"))?,
        None => DEFAULT_HOURS,
    };

    let snapshot = store.snapshot();
    let config = snapshot.config.clone();
    let mut activity = config.default_activity().to_string();
    for one_mod in mods {
        match one_mod {
            Mod::Activity(name) => activity = name,
            other => return Err(anyhow!("log does not accept {other:?}")),
        }
    }
    if hours > 0.0 && !config.has_activity(&activity) {
        return Err(anyhow!(
            "unknown activity: {activity} (configured: {})",
            config.activities.join(", ")
        ));
    }

    let policy = cfg.limit_policy()?;
    let plan = plan_save(&snapshot.entries, date, TimeEntry::new(activity.clone(), hours), policy, &config)?;

    let Some(next) = plan.next else {
        renderer.print_save_rejection(date, hours, &plan.check);
        return Ok(());
    };

    store.replace_entries(next)?;

    if hours == 0.0 {
        println!("Cleared {date}.");
    } else {
        let total = format_hours(plan.check.hours_after_save);
        match (policy, plan.check.limit) {
            (LimitPolicy::MonthlyCap { .. }, Some(limit)) => println!(
                "Logged {}h of {activity} on {date} (month: {total}h of {}h).",
                format_hours(hours),
                format_hours(limit)
            ),
            _ => println!("Logged {}h of {activity} on {date} (month: {total}h).", format_hours(hours)),
        }
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_clear(store: &mut dyn TimesheetStore, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    let (words, _) = split_args(args);
    reject_extra(&words, 1)?;
    let date_arg = words.first().ok_or_else(|| anyhow!("usage: clear <YYYY-MM-DD>"))?;
    let date = parse_day_arg(date_arg, today)?;

    let entries = &store.snapshot().entries;
    if entries.get(date).is_none() {
        println!("No entry on {date}.");
        return Ok(());
    }

    let next = entries.without(date);
    store.replace_entries(next)?;
    println!("Cleared {date}.");
    Ok(())
}

#[instrument(skip(store, cfg, renderer, args))]
fn cmd_summary(
    store: &mut dyn TimesheetStore,
    cfg: &Config,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let (words, _) = split_args(args);
    reject_extra(&words, 1)?;
    let month = month_from(&words, today)?;
    let summary = compute_month_summary(&store.snapshot().entries, month, cfg.limit_policy()?);
    renderer.print_summary(&summary)
}

#[instrument(skip(store, args))]
fn cmd_export(store: &mut dyn TimesheetStore, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    let (words, mods) = split_args(args);
    reject_extra(&words, 1)?;
    let month = month_from(&words, today)?;

    let mut target: Option<PathBuf> = None;
    for one_mod in mods {
        match one_mod {
            Mod::File(path) => target = Some(path.unwrap_or_else(|| PathBuf::from("."))),
            other => return Err(anyhow!("export does not accept {other:?}")),
        }
    }

    let entries = &store.snapshot().entries;
    match target {
        Some(path) => {
            let written = write_month_csv(entries, month, &path)?;
            println!("Exported {}.", written.display());
        }
        None => println!("{}", month_csv(entries, month)),
    }
    Ok(())
}

#[instrument(skip(renderer, args))]
fn cmd_holidays(renderer: &Renderer, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    reject_extra(&args.iter().map(String::as_str).collect::<Vec<_>>(), 1)?;
    let year = match args.first() {
        Some(raw) => parse_year_arg(raw)?,
        None => today.year(),
    };
    renderer.print_holidays(&holidays_for_year(year))
}

#[instrument(skip(store, renderer, args))]
fn cmd_activities(
    store: &mut dyn TimesheetStore,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let Some((action, rest)) = args.split_first() else {
        return renderer.print_activities(&store.snapshot().config);
    };

    let name = rest.join(" ");
    let mut config = store.snapshot().config.clone();
    match action.as_str() {
        "add" => {
            if !config.add_activity(&name) {
                return Err(anyhow!("activity '{name}' is empty or already configured"));
            }
            store.replace_config(config)?;
            println!("Added activity '{}'.", name.trim());
        }
        "remove" | "rm" => {
            if !config.remove_activity(&name) {
                return Err(anyhow!("no activity named '{name}'"));
            }
            if config.activities.is_empty() {
                warn!("last activity removed; new entries fall back to the default name");
            }
            store.replace_config(config)?;
            println!("Removed activity '{}'.", name.trim());
        }
        other => return Err(anyhow!("usage: activities [add <name> | remove <name>], got: {other}")),
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_maxhours(store: &mut dyn TimesheetStore, args: &[String]) -> anyhow::Result<()> {
    let Some(raw) = args.first() else {
        println!("{}", format_hours(store.snapshot().config.max_hours));
        return Ok(());
    };
    reject_extra(&args.iter().map(String::as_str).collect::<Vec<_>>(), 1)?;

    let max_hours: f64 = raw
        .parse()
        .with_context(|| format!("invalid max hours: {raw}"))?;
    if !max_hours.is_finite() || max_hours <= 0.0 || max_hours > MAX_HOURS_PER_DAY {
        return Err(anyhow!("max hours must be above 0 and at most {MAX_HOURS_PER_DAY}"));
    }

    let mut config = store.snapshot().config.clone();
    config.max_hours = max_hours;
    store.replace_config(config)?;
    println!("Max hours per entry set to {}.", format_hours(max_hours));
    Ok(())
}

/// `YYYY-W` (or `YYYY-Www`) week key, or any day inside the week.
fn parse_week_arg(token: &str, today: NaiveDate) -> anyhow::Result<WeekSpan> {
    if let Ok(key) = token.parse::<WeekKey>()
        && let Some(span) = WeekSpan::from_key(key)
    {
        return Ok(span);
    }
    let date = parse_day_arg(token, today)
        .with_context(|| format!("expected a week (YYYY-W) or a date, got: {token}"))?;
    Ok(WeekSpan::containing(date))
}

#[instrument(skip(store, renderer, args))]
fn cmd_ssi(
    store: &mut dyn TimesheetStore,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    reject_extra(&args.iter().map(String::as_str).collect::<Vec<_>>(), 1)?;
    let span = match args.first() {
        Some(token) => parse_week_arg(token, today)?,
        None => WeekSpan::containing(today),
    };

    let metrics = &store.snapshot().linkedin;
    let changes = dashboard(
        metric_for(metrics, span.key),
        metric_for(metrics, span.previous().key),
    );
    renderer.print_dashboard(&span, today, &changes)
}

#[instrument(skip(store, args, now))]
fn cmd_ssi_save(
    store: &mut dyn TimesheetStore,
    args: &[String],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command ssi-save");

    let (words, mods) = split_args(args);
    reject_extra(&words, 1)?;
    let token = words.first().ok_or_else(|| {
        anyhow!("usage: ssi-save <week> followers:N brand:X people:X insights:X relationships:X")
    })?;
    let span = parse_week_arg(token, today)?;

    let metrics = store.snapshot().linkedin.clone();
    let mut form = metric_for(&metrics, span.key)
        .map(LinkedInForm::from_metric)
        .unwrap_or_default();
    for one_mod in mods {
        match one_mod {
            Mod::Followers(value) => form.follower_count = value,
            Mod::Brand(value) => form.establish_brand = value,
            Mod::People(value) => form.find_people = value,
            Mod::Insights(value) => form.engage_insights = value,
            Mod::Relationships(value) => form.build_relationships = value,
            other => return Err(anyhow!("ssi-save does not accept {other:?}")),
        }
    }

    let metric = form
        .validate()
        .map_err(|errors| anyhow::Error::new(errors).context("LinkedIn metrics not saved"))?;
    let followers = metric.follower_count;
    let total = metric.ssi.total;

    store.replace_linkedin_metrics(save_week(&metrics, span.key, metric, now))?;
    println!(
        "Saved week {} ({}): {followers} followers, SSI {total}.",
        span.key,
        span.label()
    );
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_ssi_clear(store: &mut dyn TimesheetStore, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    reject_extra(&args.iter().map(String::as_str).collect::<Vec<_>>(), 1)?;
    let token = args.first().ok_or_else(|| anyhow!("usage: ssi-clear <week>"))?;
    let span = parse_week_arg(token, today)?;

    let metrics = &store.snapshot().linkedin;
    if metric_for(metrics, span.key).is_none() {
        println!("No LinkedIn data for week {}.", span.key);
        return Ok(());
    }

    let next = clear_week(metrics, span.key);
    store.replace_linkedin_metrics(next)?;
    println!("Cleared week {} ({}).", span.key, span.label());
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_ssi_trend(store: &mut dyn TimesheetStore, renderer: &Renderer) -> anyhow::Result<()> {
    let points = trend_series(&store.snapshot().linkedin);
    if points.is_empty() {
        println!("No LinkedIn data yet.");
        return Ok(());
    }
    renderer.print_trend(&points)
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "\
usage: tally [-v|-q] [--tallyrc FILE] [--data DIR] [--rc KEY=VALUE] <command> [args]

  month [YYYY-MM]                  month grid with logged hours
  week [YYYY-MM-DD]                whole-week grid for the date's month
  log <date> [hours] [activity:X]  save hours for a day (0 deletes)
  clear <date>                     delete a day's entry
  summary [YYYY-MM]                monthly totals and limit
  export [YYYY-MM] [file:PATH]     CSV to stdout or a file
  holidays [YEAR]                  public holidays
  activities [add|remove <name>]   configured activities
  maxhours [N]                     per-entry hour cap
  ssi [week|date]                  LinkedIn week-over-week dashboard
  ssi-save <week> followers:N brand:X people:X insights:X relationships:X
  ssi-clear <week>                 delete a week's LinkedIn record
  ssi-trend                        all recorded weeks
  help, version"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::tempdir;

    use super::*;
    use crate::datastore::LocalStore;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn run(store: &mut dyn TimesheetStore, cfg: &Config, line: &[&str]) -> anyhow::Result<()> {
        let inv = Invocation {
            command: line[0].to_string(),
            command_args: line[1..].iter().map(ToString::to_string).collect(),
        };
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).single().expect("timestamp");
        dispatch(store, cfg, &Renderer::plain(), inv, ymd(2024, 5, 20), now)
    }

    #[test]
    fn abbreviations_must_be_unambiguous() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("ssi", &known), Some("ssi"));
        assert_eq!(expand_command_abbrev("ex", &known), Some("export"));
        assert_eq!(expand_command_abbrev("h", &known), None);
        assert_eq!(expand_command_abbrev("s", &known), None);
    }

    #[test]
    fn modifiers_are_recognised() {
        let args = vec!["2024-05-06".to_string(), "3".to_string(), "activity:Paid Vacation".to_string()];
        let (words, mods) = split_args(&args);
        assert_eq!(words, vec!["2024-05-06", "3"]);
        assert_eq!(mods, vec![Mod::Activity("Paid Vacation".to_string())]);
        assert_eq!(parse_one_mod("file:"), Some(Mod::File(None)));
        assert_eq!(parse_one_mod("color:red"), None);
    }

    #[test]
    fn log_then_clear() {
        let temp = tempdir().expect("tempdir");
        let mut store = LocalStore::open(temp.path()).expect("open store");
        let cfg = Config::default();

        run(&mut store, &cfg, &["log", "2024-05-06"]).expect("log default hours");
        let entry = store.snapshot().entries.get(ymd(2024, 5, 6)).cloned().expect("entry");
        assert_eq!(entry, TimeEntry::new("LinkedIn Stuff", 2.0));

        run(&mut store, &cfg, &["log", "2024-05-06", "0"]).expect("log zero");
        assert!(store.snapshot().entries.is_empty());

        run(&mut store, &cfg, &["log", "2024-05-07", "8", "activity:Paid Vacation"]).expect("log vacation");
        run(&mut store, &cfg, &["clear", "2024-05-07"]).expect("clear");
        assert!(store.snapshot().entries.is_empty());
    }

    #[test]
    fn log_over_monthly_cap_is_not_saved() {
        let temp = tempdir().expect("tempdir");
        let mut store = LocalStore::open(temp.path()).expect("open store");
        let cfg = Config::default();

        // April 2024: 22 weekdays, 44h cap.
        for day in [1, 2, 3, 4, 5] {
            run(&mut store, &cfg, &["log", &format!("2024-04-{day:02}"), "8"]).expect("log");
        }
        run(&mut store, &cfg, &["log", "2024-04-08", "6"]).expect("rejection is not an error");

        assert_eq!(store.snapshot().entries.total_for_month(ymd(2024, 4, 1)), 40.0);
        assert!(store.snapshot().entries.get(ymd(2024, 4, 8)).is_none());
    }

    #[test]
    fn maxhours_limits_log_under_default_policy() {
        let temp = tempdir().expect("tempdir");
        let mut store = LocalStore::open(temp.path()).expect("open store");
        let cfg = Config::default();

        run(&mut store, &cfg, &["maxhours", "4"]).expect("maxhours");
        run(&mut store, &cfg, &["log", "2024-05-06", "5"]).expect("rejection is not an error");
        assert!(store.snapshot().entries.get(ymd(2024, 5, 6)).is_none());

        run(&mut store, &cfg, &["log", "2024-05-06", "4"]).expect("log");
        assert_eq!(store.snapshot().entries.total_for_month(ymd(2024, 5, 1)), 4.0);
    }

    #[test]
    fn log_rejects_unknown_activity_and_bad_hours() {
        let temp = tempdir().expect("tempdir");
        let mut store = LocalStore::open(temp.path()).expect("open store");
        let cfg = Config::default();

        assert!(run(&mut store, &cfg, &["log", "2024-05-06", "1", "activity:Golf"]).is_err());
        assert!(run(&mut store, &cfg, &["log", "2024-05-06", "25"]).is_err());
        assert!(run(&mut store, &cfg, &["log", "2024-05-06", "lots"]).is_err());
        assert!(store.snapshot().entries.is_empty());
    }

    #[test]
    fn activities_and_max_hours_are_persisted() {
        let temp = tempdir().expect("tempdir");
        let mut store = LocalStore::open(temp.path()).expect("open store");
        let cfg = Config::default();

        run(&mut store, &cfg, &["activities", "add", "Deep", "Work"]).expect("add");
        assert!(store.snapshot().config.has_activity("Deep Work"));
        assert!(run(&mut store, &cfg, &["activities", "add", "Deep Work"]).is_err());
        run(&mut store, &cfg, &["activities", "remove", "Paid", "Vacation"]).expect("remove");
        run(&mut store, &cfg, &["maxhours", "10"]).expect("maxhours");
        assert!(run(&mut store, &cfg, &["maxhours", "0"]).is_err());

        let reopened = LocalStore::open(temp.path()).expect("reopen");
        assert_eq!(
            reopened.snapshot().config.activities,
            vec!["LinkedIn Stuff".to_string(), "Deep Work".to_string()]
        );
        assert_eq!(reopened.snapshot().config.max_hours, 10.0);
    }

    #[test]
    fn ssi_save_validates_and_stamps() {
        let temp = tempdir().expect("tempdir");
        let mut store = LocalStore::open(temp.path()).expect("open store");
        let cfg = Config::default();

        let err = run(
            &mut store,
            &cfg,
            &["ssi-save", "2024-20", "followers:-4", "brand:30", "people:5", "insights:5", "relationships:5"],
        )
        .expect_err("invalid form");
        let message = format!("{err:#}");
        assert!(message.contains("followerCount"));
        assert!(message.contains("establishBrand"));
        assert!(store.snapshot().linkedin.is_empty());

        run(
            &mut store,
            &cfg,
            &["ssi-save", "2024-20", "followers:1200", "brand:7.5", "people:6", "insights:5", "relationships:4.5"],
        )
        .expect("save");
        let metric = store.snapshot().linkedin.get("2024-20").cloned().expect("metric");
        assert_eq!(metric.follower_count, 1200);
        assert_eq!(metric.ssi.total, 23.0);
        assert!(metric.updated_at.is_some());

        // Omitted fields keep the stored values.
        run(&mut store, &cfg, &["ssi-save", "2024-05-14", "followers:1250"]).expect("partial update");
        let metric = store.snapshot().linkedin.get("2024-20").cloned().expect("metric");
        assert_eq!(metric.follower_count, 1250);
        assert_eq!(metric.ssi.total, 23.0);

        run(&mut store, &cfg, &["ssi"]).expect("dashboard");
        run(&mut store, &cfg, &["ssi-trend"]).expect("trend");
        run(&mut store, &cfg, &["ssi-clear", "2024-W20"]).expect("clear");
        assert!(store.snapshot().linkedin.is_empty());
    }

    #[test]
    fn export_writes_named_file() {
        let temp = tempdir().expect("tempdir");
        let mut store = LocalStore::open(temp.path()).expect("open store");
        let cfg = Config::default();
        run(&mut store, &cfg, &["log", "2024-05-06", "2.5"]).expect("log");

        let target = temp.path().join("out");
        std::fs::create_dir(&target).expect("mkdir");
        let file_arg = format!("file:{}", target.display());
        run(&mut store, &cfg, &["export", "2024-05", &file_arg]).expect("export");

        let body = std::fs::read_to_string(target.join("timesheet-2024-05.csv")).expect("read csv");
        assert_eq!(body, "Date,Activity,Hours\n2024-05-06,LinkedIn Stuff,2.5");
    }

    #[test]
    fn views_render_without_error() {
        let temp = tempdir().expect("tempdir");
        let mut store = LocalStore::open(temp.path()).expect("open store");
        let cfg = Config::default();
        let lines: [&[&str]; 8] = [
            &["month"],
            &["month", "2024-02"],
            &["week", "2024-05-31"],
            &["summary", "prev"],
            &["holidays", "2025"],
            &["activities"],
            &["maxhours"],
            &["help"],
        ];
        for line in lines {
            run(&mut store, &cfg, line).expect("view");
        }
        assert!(run(&mut store, &cfg, &["month", "2024-05", "extra"]).is_err());
    }
}
