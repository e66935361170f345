use std::cell::RefCell;
use std::rc::Rc;

use chrono::{NaiveDate, TimeZone, Utc};
use tally_core::calendar::{GridMode, build_month_grid};
use tally_core::config::{Config, StorageBackend};
use tally_core::datastore::{LocalStore, Snapshot, TimesheetStore, open_store};
use tally_core::export::month_csv;
use tally_core::holidays::HolidayCalendar;
use tally_core::hours::{LimitPolicy, compute_month_summary, plan_save};
use tally_core::linkedin::{LinkedInForm, dashboard, metric_for, save_week, trend_series};
use tally_core::timesheet::TimeEntry;
use tally_core::week::WeekSpan;
use tempfile::tempdir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn month_logging_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let mut store = LocalStore::open(temp.path()).expect("open store");
    let policy = LimitPolicy::default();
    let config = store.snapshot().config.clone();

    for (day, hours) in [(6, 2.0), (7, 2.5), (8, 1.5)] {
        let plan = plan_save(
            &store.snapshot().entries,
            ymd(2024, 5, day),
            TimeEntry::new(config.default_activity(), hours),
            policy,
            &config,
        )
        .expect("plan save");
        let next = plan.next.expect("allowed");
        store.replace_entries(next).expect("persist");
    }

    let reopened = LocalStore::open(temp.path()).expect("reopen");
    let entries = &reopened.snapshot().entries;
    let summary = compute_month_summary(entries, ymd(2024, 5, 1), policy);
    assert_eq!(summary.total_hours, 6.0);
    assert_eq!(summary.weekday_count, 23);
    assert_eq!(summary.monthly_limit, Some(46.0));

    let mut holidays = HolidayCalendar::new();
    let weeks = build_month_grid(ymd(2024, 5, 1), ymd(2024, 5, 7), GridMode::Padded, &mut holidays);
    let today = weeks
        .iter()
        .flat_map(|week| week.cells.iter())
        .filter_map(|cell| cell.day())
        .find(|cell| cell.is_today)
        .expect("today flagged");
    assert_eq!(today.date, ymd(2024, 5, 7));
    assert_eq!(weeks[0].iso_week, 18);

    assert_eq!(
        month_csv(entries, ymd(2024, 5, 1)),
        "Date,Activity,Hours\n2024-05-06,LinkedIn Stuff,2\n2024-05-07,LinkedIn Stuff,2.5\n2024-05-08,LinkedIn Stuff,1.5"
    );
}

#[test]
fn shared_backend_syncs_two_clients() {
    let temp = tempdir().expect("tempdir");
    let mut cfg = Config::default();
    cfg.set("storage.backend", "shared");
    assert_eq!(cfg.storage_backend().expect("backend"), StorageBackend::Shared);

    let mut laptop = open_store(&cfg, temp.path()).expect("open laptop");
    let mut phone = open_store(&cfg, temp.path()).expect("open phone");
    assert_eq!(laptop.backend(), StorageBackend::Shared);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    phone.subscribe(Box::new(move |snapshot: &Snapshot| {
        sink.borrow_mut().push(snapshot.linkedin.len());
    }));

    let now = Utc.with_ymd_and_hms(2024, 5, 15, 8, 0, 0).single().expect("timestamp");
    let week = WeekSpan::containing(ymd(2024, 5, 15));
    let form = LinkedInForm {
        follower_count: "1200".to_string(),
        establish_brand: "7.5".to_string(),
        find_people: "6".to_string(),
        engage_insights: "5".to_string(),
        build_relationships: "4.5".to_string(),
    };
    let metric = form.validate().expect("valid form");
    let next = save_week(&laptop.snapshot().linkedin, week.key, metric, now);
    laptop.replace_linkedin_metrics(next).expect("laptop write");

    assert!(temp.path().join("shared-timesheet.json").exists());
    assert!(phone.refresh().expect("phone refresh"));
    assert_eq!(*seen.borrow(), vec![0, 1]);

    let points = trend_series(&phone.snapshot().linkedin);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].ssi.total, 23.0);

    let changes = dashboard(
        metric_for(&phone.snapshot().linkedin, week.key),
        metric_for(&phone.snapshot().linkedin, week.previous().key),
    );
    assert_eq!(changes.len(), 6);
    assert!(changes.iter().all(|change| change.change == 0.0));
}

#[test]
fn local_backend_is_the_default() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&Config::default(), temp.path()).expect("open store");
    assert_eq!(store.backend(), StorageBackend::Local);
    assert!(store.last_error().is_none());
}
