pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod export;
pub mod holidays;
pub mod hours;
pub mod linkedin;
pub mod render;
pub mod timesheet;
pub mod week;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tally CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.tallyrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let mut store =
    datastore::open_store(
      &cfg, &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open timesheet \
         store at {}",
        data_dir.display()
      )
    })?;

  store.subscribe(Box::new(
    |snapshot: &datastore::Snapshot| {
      debug!(
        entries = snapshot.entries.len(),
        activities =
          snapshot.config.activities.len(),
        linkedin_weeks =
          snapshot.linkedin.len(),
        "store snapshot"
      );
    }
  ));
  if let Err(err) = store.refresh() {
    warn!(error = %format!("{err:#}"), "store refresh failed");
  }
  if let Some(err) = store.last_error() {
    eprintln!(
      "warning: storage: {err}"
    );
  }

  let renderer =
    render::Renderer::new(&cfg)?;
  let now = Utc::now();
  let tz = datetime::resolve_timezone(&cfg);
  let today = datetime::today_in(&tz, now);
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    store.as_mut(),
    &cfg,
    &renderer,
    inv,
    today,
    now
  )?;

  info!("done");
  Ok(())
}
