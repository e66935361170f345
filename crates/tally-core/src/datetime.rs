use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::calendar::{
  add_days,
  shift_months
};
use crate::config::Config;

const TIMEZONE_CONFIG_FILE: &str =
  "tally-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "TALLY_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "TALLY_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Timezone used to decide what
/// "today" is.
///
/// Order: `timezone` config key,
/// `$TALLY_TIMEZONE`, then
/// `tally-time.toml` (or the file named
/// by `$TALLY_TIME_CONFIG`), then UTC.
pub fn resolve_timezone(
  cfg: &Config
) -> Tz {
  if let Some(raw) = cfg.get("timezone")
    && let Some(tz) =
      parse_timezone(&raw, "rc:timezone")
  {
    return tz;
  }

  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  tracing::debug!(
    "no timezone configured; using UTC"
  );
  chrono_tz::UTC
}

#[must_use]
pub fn today_in(
  tz: &Tz,
  now: DateTime<Utc>
) -> NaiveDate {
  now.with_timezone(tz).date_naive()
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Parses a day argument: `YYYY-MM-DD`,
/// `today`, `yesterday` or `tomorrow`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_day_arg(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  match token
    .to_ascii_lowercase()
    .as_str()
  {
    | "today" => return Ok(today),
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | _ => {}
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "invalid date '{token}' \
       (expected YYYY-MM-DD)"
    )
  })
}

/// Parses a month argument into the
/// first day of that month: `YYYY-MM`,
/// `this`, `prev` or `next`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_month_arg(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let this_month = today
    .with_day(1)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct first \
         day of month"
      )
    })?;

  match token
    .to_ascii_lowercase()
    .as_str()
  {
    | "this" | "now" => {
      return Ok(this_month);
    }
    | "prev" | "last" => {
      return Ok(shift_months(
        this_month, -1
      ));
    }
    | "next" => {
      return Ok(shift_months(
        this_month, 1
      ));
    }
    | _ => {}
  }

  let re = Regex::new(
    r"^(?P<year>\d{4})-(?P<month>\d{1,2})$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;
  let caps =
    re.captures(token).ok_or_else(
      || {
        anyhow!(
          "invalid month '{token}' \
           (expected YYYY-MM)"
        )
      }
    )?;

  let year: i32 = caps["year"]
    .parse()
    .context("invalid year")?;
  let month: u32 = caps["month"]
    .parse()
    .context("invalid month")?;

  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .ok_or_else(|| {
    anyhow!(
      "invalid month '{token}' \
       (month must be 1-12)"
    )
  })
}

pub fn parse_year_arg(
  input: &str
) -> anyhow::Result<i32> {
  let token = input.trim();
  if token.len() != 4
    || !token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    return Err(anyhow!(
      "invalid year '{token}' \
       (expected YYYY)"
    ));
  }
  token
    .parse()
    .context("invalid 4-digit year")
}
