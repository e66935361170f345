use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::hours::{
  DEFAULT_PER_WEEKDAY_HOURS,
  LimitPolicy
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum StorageBackend {
  Local,
  Shared
}

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "data.location".to_string(),
      "~/.tally".to_string()
    );
    map.insert(
      "storage.backend".to_string(),
      "local".to_string()
    );
    map.insert(
      "limit.policy".to_string(),
      "monthly".to_string()
    );
    map.insert(
      "limit.per_weekday_hours"
        .to_string(),
      DEFAULT_PER_WEEKDAY_HOURS
        .to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    tallyrc_override
  ))]
  pub fn load(
    tallyrc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let tallyrc = resolve_tallyrc_path(
      tallyrc_override
    )?;
    if let Some(path) = tallyrc {
      info!(tallyrc = %path.display(), "loading tallyrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no tallyrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn set(
    &mut self,
    key: &str,
    value: &str
  ) {
    self.map.insert(
      key.to_string(),
      value.to_string()
    );
  }

  pub fn storage_backend(
    &self
  ) -> anyhow::Result<StorageBackend> {
    let raw = self
      .get("storage.backend")
      .unwrap_or_else(|| {
        "local".to_string()
      });
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "local" => {
        Ok(StorageBackend::Local)
      }
      | "shared" | "cloud" => {
        Ok(StorageBackend::Shared)
      }
      | other => Err(anyhow!(
        "invalid storage.backend: \
         {other} (expected local or \
         shared)"
      ))
    }
  }

  pub fn shared_document_path(
    &self
  ) -> Option<PathBuf> {
    self
      .get("storage.shared.path")
      .filter(|raw| {
        !raw.trim().is_empty()
      })
      .map(|raw| {
        expand_tilde(Path::new(
          raw.trim()
        ))
      })
  }

  pub fn limit_policy(
    &self
  ) -> anyhow::Result<LimitPolicy> {
    let policy = self
      .get("limit.policy")
      .unwrap_or_else(|| {
        "monthly".to_string()
      });
    match policy
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "per-entry" | "entry" => {
        Ok(LimitPolicy::PerEntry)
      }
      | "monthly" => {
        let raw = self
          .get(
            "limit.per_weekday_hours"
          )
          .unwrap_or_else(|| {
            DEFAULT_PER_WEEKDAY_HOURS
              .to_string()
          });
        let per_weekday_hours: f64 = raw
          .trim()
          .parse()
          .with_context(|| {
            format!(
              "invalid \
               limit.per_weekday_hours: \
               {raw}"
            )
          })?;
        if !per_weekday_hours.is_finite()
          || per_weekday_hours < 0.0
        {
          return Err(anyhow!(
            "limit.per_weekday_hours \
             must be a non-negative \
             number, got {raw}"
          ));
        }
        Ok(LimitPolicy::MonthlyCap {
          per_weekday_hours
        })
      }
      | other => Err(anyhow!(
        "invalid limit.policy: {other} \
         (expected monthly or \
         per-entry)"
      ))
    }
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_tallyrc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(tallyrc_env) =
    std::env::var("TALLYRC")
  {
    if tallyrc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      tallyrc_env
    )));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate = home.join(".tallyrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".tally"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

pub fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
