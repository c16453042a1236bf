use std::collections::BTreeMap;
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

use crate::classifier::GridWeekStart;
use crate::labels::Locale;

const WEEKRC_ENV_VAR: &str = "SEMWEEKRC";
const WEEKRC_FILE: &str = ".semweekrc";

#[derive(Debug, Clone)]
pub struct Config {
  map:              BTreeMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[must_use]
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          BTreeMap::new(),
      loaded_files: vec![]
    };

    cfg.map.insert(
      "locale".to_string(),
      "fr".to_string()
    );
    cfg.map.insert(
      "grid.first_day".to_string(),
      "sunday".to_string()
    );
    cfg.map.insert(
      "timezone".to_string(),
      "Europe/Brussels".to_string()
    );
    cfg.map.insert(
      "color".to_string(),
      "on".to_string()
    );
    cfg
  }

  #[tracing::instrument(skip(
    weekrc_override
  ))]
  pub fn load(
    weekrc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let weekrc = resolve_weekrc_path(
      weekrc_override
    )?;
    if let Some(path) = weekrc {
      info!(weekrc = %path.display(), "loading weekrc");
      cfg.load_file(&path, &mut vec![])?;
    } else {
      warn!(
        "no weekrc found; using \
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

  /// Reads an on/off setting; values
  /// other than the usual spellings are
  /// errors.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid {key} setting: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn locale(
    &self
  ) -> anyhow::Result<Locale> {
    self
      .get("locale")
      .unwrap_or_else(|| {
        "fr".to_string()
      })
      .parse::<Locale>()
      .context("invalid locale setting")
  }

  pub fn grid_week_start(
    &self
  ) -> anyhow::Result<GridWeekStart> {
    self
      .get("grid.first_day")
      .unwrap_or_else(|| {
        "sunday".to_string()
      })
      .parse::<GridWeekStart>()
      .context(
        "invalid grid.first_day \
         setting"
      )
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  /// `including` holds the files whose
  /// includes are being processed, so a
  /// file that includes itself (directly
  /// or through others) is reported.
  #[tracing::instrument(skip(
    self, including
  ))]
  fn load_file(
    &mut self,
    path: &Path,
    including: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| path.clone());
    if including.contains(&canonical) {
      let chain = including
        .iter()
        .chain(std::iter::once(
          &canonical
        ))
        .map(|p| {
          p.display().to_string()
        })
        .collect::<Vec<_>>()
        .join(" -> ");
      return Err(anyhow!(
        "include cycle: {chain}"
      ));
    }
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
          resolve_relative_path(
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
          including
            .push(canonical.clone());
          let loaded = self.load_file(
            &include_path,
            including
          );
          including.pop();
          loaded?;
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
      let mut value =
        v.trim().to_string();
      if key == "weeks.file"
        && !value.is_empty()
      {
        value = resolve_relative_path(
          &base_dir, &value
        )?
        .to_string_lossy()
        .to_string();
      }
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Tables file to load instead of the
/// built-in tables, if any.
#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_weeks_file(
  cfg: &Config,
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(expand_tilde(path));
  }

  cfg
    .get("weeks.file")
    .filter(|value| {
      !value.trim().is_empty()
    })
    .map(|value| {
      expand_tilde(Path::new(
        value.trim()
      ))
    })
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_weekrc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(weekrc_env) =
    std::env::var(WEEKRC_ENV_VAR)
  {
    if weekrc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      weekrc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    debug!(
      "cannot determine home \
       directory; skipping weekrc"
    );
    return Ok(None);
  };
  let candidate = home.join(WEEKRC_FILE);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_relative_path(
  base_dir: &Path,
  raw: &str
) -> anyhow::Result<PathBuf> {
  if raw.trim().is_empty() {
    return Err(anyhow!(
      "path cannot be empty"
    ));
  }

  let expanded =
    expand_tilde(Path::new(raw));
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
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

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::{
    Config,
    resolve_weeks_file
  };
  use crate::classifier::GridWeekStart;
  use crate::labels::Locale;

  #[test]
  fn defaults_match_the_calendar_ui()
  {
    let cfg = Config::defaults();
    assert_eq!(
      cfg.locale().expect("locale"),
      Locale::Fr
    );
    assert_eq!(
      cfg
        .grid_week_start()
        .expect("grid start"),
      GridWeekStart::Sunday
    );
    assert_eq!(
      cfg
        .get_bool("color")
        .expect("color"),
      Some(true)
    );
    assert_eq!(
      cfg
        .get_bool("no.such.key")
        .expect("missing key"),
      None
    );
    assert!(
      resolve_weeks_file(&cfg, None)
        .is_none()
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![
      (
        "rc.locale".to_string(),
        "EN".to_string()
      ),
      (
        "grid.first_day".to_string(),
        "monday".to_string()
      ),
    ]);
    assert_eq!(
      cfg.locale().expect("locale"),
      Locale::En
    );
    assert_eq!(
      cfg
        .grid_week_start()
        .expect("grid start"),
      GridWeekStart::Monday
    );
  }

  #[test]
  fn loads_includes_and_relative_weeks_file()
   {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "label.fr.break = Vacances\n"
    )
    .expect("write include");
    let rc = dir.path().join("weekrc");
    fs::write(
      &rc,
      "# calendar settings\n\
       locale = en  # trailing comment\n\
       weeks.file = tables.json\n\
       include extra.rc\n"
    )
    .expect("write weekrc");

    let cfg = Config::load(Some(rc.as_path()))
      .expect("load config");
    assert_eq!(
      cfg.get("locale").as_deref(),
      Some("en")
    );
    assert_eq!(
      cfg.get("label.fr.break").as_deref(),
      Some("Vacances")
    );
    assert_eq!(
      resolve_weeks_file(&cfg, None),
      Some(dir.path().join("tables.json"))
    );
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn include_cycles_are_errors() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let rc = dir.path().join("weekrc");
    fs::write(
      &rc,
      "locale = en\ninclude weekrc\n"
    )
    .expect("write weekrc");
    let err =
      Config::load(Some(rc.as_path()))
        .expect_err("self include");
    assert!(
      err
        .to_string()
        .contains("include cycle")
    );

    let a = dir.path().join("a.rc");
    let b = dir.path().join("b.rc");
    fs::write(&a, "include b.rc\n")
      .expect("write a");
    fs::write(&b, "include a.rc\n")
      .expect("write b");
    assert!(
      Config::load(Some(a.as_path()))
        .is_err()
    );
  }

  #[test]
  fn shared_includes_load_twice() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    fs::write(
      dir.path().join("common.rc"),
      "color = off\n"
    )
    .expect("write common");
    fs::write(
      dir.path().join("one.rc"),
      "include common.rc\n"
    )
    .expect("write one");
    let rc = dir.path().join("weekrc");
    fs::write(
      &rc,
      "include one.rc\ninclude \
       common.rc\n"
    )
    .expect("write weekrc");
    let cfg =
      Config::load(Some(rc.as_path()))
        .expect("load config");
    assert_eq!(
      cfg
        .get_bool("color")
        .expect("color"),
      Some(false)
    );
    assert_eq!(cfg.loaded_files.len(), 4);
  }

  #[test]
  fn rejects_lines_without_equals() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let rc = dir.path().join("weekrc");
    fs::write(&rc, "locale fr\n")
      .expect("write weekrc");
    assert!(
      Config::load(Some(rc.as_path())).is_err()
    );
  }
}
