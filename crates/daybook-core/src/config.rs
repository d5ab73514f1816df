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
use chrono::Weekday;
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "DAYBOOKRC";
const RC_FILE_NAME: &str = ".daybookrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  /// Built-in settings, before any rc
  /// file or override is applied.
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    cfg.map.insert(
      "color".to_string(),
      "on".to_string()
    );
    cfg.map.insert(
      "calendar.weekstart".to_string(),
      "monday".to_string()
    );
    cfg.map.insert(
      "prompt".to_string(),
      "daybook> ".to_string()
    );
    cfg.map.insert(
      "default.command".to_string(),
      "list".to_string()
    );

    cfg
  }

  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading daybookrc");
      cfg.load_file(&path, &mut vec![])?;
    } else {
      debug!(
        "no daybookrc found; using \
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

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn prompt(&self) -> String {
    self
      .get("prompt")
      .unwrap_or_default()
  }

  pub fn default_command(
    &self
  ) -> String {
    self
      .get("default.command")
      .unwrap_or_else(|| {
        "list".to_string()
      })
  }

  pub fn week_start(
    &self
  ) -> anyhow::Result<Weekday> {
    let raw = self
      .get("calendar.weekstart")
      .unwrap_or_else(|| {
        "monday".to_string()
      });
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "monday" => Ok(Weekday::Mon),
      | "sunday" => Ok(Weekday::Sun),
      | other => {
        Err(anyhow!(
          "invalid \
           calendar.weekstart: \
           {other} (expected monday \
           or sunday)"
        ))
      }
    }
  }

  /// `chain` holds the canonical paths of
  /// the files currently being read, outer
  /// first.
  #[tracing::instrument(skip(self, chain))]
  fn load_file(
    &mut self,
    path: &Path,
    chain: &mut Vec<PathBuf>
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
    let canonical =
      fs::canonicalize(&path)
        .with_context(|| {
          format!(
            "failed to resolve {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());
    chain.push(canonical);

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
          let target =
            fs::canonicalize(&include_path)
              .with_context(|| {
                format!(
                  "failed to resolve {}",
                  include_path.display()
                )
              })?;
          if chain.contains(&target) {
            return Err(anyhow!(
              "include cycle at {}:{}: \
               {} is already being \
               loaded",
              path.display(),
              line_num + 1,
              include_path.display()
            ));
          }
          self.load_file(
            &include_path,
            chain
          )?;
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

    chain.pop();
    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       daybookrc lookup"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
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

#[cfg(test)]
mod tests {
  use std::fs;

  use chrono::Weekday;
  use tempfile::tempdir;

  use super::Config;

  #[test]
  fn rc_file_overrides_defaults_and_follows_includes()
   {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("daybookrc");
    let extra =
      temp.path().join("extra.rc");

    fs::write(
      &rc,
      "# personal settings\n\
       color = off   # no ansi\n\
       \n\
       include extra.rc\n\
       include missing.rc\n"
    )
    .expect("write rc");
    fs::write(
      &extra,
      "calendar.weekstart=sunday\n"
    )
    .expect("write include");

    let cfg = Config::load(Some(&rc))
      .expect("load config");

    assert_eq!(
      cfg.get("color").as_deref(),
      Some("off")
    );
    assert_eq!(
      cfg
        .week_start()
        .expect("week start"),
      Weekday::Sun
    );
    assert_eq!(cfg.default_command(), "list");
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn malformed_line_is_rejected_with_location()
   {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("daybookrc");
    fs::write(&rc, "color=on\nbogus\n")
      .expect("write rc");

    let err = Config::load(Some(&rc))
      .expect_err("malformed rc");
    assert!(
      err.to_string().contains(":2:"),
      "unexpected error: {err}"
    );
  }

  #[test]
  fn include_cycle_is_rejected() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("daybookrc");
    let other =
      temp.path().join("other.rc");
    fs::write(&rc, "include daybookrc\n")
      .expect("write rc");

    let err = Config::load(Some(&rc))
      .expect_err("self include");
    assert!(
      err
        .to_string()
        .contains("include cycle"),
      "unexpected error: {err}"
    );

    fs::write(&rc, "include other.rc\n")
      .expect("write rc");
    fs::write(
      &other,
      "color=off\ninclude daybookrc\n"
    )
    .expect("write include");
    let err = Config::load(Some(&rc))
      .expect_err("mutual include");
    assert!(
      err
        .to_string()
        .contains("include cycle"),
      "unexpected error: {err}"
    );
  }

  #[test]
  fn same_file_may_be_included_twice() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("daybookrc");
    let shared =
      temp.path().join("shared.rc");
    fs::write(
      &rc,
      "include shared.rc\n\
       include shared.rc\n"
    )
    .expect("write rc");
    fs::write(&shared, "color=off\n")
      .expect("write include");

    let cfg = Config::load(Some(&rc))
      .expect("load config");
    assert_eq!(cfg.loaded_files.len(), 3);
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::defaults();
    cfg.apply_overrides([
      (
        "rc.prompt".to_string(),
        "> ".to_string()
      ),
      (
        "calendar.weekstart"
          .to_string(),
        "friday".to_string()
      )
    ]);

    assert_eq!(cfg.prompt(), "> ");
    assert!(cfg.week_start().is_err());
  }
}
