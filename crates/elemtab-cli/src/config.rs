// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use elemtab_app::{DEFAULT_DIALOG_WIDTH, TableSettings};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::APP_NAME;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_DEBOUNCE: &str = "2s";
const DEFAULT_LOG_LEVEL: &str = "info";
const MIN_DIALOG_WIDTH: u16 = 20;
const MAX_DEBOUNCE: Duration = Duration::from_secs(60 * 60);
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub dialog: Dialog,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            filter: Filter::default(),
            dialog: Dialog::default(),
            data: Data::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Filter {
    pub debounce: Option<String>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            debounce: Some(DEFAULT_DEBOUNCE.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dialog {
    pub width: Option<u16>,
}

impl Default for Dialog {
    fn default() -> Self {
        Self {
            width: Some(DEFAULT_DIALOG_WIDTH),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Data {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("ELEMTAB_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set ELEMTAB_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` at the top",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(debounce) = &self.filter.debounce {
            let parsed = parse_duration(debounce)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "filter.debounce in {} must be positive, got {}",
                    path.display(),
                    debounce
                );
            }
            if parsed > MAX_DEBOUNCE {
                bail!(
                    "filter.debounce in {} must be at most 1h (3600s), got {}",
                    path.display(),
                    debounce
                );
            }
        }

        if let Some(width) = self.dialog.width
            && width < MIN_DIALOG_WIDTH
        {
            bail!(
                "dialog.width in {} must be at least {}, got {}",
                path.display(),
                MIN_DIALOG_WIDTH,
                width
            );
        }

        if let Some(data_path) = &self.data.path
            && data_path.trim().is_empty()
        {
            bail!(
                "data.path in {} is empty; remove it to use the built-in records",
                path.display()
            );
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        Ok(())
    }

    pub fn debounce(&self) -> Result<Duration> {
        parse_duration(self.filter.debounce.as_deref().unwrap_or(DEFAULT_DEBOUNCE))
    }

    pub fn dialog_width(&self) -> u16 {
        self.dialog.width.unwrap_or(DEFAULT_DIALOG_WIDTH)
    }

    pub fn table_settings(&self) -> Result<TableSettings> {
        Ok(TableSettings {
            debounce: self.debounce()?,
            dialog_width: self.dialog_width(),
        })
    }

    pub fn data_path(&self) -> Option<PathBuf> {
        self.data.path.as_deref().map(PathBuf::from)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let root = dirs::state_dir()
            .or_else(dirs::cache_dir)
            .ok_or_else(|| anyhow!("cannot resolve a log directory; set [log].path"))?;
        Ok(root.join(APP_NAME).join(format!("{APP_NAME}.log")))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# elemtab config\n# Place this file at: {}\n\nversion = 1\n\n[filter]\n# Quiet time after the last keystroke before the table refilters.\ndebounce = \"{}\"\n\n[dialog]\nwidth = {}\n\n[data]\n# Optional JSON array of {{position, name, weight, symbol}} records.\n# path = \"/absolute/path/to/records.json\"\n\n[log]\nlevel = \"{}\"\n# path = \"/absolute/path/to/elemtab.log\"\n",
            path.display(),
            DEFAULT_DEBOUNCE,
            DEFAULT_DIALOG_WIDTH,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 2s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.debounce()?, Duration::from_secs(2));
        assert_eq!(config.dialog_width(), 40);
        assert_eq!(config.log_level(), "info");
        assert!(config.data_path().is_none());
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[filter]\ndebounce = \"1s\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        assert!(error.to_string().contains("version = 1"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[filter]\ndebounce = \"750ms\"\n[dialog]\nwidth = 60\n[data]\npath = \"/srv/records.json\"\n[log]\nlevel = \"debug\"\npath = \"/tmp/elemtab.log\"\n",
        )?;

        let config = Config::load(&path)?;
        let settings = config.table_settings()?;
        assert_eq!(settings.debounce, Duration::from_millis(750));
        assert_eq!(settings.dialog_width, 60);
        assert_eq!(config.data_path(), Some(PathBuf::from("/srv/records.json")));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_path()?, PathBuf::from("/tmp/elemtab.log"));
        Ok(())
    }

    #[test]
    fn partial_section_falls_back_to_defaults() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[dialog]\n")?;
        let config = Config::load(&path)?;
        assert_eq!(config.dialog_width(), 40);
        assert_eq!(config.debounce()?, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn zero_debounce_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[filter]\ndebounce = \"0ms\"\n")?;
        let error = Config::load(&path).expect_err("zero debounce should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn debounce_above_one_hour_is_rejected() -> Result<()> {
        for debounce in ["18446744073709551615s", "61m", "3601s"] {
            let (_temp, path) =
                write_config(&format!("version = 1\n[filter]\ndebounce = \"{debounce}\"\n"))?;
            let error = Config::load(&path).expect_err("huge debounce should fail");
            assert!(
                error.to_string().contains("at most 1h"),
                "{debounce}: {error}"
            );
        }

        let (_temp, path) = write_config("version = 1\n[filter]\ndebounce = \"60m\"\n")?;
        assert_eq!(Config::load(&path)?.debounce()?, Duration::from_secs(3600));
        Ok(())
    }

    #[test]
    fn overflowing_minutes_are_rejected_while_parsing() {
        let error = parse_duration("307445734561825861m").expect_err("overflow should fail");
        assert!(error.to_string().contains("too large"));
    }

    #[test]
    fn narrow_dialog_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[dialog]\nwidth = 8\n")?;
        let error = Config::load(&path).expect_err("narrow dialog should fail");
        assert!(error.to_string().contains("at least 20"));
        Ok(())
    }

    #[test]
    fn unknown_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"loud\"\n")?;
        let error = Config::load(&path).expect_err("unknown level should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn empty_data_path_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[data]\npath = \"  \"\n")?;
        let error = Config::load(&path).expect_err("empty data path should fail");
        assert!(error.to_string().contains("data.path"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("ELEMTAB_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("ELEMTAB_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("2s")?, Duration::from_secs(2));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let error = parse_duration("soon").expect_err("invalid duration should fail");
        assert!(error.to_string().contains("invalid duration"));
    }

    #[test]
    fn example_config_round_trips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        std::fs::write(&path, &example)?;

        let config = Config::load(&path)?;
        assert_eq!(config.debounce()?, Duration::from_secs(2));
        assert!(example.contains("[filter]"));
        assert!(example.contains("[dialog]"));
        assert!(example.contains("[data]"));
        assert!(example.contains("[log]"));
        Ok(())
    }
}
