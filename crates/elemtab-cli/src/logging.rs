// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Overrides the configured level with a full `EnvFilter` directive string.
pub const LOG_ENV: &str = "ELEMTAB_LOG";

const CRATE_TARGETS: [&str; 3] = ["elemtab", "elemtab_app", "elemtab_tui"];

/// Installs a file-backed subscriber. The terminal belongs to the table, so
/// nothing is ever written to stderr once this returns.
pub fn init(path: &Path, level: &str) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("create log directory {}", dir.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].path to a writable file",
                path.display()
            )
        })?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(directives(level)));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;

    tracing::info!(path = %path.display(), "logging initialized");
    Ok(())
}

fn directives(level: &str) -> String {
    let mut parts = vec!["warn".to_owned()];
    parts.extend(CRATE_TARGETS.iter().map(|target| format!("{target}={level}")));
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::directives;

    #[test]
    fn directives_scope_level_to_own_crates() {
        assert_eq!(
            directives("debug"),
            "warn,elemtab=debug,elemtab_app=debug,elemtab_tui=debug"
        );
    }
}
