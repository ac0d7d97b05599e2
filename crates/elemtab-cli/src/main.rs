// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use elemtab_app::{AppState, ElementTable, RecordStore};
use std::env;
use std::path::PathBuf;
use tracing::info;

pub(crate) const APP_NAME: &str = "elemtab";

/// Flag reference printed by `--help`, in display order.
const USAGE: [(&str, &str); 7] = [
    ("--config <path>", "Read settings from this TOML file"),
    ("--data <path>", "Show records from a JSON array instead of the built-ins"),
    ("--check", "Load config and records, report the record count, exit"),
    ("--print-config-path", "Print the resolved config path"),
    ("--print-example-config", "Print a commented config template"),
    ("-h, --help", "Show this help"),
    ("(no flags)", "Open the element table"),
];

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let invocation = Invocation::parse(env::args().skip(1), Config::default_path()?)?;
    match invocation.action {
        Action::Help => {
            print_help();
            return Ok(());
        }
        Action::PrintConfigPath => {
            println!("{}", invocation.config_path.display());
            return Ok(());
        }
        Action::PrintExampleConfig => {
            print!("{}", Config::example_config(&invocation.config_path));
            return Ok(());
        }
        Action::Check | Action::Browse => {}
    }

    let config = Config::load(&invocation.config_path).with_context(|| {
        format!(
            "load config {}; run `elemtab --print-example-config` to generate a template",
            invocation.config_path.display()
        )
    })?;
    let settings = config.table_settings()?;
    let store = load_store(invocation.data_path.clone().or_else(|| config.data_path()))?;

    if invocation.action == Action::Check {
        println!("ok: {} records", store.len());
        return Ok(());
    }

    logging::init(&config.log_path()?, config.log_level())?;
    info!(
        records = store.len(),
        config = %invocation.config_path.display(),
        "starting element table"
    );

    let mut table = ElementTable::new(store, settings);
    elemtab_tui::run_app(&mut AppState::default(), &mut table)
}

fn load_store(data_path: Option<PathBuf>) -> Result<RecordStore> {
    let Some(path) = data_path else {
        return Ok(RecordStore::builtin());
    };
    RecordStore::load_json(&path).with_context(|| {
        format!(
            "open records {} -- fix the file or drop --data / [data].path to use built-ins",
            path.display()
        )
    })
}

/// What a single run does. Ordered by precedence: when several are asked
/// for, the greatest one runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Action {
    Browse,
    Check,
    PrintExampleConfig,
    PrintConfigPath,
    Help,
}

impl Action {
    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "--check" => Some(Self::Check),
            "--print-example-config" => Some(Self::PrintExampleConfig),
            "--print-config-path" => Some(Self::PrintConfigPath),
            "-h" | "--help" => Some(Self::Help),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    action: Action,
    config_path: PathBuf,
    data_path: Option<PathBuf>,
}

impl Invocation {
    /// Accepts `--flag value` and `--flag=value` for the path flags.
    fn parse<I, S>(args: I, default_config_path: PathBuf) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut invocation = Self {
            action: Action::Browse,
            config_path: default_config_path,
            data_path: None,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            if let Some(action) = Action::from_flag(arg) {
                invocation.action = invocation.action.max(action);
                continue;
            }

            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_owned())),
                None => (arg, None),
            };
            if flag != "--config" && flag != "--data" {
                bail!("unknown argument {arg:?}; run with --help to see supported options");
            }

            let value = match inline {
                Some(value) => value,
                None => args
                    .next()
                    .map(|value| value.as_ref().to_owned())
                    .ok_or_else(|| anyhow!("{flag} requires a file path"))?,
            };
            if value.is_empty() {
                bail!("{flag} requires a file path");
            }

            let path = PathBuf::from(value);
            if flag == "--config" {
                invocation.config_path = path;
            } else {
                invocation.data_path = Some(path);
            }
        }

        Ok(invocation)
    }
}

fn print_help() {
    println!("{APP_NAME}: browse, filter and edit a table of elements");
    println!();
    for (flag, about) in USAGE {
        println!("  {flag:<24} {about}");
    }
}
