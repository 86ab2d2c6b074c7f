//! Engine configuration resolved from `WATCHSHELF_*` environment variables.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};

use crate::engine::classify::{DEFAULT_COMPLETE_THRESHOLD, DEFAULT_MIN_PROGRESS};
use crate::engine::{LedgerOptions, ShelfOptions, Thresholds};
use crate::paths::{catalog_file_path, database_file_path};

pub const ENV_MIN_PROGRESS: &str = "WATCHSHELF_MIN_PROGRESS";
pub const ENV_COMPLETE_THRESHOLD: &str = "WATCHSHELF_COMPLETE_THRESHOLD";
pub const ENV_MAX_ENTRIES: &str = "WATCHSHELF_MAX_ENTRIES";
pub const ENV_CONTINUE_LIMIT: &str = "WATCHSHELF_CONTINUE_LIMIT";
pub const ENV_BECAUSE_LIMIT: &str = "WATCHSHELF_BECAUSE_LIMIT";
pub const ENV_ONE_PER_SERIES: &str = "WATCHSHELF_ONE_PER_SERIES";
pub const ENV_CONTINUE_WATCHING: &str = "WATCHSHELF_CONTINUE_WATCHING";
pub const ENV_DB: &str = "WATCHSHELF_DB";
pub const ENV_CATALOG: &str = "WATCHSHELF_CATALOG";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub ledger: LedgerOptions,
    pub continue_watching: ShelfOptions,
    pub because_you_watched: ShelfOptions,
    pub enable_continue_watching: bool,
    pub db_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerOptions::default(),
            continue_watching: ShelfOptions::default(),
            because_you_watched: ShelfOptions::default(),
            enable_continue_watching: true,
            db_path: None,
            catalog_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var_os(name))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let defaults = Self::default();

        let min_progress = parse_var(&lookup, ENV_MIN_PROGRESS)?.unwrap_or(DEFAULT_MIN_PROGRESS);
        let complete =
            parse_var(&lookup, ENV_COMPLETE_THRESHOLD)?.unwrap_or(DEFAULT_COMPLETE_THRESHOLD);
        let thresholds = Thresholds::new(min_progress, complete).map_err(|err| {
            anyhow!("invalid {ENV_MIN_PROGRESS}/{ENV_COMPLETE_THRESHOLD}: {err}")
        })?;

        let max_entries =
            parse_var(&lookup, ENV_MAX_ENTRIES)?.unwrap_or(defaults.ledger.max_entries);
        if max_entries == 0 {
            bail!("{ENV_MAX_ENTRIES} must be at least 1");
        }

        let continue_watching = ShelfOptions {
            limit: parse_var(&lookup, ENV_CONTINUE_LIMIT)?
                .unwrap_or(defaults.continue_watching.limit),
            one_per_series: parse_flag(&lookup, ENV_ONE_PER_SERIES)?
                .unwrap_or(defaults.continue_watching.one_per_series),
        };
        let because_you_watched = ShelfOptions {
            limit: parse_var(&lookup, ENV_BECAUSE_LIMIT)?
                .unwrap_or(defaults.because_you_watched.limit),
            ..defaults.because_you_watched
        };

        Ok(Self {
            ledger: LedgerOptions {
                thresholds,
                max_entries,
            },
            continue_watching,
            because_you_watched,
            enable_continue_watching: parse_flag(&lookup, ENV_CONTINUE_WATCHING)?
                .unwrap_or(defaults.enable_continue_watching),
            db_path: path_var(&lookup, ENV_DB),
            catalog_path: path_var(&lookup, ENV_CATALOG),
        })
    }

    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => database_file_path(),
        }
    }

    pub fn resolved_catalog_path(&self) -> Result<PathBuf> {
        match &self.catalog_path {
            Some(path) => Ok(path.clone()),
            None => catalog_file_path(),
        }
    }
}

fn raw_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<OsString>,
{
    let value = lookup(name)?;
    let value = value.to_string_lossy().trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<OsString>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw_var(lookup, name)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("invalid value {value:?} for {name}"))
        })
        .transpose()
}

fn parse_flag<F>(lookup: &F, name: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<OsString>,
{
    raw_var(lookup, name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("invalid value {value:?} for {name}, expected true or false")),
        })
        .transpose()
}

fn path_var<F>(lookup: &F, name: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    lookup(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
