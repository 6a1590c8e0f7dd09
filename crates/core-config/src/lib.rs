//! Configuration loading and parsing.
//!
//! `fanout.toml` supplies defaults for the run limits, timings, and output
//! behavior; command-line flags override whatever the file provides. The
//! local working directory is preferred over the platform config dir, and a
//! file that fails to parse falls back to defaults with a warning rather
//! than aborting the run. Unknown fields are ignored so the format can grow
//! without breaking older files.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use std::{fs, thread};

use anyhow::Result;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

/// Upper bound on concurrent children regardless of what the file or the
/// flags ask for.
pub const MAX_JOBS: usize = 256;

const CONFIG_FILE: &str = "fanout.toml";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LimitsConfig {
    /// Max concurrent children; 0 means the host parallelism count.
    #[serde(default)]
    pub jobs: usize,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub repeat: u32,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TimingConfig {
    /// Sleep between dispatches, e.g. `"150ms"`.
    #[serde(default, deserialize_with = "de_duration")]
    pub delay: Option<Duration>,
    /// Per-child wall clock limit, e.g. `"30s"`.
    #[serde(default, deserialize_with = "de_duration")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub defer: bool,
    /// Where deferred capture files are created.
    #[serde(default)]
    pub temp: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RunSectionConfig {
    #[serde(default)]
    pub shell: bool,
    #[serde(default)]
    pub env: bool,
    /// Child working directory.
    #[serde(default)]
    pub working: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub run: RunSectionConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,
    pub file: ConfigFile,
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("fanout").join(CONFIG_FILE);
    }
    PathBuf::from(CONFIG_FILE)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                info!(target: "config", path = %path.display(), "config_loaded");
                Ok(Config {
                    raw: Some(content),
                    file,
                })
            }
            Err(err) => {
                warn!(target: "config", path = %path.display(), %err, "config_parse_failed_using_defaults");
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

/// Resolve a jobs request: 0 means the host parallelism count, and the hard
/// ceiling of [`MAX_JOBS`] applies either way.
pub fn effective_jobs(requested: usize) -> usize {
    let resolved = if requested == 0 {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    } else {
        requested
    };
    let clamped = resolved.min(MAX_JOBS);
    if clamped != resolved {
        info!(
            target: "config",
            requested,
            resolved,
            clamped,
            "jobs_clamped"
        );
    }
    clamped
}

/// Parse a human duration: `150ms`, `2s`, `3m`, `1h`, or bare seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }
    let unit_at = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(unit_at);
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration {input:?}"))?;
    let seconds = match unit {
        "ms" => value / 1000.0,
        "" | "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        _ => return Err(format!("unknown duration unit {unit:?} in {input:?}")),
    };
    Duration::try_from_secs_f64(seconds).map_err(|_| format!("invalid duration {input:?}"))
}

fn de_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(text) => parse_duration(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
