use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use genvid_core::command::CommandOptions;
use genvid_worker::RunnerConfig;

use crate::store::DEFAULT_RETAINED_JOBS;

/// A malformed environment variable.
#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to a local model
/// checkout. Override via environment variables (or a `.env` file).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins; empty means any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Generations allowed to run at once (default: `1`).
    pub max_concurrent_jobs: usize,
    /// Finished job records kept in memory (default: `500`).
    pub retained_jobs: usize,
    /// How `generate.py` is launched.
    pub runner: RunnerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `HOST`                    | `0.0.0.0`                |
    /// | `PORT`                    | `8000`                   |
    /// | `CORS_ORIGINS`            | *(any)*                  |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                     |
    /// | `GENVID_ROOT`             | `.`                      |
    /// | `GENVID_OUTPUT_DIR`       | `$GENVID_ROOT`           |
    /// | `GENVID_CKPT_ROOT`        | `$GENVID_ROOT`           |
    /// | `GENVID_PYTHON`           | `python`                 |
    /// | `GENVID_GPUS`             | `1`                      |
    /// | `GENERATION_TIMEOUT_SECS` | `1200`                   |
    /// | `MAX_CONCURRENT_JOBS`     | `1`                      |
    /// | `MAX_RETAINED_JOBS`       | `500`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_var("PORT", 8000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", 30)?;

        let max_concurrent_jobs: usize = parse_var("MAX_CONCURRENT_JOBS", 1)?;
        if max_concurrent_jobs == 0 {
            return Err(ConfigError {
                var: "MAX_CONCURRENT_JOBS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let retained_jobs: usize = parse_var("MAX_RETAINED_JOBS", DEFAULT_RETAINED_JOBS)?;

        let root = PathBuf::from(std::env::var("GENVID_ROOT").unwrap_or_else(|_| ".".into()));
        let output_dir = std::env::var("GENVID_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| root.clone());
        let ckpt_root = std::env::var("GENVID_CKPT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| root.clone());

        let gpus: u32 = parse_var("GENVID_GPUS", 1)?;
        if gpus == 0 {
            return Err(ConfigError {
                var: "GENVID_GPUS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let runner = RunnerConfig {
            workdir: root,
            output_dir,
            command: CommandOptions {
                python: std::env::var("GENVID_PYTHON").unwrap_or_else(|_| "python".into()),
                ckpt_root,
                gpus,
                ..Default::default()
            },
            timeout: Duration::from_secs(parse_var("GENERATION_TIMEOUT_SECS", 1200)?),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_concurrent_jobs,
            retained_jobs,
            runner,
        })
    }
}

fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
