//! Application configuration management.
//!
//! Configuration is read from environment variables with `envy`. A dotenv
//! file is loaded first when present; its path comes from the `--config`
//! command line flag and defaults to `.env`.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "rekening_service", about = "Banking account microservice")]
pub struct Args {
    /// Path to a dotenv file with configuration values
    #[arg(long, default_value = ".env")]
    pub config: PathBuf,
}

/// Most digits an `i64` id can have, which is below the `no_rekening` column width.
pub const MAX_ACCOUNT_NUMBER_WIDTH: usize = 19;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("ACCOUNT_NUMBER_WIDTH must be between 1 and {max}, got {0}", max = MAX_ACCOUNT_NUMBER_WIDTH)]
    AccountNumberWidth(usize),
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `DATABASE_ACQUIRE_TIMEOUT_SECS` (optional): pool acquire timeout, defaults to 5
/// - `ACCOUNT_NUMBER_WIDTH` (optional): digits in a generated account number, defaults to 12
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_acquire_timeout_secs")]
    pub database_acquire_timeout_secs: u64,

    #[serde(default = "default_account_number_width")]
    pub account_number_width: usize,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

/// Width of `no_rekening` when `ACCOUNT_NUMBER_WIDTH` is not set.
pub fn default_account_number_width() -> usize {
    12
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// The dotenv file at `path` is optional. Variables already present in
    /// the process environment win over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - `ACCOUNT_NUMBER_WIDTH` is 0 or more than [`MAX_ACCOUNT_NUMBER_WIDTH`]
    pub fn from_env(path: &Path) -> Result<Self, ConfigError> {
        if dotenvy::from_path(path).is_err() {
            tracing::debug!(path = %path.display(), "No dotenv file loaded");
        }

        Self::from_vars(std::env::vars())
    }

    /// Deserialize configuration from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)?;

        if !(1..=MAX_ACCOUNT_NUMBER_WIDTH).contains(&config.account_number_width) {
            return Err(ConfigError::AccountNumberWidth(config.account_number_width));
        }

        Ok(config)
    }
}
