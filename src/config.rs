//! Where the store lives and how long a statement may wait on a locked file.
//! Defaults put the database beneath the user's home directory; both values
//! can be overridden from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".school-records";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "school.sqlite";
/// Default wait on a locked database before a statement fails.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Overrides the database file location.
pub const DB_PATH_ENV: &str = "SCHOOL_RECORDS_DB";
/// Overrides the busy timeout, in milliseconds.
pub const BUSY_TIMEOUT_ENV: &str = "SCHOOL_RECORDS_BUSY_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite file backing the store. Parent directories are created on open.
    pub path: PathBuf,
    /// Upper bound on how long a statement waits for a lock.
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration from an arbitrary variable source, falling back
    /// to `~/.school-records/school.sqlite` and a five second busy timeout.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = match lookup(DB_PATH_ENV).filter(|value| !value.trim().is_empty()) {
            Some(value) => PathBuf::from(value),
            None => default_db_path()?,
        };

        let busy_timeout = match lookup(BUSY_TIMEOUT_ENV) {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().with_context(|| {
                    format!("{BUSY_TIMEOUT_ENV} must be milliseconds, got {raw:?}")
                })?;
                Duration::from_millis(millis)
            }
            None => DEFAULT_BUSY_TIMEOUT,
        };

        Ok(Self { path, busy_timeout })
    }
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}
