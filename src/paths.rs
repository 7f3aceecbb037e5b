//! Locations of the data directory and the files inside it.

use std::env;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::config::Config;
use crate::error::{Error, Result};

pub const DIRECTORY_ENV: &str = "TODOLINE_DIRECTORY";
pub const TODO_FILE_ENV: &str = "TODO_FILE";
pub const DONE_FILE_ENV: &str = "DONE_FILE";

/// Directory name under the home directory when nothing else is configured.
pub const DEFAULT_DIR_NAME: &str = ".todoline";

/// Resolved file locations for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub dir: PathBuf,
    pub todo_file: PathBuf,
    pub done_file: PathBuf,
}

impl Paths {
    /// Resolve the data directory: `explicit` (the `--dir` flag), then
    /// `$TODOLINE_DIRECTORY`, then `~/.todoline`.
    pub fn data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = env_path(DIRECTORY_ENV) {
            return Ok(dir);
        }
        let base = BaseDirs::new().ok_or_else(|| {
            Error::InvalidConfig(format!(
                "cannot determine home directory; set {DIRECTORY_ENV}"
            ))
        })?;
        Ok(base.home_dir().join(DEFAULT_DIR_NAME))
    }

    /// Task and archive files for `dir`, honoring `$TODO_FILE` and
    /// `$DONE_FILE`.
    pub fn resolve(dir: PathBuf, config: &Config) -> Self {
        let todo_file = env_path(TODO_FILE_ENV).unwrap_or_else(|| dir.join(&config.todo_file));
        let done_file = env_path(DONE_FILE_ENV).unwrap_or_else(|| dir.join(&config.done_file));
        Self {
            dir,
            todo_file,
            done_file,
        }
    }

    /// Create the data directory if it is missing.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
