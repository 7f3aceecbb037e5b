//! Configuration loading and management
//!
//! Settings live in `config.toml` inside the data directory. Every key is
//! optional in the file; missing keys take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::parse_priority_arg;

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const KEYS: &[&str] = &[
    "todo_file",
    "done_file",
    "default_priority",
    "auto_commit",
    "auto_sync",
    "auto_sort",
];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Task list file name, relative to the data directory
    #[serde(default = "default_todo_file")]
    pub todo_file: String,

    /// Archive file name, relative to the data directory
    #[serde(default = "default_done_file")]
    pub done_file: String,

    /// Priority given to new tasks when none is passed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<char>,

    /// Commit after every write
    #[serde(default = "default_true")]
    pub auto_commit: bool,

    /// Push after each commit. Pulls run whenever a remote exists.
    #[serde(default = "default_true")]
    pub auto_sync: bool,

    /// Sort by priority on every write
    #[serde(default = "default_true")]
    pub auto_sort: bool,
}

fn default_todo_file() -> String {
    "todo.txt".to_string()
}

fn default_done_file() -> String {
    "done.txt".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            todo_file: default_todo_file(),
            done_file: default_done_file(),
            default_priority: None,
            auto_commit: true,
            auto_sync: true,
            auto_sort: true,
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from the data directory, or return defaults when
    /// the file does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    /// Save configuration to a file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Value of `key` rendered as text.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "todo_file" => self.todo_file.clone(),
            "done_file" => self.done_file.clone(),
            "default_priority" => self
                .default_priority
                .map(String::from)
                .unwrap_or_default(),
            "auto_commit" => self.auto_commit.to_string(),
            "auto_sync" => self.auto_sync.to_string(),
            "auto_sort" => self.auto_sort.to_string(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set `key` from text. Booleans accept `true/yes/on/1` and
    /// `false/no/off/0`; an empty or `none` priority clears it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "todo_file" => self.todo_file = file_name(key, value)?,
            "done_file" => self.done_file = file_name(key, value)?,
            "default_priority" => {
                let value = value.trim();
                self.default_priority = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(parse_priority_arg(value).map_err(|err| {
                        Error::InvalidConfig(format!("default_priority: {err}"))
                    })?)
                };
            }
            "auto_commit" => self.auto_commit = parse_bool(key, value)?,
            "auto_sync" => self.auto_sync = parse_bool(key, value)?,
            "auto_sort" => self.auto_sort = parse_bool(key, value)?,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Restore every key to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `(key, value)` pairs in [`KEYS`] order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).ok().map(|value| (*key, value)))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        file_name("todo_file", &self.todo_file)?;
        file_name("done_file", &self.done_file)?;
        if let Some(letter) = self.default_priority {
            if !letter.is_ascii_uppercase() {
                return Err(Error::InvalidConfig(format!(
                    "default_priority must be a letter A-Z, got '{letter}'"
                )));
            }
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> Error {
    Error::InvalidConfig(format!(
        "unknown key '{key}' (expected one of: {})",
        KEYS.join(", ")
    ))
}

fn file_name(key: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidConfig(format!("{key} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(Error::InvalidConfig(format!(
            "{key} expects a boolean (true/false), got '{other}'"
        ))),
    }
}
