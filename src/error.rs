//! Error types for todoline
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, missing repo, bad task number)
//! - 4: Operation failed (git error, IO error)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the todoline CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for todoline operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Not a git repository: {0}")]
    NotARepo(PathBuf),

    #[error("Repository not found from {0}")]
    RepoNotFound(PathBuf),

    #[error("Path {path} is outside the repository at {root}")]
    PathOutsideRepo { path: PathBuf, root: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task number {number} out of range (1-{len})")]
    TaskNumberOutOfRange { number: usize, len: usize },

    // Operation failures (exit code 4)
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotARepo(_)
            | Error::RepoNotFound(_)
            | Error::PathOutsideRepo { .. }
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNumberOutOfRange { .. } => exit_codes::USER_ERROR,

            Error::Git(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True when the caller broke an API contract rather than hitting a
    /// runtime failure. Staging a path outside the repository is the only
    /// such case.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::PathOutsideRepo { .. })
    }

    /// Structured details for JSON error output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::PathOutsideRepo { path, root } => Some(serde_json::json!({
                "path": path,
                "root": root,
            })),
            Error::TaskNumberOutOfRange { number, len } => Some(serde_json::json!({
                "number": number,
                "len": len,
            })),
            _ => None,
        }
    }
}

/// Result type alias for todoline operations
pub type Result<T> = std::result::Result<T, Error>;
