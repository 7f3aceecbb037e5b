//! The task file.
//!
//! [`TaskStore`] reads and rewrites one todo.txt file. When a
//! [`SyncEngine`] is bound, reads pull from the remote first and writes are
//! followed by a sync. A directory without a repository is a normal state:
//! the store then behaves as a plain file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::codec;
use crate::config::Config;
use crate::error::Result;
use crate::git::SyncEngine;
use crate::ops;
use crate::sync::{SyncOptions, SyncOutcome};
use crate::task::Task;

/// Write-time behavior, usually taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub auto_sort: bool,
    pub auto_commit: bool,
    pub auto_sync: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            auto_sort: config.auto_sort,
            auto_commit: config.auto_commit,
            auto_sync: config.auto_sync,
        }
    }
}

impl StoreOptions {
    fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            auto_commit: self.auto_commit,
            auto_sync: self.auto_sync,
        }
    }
}

/// What happened to version control after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No engine bound to the store.
    Unbound,
    Synced(SyncOutcome),
    Failed(SyncOutcome),
}

impl SyncStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncStatus::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
    engine: Option<SyncEngine>,
    options: StoreOptions,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>, engine: Option<SyncEngine>, options: StoreOptions) -> Self {
        Self {
            path: path.into(),
            engine,
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn engine(&self) -> Option<&SyncEngine> {
        self.engine.as_ref()
    }

    /// Load every task in the file. A missing file is an empty list.
    ///
    /// With a bound engine and a configured remote, the remote is pulled
    /// first. A failed pull is logged and the local file is read anyway.
    pub fn read(&self) -> Result<Vec<Task>> {
        if let Some(engine) = &self.engine {
            if engine.is_repo() && engine.has_remote() && !engine.pull() {
                warn!(path = %self.path.display(), "reading local copy; pull failed");
            }
        }

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "task file missing; starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(decode(&self.path, &bytes))
    }

    /// Replace the file with `tasks` and sync when an engine is bound.
    ///
    /// The list is sorted in place first when `auto_sort` is on. The file is
    /// written atomically; a sync failure never undoes the local write.
    pub fn write(&self, tasks: &mut [Task]) -> Result<SyncStatus> {
        if self.options.auto_sort {
            ops::sort_by_priority(tasks);
        }
        write_atomic(&self.path, &encode(tasks))?;
        debug!(path = %self.path.display(), count = tasks.len(), "wrote task file");
        Ok(self.sync())
    }

    /// Append one task through a read and a full rewrite.
    pub fn append(&self, task: Task) -> Result<SyncStatus> {
        let mut tasks = self.read()?;
        tasks.push(task);
        self.write(&mut tasks)
    }

    /// Commit message used for writes: `Update <file name>`.
    pub fn commit_message(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        format!("Update {name}")
    }

    fn sync(&self) -> SyncStatus {
        let Some(engine) = &self.engine else {
            return SyncStatus::Unbound;
        };
        if !engine.is_repo() {
            return SyncStatus::Unbound;
        }
        let outcome = engine.sync_report(
            Some(&self.path),
            &self.commit_message(),
            self.options.sync_options(),
        );
        if outcome.is_success() {
            SyncStatus::Synced(outcome)
        } else {
            warn!(path = %self.path.display(), ?outcome, "sync after write failed");
            SyncStatus::Failed(outcome)
        }
    }
}

/// Decode file contents. Lines that are not valid UTF-8 are skipped with a
/// warning; blank lines are dropped.
fn decode(path: &Path, bytes: &[u8]) -> Vec<Task> {
    let mut tasks = Vec::new();
    for (idx, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(err) => {
                warn!(path = %path.display(), line = idx + 1, "skipping unreadable line: {err}");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        tasks.push(codec::parse(line));
    }
    tasks
}

fn encode(tasks: &[Task]) -> String {
    let mut out = String::new();
    for task in tasks {
        out.push_str(&codec::serialize(task));
        out.push('\n');
    }
    out
}

/// Write to a temporary sibling and rename it over `path`.
fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(data.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
