//! The pull → stage → commit → push pipeline.
//!
//! [`run`] is written against [`SyncBackend`] rather than a concrete git
//! engine so the failure paths can be driven without a network.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::Result;

/// Operations the pipeline needs from a version-control engine.
pub trait SyncBackend {
    fn is_repo(&self) -> bool;
    fn has_remote(&self) -> bool;
    fn pull(&self) -> bool;
    /// `Err` only for a contract violation (path outside the repository).
    fn stage_changes(&self, path: Option<&Path>) -> Result<bool>;
    /// Whether the staged index matches HEAD.
    fn is_clean(&self) -> Result<bool>;
    fn commit(&self, message: &str) -> bool;
    fn push(&self) -> bool;
}

/// Switches read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub auto_commit: bool,
    pub auto_sync: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            auto_commit: true,
            auto_sync: true,
        }
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    NotARepo,
    StageFailed,
    /// A path outside the repository was handed in.
    ContractViolation,
    /// Nothing differed from HEAD after staging.
    Clean,
    /// Changes are staged and left for the user to commit.
    Staged,
    CommitFailed,
    /// `pushed` is `None` when push was not attempted.
    Committed { pushed: Option<bool> },
}

impl SyncOutcome {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            SyncOutcome::Clean | SyncOutcome::Staged | SyncOutcome::Committed { .. }
        )
    }
}

/// Run the pipeline:
///
/// 1. fail when there is no repository;
/// 2. pull first when a remote exists; a failed pull is logged and the run
///    continues;
/// 3. stage `path` (everything when `None`);
/// 4. succeed without committing when the index matches HEAD;
/// 5. stop after staging when `auto_commit` is off;
/// 6. commit with `message`;
/// 7. push when `auto_sync` is set and a remote exists. A failed push is
///    logged but the commit still counts as success.
pub fn run<B: SyncBackend + ?Sized>(
    backend: &B,
    path: Option<&Path>,
    message: &str,
    options: SyncOptions,
) -> SyncOutcome {
    if !backend.is_repo() {
        debug!("sync skipped: not a git repository");
        return SyncOutcome::NotARepo;
    }

    let remote = backend.has_remote();
    if remote && !backend.pull() {
        warn!("pull failed; continuing with local changes");
    }

    match backend.stage_changes(path) {
        Ok(true) => {}
        Ok(false) => {
            warn!("sync aborted: staging failed");
            return SyncOutcome::StageFailed;
        }
        Err(err) => {
            warn!("sync aborted: {err}");
            return SyncOutcome::ContractViolation;
        }
    }

    match backend.is_clean() {
        Ok(true) => {
            debug!("nothing to commit");
            return SyncOutcome::Clean;
        }
        Ok(false) => {}
        Err(err) => {
            warn!("sync aborted: unable to read status: {err}");
            return SyncOutcome::StageFailed;
        }
    }

    if !options.auto_commit {
        info!("changes staged; auto_commit is off");
        return SyncOutcome::Staged;
    }

    if !backend.commit(message) {
        return SyncOutcome::CommitFailed;
    }

    let pushed = if options.auto_sync && remote {
        let ok = backend.push();
        if !ok {
            warn!("commit kept locally; push failed");
        }
        Some(ok)
    } else {
        None
    };
    SyncOutcome::Committed { pushed }
}
