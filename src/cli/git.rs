//! `todoline git` subcommands.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::sync::{SyncOptions, SyncOutcome};

use super::{Globals, Session};

/// Commit message for `git sync`.
pub const MANUAL_SYNC_MESSAGE: &str = "Manual sync of todo files";

#[derive(Serialize)]
struct InitReport {
    root: PathBuf,
    created: bool,
}

pub fn run_init(globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let existed = session.engine.is_repo();
    if !session.engine.init() {
        return Err(Error::OperationFailed(format!(
            "could not initialize a git repository in {}",
            session.paths.dir.display()
        )));
    }

    let header = if existed {
        "git init: repository already exists"
    } else {
        "git init: initialized repository"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("root", session.paths.dir.display().to_string());
    if !session.engine.has_remote() {
        human.push_next_step("todoline git remote origin <url>");
    }
    let report = InitReport {
        root: session.paths.dir.clone(),
        created: !existed,
    };
    emit_success(globals.output(), "git init", &report, Some(&human))
}

#[derive(Serialize)]
struct RemoteReport<'a> {
    name: &'a str,
    url: &'a str,
}

pub fn run_remote(name: &str, url: &str, globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    require_repo(&session)?;
    if !session.engine.add_remote(name, url) {
        return Err(Error::OperationFailed(format!(
            "could not configure remote '{name}'"
        )));
    }

    let mut human = HumanOutput::new(format!("Remote {name} -> {url}"));
    human.push_next_step("todoline git sync");
    emit_success(
        globals.output(),
        "git remote",
        &RemoteReport { name, url },
        Some(&human),
    )
}

#[derive(Serialize)]
struct SyncReport {
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pushed: Option<bool>,
}

pub fn run_sync(globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    require_repo(&session)?;
    // A manual sync always talks to the remote, whatever auto_sync says.
    let options = SyncOptions {
        auto_commit: true,
        auto_sync: true,
    };
    let outcome = session
        .engine
        .sync_report(None, MANUAL_SYNC_MESSAGE, options);
    if !outcome.is_success() {
        return Err(Error::OperationFailed(format!("sync failed ({outcome:?})")));
    }

    let (header, pushed) = match outcome {
        SyncOutcome::Clean => ("No local changes to commit.", None),
        SyncOutcome::Committed { pushed } => ("Committed local changes.", pushed),
        _ => ("Changes staged.", None),
    };
    let mut human = HumanOutput::new(header);
    match pushed {
        Some(true) => human.push_summary("push", "ok"),
        Some(false) => human.push_warning("push failed; changes are committed locally"),
        None => {}
    }
    let report = SyncReport {
        outcome: format!("{outcome:?}"),
        pushed,
    };
    emit_success(globals.output(), "git sync", &report, Some(&human))
}

#[derive(Serialize)]
struct StatusReport {
    root: PathBuf,
    repo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    remotes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clean: Option<bool>,
}

pub fn run_status(globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let engine = &session.engine;
    let repo = engine.is_repo();
    let report = StatusReport {
        root: session.paths.dir.clone(),
        repo,
        branch: engine.current_branch(),
        remotes: engine.remotes(),
        clean: if repo { engine.is_clean().ok() } else { None },
    };

    let mut human = HumanOutput::new(if repo {
        "git: repository found"
    } else {
        "git: not a repository"
    });
    human.push_summary("root", report.root.display().to_string());
    if repo {
        human.push_summary(
            "branch",
            report.branch.clone().unwrap_or_else(|| "(none)".to_string()),
        );
        human.push_summary(
            "remotes",
            if report.remotes.is_empty() {
                "none".to_string()
            } else {
                report.remotes.join(", ")
            },
        );
        if let Some(clean) = report.clean {
            human.push_summary("staged changes", if clean { "no" } else { "yes" });
        }
    } else {
        human.push_next_step("todoline git init");
    }
    emit_success(globals.output(), "git status", &report, Some(&human))
}

fn require_repo(session: &Session) -> Result<()> {
    if session.engine.is_repo() {
        Ok(())
    } else {
        Err(Error::RepoNotFound(session.paths.dir.clone()))
    }
}
