//! Command-line interface for todoline
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::git::SyncEngine;
use crate::output::{HumanOutput, OutputOptions};
use crate::paths::Paths;
use crate::store::{StoreOptions, SyncStatus, TaskStore};
use crate::sync::SyncOutcome;

mod config;
mod git;
mod project;
mod task;

/// todoline - a todo.txt task list kept in sync through git
#[derive(Parser, Debug)]
#[command(name = "todoline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding the task files (defaults to ~/.todoline)
    #[arg(long, global = true, env = "TODOLINE_DIRECTORY")]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tasks (open tasks by default)
    #[command(alias = "ls")]
    List {
        /// Include completed tasks
        #[arg(short, long, conflicts_with = "completed")]
        all: bool,

        /// Show only completed tasks
        #[arg(long)]
        completed: bool,

        /// Only tasks in this project
        #[arg(short, long)]
        project: Option<String>,

        /// Only tasks with this context
        #[arg(short, long)]
        context: Option<String>,

        /// Only tasks with this priority
        #[arg(long)]
        priority: Option<String>,

        /// Show at most N tasks
        #[arg(long)]
        top: Option<usize>,
    },

    /// Add a task
    Add {
        /// Task text; +project, @context and key:value tokens are recognized
        #[arg(required = true)]
        text: Vec<String>,

        /// Priority letter (defaults to config default_priority)
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Add a waiting-for task with a due date
    Await {
        /// What you are waiting for
        text: String,

        /// Due date (YYYY-MM-DD)
        due: String,

        /// Priority letter
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Mark a task as done
    Done {
        /// Task number
        number: usize,
    },

    /// Remove a task
    Rm {
        /// Task number
        number: usize,
    },

    /// Set or clear a task's priority
    Pri {
        /// Task number
        number: usize,

        /// Priority letter, or "none" to clear
        priority: String,
    },

    /// Show one task in detail
    Show {
        /// Task number
        number: usize,
    },

    /// Show the highest-priority open task
    Next {
        /// Only tasks in this project
        #[arg(short, long)]
        project: Option<String>,

        /// Only tasks with this context
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Sort the task file by priority
    Sort,

    /// List open tasks that are overdue or due soon
    Due {
        /// Look-ahead window in days
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Move completed tasks to the done file
    Archive,

    /// List projects in use
    Projects,

    /// List contexts in use
    Contexts,

    /// Project-wide edits
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Git synchronization
    #[command(subcommand)]
    Git(GitCommands),

    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Rename a project on every task
    Mv { old: String, new: String },

    /// Remove a project tag from every task
    Rm { name: String },

    /// Set the priority of every open task in a project
    Pri {
        name: String,

        /// Priority letter, or "none" to clear
        priority: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum GitCommands {
    /// Initialize a repository in the data directory
    Init,

    /// Add or replace a remote
    Remote { name: String, url: String },

    /// Pull, commit and push everything in the data directory
    Sync,

    /// Show repository state
    Status,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show every setting
    Show,

    /// Print one setting
    Get { key: String },

    /// Change one setting
    Set { key: String, value: String },

    /// Restore defaults
    Reset,
}

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct Globals {
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl Globals {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

/// Configuration, file locations and engine for one invocation.
pub(crate) struct Session {
    pub paths: Paths,
    pub config: Config,
    pub engine: SyncEngine,
}

impl Session {
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let dir = Paths::data_dir(dir)?;
        let config = Config::load_or_default(&dir)?;
        let paths = Paths::resolve(dir, &config);
        paths.ensure_dir()?;
        let engine = SyncEngine::new(&paths.dir);
        Ok(Self {
            paths,
            config,
            engine,
        })
    }

    pub fn store(&self) -> TaskStore {
        TaskStore::new(
            &self.paths.todo_file,
            Some(self.engine.clone()),
            StoreOptions::from(&self.config),
        )
    }

    /// The archive keeps insertion order.
    pub fn done_store(&self) -> TaskStore {
        let options = StoreOptions {
            auto_sort: false,
            ..StoreOptions::from(&self.config)
        };
        TaskStore::new(&self.paths.done_file, Some(self.engine.clone()), options)
    }
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Priority argument where `none` or `-` clears the priority.
pub(crate) fn parse_priority_change(raw: &str) -> Result<Option<char>> {
    let raw = raw.trim();
    if raw == "-" || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    crate::task::parse_priority_arg(raw).map(Some)
}

/// Add a warning to `human` when the sync after a write did not go cleanly.
pub(crate) fn note_sync(human: &mut HumanOutput, status: SyncStatus) {
    match status {
        SyncStatus::Failed(outcome) => {
            human.push_warning(format!("saved locally; git sync failed ({outcome:?})"));
        }
        SyncStatus::Synced(SyncOutcome::Committed {
            pushed: Some(false),
        }) => {
            human.push_warning("committed locally; push failed");
        }
        _ => {}
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = Globals {
            dir: self.dir,
            json: self.json,
            quiet: self.quiet,
        };
        match self.command {
            Commands::List {
                all,
                completed,
                project,
                context,
                priority,
                top,
            } => task::run_list(task::ListOptions {
                all,
                completed,
                project,
                context,
                priority,
                top,
                globals,
            }),
            Commands::Add { text, priority } => task::run_add(task::AddOptions {
                text: text.join(" "),
                priority,
                due: None,
                globals,
            }),
            Commands::Await {
                text,
                due,
                priority,
            } => task::run_add(task::AddOptions {
                text,
                priority,
                due: Some(due),
                globals,
            }),
            Commands::Done { number } => task::run_done(number, globals),
            Commands::Rm { number } => task::run_rm(number, globals),
            Commands::Pri { number, priority } => task::run_pri(number, &priority, globals),
            Commands::Show { number } => task::run_show(number, globals),
            Commands::Next { project, context } => task::run_next(project, context, globals),
            Commands::Sort => task::run_sort(globals),
            Commands::Due { days } => task::run_due(days, globals),
            Commands::Archive => task::run_archive(globals),
            Commands::Projects => task::run_tags(task::TagKind::Project, globals),
            Commands::Contexts => task::run_tags(task::TagKind::Context, globals),
            Commands::Project(cmd) => match cmd {
                ProjectCommands::Mv { old, new } => project::run_mv(&old, &new, globals),
                ProjectCommands::Rm { name } => project::run_rm(&name, globals),
                ProjectCommands::Pri { name, priority } => {
                    project::run_pri(&name, &priority, globals)
                }
            },
            Commands::Git(cmd) => match cmd {
                GitCommands::Init => git::run_init(globals),
                GitCommands::Remote { name, url } => git::run_remote(&name, &url, globals),
                GitCommands::Sync => git::run_sync(globals),
                GitCommands::Status => git::run_status(globals),
            },
            Commands::Config(cmd) => match cmd {
                ConfigCommands::Show => config::run_show(globals),
                ConfigCommands::Get { key } => config::run_get(&key, globals),
                ConfigCommands::Set { key, value } => config::run_set(&key, &value, globals),
                ConfigCommands::Reset => config::run_reset(globals),
            },
        }
    }
}
