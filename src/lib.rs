//! todoline - todo.txt tasks with git synchronization
//!
//! # Module Organization
//!
//! - `task`: the task record and per-task mutations
//! - `codec`: todo.txt line parsing and serialization
//! - `recur`: next occurrence of recurring tasks
//! - `ops`: list-level operations (complete, filter, projects, archive)
//! - `store`: reading and rewriting the task file
//! - `git`: libgit2-backed repository engine
//! - `sync`: the pull/stage/commit/push pipeline
//! - `config`, `paths`: settings and file locations
//! - `cli`, `output`: command-line interface

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod git;
pub mod ops;
pub mod output;
pub mod paths;
pub mod recur;
pub mod store;
pub mod sync;
pub mod task;

pub use error::{Error, Result};
pub use git::SyncEngine;
pub use store::{StoreOptions, TaskStore};
pub use task::Task;
