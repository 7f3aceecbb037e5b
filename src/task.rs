//! The task record.
//!
//! A [`Task`] is one line of a todo.txt file in structured form. Parsing and
//! serialization live in [`crate::codec`]; this module holds the record and
//! the per-task mutations the command layer performs (complete, reprioritize).

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{Error, Result};

/// Metadata key holding the priority a task had before it was completed.
pub const PRIORITY_KEY: &str = "pri";
/// Metadata key holding the due date.
pub const DUE_KEY: &str = "due";
/// Metadata key holding the recurrence interval in days.
pub const RECUR_KEY: &str = "recur";
/// Metadata key promoted to [`Task::effort`].
pub const EFFORT_KEY: &str = "effort";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<NaiveDate>,
    /// Only meaningful while `completed` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub projects: BTreeSet<String>,
    #[serde(default)]
    pub contexts: BTreeSet<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Build a fresh open task stamped with `today` as its creation date.
    ///
    /// Project, context and metadata tokens embedded in `text` are extracted;
    /// every other word stays in the description as typed.
    pub fn create(text: &str, priority: Option<char>, today: NaiveDate) -> Result<Self> {
        if let Some(letter) = priority {
            validate_priority(letter)?;
        }
        let mut task = codec::parse_body(text);
        task.priority = priority;
        task.creation_date = Some(today);
        if task.description.is_empty() {
            return Err(Error::InvalidArgument(
                "task description cannot be empty".to_string(),
            ));
        }
        Ok(task)
    }

    /// Mark the task done on `today`.
    ///
    /// The priority is cleared and its previous value is kept under the
    /// `pri` metadata key. Completing a completed task changes nothing.
    pub fn complete(&mut self, today: NaiveDate) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.completion_date = Some(today);
        if let Some(letter) = self.priority.take() {
            self.metadata
                .insert(PRIORITY_KEY.to_string(), letter.to_string());
        }
    }

    pub fn reprioritize(&mut self, priority: Option<char>) -> Result<()> {
        if let Some(letter) = priority {
            validate_priority(letter)?;
        }
        self.priority = priority;
        Ok(())
    }

    /// The `due:` metadata parsed as a date, if present and well formed.
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.metadata
            .get(DUE_KEY)
            .and_then(|value| codec::parse_date(value))
    }

    /// Sort key used by priority ordering: lettered tasks first, A..Z.
    pub fn priority_rank(&self) -> u8 {
        match self.priority {
            Some(letter) if letter.is_ascii_uppercase() => letter as u8 - b'A',
            _ => 26,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::serialize(self))
    }
}

impl FromStr for Task {
    type Err = Infallible;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        Ok(codec::parse(line))
    }
}

/// Accepts a priority given as text (`"a"`, `"B"`), normalizing case.
pub fn parse_priority_arg(raw: &str) -> Result<char> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => {
            let letter = letter.to_ascii_uppercase();
            validate_priority(letter)?;
            Ok(letter)
        }
        _ => Err(Error::InvalidArgument(format!(
            "priority must be a single letter A-Z, got '{raw}'"
        ))),
    }
}

fn validate_priority(letter: char) -> Result<()> {
    if letter.is_ascii_uppercase() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "priority must be a letter A-Z, got '{letter}'"
        )))
    }
}
