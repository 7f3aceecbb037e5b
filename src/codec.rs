//! todo.txt line codec.
//!
//! One line maps to one [`Task`]. Parsing is deliberately permissive: a token
//! that fails to parse as a marker, date or tag is kept as a description word,
//! so [`parse`] never fails.
//!
//! Grammar, applied in order on whitespace-separated tokens:
//!
//! ```text
//! [x ] [(P)] [completion-date] [creation-date] words... +project @context key:value
//! ```
//!
//! The completion date is only recognized on completed lines. Serialization
//! emits projects, contexts and metadata sorted, with `effort:` ahead of the
//! remaining metadata.

use chrono::NaiveDate;

use crate::task::{Task, EFFORT_KEY};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` date. Returns `None` for anything else,
/// including impossible calendar dates.
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let bytes = token.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(token, DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Recognize a `(P)` priority marker.
fn parse_priority_marker(token: &str) -> Option<char> {
    let bytes = token.as_bytes();
    if bytes.len() == 3 && bytes[0] == b'(' && bytes[2] == b')' && bytes[1].is_ascii_uppercase()
    {
        Some(bytes[1] as char)
    } else {
        None
    }
}

/// Parse one line into a task. Blank lines yield an empty task.
pub fn parse(line: &str) -> Task {
    let mut task = Task::default();
    let mut rest = line.trim();
    if rest.is_empty() {
        return task;
    }

    if let Some(stripped) = rest.strip_prefix("x ") {
        task.completed = true;
        rest = stripped;
    }

    let mut tokens = rest.split_whitespace().peekable();

    if let Some(letter) = tokens.peek().and_then(|t| parse_priority_marker(t)) {
        task.priority = Some(letter);
        tokens.next();
    }

    if task.completed {
        if let Some(date) = tokens.peek().and_then(|t| parse_date(t)) {
            task.completion_date = Some(date);
            tokens.next();
        }
    }

    if let Some(date) = tokens.peek().and_then(|t| parse_date(t)) {
        task.creation_date = Some(date);
        tokens.next();
    }

    read_body(tokens, &mut task);
    task
}

/// Extract tags and metadata from free text without reading the leading
/// completion, priority or date markers. Used for text a user typed.
pub fn parse_body(text: &str) -> Task {
    let mut task = Task::default();
    read_body(text.split_whitespace(), &mut task);
    task
}

fn read_body<'a>(tokens: impl Iterator<Item = &'a str>, task: &mut Task) {
    let mut words = Vec::new();
    for token in tokens {
        if let Some(project) = token.strip_prefix('+').filter(|p| !p.is_empty()) {
            task.projects.insert(project.to_string());
        } else if let Some(context) = token.strip_prefix('@').filter(|c| !c.is_empty()) {
            task.contexts.insert(context.to_string());
        } else if let Some((key, value)) = token.split_once(':').filter(|(k, _)| !k.is_empty()) {
            if key == EFFORT_KEY {
                task.effort = Some(value.to_string());
            } else {
                task.metadata.insert(key.to_string(), value.to_string());
            }
        } else {
            words.push(token);
        }
    }

    task.description = words.join(" ").trim().to_string();
}

/// Serialize a task into its canonical line (no trailing newline).
pub fn serialize(task: &Task) -> String {
    let mut parts: Vec<String> = Vec::new();

    if task.completed {
        parts.push("x".to_string());
    }
    if let Some(letter) = task.priority {
        parts.push(format!("({letter})"));
    }
    if task.completed {
        if let Some(date) = task.completion_date {
            parts.push(format_date(date));
        }
    }
    if let Some(date) = task.creation_date {
        parts.push(format_date(date));
    }
    if !task.description.is_empty() {
        parts.push(task.description.clone());
    }
    parts.extend(task.projects.iter().map(|p| format!("+{p}")));
    parts.extend(task.contexts.iter().map(|c| format!("@{c}")));
    if let Some(effort) = &task.effort {
        parts.push(format!("{EFFORT_KEY}:{effort}"));
    }
    parts.extend(
        task.metadata
            .iter()
            .filter(|(key, _)| key.as_str() != EFFORT_KEY)
            .map(|(key, value)| format!("{key}:{value}")),
    );

    parts.join(" ")
}
