//! Recurring tasks.
//!
//! A completed task carrying `due:YYYY-MM-DD` and `recur:N` (N a positive
//! number of days) spawns a follow-up whose due date is the first
//! `due + k*N` that lies strictly after today.

use chrono::{Duration, NaiveDate};
use thiserror::Error;
use tracing::{debug, warn};

use crate::codec;
use crate::task::{Task, DUE_KEY, PRIORITY_KEY, RECUR_KEY};

/// Why a task's recurrence metadata could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("no recur: metadata")]
    MissingRecur,
    #[error("recur:{0} is not a positive number of days")]
    InvalidInterval(String),
    #[error("recurring task has no due: date")]
    MissingDue,
    #[error("due:{0} is not a YYYY-MM-DD date")]
    InvalidDue(String),
}

/// Whether the task asks to recur at all (valid or not).
pub fn is_recurring(task: &Task) -> bool {
    task.metadata.contains_key(RECUR_KEY)
}

/// First `due + k*step` (k >= 1) that is strictly after `today`, or `None`
/// when the result would leave the supported calendar range.
pub fn next_due(due: NaiveDate, step_days: i64, today: NaiveDate) -> Option<NaiveDate> {
    let first = due.checked_add_signed(Duration::try_days(step_days)?)?;
    if first > today {
        return Some(first);
    }
    let periods = (today - due).num_days() / step_days + 1;
    due.checked_add_signed(Duration::try_days(periods.checked_mul(step_days)?)?)
}

fn interval(task: &Task) -> Result<(NaiveDate, i64), RecurrenceError> {
    let raw_step = task
        .metadata
        .get(RECUR_KEY)
        .ok_or(RecurrenceError::MissingRecur)?;
    let step = raw_step
        .parse::<i64>()
        .ok()
        .filter(|days| *days > 0)
        .ok_or_else(|| RecurrenceError::InvalidInterval(raw_step.clone()))?;

    let raw_due = task.metadata.get(DUE_KEY).ok_or(RecurrenceError::MissingDue)?;
    let due = codec::parse_date(raw_due).ok_or_else(|| RecurrenceError::InvalidDue(raw_due.clone()))?;

    Ok((due, step))
}

/// Build the next occurrence of `task`, or `Err` describing why it cannot recur.
pub fn try_recur(task: &Task, today: NaiveDate) -> Result<Task, RecurrenceError> {
    let (due, step) = interval(task)?;
    let next = next_due(due, step, today)
        .ok_or_else(|| RecurrenceError::InvalidInterval(step.to_string()))?;

    let mut follow_up = task.clone();
    follow_up.completed = false;
    follow_up.completion_date = None;
    follow_up.creation_date = Some(today);
    if follow_up.priority.is_none() {
        let restored = follow_up
            .metadata
            .get(PRIORITY_KEY)
            .and_then(|raw| {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) if letter.is_ascii_uppercase() => Some(letter),
                    _ => None,
                }
            });
        if let Some(letter) = restored {
            follow_up.priority = Some(letter);
            follow_up.metadata.remove(PRIORITY_KEY);
        }
    }
    follow_up
        .metadata
        .insert(DUE_KEY.to_string(), codec::format_date(next));

    debug!(due = %due, step, next = %next, "computed next occurrence");
    Ok(follow_up)
}

/// Next occurrence of a recurring task; invalid metadata is logged and
/// yields `None`.
pub fn recur(task: &Task, today: NaiveDate) -> Option<Task> {
    match try_recur(task, today) {
        Ok(next) => Some(next),
        Err(err) => {
            warn!(task = %task, "task does not recur: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn invalid_metadata_is_a_std_error() {
        let task = codec::parse("x 2024-01-20 stretch due:soon recur:3");
        let err = try_recur(&task, date("2024-01-20")).unwrap_err();
        assert_eq!(err, RecurrenceError::InvalidDue("soon".to_string()));

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert_eq!(boxed.to_string(), "due:soon is not a YYYY-MM-DD date");
    }

    #[test]
    fn skips_whole_periods_while_dormant() {
        let task = codec::parse("x 2024-01-20 water plants due:2024-01-01 recur:7");
        let next = recur(&task, date("2024-01-20")).expect("recurs");
        assert_eq!(next.metadata.get("due").map(String::as_str), Some("2024-01-22"));
        assert!(!next.completed);
        assert_eq!(next.completion_date, None);
        assert_eq!(next.creation_date, Some(date("2024-01-20")));
    }

    #[test]
    fn future_due_advances_one_step() {
        assert_eq!(
            next_due(date("2024-02-01"), 3, date("2024-01-01")),
            Some(date("2024-02-04"))
        );
    }

    #[test]
    fn landing_on_today_moves_past_it() {
        assert_eq!(
            next_due(date("2024-01-01"), 5, date("2024-01-11")),
            Some(date("2024-01-16"))
        );
        assert_eq!(
            next_due(date("2024-01-01"), 5, date("2024-01-06")),
            Some(date("2024-01-11"))
        );
    }

    #[test]
    fn keeps_tags_effort_and_restores_priority() {
        let mut task = codec::parse("(B) Pay rent +home @desk due:2024-03-01 recur:30 effort:1");
        task.complete(date("2024-03-02"));

        let next = recur(&task, date("2024-03-02")).expect("recurs");
        assert_eq!(next.description, "Pay rent");
        assert_eq!(next.priority, Some('B'));
        assert!(!next.metadata.contains_key("pri"));
        assert!(next.projects.contains("home"));
        assert!(next.contexts.contains("desk"));
        assert_eq!(next.effort.as_deref(), Some("1"));
        assert_eq!(next.metadata.get("recur").map(String::as_str), Some("30"));
        assert_eq!(next.metadata.get("due").map(String::as_str), Some("2024-03-31"));
    }

    #[test]
    fn invalid_metadata_does_not_recur() {
        let today = date("2024-01-01");
        for line in [
            "no recurrence due:2024-01-01",
            "zero recur:0 due:2024-01-01",
            "negative recur:-3 due:2024-01-01",
            "words recur:weekly due:2024-01-01",
            "no due recur:7",
            "bad due recur:7 due:tomorrow",
            "huge recur:99999999999999 due:2024-01-01",
        ] {
            assert_eq!(recur(&codec::parse(line), today), None, "line: {line}");
        }
    }

    #[test]
    fn reports_reason() {
        let task = codec::parse("bad recur:7 due:2024-02-30");
        assert_eq!(
            try_recur(&task, date("2024-01-01")),
            Err(RecurrenceError::InvalidDue("2024-02-30".to_string()))
        );
    }
}
