//! List-level task operations.
//!
//! Task numbers are 1-based positions in the file, the same numbers `list`
//! prints. Every mutation works on the in-memory list; persisting it is the
//! store's job.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::recur;
use crate::task::Task;

/// Stable sort by priority: `A`..`Z`, then tasks without a priority, ties
/// keeping their original order.
pub fn sort_by_priority(tasks: &mut [Task]) {
    tasks.sort_by_key(Task::priority_rank);
}

fn index_for(tasks: &[Task], number: usize) -> Result<usize> {
    if number == 0 || number > tasks.len() {
        return Err(Error::TaskNumberOutOfRange {
            number,
            len: tasks.len(),
        });
    }
    Ok(number - 1)
}

pub fn get(tasks: &[Task], number: usize) -> Result<&Task> {
    let idx = index_for(tasks, number)?;
    Ok(&tasks[idx])
}

/// Result of completing a task.
#[derive(Debug, Clone)]
pub struct Completion {
    pub completed: Task,
    /// Follow-up appended to the list when the task recurs.
    pub next: Option<Task>,
}

/// Complete task `number`; a valid recurring task gets its next occurrence
/// appended to the list.
pub fn complete_task(tasks: &mut Vec<Task>, number: usize, today: NaiveDate) -> Result<Completion> {
    let idx = index_for(tasks, number)?;
    let was_open = !tasks[idx].completed;
    tasks[idx].complete(today);
    let completed = tasks[idx].clone();

    let next = if was_open && recur::is_recurring(&completed) {
        recur::recur(&completed, today)
    } else {
        None
    };
    if let Some(next) = &next {
        tasks.push(next.clone());
    }

    Ok(Completion { completed, next })
}

pub fn remove_task(tasks: &mut Vec<Task>, number: usize) -> Result<Task> {
    let idx = index_for(tasks, number)?;
    Ok(tasks.remove(idx))
}

/// Set the priority of task `number`, returning the task before the change.
pub fn set_priority(tasks: &mut [Task], number: usize, priority: Option<char>) -> Result<Task> {
    let idx = index_for(tasks, number)?;
    let before = tasks[idx].clone();
    tasks[idx].reprioritize(priority)?;
    Ok(before)
}

/// Rename project `old` to `new` on every task carrying it. Returns the
/// number of tasks changed.
pub fn rename_project(tasks: &mut [Task], old: &str, new: &str) -> Result<usize> {
    validate_tag(new)?;
    let mut changed = 0;
    for task in tasks.iter_mut() {
        if task.projects.remove(old) {
            task.projects.insert(new.to_string());
            changed += 1;
        }
    }
    Ok(changed)
}

/// Drop project `name` from every task carrying it.
pub fn remove_project(tasks: &mut [Task], name: &str) -> usize {
    tasks
        .iter_mut()
        .map(|task| task.projects.remove(name))
        .filter(|removed| *removed)
        .count()
}

/// Give every open task in project `name` the same priority.
pub fn prioritize_project(tasks: &mut [Task], name: &str, priority: Option<char>) -> Result<usize> {
    let mut changed = 0;
    for task in tasks
        .iter_mut()
        .filter(|task| !task.completed && task.projects.contains(name))
    {
        task.reprioritize(priority)?;
        changed += 1;
    }
    Ok(changed)
}

/// Split completed tasks out of the list: `(remaining, done)`.
pub fn archive(tasks: Vec<Task>) -> (Vec<Task>, Vec<Task>) {
    tasks.into_iter().partition(|task| !task.completed)
}

pub fn all_projects(tasks: &[Task]) -> BTreeSet<String> {
    tasks
        .iter()
        .flat_map(|task| task.projects.iter().cloned())
        .collect()
}

pub fn all_contexts(tasks: &[Task]) -> BTreeSet<String> {
    tasks
        .iter()
        .flat_map(|task| task.contexts.iter().cloned())
        .collect()
}

/// Filter applied by `list` and `next`.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project: Option<String>,
    pub context: Option<String>,
    pub priority: Option<char>,
    pub include_open: bool,
    pub include_completed: bool,
}

impl TaskFilter {
    /// Open tasks only, no tag restrictions.
    pub fn open() -> Self {
        Self {
            include_open: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if task.completed && !self.include_completed {
            return false;
        }
        if !task.completed && !self.include_open {
            return false;
        }
        if let Some(project) = &self.project {
            if !task.projects.contains(project) {
                return false;
            }
        }
        if let Some(context) = &self.context {
            if !task.contexts.contains(context) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != Some(priority) {
                return false;
            }
        }
        true
    }
}

/// Matching tasks paired with their 1-based numbers, in file order.
pub fn select<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<(usize, &'a Task)> {
    tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| filter.matches(task))
        .map(|(idx, task)| (idx + 1, task))
        .collect()
}

/// Highest-priority open task matching `filter`; the earliest wins ties.
pub fn next_task<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Option<(usize, &'a Task)> {
    let mut open = TaskFilter {
        include_open: true,
        include_completed: false,
        ..filter.clone()
    };
    open.priority = None;
    select(tasks, &open)
        .into_iter()
        .min_by_key(|(number, task)| (task.priority_rank(), *number))
}

/// An open task with a due date, relative to today.
#[derive(Debug, Clone)]
pub struct DueEntry<'a> {
    pub number: usize,
    pub task: &'a Task,
    pub due: NaiveDate,
    /// Negative when overdue.
    pub days_left: i64,
}

/// Open tasks that are overdue or due within `days` of `today`, soonest first.
pub fn due_within(tasks: &[Task], today: NaiveDate, days: i64) -> Vec<DueEntry<'_>> {
    let mut entries: Vec<DueEntry<'_>> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| !task.completed)
        .filter_map(|(idx, task)| {
            let due = task.due_date()?;
            let days_left = (due - today).num_days();
            (days_left <= days).then_some(DueEntry {
                number: idx + 1,
                task,
                due,
                days_left,
            })
        })
        .collect();
    entries.sort_by_key(|entry| (entry.due, entry.number));
    entries
}

fn validate_tag(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(Error::InvalidArgument(format!(
            "project name must be a single non-empty word, got '{name}'"
        )));
    }
    Ok(())
}
