//! Task commands: list, add, await, done, rm, pri, show, next, sort, due,
//! archive, projects, contexts.

use serde::Serialize;

use crate::codec;
use crate::error::{Error, Result};
use crate::ops::{self, TaskFilter};
use crate::output::{emit_success, HumanOutput};
use crate::task::{parse_priority_arg, Task, DUE_KEY};

use super::{note_sync, parse_priority_change, today, Globals, Session};

/// Context added to tasks created by `await`.
pub const WAITING_CONTEXT: &str = "waiting";

pub struct ListOptions {
    pub all: bool,
    pub completed: bool,
    pub project: Option<String>,
    pub context: Option<String>,
    pub priority: Option<String>,
    pub top: Option<usize>,
    pub globals: Globals,
}

pub struct AddOptions {
    pub text: String,
    pub priority: Option<String>,
    /// Set for `await`: the task also gets `@waiting`.
    pub due: Option<String>,
    pub globals: Globals,
}

#[derive(Serialize)]
struct TaskView<'a> {
    number: usize,
    line: String,
    task: &'a Task,
}

impl<'a> TaskView<'a> {
    fn new(number: usize, task: &'a Task) -> Self {
        Self {
            number,
            line: codec::serialize(task),
            task,
        }
    }

    fn human(&self) -> String {
        format!("{} {}", self.number, self.line)
    }
}

pub fn run_list(opts: ListOptions) -> Result<()> {
    let session = Session::open(opts.globals.dir.as_deref())?;
    let tasks = session.store().read()?;

    let priority = opts.priority.as_deref().map(parse_priority_arg).transpose()?;
    let filter = TaskFilter {
        project: opts.project,
        context: opts.context,
        priority,
        include_open: !opts.completed,
        include_completed: opts.all || opts.completed,
    };

    let mut selected = ops::select(&tasks, &filter);
    if let Some(top) = opts.top {
        selected.truncate(top);
    }
    let views: Vec<TaskView<'_>> = selected
        .into_iter()
        .map(|(number, task)| TaskView::new(number, task))
        .collect();

    let mut human = HumanOutput::lines();
    if views.is_empty() {
        human.push_line("No matching tasks.");
    }
    for view in &views {
        human.push_line(view.human());
    }
    emit_success(opts.globals.output(), "list", &views, Some(&human))
}

pub fn run_add(opts: AddOptions) -> Result<()> {
    let session = Session::open(opts.globals.dir.as_deref())?;
    let priority = match opts.priority.as_deref() {
        Some(raw) => Some(parse_priority_arg(raw)?),
        None => session.config.default_priority,
    };
    let due = opts
        .due
        .as_deref()
        .map(|raw| {
            codec::parse_date(raw).ok_or_else(|| {
                Error::InvalidArgument(format!("invalid due date '{raw}', expected YYYY-MM-DD"))
            })
        })
        .transpose()?;

    let mut task = Task::create(&opts.text, priority, today())?;
    if let Some(due) = due {
        task.contexts.insert(WAITING_CONTEXT.to_string());
        task.metadata
            .insert(DUE_KEY.to_string(), codec::format_date(due));
    }

    let store = session.store();
    let mut tasks = store.read()?;
    tasks.push(task.clone());
    let status = store.write(&mut tasks)?;
    let number = tasks
        .iter()
        .rposition(|candidate| *candidate == task)
        .map(|idx| idx + 1)
        .unwrap_or(tasks.len());

    let command = if opts.due.is_some() { "await" } else { "add" };
    let view = TaskView::new(number, &task);
    let mut human = HumanOutput::new(format!("Added: {}", view.human()));
    note_sync(&mut human, status);
    emit_success(opts.globals.output(), command, &view, Some(&human))
}

#[derive(Serialize)]
struct DoneReport<'a> {
    completed: TaskView<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
}

pub fn run_done(number: usize, globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let store = session.store();
    let mut tasks = store.read()?;
    let completion = ops::complete_task(&mut tasks, number, today())?;
    let status = store.write(&mut tasks)?;

    let report = DoneReport {
        completed: TaskView::new(number, &completion.completed),
        next: completion.next.as_ref().map(codec::serialize),
    };
    let mut human = HumanOutput::new(format!("Completed: {}", report.completed.line));
    if let Some(next) = &report.next {
        human.push_summary("next occurrence", next.clone());
    }
    note_sync(&mut human, status);
    emit_success(globals.output(), "done", &report, Some(&human))
}

pub fn run_rm(number: usize, globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let store = session.store();
    let mut tasks = store.read()?;
    let removed = ops::remove_task(&mut tasks, number)?;
    let status = store.write(&mut tasks)?;

    let view = TaskView::new(number, &removed);
    let mut human = HumanOutput::new(format!("Removed: {}", view.line));
    note_sync(&mut human, status);
    emit_success(globals.output(), "rm", &view, Some(&human))
}

pub fn run_pri(number: usize, priority: &str, globals: Globals) -> Result<()> {
    let priority = parse_priority_change(priority)?;
    let session = Session::open(globals.dir.as_deref())?;
    let store = session.store();
    let mut tasks = store.read()?;
    let before = ops::set_priority(&mut tasks, number, priority)?;
    let after = ops::get(&tasks, number)?.clone();
    let status = store.write(&mut tasks)?;

    let view = TaskView::new(number, &after);
    let mut human = HumanOutput::new(format!("Updated: {}", view.line));
    human.push_summary("was", codec::serialize(&before));
    note_sync(&mut human, status);
    emit_success(globals.output(), "pri", &view, Some(&human))
}

pub fn run_show(number: usize, globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let tasks = session.store().read()?;
    let task = ops::get(&tasks, number)?;
    let view = TaskView::new(number, task);

    let mut human = HumanOutput::new(format!("Task {number}: {}", task.description));
    human.push_summary("status", if task.completed { "done" } else { "open" });
    if let Some(priority) = task.priority {
        human.push_summary("priority", priority.to_string());
    }
    if let Some(date) = task.creation_date {
        human.push_summary("created", codec::format_date(date));
    }
    if let Some(date) = task.completion_date {
        human.push_summary("completed", codec::format_date(date));
    }
    if !task.projects.is_empty() {
        human.push_summary("projects", join_tags(task.projects.iter(), '+'));
    }
    if !task.contexts.is_empty() {
        human.push_summary("contexts", join_tags(task.contexts.iter(), '@'));
    }
    if let Some(effort) = &task.effort {
        human.push_summary("effort", effort.clone());
    }
    for (key, value) in &task.metadata {
        human.push_summary(key.clone(), value.clone());
    }
    emit_success(globals.output(), "show", &view, Some(&human))
}

pub fn run_next(project: Option<String>, context: Option<String>, globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let tasks = session.store().read()?;
    let filter = TaskFilter {
        project,
        context,
        ..TaskFilter::open()
    };
    let view = ops::next_task(&tasks, &filter).map(|(number, task)| TaskView::new(number, task));

    let human = match &view {
        Some(view) => HumanOutput::new(view.human()),
        None => HumanOutput::new("No matching tasks."),
    };
    emit_success(globals.output(), "next", &view, Some(&human))
}

#[derive(Serialize)]
struct CountReport {
    count: usize,
}

pub fn run_sort(globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let store = session.store();
    let mut tasks = store.read()?;
    ops::sort_by_priority(&mut tasks);
    let status = store.write(&mut tasks)?;

    let mut human = HumanOutput::new(format!("Sorted {} tasks by priority.", tasks.len()));
    note_sync(&mut human, status);
    emit_success(
        globals.output(),
        "sort",
        &CountReport { count: tasks.len() },
        Some(&human),
    )
}

#[derive(Serialize)]
struct DueView<'a> {
    #[serde(flatten)]
    task: TaskView<'a>,
    due: String,
    days_left: i64,
}

pub fn run_due(days: i64, globals: Globals) -> Result<()> {
    if days < 0 {
        return Err(Error::InvalidArgument("--days cannot be negative".to_string()));
    }
    let session = Session::open(globals.dir.as_deref())?;
    let tasks = session.store().read()?;
    let entries: Vec<DueView<'_>> = ops::due_within(&tasks, today(), days)
        .into_iter()
        .map(|entry| DueView {
            task: TaskView::new(entry.number, entry.task),
            due: codec::format_date(entry.due),
            days_left: entry.days_left,
        })
        .collect();

    let mut human = HumanOutput::lines();
    if entries.is_empty() {
        human.push_line(format!("Nothing due in the next {days} days."));
    }
    for entry in &entries {
        let when = match entry.days_left {
            d if d < 0 => format!("overdue by {} day(s)", -d),
            0 => "due today".to_string(),
            d => format!("due in {d} day(s)"),
        };
        human.push_line(format!("{} [{when}]", entry.task.human()));
    }
    emit_success(globals.output(), "due", &entries, Some(&human))
}

#[derive(Serialize)]
struct ArchiveReport {
    archived: usize,
    remaining: usize,
}

pub fn run_archive(globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let store = session.store();
    let (mut remaining, done) = ops::archive(store.read()?);

    let human = if done.is_empty() {
        HumanOutput::new("No completed tasks to archive.")
    } else {
        let done_store = session.done_store();
        let mut archive = done_store.read()?;
        archive.extend(done.iter().cloned());
        let archive_status = done_store.write(&mut archive)?;
        let status = store.write(&mut remaining)?;

        let mut human = HumanOutput::new(format!(
            "Archived {} task(s) to {}.",
            done.len(),
            done_store.path().display()
        ));
        note_sync(&mut human, archive_status);
        note_sync(&mut human, status);
        human
    };

    let report = ArchiveReport {
        archived: done.len(),
        remaining: remaining.len(),
    };
    emit_success(globals.output(), "archive", &report, Some(&human))
}

#[derive(Debug, Clone, Copy)]
pub enum TagKind {
    Project,
    Context,
}

pub fn run_tags(kind: TagKind, globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let tasks = session.store().read()?;
    let (tags, sigil, command) = match kind {
        TagKind::Project => (ops::all_projects(&tasks), '+', "projects"),
        TagKind::Context => (ops::all_contexts(&tasks), '@', "contexts"),
    };

    let mut human = HumanOutput::lines();
    if tags.is_empty() {
        human.push_line(format!("No {command} found."));
    }
    for tag in &tags {
        human.push_line(format!("{sigil}{tag}"));
    }
    emit_success(globals.output(), command, &tags, Some(&human))
}

fn join_tags<'a>(tags: impl Iterator<Item = &'a String>, sigil: char) -> String {
    tags.map(|tag| format!("{sigil}{tag}"))
        .collect::<Vec<_>>()
        .join(" ")
}
