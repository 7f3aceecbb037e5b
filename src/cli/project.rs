//! Project-wide edits: `project mv`, `project rm`, `project pri`.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::ops;
use crate::output::{emit_success, HumanOutput};

use super::{note_sync, parse_priority_change, Globals, Session};

#[derive(Serialize)]
struct ProjectReport<'a> {
    project: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    renamed_to: Option<&'a str>,
    changed: usize,
}

pub fn run_mv(old: &str, new: &str, globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let store = session.store();
    let mut tasks = store.read()?;
    let changed = ops::rename_project(&mut tasks, old, new)?;
    if changed == 0 {
        return Err(Error::InvalidArgument(format!("no tasks in project +{old}")));
    }
    let status = store.write(&mut tasks)?;

    let mut human = HumanOutput::new(format!("Renamed +{old} to +{new} on {changed} task(s)."));
    note_sync(&mut human, status);
    let report = ProjectReport {
        project: old,
        renamed_to: Some(new),
        changed,
    };
    emit_success(globals.output(), "project mv", &report, Some(&human))
}

pub fn run_rm(name: &str, globals: Globals) -> Result<()> {
    let session = Session::open(globals.dir.as_deref())?;
    let store = session.store();
    let mut tasks = store.read()?;
    let changed = ops::remove_project(&mut tasks, name);
    if changed == 0 {
        return Err(Error::InvalidArgument(format!("no tasks in project +{name}")));
    }
    let status = store.write(&mut tasks)?;

    let mut human = HumanOutput::new(format!("Removed +{name} from {changed} task(s)."));
    note_sync(&mut human, status);
    let report = ProjectReport {
        project: name,
        renamed_to: None,
        changed,
    };
    emit_success(globals.output(), "project rm", &report, Some(&human))
}

pub fn run_pri(name: &str, priority: &str, globals: Globals) -> Result<()> {
    let priority = parse_priority_change(priority)?;
    let session = Session::open(globals.dir.as_deref())?;
    let store = session.store();
    let mut tasks = store.read()?;
    let changed = ops::prioritize_project(&mut tasks, name, priority)?;
    let status = if changed > 0 {
        Some(store.write(&mut tasks)?)
    } else {
        None
    };

    let label = priority.map_or_else(|| "none".to_string(), |p| p.to_string());
    let mut human = HumanOutput::new(format!(
        "Set priority {label} on {changed} open task(s) in +{name}."
    ));
    if let Some(status) = status {
        note_sync(&mut human, status);
    }
    let report = ProjectReport {
        project: name,
        renamed_to: None,
        changed,
    };
    emit_success(globals.output(), "project pri", &report, Some(&human))
}
