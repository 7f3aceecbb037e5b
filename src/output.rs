//! Shared output formatting for todoline commands.
//!
//! Human output is plain text on stdout. With `--json` every command prints
//! one envelope: `{schema_version, command, status, data | error}`.

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "todoline.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text rendering of a command result.
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: Option<String>,
    lines: Vec<String>,
    summary: Vec<(String, String)>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: Some(header.into()),
            ..Self::default()
        }
    }

    /// Output made of bare lines (task listings).
    pub fn lines() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, value: impl Into<String>) {
        self.lines.push(value.into());
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        let text = format_human(human);
        if !text.is_empty() {
            println!("{text}");
        }
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    if let Some(header) = &output.header {
        lines.push(header.clone());
    }
    lines.extend(output.lines.iter().cloned());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// Best-effort command name for error envelopes, read before clap parses.
pub fn infer_command_name_from_args() -> String {
    let mut args = std::env::args().skip(1);
    let mut skip_value = false;
    let mut command = None;

    for arg in args.by_ref() {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == "--dir" {
            skip_value = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        command = Some(arg);
        break;
    }

    let Some(command) = command else {
        return "todoline".to_string();
    };

    if matches!(command.as_str(), "project" | "git" | "config") {
        if let Some(sub) = args.find(|arg| !arg.starts_with('-')) {
            return format!("{command} {sub}");
        }
    }
    command
}

fn error_kind(err: &Error) -> &'static str {
    if err.is_contract_violation() {
        return "contract_violation";
    }
    match err.exit_code() {
        2 => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::RepoNotFound(_) | Error::NotARepo(_) => vec!["todoline git init".to_string()],
        Error::TaskNumberOutOfRange { .. } => vec!["todoline list --all".to_string()],
        Error::InvalidConfig(_) => vec!["todoline config show".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}
