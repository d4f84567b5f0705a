//! Logic behind the `ikarhu-patch` binary: apply or diff a change tree
//! against a JSON document.
//!
//! Output is one JSON object:
//! `{"target": <document after>, "applied": <tree>}`, plus `"rollback"` and
//! `"errors"` when some keys of a patch were rejected.

use std::rc::Rc;

use ikarhu_tree::{codec, TreeError};
use serde_json::{json, Value};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::ObserveError;
use crate::scheduler::TaskQueue;
use crate::view::Observed;

/// Environment variable holding the log filter, e.g. `IKARHU_LOG=debug`.
pub const LOG_ENV: &str = "IKARHU_LOG";

pub const USAGE: &str = "usage: ikarhu-patch [--diff] '<change-tree-json>' < document.json";

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Tree(#[from] TreeError),
    #[error("{0}")]
    Observe(#[from] ObserveError),
    #[error("{}", USAGE)]
    Usage,
}

// ── Arguments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Patch,
    Diff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub mode: Mode,
    pub changes: String,
}

/// Parses the arguments after the program name.
pub fn parse_args<I>(args: I) -> Result<Args, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = Mode::Patch;
    let mut changes = None;
    for arg in args {
        match arg.as_str() {
            "--diff" => mode = Mode::Diff,
            "-h" | "--help" => return Err(CliError::Usage),
            _ if changes.is_none() => changes = Some(arg),
            _ => return Err(CliError::Usage),
        }
    }
    let changes = changes.ok_or(CliError::Usage)?;
    Ok(Args { mode, changes })
}

// ── ikarhu-patch ──────────────────────────────────────────────────────────

/// Result of one run. `complete` is false when some keys were rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub json: Value,
    pub complete: bool,
}

pub fn run(document: &str, changes: &str, mode: Mode) -> Result<Output, CliError> {
    let document: Value = serde_json::from_str(document)?;
    let tree = codec::from_json(&serde_json::from_str(changes)?)?;
    let observed = Observed::with_scheduler(document, Rc::new(TaskQueue::new()))?;

    let (applied, failure) = match mode {
        Mode::Diff => (observed.diff(tree), None),
        Mode::Patch => match observed.patch(tree) {
            Ok(applied) => (applied, None),
            Err(ObserveError::PatchPartialFailure {
                errors,
                rollback,
                applied,
            }) => (applied, Some((rollback, errors))),
            Err(other) => return Err(other.into()),
        },
    };

    let mut json = json!({
        "target": observed.to_json(),
        "applied": codec::to_json(&applied),
    });
    let complete = failure.is_none();
    if let Some((rollback, errors)) = failure {
        json["rollback"] = codec::to_json(&rollback);
        json["errors"] = json!(errors);
    }
    Ok(Output { json, complete })
}

/// Installs a stderr logger filtered by [`LOG_ENV`], defaulting to `warn`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
    if let Err(err) = installed {
        eprintln!("logging not initialized: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_mode_and_tree() {
        let parsed = parse_args(args(&["--diff", "{}"])).unwrap();
        assert_eq!(parsed.mode, Mode::Diff);
        assert_eq!(parsed.changes, "{}");
        assert!(matches!(parse_args(args(&[])), Err(CliError::Usage)));
        assert!(matches!(parse_args(args(&["{}", "{}"])), Err(CliError::Usage)));
    }

    #[test]
    fn patch_reports_target_and_applied() {
        let out = run(r#"{"a":1,"b":[1,2,3]}"#, r#"{"a":2,"b":{"0":"__deleted__"}}"#, Mode::Patch).unwrap();
        assert!(out.complete);
        assert_eq!(out.json["target"], json!({"a": 2, "b": [2, 3]}));
        assert_eq!(out.json["applied"], json!({"a": 2, "b": {"0": "__deleted__"}}));
    }

    #[test]
    fn diff_deletes_unmentioned_keys() {
        let out = run(r#"{"a":1,"b":2}"#, r#"{"a":1}"#, Mode::Diff).unwrap();
        assert_eq!(out.json["target"], json!({"a": 1}));
        assert_eq!(out.json["applied"], json!({"b": "__deleted__"}));
    }

    #[test]
    fn scalar_documents_are_rejected() {
        assert!(matches!(run("3", "{}", Mode::Patch), Err(CliError::Observe(_))));
        assert!(matches!(run("{}", "3", Mode::Patch), Err(CliError::Tree(_))));
        assert!(matches!(run("{", "{}", Mode::Patch), Err(CliError::Json(_))));
    }
}
