// src/checks.rs

//! Startup checks for the executable registry.
//!
//! Runs every alias through the same filesystem check the request validator
//! applies, so a broken deployment shows up before the first request does.

use crate::engine::{check_executable, ExecutableRegistry};
use std::path::PathBuf;

/// Outcome of checking one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub alias: String,
    pub path: PathBuf,
    /// `None` when the entry is executable.
    pub problem: Option<String>,
}

impl EntryReport {
    pub fn is_ok(&self) -> bool {
        self.problem.is_none()
    }
}

/// Check every entry, in alias order.
pub fn check_registry(registry: &ExecutableRegistry) -> Vec<EntryReport> {
    registry
        .iter()
        .map(|(alias, path)| EntryReport {
            alias: alias.to_string(),
            path: path.to_path_buf(),
            problem: check_executable(path).err().map(|e| e.to_string()),
        })
        .collect()
}

/// One line per entry, e.g. `ok   connect -> /opt/app/build_all/Connect/connect_app`.
pub fn render_report(reports: &[EntryReport]) -> String {
    reports
        .iter()
        .map(|r| match &r.problem {
            None => format!("ok   {} -> {}", r.alias, r.path.display()),
            Some(problem) => format!("FAIL {} -> {}", r.alias, problem),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
