use serde::Serialize;

pub mod events;
pub mod execute;
pub mod registry;
pub mod request;
pub mod response;
pub mod run;
pub mod sink;
pub mod validate;

pub use execute::{CommandRunner, ProcessRunner};
pub use registry::ExecutableRegistry;
pub use request::{ExecuteBody, ExecutionRequest, Target};
pub use run::run_execution;
pub use validate::{check_executable, parse_body, validate_request, ResolvedCommand};

/* ---------------- execution output ---------------- */

/// Captured output of a child that ran to completion.
///
/// A non-zero `exit_code` is still a successful execution from the
/// gateway's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "returncode")]
    pub exit_code: i32,
}
