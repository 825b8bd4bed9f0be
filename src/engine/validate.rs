use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::engine::registry::ExecutableRegistry;
use crate::engine::request::{ExecuteBody, ExecutionRequest, Target};
use crate::error::{ExecutionError, Result};

/// A request that passed validation: the program exists and is executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Parse a raw request body into the typed schema.
///
/// An empty body or a JSON `null` means "no arguments". Anything that is not
/// an object with an optional string array under `args` is rejected.
pub fn parse_body(raw: &[u8]) -> Result<ExecuteBody> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExecuteBody::default());
    }

    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| ExecutionError::InvalidTarget(format!("Malformed request body: {}", e)))?;

    match value {
        Value::Null => Ok(ExecuteBody::default()),
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| ExecutionError::InvalidTarget(format!("Malformed request body: {}", e))),
        _ => Err(ExecutionError::InvalidTarget(
            "Request body must be a JSON object".into(),
        )),
    }
}

/// Resolve the request target and check it can be executed.
///
/// Alias and path targets go through the same filesystem check, so nothing
/// reaches the executor unless it points at an executable regular file.
pub fn validate_request(
    registry: &ExecutableRegistry,
    request: ExecutionRequest,
) -> Result<ResolvedCommand> {
    let program = resolve_target(registry, &request.target)?;

    check_executable(&program)?;

    Ok(ResolvedCommand {
        program,
        args: request.args,
    })
}

/* ---------------- target ---------------- */

fn resolve_target(registry: &ExecutableRegistry, target: &Target) -> Result<PathBuf> {
    match target {
        Target::Alias(alias) => {
            if alias.is_empty() {
                return Err(ExecutionError::InvalidTarget("Missing command".into()));
            }

            registry
                .resolve(alias)
                .map(Path::to_path_buf)
                .ok_or_else(|| ExecutionError::InvalidTarget("Invalid command".into()))
        }
        Target::Path(path) => {
            if path.as_os_str().is_empty() {
                return Err(ExecutionError::InvalidTarget(
                    "Missing 'path' field".into(),
                ));
            }

            if !path.is_absolute() {
                return Err(ExecutionError::InvalidTarget(format!(
                    "Path must be absolute: {}",
                    path.display()
                )));
            }

            Ok(path.clone())
        }
    }
}

/* ---------------- filesystem ---------------- */

/// The path must name an existing regular file (after following symlinks)
/// with at least one execute bit set.
pub fn check_executable(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        ExecutionError::NotExecutable(format!("{} ({})", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(ExecutionError::NotExecutable(format!(
            "{} (not a regular file)",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ExecutionError::NotExecutable(format!(
                "{} (missing execute permission)",
                path.display()
            )));
        }
    }

    Ok(())
}
