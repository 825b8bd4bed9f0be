use serde::Deserialize;
use std::path::PathBuf;

/// JSON body accepted by both execute routes.
///
/// `path` is only read by the path-mode route. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteBody {
    #[serde(default)]
    pub args: Option<Vec<String>>,

    #[serde(default)]
    pub path: Option<String>,
}

/// What the caller asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Alias(String),
    Path(PathBuf),
}

/// A typed request, not yet checked against the registry or filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub target: Target,
    pub args: Vec<String>,
}

impl ExecutionRequest {
    pub fn for_alias(alias: impl Into<String>, body: ExecuteBody) -> Self {
        Self {
            target: Target::Alias(alias.into()),
            args: body.args.unwrap_or_default(),
        }
    }

    /// A missing `path` becomes an empty target and is rejected by the validator.
    pub fn for_path(body: ExecuteBody) -> Self {
        Self {
            target: Target::Path(PathBuf::from(body.path.unwrap_or_default())),
            args: body.args.unwrap_or_default(),
        }
    }
}
