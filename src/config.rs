// src/config.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::engine::registry::ExecutableRegistry;

/// Wall-clock ceiling for a single child process.
///
/// Targets are short-lived device-control utilities; there is no per-request
/// override.
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "cmdgate.yaml";

/// Root configuration loaded from `cmdgate.yaml`.
///
/// Everything here is read once at startup and never changes afterwards.
///
/// Example:
///
/// listen: 0.0.0.0:5000
/// base_dir: /opt/app/build_all
/// mode: alias
/// executables:
///   connect: Connect/connect_app
///   capture: Capture/capture_app
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory that relative `executables` entries are resolved against.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Which resolution routes are mounted.
    #[serde(default)]
    pub mode: ResolutionMode,

    /// Alias → executable path.
    #[serde(default = "default_executables")]
    pub executables: BTreeMap<String, PathBuf>,
}

/// How callers name the executable they want to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// `POST /execute/{alias}` only.
    #[default]
    Alias,
    /// `POST /execute` with a filesystem path in the body only.
    Path,
    /// Both routes.
    Both,
}

impl ResolutionMode {
    pub fn allows_alias(self) -> bool {
        matches!(self, ResolutionMode::Alias | ResolutionMode::Both)
    }

    pub fn allows_path(self) -> bool {
        matches!(self, ResolutionMode::Path | ResolutionMode::Both)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            base_dir: default_base_dir(),
            mode: ResolutionMode::default(),
            executables: default_executables(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("/opt/app/build_all")
}

fn default_executables() -> BTreeMap<String, PathBuf> {
    [
        ("connect", "Connect/connect_app"),
        ("capture", "Capture/capture_app"),
        ("freerun", "Freerun/freerun_app"),
        ("stop", "Stop/stop_app"),
    ]
    .into_iter()
    .map(|(alias, path)| (alias.to_string(), PathBuf::from(path)))
    .collect()
}

impl Config {
    /// Load and parse a YAML config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let cfg: Config = serde_yaml::from_str(&raw).context("Failed to parse YAML config")?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist. Without one, `cmdgate.yaml` in the
    /// working directory is used if present, otherwise built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    tracing::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;

        for alias in self.executables.keys() {
            if alias.trim().is_empty() {
                bail!("Executable alias must not be empty");
            }
            if alias.contains('/') {
                bail!("Executable alias must not contain '/': {}", alias);
            }
        }

        if self.mode.allows_alias() && self.executables.is_empty() {
            tracing::warn!("alias mode enabled but no executables are configured");
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.listen))
    }

    /// Build the immutable alias table handed to the validator.
    pub fn registry(&self) -> ExecutableRegistry {
        ExecutableRegistry::new(&self.base_dir, &self.executables)
    }
}
