use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable alias → executable table.
///
/// Built once from configuration at startup and shared read-only between
/// requests. Entries are not checked for existence here; the validator does
/// that on every request.
#[derive(Debug, Clone, Default)]
pub struct ExecutableRegistry {
    entries: BTreeMap<String, PathBuf>,
}

impl ExecutableRegistry {
    /// Relative paths are joined onto `base_dir`, absolute ones are kept.
    pub fn new(base_dir: &Path, executables: &BTreeMap<String, PathBuf>) -> Self {
        let entries = executables
            .iter()
            .map(|(alias, path)| (alias.clone(), base_dir.join(path)))
            .collect();

        Self { entries }
    }

    pub fn resolve(&self, alias: &str) -> Option<&Path> {
        self.entries.get(alias).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(alias, path)| (alias.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PathBuf)> for ExecutableRegistry {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
