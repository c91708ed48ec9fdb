//! Artifact classification: group name → classified paths.
//!
//! | Group | Source |
//! |-------|--------|
//! | configured name | the patterns declared under that name |
//! | `dir` / `file` | top-level entries of the realm root, by kind |
//! | `common` | top-level entries not claimed by any configured group |
//! | `a.b.c` | dot-path: delegated to a nested realm's classifier, or resolved as `a/b/c` |
//!
//! Any other name yields an empty list.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{io_err, RealmError};
use crate::glob::{kind_of, match_entries};
use crate::types::{ArtifactEntry, ArtifactKind, RealmConfig};

pub const GROUP_DIR: &str = "dir";
pub const GROUP_FILE: &str = "file";
pub const GROUP_COMMON: &str = "common";

/// Classifier bound to one realm root.
#[derive(Debug, Clone)]
pub struct Artifacts {
    cwd: PathBuf,
    groups: BTreeMap<String, Vec<String>>,
}

impl Artifacts {
    pub fn new(cwd: impl Into<PathBuf>, config: &RealmConfig) -> Self {
        Self {
            cwd: cwd.into(),
            groups: config.artifacts.clone(),
        }
    }

    /// Load the classifier for the realm at `cwd` from its config file.
    pub fn load(cwd: &Path) -> Result<Self, RealmError> {
        let config = config::load_realm_config_at(cwd)?;
        Ok(Self::new(cwd, &config))
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Built-in group names followed by configured ones.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = [GROUP_DIR, GROUP_FILE, GROUP_COMMON]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for name in self.groups.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Classified entries for `group`; unknown names yield an empty list.
    pub fn get(&self, group: &str) -> Result<Vec<ArtifactEntry>, RealmError> {
        if let Some(patterns) = self.groups.get(group) {
            return match_entries(&self.cwd, patterns);
        }
        match group {
            GROUP_DIR => self.top_level_of_kind(ArtifactKind::Dir),
            GROUP_FILE => self.top_level_of_kind(ArtifactKind::File),
            GROUP_COMMON => self.common(),
            dotted if dotted.contains('.') => self.resolve_dotted(dotted),
            _ => Ok(Vec::new()),
        }
    }

    /// Every top-level entry of the realm root, sorted by name.
    pub fn top_level(&self) -> Result<Vec<ArtifactEntry>, RealmError> {
        top_level_entries(&self.cwd)
    }

    fn top_level_of_kind(&self, kind: ArtifactKind) -> Result<Vec<ArtifactEntry>, RealmError> {
        Ok(self
            .top_level()?
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect())
    }

    fn common(&self) -> Result<Vec<ArtifactEntry>, RealmError> {
        let mut claimed: BTreeSet<PathBuf> = BTreeSet::new();
        for patterns in self.groups.values() {
            for entry in match_entries(&self.cwd, patterns)? {
                if entry.path.components().count() == 1 {
                    claimed.insert(entry.path);
                }
            }
        }
        Ok(self
            .top_level()?
            .into_iter()
            .filter(|e| !claimed.contains(&e.path))
            .collect())
    }

    /// Walk `a.b.c` segment by segment. The first nested realm met with
    /// segments left over is asked for the rest as a group name; if it has
    /// nothing, the walk continues as a plain path.
    fn resolve_dotted(&self, dotted: &str) -> Result<Vec<ArtifactEntry>, RealmError> {
        let segments: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
        let mut rel = PathBuf::new();

        for (i, segment) in segments.iter().enumerate() {
            rel.push(segment);
            let abs = self.cwd.join(&rel);
            let Some(kind) = kind_of(&abs) else {
                return Ok(Vec::new());
            };

            let rest = &segments[i + 1..];
            if rest.is_empty() {
                return Ok(vec![ArtifactEntry { path: rel, kind }]);
            }

            if kind == ArtifactKind::Dir && config::is_realm_dir(&abs) {
                let nested = Artifacts::load(&abs)?.get(&rest.join("."))?;
                if !nested.is_empty() {
                    return Ok(nested
                        .into_iter()
                        .map(|e| ArtifactEntry {
                            path: rel.join(e.path),
                            kind: e.kind,
                        })
                        .collect());
                }
            }
        }
        Ok(Vec::new())
    }
}

/// Top-level entries of `dir`, sorted by name.
pub fn top_level_entries(dir: &Path) -> Result<Vec<ArtifactEntry>, RealmError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        if let Some(kind) = kind_of(&entry.path()) {
            out.push(ArtifactEntry {
                path: PathBuf::from(entry.file_name()),
                kind,
            });
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn paths(entries: &[ArtifactEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.path.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn unknown_group_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let artifacts = Artifacts::new(dir.path(), &RealmConfig::default());
        assert!(artifacts.get("nope").unwrap().is_empty());
        assert!(artifacts.get("no.such.path").unwrap().is_empty());
    }

    #[test]
    fn explicit_common_overrides_builtin() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("a"), "").unwrap();
        fs::write(dir.path().join("b"), "").unwrap();
        let mut config = RealmConfig::default();
        config.artifacts.insert("common".into(), vec!["b".into()]);
        let artifacts = Artifacts::new(dir.path(), &config);
        assert_eq!(paths(&artifacts.get("common").unwrap()), ["b"]);
    }

    #[test]
    fn group_names_lists_builtins_first() {
        let mut config = RealmConfig::default();
        config.artifacts.insert("custom".into(), vec![]);
        let artifacts = Artifacts::new("/tmp", &config);
        assert_eq!(artifacts.group_names(), ["dir", "file", "common", "custom"]);
    }
}
