//! Glob helpers: metacharacter detection, pattern roots, and matching a
//! pattern list against a directory tree.

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::RealmError;
use crate::types::{ArtifactEntry, ArtifactKind};

const GLOB_CHARS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// `true` if `pattern` contains glob metacharacters (i.e. is not a literal path).
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_CHARS)
}

/// Leading run of non-glob path components.
///
/// `src/2/**/*.js` → `src/2`; a literal path is its own root.
pub fn glob_root(pattern: &str) -> String {
    let pattern = pattern.strip_prefix('!').unwrap_or(pattern);
    pattern
        .split('/')
        .take_while(|segment| !is_glob(segment))
        .collect::<Vec<_>>()
        .join("/")
}

/// Negated pattern excluding everything below `src`'s root.
///
/// `None` when `src` has no literal root (`**/*.c`): there is no subtree
/// to exclude, and a bare `!**/*` would drop the parent's own files.
pub fn exclusion_for(src: &str) -> Option<String> {
    let root = glob_root(src);
    (!root.is_empty()).then(|| format!("!{root}/**/*"))
}

fn build_set(patterns: &[&str]) -> Result<GlobSet, RealmError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern).literal_separator(true).build()?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Match `patterns` (relative to `root`) against the tree under `root`.
///
/// Patterns prefixed with `!` exclude. Literal patterns are resolved by
/// existence without walking. A matched directory is reported once and not
/// descended into. Results are sorted by path.
pub fn match_entries(root: &Path, patterns: &[String]) -> Result<Vec<ArtifactEntry>, RealmError> {
    let (negated, positive): (Vec<&str>, Vec<&str>) = patterns
        .iter()
        .map(String::as_str)
        .partition(|p| p.starts_with('!'));
    let negated: Vec<&str> = negated.iter().map(|p| &p[1..]).collect();
    let exclude = build_set(&negated)?;

    let mut out: Vec<ArtifactEntry> = Vec::new();
    let (globs, literals): (Vec<&str>, Vec<&str>) = positive.into_iter().partition(|p| is_glob(p));

    for literal in literals {
        let rel = normalize(literal);
        if exclude.is_match(&rel) {
            continue;
        }
        if let Some(kind) = kind_of(&root.join(&rel)) {
            out.push(ArtifactEntry { path: rel, kind });
        }
    }

    if !globs.is_empty() {
        let include = build_set(&globs)?;
        let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry?;
            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            if exclude.is_match(&rel) {
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }
            if include.is_match(&rel) {
                let kind = if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                    ArtifactKind::Dir
                } else {
                    ArtifactKind::File
                };
                out.push(ArtifactEntry { path: rel, kind });
            }
        }
    }

    out.sort();
    out.dedup();
    Ok(out)
}

/// Classify a filesystem entry; `None` if it does not exist.
///
/// Symlinks are classified by their target.
pub fn kind_of(path: &Path) -> Option<ArtifactKind> {
    let meta = std::fs::metadata(path).ok()?;
    Some(if meta.is_dir() {
        ArtifactKind::Dir
    } else {
        ArtifactKind::File
    })
}

fn normalize(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
