//! Directory tree copy and link helpers used by fork and merge.
//!
//! Symlinks inside a copied tree are recreated as symlinks, never followed.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{io_err, RealmError};

/// Recursively copy `src` into `dst`, skipping every path (relative to
/// `src`) for which `skip` returns `true`. A skipped directory is not
/// descended into. Returns the number of files and links copied.
pub fn copy_tree<F>(src: &Path, dst: &Path, skip: F) -> Result<usize, RealmError>
where
    F: Fn(&Path) -> bool,
{
    std::fs::create_dir_all(dst).map_err(|e| io_err(dst, e))?;
    // A destination inside the source must not be copied into itself.
    let own_output = std::fs::canonicalize(dst)
        .ok()
        .zip(std::fs::canonicalize(src).ok())
        .and_then(|(dst, src)| dst.strip_prefix(&src).ok().map(Path::to_path_buf));

    let mut copied = 0;
    let mut walker = WalkDir::new(src).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let file_type = entry.file_type();
        if skip(rel) || own_output.as_deref().is_some_and(|own| rel.starts_with(own)) {
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let target = dst.join(rel);
        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| io_err(&target, e))?;
        } else {
            copy_entry(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Absolute, symlink-free form of `path`, which need not exist yet.
///
/// The longest existing prefix is canonicalized and the missing tail is
/// appended with `.` and `..` applied lexically.
pub fn resolve_path(path: &Path) -> Result<PathBuf, RealmError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_err(|e| io_err(path, e))?.join(path)
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut missing = Vec::new();
    let mut existing = lexical.as_path();
    loop {
        if let Ok(mut resolved) = std::fs::canonicalize(existing) {
            resolved.extend(missing.iter().rev());
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return Ok(lexical.clone()),
        }
    }
}

/// Copy the named top-level entries of `src_root` into `dst_root`.
pub fn copy_entries(src_root: &Path, dst_root: &Path, entries: &[PathBuf]) -> Result<usize, RealmError> {
    std::fs::create_dir_all(dst_root).map_err(|e| io_err(dst_root, e))?;
    let mut copied = 0;
    for rel in entries {
        let from = src_root.join(rel);
        let to = dst_root.join(rel);
        let meta = std::fs::symlink_metadata(&from).map_err(|e| io_err(&from, e))?;
        if meta.is_dir() {
            copied += copy_tree(&from, &to, |_| false)?;
        } else {
            copy_entry(&from, &to)?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_entry(from: &Path, to: &Path) -> Result<(), RealmError> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let meta = std::fs::symlink_metadata(from).map_err(|e| io_err(from, e))?;
    if meta.file_type().is_symlink() {
        let link = std::fs::read_link(from).map_err(|e| io_err(from, e))?;
        let is_dir = std::fs::metadata(from).map(|m| m.is_dir()).unwrap_or(false);
        return symlink(&link, to, is_dir);
    }
    std::fs::copy(from, to).map_err(|e| io_err(to, e))?;
    Ok(())
}

/// Create a directory symlink at `link` pointing to `target`.
pub fn symlink_dir(target: &Path, link: &Path) -> Result<(), RealmError> {
    symlink(target, link, true)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path, _is_dir: bool) -> Result<(), RealmError> {
    std::os::unix::fs::symlink(target, link).map_err(|e| io_err(link, e))
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path, is_dir: bool) -> Result<(), RealmError> {
    let result = if is_dir {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    };
    result.map_err(|e| io_err(link, e))
}
