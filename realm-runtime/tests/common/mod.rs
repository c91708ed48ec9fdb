#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use realm_core::RealmError;
use realm_runtime::{CoreTasks, RealmContext, RuntimeError};
use serde_json::{json, Value};
use tempfile::TempDir;

pub fn context(home: &TempDir) -> RealmContext {
    RealmContext::init_at(home.path().join("root"), CoreTasks::new()).expect("init context")
}

/// Write a realm at `dir` with optional `.realm/config.json` and
/// `.realm/dev.json` contents.
pub fn write_realm(dir: &Path, name: &str, config: Option<Value>, dev: Option<Value>) -> PathBuf {
    fs::create_dir_all(dir.join(".realm")).expect("create realm dir");
    fs::write(
        dir.join("package.json"),
        serde_json::to_string_pretty(&json!({ "name": name, "version": "0.1.0" })).unwrap(),
    )
    .expect("write package.json");
    if let Some(config) = config {
        fs::write(dir.join(".realm/config.json"), config.to_string()).expect("write config");
    }
    if let Some(dev) = dev {
        fs::write(dir.join(".realm/dev.json"), dev.to_string()).expect("write dev");
    }
    fs::canonicalize(dir).expect("canonical realm dir")
}

pub fn touch(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write file");
}

/// Names directly under `dir`.
pub fn top_level(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect()
}

/// Every file path under `dir`, relative to it, following symlinked roots.
pub fn tree(dir: &Path) -> BTreeSet<String> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeSet<String>) {
        for entry in fs::read_dir(dir).expect("read dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).expect("relative");
                out.insert(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut out = BTreeSet::new();
    walk(dir, dir, &mut out);
    out
}

pub fn realm_error(err: &RuntimeError) -> &RealmError {
    err.as_realm_error()
        .unwrap_or_else(|| panic!("expected a realm error, got {err:?}"))
}
