use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use realm_core::config::{self, CONFIG_DIR, DEV_STEM};
use realm_core::tree;

use super::RealmRef;
use crate::context::RealmContext;
use crate::core_tasks::REALM_MERGE;
use crate::error::{io_err, RuntimeError};
use crate::realm::OPT_DIR;
use crate::task::{Task, TaskContext};

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub super_realm: Option<RealmRef>,
    pub sub_realm: Option<RealmRef>,
    /// Link instead of copying, and record the linkage in the sub realm's
    /// dev file.
    pub symlink: bool,
}

/// Where a merged realm ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRealm {
    pub path: PathBuf,
    /// `path` relative to the super realm root (`opt/<name>`).
    pub relative_path: PathBuf,
}

/// Place `sub_realm` under `<super_realm>/opt/<sub package name>`.
///
/// A copy leaves out the sub realm's `.realm/dev.*`. A symlink keeps it and
/// writes `superRealm`/`mergedAs` into it so reopening the sub realm finds
/// its super realm again.
pub async fn merge(context: &RealmContext, options: MergeOptions) -> Result<MergedRealm, RuntimeError> {
    let super_ref = options
        .super_realm
        .ok_or_else(|| RuntimeError::not_valid("'superRealm' is required"))?;
    let sub_ref = options
        .sub_realm
        .ok_or_else(|| RuntimeError::not_valid("'subRealm' is required"))?;

    let sup = super_ref.open(context)?;
    let sub = sub_ref.open(context)?;
    if sup.cwd().starts_with(sub.cwd()) {
        return Err(RuntimeError::not_valid(format!(
            "cannot merge {} into {}, which it contains",
            sub.cwd().display(),
            sup.cwd().display()
        )));
    }

    let relative_path = Path::new(OPT_DIR).join(sub.name());
    let path = sup.cwd().join(&relative_path);
    if std::fs::symlink_metadata(&path).is_ok() {
        return Err(RuntimeError::already_exists(path));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    tracing::info!(
        sub = %sub.cwd().display(),
        target = %path.display(),
        symlink = options.symlink,
        "merging realm"
    );

    if options.symlink {
        tree::symlink_dir(sub.cwd(), &path)?;
        let mut linkage = Map::new();
        linkage.insert("superRealm".into(), json!(sup.cwd()));
        linkage.insert("mergedAs".into(), json!(sub.name()));
        config::update_dev_config_at(sub.cwd(), linkage)?;
    } else {
        let src = sub.cwd().to_path_buf();
        let dst = path.clone();
        tokio::task::spawn_blocking(move || tree::copy_tree(&src, &dst, is_dev_file)).await??;
    }

    Ok(MergedRealm {
        path,
        relative_path,
    })
}

/// `.realm/dev.json`, `.realm/dev.yaml`, ...
fn is_dev_file(rel: &Path) -> bool {
    rel.parent() == Some(Path::new(CONFIG_DIR)) && rel.file_stem() == Some(OsStr::new(DEV_STEM))
}

/// `realmMerge`: `{superRealm, subRealm, symlink?}`; returns the merged
/// realm's path relative to the super realm.
pub struct MergeTask;

#[async_trait]
impl Task for MergeTask {
    async fn run(&self, cx: &TaskContext, params: Value) -> Result<Value, RuntimeError> {
        let symlink = match params.get("symlink") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(RuntimeError::not_valid(format!(
                    "invalid params for '{REALM_MERGE}': 'symlink' must be a boolean, got {other}"
                )))
            }
        };
        let options = MergeOptions {
            super_realm: RealmRef::from_param("superRealm", params.get("superRealm"))?,
            sub_realm: RealmRef::from_param("subRealm", params.get("subRealm"))?,
            symlink,
        };
        let merged = merge(&cx.context, options).await?;
        Ok(Value::String(merged.relative_path.to_string_lossy().into_owned()))
    }
}
