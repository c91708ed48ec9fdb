use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use realm_core::artifacts::GROUP_COMMON;
use realm_core::config::{CONFIG_DIR, PACKAGE_FILE};
use realm_core::tree;

use super::{info_value, parse_params, RealmRef};
use crate::context::RealmContext;
use crate::core_tasks::REALM_FORK;
use crate::error::{io_err, RuntimeError};
use crate::realm::Realm;
use crate::task::{Task, TaskContext};

/// Entries every partial fork carries.
const MANDATORY: [&str; 2] = [PACKAGE_FILE, CONFIG_DIR];

#[derive(Debug, Clone, Default)]
pub struct ForkOptions {
    pub realm: Option<RealmRef>,
    pub name: Option<String>,
    /// Directory the fork is created in.
    pub path: Option<PathBuf>,
    /// Artifact groups to copy. `None` copies `common`, an empty list copies
    /// everything.
    pub tags: Option<Vec<String>>,
}

/// Copy a realm (whole, or filtered by artifact group) to `path/name` and
/// open the copy.
pub async fn fork(context: &RealmContext, options: ForkOptions) -> Result<Arc<Realm>, RuntimeError> {
    let source = options
        .realm
        .ok_or_else(|| RuntimeError::not_valid("'realm' is required"))?;
    let name = options
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| RuntimeError::not_valid("'name' is required"))?;
    let base = options
        .path
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| RuntimeError::not_valid("'path' is required"))?;

    let dest = base.join(&name);
    if std::fs::symlink_metadata(&dest).is_ok() {
        return Err(RuntimeError::already_exists(dest));
    }

    let source = source.open(context)?;
    if tree::resolve_path(&dest)?.starts_with(source.cwd()) {
        return Err(RuntimeError::not_valid(format!(
            "cannot fork {} into itself",
            source.cwd().display()
        )));
    }

    let selection = select_entries(&source, options.tags.as_deref())?;
    tracing::info!(
        source = %source.cwd().display(),
        dest = %dest.display(),
        whole = selection.is_none(),
        "forking realm"
    );

    std::fs::create_dir_all(&base).map_err(|e| io_err(&base, e))?;
    let src = source.cwd().to_path_buf();
    let dst = dest.clone();
    let copied = tokio::task::spawn_blocking(move || match selection {
        None => tree::copy_tree(&src, &dst, |_| false),
        Some(entries) => tree::copy_entries(&src, &dst, &entries),
    })
    .await??;
    tracing::debug!(dest = %dest.display(), copied, "fork copied");

    context.open(&dest)
}

/// Top-level entries to copy; `None` means the whole tree.
fn select_entries(source: &Realm, tags: Option<&[String]>) -> Result<Option<Vec<PathBuf>>, RuntimeError> {
    let groups: Vec<&str> = match tags {
        Some([]) => return Ok(None),
        Some(tags) => tags.iter().map(String::as_str).collect(),
        None => vec![GROUP_COMMON],
    };

    let artifacts = source.artifacts();
    let mut selected: BTreeSet<PathBuf> = BTreeSet::new();
    for group in groups {
        for entry in artifacts.get(group)? {
            if let Some(first) = first_component(&entry.path) {
                selected.insert(first);
            }
        }
    }
    for mandatory in MANDATORY {
        if source.cwd().join(mandatory).exists() {
            selected.insert(PathBuf::from(mandatory));
        }
    }
    Ok(Some(selected.into_iter().collect()))
}

fn first_component(path: &Path) -> Option<PathBuf> {
    path.components().find_map(|c| match c {
        Component::Normal(part) => Some(PathBuf::from(part)),
        _ => None,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ForkParams {
    name: Option<String>,
    #[serde(alias = "basePath")]
    path: Option<PathBuf>,
    tags: Option<Vec<String>>,
}

/// `realmFork`: `{realm | srcRealm, name, path | basePath, tags?}`; returns
/// the fork's info.
pub struct ForkTask;

#[async_trait]
impl Task for ForkTask {
    async fn run(&self, cx: &TaskContext, params: Value) -> Result<Value, RuntimeError> {
        let realm = RealmRef::from_param("realm", params.get("realm").or_else(|| params.get("srcRealm")))?;
        let parsed: ForkParams = parse_params(REALM_FORK, params)?;
        let options = ForkOptions {
            realm,
            name: parsed.name,
            path: parsed.path,
            tags: parsed.tags,
        };
        let forked = fork(&cx.context, options).await?;
        info_value(&forked)
    }
}
