//! Subcommand implementations and the helpers they share.

pub mod artifacts;
pub mod create;
pub mod fork;
pub mod info;
pub mod merge;
pub mod mount;
pub mod run;
pub mod tasks;
pub mod units;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use realm_runtime::{ConnectOptions, CoreTasks, Realm, RealmContext, RealmInfo};

/// The root context plus the connected root realm.
pub struct Session {
    pub context: RealmContext,
    pub root: Arc<Realm>,
}

impl Session {
    pub async fn open(home: Option<&Path>) -> Result<Self> {
        let home = match home {
            Some(home) => home.to_path_buf(),
            None => realm_core::default_home().context("cannot locate the root realm")?,
        };
        let context = RealmContext::init_at(&home, CoreTasks::new())
            .with_context(|| format!("failed to open root realm at '{}'", home.display()))?;
        context
            .connect_root()
            .await
            .context("failed to connect root realm")?;
        let root = context.root();
        tracing::debug!(tasks = root.task_names(None).len(), "session opened");
        Ok(Self { context, root })
    }

    /// Open and connect `path`, defaulting to the current directory.
    pub async fn realm(&self, path: Option<&Path>) -> Result<Arc<Realm>> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().context("cannot read current directory")?,
        };
        self.context
            .open_connected(&path, ConnectOptions::default())
            .await
            .with_context(|| format!("failed to open realm at '{}'", path.display()))
    }

    /// Dispatch a lifecycle task on the root realm.
    pub async fn lifecycle(&self, task: &str, params: Value) -> Result<Value> {
        self.root
            .run_and_wait(task, params)
            .await
            .with_context(|| format!("{task} failed"))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Absolute form of a user-supplied path, without requiring it to exist.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("cannot read current directory")?
        .join(path))
}

/// `~/...` for paths under the user's home directory.
pub fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(&home).ok().map(Path::to_path_buf)) {
        Some(rel) if !rel.as_os_str().is_empty() => format!("~/{}", rel.display()),
        _ => path.display().to_string(),
    }
}

pub fn print_info(info: &RealmInfo) {
    use colored::Colorize;

    println!("{} {}", info.name.bold(), info.version.as_deref().unwrap_or(""));
    if let Some(description) = &info.description {
        println!("  {description}");
    }
    println!("  cwd:        {}", display_path(&info.cwd));
    match &info.super_realm {
        Some(path) => println!("  super:      {}", display_path(path)),
        None => println!("  super:      {}", "(none)".dimmed()),
    }
    if let Some(merged_as) = &info.merged_as {
        println!("  merged as:  {merged_as}");
    }
    let state = if info.connected {
        "connected".green()
    } else {
        "not connected".yellow()
    };
    println!("  state:      {state}");
    println!("  tasks:      {}", info.tasks.len());
}

/// Decode the info a lifecycle task replies with.
pub fn info_from_value(value: Value) -> Result<RealmInfo> {
    serde_json::from_value(value).context("unexpected task output")
}
