//! `realm merge`: place a realm under another realm's `opt/`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::{json, Value};

use realm_runtime::core_tasks::REALM_MERGE;

use super::{absolute, Session};

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Realm to merge into.
    pub super_realm: PathBuf,

    /// Realm to merge.
    pub sub_realm: PathBuf,

    /// Link instead of copying, and record the linkage in the sub realm.
    #[arg(long)]
    pub symlink: bool,
}

impl MergeArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let params = json!({
            "superRealm": absolute(&self.super_realm)?,
            "subRealm": absolute(&self.sub_realm)?,
            "symlink": self.symlink,
        });
        let relative = match session.lifecycle(REALM_MERGE, params).await? {
            Value::String(path) => path,
            other => other.to_string(),
        };
        let how = if self.symlink { "Linked" } else { "Merged" };
        println!("{} {}", how.green().bold(), relative);
        Ok(())
    }
}
