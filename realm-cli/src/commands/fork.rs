//! `realm fork`: copy a realm, whole or by artifact group.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;

use realm_runtime::core_tasks::REALM_FORK;

use super::{absolute, info_from_value, print_info, print_json, Session};

#[derive(Args, Debug)]
pub struct ForkArgs {
    /// Realm to copy.
    pub realm: PathBuf,

    /// Directory name of the fork under `--path`.
    pub name: String,

    /// Parent directory of the fork.
    #[arg(long, value_name = "DIR")]
    pub path: PathBuf,

    /// Artifact group to copy (repeatable). Defaults to `common`.
    #[arg(long = "tag", value_name = "GROUP", conflicts_with = "all")]
    pub tags: Vec<String>,

    /// Copy the whole tree.
    #[arg(long)]
    pub all: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ForkArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let mut params = json!({
            "realm": absolute(&self.realm)?,
            "name": self.name,
            "path": absolute(&self.path)?,
        });
        if self.all {
            params["tags"] = json!([]);
        } else if !self.tags.is_empty() {
            params["tags"] = json!(self.tags);
        }

        let info = info_from_value(session.lifecycle(REALM_FORK, params).await?)?;
        if self.json {
            return print_json(&info);
        }
        println!("{} {}", "Forked".green().bold(), info.name);
        print_info(&info);
        Ok(())
    }
}
