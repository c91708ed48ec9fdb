//! `realm mount`: open and connect a realm.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use realm_runtime::core_tasks::REALM_MOUNT;

use super::{absolute, info_from_value, print_info, print_json, Session};

#[derive(Args, Debug)]
pub struct MountArgs {
    /// Realm directory.
    pub realm: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl MountArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let params = json!({ "realm": absolute(&self.realm)? });
        let info = info_from_value(session.lifecycle(REALM_MOUNT, params).await?)?;
        if self.json {
            return print_json(&info);
        }
        print_info(&info);
        Ok(())
    }
}
