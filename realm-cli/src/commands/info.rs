//! `realm info`

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{print_info, print_json, Session};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Realm directory (defaults to the current directory).
    pub realm: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl InfoArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let realm = session.realm(self.realm.as_deref()).await?;
        let info = realm.info();
        if self.json {
            return print_json(&info);
        }
        print_info(&info);
        Ok(())
    }
}
