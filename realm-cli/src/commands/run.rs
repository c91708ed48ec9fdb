//! `realm run`: run a task in a realm and print its result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use super::{print_json, Session};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task name.
    pub task: String,

    /// Realm directory (defaults to the current directory).
    #[arg(long)]
    pub realm: Option<PathBuf>,

    /// Task parameters as a JSON document.
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,
}

impl RunArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let params = match &self.params {
            Some(raw) => serde_json::from_str(raw).context("--params is not valid JSON")?,
            None => Value::Null,
        };
        let realm = session.realm(self.realm.as_deref()).await?;
        let result = realm
            .run_and_wait(&self.task, params)
            .await
            .with_context(|| format!("task '{}' failed in {}", self.task, realm.name()))?;

        match result {
            Value::Null => Ok(()),
            Value::String(text) => {
                println!("{text}");
                Ok(())
            }
            other => print_json(&other),
        }
    }
}
