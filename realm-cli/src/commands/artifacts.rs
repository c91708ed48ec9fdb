//! `realm artifacts`: artifact groups and their entries.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use realm_core::ArtifactEntry;

use super::{print_json, Session};

#[derive(Args, Debug)]
pub struct ArtifactsArgs {
    /// Realm directory (defaults to the current directory).
    pub realm: Option<PathBuf>,

    /// List the entries of this group instead of the group summary.
    #[arg(long)]
    pub group: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Entries")]
    entries: usize,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Kind")]
    kind: String,
}

impl From<&ArtifactEntry> for EntryRow {
    fn from(entry: &ArtifactEntry) -> Self {
        Self {
            path: entry.path.display().to_string(),
            kind: entry.kind.to_string(),
        }
    }
}

impl ArtifactsArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let realm = session.realm(self.realm.as_deref()).await?;
        let artifacts = realm.artifacts();

        if let Some(group) = &self.group {
            let entries = artifacts
                .get(group)
                .with_context(|| format!("failed to classify group '{group}'"))?;
            if self.json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("Group '{group}' is empty.");
                return Ok(());
            }
            let mut table = Table::new(entries.iter().map(EntryRow::from));
            table.with(Style::rounded());
            println!("{table}");
            return Ok(());
        }

        let mut rows = Vec::new();
        for group in artifacts.group_names() {
            let entries = artifacts
                .get(&group)
                .with_context(|| format!("failed to classify group '{group}'"))?
                .len();
            rows.push(GroupRow { group, entries });
        }
        if self.json {
            return print_json(&rows);
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
