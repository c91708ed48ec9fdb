//! `realm tasks`: the registry of a connected realm.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use realm_core::Tag;
use realm_runtime::{TaskEntry, TaskOrigin};

use super::{print_json, Session};

#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Realm directory (defaults to the current directory).
    pub realm: Option<PathBuf>,

    /// Only list tasks carrying this tag (pub, dev, private).
    #[arg(long)]
    pub tag: Option<Tag>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct TaskJson {
    name: String,
    tags: Vec<Tag>,
    origin: TaskOrigin,
    bound: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Task")]
    name: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Origin")]
    origin: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl TasksArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let realm = session.realm(self.realm.as_deref()).await?;
        let entries: Vec<TaskEntry> = realm
            .task_entries()
            .into_iter()
            .filter(|entry| self.tag.map_or(true, |tag| entry.descriptor.has_tag(tag)))
            .collect();

        if self.json {
            let tasks: Vec<TaskJson> = entries.into_iter().map(to_json).collect();
            return print_json(&tasks);
        }

        if entries.is_empty() {
            println!("No tasks in {}.", realm.name());
            return Ok(());
        }
        let rows: Vec<TaskRow> = entries.iter().map(to_row).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn to_json(entry: TaskEntry) -> TaskJson {
    TaskJson {
        bound: entry.is_bound(),
        name: entry.descriptor.name,
        tags: entry.descriptor.tags.into_iter().collect(),
        origin: entry.origin,
        description: entry.descriptor.description,
    }
}

fn to_row(entry: &TaskEntry) -> TaskRow {
    let tags: Vec<String> = entry.descriptor.tags.iter().map(Tag::to_string).collect();
    let mut description = entry.descriptor.description.clone().unwrap_or_default();
    if !entry.is_bound() {
        description = format!("{description} (unbound)").trim_start().to_string();
    }
    TaskRow {
        name: entry.name().to_string(),
        tags: tags.join(","),
        origin: entry.origin.to_string(),
        description,
    }
}
