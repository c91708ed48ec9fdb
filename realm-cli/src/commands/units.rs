//! `realm units`: resolved build units of a realm.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use realm_core::Unit;

use super::{print_json, Session};

#[derive(Args, Debug)]
pub struct UnitsArgs {
    /// Realm directory (defaults to the current directory).
    pub realm: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Src")]
    src: String,
    #[tabled(rename = "Dst")]
    dst: String,
    #[tabled(rename = "Task")]
    task: String,
}

impl From<&Unit> for UnitRow {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id.clone(),
            src: unit.src.patterns().join(", "),
            dst: unit.dst.clone().unwrap_or_else(|| "-".into()),
            task: unit.task.clone(),
        }
    }
}

impl UnitsArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let realm = session.realm(self.realm.as_deref()).await?;
        let units = realm
            .units()
            .with_context(|| format!("invalid units in {}", realm.name()))?;

        if self.json {
            return print_json(&units);
        }
        if units.is_empty() {
            println!("No units declared in {}.", realm.name());
            return Ok(());
        }
        let mut table = Table::new(units.iter().map(UnitRow::from));
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
