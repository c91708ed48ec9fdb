//! `realm create`: scaffold a new realm.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::{json, Value};

use realm_runtime::core_tasks::REALM_CREATE;

use super::{absolute, info_from_value, print_info, print_json, Session};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Package name of the new realm.
    pub name: String,

    /// Parent directory to create the realm in.
    #[arg(long, value_name = "DIR")]
    pub path: PathBuf,

    /// Directory name under `--path` (defaults to the realm name).
    #[arg(long)]
    pub dir: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Run `git init` and write a `.gitignore`.
    #[arg(long)]
    pub git: bool,

    /// Write an `.eslintrc.js` stub.
    #[arg(long)]
    pub eslint: bool,

    /// Write a `jsconfig.json` stub.
    #[arg(long)]
    pub jsconfig: bool,

    /// Write an empty `.realm/config` file.
    #[arg(long)]
    pub config: bool,

    /// Write an empty `.realm/dev` file.
    #[arg(long)]
    pub dev: bool,

    /// Write the `.realm/` files as YAML instead of JSON.
    #[arg(long)]
    pub yaml: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl CreateArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let params = self.params()?;
        let info = info_from_value(session.lifecycle(REALM_CREATE, params).await?)?;
        if self.json {
            return print_json(&info);
        }
        println!("{} {}", "Created".green().bold(), info.name);
        print_info(&info);
        Ok(())
    }

    fn params(&self) -> Result<Value> {
        let mut params = json!({
            "name": self.name,
            "path": absolute(&self.path)?,
            "initGit": self.git,
            "initEslint": self.eslint,
            "initJsconfig": self.jsconfig,
            "realm": {
                "config": self.scaffold(self.config),
                "dev": self.scaffold(self.dev),
            },
        });
        if let Some(dir) = &self.dir {
            params["dir"] = json!(dir);
        }
        if let Some(description) = &self.description {
            params["description"] = json!(description);
        }
        Ok(params)
    }

    fn scaffold(&self, wanted: bool) -> Value {
        match (wanted, self.yaml) {
            (false, _) => json!(false),
            (true, false) => json!(true),
            (true, true) => json!({ "ext": "yaml" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CreateArgs {
        CreateArgs {
            name: "app".into(),
            path: PathBuf::from("/tmp/realms"),
            dir: None,
            description: None,
            git: false,
            eslint: false,
            jsconfig: false,
            config: false,
            dev: false,
            yaml: false,
            json: false,
        }
    }

    #[test]
    fn params_omit_unset_optionals() {
        let params = args().params().unwrap();
        assert_eq!(params["name"], "app");
        assert_eq!(params["path"], "/tmp/realms");
        assert!(params.get("dir").is_none());
        assert_eq!(params["realm"]["config"], false);
    }

    #[test]
    fn yaml_selects_extension_for_requested_files_only() {
        let params = CreateArgs {
            dev: true,
            yaml: true,
            ..args()
        }
        .params()
        .unwrap();
        assert_eq!(params["realm"]["dev"], json!({ "ext": "yaml" }));
        assert_eq!(params["realm"]["config"], false);
    }
}
