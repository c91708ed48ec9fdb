use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use realm_core::config::{self, ConfigFormat, CONFIG_DIR, CONFIG_STEM, DEV_STEM};
use realm_core::PackageDescriptor;

use super::scaffold::{Scaffolder, Stub};
use super::{info_value, parse_params};
use crate::context::RealmContext;
use crate::core_tasks::REALM_CREATE;
use crate::error::{io_err, RuntimeError};
use crate::realm::Realm;
use crate::task::{Task, TaskContext};

/// Key inside an explicit scaffold object selecting the file format.
const EXT_KEY: &str = "ext";

/// Whether and how to write one of the `.realm/` files.
///
/// Decoded from `false`/absent, `true`, or an object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawScaffold")]
pub enum ScaffoldFile {
    #[default]
    Absent,
    /// Write an empty object as JSON.
    Default,
    /// Write these contents; an `ext` key picks the format and is dropped.
    Explicit(Map<String, Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScaffold {
    Flag(bool),
    Object(Map<String, Value>),
}

impl ScaffoldFile {
    /// Contents and format to write, or `None` when the file is not wanted.
    ///
    /// Fails with invalid-argument on an unsupported or non-string `ext`.
    pub fn resolve(&self) -> Result<Option<(Map<String, Value>, ConfigFormat)>, RuntimeError> {
        match self {
            ScaffoldFile::Absent => Ok(None),
            ScaffoldFile::Default => Ok(Some((Map::new(), ConfigFormat::Json))),
            ScaffoldFile::Explicit(map) => {
                let mut contents = map.clone();
                let format = match contents.remove(EXT_KEY) {
                    None => ConfigFormat::Json,
                    Some(Value::String(ext)) => ConfigFormat::from_extension(&ext).ok_or_else(|| {
                        RuntimeError::invalid_argument(format!("unsupported config extension '{ext}'"))
                    })?,
                    Some(other) => {
                        return Err(RuntimeError::invalid_argument(format!(
                            "'{EXT_KEY}' must be a string, got {other}"
                        )))
                    }
                };
                Ok(Some((contents, format)))
            }
        }
    }
}

impl From<RawScaffold> for ScaffoldFile {
    fn from(raw: RawScaffold) -> Self {
        match raw {
            RawScaffold::Flag(false) => ScaffoldFile::Absent,
            RawScaffold::Flag(true) => ScaffoldFile::Default,
            RawScaffold::Object(map) => ScaffoldFile::Explicit(map),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RealmScaffold {
    pub config: ScaffoldFile,
    pub dev: ScaffoldFile,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateOptions {
    pub name: Option<String>,
    /// Parent directory of the new realm.
    pub path: Option<PathBuf>,
    /// Directory name under `path`; defaults to `name`.
    pub dir: Option<String>,
    pub description: Option<String>,
    pub init_git: bool,
    pub init_eslint: bool,
    pub init_jsconfig: bool,
    pub realm: RealmScaffold,
}

impl CreateOptions {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: Some(name.into()),
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

/// Create a realm directory with a package descriptor and the requested
/// scaffolding, then open it.
pub async fn create(context: &RealmContext, options: CreateOptions) -> Result<Arc<Realm>, RuntimeError> {
    let name = options
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| RuntimeError::invalid_argument("'name' is required"))?;
    let base = options
        .path
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| RuntimeError::invalid_argument("'path' is required"))?;

    let target = base.join(options.dir.as_deref().unwrap_or(&name));
    if std::fs::symlink_metadata(&target).is_ok() {
        return Err(RuntimeError::already_exists(target));
    }

    let realm_config = options.realm.config.resolve()?;
    let dev_config = options.realm.dev.resolve()?;
    let scaffolder = Scaffolder::new(&name, options.description.as_deref())?;

    tracing::info!(name = %name, target = %target.display(), "creating realm");
    std::fs::create_dir_all(target.join(CONFIG_DIR)).map_err(|e| io_err(&target, e))?;
    config::save_package_at(&target, &PackageDescriptor::new(&name, options.description.clone()))?;
    write_scaffold(&target, CONFIG_STEM, realm_config)?;
    write_scaffold(&target, DEV_STEM, dev_config)?;

    if options.init_git {
        scaffolder.write(&target, Stub::GitIgnore)?;
        git_init(&target).await?;
    }
    if options.init_eslint {
        scaffolder.write(&target, Stub::Eslint)?;
    }
    if options.init_jsconfig {
        scaffolder.write(&target, Stub::JsConfig)?;
    }

    context.open(&target)
}

fn write_scaffold(root: &Path, stem: &str, resolved: Option<(Map<String, Value>, ConfigFormat)>) -> Result<(), RuntimeError> {
    let Some((contents, format)) = resolved else {
        return Ok(());
    };
    let path = config::config_file_path_at(root, stem, format);
    config::write_file(&path, &contents, format)?;
    Ok(())
}

async fn git_init(root: &Path) -> Result<(), RuntimeError> {
    let status = tokio::process::Command::new("git")
        .args(["init", "--quiet"])
        .current_dir(root)
        .status()
        .await
        .map_err(|e| io_err(root, e))?;
    if !status.success() {
        return Err(RuntimeError::TaskFailed {
            task: REALM_CREATE.to_string(),
            message: format!("git init exited with {status}"),
        });
    }
    Ok(())
}

/// `realmCreate`: params as [`CreateOptions`]; returns the new realm's info.
pub struct CreateTask;

#[async_trait]
impl Task for CreateTask {
    async fn run(&self, cx: &TaskContext, params: Value) -> Result<Value, RuntimeError> {
        let options: CreateOptions = parse_params(REALM_CREATE, params)?;
        let realm = create(&cx.context, options).await?;
        info_value(&realm)
    }
}
