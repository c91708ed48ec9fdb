//! Filesystem lifecycle operations: create, fork, merge, info and mount.
//!
//! Each operation has a typed entry point and a [`Task`](crate::Task)
//! wrapper that decodes JSON params for registry dispatch. Validation runs
//! before the first filesystem mutation; once copying has started a failure
//! is returned as-is and whatever was written stays on disk.

mod create;
mod fork;
mod info;
mod merge;
mod scaffold;

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::RealmContext;
use crate::error::RuntimeError;
use crate::realm::Realm;

pub use create::{create, CreateOptions, CreateTask, RealmScaffold, ScaffoldFile};
pub use fork::{fork, ForkOptions, ForkTask};
pub use info::{mount, InfoTask, MountTask};
pub use merge::{merge, MergeOptions, MergeTask, MergedRealm};
pub use scaffold::Stub;

/// A realm given either by path or as an already opened node.
#[derive(Debug, Clone)]
pub enum RealmRef {
    Path(PathBuf),
    Realm(Arc<Realm>),
}

impl RealmRef {
    pub fn open(&self, context: &RealmContext) -> Result<Arc<Realm>, RuntimeError> {
        match self {
            RealmRef::Path(path) => context.open(path),
            RealmRef::Realm(realm) => Ok(Arc::clone(realm)),
        }
    }

    /// Decode a JSON param; only strings are accepted.
    fn from_param(field: &str, value: Option<&Value>) -> Result<Option<Self>, RuntimeError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(RealmRef::Path(PathBuf::from(s)))),
            Some(other) => Err(RuntimeError::not_valid(format!(
                "'{field}' must be a realm path, got {other}"
            ))),
        }
    }
}

impl From<PathBuf> for RealmRef {
    fn from(path: PathBuf) -> Self {
        RealmRef::Path(path)
    }
}

impl From<&std::path::Path> for RealmRef {
    fn from(path: &std::path::Path) -> Self {
        RealmRef::Path(path.to_path_buf())
    }
}

impl From<Arc<Realm>> for RealmRef {
    fn from(realm: Arc<Realm>) -> Self {
        RealmRef::Realm(realm)
    }
}

/// Decode task params; `null` reads as an empty object.
fn parse_params<T: DeserializeOwned>(task: &str, params: Value) -> Result<T, RuntimeError> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(params)
        .map_err(|e| RuntimeError::not_valid(format!("invalid params for '{task}': {e}")))
}

fn info_value(realm: &Realm) -> Result<Value, RuntimeError> {
    serde_json::to_value(realm.info()).map_err(|e| RuntimeError::Realm(e.into()))
}
