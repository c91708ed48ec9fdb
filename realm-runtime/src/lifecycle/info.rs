use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{info_value, RealmRef};
use crate::context::RealmContext;
use crate::error::RuntimeError;
use crate::realm::{ConnectOptions, Realm};
use crate::task::{Task, TaskContext};

/// Open the realm at `path` (recovering any recorded merge linkage) and
/// connect it.
pub async fn mount(context: &RealmContext, path: impl AsRef<Path>) -> Result<Arc<Realm>, RuntimeError> {
    let realm = context.open(path)?;
    realm.connect(ConnectOptions::default()).await?;
    tracing::info!(cwd = %realm.cwd().display(), name = realm.name(), "mounted realm");
    Ok(realm)
}

/// `realmInfo`: `{realm?}`; describes the given realm, or the one the task
/// runs on.
pub struct InfoTask;

#[async_trait]
impl Task for InfoTask {
    async fn run(&self, cx: &TaskContext, params: Value) -> Result<Value, RuntimeError> {
        match RealmRef::from_param("realm", params.get("realm"))? {
            Some(target) => {
                let realm = target.open(&cx.context)?;
                info_value(&realm)
            }
            None => info_value(&cx.realm),
        }
    }
}

/// `realmMount`: `{realm}`; returns the mounted realm's info.
pub struct MountTask;

#[async_trait]
impl Task for MountTask {
    async fn run(&self, cx: &TaskContext, params: Value) -> Result<Value, RuntimeError> {
        let target = RealmRef::from_param("realm", params.get("realm"))?
            .ok_or_else(|| RuntimeError::not_valid("'realm' is required"))?;
        let realm = match target {
            RealmRef::Path(path) => mount(&cx.context, path).await?,
            RealmRef::Realm(realm) => {
                realm.connect(ConnectOptions::default()).await?;
                realm
            }
        };
        info_value(&realm)
    }
}
