//! Process-scoped context: the root realm and the core task table.

use std::path::Path;
use std::sync::Arc;

use realm_core::config::{self, CONFIG_DIR};
use realm_core::PackageDescriptor;

use crate::core_tasks::CoreTasks;
use crate::error::{io_err, RuntimeError};
use crate::realm::{ConnectOptions, Realm};

const ROOT_NAME: &str = "realm-root";

/// Handle threaded through everything that needs the root realm.
///
/// Cheap to clone. Realms only hold a weak reference back to the root, so
/// the context (or a clone of it) must outlive the realms opened from it.
#[derive(Clone)]
pub struct RealmContext {
    core: Arc<CoreTasks>,
    root: Arc<Realm>,
}

impl RealmContext {
    /// Build the context rooted at `home`, bootstrapping the root realm's
    /// package descriptor and config directory if they are missing.
    pub fn init_at(home: impl AsRef<Path>, core: CoreTasks) -> Result<Self, RuntimeError> {
        let home = home.as_ref();
        bootstrap_root(home)?;
        let core = Arc::new(core);
        let root = Realm::open_root(home, Arc::clone(&core))?;
        tracing::debug!(home = %root.cwd().display(), "root realm ready");
        Ok(Self { core, root })
    }

    /// [`init_at`](Self::init_at) with `$REALM_HOME`, else `~/.realms`.
    pub fn init(core: CoreTasks) -> Result<Self, RuntimeError> {
        let home = realm_core::default_home()?;
        Self::init_at(home, core)
    }

    pub(crate) fn from_parts(core: Arc<CoreTasks>, root: Arc<Realm>) -> Self {
        Self { core, root }
    }

    pub fn root(&self) -> Arc<Realm> {
        Arc::clone(&self.root)
    }

    pub fn core(&self) -> &Arc<CoreTasks> {
        &self.core
    }

    /// Connect the root realm. Idempotent.
    pub async fn connect_root(&self) -> Result<(), RuntimeError> {
        self.root.connect(ConnectOptions::default()).await
    }

    /// Open (but do not connect) the realm at `cwd`.
    pub fn open(&self, cwd: impl AsRef<Path>) -> Result<Arc<Realm>, RuntimeError> {
        Realm::open(cwd, self)
    }

    /// Open and connect the realm at `cwd`.
    pub async fn open_connected(
        &self,
        cwd: impl AsRef<Path>,
        options: ConnectOptions,
    ) -> Result<Arc<Realm>, RuntimeError> {
        let realm = self.open(cwd)?;
        realm.connect(options).await?;
        Ok(realm)
    }
}

fn bootstrap_root(home: &Path) -> Result<(), RuntimeError> {
    std::fs::create_dir_all(home.join(CONFIG_DIR)).map_err(|e| io_err(home, e))?;
    if !config::is_realm_dir(home) {
        tracing::info!(home = %home.display(), "initialising root realm");
        config::save_package_at(home, &PackageDescriptor::new(ROOT_NAME, None))?;
    }
    Ok(())
}
