//! Realm node: a directory with its configuration, its task registry and an
//! optional structural link to the realm it is nested in.
//!
//! # Lifecycle
//!
//! `open` resolves the super realm chain (constructed, not connected).
//! `connect` connects the chain super-first, then builds this realm's
//! registry in one pass:
//!
//! 1. core tasks
//! 2. `pub` tasks inherited from the super realm
//! 3. tasks declared in `.realm/config.*`
//! 4. tasks added programmatically with [`Realm::add_task`]
//!
//! Later steps replace earlier ones on name collision. `connect` runs at
//! most once per realm; concurrent callers wait for the same attempt, and a
//! failed attempt leaves the realm unconnected.

use std::ffi::OsStr;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

use realm_core::{
    config, get_units, Artifacts, DevConfig, PackageDescriptor, RealmConfig, RealmError, Tag,
    TaskDecl, Unit,
};

use crate::context::RealmContext;
use crate::core_tasks::CoreTasks;
use crate::error::{io_err, RuntimeError};
use crate::registry::{LoadPolicy, TaskDescriptor, TaskEntry, TaskOrigin, TaskRegistry};
use crate::task::{CommandTask, Task, TaskContext, UnboundTask};

/// Directory under a realm that holds merged sub realms.
pub const OPT_DIR: &str = "opt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// When `false`, connecting fails if a task declared in this realm's
    /// config has no implementation.
    pub allow_unbound: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            allow_unbound: true,
        }
    }
}

/// Structural link to the enclosing realm.
#[derive(Clone)]
pub enum SuperRealm {
    None,
    Resolved(Arc<Realm>),
    /// An explicit or recorded path that could not be opened; reported by
    /// `connect`.
    Unresolved { path: PathBuf, reason: String },
}

impl SuperRealm {
    pub fn path(&self) -> Option<&Path> {
        match self {
            SuperRealm::None => None,
            SuperRealm::Resolved(realm) => Some(realm.cwd()),
            SuperRealm::Unresolved { path, .. } => Some(path),
        }
    }
}

impl fmt::Debug for SuperRealm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuperRealm::None => write!(f, "None"),
            SuperRealm::Resolved(realm) => f.debug_tuple("Resolved").field(&realm.cwd()).finish(),
            SuperRealm::Unresolved { path, reason } => f
                .debug_struct("Unresolved")
                .field("path", path)
                .field("reason", reason)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cwd: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_realm: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_as: Option<String>,
    pub connected: bool,
    #[serde(default)]
    pub tasks: Vec<String>,
}

pub struct Realm {
    cwd: PathBuf,
    package: PackageDescriptor,
    config: RealmConfig,
    dev_config: DevConfig,
    super_realm: SuperRealm,
    core: Arc<CoreTasks>,
    root: Weak<Realm>,
    added: Mutex<AddedTasks>,
    registry: RwLock<TaskRegistry>,
    connection: OnceCell<()>,
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("cwd", &self.cwd)
            .field("name", &self.package.name)
            .field("super_realm", &self.super_realm)
            .field("connected", &self.is_connected())
            .finish()
    }
}

type LoadedParts = (PackageDescriptor, RealmConfig, DevConfig);

/// Programmatic additions, and whether the connect merge has consumed them.
///
/// Both live under one lock so an addition racing a connect either lands in
/// the staged list before the registry is built, or goes to the installed
/// registry after.
#[derive(Default)]
struct AddedTasks {
    staged: Vec<(TaskEntry, LoadPolicy)>,
    installed: bool,
}

fn load_parts(cwd: &Path) -> Result<LoadedParts, RealmError> {
    let package = config::load_package_at(cwd)?;
    let realm_config = config::load_realm_config_at(cwd)?;
    let dev_config = config::load_dev_config_at(cwd)?;
    Ok((package, realm_config, dev_config))
}

fn canonical(cwd: &Path) -> Result<PathBuf, RuntimeError> {
    if !cwd.is_dir() {
        return Err(RealmError::NotARealm {
            path: cwd.to_path_buf(),
        }
        .into());
    }
    std::fs::canonicalize(cwd).map_err(|e| io_err(cwd, e))
}

impl Realm {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub(crate) fn open_root(home: &Path, core: Arc<CoreTasks>) -> Result<Arc<Realm>, RuntimeError> {
        let cwd = canonical(home)?;
        let (package, config, dev_config) = load_parts(&cwd)?;
        Ok(Arc::new_cyclic(|root| Realm {
            cwd,
            package,
            config,
            dev_config,
            super_realm: SuperRealm::None,
            core,
            root: root.clone(),
            added: Mutex::new(AddedTasks::default()),
            registry: RwLock::new(TaskRegistry::new()),
            connection: OnceCell::new(),
        }))
    }

    /// Open the realm at `cwd` and resolve its super realm chain.
    ///
    /// Fails with [`RealmError::NotARealm`] if `cwd` has no package
    /// descriptor.
    pub fn open(cwd: impl AsRef<Path>, context: &RealmContext) -> Result<Arc<Realm>, RuntimeError> {
        let mut chain = Vec::new();
        Self::open_chain(cwd.as_ref(), context, &mut chain)
    }

    fn open_chain(
        cwd: &Path,
        context: &RealmContext,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Arc<Realm>, RuntimeError> {
        let cwd = canonical(cwd)?;
        let root = context.root();
        if cwd == root.cwd {
            return Ok(root);
        }
        if chain.contains(&cwd) {
            return Err(RealmError::SuperRealmCycle { path: cwd }.into());
        }
        chain.push(cwd.clone());

        let (package, config, dev_config) = load_parts(&cwd)?;
        let super_realm = Self::resolve_super(&cwd, &config, &dev_config, context, chain)?;
        tracing::debug!(cwd = %cwd.display(), super_realm = ?super_realm.path(), "opened realm");

        Ok(Arc::new(Realm {
            cwd,
            package,
            config,
            dev_config,
            super_realm,
            core: Arc::clone(context.core()),
            root: Arc::downgrade(&root),
            added: Mutex::new(AddedTasks::default()),
            registry: RwLock::new(TaskRegistry::new()),
            connection: OnceCell::new(),
        }))
    }

    /// Nesting under `<super>/opt/` wins, then an explicit `superRealm` in
    /// the config, then linkage recorded in the dev file, then the root.
    fn resolve_super(
        cwd: &Path,
        realm_config: &RealmConfig,
        dev_config: &DevConfig,
        context: &RealmContext,
        chain: &mut Vec<PathBuf>,
    ) -> Result<SuperRealm, RuntimeError> {
        let structural = cwd
            .parent()
            .filter(|parent| parent.file_name() == Some(OsStr::new(OPT_DIR)))
            .and_then(Path::parent)
            .filter(|grandparent| config::is_realm_dir(grandparent));
        if let Some(grandparent) = structural {
            return Ok(SuperRealm::Resolved(Self::open_chain(grandparent, context, chain)?));
        }

        let explicit = realm_config
            .super_realm
            .as_ref()
            .or(dev_config.super_realm.as_ref());
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                cwd.join(path)
            };
            return match Self::open_chain(&path, context, chain) {
                Ok(realm) => Ok(SuperRealm::Resolved(realm)),
                Err(err @ RuntimeError::Realm(RealmError::SuperRealmCycle { .. })) => Err(err),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "super realm unavailable");
                    Ok(SuperRealm::Unresolved {
                        path,
                        reason: err.to_string(),
                    })
                }
            };
        }

        Ok(SuperRealm::Resolved(context.root()))
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn package(&self) -> &PackageDescriptor {
        &self.package
    }

    pub fn config(&self) -> &RealmConfig {
        &self.config
    }

    pub fn dev_config(&self) -> &DevConfig {
        &self.dev_config
    }

    pub fn super_realm(&self) -> &SuperRealm {
        &self.super_realm
    }

    pub fn is_root(&self) -> bool {
        self.root
            .upgrade()
            .map_or(false, |root| std::ptr::eq(Arc::as_ptr(&root), self))
    }

    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    /// Recover the context this realm was opened from.
    pub fn context(&self) -> Result<RealmContext, RuntimeError> {
        let root = self.root.upgrade().ok_or(RuntimeError::ContextDropped)?;
        Ok(RealmContext::from_parts(Arc::clone(&self.core), root))
    }

    /// Build units declared in the dev file.
    pub fn units(&self) -> Result<Vec<Unit>, RealmError> {
        get_units(&self.dev_config)
    }

    pub fn artifacts(&self) -> Artifacts {
        Artifacts::new(&self.cwd, &self.config)
    }

    pub fn info(&self) -> RealmInfo {
        RealmInfo {
            name: self.package.name.clone(),
            version: self.package.version.clone(),
            description: self.package.description.clone(),
            cwd: self.cwd.clone(),
            super_realm: self.super_realm.path().map(Path::to_path_buf),
            merged_as: self.dev_config.merged_as.clone(),
            connected: self.is_connected(),
            tasks: self.task_names(None),
        }
    }

    // -----------------------------------------------------------------------
    // Connect
    // -----------------------------------------------------------------------

    /// Connect the super chain, then build this realm's task registry.
    pub async fn connect(&self, options: ConnectOptions) -> Result<(), RuntimeError> {
        self.connection
            .get_or_try_init(|| self.establish(options))
            .await
            .map(|_| ())
    }

    fn establish(
        &self,
        options: ConnectOptions,
    ) -> Pin<Box<dyn Future<Output = Result<(), RuntimeError>> + Send + '_>> {
        Box::pin(async move {
            let inherited = match &self.super_realm {
                SuperRealm::None => Vec::new(),
                SuperRealm::Resolved(sup) => {
                    sup.connect(options).await?;
                    sup.inheritable_entries()
                }
                SuperRealm::Unresolved { path, reason } => {
                    return Err(RuntimeError::SuperRealmUnavailable {
                        path: path.clone(),
                        reason: reason.clone(),
                    })
                }
            };

            let mut added = self.added.lock().unwrap_or_else(PoisonError::into_inner);
            let registry = self.build_registry(inherited, &added.staged, options)?;
            tracing::debug!(
                cwd = %self.cwd.display(),
                tasks = registry.len(),
                "realm connected"
            );
            *self.registry.write().unwrap_or_else(PoisonError::into_inner) = registry;
            added.installed = true;
            Ok(())
        })
    }

    fn build_registry(
        &self,
        inherited: Vec<TaskEntry>,
        staged: &[(TaskEntry, LoadPolicy)],
        options: ConnectOptions,
    ) -> Result<TaskRegistry, RuntimeError> {
        let mut registry = TaskRegistry::new();
        for entry in self.core.entries() {
            registry.insert(entry, LoadPolicy::Replace)?;
        }
        for entry in inherited {
            registry.insert(entry, LoadPolicy::Replace)?;
        }
        for (name, decl) in &self.config.tasks {
            registry.insert(declared_entry(name, decl), LoadPolicy::Replace)?;
        }
        for (entry, policy) in staged {
            registry.bind_or_insert(entry.clone(), *policy)?;
        }

        if !options.allow_unbound {
            let unbound = self
                .config
                .tasks
                .keys()
                .find(|name| registry.get(name).is_some_and(|e| !e.is_bound()));
            if let Some(name) = unbound {
                return Err(RuntimeError::TaskNotBound(name.clone()));
            }
        }
        Ok(registry)
    }

    fn inheritable_entries(&self) -> Vec<TaskEntry> {
        self.read_registry().inheritable(&self.cwd)
    }

    fn read_registry(&self) -> std::sync::RwLockReadGuard<'_, TaskRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Registry API
    // -----------------------------------------------------------------------

    /// Register an implementation under `descriptor.name`.
    ///
    /// A task declared in the config takes this implementation (tags are
    /// merged) instead of colliding. Before
    /// `connect` the task is held until the registry is built; afterwards it
    /// goes straight into the live registry.
    pub fn add_task(
        &self,
        descriptor: TaskDescriptor,
        task: Arc<dyn Task>,
        policy: LoadPolicy,
    ) -> Result<bool, RuntimeError> {
        let entry = TaskEntry::new(descriptor, TaskOrigin::Local, task);
        let mut added = self.added.lock().unwrap_or_else(PoisonError::into_inner);
        if added.installed {
            return self
                .registry
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .bind_or_insert(entry, policy);
        }

        let staged = &mut added.staged;
        if let Some(pos) = staged.iter().position(|(e, _)| e.name() == entry.name()) {
            match policy {
                LoadPolicy::Throw => return Err(RuntimeError::TaskExists(entry.name().to_string())),
                LoadPolicy::Ignore => return Ok(false),
                LoadPolicy::Replace => {
                    staged.remove(pos);
                }
            }
        }
        staged.push((entry, policy));
        Ok(true)
    }

    /// Remove `name` from the live registry and from pending additions.
    pub fn delete_task(&self, name: &str) -> bool {
        let mut added = self.added.lock().unwrap_or_else(PoisonError::into_inner);
        let before = added.staged.len();
        added.staged.retain(|(e, _)| e.name() != name);
        let pending = added.staged.len() != before;
        drop(added);

        let live = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        pending || live
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.read_registry().contains(name)
    }

    pub fn task(&self, name: &str) -> Option<TaskDescriptor> {
        self.read_registry().get(name).map(|e| e.descriptor.clone())
    }

    /// Registered names, all or only those carrying `tag`. Empty until
    /// connected.
    pub fn task_names(&self, tag: Option<Tag>) -> Vec<String> {
        self.read_registry().names(tag)
    }

    /// Snapshot of every registry entry.
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.read_registry().entries().cloned().collect()
    }

    /// Dispatch `name` on this realm and wait for its result.
    pub async fn run_and_wait(self: &Arc<Self>, name: &str, params: Value) -> Result<Value, RuntimeError> {
        if !self.is_connected() {
            return Err(RuntimeError::NotConnected {
                path: self.cwd.clone(),
            });
        }
        let entry = self
            .read_registry()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownTask(name.to_string()))?;

        let cx = TaskContext {
            realm: Arc::clone(self),
            context: self.context()?,
        };
        tracing::debug!(task = name, origin = %entry.origin, cwd = %self.cwd.display(), "running task");
        entry.task.run(&cx, params).await
    }
}

/// Registry entry for a config declaration: its command if it has one,
/// otherwise a placeholder waiting for [`Realm::add_task`].
fn declared_entry(name: &str, decl: &TaskDecl) -> TaskEntry {
    let mut descriptor = TaskDescriptor::new(name).with_tags(decl.tags());
    if let Some(description) = decl.description() {
        descriptor = descriptor.with_description(description);
    }
    let task: Arc<dyn Task> = match decl.command() {
        Some(command) => Arc::new(CommandTask::new(name, command)),
        None => Arc::new(UnboundTask::new(name)),
    };
    TaskEntry::declared(descriptor, task)
}
