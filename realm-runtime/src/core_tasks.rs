//! The always-present core task table.
//!
//! | Task | Kind |
//! |------|------|
//! | `realmCreate`, `realmFork`, `realmMerge`, `realmInfo`, `realmMount` | lifecycle, built in |
//! | `clean`, `build`, `copy`, `cmake`, `transpile`, `transpileExe`, `watch`, `increaseVersion` | slot, bound by the embedder |
//!
//! Every core task carries the `pub` tag and is registered in every realm.

use std::collections::BTreeMap;
use std::sync::Arc;

use realm_core::Tag;

use crate::error::RuntimeError;
use crate::lifecycle::{CreateTask, ForkTask, InfoTask, MergeTask, MountTask};
use crate::registry::{TaskDescriptor, TaskEntry, TaskOrigin};
use crate::task::{Task, UnboundTask};

pub const REALM_CREATE: &str = "realmCreate";
pub const REALM_FORK: &str = "realmFork";
pub const REALM_MERGE: &str = "realmMerge";
pub const REALM_INFO: &str = "realmInfo";
pub const REALM_MOUNT: &str = "realmMount";

pub const LIFECYCLE_TASKS: [&str; 5] = [REALM_CREATE, REALM_FORK, REALM_MERGE, REALM_INFO, REALM_MOUNT];

pub const SLOT_TASKS: [&str; 8] = [
    "clean",
    "build",
    "copy",
    "cmake",
    "transpile",
    "transpileExe",
    "watch",
    "increaseVersion",
];

fn description_of(name: &str) -> &'static str {
    match name {
        REALM_CREATE => "Create a new realm",
        REALM_FORK => "Fork a realm into a new directory",
        REALM_MERGE => "Merge a realm into a super realm",
        REALM_INFO => "Describe a realm",
        REALM_MOUNT => "Open and connect a realm",
        "clean" => "Remove build outputs",
        "build" => "Build units",
        "copy" => "Copy unit sources",
        "cmake" => "Build native units",
        "transpile" => "Transpile unit sources",
        "transpileExe" => "Transpile executables",
        "watch" => "Rebuild units on change",
        "increaseVersion" => "Bump the package version",
        _ => "",
    }
}

/// Core task implementations shared by every realm in a context.
#[derive(Clone)]
pub struct CoreTasks {
    tasks: BTreeMap<String, Arc<dyn Task>>,
}

impl CoreTasks {
    /// Lifecycle tasks bound, every slot unbound.
    pub fn new() -> Self {
        let mut tasks: BTreeMap<String, Arc<dyn Task>> = BTreeMap::new();
        tasks.insert(REALM_CREATE.into(), Arc::new(CreateTask));
        tasks.insert(REALM_FORK.into(), Arc::new(ForkTask));
        tasks.insert(REALM_MERGE.into(), Arc::new(MergeTask));
        tasks.insert(REALM_INFO.into(), Arc::new(InfoTask));
        tasks.insert(REALM_MOUNT.into(), Arc::new(MountTask));
        for slot in SLOT_TASKS {
            tasks.insert(slot.into(), Arc::new(UnboundTask::new(slot)));
        }
        Self { tasks }
    }

    /// Bind an implementation to one of the slot tasks.
    pub fn with_binding(mut self, name: &str, task: Arc<dyn Task>) -> Result<Self, RuntimeError> {
        if !SLOT_TASKS.contains(&name) {
            return Err(RuntimeError::UnknownTask(name.to_string()));
        }
        self.tasks.insert(name.to_string(), task);
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn entries(&self) -> Vec<TaskEntry> {
        self.tasks
            .iter()
            .map(|(name, task)| {
                TaskEntry::new(
                    TaskDescriptor::new(name.clone())
                        .with_tags([Tag::Pub])
                        .with_description(description_of(name)),
                    TaskOrigin::Core,
                    Arc::clone(task),
                )
            })
            .collect()
    }
}

impl Default for CoreTasks {
    fn default() -> Self {
        Self::new()
    }
}
