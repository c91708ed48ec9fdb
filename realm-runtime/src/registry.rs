//! Per-realm task registry: name → descriptor, origin and implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use realm_core::{Tag, TagSet};
use serde::Serialize;

use crate::error::RuntimeError;
use crate::task::Task;

/// Collision handling when a name is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Fail with [`RuntimeError::TaskExists`].
    #[default]
    Throw,
    /// Keep the existing entry.
    Ignore,
    /// Overwrite the existing entry.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    pub name: String,
    pub tags: TagSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: TagSet::new(),
            description: None,
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Where a registry entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskOrigin {
    Core,
    Local,
    Inherited { from: PathBuf },
}

impl fmt::Display for TaskOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOrigin::Core => write!(f, "core"),
            TaskOrigin::Local => write!(f, "local"),
            TaskOrigin::Inherited { from } => write!(f, "inherited ({})", from.display()),
        }
    }
}

#[derive(Clone)]
pub struct TaskEntry {
    pub descriptor: TaskDescriptor,
    pub origin: TaskOrigin,
    pub task: Arc<dyn Task>,
    /// Declared in config and still waiting for an added implementation.
    pub(crate) awaiting_binding: bool,
}

impl TaskEntry {
    pub fn new(descriptor: TaskDescriptor, origin: TaskOrigin, task: Arc<dyn Task>) -> Self {
        Self {
            descriptor,
            origin,
            task,
            awaiting_binding: false,
        }
    }

    pub(crate) fn declared(descriptor: TaskDescriptor, task: Arc<dyn Task>) -> Self {
        Self {
            awaiting_binding: true,
            ..Self::new(descriptor, TaskOrigin::Local, task)
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn is_bound(&self) -> bool {
        self.task.is_bound()
    }
}

impl fmt::Debug for TaskEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEntry")
            .field("descriptor", &self.descriptor)
            .field("origin", &self.origin)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    entries: BTreeMap<String, TaskEntry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under `policy`. Returns `false` only when `Ignore` kept an
    /// existing entry.
    pub fn insert(&mut self, entry: TaskEntry, policy: LoadPolicy) -> Result<bool, RuntimeError> {
        if self.entries.contains_key(entry.name()) {
            match policy {
                LoadPolicy::Throw => return Err(RuntimeError::TaskExists(entry.name().to_string())),
                LoadPolicy::Ignore => return Ok(false),
                LoadPolicy::Replace => {}
            }
        }
        self.entries.insert(entry.name().to_string(), entry);
        Ok(true)
    }

    /// Like [`insert`](Self::insert), except that a config declaration still
    /// waiting for an implementation takes `entry`'s task and tags instead
    /// of colliding.
    pub fn bind_or_insert(&mut self, entry: TaskEntry, policy: LoadPolicy) -> Result<bool, RuntimeError> {
        if let Some(existing) = self.entries.get_mut(entry.name()) {
            if existing.awaiting_binding {
                existing.descriptor.tags.extend(entry.descriptor.tags.iter().copied());
                if entry.descriptor.description.is_some() {
                    existing.descriptor.description = entry.descriptor.description;
                }
                existing.task = entry.task;
                existing.awaiting_binding = false;
                return Ok(true);
            }
        }
        self.insert(entry, policy)
    }

    pub fn remove(&mut self, name: &str) -> Option<TaskEntry> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&TaskEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted names, optionally restricted to entries carrying `tag`.
    pub fn names(&self, tag: Option<Tag>) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| tag.map_or(true, |t| e.descriptor.has_tag(t)))
            .map(|e| e.name().to_string())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &TaskEntry> {
        self.entries.values()
    }

    /// Entries a sub realm of `owner` inherits: `pub`-tagged, non-core.
    /// Entries this registry itself inherited keep their original source.
    pub fn inheritable(&self, owner: &Path) -> Vec<TaskEntry> {
        self.entries
            .values()
            .filter(|e| e.origin != TaskOrigin::Core)
            .filter(|e| e.descriptor.tags.iter().any(|t| t.is_inheritable()))
            .map(|e| {
                let origin = match &e.origin {
                    TaskOrigin::Inherited { from } => TaskOrigin::Inherited { from: from.clone() },
                    _ => TaskOrigin::Inherited {
                        from: owner.to_path_buf(),
                    },
                };
                TaskEntry {
                    origin,
                    awaiting_binding: false,
                    ..e.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::UnboundTask;
    use rstest::rstest;

    fn entry(name: &str, tags: &[Tag], origin: TaskOrigin) -> TaskEntry {
        TaskEntry::new(
            TaskDescriptor::new(name).with_tags(tags.iter().copied()),
            origin,
            Arc::new(UnboundTask::new(name)),
        )
    }

    #[rstest]
    #[case(LoadPolicy::Ignore, Some(false), TaskOrigin::Core)]
    #[case(LoadPolicy::Replace, Some(true), TaskOrigin::Local)]
    #[case(LoadPolicy::Throw, None, TaskOrigin::Core)]
    fn collision_follows_policy(
        #[case] policy: LoadPolicy,
        #[case] expected: Option<bool>,
        #[case] survivor: TaskOrigin,
    ) {
        let mut registry = TaskRegistry::new();
        registry.insert(entry("build", &[Tag::Pub], TaskOrigin::Core), LoadPolicy::Throw).unwrap();

        let result = registry.insert(entry("build", &[], TaskOrigin::Local), policy);
        match expected {
            Some(value) => assert_eq!(result.unwrap(), value),
            None => assert!(matches!(result, Err(RuntimeError::TaskExists(ref n)) if n == "build")),
        }
        assert_eq!(registry.get("build").unwrap().origin, survivor);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn names_filter_by_tag() {
        let mut registry = TaskRegistry::new();
        registry.insert(entry("a", &[Tag::Pub], TaskOrigin::Local), LoadPolicy::Throw).unwrap();
        registry.insert(entry("b", &[Tag::Dev], TaskOrigin::Local), LoadPolicy::Throw).unwrap();
        registry.insert(entry("c", &[], TaskOrigin::Local), LoadPolicy::Throw).unwrap();

        assert_eq!(registry.names(None), ["a", "b", "c"]);
        assert_eq!(registry.names(Some(Tag::Pub)), ["a"]);
        assert_eq!(registry.names(Some(Tag::Dev)), ["b"]);
        assert!(registry.names(Some(Tag::Private)).is_empty());
    }

    #[test]
    fn inheritable_skips_core_and_keeps_original_source() {
        let mut registry = TaskRegistry::new();
        registry.insert(entry("core", &[Tag::Pub], TaskOrigin::Core), LoadPolicy::Throw).unwrap();
        registry.insert(entry("mine", &[Tag::Pub], TaskOrigin::Local), LoadPolicy::Throw).unwrap();
        registry.insert(entry("hidden", &[Tag::Dev], TaskOrigin::Local), LoadPolicy::Throw).unwrap();
        registry
            .insert(
                entry("far", &[Tag::Pub], TaskOrigin::Inherited { from: "/top".into() }),
                LoadPolicy::Throw,
            )
            .unwrap();

        let inherited = registry.inheritable(Path::new("/mid"));
        let summary: Vec<(&str, &TaskOrigin)> =
            inherited.iter().map(|e| (e.name(), &e.origin)).collect();
        assert_eq!(
            summary,
            [
                ("far", &TaskOrigin::Inherited { from: "/top".into() }),
                ("mine", &TaskOrigin::Inherited { from: "/mid".into() }),
            ]
        );
    }

    #[test]
    fn declared_entry_takes_added_implementation() {
        let mut registry = TaskRegistry::new();
        registry
            .insert(
                TaskEntry::declared(
                    TaskDescriptor::new("lint").with_tags([Tag::Dev]),
                    Arc::new(UnboundTask::new("lint")),
                ),
                LoadPolicy::Replace,
            )
            .unwrap();

        let added = TaskEntry::new(
            TaskDescriptor::new("lint").with_tags([Tag::Pub]),
            TaskOrigin::Local,
            crate::task::task_fn(|_, _| Ok(serde_json::Value::Null)),
        );
        assert!(registry.bind_or_insert(added.clone(), LoadPolicy::Throw).unwrap());

        let bound = registry.get("lint").unwrap();
        assert!(bound.is_bound());
        assert_eq!(bound.descriptor.tags, TagSet::from([Tag::Pub, Tag::Dev]));

        // A second registration is an ordinary collision.
        assert!(registry.bind_or_insert(added, LoadPolicy::Throw).is_err());
    }
}
