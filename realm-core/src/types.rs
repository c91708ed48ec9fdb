//! Domain types for realm configuration.
//!
//! Everything read from `.realm/config.*`, `.realm/dev.*` and `package.json`
//! deserializes into the types below. All path fields use `PathBuf`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Visibility label attached to a task.
///
/// Only [`Tag::Pub`] tasks are inherited by sub realms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Pub,
    Dev,
    Private,
}

impl Tag {
    pub fn is_inheritable(self) -> bool {
        matches!(self, Tag::Pub)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Pub => write!(f, "pub"),
            Tag::Dev => write!(f, "dev"),
            Tag::Private => write!(f, "private"),
        }
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pub" => Ok(Tag::Pub),
            "dev" => Ok(Tag::Dev),
            "private" => Ok(Tag::Private),
            other => Err(format!("unknown tag '{other}'; expected: pub, dev, private")),
        }
    }
}

pub type TagSet = BTreeSet<Tag>;

// ---------------------------------------------------------------------------
// OrderedMap: declaration-ordered string-keyed map
// ---------------------------------------------------------------------------

/// A string-keyed map that keeps the order keys were declared in.
///
/// Unit ids encode nesting order, so `units` cannot go through a `BTreeMap`.
/// Integer keys (`1:` in YAML) are accepted and stored as their decimal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedMap::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<MapKey, V>()? {
                    map.insert(key.0, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_any(OrderedMapVisitor(PhantomData))
    }
}

struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = MapKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MapKey, E> {
                Ok(MapKey(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<MapKey, E> {
                Ok(MapKey(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

// ---------------------------------------------------------------------------
// Realm config (.realm/config.*)
// ---------------------------------------------------------------------------

/// Declaration of a task in the realm config.
///
/// Either a bare tag list (`build: [pub]`) or a detailed mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskDecl {
    Tags(Vec<Tag>),
    Detailed(TaskDeclDetail),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDeclDetail {
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Shell command run when the task is dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl TaskDecl {
    pub fn tags(&self) -> TagSet {
        match self {
            TaskDecl::Tags(tags) => tags.iter().copied().collect(),
            TaskDecl::Detailed(d) => d.tags.iter().copied().collect(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TaskDecl::Tags(_) => None,
            TaskDecl::Detailed(d) => d.description.as_deref(),
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            TaskDecl::Tags(_) => None,
            TaskDecl::Detailed(d) => d.command.as_deref(),
        }
    }
}

/// Declarative realm configuration: artifact groups and task declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmConfig {
    /// Explicit super realm root (absolute path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_realm: Option<PathBuf>,
    /// Artifact group name → pattern list.
    #[serde(default)]
    pub artifacts: BTreeMap<String, Vec<String>>,
    /// Task name → declaration.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDecl>,
}

// ---------------------------------------------------------------------------
// Dev config (.realm/dev.*)
// ---------------------------------------------------------------------------

/// Raw `src` as written in the dev file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSrc {
    One(String),
    Many(Vec<String>),
}

/// One node of the (possibly nested) `units` tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<RawSrc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<OrderedMap<UnitNode>>,
}

/// Build unit declarations plus merge linkage metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_task: Option<String>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub units: OrderedMap<UnitNode>,
    /// Recorded by a symlinked merge: root of the realm this one was merged into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_realm: Option<PathBuf>,
    /// Recorded by a symlinked merge: name this realm was merged under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_as: Option<String>,
}

// ---------------------------------------------------------------------------
// Package descriptor (package.json)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PackageDescriptor {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            description,
            extra: serde_json::Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved units
// ---------------------------------------------------------------------------

/// Resolved source of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Src {
    /// A plain path with no glob metacharacters.
    Literal(String),
    /// A single glob pattern.
    Glob(String),
    /// A pattern list (declared as a list, or synthesized with exclusions).
    List(Vec<String>),
}

impl Src {
    /// Classify a raw `src` value.
    pub fn from_raw(raw: &RawSrc) -> Self {
        match raw {
            RawSrc::One(s) if crate::glob::is_glob(s) => Src::Glob(s.clone()),
            RawSrc::One(s) => Src::Literal(s.clone()),
            RawSrc::Many(list) => Src::List(list.clone()),
        }
    }

    /// Patterns in declaration order.
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Src::Literal(s) | Src::Glob(s) => vec![s.as_str()],
            Src::List(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

impl Serialize for Src {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Src::Literal(s) | Src::Glob(s) => serializer.serialize_str(s),
            Src::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for item in list {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// A flat, resolved build instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    /// Dot-joined key path, e.g. `"2.3"`.
    pub id: String,
    pub src: Src,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Dir,
    File,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Dir => write!(f, "dir"),
            ArtifactKind::File => write!(f, "file"),
        }
    }
}

/// A classified path, relative to the realm root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArtifactEntry {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_display_and_parse() {
        assert_eq!(Tag::Pub.to_string(), "pub");
        assert_eq!("DEV".parse::<Tag>().unwrap(), Tag::Dev);
        assert!("pubb".parse::<Tag>().is_err());
    }

    #[test]
    fn only_pub_is_inheritable() {
        assert!(Tag::Pub.is_inheritable());
        assert!(!Tag::Dev.is_inheritable());
        assert!(!Tag::Private.is_inheritable());
    }

    #[test]
    fn ordered_map_keeps_yaml_declaration_order() {
        let yaml = "units:\n  zeta: {}\n  2: {}\n  alpha: {}\n";
        let cfg: DevConfig = serde_yaml::from_str(yaml).expect("parse");
        let keys: Vec<&str> = cfg.units.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["zeta", "2", "alpha"]);
    }

    #[test]
    fn unknown_task_tag_is_rejected() {
        let err = serde_json::from_str::<RealmConfig>(r#"{"tasks": {"a": ["pubb"]}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn task_decl_accepts_both_shapes() {
        let cfg: RealmConfig = serde_json::from_str(
            r#"{"tasks": {"a": ["pub"], "b": {"tags": ["dev"], "command": "echo b"}, "c": {}}}"#,
        )
        .expect("parse");
        assert_eq!(cfg.tasks["a"].tags(), TagSet::from([Tag::Pub]));
        assert_eq!(cfg.tasks["b"].command(), Some("echo b"));
        assert!(cfg.tasks["c"].tags().is_empty());
    }

    #[test]
    fn src_serializes_as_scalar_or_list() {
        let scalar = serde_json::to_value(Src::Glob("src/**/*".into())).unwrap();
        assert_eq!(scalar, serde_json::json!("src/**/*"));
        let list = serde_json::to_value(Src::List(vec!["a".into(), "!b/**/*".into()])).unwrap();
        assert_eq!(list, serde_json::json!(["a", "!b/**/*"]));
    }

    #[test]
    fn package_descriptor_preserves_unknown_fields() {
        let pkg: PackageDescriptor =
            serde_json::from_str(r#"{"name": "x", "license": "MIT"}"#).expect("parse");
        assert_eq!(pkg.name, "x");
        assert_eq!(pkg.extra["license"], "MIT");
        let back = serde_json::to_value(&pkg).unwrap();
        assert_eq!(back["license"], "MIT");
    }
}
