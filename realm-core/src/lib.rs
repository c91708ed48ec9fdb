//! Realm core library: configuration types, persistence, unit resolution,
//! artifact classification, errors.
//!
//! Public API surface:
//! - [`types`]: config shapes, resolved [`Unit`]s, artifact entries
//! - [`config`]: load / save of `package.json` and `.realm/*`
//! - [`units`]: [`get_units`]
//! - [`artifacts`]: [`Artifacts`] classifier
//! - [`glob`]: glob detection and matching
//! - [`tree`]: tree copy and symlink helpers
//! - [`error`]: [`RealmError`]

pub mod artifacts;
pub mod config;
pub mod error;
pub mod glob;
pub mod tree;
pub mod types;
pub mod units;

pub use artifacts::Artifacts;
pub use config::ConfigFormat;
pub use error::RealmError;
pub use types::{
    ArtifactEntry, ArtifactKind, DevConfig, OrderedMap, PackageDescriptor, RawSrc, RealmConfig,
    Src, Tag, TagSet, TaskDecl, Unit, UnitNode,
};
pub use units::get_units;

use std::path::PathBuf;

/// Root realm home: `$REALM_HOME` if set, else `~/.realms`.
pub fn default_home() -> Result<PathBuf, RealmError> {
    if let Some(home) = std::env::var_os("REALM_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|h| h.join(".realms"))
        .ok_or(RealmError::HomeNotFound)
}
