//! Error types for realm-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from realm configuration, unit resolution,
/// artifact classification and tree operations.
#[derive(Debug, Error)]
pub enum RealmError {
    /// Underlying I/O failure, annotated with the path being touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load, with the file path.
    #[error("failed to parse {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parse error on load, with the file path and line context.
    #[error("failed to parse {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// JSON serialization error (write path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required lifecycle parameter is missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Structurally wrong input, or a unit that cannot be resolved.
    #[error("not valid: {0}")]
    NotValid(String),

    /// A lifecycle target collides with an existing filesystem entry.
    #[error("path already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// The directory has no package descriptor.
    #[error("not a realm: {path} (missing package.json)")]
    NotARealm { path: PathBuf },

    /// Super realm resolution came back to a directory already on the chain.
    #[error("super realm cycle detected at {path}")]
    SuperRealmCycle { path: PathBuf },

    /// An artifact pattern could not be compiled.
    #[error("invalid artifact pattern: {0}")]
    Glob(#[from] globset::Error),

    /// Directory traversal failure.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// `dirs::home_dir()` returned `None` and `$REALM_HOME` is unset.
    #[error("cannot determine home directory; set $REALM_HOME or $HOME")]
    HomeNotFound,
}

/// Convenience constructor for [`RealmError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RealmError {
    RealmError::Io {
        path: path.into(),
        source,
    }
}
