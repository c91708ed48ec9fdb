use std::path::PathBuf;

use realm_core::RealmError;
use thiserror::Error;

/// Error surface for task dispatch, the connect protocol and lifecycle
/// operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Realm(#[from] RealmError),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("realm at {path} is not connected")]
    NotConnected { path: PathBuf },

    #[error("task already exists: {0}")]
    TaskExists(String),

    #[error("task '{0}' is declared but has no implementation")]
    TaskNotBound(String),

    #[error("task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("super realm {path} is unavailable: {reason}")]
    SuperRealmUnavailable { path: PathBuf, reason: String },

    #[error("realm context has been dropped")]
    ContextDropped,

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RuntimeError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        RuntimeError::Realm(RealmError::InvalidArgument(message.into()))
    }

    pub(crate) fn not_valid(message: impl Into<String>) -> Self {
        RuntimeError::Realm(RealmError::NotValid(message.into()))
    }

    pub(crate) fn already_exists(path: impl Into<PathBuf>) -> Self {
        RuntimeError::Realm(RealmError::AlreadyExists { path: path.into() })
    }

    /// The wrapped core error, if any.
    pub fn as_realm_error(&self) -> Option<&RealmError> {
        match self {
            RuntimeError::Realm(err) => Some(err),
            _ => None,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RuntimeError {
    RuntimeError::Realm(realm_core::error::io_err(path, source))
}
