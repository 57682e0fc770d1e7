use std::fmt::Debug;
use std::path::Path;

pub use adapters::local::LocalBackend;
pub use adapters::null::NullBackend;
pub use adapters::object::{Connector, ObjectAcl, ObjectHead, ObjectStore, PutOptions, StorageClass};
pub use adapters::remote::RemoteBackend;
pub use config::{BackendType, ConfigGroups, Credentials, S3Settings, ServerConfig, StorageConfig};
pub use orchestrator::{Backend, SearchOrder, StorageOrchestrator};

#[cfg(feature = "memory")]
pub use adapters::object::memory::{MemoryConnector, MemoryObjectStore, Operation, StoredObject};
#[cfg(feature = "s3")]
pub use adapters::object::s3::{S3Connector, S3ObjectStore};

pub mod config;
pub mod orchestrator;

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A unified Error type for storage operations.
///
/// Only `store` and `copy` surface errors to callers. `exists` and `delete`
/// fold every failure into `false` / success at the backend boundary.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Storage backend connection error")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("IO Error")]
    Io(#[from] std::io::Error),

    #[error("Generic storage error: {0}")]
    Generic(String),

    #[error("Failed to store file to {backend} storage: {path}")]
    Store {
        backend: BackendType,
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to copy file at {backend} storage: {from} -> {to}")]
    Copy {
        backend: BackendType,
        from: String,
        to: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid storage configuration")]
    Config(#[source] serde_json::Error),
}

impl Error {
    pub(crate) fn store(backend: BackendType, path: &str, source: Error) -> Self {
        Error::Store {
            backend,
            path: path.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn copy(backend: BackendType, from: &str, to: &str, source: Error) -> Self {
        Error::Copy {
            backend,
            from: from.to_string(),
            to: to.to_string(),
            source: Box::new(source),
        }
    }

    /// Returns true for a failed `store`.
    pub fn is_store(&self) -> bool {
        matches!(self, Error::Store { .. })
    }

    /// Returns true for a failed `copy`.
    pub fn is_copy(&self) -> bool {
        matches!(self, Error::Copy { .. })
    }
}

/// Backend modules.
pub mod adapters {
    pub mod local;
    pub mod null;
    pub mod object;
    pub mod remote;
}

/// The contract every storage backend satisfies.
///
/// Paths are caller-supplied relative keys. Only leading slashes are trimmed;
/// callers are expected to pass canonical relative paths.
///
/// ## Failure policy
/// - [`store`](Self::store) and [`copy`](Self::copy) return
///   [`Error::Store`] / [`Error::Copy`] wrapping the underlying failure.
/// - [`exists`](Self::exists) never fails. "Not found" and "unreachable" both
///   resolve to `false`, which is what fallback search relies on.
/// - [`delete`](Self::delete) never fails. A missing file counts as deleted and
///   every other failure is swallowed.
pub trait StorageBackend: Send + Sync + Debug {
    /// Copy the bytes at `source` on the local filesystem into this backend at `target`.
    fn store(
        &self,
        source: &Path,
        target: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Check whether a file is present at `path`.
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;

    /// Build the public locator for `path`. Does not check existence.
    fn resolve_url(&self, path: &str) -> String;

    /// Remove the file at `path`, best-effort.
    fn delete(&self, path: &str) -> impl std::future::Future<Output = ()> + Send;

    /// Duplicate a file within this backend's namespace.
    fn copy(&self, source: &str, target: &str)
    -> impl std::future::Future<Output = Result<()>> + Send;
}
