//! The multi-backend storage façade.
//!
//! [`StorageOrchestrator`] resolves backend-type names to backends and applies
//! the multi-backend policies:
//!
//! - **store**: caller-given backends in order, fail-fast, no rollback.
//!   Defaults to the configured default backend.
//! - **delete**: broadcast to every known backend by default; never fails.
//! - **copy**: within a single backend.
//! - **lookup**: probe a [`SearchOrder`] and stop at the first backend that has
//!   the file.
//!
//! Backends are built fresh for every resolution and hold only their slice of
//! the configuration. Calls run strictly one backend after another.
//!
//! ```
//! # #[cfg(feature = "memory")]
//! # async fn example() -> depot::Result<()> {
//! use depot::{BackendType, MemoryConnector, ServerConfig, StorageConfig, StorageOrchestrator};
//!
//! let config = StorageConfig::new(BackendType::Local)
//!     .with_server("local", ServerConfig::local("/srv/app"))
//!     .with_server("remote", ServerConfig::remote("images", "uploads"));
//! let storage = StorageOrchestrator::new(config, MemoryConnector::new());
//!
//! storage
//!     .store_file("/tmp/a.png".as_ref(), "a.png", &[BackendType::Local, BackendType::Remote])
//!     .await?;
//! let url = storage.resolve_file_url("a.png", Some(&BackendType::Remote), true).await;
//! # Ok(())
//! # }
//! ```

use crate::{
    BackendType, Connector, LocalBackend, NullBackend, ObjectStore, RemoteBackend, Result,
    StorageBackend, StorageConfig,
};
use serde::Deserialize;
use std::path::Path;

/// Ordered, duplicate-free sequence of backend types probed during lookups.
///
/// Defaults to `[local, remote]`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<BackendType>")]
pub struct SearchOrder(Vec<BackendType>);

impl SearchOrder {
    /// Build an order from `backends`, keeping the first occurrence of each type.
    pub fn new(backends: impl IntoIterator<Item = BackendType>) -> Self {
        let mut order: Vec<BackendType> = Vec::new();
        for backend in backends {
            if !order.contains(&backend) {
                order.push(backend);
            }
        }
        Self(order)
    }

    /// This order with `preferred` moved to the front.
    pub fn with_preferred(&self, preferred: BackendType) -> Self {
        Self::new(std::iter::once(preferred).chain(self.0.iter().cloned()))
    }

    pub fn as_slice(&self) -> &[BackendType] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BackendType> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SearchOrder {
    fn default() -> Self {
        Self(vec![BackendType::Local, BackendType::Remote])
    }
}

impl From<Vec<BackendType>> for SearchOrder {
    fn from(backends: Vec<BackendType>) -> Self {
        Self::new(backends)
    }
}

impl FromIterator<BackendType> for SearchOrder {
    fn from_iter<I: IntoIterator<Item = BackendType>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a SearchOrder {
    type Item = &'a BackendType;
    type IntoIter = std::slice::Iter<'a, BackendType>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A resolved backend.
#[derive(Clone, Debug)]
pub enum Backend<S: ObjectStore> {
    Local(LocalBackend),
    Remote(RemoteBackend<S>),
    Null(NullBackend),
}

impl<S: ObjectStore> Backend<S> {
    pub fn is_null(&self) -> bool {
        matches!(self, Backend::Null(_))
    }
}

impl<S: ObjectStore> StorageBackend for Backend<S> {
    async fn store(&self, source: &Path, target: &str) -> Result<()> {
        match self {
            Backend::Local(b) => b.store(source, target).await,
            Backend::Remote(b) => b.store(source, target).await,
            Backend::Null(b) => b.store(source, target).await,
        }
    }

    async fn exists(&self, path: &str) -> bool {
        match self {
            Backend::Local(b) => b.exists(path).await,
            Backend::Remote(b) => b.exists(path).await,
            Backend::Null(b) => b.exists(path).await,
        }
    }

    fn resolve_url(&self, path: &str) -> String {
        match self {
            Backend::Local(b) => b.resolve_url(path),
            Backend::Remote(b) => b.resolve_url(path),
            Backend::Null(b) => b.resolve_url(path),
        }
    }

    async fn delete(&self, path: &str) {
        match self {
            Backend::Local(b) => b.delete(path).await,
            Backend::Remote(b) => b.delete(path).await,
            Backend::Null(b) => b.delete(path).await,
        }
    }

    async fn copy(&self, source: &str, target: &str) -> Result<()> {
        match self {
            Backend::Local(b) => b.copy(source, target).await,
            Backend::Remote(b) => b.copy(source, target).await,
            Backend::Null(b) => b.copy(source, target).await,
        }
    }
}

/// Stores, locates, copies and deletes files across the configured backends.
#[derive(Debug)]
pub struct StorageOrchestrator<C: Connector> {
    config: StorageConfig,
    connector: C,
}

impl<C: Connector> StorageOrchestrator<C> {
    /// Create an orchestrator. `connector` builds the object-store clients of
    /// the remote and backup backends.
    pub fn new(config: StorageConfig, connector: C) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Build the backend for `backend`. Unknown types yield [`Backend::Null`].
    pub fn resolve_backend(&self, backend: &BackendType) -> Backend<C::Store> {
        let groups = &self.config.groups;
        match backend {
            BackendType::Local => {
                let config = self.config.server_config(&groups.local);
                Backend::Local(LocalBackend::from_config(&config))
            }
            BackendType::Remote => self.remote_backend(BackendType::Remote, &groups.remote),
            BackendType::Backup => self.remote_backend(BackendType::Backup, &groups.backup),
            BackendType::Unknown(name) => {
                tracing::debug!(backend = %name, "Unknown backend type, using null backend");
                Backend::Null(NullBackend)
            }
        }
    }

    fn remote_backend(&self, kind: BackendType, group: &str) -> Backend<C::Store> {
        let config = self.config.server_config(group);
        let store = self
            .connector
            .connect(&config.s3.clone().unwrap_or_default());
        Backend::Remote(RemoteBackend::from_config(kind, store, &config))
    }

    /// The probe order for lookups, with `preferred` first when given.
    pub fn search_order(&self, preferred: Option<&BackendType>) -> SearchOrder {
        match preferred {
            Some(backend) => self.config.search_order.with_preferred(backend.clone()),
            None => self.config.search_order.clone(),
        }
    }

    /// Store the file at `source` as `target` on each of `backends`, in order.
    ///
    /// An empty list means the configured default backend. The first failure
    /// aborts the call; backends that already succeeded keep their copy.
    pub async fn store_file(
        &self,
        source: &Path,
        target: &str,
        backends: &[BackendType],
    ) -> Result<()> {
        let default = [self.config.default_storage_type.clone()];
        let backends = if backends.is_empty() {
            &default[..]
        } else {
            backends
        };

        for backend in backends {
            tracing::debug!(%backend, to = target, "Storing file");
            self.resolve_backend(backend).store(source, target).await?;
        }
        Ok(())
    }

    /// Delete `path` from each of `backends`. An empty list means every known backend.
    pub async fn delete_file(&self, path: &str, backends: &[BackendType]) {
        let all = BackendType::ALL;
        let backends = if backends.is_empty() {
            &all[..]
        } else {
            backends
        };

        for backend in backends {
            tracing::debug!(%backend, path, "Deleting file");
            self.resolve_backend(backend).delete(path).await;
        }
    }

    /// Copy `source` to `target` within one backend.
    pub async fn copy_file(&self, backend: &BackendType, source: &str, target: &str) -> Result<()> {
        tracing::debug!(%backend, from = source, to = target, "Copying file");
        self.resolve_backend(backend).copy(source, target).await
    }

    /// URL of `path` on the first backend of the search order that has it.
    ///
    /// With `check_exists` off no backend is probed and the URL of the first
    /// backend in the order is returned. Returns an empty string when no
    /// backend has the file.
    pub async fn resolve_file_url(
        &self,
        path: &str,
        preferred: Option<&BackendType>,
        check_exists: bool,
    ) -> String {
        for backend in &self.search_order(preferred) {
            let resolved = self.resolve_backend(backend);
            if check_exists {
                tracing::trace!(%backend, path, "Probing backend");
                if !resolved.exists(path).await {
                    continue;
                }
            }
            tracing::debug!(%backend, path, "Resolved file url");
            return resolved.resolve_url(path);
        }
        String::new()
    }

    /// Whether any of `backends` has `path`, probing in order and stopping at
    /// the first hit. `None` means the configured search order.
    pub async fn file_exists(&self, path: &str, backends: Option<&[BackendType]>) -> bool {
        let order;
        let backends = match backends {
            Some(backends) => backends,
            None => {
                order = self.search_order(None);
                order.as_slice()
            }
        };

        for backend in backends {
            tracing::trace!(%backend, path, "Probing backend");
            if self.resolve_backend(backend).exists(path).await {
                tracing::debug!(%backend, path, "File found");
                return true;
            }
        }
        false
    }
}
