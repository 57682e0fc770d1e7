use crate::adapters::object::{ObjectAcl, ObjectStore, PutOptions, StorageClass, encode_key};
use crate::{BackendType, Error, Result, ServerConfig, StorageBackend};
use bytes::Bytes;
use std::path::Path;

/// A backend on an S3-compatible bucket.
///
/// Every path is namespaced as `{path_prefix}/{path}` before it reaches the
/// object store. The same type serves both the `remote` and the `backup`
/// backends; only the configuration differs.
///
/// Uploads use [`RemoteBackend::PUT_OPTIONS`]: reduced-redundancy storage with
/// a public-read ACL.
#[derive(Clone, Debug)]
pub struct RemoteBackend<S: ObjectStore> {
    kind: BackendType,
    store: S,
    path_prefix: String,
    public_url: Option<String>,
}

impl<S: ObjectStore> RemoteBackend<S> {
    pub const PUT_OPTIONS: PutOptions = PutOptions {
        storage_class: StorageClass::ReducedRedundancy,
        acl: ObjectAcl::PublicRead,
    };

    /// Create a backend over `store` with keys under `path_prefix`.
    pub fn new(kind: BackendType, store: S, path_prefix: impl Into<String>) -> Self {
        Self {
            kind,
            store,
            path_prefix: path_prefix.into().trim_end_matches('/').to_string(),
            public_url: None,
        }
    }

    /// Create a backend from a config group and an already connected store.
    pub fn from_config(kind: BackendType, store: S, config: &ServerConfig) -> Self {
        let mut backend = Self::new(kind, store, config.path_prefix.clone().unwrap_or_default());
        backend.public_url = config.public_url.clone();
        backend
    }

    /// Serve URLs from `public_url` instead of the bucket URL.
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    /// The underlying object store.
    pub fn object_store(&self) -> &S {
        &self.store
    }

    /// The full object key for `path`.
    pub fn key(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if self.path_prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.path_prefix, path)
        }
    }

    async fn upload(&self, source: &Path, key: &str) -> Result<()> {
        let body = tokio::fs::read(source).await?;
        self.store
            .put_object(key, Bytes::from(body), Self::PUT_OPTIONS)
            .await
    }
}

impl<S: ObjectStore> StorageBackend for RemoteBackend<S> {
    async fn store(&self, source: &Path, target: &str) -> Result<()> {
        let key = self.key(target);
        self.upload(source, &key).await.map_err(|e| {
            tracing::error!(
                backend = %self.kind,
                bucket = self.store.bucket(),
                key = %key,
                error = ?e,
                "Failed to upload file to remote storage"
            );
            Error::store(self.kind.clone(), target, e)
        })
    }

    async fn exists(&self, path: &str) -> bool {
        let key = self.key(path);
        match self.store.head_object(&key).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(backend = %self.kind, key = %key, error = ?e, "Remote probe failed, treating as absent");
                false
            }
        }
    }

    fn resolve_url(&self, path: &str) -> String {
        let key = self.key(path);
        match &self.public_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), encode_key(&key)),
            None => self.store.object_url(&key),
        }
    }

    async fn delete(&self, path: &str) {
        let key = self.key(path);
        if let Err(e) = self.store.delete_object(&key).await {
            tracing::warn!(backend = %self.kind, key = %key, error = ?e, "Remote delete failed (ignored)");
        }
    }

    async fn copy(&self, source: &str, target: &str) -> Result<()> {
        let from = self.key(source);
        let to = self.key(target);
        self.store.copy_object(&from, &to).await.map_err(|e| {
            tracing::error!(
                backend = %self.kind,
                bucket = self.store.bucket(),
                from = %from,
                to = %to,
                error = ?e,
                "Failed to copy file at remote storage"
            );
            Error::copy(self.kind.clone(), source, target, e)
        })
    }
}
