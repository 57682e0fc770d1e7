use crate::{BackendType, Error, Result, ServerConfig, StorageBackend};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A local filesystem backend.
///
/// - Paths are relative to a configured root directory; leading slashes are trimmed.
/// - Empty paths and paths with `..` or drive prefixes are rejected.
/// - URLs are the configured base URL joined with the path. Without a base URL
///   the root-relative form `/path` is returned.
#[derive(Clone)]
pub struct LocalBackend {
    root: PathBuf,
    base_url: Option<String>,
}

impl fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBackend")
            .field("root", &self.root)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl LocalBackend {
    /// Create a local backend rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: None,
        }
    }

    /// Create a local backend from a config group. A missing root means the working directory.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            root: config.root.clone().unwrap_or_else(|| PathBuf::from(".")),
            base_url: config.base_url.clone(),
        }
    }

    /// Set the public base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Return the configured root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_path(path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(Error::Generic("path cannot be empty".into()));
        }

        for c in Path::new(path).components() {
            match c {
                Component::ParentDir => {
                    return Err(Error::PermissionDenied(format!(
                        "parent dir components ('..') are not allowed: {path}"
                    )));
                }
                Component::Prefix(_) | Component::RootDir => {
                    return Err(Error::PermissionDenied(format!(
                        "path prefixes are not allowed: {path}"
                    )));
                }
                Component::CurDir | Component::Normal(_) => {}
            }
        }

        Ok(())
    }

    fn absolute(&self, path: &str) -> Result<PathBuf> {
        let path = path.trim_start_matches('/');
        Self::validate_path(path)?;
        Ok(self.root.join(path))
    }

    async fn ensure_parent_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Whether `to` already exists and is the same file as `from`.
    async fn same_file(from: &Path, to: &Path) -> Result<bool> {
        match tokio::fs::canonicalize(to).await {
            Ok(to) => Ok(tokio::fs::canonicalize(from).await? == to),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Copy `from` to `to`, checking the source before anything is created.
    async fn copy_file(from: &Path, to: &Path) -> Result<()> {
        let md = match tokio::fs::metadata(from).await {
            Ok(md) => md,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(from.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !md.is_file() {
            return Err(Error::NotFound(from.display().to_string()));
        }

        // `fs::copy` truncates the destination before reading the source.
        if Self::same_file(from, to).await? {
            return Ok(());
        }

        Self::ensure_parent_dir(to).await?;
        tokio::fs::copy(from, to).await?;
        Ok(())
    }
}

impl StorageBackend for LocalBackend {
    async fn store(&self, source: &Path, target: &str) -> Result<()> {
        let result = match self.absolute(target) {
            Ok(to) => Self::copy_file(source, &to).await,
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            tracing::error!(from = %source.display(), to = target, error = ?e, "Failed to store file to local storage");
            Error::store(BackendType::Local, target, e)
        })
    }

    async fn exists(&self, path: &str) -> bool {
        let Ok(path) = self.absolute(path) else {
            return false;
        };
        match tokio::fs::metadata(&path).await {
            Ok(md) => md.is_file(),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = ?e, "Local probe failed, treating as absent");
                }
                false
            }
        }
    }

    fn resolve_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), path),
            None => format!("/{path}"),
        }
    }

    async fn delete(&self, path: &str) {
        let Ok(abs) = self.absolute(path) else {
            tracing::debug!(path, "Ignoring delete of invalid local path");
            return;
        };
        match tokio::fs::remove_file(&abs).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %abs.display(), error = ?e, "Local delete failed (ignored)");
            }
        }
    }

    async fn copy(&self, source: &str, target: &str) -> Result<()> {
        let result = match (self.absolute(source), self.absolute(target)) {
            (Ok(from), Ok(to)) => Self::copy_file(&from, &to).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        result.map_err(|e| {
            tracing::error!(from = source, to = target, error = ?e, "Failed to copy file at local storage");
            Error::copy(BackendType::Local, source, target, e)
        })
    }
}
