use crate::{Result, StorageBackend};
use std::path::Path;

/// Backend for unrecognized backend types.
///
/// Mutations succeed without doing anything, nothing exists, and every URL is
/// empty. Resolving a backend type therefore always yields some backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullBackend;

impl StorageBackend for NullBackend {
    async fn store(&self, _source: &Path, _target: &str) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, _path: &str) -> bool {
        false
    }

    fn resolve_url(&self, _path: &str) -> String {
        String::new()
    }

    async fn delete(&self, _path: &str) {}

    async fn copy(&self, _source: &str, _target: &str) -> Result<()> {
        Ok(())
    }
}
