//! Tests for LocalBackend

mod test_common;

use depot::{BackendType, Error, LocalBackend, ServerConfig, StorageBackend};
use tempfile::TempDir;
use test_common::*;

/// Helper to create a backend rooted in a fresh temp dir, plus a source file.
fn create_temp_backend() -> (LocalBackend, TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let backend = LocalBackend::new(temp_dir.path().join("root"));
    let source = temp_dir.path().join("source.txt");
    std::fs::write(&source, b"hello world").unwrap();
    (backend, temp_dir, source)
}

#[tokio::test]
async fn test_local_contract() {
    let (backend, temp, source) = create_temp_backend();

    run_test_store_then_exists(&backend, &source).await;
    run_test_store_missing_source(&backend, &temp.path().join("nope")).await;
    run_test_delete_idempotent(&backend, &source).await;
    run_test_copy(&backend, &source).await;
    run_test_copy_missing_source(&backend).await;
    run_test_resolve_url_without_probe(&backend).await;
}

#[tokio::test]
async fn test_store_copies_bytes_and_creates_parents() {
    let (backend, _temp, source) = create_temp_backend();

    backend.store(&source, "/deep/nested/dir/file.txt").await.unwrap();

    let written = std::fs::read(backend.root().join("deep/nested/dir/file.txt")).unwrap();
    assert_eq!(written, b"hello world");
}

#[tokio::test]
async fn test_store_overwrites() {
    let (backend, temp, source) = create_temp_backend();
    let newer = temp.path().join("newer.txt");
    std::fs::write(&newer, b"updated").unwrap();

    backend.store(&source, "file.txt").await.unwrap();
    backend.store(&newer, "file.txt").await.unwrap();

    assert_eq!(std::fs::read(backend.root().join("file.txt")).unwrap(), b"updated");
}

#[tokio::test]
async fn test_store_missing_source_creates_nothing() {
    let (backend, temp, _source) = create_temp_backend();

    let result = backend
        .store(&temp.path().join("missing.bin"), "sub/target.bin")
        .await;

    match result {
        Err(Error::Store { backend, path, source }) => {
            assert_eq!(backend, BackendType::Local);
            assert_eq!(path, "sub/target.bin");
            assert!(matches!(*source, Error::NotFound(_)));
        }
        other => panic!("Expected Store error, got {other:?}"),
    }
    assert!(!backend.root().join("sub").exists());
}

#[tokio::test]
async fn test_store_rejects_traversal() {
    let (backend, _temp, source) = create_temp_backend();

    let result = backend.store(&source, "../escape.txt").await;

    assert!(matches!(result, Err(Error::Store { ref source, .. }) if matches!(**source, Error::PermissionDenied(_))));
    assert!(!backend.root().parent().unwrap().join("escape.txt").exists());
}

#[tokio::test]
async fn test_exists_only_for_regular_files() {
    let (backend, _temp, source) = create_temp_backend();
    backend.store(&source, "dir/file.txt").await.unwrap();

    assert!(backend.exists("dir/file.txt").await);
    assert!(!backend.exists("dir").await);
    assert!(!backend.exists("").await);
    assert!(!backend.exists("../source.txt").await);
}

#[tokio::test]
async fn test_delete_resolves_against_root() {
    let (backend, temp, source) = create_temp_backend();
    backend.store(&source, "source.txt").await.unwrap();

    backend.delete("/source.txt").await;

    assert!(!backend.exists("source.txt").await);
    // The identically named file outside the root is untouched.
    assert!(temp.path().join("source.txt").exists());
}

#[tokio::test]
async fn test_delete_swallows_errors() {
    let (backend, _temp, source) = create_temp_backend();
    backend.store(&source, "dir/file.txt").await.unwrap();

    // Removing a directory with remove_file fails; the failure stays invisible.
    backend.delete("dir").await;
    backend.delete("").await;
    backend.delete("../../etc/passwd").await;

    assert!(backend.exists("dir/file.txt").await);
}

#[tokio::test]
async fn test_copy_within_root() {
    let (backend, _temp, source) = create_temp_backend();
    backend.store(&source, "a.txt").await.unwrap();

    backend.copy("/a.txt", "copies/b.txt").await.unwrap();

    assert_eq!(
        std::fs::read(backend.root().join("copies/b.txt")).unwrap(),
        b"hello world"
    );
}

#[tokio::test]
async fn test_copy_onto_itself_keeps_contents() {
    let (backend, _temp, source) = create_temp_backend();
    backend.store(&source, "a.txt").await.unwrap();

    backend.copy("a.txt", "a.txt").await.unwrap();
    backend.copy("a.txt", "./a.txt").await.unwrap();
    backend.copy("/a.txt", "a.txt").await.unwrap();

    assert_eq!(std::fs::read(backend.root().join("a.txt")).unwrap(), b"hello world");
}

#[tokio::test]
async fn test_store_onto_own_path_keeps_contents() {
    let (backend, _temp, source) = create_temp_backend();
    backend.store(&source, "a.txt").await.unwrap();
    let stored = backend.root().join("a.txt");

    backend.store(&stored, "a.txt").await.unwrap();
    backend.store(&stored, "./a.txt").await.unwrap();

    assert_eq!(std::fs::read(&stored).unwrap(), b"hello world");
    assert!(backend.exists("a.txt").await);
}

#[tokio::test]
async fn test_copy_error_details() {
    let (backend, _temp, _source) = create_temp_backend();

    match backend.copy("missing.txt", "b.txt").await {
        Err(Error::Copy { backend, from, to, .. }) => {
            assert_eq!(backend, BackendType::Local);
            assert_eq!(from, "missing.txt");
            assert_eq!(to, "b.txt");
        }
        other => panic!("Expected Copy error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resolve_url_uses_base_url_without_probe() {
    let temp_dir = TempDir::new().unwrap();
    let config = ServerConfig::local(temp_dir.path()).with_base_url("https://app.example.com/");
    let backend = LocalBackend::from_config(&config);

    assert_eq!(
        backend.resolve_url("/img/absent.png"),
        "https://app.example.com/img/absent.png"
    );
}

#[tokio::test]
async fn test_store_failure_logs_once() {
    let (backend, temp, _source) = create_temp_backend();
    let (counter, _guard) = count_error_events();

    let result = backend.store(&temp.path().join("missing"), "x.txt").await;

    assert!(result.is_err());
    assert_eq!(counter.count(), 1);
}
