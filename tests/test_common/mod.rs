//! Common test utilities and a reusable contract suite for storage backends.
#![allow(dead_code)]

use depot::{
    BackendType, MemoryConnector, MemoryObjectStore, ServerConfig, StorageBackend, StorageConfig,
    StorageOrchestrator,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const REMOTE_BUCKET: &str = "images";
pub const REMOTE_PREFIX: &str = "uploads";
pub const BACKUP_BUCKET: &str = "archive";
pub const BACKUP_PREFIX: &str = "backup";
pub const LOCAL_BASE_URL: &str = "https://app.example.com";

/// A scratch directory plus an orchestrator over a temp local root and two
/// in-memory buckets.
pub struct Fixture {
    pub dir: TempDir,
    pub connector: MemoryConnector,
    pub storage: StorageOrchestrator<MemoryConnector>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_default(BackendType::Local)
    }

    pub fn with_default(default: BackendType) -> Self {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig::new(default)
            .with_server(
                "local",
                ServerConfig::local(dir.path().join("public")).with_base_url(LOCAL_BASE_URL),
            )
            .with_server("remote", ServerConfig::remote(REMOTE_BUCKET, REMOTE_PREFIX))
            .with_server("backup", ServerConfig::remote(BACKUP_BUCKET, BACKUP_PREFIX));
        Self::with_config(dir, config)
    }

    pub fn with_config(dir: TempDir, config: StorageConfig) -> Self {
        let connector = MemoryConnector::new();
        let storage = StorageOrchestrator::new(config, connector.clone());
        Self {
            dir,
            connector,
            storage,
        }
    }

    /// Write `data` to a source file outside every backend namespace.
    pub fn source_file(&self, name: &str, data: &[u8]) -> PathBuf {
        let incoming = self.dir.path().join("incoming");
        std::fs::create_dir_all(&incoming).unwrap();
        let path = incoming.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    /// A source path that does not exist.
    pub fn missing_source(&self) -> PathBuf {
        self.dir.path().join("incoming").join("missing.bin")
    }

    pub fn local_root(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    pub fn local_path(&self, rel: &str) -> PathBuf {
        self.local_root().join(rel)
    }

    /// Put a file directly into the local root.
    pub fn put_local(&self, rel: &str, data: &[u8]) {
        let path = self.local_path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    pub fn remote(&self) -> MemoryObjectStore {
        self.connector.bucket(REMOTE_BUCKET)
    }

    pub fn backup(&self) -> MemoryObjectStore {
        self.connector.bucket(BACKUP_BUCKET)
    }

    pub fn remote_key(rel: &str) -> String {
        format!("{REMOTE_PREFIX}/{rel}")
    }

    pub fn backup_key(rel: &str) -> String {
        format!("{BACKUP_PREFIX}/{rel}")
    }
}

/// Counts events at `ERROR` level.
#[derive(Clone, Default)]
pub struct ErrorEventCounter(Arc<AtomicUsize>);

impl ErrorEventCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorEventCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Install an [`ErrorEventCounter`] for the current thread.
pub fn count_error_events() -> (ErrorEventCounter, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let counter = ErrorEventCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (counter, guard)
}

/// Records, in order, the `backend` field of every `TRACE` event.
#[derive(Clone, Default)]
pub struct ProbeRecorder(Arc<Mutex<Vec<String>>>);

impl ProbeRecorder {
    pub fn probed(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct BackendField(Option<String>);

impl Visit for BackendField {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "backend" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for ProbeRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::TRACE {
            return;
        }
        let mut field = BackendField(None);
        event.record(&mut field);
        if let Some(backend) = field.0 {
            self.0.lock().unwrap().push(backend);
        }
    }
}

/// Install a [`ProbeRecorder`] for the current thread.
pub fn record_probes() -> (ProbeRecorder, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let recorder = ProbeRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (recorder, guard)
}

// Contract checks shared by every real backend.

pub async fn run_test_store_then_exists<B: StorageBackend>(backend: &B, source: &Path) {
    assert!(!backend.exists("contract/a.txt").await);

    backend.store(source, "contract/a.txt").await.unwrap();

    assert!(backend.exists("contract/a.txt").await);
    assert!(backend.exists("/contract/a.txt").await);
}

pub async fn run_test_store_missing_source<B: StorageBackend>(backend: &B, missing: &Path) {
    let result = backend.store(missing, "contract/missing.txt").await;

    assert!(matches!(result, Err(ref e) if e.is_store()));
    assert!(!backend.exists("contract/missing.txt").await);
}

pub async fn run_test_delete_idempotent<B: StorageBackend>(backend: &B, source: &Path) {
    backend.store(source, "contract/gone.txt").await.unwrap();

    backend.delete("contract/gone.txt").await;
    assert!(!backend.exists("contract/gone.txt").await);

    // Deleting again is a silent no-op.
    backend.delete("contract/gone.txt").await;
    backend.delete("contract/never-existed.txt").await;
}

pub async fn run_test_copy<B: StorageBackend>(backend: &B, source: &Path) {
    backend.store(source, "contract/orig.txt").await.unwrap();

    backend
        .copy("contract/orig.txt", "contract/dup.txt")
        .await
        .unwrap();

    assert!(backend.exists("contract/orig.txt").await);
    assert!(backend.exists("contract/dup.txt").await);
}

pub async fn run_test_copy_missing_source<B: StorageBackend>(backend: &B) {
    let result = backend
        .copy("contract/nothing.txt", "contract/nothing-dup.txt")
        .await;

    assert!(matches!(result, Err(ref e) if e.is_copy()));
    assert!(!backend.exists("contract/nothing-dup.txt").await);
}

pub async fn run_test_resolve_url_without_probe<B: StorageBackend>(backend: &B) {
    let url = backend.resolve_url("contract/absent.txt");

    assert!(!url.is_empty());
    assert!(url.ends_with("contract/absent.txt"));
}
