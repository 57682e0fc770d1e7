use super::{Connector, ObjectHead, ObjectStore, PutOptions, encode_key};
use crate::{Error, Result, S3Settings};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// An object-store operation, as recorded in the call log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Put,
    Get,
    Head,
    Delete,
    Copy,
}

/// An object held by a [`MemoryObjectStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub options: PutOptions,
}

#[derive(Default)]
struct Bucket {
    objects: HashMap<String, StoredObject>,
    failing: HashSet<Operation>,
    calls: Vec<(Operation, String)>,
}

/// A simple in-memory bucket.
///
/// - Clones share the same contents.
/// - Every request is appended to a call log, see [`calls`](Self::calls).
/// - Operations can be forced to fail with [`fail_on`](Self::fail_on).
///
/// Intended for tests, local development, and ephemeral usage.
#[derive(Clone)]
pub struct MemoryObjectStore {
    bucket: String,
    inner: Arc<RwLock<Bucket>>,
}

impl MemoryObjectStore {
    /// Create a new empty bucket.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            inner: Arc::new(RwLock::new(Bucket::default())),
        }
    }

    /// Returns the number of stored objects.
    pub fn len(&self) -> usize {
        self.inner.read().expect("poisoned lock").objects.len()
    }

    /// Returns true if there are no stored objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a copy of the object at `key`, bypassing the call log.
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.inner
            .read()
            .expect("poisoned lock")
            .objects
            .get(key)
            .cloned()
    }

    /// Insert an object directly, bypassing the call log.
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.inner.write().expect("poisoned lock").objects.insert(
            key.into(),
            StoredObject {
                body: body.into(),
                options: PutOptions::default(),
            },
        );
    }

    /// Make every subsequent `op` request fail with a connection error.
    pub fn fail_on(&self, op: Operation) {
        self.inner.write().expect("poisoned lock").failing.insert(op);
    }

    /// Stop failing `op` requests.
    pub fn recover(&self, op: Operation) {
        self.inner.write().expect("poisoned lock").failing.remove(&op);
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<(Operation, String)> {
        self.inner.read().expect("poisoned lock").calls.clone()
    }

    /// Forget the recorded requests.
    pub fn clear_calls(&self) {
        self.inner.write().expect("poisoned lock").calls.clear();
    }

    fn record(bucket: &mut Bucket, op: Operation, key: &str) -> Result<()> {
        bucket.calls.push((op, key.to_string()));
        if bucket.failing.contains(&op) {
            return Err(Error::Connection(Box::new(std::io::Error::other(format!(
                "injected {op:?} failure for {key}"
            )))));
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Avoid dumping potentially large in-memory contents.
        f.debug_struct("MemoryObjectStore")
            .field("bucket", &self.bucket)
            .field("len", &self.len())
            .finish()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, key: &str, body: Bytes, options: PutOptions) -> Result<()> {
        let mut bucket = self.inner.write().expect("poisoned lock");
        Self::record(&mut bucket, Operation::Put, key)?;
        bucket
            .objects
            .insert(key.to_string(), StoredObject { body, options });
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let mut bucket = self.inner.write().expect("poisoned lock");
        Self::record(&mut bucket, Operation::Get, key)?;
        bucket
            .objects
            .get(key)
            .map(|object| object.body.clone())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead> {
        let mut bucket = self.inner.write().expect("poisoned lock");
        Self::record(&mut bucket, Operation::Head, key)?;
        bucket
            .objects
            .get(key)
            .map(|object| ObjectHead {
                content_length: Some(object.body.len() as u64),
            })
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let mut bucket = self.inner.write().expect("poisoned lock");
        Self::record(&mut bucket, Operation::Delete, key)?;
        bucket.objects.remove(key);
        Ok(())
    }

    async fn copy_object(&self, source_key: &str, target_key: &str) -> Result<()> {
        let mut bucket = self.inner.write().expect("poisoned lock");
        Self::record(&mut bucket, Operation::Copy, target_key)?;
        let object = bucket
            .objects
            .get(source_key)
            .cloned()
            .ok_or_else(|| Error::NotFound(source_key.to_string()))?;
        bucket.objects.insert(target_key.to_string(), object);
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, encode_key(key))
    }
}

/// Hands out [`MemoryObjectStore`]s keyed by bucket name.
///
/// Every connection to the same bucket shares its contents, so state survives
/// the per-call backend construction done by the orchestrator.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    buckets: Arc<RwLock<HashMap<String, MemoryObjectStore>>>,
    connections: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store for `name`, created empty on first use.
    pub fn bucket(&self, name: &str) -> MemoryObjectStore {
        if let Some(store) = self.buckets.read().expect("poisoned lock").get(name) {
            return store.clone();
        }
        self.buckets
            .write()
            .expect("poisoned lock")
            .entry(name.to_string())
            .or_insert_with(|| MemoryObjectStore::new(name))
            .clone()
    }

    /// Number of clients built so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buckets = self.buckets.read().expect("poisoned lock");
        f.debug_struct("MemoryConnector")
            .field("buckets", &buckets.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Connector for MemoryConnector {
    type Store = MemoryObjectStore;

    fn connect(&self, settings: &S3Settings) -> MemoryObjectStore {
        self.connections.fetch_add(1, Ordering::SeqCst);
        self.bucket(&settings.bucket)
    }
}
