//! Object-store clients used by [`RemoteBackend`](crate::RemoteBackend).
//!
//! An [`ObjectStore`] is an opaque blob store scoped to one bucket. A
//! [`Connector`] builds one from the `s3` settings of a remote config group;
//! the orchestrator asks for a fresh client every time it resolves a remote
//! backend.
//!
//! # Available clients
//!
//! - [`MemoryObjectStore`](memory::MemoryObjectStore) (feature `memory`) - in-process buckets for tests and demos
//! - [`S3ObjectStore`](s3::S3ObjectStore) (feature `s3`) - any S3-compatible service via the AWS SDK

use crate::{Result, S3Settings};
use bytes::Bytes;
use std::fmt::Debug;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

/// Storage class requested on upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StorageClass {
    #[default]
    Standard,
    ReducedRedundancy,
}

/// Canned access policy requested on upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ObjectAcl {
    #[default]
    Private,
    PublicRead,
}

/// Options attached to a `put_object` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PutOptions {
    pub storage_class: StorageClass,
    pub acl: ObjectAcl,
}

/// Metadata returned by a `head_object` probe.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ObjectHead {
    pub content_length: Option<u64>,
}

/// Primitive operations of an S3-compatible bucket.
///
/// Keys are full object keys; namespacing under a path prefix is the caller's job.
pub trait ObjectStore: Send + Sync + Debug {
    /// The bucket this client is scoped to.
    fn bucket(&self) -> &str;

    fn put_object(
        &self,
        key: &str,
        body: Bytes,
        options: PutOptions,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Read back the body at `key`.
    ///
    /// Backends never download; this is for verifying what an upload wrote.
    fn get_object(&self, key: &str) -> impl std::future::Future<Output = Result<Bytes>> + Send;

    fn head_object(&self, key: &str)
    -> impl std::future::Future<Output = Result<ObjectHead>> + Send;

    fn delete_object(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Server-side copy between two keys of this bucket.
    fn copy_object(
        &self,
        source_key: &str,
        target_key: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Public URL of `key`. Pure, no request is made.
    fn object_url(&self, key: &str) -> String;
}

/// Builds object-store clients from remote group settings.
pub trait Connector: Send + Sync + Debug {
    type Store: ObjectStore;

    fn connect(&self, settings: &S3Settings) -> Self::Store;
}

/// Percent-encode each `/`-separated segment of an object key.
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
