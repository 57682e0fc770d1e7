use super::{Connector, ObjectAcl, ObjectHead, ObjectStore, PutOptions, StorageClass, encode_key};
use crate::{Error, Result, S3Settings};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, types};
use bytes::Bytes;
use secrecy::ExposeSecret;

/// S3-compatible object store using object keys as identifiers.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    url_base: UrlBase,
}

/// How public object URLs are shaped.
#[derive(Clone, Debug, PartialEq, Eq)]
enum UrlBase {
    /// `{endpoint}/{bucket}/{key}`
    PathStyle(String),
    /// `{scheme}://{bucket}.{host}/{key}`
    VirtualHost { scheme: String, host: String },
}

impl S3ObjectStore {
    /// Wrap an existing client. URLs default to `https://{bucket}.s3.amazonaws.com/{key}`.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            url_base: UrlBase::VirtualHost {
                scheme: "https".to_string(),
                host: "s3.amazonaws.com".to_string(),
            },
        }
    }

    fn with_url_base(mut self, url_base: UrlBase) -> Self {
        self.url_base = url_base;
        self
    }

    fn url_base_for(settings: &S3Settings) -> UrlBase {
        match &settings.endpoint {
            Some(endpoint) if settings.force_path_style => {
                UrlBase::PathStyle(endpoint.trim_end_matches('/').to_string())
            }
            Some(endpoint) => {
                let (scheme, host) = endpoint.split_once("://").unwrap_or(("https", endpoint));
                UrlBase::VirtualHost {
                    scheme: scheme.to_string(),
                    host: host.trim_end_matches('/').to_string(),
                }
            }
            None => {
                let host = match &settings.region {
                    Some(region) => format!("s3.{region}.amazonaws.com"),
                    None => "s3.amazonaws.com".to_string(),
                };
                UrlBase::VirtualHost {
                    scheme: "https".to_string(),
                    host,
                }
            }
        }
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Generic("s3 key cannot be empty".to_string()));
        }
        Ok(())
    }

    fn map_sdk_err<E>(e: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Connection(Box::new(e))
    }

    fn is_not_found(msg: &str) -> bool {
        msg.contains("NotFound")
            || msg.contains("NoSuchKey")
            || msg.contains("404")
            || msg.contains("StatusCode(404)")
    }
}

impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, key: &str, body: Bytes, options: PutOptions) -> Result<()> {
        Self::validate_key(key)?;

        let storage_class = match options.storage_class {
            StorageClass::Standard => types::StorageClass::Standard,
            StorageClass::ReducedRedundancy => types::StorageClass::ReducedRedundancy,
        };
        let acl = match options.acl {
            ObjectAcl::Private => types::ObjectCannedAcl::Private,
            ObjectAcl::PublicRead => types::ObjectCannedAcl::PublicRead,
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .storage_class(storage_class)
            .acl(acl)
            .send()
            .await
            .map_err(Self::map_sdk_err)?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes> {
        Self::validate_key(key)?;

        let out = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => out,
            Err(e) if Self::is_not_found(&e.to_string()) => {
                return Err(Error::NotFound(key.to_string()));
            }
            Err(e) => return Err(Self::map_sdk_err(e)),
        };

        let data = out.body.collect().await.map_err(Self::map_sdk_err)?;
        Ok(data.into_bytes())
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead> {
        Self::validate_key(key)?;

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => Ok(ObjectHead {
                content_length: out.content_length().and_then(|n| u64::try_from(n).ok()),
            }),
            // `head_object` returns a modeled service error; check both the
            // message and the debug form for a 404.
            Err(e) if Self::is_not_found(&e.to_string()) || Self::is_not_found(&format!("{e:?}")) => {
                Err(Error::NotFound(key.to_string()))
            }
            Err(e) => Err(Self::map_sdk_err(e)),
        }
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        Self::validate_key(key)?;

        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if Self::is_not_found(&e.to_string()) => Ok(()),
            Err(e) => Err(Self::map_sdk_err(e)),
        }
    }

    async fn copy_object(&self, source_key: &str, target_key: &str) -> Result<()> {
        Self::validate_key(source_key)?;
        Self::validate_key(target_key)?;

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, encode_key(source_key)))
            .key(target_key)
            .send()
            .await
            .map_err(Self::map_sdk_err)?;

        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        let key = encode_key(key);
        match &self.url_base {
            UrlBase::PathStyle(endpoint) => format!("{}/{}/{}", endpoint, self.bucket, key),
            UrlBase::VirtualHost { scheme, host } => {
                format!("{}://{}.{}/{}", scheme, self.bucket, host, key)
            }
        }
    }
}

/// Builds [`S3ObjectStore`]s from remote group settings.
///
/// Static credentials in the settings win. Otherwise the shared SDK config
/// loaded by [`from_env`](Self::from_env) supplies credentials and region.
#[derive(Clone, Debug, Default)]
pub struct S3Connector {
    shared: Option<SdkConfig>,
}

impl S3Connector {
    /// A connector relying only on the settings of each group.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector that falls back to the standard AWS environment chain.
    pub async fn from_env() -> Self {
        let shared = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self {
            shared: Some(shared),
        }
    }
}

impl Connector for S3Connector {
    type Store = S3ObjectStore;

    fn connect(&self, settings: &S3Settings) -> S3ObjectStore {
        let mut builder = match &self.shared {
            Some(shared) => aws_sdk_s3::config::Builder::from(shared),
            None => aws_sdk_s3::Config::builder().behavior_version(BehaviorVersion::latest()),
        };

        match &settings.region {
            Some(region) => builder = builder.region(Region::new(region.clone())),
            None if self.shared.is_none() => builder = builder.region(Region::new("us-east-1")),
            None => {}
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let Some(creds) = &settings.credentials {
            builder = builder.credentials_provider(Credentials::new(
                creds.key.clone(),
                creds.secret.expose_secret().to_string(),
                None,
                None,
                "depot-config",
            ));
        }
        builder = builder.force_path_style(settings.force_path_style);

        S3ObjectStore::new(Client::from_conf(builder.build()), settings.bucket.clone())
            .with_url_base(S3ObjectStore::url_base_for(settings))
    }
}
