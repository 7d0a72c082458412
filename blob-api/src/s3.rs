use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::RequestId;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, StorageClass};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::backend::{DownloadResponse, StorageBackend, UploadResponse};
use crate::{
    AccessTier, BlobError, BlobItem, BlobProperties, BlobResult, ByteStream, ContainerItem, ServiceResponse, StorageConfig,
    UploadOptions,
};

/// S3-compatible backend: containers are buckets, blobs are objects
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    region: Option<String>,
}

impl S3Backend {
    /// Build a client from the storage config; retries and timeouts pass straight to the SDK
    pub async fn from_config(config: &StorageConfig) -> BlobResult<Self> {
        config.validate()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(config.transport.max_attempts));

        if let Some(timeout) = config.transport.operation_timeout {
            loader = loader.timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        }
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            let credentials = Credentials::new(key.clone(), secret.clone(), None, None, "blob-api");
            loader = loader.credentials_provider(credentials);
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let shared = loader.load().await;
        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                // custom endpoints (emulators, S3-compatible stores) address buckets by path
                .force_path_style(config.endpoint_url.is_some())
                .build(),
        );

        Ok(Self {
            client,
            region: config.region.clone(),
        })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client, region: Option<String>) -> Self {
        Self { client, region }
    }

    fn storage_class(tier: AccessTier) -> StorageClass {
        match tier {
            AccessTier::Hot => StorageClass::Standard,
            AccessTier::Cool => StorageClass::StandardIa,
            AccessTier::Cold => StorageClass::GlacierIr,
            AccessTier::Archive => StorageClass::DeepArchive,
        }
    }

    fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, resource: &str) -> BlobError
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        let status = err.raw_response().map(|r| r.status().as_u16());
        let code = err.code().map(str::to_string);
        match (code.as_deref(), status) {
            (Some("NoSuchBucket" | "NoSuchKey" | "NotFound"), _) | (_, Some(404)) => BlobError::not_found(resource),
            (Some("BucketAlreadyOwnedByYou" | "BucketAlreadyExists"), _) | (_, Some(409)) => {
                BlobError::conflict(resource)
            }
            _ => {
                let request_id = err.meta().request_id().map(str::to_string);
                BlobError::transport(err, request_id)
            }
        }
    }

    fn timestamp(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
    }

    /// Unconditional `DeleteObject`; S3 succeeds on keys that are already gone
    async fn remove_object(&self, container: &str, key: &str) -> BlobResult<ServiceResponse> {
        let output = self
            .client
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &format!("blob {}/{}", container, key)))?;
        Ok(ServiceResponse::new(output.request_id().map(str::to_string)))
    }

    async fn object_keys(&self, container: &str) -> BlobResult<Vec<BlobItem>> {
        let resource = format!("container {}", container);
        let mut pages = self.client.list_objects_v2().bucket(container).into_paginator().send();

        let mut items = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Self::map_sdk_error(e, &resource))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    items.push(BlobItem {
                        name: key.to_string(),
                        size_bytes: object.size().unwrap_or(0).max(0) as u64,
                    });
                }
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn list_containers(&self) -> BlobResult<Vec<ContainerItem>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, "containers"))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| {
                bucket.name().map(|name| ContainerItem {
                    name: name.to_string(),
                    last_modified: bucket.creation_date().and_then(Self::timestamp),
                })
            })
            .collect())
    }

    async fn container_exists(&self, container: &str) -> BlobResult<bool> {
        match self.client.head_bucket().bucket(container).send().await {
            Ok(_) => Ok(true),
            Err(e) => match Self::map_sdk_error(e, &format!("container {}", container)) {
                BlobError::NotFound { .. } => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_container(&self, container: &str) -> BlobResult<ServiceResponse> {
        let mut request = self.client.create_bucket().bucket(container);
        // us-east-1 rejects an explicit location constraint
        if let Some(region) = self.region.as_deref().filter(|r| *r != "us-east-1") {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        let output = request
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &format!("container {}", container)))?;
        Ok(ServiceResponse::new(output.request_id().map(str::to_string)))
    }

    async fn delete_container(&self, container: &str) -> BlobResult<ServiceResponse> {
        // buckets must be empty before deletion; a key removed concurrently is already gone
        let objects = self.object_keys(container).await?;
        for object in &objects {
            self.remove_object(container, &object.name).await?;
        }
        debug!("Removed {} objects from {} before deletion", objects.len(), container);

        let output = self
            .client
            .delete_bucket()
            .bucket(container)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &format!("container {}", container)))?;
        Ok(ServiceResponse::new(output.request_id().map(str::to_string)))
    }

    async fn list_blobs(&self, container: &str) -> BlobResult<Vec<BlobItem>> {
        self.object_keys(container).await
    }

    async fn blob_exists(&self, container: &str, blob: &str) -> BlobResult<bool> {
        match self.get_properties(container, blob).await {
            Ok(_) => Ok(true),
            Err(BlobError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn upload(
        &self,
        container: &str,
        blob: &str,
        body: Bytes,
        content_length: u64,
        options: &UploadOptions,
    ) -> BlobResult<UploadResponse> {
        let mut request = self
            .client
            .put_object()
            .bucket(container)
            .key(blob)
            .body(AwsByteStream::from(body))
            .content_length(content_length as i64);

        if let Some(content_type) = &options.content_type {
            request = request.content_type(content_type);
        }
        for (key, value) in &options.metadata {
            request = request.metadata(key, value);
        }
        if let Some(tier) = options.tier {
            request = request.storage_class(Self::storage_class(tier));
        }

        let output = request
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &format!("blob {}/{}", container, blob)))?;

        Ok(UploadResponse {
            etag: output.e_tag().map(str::to_string),
            request_id: output.request_id().map(str::to_string),
        })
    }

    async fn get_properties(&self, container: &str, blob: &str) -> BlobResult<BlobProperties> {
        let output = self
            .client
            .head_object()
            .bucket(container)
            .key(blob)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &format!("blob {}/{}", container, blob)))?;

        Ok(BlobProperties {
            metadata: output
                .metadata()
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
            etag: output.e_tag().map(str::to_string),
            content_type: output.content_type().map(str::to_string),
            request_id: output.request_id().map(str::to_string),
            content_length: output.content_length().unwrap_or(0).max(0) as u64,
            last_modified: output.last_modified().and_then(Self::timestamp),
        })
    }

    async fn download(&self, container: &str, blob: &str) -> BlobResult<DownloadResponse> {
        let output = self
            .client
            .get_object()
            .bucket(container)
            .key(blob)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &format!("blob {}/{}", container, blob)))?;

        let request_id = output.request_id().map(str::to_string);
        let content_length = output.content_length().map(|n| n.max(0) as u64);
        let body: ByteStream = Box::pin(ReaderStream::new(output.body.into_async_read()));

        Ok(DownloadResponse {
            body: Some(body),
            content_length,
            request_id,
        })
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> BlobResult<ServiceResponse> {
        // S3 deletes are silent on missing keys; probe first so absence surfaces as NotFound
        self.get_properties(container, blob).await?;
        self.remove_object(container, blob).await
    }
}
