use std::sync::Arc;
use tracing::{info, instrument};

use crate::download::guard_stream;
use crate::{
    BlobCtx, BlobEntry, BlobError, BlobListing, BlobProperties, BlobResult, ClientCache, ContainerItem,
    ContentResolver, DownloadResult, Payload, S3Backend, ServiceHandle, ServiceResponse, StorageConfig,
    UploadKind, UploadOptions, UploadOutcome,
};

/// Container and blob operations over a shared client cache.
///
/// Existence checks here are advisory: the remote service stays the source of
/// truth, so a resource can appear or vanish between a check and the call that
/// follows it. The remote call's own not-found or conflict is what counts.
#[derive(Clone)]
pub struct BlobOperations {
    cache: Arc<ClientCache>,
}

impl BlobOperations {
    pub fn new(cache: Arc<ClientCache>) -> Self {
        Self { cache }
    }

    pub fn from_service(service: ServiceHandle) -> Self {
        Self::new(Arc::new(ClientCache::new(service)))
    }

    /// Connect to the S3-compatible service described by `config`
    pub async fn connect(config: &StorageConfig) -> BlobResult<Self> {
        let backend = S3Backend::from_config(config).await?;
        let service = ServiceHandle::new(config, backend)?;
        info!("Connected to storage account {}", service.account_name());
        Ok(Self::from_service(service))
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    fn check_name(kind: &str, name: &str) -> BlobResult<()> {
        if name.trim().is_empty() {
            return Err(BlobError::invalid(format!("{} name must not be empty", kind)));
        }
        Ok(())
    }

    /// List every container in the account
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn list_containers(&self, ctx: &BlobCtx) -> BlobResult<Vec<ContainerItem>> {
        let containers = ctx.guard(self.cache.service().list_containers()).await?;

        info!("Containers:");
        for (i, container) in containers.iter().enumerate() {
            info!("Container {}: {}", i + 1, container.name);
        }
        if containers.is_empty() {
            info!("No containers found");
        }

        Ok(containers)
    }

    /// List blobs with their properties, or report a missing container
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn list_blobs(&self, ctx: &BlobCtx, container: &str) -> BlobResult<BlobListing> {
        Self::check_name("container", container)?;
        let client = self.cache.container(container);

        if !ctx.guard(client.exists()).await? {
            info!("Container {} does not exist", container);
            return Ok(BlobListing::ContainerMissing);
        }

        let items = match ctx.guard(client.list_blobs()).await {
            Ok(items) => items,
            // deleted by someone else after the check
            Err(BlobError::NotFound { .. }) => {
                info!("Container {} does not exist", container);
                return Ok(BlobListing::ContainerMissing);
            }
            Err(e) => return Err(e),
        };
        info!("Blobs in \"{}\":", container);

        let mut entries = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let properties = ctx.guard(client.blob_client(&item.name).properties()).await?;
            info!(
                "Blob {}: {} metadata={} etag={:?} content_type={:?} request_id={:?}",
                i + 1,
                item.name,
                serde_json::to_string(&properties.metadata).unwrap_or_default(),
                properties.etag,
                properties.content_type,
                properties.request_id
            );
            entries.push(BlobEntry {
                name: item.name,
                properties,
            });
        }
        if entries.is_empty() {
            info!("No blobs found");
        }

        Ok(BlobListing::Blobs(entries))
    }

    /// Create a container; `None` when it already exists
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn create_container(&self, ctx: &BlobCtx, container: &str) -> BlobResult<Option<ServiceResponse>> {
        Self::check_name("container", container)?;
        let client = self.cache.container(container);

        if ctx.guard(client.exists()).await? {
            info!("Container {} already exists", container);
            return Ok(None);
        }

        match ctx.guard(client.create()).await {
            Ok(response) => {
                info!("Created container {} successfully | {:?}", container, response.request_id);
                Ok(Some(response))
            }
            // lost a race with another creator
            Err(e) if e.is_conflict() => {
                info!("Container {} already exists", container);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Create or overwrite a blob
    #[instrument(skip(self, ctx, payload, options), fields(request_id = %ctx.request_id, payload = payload.kind()))]
    pub async fn upload_blob(
        &self,
        ctx: &BlobCtx,
        container: &str,
        blob: &str,
        payload: Payload,
        options: UploadOptions,
    ) -> BlobResult<UploadOutcome> {
        Self::check_name("container", container)?;
        Self::check_name("blob", blob)?;

        let content = ctx.guard(ContentResolver::resolve(payload)).await?;
        let size_bytes = content.length;
        let client = self.cache.blob(container, blob);

        // only selects the log line; the upload itself is an upsert
        let existed = ctx.guard(client.exists()).await?;
        if existed {
            info!("Blob {} already exists, updating...", blob);
        }

        let response = ctx.guard(client.upload(content, &options)).await?;
        let kind = if existed { UploadKind::Updated } else { UploadKind::Created };
        info!(
            "{} blob {} successfully ({} bytes, tier {}) | {:?}",
            if existed { "Updated" } else { "Uploaded" },
            blob,
            size_bytes,
            options.tier.map_or("default", |tier| tier.as_str()),
            response.request_id
        );

        Ok(UploadOutcome {
            kind,
            size_bytes,
            etag: response.etag,
            request_id: response.request_id,
        })
    }

    /// Blob properties without content
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn get_blob_properties(&self, ctx: &BlobCtx, container: &str, blob: &str) -> BlobResult<BlobProperties> {
        Self::check_name("container", container)?;
        Self::check_name("blob", blob)?;
        ctx.guard(self.cache.blob(container, blob).properties()).await
    }

    /// Open a download as a pass-through stream.
    ///
    /// The stream ends with an error item if the request is cancelled or the
    /// body is shorter than announced.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn get_blob_stream(&self, ctx: &BlobCtx, container: &str, blob: &str) -> BlobResult<DownloadResult> {
        Self::check_name("container", container)?;
        Self::check_name("blob", blob)?;
        let client = self.cache.blob(container, blob);

        let properties = ctx.guard(client.properties()).await?;
        let download = ctx.guard(client.download()).await?;
        let body = download
            .body
            .ok_or_else(|| BlobError::missing_stream(format!("download of {}/{} returned no body", container, blob)))?;

        info!("Downloaded blob {} successfully | {:?}", blob, download.request_id);
        let stream = guard_stream(body, download.content_length, ctx.cancel.clone());

        Ok(DownloadResult::streaming(blob, properties, download.content_length, stream))
    }

    /// Download and fully buffer a blob
    pub async fn get_blob_buffer(&self, ctx: &BlobCtx, container: &str, blob: &str) -> BlobResult<DownloadResult> {
        let result = self.get_blob_stream(ctx, container, blob).await?;
        ctx.guard(result.into_buffered()).await
    }

    /// Delete a container and evict its cached client; `None` when it does not exist
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn delete_container(&self, ctx: &BlobCtx, container: &str) -> BlobResult<Option<ServiceResponse>> {
        Self::check_name("container", container)?;
        let client = self.cache.container(container);

        if !ctx.guard(client.exists()).await? {
            info!("Container {} does not exist", container);
            return Ok(None);
        }

        match ctx.guard(client.delete()).await {
            Ok(response) => {
                self.cache.invalidate(container);
                info!("Deleted container {} successfully | {:?}", container, response.request_id);
                Ok(Some(response))
            }
            // deleted by someone else after the check
            Err(BlobError::NotFound { .. }) => {
                self.cache.invalidate(container);
                info!("Container {} does not exist", container);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a blob; fails with `NotFound` if absent
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn delete_blob(&self, ctx: &BlobCtx, container: &str, blob: &str) -> BlobResult<ServiceResponse> {
        Self::check_name("container", container)?;
        Self::check_name("blob", blob)?;
        let response = ctx.guard(self.cache.blob(container, blob).delete()).await?;
        info!("Deleted blob {} successfully | {:?}", blob, response.request_id);
        Ok(response)
    }
}
