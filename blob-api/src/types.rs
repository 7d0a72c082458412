use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{BlobError, BlobResult};

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// User metadata attached to a blob (string key/value pairs)
pub type Metadata = BTreeMap<String, String>;

/// Context for a single request: correlation id and cancellation
#[derive(Debug, Clone)]
pub struct BlobCtx {
    pub request_id: String,
    pub cancel: CancellationToken,
}

impl BlobCtx {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Derive a context that is cancelled together with this one
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a remote call, failing with `Cancelled` if the token fires first
    pub async fn guard<T, F>(&self, fut: F) -> BlobResult<T>
    where
        F: Future<Output = BlobResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BlobError::Cancelled),
            result = fut => result,
        }
    }
}

impl Default for BlobCtx {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage tier for uploaded blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessTier {
    Hot,
    Cool,
    Cold,
    Archive,
}

impl AccessTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Hot => "Hot",
            AccessTier::Cool => "Cool",
            AccessTier::Cold => "Cold",
            AccessTier::Archive => "Archive",
        }
    }
}

/// Caller-supplied options for an upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub tier: Option<AccessTier>,
    pub content_type: Option<String>,
    pub metadata: Metadata,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, tier: AccessTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Acknowledgement of a remote call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub request_id: Option<String>,
}

impl ServiceResponse {
    pub fn new(request_id: Option<String>) -> Self {
        Self { request_id }
    }
}

/// Properties of a blob, fetched without downloading content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobProperties {
    pub metadata: Metadata,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub request_id: Option<String>,
    pub content_length: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Container entry from a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerItem {
    pub name: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Blob entry from a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobItem {
    pub name: String,
    pub size_bytes: u64,
}

/// Blob listing entry together with its properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobEntry {
    pub name: String,
    pub properties: BlobProperties,
}

/// Outcome of listing a container's blobs
#[derive(Debug, Clone)]
pub enum BlobListing {
    /// The container did not exist at check time
    ContainerMissing,
    /// Blobs in listing order (possibly empty)
    Blobs(Vec<BlobEntry>),
}

impl BlobListing {
    pub fn entries(&self) -> &[BlobEntry] {
        match self {
            BlobListing::ContainerMissing => &[],
            BlobListing::Blobs(entries) => entries,
        }
    }
}

/// Whether an upload created a new blob or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadKind {
    Created,
    Updated,
}

/// Result of an upsert upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub kind: UploadKind,
    pub size_bytes: u64,
    pub etag: Option<String>,
    pub request_id: Option<String>,
}
