//! # blob-api: cached-client blob storage facade
//!
//! `blob-api` puts a small, idempotent operation set in front of a remote
//! object-storage service: list/create/delete containers, and upload, download,
//! inspect and delete blobs. Container clients are memoized per name, upload
//! payloads are normalized to an exact length before transmission, and
//! downloads come back either as a pass-through stream or a collected buffer.
//!
//! ## Quick Start
//!
//! ```rust
//! use blob_api::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! // 1. Bind a backend to the storage account
//! let config = StorageConfig::new().with_account("devaccount");
//! let service = ServiceHandle::new(&config, MemoryBackend::new())?;
//! let blobs = BlobOperations::new(Arc::new(ClientCache::new(service)));
//!
//! // 2. One context per request
//! let ctx = BlobCtx::new();
//!
//! // 3. Create a container and upload
//! blobs.create_container(&ctx, "photos").await?;
//! let options = UploadOptions::new()
//!     .with_content_type("text/plain")
//!     .with_metadata("filename", "hello.txt");
//! blobs.upload_blob(&ctx, "photos", "hello", Payload::text("Hello, world!"), options).await?;
//!
//! // 4. Download as a buffer
//! let download = blobs.get_blob_buffer(&ctx, "photos", "hello").await?;
//! assert_eq!(download.buffer().map(|b| &b[..]), Some(&b"Hello, world!"[..]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  BlobOperations  │  ← public operations, logging, existence checks
//! ├──────────────────┤
//! │   ClientCache    │  ← one ContainerHandle per name
//! ├──────────────────┤
//! │  StorageBackend  │  ← remote protocol (S3, memory)
//! └──────────────────┘
//! ```
//!
//! `ContentResolver` and `StreamCollector` sit beside the cache: the first turns
//! a `Payload` into a length and body, the second drains download streams.

mod backend;
mod cache;
mod client;
mod collect;
mod config;
mod content;
mod download;
mod error;
mod memory;
mod operations;
mod s3;
mod types;

// Re-export main types for clean API
pub use backend::{DownloadResponse, StorageBackend, UploadResponse};
pub use cache::ClientCache;
pub use client::{BlobHandle, ContainerHandle, ServiceHandle};
pub use collect::StreamCollector;
pub use config::{StorageConfig, TransportOptions};
pub use content::{ContentResolver, Payload, ResolvedContent, StreamFactory};
pub use download::{Disposition, DownloadBody, DownloadResult};
pub use error::{BlobError, BlobResult};
pub use memory::{DownloadFault, MemoryBackend};
pub use operations::BlobOperations;
pub use s3::S3Backend;
pub use types::{
    AccessTier, BlobCtx, BlobEntry, BlobItem, BlobListing, BlobProperties, ByteStream, ContainerItem, Metadata,
    ServiceResponse, UploadKind, UploadOptions, UploadOutcome,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobCtx, BlobError, BlobOperations, BlobResult, ByteStream, ClientCache, DownloadResult, MemoryBackend,
        Payload, ServiceHandle, StorageConfig, UploadOptions,
    };
}
