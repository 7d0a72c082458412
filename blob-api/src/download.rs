use bytes::Bytes;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{BlobProperties, BlobResult, ByteStream, Metadata, StreamCollector};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Downloaded blob content
pub enum DownloadBody {
    /// Pass-through stream; the caller must drain or drop it
    Stream(ByteStream),
    /// Fully materialized content
    Buffer(Bytes),
}

/// How a front end should present the content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// Result of a download with the blob's properties
pub struct DownloadResult {
    pub blob_name: String,
    pub metadata: Metadata,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub request_id: Option<String>,
    pub content_length: Option<u64>,
    pub body: DownloadBody,
}

impl DownloadResult {
    pub(crate) fn streaming(blob_name: &str, properties: BlobProperties, content_length: Option<u64>, stream: ByteStream) -> Self {
        Self {
            blob_name: blob_name.to_string(),
            metadata: properties.metadata,
            etag: properties.etag,
            content_type: properties.content_type,
            request_id: properties.request_id,
            content_length,
            body: DownloadBody::Stream(stream),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.body, DownloadBody::Buffer(_))
    }

    pub fn buffer(&self) -> Option<&Bytes> {
        match &self.body {
            DownloadBody::Buffer(buffer) => Some(buffer),
            DownloadBody::Stream(_) => None,
        }
    }

    /// Take the body as a stream, wrapping a buffer if already collected
    pub fn into_stream(self) -> ByteStream {
        match self.body {
            DownloadBody::Stream(stream) => stream,
            DownloadBody::Buffer(buffer) => Box::pin(futures::stream::once(async move { Ok::<_, std::io::Error>(buffer) })),
        }
    }

    /// Collect a streaming body into a buffer, keeping every property
    pub async fn into_buffered(self) -> BlobResult<Self> {
        let body = match self.body {
            DownloadBody::Buffer(buffer) => buffer,
            DownloadBody::Stream(stream) => StreamCollector::collect(Some(stream)).await?,
        };

        Ok(Self {
            content_length: Some(body.len() as u64),
            body: DownloadBody::Buffer(body),
            ..self
        })
    }

    /// `filename` metadata, falling back to the blob name
    pub fn filename(&self) -> &str {
        self.metadata
            .get("filename")
            .map(String::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.blob_name)
    }

    /// Content type, then `contentType` metadata, then `application/octet-stream`
    pub fn content_type_or_default(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .or_else(|| self.metadata.get("contentType").map(String::as_str))
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Value for a `Content-Disposition` header
    pub fn content_disposition(&self, disposition: Disposition) -> String {
        let kind = match disposition {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        };
        format!("{}; filename=\"{}\"", kind, self.filename().replace('"', "\\\""))
    }
}

impl std::fmt::Debug for DownloadResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadResult")
            .field("blob_name", &self.blob_name)
            .field("metadata", &self.metadata)
            .field("etag", &self.etag)
            .field("content_type", &self.content_type)
            .field("request_id", &self.request_id)
            .field("content_length", &self.content_length)
            .field("buffered", &self.is_buffered())
            .finish()
    }
}

/// Wrap a download body so that cancellation and short bodies end the stream
/// with an error item instead of a silent end-of-stream.
pub(crate) fn guard_stream(stream: ByteStream, expected: Option<u64>, cancel: CancellationToken) -> ByteStream {
    let guarded = async_stream::stream! {
        let mut inner = stream;
        let mut received: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = inner.next() => Some(item),
            };

            match next {
                None => {
                    yield Err(std::io::Error::new(
                        std::io::ErrorKind::Interrupted,
                        format!("download cancelled after {} bytes", received),
                    ));
                    return;
                }
                Some(Some(Ok(chunk))) => {
                    received += chunk.len() as u64;
                    yield Ok(chunk);
                }
                Some(Some(Err(e))) => {
                    yield Err(e);
                    return;
                }
                Some(None) => break,
            }
        }

        if let Some(expected) = expected {
            if received != expected {
                yield Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("download ended after {} of {} bytes", received, expected),
                ));
            }
        }
    };
    Box::pin(guarded)
}
