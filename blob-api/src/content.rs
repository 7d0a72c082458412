use bytes::Bytes;
use tracing::debug;

use crate::{BlobError, BlobResult, ByteStream, StreamCollector};

/// Produces the stream for a lazily-sourced payload; `None` means no stream
pub type StreamFactory = Box<dyn FnOnce() -> Option<ByteStream> + Send>;

/// Upload input
pub enum Payload {
    /// Inline text, transmitted as UTF-8
    Text(String),
    /// In-memory buffer
    Buffer(Bytes),
    /// Lazily produced stream, invoked at most once
    Stream(StreamFactory),
}

impl Payload {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::Text(text.into())
    }

    pub fn buffer<B: Into<Bytes>>(buffer: B) -> Self {
        Self::Buffer(buffer.into())
    }

    /// Wrap a factory that always yields a stream
    pub fn stream<F>(factory: F) -> Self
    where
        F: FnOnce() -> ByteStream + Send + 'static,
    {
        Self::Stream(Box::new(move || Some(factory())))
    }

    /// Wrap a factory that may come back empty-handed
    pub fn from_factory(factory: StreamFactory) -> Self {
        Self::Stream(factory)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Buffer(_) => "buffer",
            Payload::Stream(_) => "stream",
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Payload::Buffer(buffer) => f.debug_tuple("Buffer").field(&buffer.len()).finish(),
            Payload::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(buffer: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(buffer))
    }
}

impl From<Bytes> for Payload {
    fn from(buffer: Bytes) -> Self {
        Self::Buffer(buffer)
    }
}

/// Loosely typed bodies (e.g. decoded JSON from a front end): strings become
/// text, arrays of byte values become buffers, anything else is rejected.
impl TryFrom<serde_json::Value> for Payload {
    type Error = BlobError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(items) => {
                let bytes = items
                    .iter()
                    .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or_else(|| BlobError::unsupported_payload("array with non-byte elements"))?;
                Ok(Self::Buffer(Bytes::from(bytes)))
            }
            Value::Null => Err(BlobError::unsupported_payload("null")),
            Value::Bool(_) => Err(BlobError::unsupported_payload("boolean")),
            Value::Number(_) => Err(BlobError::unsupported_payload("number")),
            Value::Object(_) => Err(BlobError::unsupported_payload("object")),
        }
    }
}

/// A payload reduced to its exact byte length and the body to transmit
#[derive(Debug, Clone)]
pub struct ResolvedContent {
    pub length: u64,
    pub body: Bytes,
}

/// Normalizes payloads before upload.
///
/// The remote upload needs the length up front, so a stream payload is fully
/// materialized in memory. The factory is invoked once and the transmitted body
/// is the very buffer that was measured.
pub struct ContentResolver;

impl ContentResolver {
    pub async fn resolve(payload: Payload) -> BlobResult<ResolvedContent> {
        let body = match payload {
            Payload::Text(text) => Bytes::from(text),
            Payload::Buffer(buffer) => buffer,
            Payload::Stream(factory) => {
                let stream = factory();
                if stream.is_none() {
                    return Err(BlobError::missing_stream("stream payload factory produced no stream"));
                }
                let buffer = StreamCollector::collect(stream).await?;
                debug!("Materialized stream payload of {} bytes", buffer.len());
                buffer
            }
        };

        Ok(ResolvedContent {
            length: body.len() as u64,
            body,
        })
    }
}
