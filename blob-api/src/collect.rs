use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{BlobError, BlobResult, ByteStream};

/// Consumers for lazy byte streams.
///
/// `collect` materializes a stream into one buffer, `pipe` forwards it into any
/// async sink. Both preserve emission order byte for byte and fail on the first
/// stream error without handing back partial content.
pub struct StreamCollector;

impl StreamCollector {
    /// Drain a stream into a single buffer
    pub async fn collect(stream: Option<ByteStream>) -> BlobResult<Bytes> {
        let mut stream = stream.ok_or_else(|| BlobError::missing_stream("no readable stream to collect"))?;

        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer.freeze())
    }

    /// Write every chunk of a stream into `sink`, returning the bytes written
    pub async fn pipe<W>(mut stream: ByteStream, sink: &mut W) -> BlobResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(written)
    }
}
