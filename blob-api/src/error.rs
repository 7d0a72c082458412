use thiserror::Error;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during blob operations
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {resource}")]
    Conflict { resource: String },

    #[error("Transport error: {message} (request id: {})", .request_id.as_deref().unwrap_or("none"))]
    Transport {
        message: String,
        request_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Stream error: {source}")]
    Stream {
        #[from]
        source: std::io::Error,
    },

    #[error("Stream missing: {context}")]
    MissingStream { context: String },

    #[error("Unsupported payload: {kind}")]
    UnsupportedPayload { kind: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid request: {message}")]
    Invalid { message: String },
}

impl BlobError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(resource: S) -> Self {
        Self::Conflict {
            resource: resource.into(),
        }
    }

    /// Create a transport error from any error type, keeping the remote request id
    pub fn transport<E>(error: E, request_id: Option<String>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: error.to_string(),
            request_id,
            source: Some(Box::new(error)),
        }
    }

    /// Create a transport error from a plain message
    pub fn transport_message<S: Into<String>>(message: S, request_id: Option<String>) -> Self {
        Self::Transport {
            message: message.into(),
            request_id,
            source: None,
        }
    }

    /// Create a stream error from a message
    pub fn stream<S: Into<String>>(message: S) -> Self {
        Self::Stream {
            source: std::io::Error::new(std::io::ErrorKind::Other, message.into()),
        }
    }

    /// Create a missing stream error
    pub fn missing_stream<S: Into<String>>(context: S) -> Self {
        Self::MissingStream {
            context: context.into(),
        }
    }

    /// Create an unsupported payload error
    pub fn unsupported_payload<S: Into<String>>(kind: S) -> Self {
        Self::UnsupportedPayload { kind: kind.into() }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Remote request id attached to the failure, if any
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Transport { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}
