use std::env;
use std::time::Duration;

use crate::{BlobError, BlobResult};

/// Connection settings for the storage account
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Storage account identity; required
    pub account_name: Option<String>,

    /// Region passed to the transport
    pub region: Option<String>,

    /// Override for the service endpoint (S3-compatible stores, local emulators)
    pub endpoint_url: Option<String>,

    /// Static credentials; when absent the default provider chain is used
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,

    /// Timeout and retry settings handed to the transport untouched
    pub transport: TransportOptions,
}

/// Transport pass-through options
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Total attempts per remote call, including the first
    pub max_attempts: u32,

    /// Deadline for a whole remote call across retries
    pub operation_timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            operation_timeout: None,
        }
    }
}

impl StorageConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from `STORAGE_*` environment variables
    pub fn from_env() -> BlobResult<Self> {
        fn get_env(key: &str) -> Option<String> {
            env::var(key).ok().filter(|value| !value.trim().is_empty())
        }

        let mut transport = TransportOptions::default();
        if let Some(attempts) = get_env("STORAGE_MAX_ATTEMPTS") {
            transport.max_attempts = attempts.parse().map_err(|_| {
                BlobError::configuration(format!("STORAGE_MAX_ATTEMPTS must be a number, got {}", attempts))
            })?;
        }
        if let Some(secs) = get_env("STORAGE_OPERATION_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                BlobError::configuration(format!("STORAGE_OPERATION_TIMEOUT_SECS must be a number, got {}", secs))
            })?;
            transport.operation_timeout = Some(Duration::from_secs(secs));
        }

        let config = Self {
            account_name: get_env("STORAGE_ACCOUNT_NAME"),
            region: get_env("STORAGE_REGION"),
            endpoint_url: get_env("STORAGE_ENDPOINT_URL"),
            access_key_id: get_env("STORAGE_ACCESS_KEY_ID"),
            secret_access_key: get_env("STORAGE_SECRET_ACCESS_KEY"),
            transport,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the storage account
    pub fn with_account<S: Into<String>>(mut self, account_name: S) -> Self {
        self.account_name = Some(account_name.into());
        self
    }

    /// Set the region
    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a custom endpoint
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint_url: S) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Use static credentials
    pub fn with_credentials<A: Into<String>, S: Into<String>>(mut self, access_key_id: A, secret_access_key: S) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Set transport options
    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// The account name, or a configuration error when it was never supplied
    pub fn account(&self) -> BlobResult<&str> {
        self.account_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| BlobError::configuration("storage account name is required (STORAGE_ACCOUNT_NAME)"))
    }

    /// Check the config is usable before any client is built
    pub fn validate(&self) -> BlobResult<()> {
        self.account()?;
        if self.transport.max_attempts == 0 {
            return Err(BlobError::configuration("max_attempts must be at least 1"));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(BlobError::configuration(
                "access_key_id and secret_access_key must be set together",
            ));
        }
        Ok(())
    }
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}
