use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{BlobHandle, ContainerHandle, ServiceHandle};

/// Memoized container clients for one service.
///
/// Insertion goes through the map's entry API, which holds the shard lock
/// across check-and-insert, so concurrent first lookups of a name agree on a
/// single handle.
pub struct ClientCache {
    service: ServiceHandle,
    containers: DashMap<String, Arc<ContainerHandle>>,
}

impl ClientCache {
    pub fn new(service: ServiceHandle) -> Self {
        Self {
            service,
            containers: DashMap::new(),
        }
    }

    /// The process-wide service handle
    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }

    /// Cached container client, constructed on first reference
    pub fn container(&self, name: &str) -> Arc<ContainerHandle> {
        if let Some(handle) = self.containers.get(name) {
            return Arc::clone(handle.value());
        }

        let entry = self.containers.entry(name.to_string()).or_insert_with(|| {
            debug!("Caching container client for {}", name);
            Arc::new(self.service.container_client(name))
        });
        Arc::clone(entry.value())
    }

    /// Blob client derived from the cached container client
    pub fn blob(&self, container: &str, blob: &str) -> BlobHandle {
        self.container(container).blob_client(blob)
    }

    /// Drop the cached client for `name`; returns whether one was present
    pub fn invalidate(&self, name: &str) -> bool {
        let removed = self.containers.remove(name).is_some();
        if removed {
            debug!("Evicted container client for {}", name);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.containers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("service", &self.service)
            .field("containers", &self.containers.len())
            .finish()
    }
}
