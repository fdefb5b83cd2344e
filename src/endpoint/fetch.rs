use std::collections::HashMap;

use async_trait::async_trait;

/// Looks up a resource by its reference.
///
/// `Ok(None)` means the resource does not exist. Errors are reserved for the
/// lookup itself failing (storage down, timeout) and are never shown to the
/// caller of the resolution endpoint.
#[async_trait]
pub trait ResourceFetcher<R>: Send + Sync {
    async fn fetch(&self, resource_ref: &str) -> anyhow::Result<Option<R>>;
}

/// A fixed in-memory resource set keyed by reference.
#[async_trait]
impl<R> ResourceFetcher<R> for HashMap<String, R>
where
    R: Clone + Send + Sync,
{
    async fn fetch(&self, resource_ref: &str) -> anyhow::Result<Option<R>> {
        Ok(self.get(resource_ref).cloned())
    }
}
