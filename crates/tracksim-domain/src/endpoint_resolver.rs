use crate::error::DomainResult;
use crate::types::BrokerEndpoint;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Remote lookup of the broker address for a region.
/// Infrastructure (e.g. tracksim-aws) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EndpointSource: Send + Sync {
    async fn resolve_endpoint(&self, region: &str) -> DomainResult<BrokerEndpoint>;
}

/// Lazily resolves and caches the broker endpoint.
///
/// Same caching discipline as [`crate::CredentialStore`]: resolved at most
/// once per process lifetime, reused for every later connection attempt.
pub struct EndpointResolver {
    source: Arc<dyn EndpointSource>,
    cached: Option<BrokerEndpoint>,
}

impl EndpointResolver {
    pub fn new(source: Arc<dyn EndpointSource>) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    /// Return the cached endpoint, resolving it on first call.
    pub async fn get_endpoint(&mut self, region: &str) -> DomainResult<&BrokerEndpoint> {
        let endpoint = match self.cached.take() {
            Some(endpoint) => endpoint,
            None => {
                debug!(region = %region, "resolving broker endpoint");
                let endpoint = self.source.resolve_endpoint(region).await?;
                info!(address = %endpoint.address, "got broker endpoint");
                endpoint
            }
        };

        Ok(self.cached.insert(endpoint))
    }
}
