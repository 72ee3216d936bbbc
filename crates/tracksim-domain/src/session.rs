use crate::error::DomainResult;
use crate::types::{QualityOfService, SessionConfig};
use async_trait::async_trait;

/// One live, mutually-authenticated session to the message broker.
///
/// A session is owned exclusively by the connection manager that created it
/// and is never shared across devices.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Publish a payload on `topic` at the requested quality of service.
    async fn publish(
        &self,
        topic: &str,
        qos: QualityOfService,
        payload: Vec<u8>,
    ) -> DomainResult<()>;

    /// Whether the underlying transport is still usable.
    fn is_open(&self) -> bool;

    /// Tear the session down. The session is unusable afterwards regardless
    /// of the returned result.
    async fn close(&self) -> DomainResult<()>;
}

/// Builds sessions from a pinned configuration.
/// Infrastructure (e.g. tracksim-mqtt) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Establish a new session: transport connect plus protocol handshake.
    async fn connect(&self, config: SessionConfig) -> DomainResult<Box<dyn DeviceSession>>;
}
