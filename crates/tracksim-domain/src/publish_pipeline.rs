use crate::connection_manager::ConnectionManager;
use crate::error::DomainResult;
use crate::types::{LocationEvent, LocationSample, QualityOfService};
use std::time::Duration;
use tracing::{debug, error, warn};

/// What happens to a location update whose publish attempt failed.
///
/// Failures terminate here in every case: the route loop is never informed
/// of an individual failed tick and never deviates from its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure and drop the update.
    SwallowAndLog,
    /// Retry the whole attempt (connection included) within the tick,
    /// then drop the update.
    BoundedRetry {
        max_attempts: u32,
        delay: Duration,
    },
}

/// Formats location events and publishes them on the device's topic.
///
/// Location updates are fire-and-forget: QoS 0, no delivery acknowledgement,
/// no deduplication. Only the connection is retried (lazily, on the next
/// tick), never the message itself.
pub struct PublishPipeline {
    connection: ConnectionManager,
    qos: QualityOfService,
    policy: FailurePolicy,
}

impl PublishPipeline {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            qos: QualityOfService::AtMostOnce,
            policy: FailurePolicy::SwallowAndLog,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.connection.identity().client_id
    }

    /// Publish one location update, applying the failure policy.
    pub async fn publish_update(&mut self, location: &LocationSample) {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.try_publish(location).await {
                Ok(()) => return,
                Err(err) => err,
            };

            match self.policy {
                FailurePolicy::SwallowAndLog => {
                    error!(
                        client_id = %self.client_id(),
                        error = %err,
                        "dropping location update"
                    );
                    return;
                }
                FailurePolicy::BoundedRetry { max_attempts, delay } if attempt < max_attempts => {
                    warn!(
                        client_id = %self.client_id(),
                        attempt,
                        max_attempts,
                        error = %err,
                        "publish attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                FailurePolicy::BoundedRetry { max_attempts, .. } => {
                    error!(
                        client_id = %self.client_id(),
                        attempts = max_attempts,
                        error = %err,
                        "dropping location update after retries"
                    );
                    return;
                }
            }
        }
    }

    async fn try_publish(&mut self, location: &LocationSample) -> DomainResult<()> {
        self.connection.ensure_connected().await?;

        let identity = self.connection.identity();
        let event = LocationEvent {
            device_id: identity.client_id.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            location: *location,
        };
        let topic = identity.topic.clone();

        let payload = serde_json::to_vec(&event)?;
        debug!(
            client_id = %event.device_id,
            payload = %String::from_utf8_lossy(&payload),
            "publishing location update"
        );

        self.connection.publish(&topic, self.qos, payload).await
    }

    /// Close the underlying session. Used on shutdown only.
    pub async fn shutdown(&mut self) {
        self.connection.shutdown().await;
    }
}
