use crate::credential_store::CredentialStore;
use crate::endpoint_resolver::EndpointResolver;
use crate::error::{DomainError, DomainResult};
use crate::session::{DeviceSession, SessionFactory};
use crate::types::{DeviceIdentity, QualityOfService, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection lifecycle of one device.
///
/// `Connecting` only exists while an establish attempt is in flight; a failed
/// attempt always lands back in `Disconnected` so the next tick retries the
/// full resolve/connect path.
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected(Box<dyn DeviceSession>),
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected(_) => "connected",
        }
    }
}

/// Session parameters that are fixed per run rather than per device.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Always start from a clean session; never resume broker-side state
    /// left behind by a previous run.
    pub clean_session: bool,
    pub keep_alive: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            clean_session: true,
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// Owns and lazily establishes exactly one session for one device identity.
///
/// Credential material and the broker endpoint are resolved through their
/// caching accessors, so repeated connection attempts after the first
/// successful resolution perform no remote lookups.
pub struct ConnectionManager {
    identity: DeviceIdentity,
    credentials: CredentialStore,
    endpoint: EndpointResolver,
    factory: Arc<dyn SessionFactory>,
    settings: SessionSettings,
    state: ConnectionState,
}

impl ConnectionManager {
    pub fn new(
        identity: DeviceIdentity,
        credentials: CredentialStore,
        endpoint: EndpointResolver,
        factory: Arc<dyn SessionFactory>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            identity,
            credentials,
            endpoint,
            factory,
            settings,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// Make sure a live session exists, establishing one if necessary.
    ///
    /// Safe to call before every publish: with an open session this is a
    /// no-op that performs zero network calls.
    pub async fn ensure_connected(&mut self) -> DomainResult<()> {
        if let ConnectionState::Connected(session) = &self.state {
            if session.is_open() {
                return Ok(());
            }
            warn!(
                client_id = %self.identity.client_id,
                "session transport is no longer open, reconnecting"
            );
            self.state = ConnectionState::Disconnected;
        }

        self.state = ConnectionState::Connecting;
        debug!(
            client_id = %self.identity.client_id,
            state = self.state.name(),
            "establishing session"
        );

        match self.establish().await {
            Ok(session) => {
                info!(client_id = %self.identity.client_id, "connected to broker");
                self.state = ConnectionState::Connected(session);
                Ok(())
            }
            Err(err) => {
                warn!(
                    client_id = %self.identity.client_id,
                    error = %err,
                    "failed to establish session"
                );
                self.state = ConnectionState::Disconnected;
                Err(err)
            }
        }
    }

    async fn establish(&mut self) -> DomainResult<Box<dyn DeviceSession>> {
        let endpoint = self.endpoint.get_endpoint(&self.identity.region).await?.clone();
        let credentials = self.credentials.get_credentials(&self.identity).await?.clone();

        let config = SessionConfig {
            client_id: self.identity.client_id.clone(),
            endpoint,
            credentials,
            clean_session: self.settings.clean_session,
            keep_alive: self.settings.keep_alive,
        };

        self.factory.connect(config).await
    }

    /// Publish on the established session.
    ///
    /// A publish failure marks the session unusable and resets the state to
    /// `Disconnected`, so the next `ensure_connected` rebuilds the session
    /// instead of trusting a broken transport.
    pub async fn publish(
        &mut self,
        topic: &str,
        qos: QualityOfService,
        payload: Vec<u8>,
    ) -> DomainResult<()> {
        let ConnectionState::Connected(session) = &self.state else {
            return Err(DomainError::Publish(
                "no established session".to_string(),
            ));
        };

        match session.publish(topic, qos, payload).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Close the session if one exists. Used on shutdown only.
    pub async fn shutdown(&mut self) {
        if let ConnectionState::Connected(session) = &self.state {
            if let Err(err) = session.close().await {
                debug!(
                    client_id = %self.identity.client_id,
                    error = %err,
                    "error closing session"
                );
            }
        }
        self.state = ConnectionState::Disconnected;
    }
}
