use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Static identity of one simulated tracker.
///
/// Created at wiring time and never mutated; each identity is owned by
/// exactly one connection manager / route simulator pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Stable client identifier presented to the broker.
    pub client_id: String,
    /// Topic all location updates for this device are published on.
    pub topic: String,
    /// Opaque locator for the credential material in the secret store.
    pub secret_reference: String,
    /// Region that locates both the secret store and the broker.
    pub region: String,
}

/// Client certificate and private key for mutual TLS.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialMaterial {
    pub certificate: String,
    pub private_key: String,
}

// Key material stays out of debug output.
impl fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialMaterial")
            .field("certificate", &format_args!("[{} bytes]", self.certificate.len()))
            .field("private_key", &format_args!("[redacted]"))
            .finish()
    }
}

/// Network address of the message broker, as returned by endpoint lookup.
///
/// The address is a bare hostname or `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub address: String,
}

/// One geographic sample on a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub lat: f64,
    pub long: f64,
}

/// A fixed, ordered, cyclic sequence of samples a device traverses forever.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    samples: Vec<LocationSample>,
}

impl Route {
    /// Build a route from an ordered list of samples. Routes are cyclic, so
    /// an empty route would make the cursor arithmetic meaningless.
    pub fn new(samples: Vec<LocationSample>) -> DomainResult<Self> {
        if samples.is_empty() {
            return Err(DomainError::InvalidRoute(
                "route must contain at least one sample".to_string(),
            ));
        }
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `index`, wrapping around the end of the route.
    pub fn sample(&self, index: usize) -> LocationSample {
        self.samples[index % self.samples.len()]
    }
}

/// Wire payload for one location update.
///
/// Serialized field order is deviceId, timestamp, location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    pub device_id: String,
    /// Milliseconds since the Unix epoch, captured at publish time.
    pub timestamp: i64,
    pub location: LocationSample,
}

/// Delivery guarantee requested for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityOfService {
    /// Fire and forget: the message may be lost and is never retried.
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Everything the session factory pins when establishing a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_id: String,
    pub endpoint: BrokerEndpoint,
    pub credentials: CredentialMaterial,
    /// Start from a clean session instead of resuming broker-side state.
    pub clean_session: bool,
    pub keep_alive: Duration,
}
