//! End-to-end scenarios for the route-driving loop, run against in-memory
//! fakes with tokio's paused clock.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracksim_domain::{
    BrokerEndpoint, ConnectionManager, CredentialMaterial, CredentialSource, CredentialStore,
    DeviceIdentity, DeviceSession, DomainError, DomainResult, EndpointResolver, EndpointSource,
    LocationEvent, LocationSample, PublishPipeline, QualityOfService, Route, RouteSimulator,
    SessionConfig, SessionFactory, SessionSettings,
};

struct StaticCredentialSource {
    material: DomainResult<CredentialMaterial>,
    calls: AtomicUsize,
}

impl StaticCredentialSource {
    fn ok() -> Self {
        Self {
            material: Ok(CredentialMaterial {
                certificate: "CERT".to_string(),
                private_key: "KEY".to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    fn missing_key() -> Self {
        Self {
            material: Err(DomainError::CredentialFetch(
                "could not find cert or key".to_string(),
            )),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn fetch_credentials(
        &self,
        _secret_reference: &str,
        _region: &str,
    ) -> DomainResult<CredentialMaterial> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.material {
            Ok(material) => Ok(material.clone()),
            Err(DomainError::CredentialFetch(msg)) => {
                Err(DomainError::CredentialFetch(msg.clone()))
            }
            Err(_) => unreachable!("fake only carries credential fetch errors"),
        }
    }
}

struct StaticEndpointSource {
    calls: AtomicUsize,
}

impl StaticEndpointSource {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EndpointSource for StaticEndpointSource {
    async fn resolve_endpoint(&self, _region: &str) -> DomainResult<BrokerEndpoint> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(BrokerEndpoint {
            address: "abc123-ats.iot.ap-northeast-1.amazonaws.com".to_string(),
        })
    }
}

/// Session that records every published payload, optionally stalling each
/// publish to model a slow transport.
struct RecordingSession {
    log: Arc<Mutex<Vec<(String, QualityOfService, Vec<u8>)>>>,
    publish_delay: Duration,
}

#[async_trait]
impl DeviceSession for RecordingSession {
    async fn publish(
        &self,
        topic: &str,
        qos: QualityOfService,
        payload: Vec<u8>,
    ) -> DomainResult<()> {
        if !self.publish_delay.is_zero() {
            tokio::time::sleep(self.publish_delay).await;
        }
        self.log
            .lock()
            .unwrap()
            .push((topic.to_string(), qos, payload));
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    async fn close(&self) -> DomainResult<()> {
        Ok(())
    }
}

struct RecordingSessionFactory {
    log: Arc<Mutex<Vec<(String, QualityOfService, Vec<u8>)>>>,
    connects: AtomicUsize,
    publish_delay: Duration,
}

impl RecordingSessionFactory {
    fn new(log: Arc<Mutex<Vec<(String, QualityOfService, Vec<u8>)>>>) -> Self {
        Self {
            log,
            connects: AtomicUsize::new(0),
            publish_delay: Duration::ZERO,
        }
    }

    fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = delay;
        self
    }
}

#[async_trait]
impl SessionFactory for RecordingSessionFactory {
    async fn connect(&self, _config: SessionConfig) -> DomainResult<Box<dyn DeviceSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSession {
            log: Arc::clone(&self.log),
            publish_delay: self.publish_delay,
        }))
    }
}

fn identity(client_id: &str) -> DeviceIdentity {
    DeviceIdentity {
        client_id: client_id.to_string(),
        topic: "iot/location".to_string(),
        secret_reference: "iot-cert-and-key".to_string(),
        region: "ap-northeast-1".to_string(),
    }
}

fn simulator(
    client_id: &str,
    credential_source: Arc<StaticCredentialSource>,
    factory: Arc<RecordingSessionFactory>,
    route: Vec<LocationSample>,
    interval: Duration,
) -> RouteSimulator {
    let connection = ConnectionManager::new(
        identity(client_id),
        CredentialStore::new(credential_source),
        EndpointResolver::new(Arc::new(StaticEndpointSource::new())),
        factory,
        SessionSettings::default(),
    );
    RouteSimulator::new(
        PublishPipeline::new(connection),
        Route::new(route).unwrap(),
        interval,
    )
}

fn locations(log: &Mutex<Vec<(String, QualityOfService, Vec<u8>)>>) -> Vec<LocationSample> {
    log.lock()
        .unwrap()
        .iter()
        .map(|(topic, qos, payload)| {
            assert_eq!(topic, "iot/location");
            assert_eq!(*qos, QualityOfService::AtMostOnce);
            let event: LocationEvent = serde_json::from_slice(payload).unwrap();
            event.location
        })
        .collect()
}

// Scenario A: the published sequence equals the route repeated cyclically.
#[tokio::test(start_paused = true)]
async fn test_route_is_published_cyclically_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let credential_source = Arc::new(StaticCredentialSource::ok());
    let factory = Arc::new(RecordingSessionFactory::new(Arc::clone(&log)));

    let sim = simulator(
        "trackThing01",
        Arc::clone(&credential_source),
        Arc::clone(&factory),
        vec![
            LocationSample { lat: 35.0, long: 139.0 },
            LocationSample { lat: 36.0, long: 140.0 },
        ],
        Duration::from_secs(1),
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(sim.run(shutdown.clone()));

    // Ticks fire at t=0s, 1s and 2s; stop before the fourth.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    shutdown.cancel();
    handle.await.unwrap();

    assert_eq!(
        locations(&log),
        vec![
            LocationSample { lat: 35.0, long: 139.0 },
            LocationSample { lat: 36.0, long: 140.0 },
            LocationSample { lat: 35.0, long: 139.0 },
        ]
    );

    // Cache property: many publishes, one credential fetch, one connect.
    assert_eq!(credential_source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(factory.connects.load(Ordering::SeqCst), 1);
}

// Scenario B: a secret record missing the key field fails every connect
// attempt, no session is ever created, and the loop keeps its schedule.
#[tokio::test(start_paused = true)]
async fn test_missing_key_material_never_stops_the_loop() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let credential_source = Arc::new(StaticCredentialSource::missing_key());
    let factory = Arc::new(RecordingSessionFactory::new(Arc::clone(&log)));

    let sim = simulator(
        "trackThing01",
        Arc::clone(&credential_source),
        Arc::clone(&factory),
        vec![LocationSample { lat: 35.0, long: 139.0 }],
        Duration::from_secs(1),
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(sim.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    shutdown.cancel();
    handle.await.unwrap();

    // Nothing published, no session built.
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(factory.connects.load(Ordering::SeqCst), 0);

    // The loop ticked on schedule: each tick retried the full resolution
    // path, and the failed fetch was never cached.
    assert_eq!(credential_source.calls.load(Ordering::SeqCst), 3);
}

// Scenario C: a stalled device never delays another device's schedule.
#[tokio::test(start_paused = true)]
async fn test_devices_run_on_independent_schedules() {
    let slow_log = Arc::new(Mutex::new(Vec::new()));
    let fast_log = Arc::new(Mutex::new(Vec::new()));

    let slow_factory = Arc::new(
        RecordingSessionFactory::new(Arc::clone(&slow_log))
            .with_publish_delay(Duration::from_secs(5)),
    );
    let fast_factory = Arc::new(RecordingSessionFactory::new(Arc::clone(&fast_log)));

    let slow = simulator(
        "trackThing01",
        Arc::new(StaticCredentialSource::ok()),
        slow_factory,
        vec![LocationSample { lat: 35.0, long: 139.0 }],
        Duration::from_secs(1),
    );
    let fast = simulator(
        "trackThing02",
        Arc::new(StaticCredentialSource::ok()),
        fast_factory,
        vec![
            LocationSample { lat: 35.68, long: 139.74 },
            LocationSample { lat: 35.67, long: 139.75 },
        ],
        Duration::from_secs(1),
    );

    let shutdown = CancellationToken::new();
    let slow_handle = tokio::spawn(slow.run(shutdown.clone()));
    let fast_handle = tokio::spawn(fast.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(3500)).await;
    shutdown.cancel();
    slow_handle.await.unwrap();
    fast_handle.await.unwrap();

    // The fast device ticked at t=0..3s even though the slow device spent
    // the whole window inside a single stalled publish.
    assert_eq!(fast_log.lock().unwrap().len(), 4);
    assert!(slow_log.lock().unwrap().len() <= 1);
}
