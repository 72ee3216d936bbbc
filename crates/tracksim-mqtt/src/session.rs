use crate::tls::build_tls_config;
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS, Transport};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use tracksim_domain::{
    DeviceSession, DomainError, DomainResult, QualityOfService, SessionConfig, SessionFactory,
};

const DEFAULT_MQTT_TLS_PORT: u16 = 8883;

/// Transport-level settings shared by every session this factory builds.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    /// Port used when the resolved endpoint address does not carry one.
    pub port: u16,
    pub connect_timeout: Duration,
    /// Capacity of the request channel between client handle and event loop.
    pub channel_capacity: usize,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_MQTT_TLS_PORT,
            connect_timeout: Duration::from_secs(30),
            channel_capacity: 10,
        }
    }
}

/// [`SessionFactory`] backed by rumqttc over a rustls mutual-TLS transport.
pub struct RumqttcSessionFactory {
    settings: MqttSettings,
}

impl RumqttcSessionFactory {
    pub fn new(settings: MqttSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for RumqttcSessionFactory {
    async fn connect(&self, config: SessionConfig) -> DomainResult<Box<dyn DeviceSession>> {
        let (host, port) = parse_endpoint_address(&config.endpoint.address, self.settings.port)?;

        let mut options = MqttOptions::new(config.client_id.clone(), host, port);
        options.set_keep_alive(config.keep_alive);
        options.set_clean_session(config.clean_session);
        let tls = build_tls_config(&config.credentials)?;
        options.set_transport(Transport::tls_with_config(tls.into()));

        let (client, mut event_loop) = AsyncClient::new(options, self.settings.channel_capacity);

        // Drive the event loop until the broker acknowledges the connection.
        let handshake = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            return Ok(());
                        }
                        return Err(DomainError::Connection(format!(
                            "broker refused connection: {:?}",
                            ack.code
                        )));
                    }
                    Ok(_) => continue,
                    Err(err) => return Err(DomainError::Connection(err.to_string())),
                }
            }
        };
        match tokio::time::timeout(self.settings.connect_timeout, handshake).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(DomainError::Connection(format!(
                    "handshake timed out after {:?}",
                    self.settings.connect_timeout
                )))
            }
        }

        debug!(client_id = %config.client_id, "mqtt session established");

        // Keep polling in the background so outgoing publishes and keep-alive
        // pings are flushed. The loop stops on the first transport error:
        // reconnecting is the connection manager's decision, not the event
        // loop's built-in retry.
        let (health_tx, health_rx) = watch::channel(true);
        let client_id = config.client_id.clone();
        let driver = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(event) => trace!(client_id = %client_id, ?event, "mqtt event"),
                    Err(err) => {
                        warn!(
                            client_id = %client_id,
                            error = %err,
                            "mqtt event loop error, session is no longer usable"
                        );
                        let _ = health_tx.send(false);
                        break;
                    }
                }
            }
        });

        Ok(Box::new(RumqttcSession {
            client,
            health: health_rx,
            driver,
        }))
    }
}

/// One live rumqttc connection plus the task that drives its event loop.
pub struct RumqttcSession {
    client: AsyncClient,
    health: watch::Receiver<bool>,
    driver: JoinHandle<()>,
}

#[async_trait]
impl DeviceSession for RumqttcSession {
    async fn publish(
        &self,
        topic: &str,
        qos: QualityOfService,
        payload: Vec<u8>,
    ) -> DomainResult<()> {
        self.client
            .publish(topic, to_rumqttc_qos(qos), false, payload)
            .await
            .map_err(|err| DomainError::Publish(err.to_string()))
    }

    fn is_open(&self) -> bool {
        *self.health.borrow() && !self.driver.is_finished()
    }

    async fn close(&self) -> DomainResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|err| DomainError::Connection(err.to_string()))
    }
}

impl Drop for RumqttcSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

fn to_rumqttc_qos(qos: QualityOfService) -> QoS {
    match qos {
        QualityOfService::AtMostOnce => QoS::AtMostOnce,
        QualityOfService::AtLeastOnce => QoS::AtLeastOnce,
        QualityOfService::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Split a resolved endpoint address into host and port.
/// Addresses are bare hostnames or `host:port`.
fn parse_endpoint_address(address: &str, default_port: u16) -> DomainResult<(String, u16)> {
    if address.is_empty() {
        return Err(DomainError::InvalidConfig(
            "broker address is empty".to_string(),
        ));
    }

    let parts: Vec<&str> = address.split(':').collect();
    match parts.len() {
        1 => Ok((parts[0].to_string(), default_port)),
        2 => {
            let port = parts[1].parse::<u16>().map_err(|_| {
                DomainError::InvalidConfig(format!(
                    "invalid port in broker address: {}",
                    parts[1]
                ))
            })?;
            Ok((parts[0].to_string(), port))
        }
        _ => Err(DomainError::InvalidConfig(format!(
            "invalid broker address format: {}",
            address
        ))),
    }
}
