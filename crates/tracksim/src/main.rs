mod config;
mod fleet;
mod telemetry;

use crate::config::ServiceConfig;
use crate::fleet::FleetDevice;
use crate::telemetry::{init_telemetry, TelemetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracksim_aws::{IotEndpointSource, SecretsManagerCredentialSource};
use tracksim_domain::{
    ConnectionManager, CredentialSource, CredentialStore, EndpointResolver, EndpointSource,
    PublishPipeline, RouteSimulator, SessionFactory, SessionSettings,
};
use tracksim_mqtt::{MqttSettings, RumqttcSessionFactory};
use tracksim_runner::Runner;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
    });

    info!(
        region = %config.region,
        topic = %config.topic,
        interval_secs = config.publish_interval_secs,
        "starting tracksim"
    );
    debug!("Configuration: {:?}", config);

    let devices = match fleet::load_fleet(&config) {
        Ok(devices) => devices,
        Err(e) => {
            error!(error = %format!("{e:#}"), "failed to load fleet");
            std::process::exit(1);
        }
    };

    // Stateless adapters are shared; every per-device cache and session is
    // owned exclusively by that device's task.
    let credential_source: Arc<dyn CredentialSource> =
        Arc::new(SecretsManagerCredentialSource::new());
    let endpoint_source: Arc<dyn EndpointSource> = Arc::new(IotEndpointSource::new());
    let session_factory: Arc<dyn SessionFactory> =
        Arc::new(RumqttcSessionFactory::new(MqttSettings {
            port: config.mqtt_port,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            ..MqttSettings::default()
        }));

    let mut runner = Runner::new();
    for FleetDevice { identity, route } in devices {
        let process_name = identity.client_id.clone();
        info!(
            client_id = %identity.client_id,
            samples = route.len(),
            "wiring simulated device"
        );

        let connection = ConnectionManager::new(
            identity,
            CredentialStore::new(Arc::clone(&credential_source)),
            EndpointResolver::new(Arc::clone(&endpoint_source)),
            Arc::clone(&session_factory),
            SessionSettings {
                keep_alive: Duration::from_secs(config.keep_alive_secs),
                ..SessionSettings::default()
            },
        );
        let pipeline = PublishPipeline::new(connection).with_policy(config.failure_policy());
        let simulator = RouteSimulator::new(pipeline, route, config.publish_interval());

        runner = runner.with_named_process(process_name, move |token| async move {
            simulator.run(token).await;
            Ok(())
        });
    }

    if let Err(err) = runner.run().await {
        error!(error = %format!("{err:#}"), "exiting with error");
        std::process::exit(1);
    }
}
