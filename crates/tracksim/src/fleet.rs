use crate::config::ServiceConfig;
use anyhow::Context;
use serde::Deserialize;
use tracksim_domain::{DeviceIdentity, LocationSample, Route};

/// Fleet description as read from a fleet file.
#[derive(Debug, Deserialize)]
pub struct FleetSpec {
    pub devices: Vec<DeviceSpec>,
}

/// One device entry. Topic and secret fall back to the service-wide values.
#[derive(Debug, Deserialize)]
pub struct DeviceSpec {
    pub client_id: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub secret_id: Option<String>,
    pub route: Vec<LocationSample>,
}

/// A fully wired device: identity plus the route it drives.
pub struct FleetDevice {
    pub identity: DeviceIdentity,
    pub route: Route,
}

/// Load the fleet from the configured file, or fall back to the built-in
/// demo fleet.
pub fn load_fleet(config: &ServiceConfig) -> anyhow::Result<Vec<FleetDevice>> {
    let spec = match &config.fleet_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read fleet file {path}"))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse fleet file {path}"))?
        }
        None => default_fleet_spec(),
    };

    build_devices(spec, config)
}

fn build_devices(spec: FleetSpec, config: &ServiceConfig) -> anyhow::Result<Vec<FleetDevice>> {
    spec.devices
        .into_iter()
        .map(|device| {
            let route = Route::new(device.route)
                .with_context(|| format!("invalid route for device {}", device.client_id))?;
            let identity = DeviceIdentity {
                client_id: device.client_id,
                topic: device.topic.unwrap_or_else(|| config.topic.clone()),
                secret_reference: device.secret_id.unwrap_or_else(|| config.secret_id.clone()),
                region: config.region.clone(),
            };
            Ok(FleetDevice { identity, route })
        })
        .collect()
}

/// Two trackers driving closed loops through central Tokyo.
fn default_fleet_spec() -> FleetSpec {
    FleetSpec {
        devices: vec![
            DeviceSpec {
                client_id: "trackThing01".to_string(),
                topic: None,
                secret_id: None,
                route: vec![
                    LocationSample { lat: 35.68439798361399, long: 139.76044559362055 },
                    LocationSample { lat: 35.68724549485117, long: 139.7614681195722 },
                    LocationSample { lat: 35.68954715881722, long: 139.760533238701 },
                    LocationSample { lat: 35.690686101989755, long: 139.75682293024414 },
                    LocationSample { lat: 35.690448823503246, long: 139.7532294818938 },
                ],
            },
            DeviceSpec {
                client_id: "trackThing02".to_string(),
                topic: None,
                secret_id: None,
                route: vec![
                    LocationSample { lat: 35.68325895066084, long: 139.74420203848132 },
                    LocationSample { lat: 35.68050622055614, long: 139.745429069625 },
                    LocationSample { lat: 35.679034894831545, long: 139.74764941169434 },
                    LocationSample { lat: 35.67753981025764, long: 139.74934388327358 },
                    LocationSample { lat: 35.67761100539637, long: 139.75284968654103 },
                    LocationSample { lat: 35.677041442508354, long: 139.75518688871932 },
                    LocationSample { lat: 35.6783466847769, long: 139.75688136029856 },
                    LocationSample { lat: 35.68067233627224, long: 139.7582544665771 },
                    LocationSample { lat: 35.68257077703808, long: 139.75951071274915 },
                    LocationSample { lat: 35.68439798361399, long: 139.76044559362055 },
                    LocationSample { lat: 35.68724549485117, long: 139.7614681195722 },
                ],
            },
        ],
    }
}
