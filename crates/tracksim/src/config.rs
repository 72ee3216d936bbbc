use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracksim_domain::FailurePolicy;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Region that locates both the secret store and the broker
    #[serde(default = "default_region")]
    pub region: String,

    /// Topic all location updates are published on
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Secret holding the device certificate and key
    #[serde(default = "default_secret_id")]
    pub secret_id: String,

    /// Seconds between publishes for every device
    #[serde(default = "default_publish_interval_secs")]
    pub publish_interval_secs: u64,

    /// MQTT keep-alive in seconds
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// MQTT handshake timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Port used when the resolved endpoint address does not carry one
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,

    /// Publish attempts per tick; 1 means swallow-and-log without retry
    #[serde(default = "default_max_publish_attempts")]
    pub max_publish_attempts: u32,

    /// Delay between publish attempts within one tick, in milliseconds
    #[serde(default = "default_publish_retry_delay_ms")]
    pub publish_retry_delay_ms: u64,

    /// Optional JSON file describing the fleet; the built-in demo fleet is
    /// used when unset
    #[serde(default)]
    pub fleet_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_region() -> String {
    "ap-northeast-1".to_string()
}

fn default_topic() -> String {
    "iot/location".to_string()
}

fn default_secret_id() -> String {
    "iot-cert-and-key".to_string()
}

fn default_publish_interval_secs() -> u64 {
    2
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_mqtt_port() -> u16 {
    8883
}

fn default_max_publish_attempts() -> u32 {
    1
}

fn default_publish_retry_delay_ms() -> u64 {
    500
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("TRACKSIM"))
            .build()?
            .try_deserialize()
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.max_publish_attempts > 1 {
            FailurePolicy::BoundedRetry {
                max_attempts: self.max_publish_attempts,
                delay: Duration::from_millis(self.publish_retry_delay_ms),
            }
        } else {
            FailurePolicy::SwallowAndLog
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::remove_var("TRACKSIM_REGION");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.region, "ap-northeast-1");
        assert_eq!(config.topic, "iot/location");
        assert_eq!(config.secret_id, "iot-cert-and-key");
        assert_eq!(config.publish_interval_secs, 2);
        assert_eq!(config.failure_policy(), FailurePolicy::SwallowAndLog);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("TRACKSIM_REGION", "us-west-2");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.region, "us-west-2");

        std::env::remove_var("TRACKSIM_REGION");
    }

    #[test]
    fn test_retry_policy_from_attempts() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("TRACKSIM_MAX_PUBLISH_ATTEMPTS", "3");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(
            config.failure_policy(),
            FailurePolicy::BoundedRetry {
                max_attempts: 3,
                delay: Duration::from_millis(500),
            }
        );

        std::env::remove_var("TRACKSIM_MAX_PUBLISH_ATTEMPTS");
    }
}
