pub mod session;
pub mod tls;

pub use session::{MqttSettings, RumqttcSessionFactory};
pub use tls::build_tls_config;
