pub mod iot_endpoint;
pub mod secrets;

pub use iot_endpoint::IotEndpointSource;
pub use secrets::SecretsManagerCredentialSource;
