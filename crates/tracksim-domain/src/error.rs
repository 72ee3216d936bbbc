use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Credential fetch failed: {0}")]
    CredentialFetch(String),

    #[error("Endpoint resolution failed: {0}")]
    EndpointResolution(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
