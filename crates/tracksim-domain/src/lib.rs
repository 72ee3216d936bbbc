pub mod connection_manager;
pub mod credential_store;
pub mod endpoint_resolver;
pub mod error;
pub mod publish_pipeline;
pub mod route_simulator;
pub mod session;
pub mod types;

pub use connection_manager::{ConnectionManager, ConnectionState, SessionSettings};
pub use credential_store::{CredentialSource, CredentialStore};
pub use endpoint_resolver::{EndpointResolver, EndpointSource};
pub use error::{DomainError, DomainResult};
pub use publish_pipeline::{FailurePolicy, PublishPipeline};
pub use route_simulator::RouteSimulator;
pub use session::{DeviceSession, SessionFactory};
pub use types::{
    BrokerEndpoint, CredentialMaterial, DeviceIdentity, LocationEvent, LocationSample,
    QualityOfService, Route, SessionConfig,
};

#[cfg(any(test, feature = "testing"))]
pub use credential_store::MockCredentialSource;
#[cfg(any(test, feature = "testing"))]
pub use endpoint_resolver::MockEndpointSource;
#[cfg(any(test, feature = "testing"))]
pub use session::{MockDeviceSession, MockSessionFactory};
