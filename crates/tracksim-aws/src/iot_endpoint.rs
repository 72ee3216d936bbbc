use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_iot::error::DisplayErrorContext;
use tracing::debug;
use tracksim_domain::{BrokerEndpoint, DomainError, DomainResult, EndpointSource};

/// Endpoint class for the data-plane ATS endpoint.
const ENDPOINT_TYPE: &str = "iot:Data-ATS";

/// [`EndpointSource`] backed by the IoT `DescribeEndpoint` API.
pub struct IotEndpointSource;

impl IotEndpointSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IotEndpointSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointSource for IotEndpointSource {
    async fn resolve_endpoint(&self, region: &str) -> DomainResult<BrokerEndpoint> {
        debug!(region = %region, endpoint_type = ENDPOINT_TYPE, "describing broker endpoint");

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let client = aws_sdk_iot::Client::new(&sdk_config);

        let response = client
            .describe_endpoint()
            .endpoint_type(ENDPOINT_TYPE)
            .send()
            .await
            .map_err(|err| {
                DomainError::EndpointResolution(format!("{}", DisplayErrorContext(&err)))
            })?;

        match response.endpoint_address() {
            Some(address) if !address.is_empty() => Ok(BrokerEndpoint {
                address: address.to_string(),
            }),
            _ => Err(DomainError::EndpointResolution(
                "describe endpoint returned no address".to_string(),
            )),
        }
    }
}
