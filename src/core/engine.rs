use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    errors::Error as DockerError,
    network::{InspectNetworkOptions, ListNetworksOptions},
    Docker, API_DEFAULT_VERSION,
};

use super::error::{DriverError, DriverResult};

const DOCKER_TIMEOUT_SECS: u64 = 120;

/// What the engine knows about one of its networks.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSummary {
    pub driver: String,
    pub subnets: Vec<String>,
}

/// Container engine queries the driver depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Engine: Send + Sync {
    async fn list_networks(&self) -> DriverResult<Vec<NetworkSummary>>;

    /// Options the network was created with. `NotFound` if the engine has no such network.
    async fn network_options(&self, network_id: &str) -> DriverResult<HashMap<String, String>>;
}

pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn connect(socket: Option<&str>) -> DriverResult<Self> {
        let docker = match socket {
            Some(path) => Docker::connect_with_unix(path, DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION),
            None => Docker::connect_with_unix_defaults(),
        }?;

        Ok(Self { docker })
    }
}

#[async_trait]
impl Engine for DockerEngine {
    async fn list_networks(&self) -> DriverResult<Vec<NetworkSummary>> {
        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await?;

        Ok(networks
            .into_iter()
            .map(|net| NetworkSummary {
                driver: net.driver.unwrap_or_default(),
                subnets: net
                    .ipam
                    .and_then(|ipam| ipam.config)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|config| config.subnet)
                    .collect(),
            })
            .collect())
    }

    async fn network_options(&self, network_id: &str) -> DriverResult<HashMap<String, String>> {
        match self
            .docker
            .inspect_network(network_id, None::<InspectNetworkOptions<String>>)
            .await
        {
            Ok(network) => Ok(network.options.unwrap_or_default()),
            Err(DockerError::DockerResponseServerError {
                status_code: 404,
                message,
            }) => Err(DriverError::not_found(format!(
                "Network {network_id} not found: {message}"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
