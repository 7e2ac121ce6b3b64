use log::info;

use super::{bridge::Bridge, Driver};
use crate::core::{
    error::{DriverError, DriverResult},
    msg::{CreateNetworkRequest, OPT_BRIDGE},
};

impl Driver {
    /// Validates the bridge binding of a new network.
    ///
    /// Nothing is written to the kernel: the engine stores the options and later calls
    /// find the bridge again through `resolve_bridge`.
    pub async fn create_network(&self, req: &CreateNetworkRequest) -> DriverResult<()> {
        let desired = req
            .bridge()
            .ok_or_else(|| DriverError::validation("No bridge provided"))?;

        let bridges = self.list_eligible_bridges().await?;
        if !bridges.contains_key(desired) {
            return Err(DriverError::validation(format!(
                "Bridge \"{desired}\" not found (or the specified bridge is already used by Docker)"
            )));
        }

        info!(
            "Creating network \"{}\" (using bridge \"{desired}\")",
            req.network_id
        );
        Ok(())
    }

    pub async fn delete_network(&self, network_id: &str) -> DriverResult<()> {
        info!("Deleting network \"{network_id}\"");
        Ok(())
    }

    /// The live bridge a network is bound to, looked up through the engine's stored options.
    ///
    /// Eligibility is not checked again; it was settled when the network was created.
    pub async fn resolve_bridge(&self, network_id: &str) -> DriverResult<Bridge> {
        let options = self.engine.network_options(network_id).await?;
        let name = options.get(OPT_BRIDGE).ok_or_else(|| {
            DriverError::not_found(format!("Network {network_id} has no bridge option"))
        })?;

        let link = self.netlink.link(name).await?;
        self.read_bridge(link).await
    }
}
