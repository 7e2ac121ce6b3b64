use ipnet::IpNet;
use log::{error, info};

use super::{
    bridge::Bridge,
    ipam::{check_free, parse_interface, Family},
    veth_pair, Driver,
};
use crate::core::{
    error::{DriverError, DriverResult},
    msg::{EndpointInterface, EndpointOperInfo, HostInterface, InterfaceInfo},
};

/// Addresses the engine asked for, checked against the bridge but never assigned by us.
#[derive(Debug, PartialEq)]
struct RequestedAddrs {
    v4: IpNet,
    v6: Option<IpNet>,
}

impl RequestedAddrs {
    fn validate(iface: &EndpointInterface, bridge: &Bridge) -> DriverResult<Self> {
        let v4 = match iface.address() {
            Some(addr) => parse_interface(addr, Family::V4)?,
            None => return Err(DriverError::validation("DHCPv4 is currently unsupported")),
        };
        check_free(&v4, bridge.name(), &bridge.addresses)?;

        let v6 = match iface.address_ipv6() {
            Some(addr) => {
                let v6 = parse_interface(addr, Family::V6)?;
                check_free(&v6, bridge.name(), &bridge.addresses)?;
                Some(v6)
            }
            None => None,
        };

        Ok(Self { v4, v6 })
    }
}

impl Driver {
    /// Creates the endpoint's veth pair and plugs its host side into the network's bridge.
    ///
    /// On any failure once the pair exists, the host side is removed again (taking its
    /// peer with it) before the error is returned.
    pub async fn create_endpoint(
        &self,
        network_id: &str,
        endpoint_id: &str,
        iface: &EndpointInterface,
    ) -> DriverResult<InterfaceInfo> {
        let (if_host, if_container) = veth_pair(endpoint_id);
        let network_id = network_id.to_string();
        let iface = iface.clone();

        let result = self
            .with_endpoint_lock(if_host.clone(), move |driver| async move {
                driver
                    .create_veth_endpoint(&network_id, &if_host, &if_container, &iface)
                    .await
            })
            .await;

        if let Err(e) = &result {
            error!("Failed to create endpoint {endpoint_id}: {e}");
        }
        result
    }

    async fn create_veth_endpoint(
        &self,
        network_id: &str,
        if_host: &str,
        if_container: &str,
        iface: &EndpointInterface,
    ) -> DriverResult<InterfaceInfo> {
        let bridge = self.resolve_bridge(network_id).await?;
        let addrs = RequestedAddrs::validate(iface, &bridge)?;

        info!("Creating veth pair {if_host} <=> {if_container}");
        self.netlink.create_veth(if_host, if_container).await?;

        match self
            .plug_endpoint(&bridge, if_host, if_container, iface)
            .await
        {
            Ok(info) => {
                info!(
                    "Endpoint {if_container} ready on bridge {} (v4 {}, v6 {:?})",
                    bridge.name(),
                    addrs.v4,
                    addrs.v6
                );
                Ok(info)
            }
            Err(e) => {
                if let Err(rollback) = self.netlink.remove(if_host).await {
                    error!("Failed to remove {if_host} while rolling back: {rollback}");
                }
                Err(e)
            }
        }
    }

    async fn plug_endpoint(
        &self,
        bridge: &Bridge,
        if_host: &str,
        if_container: &str,
        iface: &EndpointInterface,
    ) -> DriverResult<InterfaceInfo> {
        self.netlink.set_up(if_host).await?;
        self.netlink.set_up(if_container).await?;

        let mut res = InterfaceInfo::default();
        if iface.mac_address().is_none() {
            let container = self.netlink.link(if_container).await?;
            res.mac_address = container.mac.ok_or_else(|| {
                DriverError::unexpected(&format!("{if_container} has no MAC address"), None)
            })?;
        }

        self.netlink.add_port(&bridge.link, if_host).await?;

        Ok(res)
    }

    /// Unplugs the host side from the bridge and removes the pair.
    ///
    /// Not idempotent: deleting an endpoint whose interface is already gone fails.
    pub async fn delete_endpoint(&self, network_id: &str, endpoint_id: &str) -> DriverResult<()> {
        let (if_host, _) = veth_pair(endpoint_id);
        let port = if_host.clone();
        let network_id = network_id.to_string();

        let result = self
            .with_endpoint_lock(if_host.clone(), move |driver| async move {
                let bridge = driver.resolve_bridge(&network_id).await?;
                driver.netlink.del_port(&bridge.link, &port).await?;
                driver.netlink.remove(&port).await
            })
            .await;

        if result.is_ok() {
            info!("Removed endpoint {if_host}");
        }
        result
    }

    pub async fn endpoint_info(
        &self,
        network_id: &str,
        endpoint_id: &str,
    ) -> DriverResult<EndpointOperInfo> {
        let bridge = self.resolve_bridge(network_id).await?;
        let (if_host, _) = veth_pair(endpoint_id);
        let host = self.netlink.link(&if_host).await?;

        Ok(EndpointOperInfo {
            bridge: bridge.name().to_string(),
            if_host: HostInterface {
                name: host.name,
                mac: host.mac.unwrap_or_default(),
            },
        })
    }
}
