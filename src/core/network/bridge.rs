use std::collections::{HashMap, HashSet};

use ipnet::IpNet;

use super::{
    ipam::{networks_of, overlaps, reserved_subnets},
    netlink::{Link, LinkKind},
    Driver,
};
use crate::core::error::DriverResult;

/// A host bridge as read from the kernel for the duration of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Bridge {
    pub link: Link,
    pub addresses: Vec<IpNet>,
}

impl Bridge {
    pub fn name(&self) -> &str {
        &self.link.name
    }

    pub fn networks(&self) -> HashSet<IpNet> {
        networks_of(&self.addresses)
    }
}

impl Driver {
    /// Bridges this driver may bind to, keyed by interface name.
    ///
    /// A bridge is eligible when none of its networks overlaps a subnet claimed by a
    /// network of another driver.
    pub async fn list_eligible_bridges(&self) -> DriverResult<HashMap<String, Bridge>> {
        let networks = self.engine.list_networks().await?;
        let reserved = reserved_subnets(&networks, &self.driver_name);

        let mut bridges = HashMap::new();
        for link in self.netlink.links().await? {
            if link.kind != LinkKind::Bridge {
                continue;
            }

            let bridge = self.read_bridge(link).await?;
            let claimed = bridge
                .networks()
                .iter()
                .any(|net| reserved.iter().any(|r| overlaps(net, r)));
            if !claimed {
                bridges.insert(bridge.name().to_string(), bridge);
            }
        }

        Ok(bridges)
    }

    pub(super) async fn read_bridge(&self, link: Link) -> DriverResult<Bridge> {
        let addresses = self.netlink.addresses(&link).await?;
        Ok(Bridge { link, addresses })
    }
}
