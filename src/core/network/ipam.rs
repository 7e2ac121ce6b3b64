use std::{collections::HashSet, fmt, net::IpAddr};

use ipnet::IpNet;
use log::warn;

use crate::core::{
    engine::NetworkSummary,
    error::{DriverError, DriverResult},
};

/// Networks of a set of interface addresses, host bits zeroed.
pub fn networks_of(addrs: &[IpNet]) -> HashSet<IpNet> {
    addrs.iter().map(IpNet::trunc).collect()
}

/// Subnets claimed by engine networks that belong to any driver but `driver_name`.
///
/// Subnets the engine reports in a form we cannot parse are skipped.
pub fn reserved_subnets(networks: &[NetworkSummary], driver_name: &str) -> HashSet<IpNet> {
    networks
        .iter()
        .filter(|net| net.driver != driver_name)
        .flat_map(|net| net.subnets.iter())
        .filter_map(|subnet| match subnet.parse::<IpNet>() {
            Ok(net) => Some(net.trunc()),
            Err(e) => {
                warn!("Ignoring unparsable subnet {subnet:?}: {e}");
                None
            }
        })
        .collect()
}

/// Whether two networks share any address.
pub fn overlaps(a: &IpNet, b: &IpNet) -> bool {
    a.contains(b) || b.contains(a)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

impl Family {
    fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            Family::V4 => ip.is_ipv4(),
            Family::V6 => ip.is_ipv6(),
        }
    }
}

/// Parses an `address/prefix` of the expected family. A bare address is a host route.
pub fn parse_interface(addr: &str, family: Family) -> DriverResult<IpNet> {
    let net = match addr.parse::<IpNet>() {
        Ok(net) => net,
        Err(e) => {
            let ip = addr.parse::<IpAddr>().map_err(|_| {
                DriverError::validation(format!("Invalid address {addr}: {e}"))
            })?;
            let host_len = if ip.is_ipv4() { 32 } else { 128 };
            IpNet::new(ip, host_len)
                .map_err(|e| DriverError::validation(format!("Invalid address {addr}: {e}")))?
        }
    };

    if !family.matches(&net.addr()) {
        return Err(DriverError::validation(format!(
            "Address {addr} is not an {family} address"
        )));
    }

    Ok(net)
}

/// Rejects `addr` if its IP is already assigned to the bridge, whatever the prefix.
pub fn check_free(addr: &IpNet, bridge_name: &str, bridge_addrs: &[IpNet]) -> DriverResult<()> {
    if bridge_addrs.iter().any(|b| b.addr() == addr.addr()) {
        return Err(DriverError::validation(format!(
            "Address {addr} is already in use on bridge {bridge_name}"
        )));
    }

    Ok(())
}
