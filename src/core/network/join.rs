use log::{debug, info};

use super::{
    netlink::{Route, RouteFamily},
    veth_pair, Driver,
};
use crate::core::{
    error::DriverResult,
    msg::{InterfaceName, JoinInfo, StaticRoute, ROUTE_TYPE_NEXT_HOP},
};

impl Driver {
    /// Names the container side interface and hands over the bridge's IPv4 routing.
    pub async fn join(&self, network_id: &str, endpoint_id: &str) -> DriverResult<JoinInfo> {
        let bridge = self.resolve_bridge(network_id).await?;
        let (_, if_container) = veth_pair(endpoint_id);
        let routes = self.netlink.routes(&bridge.link).await?;

        let (gateway, static_routes) = routing_info(&routes);
        let res = JoinInfo {
            interface_name: InterfaceName {
                src_name: if_container,
                dst_prefix: bridge.name().to_string(),
            },
            gateway,
            static_routes,
        };

        info!("Join of {endpoint_id} on {}: {res:?}", bridge.name());
        Ok(res)
    }

    pub async fn leave(&self, network_id: &str, endpoint_id: &str) -> DriverResult<()> {
        debug!("Endpoint {endpoint_id} leaving network {network_id}");
        Ok(())
    }
}

/// Default gateway and static routes from a bridge's routing table.
///
/// Only IPv4 unicast routes count. The first default route with a gateway provides
/// it; any further default routes are ignored.
fn routing_info(routes: &[Route]) -> (Option<String>, Vec<StaticRoute>) {
    let mut gateway = None;
    let mut static_routes = Vec::new();

    for route in routes {
        // IPv6 routing is not handed over
        if !route.unicast || route.family != RouteFamily::V4 {
            continue;
        }

        let Some(next_hop) = route.gateway else {
            continue;
        };

        match route.destination {
            None if route.prefix_len == 0 => {
                if gateway.is_none() {
                    gateway = Some(next_hop.to_string());
                }
            }
            Some(dst) => static_routes.push(StaticRoute {
                destination: format!("{dst}/{}", route.prefix_len),
                route_type: ROUTE_TYPE_NEXT_HOP,
                next_hop: next_hop.to_string(),
            }),
            None => {}
        }
    }

    (gateway, static_routes)
}
