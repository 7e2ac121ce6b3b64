use std::net::IpAddr;

use async_trait::async_trait;
use futures::TryStreamExt;
use ipnet::IpNet;
use log::debug;
use netlink_packet_route::{
    address::AddressAttribute,
    link::{InfoKind, LinkAttribute, LinkInfo, LinkMessage},
    route::{RouteAddress, RouteAttribute, RouteMessage, RouteType},
    AddressFamily,
};
use nix::errno::Errno;
use rtnetlink::{Handle, IpVersion};

use crate::core::error::{DriverError, DriverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Bridge,
    Veth,
    Other,
}

/// Snapshot of a kernel interface.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub index: u32,
    pub name: String,
    pub kind: LinkKind,
    pub mac: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFamily {
    V4,
    V6,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub family: RouteFamily,
    pub unicast: bool,
    /// `None` for the default route.
    pub destination: Option<IpAddr>,
    pub prefix_len: u8,
    pub gateway: Option<IpAddr>,
}

/// Host network state as this driver needs it.
///
/// Every mutating call is one netlink request, committed by the kernel as a unit.
#[async_trait]
pub trait Netlink: Send + Sync {
    async fn links(&self) -> DriverResult<Vec<Link>>;

    /// Fails with `NotFound` when no interface has this name.
    async fn link(&self, name: &str) -> DriverResult<Link>;

    async fn addresses(&self, link: &Link) -> DriverResult<Vec<IpNet>>;

    /// IPv4 and IPv6 routes leaving through `link`.
    async fn routes(&self, link: &Link) -> DriverResult<Vec<Route>>;

    async fn create_veth(&self, name: &str, peer: &str) -> DriverResult<()>;

    async fn set_up(&self, name: &str) -> DriverResult<()>;

    async fn add_port(&self, bridge: &Link, port: &str) -> DriverResult<()>;

    async fn del_port(&self, bridge: &Link, port: &str) -> DriverResult<()>;

    /// Removing one end of a veth pair destroys its peer too.
    async fn remove(&self, name: &str) -> DriverResult<()>;
}

/// `Netlink` over a single rtnetlink session shared by all requests.
#[derive(Clone)]
pub struct RtNetlink {
    handle: Handle,
}

impl RtNetlink {
    /// Opens the session and spawns its connection task. Must run inside a tokio runtime.
    pub fn connect() -> DriverResult<Self> {
        let (connection, handle, _) = rtnetlink::new_connection().map_err(|e| {
            DriverError::unexpected("Failed to open netlink connection", Some(Box::new(e)))
        })?;
        tokio::spawn(connection);

        Ok(Self { handle })
    }

    async fn get_link_by_name(&self, name: &str) -> DriverResult<LinkMessage> {
        let result = self
            .handle
            .link()
            .get()
            .match_name(name.to_string())
            .execute()
            .try_next()
            .await;

        match result {
            Ok(Some(link)) => Ok(link),
            Ok(None) => Err(DriverError::not_found(format!("Link {name} not found"))),
            Err(rtnetlink::Error::NetlinkError(e)) if e.raw_code() == -(Errno::ENODEV as i32) => {
                Err(DriverError::not_found(format!("Link {name} not found")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn dump_routes(&self, version: IpVersion, index: u32) -> DriverResult<Vec<Route>> {
        let mut stream = self.handle.route().get(version).execute();
        let mut routes = Vec::new();

        while let Some(route) = stream.try_next().await? {
            let leaves_link = route
                .attributes
                .iter()
                .any(|attr| matches!(attr, RouteAttribute::Oif(idx) if *idx == index));

            if leaves_link {
                routes.push(route_from_message(&route));
            }
        }

        Ok(routes)
    }
}

#[async_trait]
impl Netlink for RtNetlink {
    async fn links(&self) -> DriverResult<Vec<Link>> {
        let links: Vec<LinkMessage> = self.handle.link().get().execute().try_collect().await?;

        Ok(links.iter().map(link_from_message).collect())
    }

    async fn link(&self, name: &str) -> DriverResult<Link> {
        let msg = self.get_link_by_name(name).await?;
        Ok(link_from_message(&msg))
    }

    async fn addresses(&self, link: &Link) -> DriverResult<Vec<IpNet>> {
        let mut stream = self
            .handle
            .address()
            .get()
            .set_link_index_filter(link.index)
            .execute();
        let mut addrs = Vec::new();

        while let Some(msg) = stream.try_next().await? {
            let prefix_len = msg.header.prefix_len;
            for attr in &msg.attributes {
                if let AddressAttribute::Address(ip) = attr {
                    if let Ok(net) = IpNet::new(*ip, prefix_len) {
                        addrs.push(net);
                    }
                }
            }
        }

        Ok(addrs)
    }

    async fn routes(&self, link: &Link) -> DriverResult<Vec<Route>> {
        let mut routes = self.dump_routes(IpVersion::V4, link.index).await?;
        routes.extend(self.dump_routes(IpVersion::V6, link.index).await?);

        Ok(routes)
    }

    async fn create_veth(&self, name: &str, peer: &str) -> DriverResult<()> {
        debug!("Creating veth pair {name} <=> {peer}");
        self.handle
            .link()
            .add()
            .veth(name.to_string(), peer.to_string())
            .execute()
            .await?;

        Ok(())
    }

    async fn set_up(&self, name: &str) -> DriverResult<()> {
        let link = self.get_link_by_name(name).await?;
        self.handle.link().set(link.header.index).up().execute().await?;

        Ok(())
    }

    async fn add_port(&self, bridge: &Link, port: &str) -> DriverResult<()> {
        let port_link = self.get_link_by_name(port).await?;
        self.handle
            .link()
            .set(port_link.header.index)
            .controller(bridge.index)
            .execute()
            .await?;

        Ok(())
    }

    async fn del_port(&self, bridge: &Link, port: &str) -> DriverResult<()> {
        let port_link = self.get_link_by_name(port).await?;
        debug!("Detaching {port} from bridge {}", bridge.name);
        self.handle
            .link()
            .set(port_link.header.index)
            .nocontroller()
            .execute()
            .await?;

        Ok(())
    }

    async fn remove(&self, name: &str) -> DriverResult<()> {
        let link = self.get_link_by_name(name).await?;
        self.handle.link().del(link.header.index).execute().await?;

        Ok(())
    }
}

fn link_from_message(msg: &LinkMessage) -> Link {
    let mut name = String::new();
    let mut kind = LinkKind::Other;
    let mut mac = None;

    for attr in &msg.attributes {
        match attr {
            LinkAttribute::IfName(n) => name = n.clone(),
            LinkAttribute::Address(bytes) => mac = Some(format_mac(bytes)),
            LinkAttribute::LinkInfo(infos) => {
                for info in infos {
                    match info {
                        LinkInfo::Kind(InfoKind::Bridge) => kind = LinkKind::Bridge,
                        LinkInfo::Kind(InfoKind::Veth) => kind = LinkKind::Veth,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    Link {
        index: msg.header.index,
        name,
        kind,
        mac,
    }
}

fn route_from_message(msg: &RouteMessage) -> Route {
    let family = match msg.header.address_family {
        AddressFamily::Inet => RouteFamily::V4,
        AddressFamily::Inet6 => RouteFamily::V6,
        _ => RouteFamily::Other,
    };

    let mut destination = None;
    let mut gateway = None;
    for attr in &msg.attributes {
        match attr {
            RouteAttribute::Destination(addr) => destination = route_address(addr),
            RouteAttribute::Gateway(addr) => gateway = route_address(addr),
            _ => {}
        }
    }

    Route {
        family,
        unicast: msg.header.kind == RouteType::Unicast,
        destination,
        prefix_len: msg.header.destination_prefix_length,
        gateway,
    }
}

fn route_address(addr: &RouteAddress) -> Option<IpAddr> {
    match addr {
        RouteAddress::Inet(v4) => Some(IpAddr::V4(*v4)),
        RouteAddress::Inet6(v6) => Some(IpAddr::V6(*v6)),
        _ => None,
    }
}

pub(crate) fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
