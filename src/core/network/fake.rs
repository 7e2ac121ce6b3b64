//! In-memory `Netlink` used by the driver tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use ipnet::IpNet;
use tokio::sync::Notify;

use super::netlink::{format_mac, Link, LinkKind, Netlink, Route};
use crate::core::error::{DriverError, DriverResult};

#[derive(Debug, Clone)]
struct FakeLink {
    link: Link,
    up: bool,
    peer: Option<String>,
    controller: Option<u32>,
    addresses: Vec<IpNet>,
    routes: Vec<Route>,
}

#[derive(Debug, Default)]
struct State {
    links: HashMap<String, FakeLink>,
    next_index: u32,
}

impl State {
    fn insert(&mut self, name: &str, kind: LinkKind) -> u32 {
        self.next_index += 1;
        let index = self.next_index;
        let mac = format_mac(&[0x02, 0, 0, 0, (index >> 8) as u8, index as u8]);

        self.links.insert(
            name.to_string(),
            FakeLink {
                link: Link {
                    index,
                    name: name.to_string(),
                    kind,
                    mac: Some(mac),
                },
                up: false,
                peer: None,
                controller: None,
                addresses: Vec::new(),
                routes: Vec::new(),
            },
        );
        index
    }

    fn get(&self, name: &str) -> DriverResult<&FakeLink> {
        self.links
            .get(name)
            .ok_or_else(|| DriverError::not_found(format!("Link {name} not found")))
    }

    fn get_mut(&mut self, name: &str) -> DriverResult<&mut FakeLink> {
        self.links
            .get_mut(name)
            .ok_or_else(|| DriverError::not_found(format!("Link {name} not found")))
    }
}

#[derive(Debug, Default)]
pub struct FakeNetlink {
    state: Mutex<State>,
    fail_add_port: Mutex<bool>,
    fail_remove: Mutex<bool>,
    attach_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeNetlink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bridge(&self, name: &str, addresses: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.insert(name, LinkKind::Bridge);

        let link = state.links.get_mut(name).unwrap();
        link.up = true;
        link.addresses = addresses.iter().map(|a| a.parse().unwrap()).collect();
    }

    pub fn add_route(&self, bridge: &str, route: Route) {
        let mut state = self.state.lock().unwrap();
        state.links.get_mut(bridge).unwrap().routes.push(route);
    }

    pub fn fail_add_port(&self) {
        *self.fail_add_port.lock().unwrap() = true;
    }

    pub fn fail_remove(&self) {
        *self.fail_remove.lock().unwrap() = true;
    }

    /// Makes `add_port` wait until the returned gate is notified.
    pub fn stall_add_port(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.attach_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().links.contains_key(name)
    }

    pub fn is_up(&self, name: &str) -> bool {
        self.state.lock().unwrap().links.get(name).is_some_and(|l| l.up)
    }

    pub fn mac_of(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.links.get(name).and_then(|l| l.link.mac.clone())
    }

    /// Names of the interfaces attached to `bridge`, sorted.
    pub fn ports(&self, bridge: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let Some(index) = state.links.get(bridge).map(|l| l.link.index) else {
            return Vec::new();
        };

        let mut ports: Vec<String> = state
            .links
            .values()
            .filter(|l| l.controller == Some(index))
            .map(|l| l.link.name.clone())
            .collect();
        ports.sort();
        ports
    }
}

#[async_trait]
impl Netlink for FakeNetlink {
    async fn links(&self) -> DriverResult<Vec<Link>> {
        let state = self.state.lock().unwrap();
        Ok(state.links.values().map(|l| l.link.clone()).collect())
    }

    async fn link(&self, name: &str) -> DriverResult<Link> {
        Ok(self.state.lock().unwrap().get(name)?.link.clone())
    }

    async fn addresses(&self, link: &Link) -> DriverResult<Vec<IpNet>> {
        Ok(self.state.lock().unwrap().get(&link.name)?.addresses.clone())
    }

    async fn routes(&self, link: &Link) -> DriverResult<Vec<Route>> {
        Ok(self.state.lock().unwrap().get(&link.name)?.routes.clone())
    }

    async fn create_veth(&self, name: &str, peer: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.links.contains_key(name) || state.links.contains_key(peer) {
            return Err(DriverError::unexpected("File exists", None));
        }

        state.insert(name, LinkKind::Veth);
        state.insert(peer, LinkKind::Veth);
        state.get_mut(name)?.peer = Some(peer.to_string());
        state.get_mut(peer)?.peer = Some(name.to_string());

        Ok(())
    }

    async fn set_up(&self, name: &str) -> DriverResult<()> {
        self.state.lock().unwrap().get_mut(name)?.up = true;
        Ok(())
    }

    async fn add_port(&self, bridge: &Link, port: &str) -> DriverResult<()> {
        let gate = self.attach_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let fail = *self.fail_add_port.lock().unwrap();
        if fail {
            return Err(DriverError::unexpected("Operation not permitted", None));
        }

        self.state.lock().unwrap().get_mut(port)?.controller = Some(bridge.index);
        Ok(())
    }

    async fn del_port(&self, _bridge: &Link, port: &str) -> DriverResult<()> {
        self.state.lock().unwrap().get_mut(port)?.controller = None;
        Ok(())
    }

    async fn remove(&self, name: &str) -> DriverResult<()> {
        if *self.fail_remove.lock().unwrap() {
            return Err(DriverError::unexpected("Device or resource busy", None));
        }

        let mut state = self.state.lock().unwrap();
        let removed = state
            .links
            .remove(name)
            .ok_or_else(|| DriverError::not_found(format!("Link {name} not found")))?;

        if let Some(peer) = removed.peer {
            state.links.remove(&peer);
        }

        Ok(())
    }
}
