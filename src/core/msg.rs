use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::error::DriverError;

/// Docker nests driver options given with `-o` under this key.
pub const OPTS_KEY: &str = "com.docker.network.generic";
pub const OPT_BRIDGE: &str = "devplayer0.net-dhcp.bridge";

/// Route type the engine understands as "via next hop".
pub const ROUTE_TYPE_NEXT_HOP: u8 = 0;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct CreateNetworkRequest {
    #[serde(rename = "NetworkID")]
    pub network_id: String,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl CreateNetworkRequest {
    /// Bridge name from the generic driver options, if one was given.
    pub fn bridge(&self) -> Option<&str> {
        self.options
            .get(OPTS_KEY)
            .and_then(|generic| generic.get(OPT_BRIDGE))
            .and_then(|bridge| bridge.as_str())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct NetworkRequest {
    #[serde(rename = "NetworkID")]
    pub network_id: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct CreateEndpointRequest {
    #[serde(rename = "NetworkID")]
    pub network_id: String,
    #[serde(rename = "EndpointID")]
    pub endpoint_id: String,
    #[serde(default)]
    pub interface: Option<EndpointInterface>,
}

/// Used for NetworkDriver calls addressing one endpoint on one network.
#[derive(Deserialize, Debug, Clone)]
pub struct EndpointRequest {
    #[serde(rename = "NetworkID")]
    pub network_id: String,
    #[serde(rename = "EndpointID")]
    pub endpoint_id: String,
}

/// Interface data as sent by the engine, every field optional and possibly empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointInterface {
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "AddressIPv6")]
    pub address_ipv6: Option<String>,
}

impl EndpointInterface {
    pub fn mac_address(&self) -> Option<&str> {
        non_empty(&self.mac_address)
    }

    pub fn address(&self) -> Option<&str> {
        non_empty(&self.address)
    }

    pub fn address_ipv6(&self) -> Option<&str> {
        non_empty(&self.address_ipv6)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InterfaceInfo {
    pub mac_address: String,
    pub address: String,
    #[serde(rename = "AddressIPv6")]
    pub address_ipv6: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateEndpointResponse {
    pub interface: InterfaceInfo,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HostInterface {
    pub name: String,
    pub mac: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EndpointOperInfo {
    pub bridge: String,
    pub if_host: HostInterface,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InterfaceName {
    pub src_name: String,
    pub dst_prefix: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StaticRoute {
    pub destination: String,
    pub route_type: u8,
    pub next_hop: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct JoinInfo {
    pub interface_name: InterfaceName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    pub static_routes: Vec<StaticRoute>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    pub scope: String,
    pub connectivity_scope: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Activation {
    pub implements: Vec<String>,
}

/// Serializes to `{}`.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Empty {}

/// JSON request body, parsed whatever the `Content-Type` header says.
///
/// Docker posts plugin calls with its own vendor media type, which the stock
/// `Json` extractor rejects.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = DriverError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| DriverError::validation(format!("Failed to read request body: {e}")))?;

        serde_json::from_slice(&body)
            .map(Payload)
            .map_err(|e| DriverError::validation(format!("Invalid request body: {e}")))
    }
}
