use std::path::PathBuf;

use clap::Parser;

use super::network::DEFAULT_DRIVER_NAME;

pub const SOCKET_PATH: &str = "/run/docker/plugins/net-dhcp.sock";

#[derive(Parser, Debug, Clone)]
#[command(name = "net-dhcp")]
#[command(about = "Docker network driver that attaches containers to existing bridges for DHCP.")]
pub struct CLI {
    /// Unix socket to serve the plugin API on.
    #[arg(long, env = "NET_DHCP_SOCK", default_value = SOCKET_PATH)]
    pub sock: PathBuf,

    /// Driver name Docker records for networks created through this plugin.
    #[arg(long, env = "NET_DHCP_DRIVER_NAME", default_value = DEFAULT_DRIVER_NAME)]
    pub driver_name: String,

    /// Docker API socket, the local default when unset.
    #[arg(long, env = "NET_DHCP_DOCKER_SOCK")]
    pub docker_sock: Option<String>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
