use std::{future::Future, path::Path, sync::Arc};

use anyhow::Context;
use log::{error, info};
use tokio::{
    net::UnixListener,
    signal::unix::{signal, SignalKind},
};

mod api;
mod cmd;
mod engine;
mod error;
mod msg;
mod network;
mod response;

pub use api::router;
pub use cmd::*;
pub use engine::{DockerEngine, Engine, NetworkSummary};
pub use error::{DriverError, DriverResult};
pub use msg::*;
pub use network::*;
pub use response::ErrResponse;

/// Serves the plugin API on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: UnixListener,
    driver: Arc<Driver>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(driver))
        .with_graceful_shutdown(shutdown)
        .await
}

fn bind(path: &Path) -> anyhow::Result<UnixListener> {
    // A previous instance may have left its socket behind.
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove stale socket {}", path.display()))?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    UnixListener::bind(path).with_context(|| format!("Failed to bind {}", path.display()))
}

async fn shutdown_signal() {
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
    info!("[Daemon]: Shutting down");
}

async fn run_daemon(cli: CLI) -> anyhow::Result<()> {
    let netlink = RtNetlink::connect().context("Failed to open netlink session")?;
    let engine = DockerEngine::connect(cli.docker_sock.as_deref())
        .context("Failed to create docker client")?;
    let driver = Arc::new(Driver::new(
        Arc::new(netlink),
        Arc::new(engine),
        &cli.driver_name,
    ));

    let listener = bind(&cli.sock)?;
    info!(
        "[Daemon]: Driver \"{}\" listening on {}",
        driver.driver_name(),
        cli.sock.display()
    );

    let served = serve(listener, driver, shutdown_signal()).await;

    if let Err(e) = std::fs::remove_file(&cli.sock) {
        error!("Failed to remove socket {}: {e}", cli.sock.display());
    }
    served.context("Plugin server failed")
}

pub fn daemon(cli: CLI) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(run_daemon(cli))
}
