use std::{future::Future, sync::Arc};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    engine::Engine,
    error::{DriverError, DriverResult},
};

mod bridge;
mod endpoint;
mod ipam;
mod join;
mod netlink;
mod network;

#[cfg(test)]
pub(crate) mod fake;

pub use bridge::Bridge;
pub use netlink::{Link, LinkKind, Netlink, Route, RouteFamily, RtNetlink};

/// Name Docker records for networks owned by this driver, unless configured otherwise.
pub const DEFAULT_DRIVER_NAME: &str = "net-dhcp";

const ENDPOINT_PREFIX_LEN: usize = 12;

/// Host and container side names of an endpoint's veth pair.
pub fn veth_pair(endpoint_id: &str) -> (String, String) {
    let id: String = endpoint_id.chars().take(ENDPOINT_PREFIX_LEN).collect();
    (format!("dh-{id}"), format!("{id}-dh"))
}

/// The endpoint lifecycle driver.
///
/// Holds no network or endpoint state of its own: every call re-reads the kernel through
/// `Netlink` and the engine through `Engine`. Both handles are opened once per process;
/// clones share them.
#[derive(Clone)]
pub struct Driver {
    netlink: Arc<dyn Netlink>,
    engine: Arc<dyn Engine>,
    driver_name: String,
    locks: Arc<EndpointLocks>,
}

impl Driver {
    pub fn new(netlink: Arc<dyn Netlink>, engine: Arc<dyn Engine>, driver_name: &str) -> Self {
        Self {
            netlink,
            engine,
            driver_name: driver_name.to_string(),
            locks: Arc::default(),
        }
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// Runs `op` on its own task while holding the lock of endpoint `if_host`.
    ///
    /// The task runs to completion even when the caller is dropped mid request, so a
    /// half created endpoint still gets rolled back and the lock entry released.
    async fn with_endpoint_lock<T, F, Fut>(&self, if_host: String, op: F) -> DriverResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Driver) -> Fut + Send + 'static,
        Fut: Future<Output = DriverResult<T>> + Send + 'static,
    {
        let driver = self.clone();
        let name = if_host.clone();

        let task = tokio::spawn(async move {
            let guard = driver.locks.lock(&if_host).await;
            let result = op(driver.clone()).await;
            drop(guard);
            driver.locks.release(&if_host);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(DriverError::unexpected(
                &format!("Endpoint task for {name} failed"),
                Some(Box::new(e)),
            )),
        }
    }
}

/// Serializes mutations of one endpoint, keyed by its host side interface name.
#[derive(Default)]
struct EndpointLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EndpointLocks {
    async fn lock(&self, if_host: &str) -> OwnedMutexGuard<()> {
        // Clone out of the map first, a dashmap shard lock must not be held across await.
        let lock = self.locks.entry(if_host.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    /// Drops the entry once nobody holds or waits on it.
    fn release(&self, if_host: &str) {
        self.locks
            .remove_if(if_host, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("0123456789abcdef0123", "dh-0123456789ab", "0123456789ab-dh")]
    #[case("0123456789ab", "dh-0123456789ab", "0123456789ab-dh")]
    #[case("abc", "dh-abc", "abc-dh")]
    fn test_veth_pair(#[case] id: &str, #[case] host: &str, #[case] container: &str) {
        assert_eq!(veth_pair(id), (host.to_string(), container.to_string()));
    }

    #[test]
    fn test_veth_pair_depends_on_prefix_only() {
        let a = veth_pair("0123456789abAAAAAAAA");
        let b = veth_pair("0123456789abBBBBBBBB");
        assert_eq!(a, b);
        assert_ne!(a.0, a.1);
        assert!(a.0.len() <= 15 && a.1.len() <= 15);
    }

    #[tokio::test]
    async fn test_endpoint_lock_released() {
        let locks = EndpointLocks::default();
        {
            let _guard = locks.lock("dh-0123456789ab").await;
            locks.release("dh-0123456789ab");
            assert_eq!(locks.locks.len(), 1);
        }

        locks.release("dh-0123456789ab");
        assert!(locks.locks.is_empty());
    }

    #[tokio::test]
    async fn test_endpoint_lock_excludes() {
        let locks = Arc::new(EndpointLocks::default());
        let guard = locks.lock("dh-a").await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.lock("dh-a").await;
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }
}
