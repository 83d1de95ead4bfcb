//! Host discovery wiring for a single connection instance.
//!
//! [`HostDiscovery`] installs the configured host provider, seeds it with
//! the initial server list and, when dynamic reconfiguration is enabled,
//! starts a [`MembershipWatcher`] that keeps the list current.
//!
//! # Usage
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use ensemble_sdk::{ClientConfig, HostDiscovery, MembershipSource};
//! # async fn example(source: Arc<dyn MembershipSource>) -> ensemble_sdk::Result<()> {
//! let config = ClientConfig::builder()
//!     .with_connect_string("zk1:2181,zk2:2181,zk3:2181")
//!     .with_dynamic_reconfig(true)
//!     .build()?;
//!
//! let discovery = HostDiscovery::start(&config, source).await?;
//! let host = discovery.provider().next().await;
//! // ... connect to host.address
//!
//! discovery.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    error::Result,
    server::{DnsHostProvider, HostProvider},
    source::MembershipSource,
    watcher::{MembershipWatcher, WatcherExit},
};

/// Host provider plus its optional background membership watcher.
///
/// Dropping the discovery stops the watcher.
#[derive(Debug)]
pub struct HostDiscovery {
    provider: Arc<dyn HostProvider>,
    watcher: Option<MembershipWatcher>,
    handle: Mutex<Option<JoinHandle<WatcherExit>>>,
}

impl HostDiscovery {
    /// Installs the host provider and starts the watcher if enabled.
    ///
    /// Uses the provider from [`ClientConfig::host_provider`], or a
    /// [`DnsHostProvider`] honoring the configured resolve timeout.
    ///
    /// Must be called from within a tokio runtime when dynamic
    /// reconfiguration is enabled.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if it rejects the initial server list.
    pub async fn start(config: &ClientConfig, source: Arc<dyn MembershipSource>) -> Result<Self> {
        let provider: Arc<dyn HostProvider> = match config.host_provider() {
            Some(provider) => Arc::clone(provider),
            None => {
                let mut provider = DnsHostProvider::new();
                if let Some(timeout) = config.resolve_timeout() {
                    provider = provider.with_resolve_timeout(timeout);
                }
                Arc::new(provider)
            },
        };

        provider.init(config.servers().to_vec()).await?;
        info!(servers = ?config.servers(), "Initialized host provider");

        let (watcher, handle) = if config.dynamic_reconfig() {
            let watcher =
                MembershipWatcher::new(source, Arc::clone(&provider), config.watcher().clone());
            let handle = watcher.spawn();
            (Some(watcher), handle)
        } else {
            debug!("Dynamic reconfiguration disabled, not starting membership watcher");
            (None, None)
        };

        Ok(Self { provider, watcher, handle: Mutex::new(handle) })
    }

    /// Returns the installed host provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn HostProvider> {
        &self.provider
    }

    /// Returns the membership watcher, if dynamic reconfiguration is enabled.
    #[must_use]
    pub fn watcher(&self) -> Option<&MembershipWatcher> {
        self.watcher.as_ref()
    }

    /// Stops the watcher and waits for it to exit.
    ///
    /// Returns the exit reason, or `None` if no watcher was started or it
    /// was already collected by an earlier call.
    pub async fn shutdown(&self) -> Option<WatcherExit> {
        let watcher = self.watcher.as_ref()?;
        watcher.stop();

        let handle = self.handle.lock().take()?;
        match handle.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                warn!(error = %e, "Membership watcher task failed");
                None
            },
        }
    }
}

impl Drop for HostDiscovery {
    fn drop(&mut self) {
        if let Some(watcher) = &self.watcher {
            watcher.stop();
        }
    }
}
