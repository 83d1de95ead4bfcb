//! Background membership refresh.
//!
//! The watcher keeps a [`HostProvider`] in step with the ensemble's live
//! configuration node. Each round waits a random fraction of the session
//! timeout, reads the node with a one-shot watch, installs the participant
//! addresses, then sleeps until the node changes.
//!
//! The jitter spreads reads from many clients over the session timeout
//! after a reconfiguration.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use ensemble_types::{MEMBERSHIP_PATH, MembershipDocument};
use parking_lot::Mutex;
use snafu::ResultExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{MembershipSnafu, Result, SdkError},
    randomness::{Randomness, SeededRandomness},
    server::HostProvider,
    source::{MembershipSource, WatchEvent, WatchEventKind, WatchedNode},
};

/// Configuration for a [`MembershipWatcher`].
#[derive(Debug, Clone, bon::Builder)]
#[builder(derive(Debug))]
pub struct WatcherConfig {
    /// Path of the membership node.
    #[builder(into, default = MEMBERSHIP_PATH.to_owned())]
    path: String,

    /// Ceiling for the wait before each read. Defaults to the session
    /// timeout reported by the source.
    max_jitter: Option<Duration>,
}

impl WatcherConfig {
    /// Returns the membership node path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the jitter ceiling override, if any.
    #[must_use]
    pub fn max_jitter(&self) -> Option<Duration> {
        self.max_jitter
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Why a watcher task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherExit {
    /// [`MembershipWatcher::stop`] was called.
    Stopped,
    /// The connection is closing.
    Closing,
    /// The session expired.
    SessionExpired,
    /// The watch was removed and the client closes on session expiration.
    WatchLost,
}

/// A host list installed from the membership node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipUpdate {
    /// Document version.
    pub version: i64,
    /// Participant client addresses, in document order.
    pub servers: Vec<String>,
}

/// Watches the membership node and re-initializes a host provider on every
/// change.
///
/// Cloning shares the task state; [`stop`](Self::stop) on any clone stops
/// the task.
#[derive(Debug, Clone)]
pub struct MembershipWatcher {
    source: Arc<dyn MembershipSource>,
    provider: Arc<dyn HostProvider>,
    config: WatcherConfig,
    randomness: Arc<Mutex<Box<dyn Randomness>>>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl MembershipWatcher {
    /// Creates a watcher that feeds `provider` from `source`.
    #[must_use]
    pub fn new(
        source: Arc<dyn MembershipSource>,
        provider: Arc<dyn HostProvider>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            source,
            provider,
            config,
            randomness: Arc::new(Mutex::new(Box::new(SeededRandomness::from_clock()))),
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the randomness used for the jittered wait.
    #[must_use]
    pub fn with_randomness(self, randomness: Box<dyn Randomness>) -> Self {
        *self.randomness.lock() = randomness;
        self
    }

    /// Returns the watcher configuration.
    #[must_use]
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Returns whether the background task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawns the background task.
    ///
    /// Returns `None` if a task for this watcher is already running.
    /// A watcher that has been stopped exits immediately with
    /// [`WatcherExit::Stopped`].
    pub fn spawn(&self) -> Option<JoinHandle<WatcherExit>> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Membership watcher already running");
            return None;
        }

        let watcher = self.clone();
        let running = RunningGuard(Arc::clone(&self.running));
        Some(tokio::spawn(async move {
            let _running = running;
            info!(path = %watcher.config.path, "Starting membership watcher");
            let exit = watcher.run().await;
            info!(path = %watcher.config.path, exit = ?exit, "Membership watcher stopped");
            exit
        }))
    }

    /// Stops the background task. A stopped watcher cannot be restarted.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Reads the membership node once and installs its participants.
    ///
    /// The watch registered by the read is discarded.
    ///
    /// # Errors
    ///
    /// Returns the read error, a [`SdkError::Membership`] error if the
    /// document is malformed, or the provider's `init` error.
    pub async fn refresh_once(&self) -> Result<MembershipUpdate> {
        let node = self.source.get_watch(&self.config.path).await?;
        self.apply(&node.data).await
    }

    async fn run(&self) -> WatcherExit {
        loop {
            let delay = self.next_delay();
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return WatcherExit::Stopped,
                () = tokio::time::sleep(delay) => {}
            }

            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return WatcherExit::Stopped,
                read = self.source.get_watch(&self.config.path) => read,
            };

            let WatchedNode { data, stat, events } = match read {
                Ok(node) => node,
                Err(SdkError::Closing) => return WatcherExit::Closing,
                Err(SdkError::SessionExpired) => return WatcherExit::SessionExpired,
                Err(e) => {
                    warn!(error = %e, path = %self.config.path, "Membership read failed");
                    continue;
                },
            };

            match self.apply(&data).await {
                Ok(update) => info!(
                    version = format_args!("{:x}", update.version),
                    data_version = stat.data_version,
                    servers = ?update.servers,
                    "Installed membership host list"
                ),
                Err(e) => warn!(
                    error = %e,
                    data_version = stat.data_version,
                    "Keeping current host list"
                ),
            }

            let event = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return WatcherExit::Stopped,
                event = events => event.unwrap_or_else(|_| {
                    WatchEvent::new(WatchEventKind::NotWatching, self.config.path.clone())
                }),
            };

            if event.kind == WatchEventKind::NotWatching
                && self.source.close_on_session_expiration()
            {
                return WatcherExit::WatchLost;
            }
            debug!(kind = ?event.kind, path = %event.path, "Membership node changed");
        }
    }

    async fn apply(&self, data: &[u8]) -> Result<MembershipUpdate> {
        let document = MembershipDocument::parse(data).context(MembershipSnafu)?;
        let servers = document.client_addrs();
        self.provider.init(servers.clone()).await?;
        Ok(MembershipUpdate { version: document.version, servers })
    }

    fn jitter_ceiling(&self) -> Duration {
        self.config.max_jitter.unwrap_or_else(|| self.source.session_timeout())
    }

    fn next_delay(&self) -> Duration {
        let ceiling = self.jitter_ceiling();
        self.randomness.lock().jitter(ceiling)
    }
}

/// Clears the running flag when the task ends, including by panic or abort.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
