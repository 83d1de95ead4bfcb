//! Shuffled round-robin host selection with DNS resolution.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use snafu::ensure;
use tracing::{debug, warn};

use super::{HostProvider, NextHost, resolver::resolve_address};
use crate::{
    error::{EmptyHostListSnafu, Result},
    randomness::{Randomness, SeededRandomness},
    server::{HostResolver, SystemResolver},
};

/// Rotation state guarded by the provider lock.
#[derive(Debug)]
struct HostProviderState {
    /// Candidate `host:port` strings, as given to `init`.
    servers: Vec<String>,
    /// Index of the last candidate handed out.
    cursor: usize,
    /// Candidates handed out since the last success or cycle.
    attempt: usize,
    randomness: Box<dyn Randomness>,
}

impl HostProviderState {
    /// Moves to the next candidate.
    ///
    /// Returns the candidate and whether the rotation wrapped past every
    /// server without a successful connection.
    fn advance(&mut self) -> Option<(String, bool)> {
        let len = self.servers.len();
        if len == 0 {
            return None;
        }

        self.cursor = (self.cursor + 1) % len;
        self.attempt += 1;

        let mut cycled = false;
        if self.attempt > len {
            cycled = true;
            self.attempt = 1;
        }

        Some((self.servers[self.cursor].clone(), cycled))
    }
}

/// [`HostProvider`] that hands out candidates in round-robin order from a
/// random starting point and resolves each one through DNS when it is
/// picked.
///
/// Resolution happens outside the provider lock, so a slow lookup never
/// blocks `len`, `init` or `connected`.
///
/// # Example
///
/// ```no_run
/// # use ensemble_sdk::{DnsHostProvider, HostProvider};
/// # async fn example() -> ensemble_sdk::Result<()> {
/// let provider = DnsHostProvider::new();
/// provider.init(vec!["zk1:2181".to_owned(), "zk2:2181".to_owned()]).await?;
///
/// let host = provider.next().await;
/// if host.is_resolved() {
///     // dial host.address, then on success:
///     provider.connected();
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DnsHostProvider {
    state: Mutex<HostProviderState>,
    resolver: Arc<dyn HostResolver>,
    resolve_timeout: Option<Duration>,
}

impl DnsHostProvider {
    /// Creates a provider using the system resolver and clock-seeded
    /// randomness.
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(SystemResolver::new()))
    }

    /// Creates a provider with the given resolver.
    #[must_use]
    pub fn with_resolver(resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            state: Mutex::new(HostProviderState {
                servers: Vec::new(),
                cursor: 0,
                attempt: 0,
                randomness: Box::new(SeededRandomness::from_clock()),
            }),
            resolver,
            resolve_timeout: None,
        }
    }

    /// Replaces the randomness used to pick the starting candidate.
    #[must_use]
    pub fn with_randomness(mut self, randomness: Box<dyn Randomness>) -> Self {
        self.state.get_mut().randomness = randomness;
        self
    }

    /// Bounds each lookup. A lookup that exceeds the limit counts as a
    /// resolution failure.
    #[must_use]
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = Some(timeout);
        self
    }

    /// Returns a copy of the installed candidate list.
    #[must_use]
    pub fn servers(&self) -> Vec<String> {
        self.state.lock().servers.clone()
    }
}

impl Default for DnsHostProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostProvider for DnsHostProvider {
    async fn init(&self, servers: Vec<String>) -> Result<()> {
        ensure!(!servers.is_empty(), EmptyHostListSnafu);

        let mut state = self.state.lock();
        state.cursor = state.randomness.index(servers.len());
        state.attempt = 0;
        state.servers = servers;
        debug!(count = state.servers.len(), cursor = state.cursor, "Installed host list");
        Ok(())
    }

    async fn next(&self) -> NextHost {
        let Some((address, cycled)) = self.state.lock().advance() else {
            return NextHost::default();
        };

        match resolve_address(self.resolver.as_ref(), &address, self.resolve_timeout).await {
            Ok(resolved) => NextHost { address: resolved, cycled },
            Err(e) => {
                warn!(error = %e, address = %address, "Failed to resolve server address");
                NextHost { address: String::new(), cycled }
            },
        }
    }

    fn connected(&self) {
        self.state.lock().attempt = 1;
    }

    fn len(&self) -> usize {
        self.state.lock().servers.len()
    }
}
