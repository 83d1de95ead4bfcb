//! Server selection and resolution.
//!
//! The connection layer asks a [`HostProvider`] which address to try next,
//! tells it when a connection succeeded, and asks how many candidates there
//! are. The membership watcher replaces the candidate list whenever the
//! ensemble is reconfigured.
//!
//! # Architecture
//!
//! ```text
//! MembershipWatcher (client addresses)
//!       │ init
//!       ▼
//! HostProvider (DnsHostProvider: shuffled round-robin)
//!       │ next
//!       ▼
//! HostResolver (SystemResolver: DNS lookup)
//!       │
//!       ▼
//! Connection layer
//! ```

mod dns;
mod resolver;

use std::fmt;

use async_trait::async_trait;
pub use dns::DnsHostProvider;
pub(crate) use resolver::split_host_port;
pub use resolver::{HostResolver, ResolveError, SystemResolver};

use crate::error::Result;

/// The outcome of a [`HostProvider::next`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NextHost {
    /// Resolved `ip:port`, or empty when the candidate could not be resolved.
    pub address: String,
    /// True when every candidate has been handed out since the last
    /// successful connection.
    pub cycled: bool,
}

impl NextHost {
    /// Returns true if the candidate resolved to a usable address.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.address.is_empty()
    }
}

/// Selection and resolution policy over a list of server addresses.
///
/// Installed as `Arc<dyn HostProvider>`; every method may be called
/// concurrently from the connection layer and the membership watcher.
#[async_trait]
pub trait HostProvider: Send + Sync + fmt::Debug {
    /// Replaces the candidate list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is rejected. The previous list stays
    /// installed and selectable.
    async fn init(&self, servers: Vec<String>) -> Result<()>;

    /// Returns the next candidate, resolved at call time.
    ///
    /// Resolution failures yield an empty address rather than an error.
    async fn next(&self) -> NextHost;

    /// Signals that the last candidate returned by [`next`](Self::next)
    /// connected successfully.
    fn connected(&self);

    /// Returns the number of installed candidates.
    fn len(&self) -> usize;

    /// Returns true if no candidates are installed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
