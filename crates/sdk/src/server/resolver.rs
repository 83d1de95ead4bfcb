//! Host name resolution for candidate server addresses.

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use async_trait::async_trait;
use hickory_resolver::{Resolver, config::ResolverConfig, name_server::TokioConnectionProvider};
use tracing::debug;

/// Errors that can occur while resolving a candidate address.
///
/// Host selection never returns these to the caller; a failed resolution
/// turns into an empty address so the connection layer moves on to the next
/// candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The candidate is not a `host:port` or `[v6]:port` pair.
    #[error("Invalid server address {address:?}: {reason}")]
    InvalidAddress {
        /// Candidate as given to the provider.
        address: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The lookup itself failed.
    #[error("DNS resolution failed for {host}: {message}")]
    Lookup {
        /// Host that was looked up.
        host: String,
        /// Resolver error description.
        message: String,
    },

    /// The lookup succeeded with no addresses.
    #[error("No addresses found for {host}")]
    NoRecords {
        /// Host that was looked up.
        host: String,
    },

    /// The lookup did not finish in time.
    #[error("DNS resolution for {host} timed out after {timeout:?}")]
    Timeout {
        /// Host that was looked up.
        host: String,
        /// Bound that was exceeded.
        timeout: Duration,
    },
}

/// Maps a host name to its IP addresses.
///
/// Implementations must not hold locks shared with the host provider while
/// awaiting.
#[async_trait]
pub trait HostResolver: Send + Sync + fmt::Debug {
    /// Looks up all addresses of `host`, in resolver order.
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// [`HostResolver`] backed by the system DNS configuration.
#[derive(Clone)]
pub struct SystemResolver {
    resolver: Resolver<TokioConnectionProvider>,
}

impl SystemResolver {
    /// Creates a resolver from the system configuration.
    ///
    /// Falls back to the default upstream configuration when the system
    /// configuration cannot be read.
    #[must_use]
    pub fn new() -> Self {
        let resolver = match Resolver::builder(TokioConnectionProvider::default()) {
            Ok(builder) => builder.build(),
            Err(e) => {
                debug!(error = %e, "System resolver configuration unavailable, using defaults");
                Resolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
                .build()
            },
        };
        Self { resolver }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemResolver").finish_non_exhaustive()
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| ResolveError::Lookup { host: host.to_owned(), message: e.to_string() })?;
        Ok(lookup.iter().collect())
    }
}

/// Splits `host:port` or `[v6]:port` into its host and port.
///
/// Brackets are stripped from IPv6 hosts.
pub(crate) fn split_host_port(address: &str) -> Result<(&str, u16), ResolveError> {
    let invalid =
        |reason| ResolveError::InvalidAddress { address: address.to_owned(), reason };

    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| invalid("missing ']'"))?;
        let port = tail.strip_prefix(':').ok_or_else(|| invalid("missing port"))?;
        (host, port)
    } else {
        let (host, port) = address.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        if host.contains(':') {
            return Err(invalid("too many colons"));
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
    Ok((host, port))
}

/// Resolves `address` and rejoins the first answer with its port.
pub(crate) async fn resolve_address(
    resolver: &dyn HostResolver,
    address: &str,
    timeout: Option<Duration>,
) -> Result<String, ResolveError> {
    let (host, port) = split_host_port(address)?;

    let addrs = match timeout {
        Some(limit) => tokio::time::timeout(limit, resolver.lookup(host))
            .await
            .map_err(|_| ResolveError::Timeout { host: host.to_owned(), timeout: limit })??,
        None => resolver.lookup(host).await?,
    };

    let ip = addrs.first().ok_or_else(|| ResolveError::NoRecords { host: host.to_owned() })?;
    Ok(SocketAddr::new(*ip, port).to_string())
}
