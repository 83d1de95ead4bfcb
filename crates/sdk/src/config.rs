//! Client configuration with builder pattern.
//!
//! Provides validated configuration for host discovery:
//! - Initial server list (the connect string)
//! - Dynamic reconfiguration through the membership watcher
//! - DNS resolution timeout
//! - A custom [`HostProvider`] in place of the DNS-backed default

use std::{fmt, sync::Arc, time::Duration};

use snafu::ensure;

use crate::{
    error::{ConfigSnafu, Result},
    server::{HostProvider, split_host_port},
    watcher::WatcherConfig,
};

/// Client port assumed for servers listed without one.
pub const DEFAULT_CLIENT_PORT: u16 = 2181;

/// Configuration for ensemble host discovery.
#[derive(Clone)]
pub struct ClientConfig {
    /// Initial `host:port` candidates.
    pub(crate) servers: Vec<String>,

    /// Keep the candidate list in step with the ensemble's membership node.
    pub(crate) dynamic_reconfig: bool,

    /// Membership watcher settings.
    pub(crate) watcher: WatcherConfig,

    /// Bound on each DNS lookup.
    pub(crate) resolve_timeout: Option<Duration>,

    /// Provider to install instead of the DNS-backed default.
    pub(crate) host_provider: Option<Arc<dyn HostProvider>>,
}

impl ClientConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns the initial candidates, each with an explicit port.
    #[must_use]
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Returns whether dynamic reconfiguration is enabled.
    #[must_use]
    pub fn dynamic_reconfig(&self) -> bool {
        self.dynamic_reconfig
    }

    /// Returns the membership watcher settings.
    #[must_use]
    pub fn watcher(&self) -> &WatcherConfig {
        &self.watcher
    }

    /// Returns the DNS lookup bound, if any.
    #[must_use]
    pub fn resolve_timeout(&self) -> Option<Duration> {
        self.resolve_timeout
    }

    /// Returns the custom host provider, if one was configured.
    #[must_use]
    pub fn host_provider(&self) -> Option<&Arc<dyn HostProvider>> {
        self.host_provider.as_ref()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("servers", &self.servers)
            .field("dynamic_reconfig", &self.dynamic_reconfig)
            .field("watcher", &self.watcher)
            .field("resolve_timeout", &self.resolve_timeout)
            .field("host_provider", &self.host_provider.is_some())
            .finish()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    servers: Vec<String>,
    dynamic_reconfig: bool,
    watcher: Option<WatcherConfig>,
    resolve_timeout: Option<Duration>,
    host_provider: Option<Arc<dyn HostProvider>>,
}

impl ClientConfigBuilder {
    /// Sets the initial server list.
    ///
    /// At least one server must be provided. Entries without a port get
    /// [`DEFAULT_CLIENT_PORT`].
    #[must_use]
    pub fn with_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.servers = servers.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a single server.
    #[must_use]
    pub fn with_server<S: Into<String>>(mut self, server: S) -> Self {
        self.servers.push(server.into());
        self
    }

    /// Sets the initial server list from a comma-separated connect string.
    ///
    /// Blank entries are skipped.
    #[must_use]
    pub fn with_connect_string(mut self, connect: &str) -> Self {
        self.servers = connect
            .split(',')
            .map(str::trim)
            .filter(|server| !server.is_empty())
            .map(str::to_owned)
            .collect();
        self
    }

    /// Enables or disables dynamic reconfiguration.
    ///
    /// When enabled, a membership watcher replaces the candidate list every
    /// time the ensemble is reconfigured.
    #[must_use]
    pub fn with_dynamic_reconfig(mut self, enabled: bool) -> Self {
        self.dynamic_reconfig = enabled;
        self
    }

    /// Sets the membership watcher settings.
    #[must_use]
    pub fn with_watcher_config(mut self, config: WatcherConfig) -> Self {
        self.watcher = Some(config);
        self
    }

    /// Bounds each DNS lookup made by the default host provider.
    #[must_use]
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = Some(timeout);
        self
    }

    /// Installs a custom host provider instead of the DNS-backed default.
    ///
    /// The resolve timeout does not apply to custom providers.
    #[must_use]
    pub fn with_host_provider(mut self, provider: Arc<dyn HostProvider>) -> Self {
        self.host_provider = Some(provider);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No servers provided
    /// - Any server is not a valid `host:port` or `[v6]:port` pair
    /// - Resolve timeout is zero
    pub fn build(self) -> Result<ClientConfig> {
        ensure!(!self.servers.is_empty(), ConfigSnafu { message: "at least one server is required" });

        let servers = self.servers.iter().map(|server| with_default_port(server)).collect::<Vec<_>>();
        for server in &servers {
            validate_server(server)?;
        }

        if let Some(timeout) = self.resolve_timeout {
            ensure!(!timeout.is_zero(), ConfigSnafu { message: "resolve_timeout cannot be zero" });
        }

        Ok(ClientConfig {
            servers,
            dynamic_reconfig: self.dynamic_reconfig,
            watcher: self.watcher.unwrap_or_default(),
            resolve_timeout: self.resolve_timeout,
            host_provider: self.host_provider,
        })
    }
}

/// Appends [`DEFAULT_CLIENT_PORT`] to a bare host name or bracketed IPv6
/// literal.
fn with_default_port(server: &str) -> String {
    let has_port = match server.strip_prefix('[') {
        Some(rest) => rest.contains("]:"),
        None => server.contains(':'),
    };
    if has_port { server.to_owned() } else { format!("{server}:{DEFAULT_CLIENT_PORT}") }
}

/// Validates that a server is a well-formed `host:port` pair.
fn validate_server(server: &str) -> Result<()> {
    ensure!(
        !server.contains(char::is_whitespace),
        ConfigSnafu { message: format!("server {server:?} cannot contain whitespace") }
    );

    split_host_port(server)
        .map(|_| ())
        .map_err(|e| ConfigSnafu { message: e.to_string() }.build())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{error::SdkError, mock::RecordingHostProvider};

    #[test]
    fn test_builder_with_servers() {
        let config = ClientConfig::builder()
            .with_servers(["zk1:2181", "zk2:2182"])
            .build()
            .unwrap();

        assert_eq!(config.servers(), &["zk1:2181".to_owned(), "zk2:2182".to_owned()]);
        assert!(!config.dynamic_reconfig());
        assert_eq!(config.resolve_timeout(), None);
        assert!(config.host_provider().is_none());
        assert_eq!(config.watcher().path(), ensemble_types::MEMBERSHIP_PATH);
    }

    #[test]
    fn test_builder_appends_default_port() {
        let config = ClientConfig::builder()
            .with_server("zk1")
            .with_server("[::1]")
            .with_server("[::1]:2888")
            .build()
            .unwrap();

        assert_eq!(
            config.servers(),
            &["zk1:2181".to_owned(), "[::1]:2181".to_owned(), "[::1]:2888".to_owned()]
        );
    }

    #[test]
    fn test_builder_connect_string() {
        let config = ClientConfig::builder()
            .with_connect_string("zk1:2181, zk2 ,,zk3:2183")
            .build()
            .unwrap();

        assert_eq!(
            config.servers(),
            &["zk1:2181".to_owned(), "zk2:2181".to_owned(), "zk3:2183".to_owned()]
        );
    }

    #[test]
    fn test_builder_requires_servers() {
        let err = ClientConfig::builder().build().unwrap_err();
        assert!(matches!(err, SdkError::Config { .. }));
        assert!(err.to_string().contains("at least one server"));

        let err = ClientConfig::builder().with_connect_string(" , ").build().unwrap_err();
        assert!(matches!(err, SdkError::Config { .. }));
    }

    #[test]
    fn test_builder_rejects_invalid_servers() {
        for server in ["zk1:port", "zk 1:2181", ":2181", "zk1:99999", "fe80::1:2181"] {
            let result = ClientConfig::builder().with_server(server).build();
            assert!(
                matches!(result, Err(SdkError::Config { .. })),
                "{server} should be rejected"
            );
        }
    }

    #[test]
    fn test_builder_rejects_zero_resolve_timeout() {
        let err = ClientConfig::builder()
            .with_server("zk1:2181")
            .with_resolve_timeout(Duration::ZERO)
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("resolve_timeout"));
    }

    #[test]
    fn test_builder_full() {
        let provider: Arc<dyn HostProvider> = Arc::new(RecordingHostProvider::new());
        let config = ClientConfig::builder()
            .with_server("zk1:2181")
            .with_dynamic_reconfig(true)
            .with_watcher_config(WatcherConfig::builder().path("/custom/config").build())
            .with_resolve_timeout(Duration::from_secs(2))
            .with_host_provider(Arc::clone(&provider))
            .build()
            .unwrap();

        assert!(config.dynamic_reconfig());
        assert_eq!(config.watcher().path(), "/custom/config");
        assert_eq!(config.resolve_timeout(), Some(Duration::from_secs(2)));
        assert!(Arc::ptr_eq(config.host_provider().unwrap(), &provider));
        assert!(format!("{config:?}").contains("host_provider: true"));
    }
}
