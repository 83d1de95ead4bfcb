//! Host discovery and membership tracking for ensemble clients.
//!
//! This SDK answers two questions for the connection layer of a
//! coordination-service client: which server should I try next, and has
//! the ensemble's membership changed?
//!
//! # Features
//!
//! - **Shuffled round-robin**: Random starting server, then strict rotation
//! - **Cycle detection**: Reports when every server was tried without success
//! - **Late resolution**: DNS lookup when a server is picked, outside any lock
//! - **Dynamic reconfiguration**: Background watcher of the membership node
//! - **Pluggable policy**: Install any [`HostProvider`] through the config
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ensemble_sdk::{ClientConfig, HostDiscovery};
//!
//! #[tokio::main]
//! async fn main() -> ensemble_sdk::Result<()> {
//!     let config = ClientConfig::builder()
//!         .with_connect_string("zk1:2181,zk2:2181,zk3:2181")
//!         .with_dynamic_reconfig(true)
//!         .build()?;
//!
//!     let discovery = HostDiscovery::start(&config, source).await?;
//!
//!     loop {
//!         let host = discovery.provider().next().await;
//!         if host.cycled {
//!             // every server failed once; back off before the next round
//!         }
//!         if host.is_resolved() && dial(&host.address).await.is_ok() {
//!             discovery.provider().connected();
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                HostDiscovery (Public API)                   │
//! │        .provider() │ .watcher() │ .shutdown()               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   MembershipWatcher                         │
//! │   Jittered read │ MembershipDocument parse │ Watch wait     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HostProvider                              │
//! │   DnsHostProvider │ Cursor + attempts │ Cycle detection     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HostResolver                              │
//! │   SystemResolver (hickory) │ Optional lookup timeout        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod discovery;
mod error;
pub mod mock;
mod randomness;
mod server;
mod source;
mod watcher;

// Public API exports
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_CLIENT_PORT};
pub use discovery::HostDiscovery;
pub use error::{Result, SdkError};
pub use randomness::{Randomness, SeededRandomness};
pub use server::{DnsHostProvider, HostProvider, HostResolver, NextHost, ResolveError, SystemResolver};
pub use source::{MembershipSource, NodeStat, WatchEvent, WatchEventKind, WatchedNode};
pub use watcher::{MembershipUpdate, MembershipWatcher, WatcherConfig, WatcherExit};

// Re-export types crate for convenience
pub use ensemble_types::{MEMBERSHIP_PATH, MembershipDocument, ParseError, ServerEntry, ServerRole};
