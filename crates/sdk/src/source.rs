//! The coordination-client surface the membership watcher reads from.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Result;

/// Kind of change delivered on a one-shot watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// The watched node was created.
    NodeCreated,
    /// The watched node was deleted.
    NodeDeleted,
    /// The watched node's data changed.
    NodeDataChanged,
    /// The watched node's children changed.
    NodeChildrenChanged,
    /// The session changed state.
    Session,
    /// The watch was removed without the node changing.
    NotWatching,
}

/// A change notification for a watched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub kind: WatchEventKind,
    /// Path of the watched node.
    pub path: String,
}

impl WatchEvent {
    /// Creates an event for `path`.
    #[must_use]
    pub fn new(kind: WatchEventKind, path: impl Into<String>) -> Self {
        Self { kind, path: path.into() }
    }
}

/// Version metadata of a node at the time it was read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStat {
    /// Number of changes to the node's data.
    pub data_version: i32,
    /// Transaction id of the last modification.
    pub modified_txn: i64,
}

/// A node read together with a one-shot watch on it.
#[derive(Debug)]
pub struct WatchedNode {
    /// Raw node contents.
    pub data: Vec<u8>,
    /// Node metadata.
    pub stat: NodeStat,
    /// Receives the next change to the node. A dropped sender means the
    /// watch was removed.
    pub events: oneshot::Receiver<WatchEvent>,
}

/// Read access to the coordination service's membership node.
///
/// Implemented by the connection layer; the watcher only needs a watched
/// read and two session properties.
#[async_trait]
pub trait MembershipSource: Send + Sync + fmt::Debug {
    /// Reads `path` and registers a one-shot watch on it.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Closing`](crate::SdkError::Closing) or
    /// [`SdkError::SessionExpired`](crate::SdkError::SessionExpired) when
    /// the connection is gone for good, and any other error for failures
    /// worth retrying.
    async fn get_watch(&self, path: &str) -> Result<WatchedNode>;

    /// Returns true if the client closes itself when its session expires.
    fn close_on_session_expiration(&self) -> bool;

    /// Returns the negotiated session timeout.
    fn session_timeout(&self) -> Duration;
}
