//! Controllable fakes for testing host discovery without a live ensemble.
//!
//! # Features
//!
//! - **Scripted reads**: [`MockMembershipSource`] replays a queue of node
//!   contents and terminal errors, and blocks when the queue is empty
//! - **Watch control**: fire or drop the one-shot watches registered by reads
//! - **Host recording**: [`RecordingHostProvider`] records every `init` call
//!   and can be told to reject lists
//! - **DNS answers**: [`MockResolver`] answers per host, fails, or hangs
//! - **Pinned randomness**: [`SequenceRandomness`] replays scripted choices
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ensemble_sdk::mock::{MockMembershipSource, RecordingHostProvider};
//! use ensemble_sdk::{MembershipWatcher, WatcherConfig, WatchEventKind};
//!
//! #[tokio::test]
//! async fn test_reconfiguration() {
//!     let source = MockMembershipSource::new();
//!     let provider = RecordingHostProvider::new();
//!     source.push_data("server.1=zk1:2888:3888:participant;0.0.0.0:2181\nversion=1");
//!
//!     let watcher = MembershipWatcher::new(
//!         Arc::new(source.clone()),
//!         Arc::new(provider.clone()),
//!         WatcherConfig::default(),
//!     );
//!     let handle = watcher.spawn().unwrap();
//!
//!     // ... wait for provider.init_calls() to grow, then
//!     source.fire(WatchEventKind::NodeDataChanged);
//!     watcher.stop();
//!     handle.await.unwrap();
//! }
//! ```

use std::{
    collections::{HashMap, VecDeque},
    net::IpAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};

use crate::{
    error::{EmptyHostListSnafu, ReadSnafu, Result, SdkError},
    randomness::Randomness,
    server::{HostProvider, HostResolver, NextHost, ResolveError},
    source::{MembershipSource, NodeStat, WatchEvent, WatchEventKind, WatchedNode},
};

/// Session timeout reported by a fresh [`MockMembershipSource`].
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// One scripted result for [`MembershipSource::get_watch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedRead {
    /// Return these contents and register a watch.
    Data(Vec<u8>),
    /// Fail with [`SdkError::Closing`].
    Closing,
    /// Fail with [`SdkError::SessionExpired`].
    SessionExpired,
    /// Fail with a retryable [`SdkError::Read`].
    Failure(String),
}

#[derive(Debug)]
struct SourceState {
    reads: Mutex<VecDeque<ScriptedRead>>,
    watches: Mutex<Vec<(String, oneshot::Sender<WatchEvent>)>>,
    read_ready: Notify,
    read_count: AtomicUsize,
    data_version: AtomicI32,
    close_on_expiration: AtomicBool,
    session_timeout: Mutex<Duration>,
}

/// Scripted [`MembershipSource`].
///
/// Clones share state, so a test keeps one clone for control while the
/// watcher owns another.
#[derive(Debug, Clone)]
pub struct MockMembershipSource {
    state: Arc<SourceState>,
}

impl MockMembershipSource {
    /// Creates a source with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(SourceState {
                reads: Mutex::new(VecDeque::new()),
                watches: Mutex::new(Vec::new()),
                read_ready: Notify::new(),
                read_count: AtomicUsize::new(0),
                data_version: AtomicI32::new(0),
                close_on_expiration: AtomicBool::new(false),
                session_timeout: Mutex::new(DEFAULT_SESSION_TIMEOUT),
            }),
        }
    }

    /// Sets the reported session timeout.
    #[must_use]
    pub fn with_session_timeout(self, timeout: Duration) -> Self {
        *self.state.session_timeout.lock() = timeout;
        self
    }

    /// Sets whether the client closes on session expiration.
    #[must_use]
    pub fn with_close_on_session_expiration(self, close: bool) -> Self {
        self.state.close_on_expiration.store(close, Ordering::SeqCst);
        self
    }

    /// Queues a successful read returning `data`.
    pub fn push_data(&self, data: impl Into<Vec<u8>>) {
        self.push_read(ScriptedRead::Data(data.into()));
    }

    /// Queues a scripted read.
    pub fn push_read(&self, read: ScriptedRead) {
        self.state.reads.lock().push_back(read);
        self.state.read_ready.notify_one();
    }

    /// Delivers `kind` to every registered watch and returns how many
    /// were fired.
    pub fn fire(&self, kind: WatchEventKind) -> usize {
        let watches = std::mem::take(&mut *self.state.watches.lock());
        let count = watches.len();
        for (path, sender) in watches {
            // The watcher may already have stopped listening.
            let _ = sender.send(WatchEvent::new(kind, path));
        }
        count
    }

    /// Drops every registered watch without delivering an event.
    pub fn drop_watches(&self) {
        self.state.watches.lock().clear();
    }

    /// Returns the number of watches waiting for an event.
    #[must_use]
    pub fn pending_watches(&self) -> usize {
        self.state.watches.lock().len()
    }

    /// Returns the number of scripted reads consumed.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.state.read_count.load(Ordering::SeqCst)
    }

    async fn next_read(&self) -> ScriptedRead {
        loop {
            let queued = self.state.reads.lock().pop_front();
            if let Some(read) = queued {
                return read;
            }
            self.state.read_ready.notified().await;
        }
    }
}

impl Default for MockMembershipSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipSource for MockMembershipSource {
    async fn get_watch(&self, path: &str) -> Result<WatchedNode> {
        let read = self.next_read().await;
        self.state.read_count.fetch_add(1, Ordering::SeqCst);

        match read {
            ScriptedRead::Data(data) => {
                let (sender, events) = oneshot::channel();
                self.state.watches.lock().push((path.to_owned(), sender));
                let data_version = self.state.data_version.fetch_add(1, Ordering::SeqCst);
                Ok(WatchedNode {
                    data,
                    stat: NodeStat { data_version, modified_txn: i64::from(data_version) },
                    events,
                })
            },
            ScriptedRead::Closing => Err(SdkError::Closing),
            ScriptedRead::SessionExpired => Err(SdkError::SessionExpired),
            ScriptedRead::Failure(message) => ReadSnafu { path, message }.fail(),
        }
    }

    fn close_on_session_expiration(&self) -> bool {
        self.state.close_on_expiration.load(Ordering::SeqCst)
    }

    fn session_timeout(&self) -> Duration {
        *self.state.session_timeout.lock()
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    init_calls: Mutex<Vec<Vec<String>>>,
    servers: Mutex<Vec<String>>,
    cursor: AtomicUsize,
    fail_init: AtomicBool,
    connected: AtomicUsize,
}

/// [`HostProvider`] that records its calls and hands out unresolved
/// addresses in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingHostProvider {
    state: Arc<RecordingState>,
}

impl RecordingHostProvider {
    /// Creates a provider with no installed list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `init` call fail.
    pub fn set_fail_init(&self, fail: bool) {
        self.state.fail_init.store(fail, Ordering::SeqCst);
    }

    /// Returns every list passed to `init`, including rejected ones.
    #[must_use]
    pub fn init_calls(&self) -> Vec<Vec<String>> {
        self.state.init_calls.lock().clone()
    }

    /// Returns the installed list.
    #[must_use]
    pub fn servers(&self) -> Vec<String> {
        self.state.servers.lock().clone()
    }

    /// Returns the number of `connected` calls.
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.state.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostProvider for RecordingHostProvider {
    async fn init(&self, servers: Vec<String>) -> Result<()> {
        self.state.init_calls.lock().push(servers.clone());

        if self.state.fail_init.load(Ordering::SeqCst) {
            return Err(SdkError::HostList { message: "init rejected by test".to_owned() });
        }
        if servers.is_empty() {
            return EmptyHostListSnafu.fail();
        }

        *self.state.servers.lock() = servers;
        self.state.cursor.store(0, Ordering::SeqCst);
        Ok(())
    }

    async fn next(&self) -> NextHost {
        let servers = self.state.servers.lock();
        if servers.is_empty() {
            return NextHost::default();
        }
        let index = self.state.cursor.fetch_add(1, Ordering::SeqCst);
        NextHost { address: servers[index % servers.len()].clone(), cycled: false }
    }

    fn connected(&self) {
        self.state.connected.fetch_add(1, Ordering::SeqCst);
    }

    fn len(&self) -> usize {
        self.state.servers.lock().len()
    }
}

/// Scripted answer for one host in [`MockResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAnswer {
    /// Resolve to these addresses.
    Addresses(Vec<IpAddr>),
    /// Fail with a lookup error carrying this message.
    Fail(String),
    /// Never complete.
    Hang,
}

/// [`HostResolver`] with per-host scripted answers.
///
/// Hosts without an answer resolve to themselves when they are IP literals
/// and fail with [`ResolveError::NoRecords`] otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockResolver {
    answers: Arc<Mutex<HashMap<String, MockAnswer>>>,
    lookups: Arc<AtomicUsize>,
}

impl MockResolver {
    /// Creates a resolver with no scripted answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the answer for `host`.
    #[must_use]
    pub fn with_answer(self, host: impl Into<String>, answer: MockAnswer) -> Self {
        self.set_answer(host, answer);
        self
    }

    /// Replaces the answer for `host`.
    pub fn set_answer(&self, host: impl Into<String>, answer: MockAnswer) {
        self.answers.lock().insert(host.into(), answer);
    }

    /// Returns the number of lookups performed.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResolver for MockResolver {
    async fn lookup(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let answer = self.answers.lock().get(host).cloned();
        match answer {
            Some(MockAnswer::Addresses(addrs)) => Ok(addrs),
            Some(MockAnswer::Fail(message)) => {
                Err(ResolveError::Lookup { host: host.to_owned(), message })
            },
            Some(MockAnswer::Hang) => std::future::pending().await,
            None => match host.parse::<IpAddr>() {
                Ok(ip) => Ok(vec![ip]),
                Err(_) => Err(ResolveError::NoRecords { host: host.to_owned() }),
            },
        }
    }
}

/// [`Randomness`] that replays scripted indices and a fixed jitter.
///
/// Indices are reduced modulo the requested bound; once the script runs
/// out every index is 0. The jitter is clamped to just below the requested
/// ceiling.
#[derive(Debug, Clone, Default)]
pub struct SequenceRandomness {
    indices: VecDeque<usize>,
    jitter: Duration,
}

impl SequenceRandomness {
    /// Creates a randomness source replaying `indices`.
    #[must_use]
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self { indices: indices.into_iter().collect(), jitter: Duration::ZERO }
    }

    /// Sets the jitter returned by every call.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }
}

impl Randomness for SequenceRandomness {
    fn index(&mut self, upper: usize) -> usize {
        match (self.indices.pop_front(), upper) {
            (_, 0) | (None, _) => 0,
            (Some(index), upper) => index % upper,
        }
    }

    fn jitter(&mut self, upper: Duration) -> Duration {
        if self.jitter < upper {
            self.jitter
        } else {
            upper.saturating_sub(Duration::from_nanos(1))
        }
    }
}
