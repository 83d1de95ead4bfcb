//! End-to-end host discovery against scripted membership changes.
//!
//! Wires a real [`DnsHostProvider`] to a scripted membership source and DNS
//! answers, then drives the connection-layer protocol (`next`, `connected`)
//! across reconfigurations.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::{
    collections::HashSet,
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};

use ensemble_sdk::{
    ClientConfig, DnsHostProvider, HostDiscovery, HostProvider, MembershipWatcher, WatchEventKind,
    WatcherConfig, WatcherExit,
    mock::{MockAnswer, MockMembershipSource, MockResolver, SequenceRandomness},
};
use ensemble_test_utils::assert_eventually;
use tracing_subscriber::EnvFilter;

const WAIT: Duration = Duration::from_secs(60);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
}

fn resolver() -> MockResolver {
    MockResolver::new()
        .with_answer("zk1.local", MockAnswer::Addresses(vec![ip(1)]))
        .with_answer("zk2.local", MockAnswer::Addresses(vec![ip(2)]))
        .with_answer("zk3.local", MockAnswer::Addresses(vec![ip(3)]))
        .with_answer("zk4.local", MockAnswer::Addresses(vec![ip(4)]))
}

async fn drain(provider: &dyn HostProvider, calls: usize) -> Vec<(String, bool)> {
    let mut out = Vec::with_capacity(calls);
    for _ in 0..calls {
        let host = provider.next().await;
        out.push((host.address, host.cycled));
    }
    out
}

#[tokio::test(start_paused = true)]
async fn reconfiguration_replaces_candidates() {
    init_tracing();

    let source = MockMembershipSource::new().with_session_timeout(Duration::from_secs(4));
    source.push_data(
        "server.1=zk1.local:2888:3888:participant;zk1.local:2181\n\
         server.2=zk2.local:2888:3888:participant;zk2.local:2181\n\
         server.3=zk3.local:2888:3888:participant;zk3.local:2181\n\
         version=100000000",
    );

    let provider = Arc::new(
        DnsHostProvider::with_resolver(Arc::new(resolver()))
            .with_randomness(Box::new(SequenceRandomness::new([0, 0, 0]))),
    );
    provider.init(vec!["zk1.local:2181".to_owned()]).await.unwrap();

    let watcher = MembershipWatcher::new(
        Arc::new(source.clone()),
        Arc::clone(&provider) as Arc<dyn HostProvider>,
        WatcherConfig::default(),
    );
    let handle = watcher.spawn().unwrap();

    assert!(assert_eventually(WAIT, || provider.len() == 3).await);

    let hosts = drain(provider.as_ref(), 4).await;
    assert_eq!(
        hosts,
        vec![
            ("192.168.1.2:2181".to_owned(), false),
            ("192.168.1.3:2181".to_owned(), false),
            ("192.168.1.1:2181".to_owned(), false),
            ("192.168.1.2:2181".to_owned(), true),
        ]
    );

    // zk2 leaves, zk4 joins as observer, zk3 stays
    source.push_data(
        "server.1=zk1.local:2888:3888:participant;zk1.local:2181\n\
         server.3=zk3.local:2888:3888:participant;zk3.local:2181\n\
         server.4=zk4.local:2888:3888:observer;zk4.local:2181\n\
         version=100000001",
    );
    assert_eq!(source.fire(WatchEventKind::NodeDataChanged), 1);

    assert!(assert_eventually(WAIT, || provider.len() == 2).await);
    assert_eq!(provider.servers(), vec!["zk1.local:2181".to_owned(), "zk3.local:2181".to_owned()]);

    let seen: HashSet<String> =
        drain(provider.as_ref(), 4).await.into_iter().map(|(address, _)| address).collect();
    assert_eq!(
        seen,
        HashSet::from(["192.168.1.1:2181".to_owned(), "192.168.1.3:2181".to_owned()])
    );

    watcher.stop();
    assert_eq!(handle.await.unwrap(), WatcherExit::Stopped);
}

#[tokio::test(start_paused = true)]
async fn malformed_reconfiguration_keeps_candidates() {
    init_tracing();

    let source = MockMembershipSource::new();
    source.push_data("server.1=zk1.local:2888:3888:participant;zk1.local:2181\nversion=1");

    let provider = Arc::new(DnsHostProvider::with_resolver(Arc::new(resolver())));
    provider.init(vec!["zk4.local:2181".to_owned()]).await.unwrap();

    let watcher = MembershipWatcher::new(
        Arc::new(source.clone()),
        Arc::clone(&provider) as Arc<dyn HostProvider>,
        WatcherConfig::default(),
    );
    let handle = watcher.spawn().unwrap();

    assert!(
        assert_eventually(WAIT, || provider.servers() == vec!["zk1.local:2181".to_owned()]).await
    );

    source.push_data("server.1=zk1.local:2888:3888:leader;zk1.local:2181\nversion=2");
    source.fire(WatchEventKind::NodeDataChanged);

    assert!(assert_eventually(WAIT, || source.read_count() == 2 && source.pending_watches() == 1).await);
    assert_eq!(provider.servers(), vec!["zk1.local:2181".to_owned()]);
    assert_eq!(provider.next().await.address, "192.168.1.1:2181");

    watcher.stop();
    assert_eq!(handle.await.unwrap(), WatcherExit::Stopped);
}

#[tokio::test(start_paused = true)]
async fn session_loss_stops_discovery() {
    init_tracing();

    let source = MockMembershipSource::new().with_close_on_session_expiration(true);
    source.push_data("server.1=zk1.local:2888:3888:participant;10.1.1.1:2181\nversion=1");

    let config = ClientConfig::builder()
        .with_connect_string("10.1.1.9")
        .with_dynamic_reconfig(true)
        .with_resolve_timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let discovery = HostDiscovery::start(&config, Arc::new(source.clone())).await.unwrap();
    assert_eq!(discovery.provider().next().await.address, "10.1.1.9:2181");

    assert!(assert_eventually(WAIT, || source.pending_watches() == 1).await);
    assert_eq!(discovery.provider().next().await.address, "10.1.1.1:2181");

    source.fire(WatchEventKind::NotWatching);

    let watcher = discovery.watcher().unwrap().clone();
    assert!(assert_eventually(WAIT, || !watcher.is_running()).await);
    assert_eq!(discovery.shutdown().await, Some(WatcherExit::WatchLost));

    // the last installed list stays usable after the watcher exits
    assert_eq!(discovery.provider().len(), 1);
}
