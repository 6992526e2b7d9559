// Tests for the per-account provider wiring
//
// Relay discovery feeding the harvester, trusted node seeding, the shared
// socket demultiplexer and the file transfer entry points.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use jingle::prelude::*;
use common::*;

fn trusted_relay_config() -> ProviderConfig {
    let mut config = ProviderConfig::default();
    config.relay.auto_discovery = false;
    config.relay.trusted_nodes = vec![TrustedNode {
        address: "relay.example.org".into(),
        relay: true,
    }];
    config
}

#[tokio::test]
async fn test_trusted_relay_is_harvested() {
    let network = Arc::new(FakeNetwork::with_channel("127.0.0.1", 31000, 41000));
    let provider = provider(&network, trusted_relay_config());
    assert_eq!(provider.relay_nodes().len(), 1);

    let component = loopback_component();
    let candidates = provider
        .gather_relay_candidates(component.clone())
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].transport_address(), "127.0.0.1:41000".parse().unwrap());
    assert_eq!(component.candidate_count(), 2);
    assert_eq!(provider.demux().len(), 1);
}

#[tokio::test]
async fn test_discovery_feeds_the_harvester() {
    let network = Arc::new(
        FakeNetwork::with_channel("127.0.0.1", 31010, 41010)
            .tracker("relay.example.org", vec![TrackerEntry::relay("relay.example.org")])
            .slow(Duration::from_millis(50)),
    );
    let provider = provider(&network, ProviderConfig::default());
    assert!(provider.relay_nodes().is_empty());

    let discovery = provider.start_discovery();
    while !provider.discovery().is_running() {
        tokio::task::yield_now().await;
    }

    // Waits for the running discovery before reading the pool
    let harvester = provider.relay_harvester().await.unwrap();
    assert_eq!(provider.relay_nodes().len(), 1);
    assert!(provider.relay_nodes().preferred_relay().unwrap().preferred);

    let report = discovery.await.unwrap();
    assert_eq!(report.relays, 1);
    assert!(!report.interrupted);

    let candidates = harvester.harvest(&loopback_component()).await;
    assert_eq!(candidates.len(), 1);
    assert_eq!(harvester.stats().harvests, 1);
}

#[tokio::test]
async fn test_disabled_relaying_gathers_nothing() {
    let network = Arc::new(FakeNetwork::with_channel("127.0.0.1", 31020, 41020));
    let mut config = trusted_relay_config();
    config.relay.enabled = false;
    let provider = provider(&network, config);

    assert!(provider.relay_harvester().await.is_none());
    let candidates = provider
        .gather_relay_candidates(loopback_component())
        .await
        .unwrap();

    assert!(candidates.is_empty());
    assert_eq!(network.channel_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_demux_events_are_taken_once() {
    let network = Arc::new(FakeNetwork::default());
    let provider = provider(&network, ProviderConfig::default());

    assert!(provider.take_demux_events().is_some());
    assert!(provider.take_demux_events().is_none());
}

#[tokio::test]
async fn test_accounts_do_not_share_cooldowns() {
    let network = Arc::new(FakeNetwork::default());
    let first = provider(&network, ProviderConfig::default());
    let second = provider(&network, ProviderConfig::default());
    let bob: EntityAddress = "bob@example.org/laptop".into();

    first.file_transfers().cooldown().arm(&bob);

    assert_eq!(first.file_transfers().cooldown().remaining(&bob), 10);
    assert_eq!(second.file_transfers().cooldown().remaining(&bob), 0);
}

#[tokio::test]
async fn test_signaling_callbacks_reach_file_transfers() {
    let network = Arc::new(FakeNetwork::default());
    let provider = provider(&network, ProviderConfig::default());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.ogg");
    std::fs::write(&path, b"ogg").unwrap();

    let (tx, rx) = mpsc::channel(8);
    let dispatcher = provider.attach_signaling(rx);

    let route = provider
        .file_transfers()
        .send_file(&"bob@example.org/laptop".into(), &path, None)
        .await
        .unwrap();
    let TransferRoute::Jingle(session) = route else {
        panic!("expected a Jingle transfer");
    };
    assert_eq!(network.offers.lock().len(), 1);

    let id = session.core().id().clone();
    tx.send((id.clone(), SignalingEvent::Started)).await.unwrap();
    tx.send((id, SignalingEvent::Finished)).await.unwrap();
    drop(tx);
    dispatcher.await.unwrap();

    assert_eq!(session.core().state(), SessionState::Ended);
    assert!(provider.registry().is_empty());
}
