// Tests for Jingle Nodes service discovery
//
// Drives RelayServiceDiscovery against scripted directory and tracker
// answers: prefix ordering, early stop, bounds, cycle handling and
// behaviour when the connection drops mid-walk.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use jingle_ice_core::prelude::*;
use common::*;

fn config(prefixes: &str, stop_on_first: bool) -> RelayConfig {
    RelayConfig {
        search_prefixes: prefixes.to_string(),
        stop_on_first,
        ..Default::default()
    }
}

fn discovery(
    service: RelayNodeService,
    signaling: ScriptedSignaling,
    config: RelayConfig,
) -> (RelayServiceDiscovery, Arc<ScriptedSignaling>) {
    let signaling = Arc::new(signaling);
    (
        RelayServiceDiscovery::new(Arc::new(service), signaling.clone(), config),
        signaling,
    )
}

fn tcp_relay(address: &str) -> TrackerEntry {
    TrackerEntry {
        protocol: "tcp".to_string(),
        ..TrackerEntry::relay(address)
    }
}

#[tokio::test]
async fn test_prefix_match_stops_after_first_hit() {
    let signaling = ScriptedSignaling::new()
        .directory(DOMAIN, &["a.example.org", "relay.example.org", "b.example.org"])
        .tracker("relay.example.org", vec![TrackerEntry::relay("jn1.example.org")])
        .tracker("a.example.org", vec![TrackerEntry::relay("jn2.example.org")]);
    let (discovery, signaling) = discovery(RelayNodeService::new(), signaling, config("relay", true));

    let report = discovery.run().await;

    assert_eq!(signaling.queried(), vec!["relay.example.org"]);
    assert_eq!(report.relays, 1);
    assert!(!report.interrupted);
    let preferred = discovery.service().preferred_relay().unwrap();
    assert_eq!(preferred.address.as_str(), "jn1.example.org");
    assert!(preferred.preferred);
}

#[tokio::test]
async fn test_exhaustive_search_visits_each_node_once() {
    let signaling = ScriptedSignaling::new()
        .directory(DOMAIN, &["a.example.org", "b.example.org", "c.example.org"])
        .tracker(
            "a.example.org",
            vec![TrackerEntry::tracker("b.example.org"), TrackerEntry::relay("r1.example.org")],
        )
        .tracker(
            "b.example.org",
            vec![TrackerEntry::tracker("a.example.org"), TrackerEntry::relay("r2.example.org")],
        );
    let (discovery, signaling) = discovery(RelayNodeService::new(), signaling, config("off", false));

    let report = discovery.run().await;

    assert_eq!(signaling.queried(), vec!["a.example.org", "b.example.org", "c.example.org"]);
    assert_eq!(report.relays, 2);
    assert_eq!(report.trackers, 2);
    assert_eq!(report.queried, 3);

    let relays: Vec<_> = discovery
        .service()
        .entries()
        .into_iter()
        .filter(TrackerEntry::is_relay)
        .map(|e| e.address.to_string())
        .collect();
    assert_eq!(relays, vec!["r1.example.org", "r2.example.org"]);
}

#[tokio::test]
async fn test_depth_limits_tracker_recursion() {
    let signaling = ScriptedSignaling::new()
        .tracker("t1.example.org", vec![TrackerEntry::tracker("t2.example.org")])
        .tracker("t2.example.org", vec![TrackerEntry::tracker("t3.example.org")])
        .tracker("t3.example.org", vec![TrackerEntry::relay("deep.example.org")]);
    let service = RelayNodeService::new();
    service.add_entry(TrackerEntry::tracker("t1.example.org"));
    let config = RelayConfig { auto_discovery: false, ..Default::default() };
    let (discovery, signaling) = discovery(service, signaling, config);

    let report = discovery.run().await;

    assert_eq!(signaling.queried(), vec!["t1.example.org", "t2.example.org"]);
    assert_eq!(report.relays, 0);
    assert!(discovery.service().preferred_relay().is_none());
}

#[tokio::test]
async fn test_relays_with_other_protocols_are_ignored() {
    let signaling = ScriptedSignaling::new().tracker(
        "t1.example.org",
        vec![tcp_relay("tcp.example.org"), TrackerEntry::relay("udp.example.org")],
    );
    let service = RelayNodeService::new();
    service.add_entry(TrackerEntry::tracker("t1.example.org"));
    let config = RelayConfig { auto_discovery: false, ..Default::default() };
    let (discovery, _) = discovery(service, signaling, config);

    let report = discovery.run().await;

    assert_eq!(report.relays, 1);
    let addresses: Vec<_> = discovery.service().entries().into_iter().map(|e| e.address.to_string()).collect();
    assert!(addresses.contains(&"udp.example.org".to_string()));
    assert!(!addresses.contains(&"tcp.example.org".to_string()));
}

#[tokio::test]
async fn test_disconnect_keeps_partial_results() {
    let mut signaling = ScriptedSignaling::new()
        .directory(DOMAIN, &["a.example.org", "b.example.org", "c.example.org"])
        .tracker("a.example.org", vec![TrackerEntry::relay("ra.example.org")])
        .tracker("b.example.org", vec![TrackerEntry::relay("rb.example.org")])
        .tracker("c.example.org", vec![TrackerEntry::relay("rc.example.org")]);
    signaling.disconnect_after = Some(2);
    signaling.server_host = Some("xmpp.example.org".into());
    let (discovery, signaling) = discovery(RelayNodeService::new(), signaling, config("off", false));

    let report = discovery.run().await;

    assert!(report.interrupted);
    assert_eq!(report.relays, 2);
    assert_eq!(signaling.queried().len(), 3);
    assert_eq!(discovery.service().len(), 2);
}

#[tokio::test]
async fn test_not_connected_skips_search() {
    let signaling = ScriptedSignaling::new().directory(DOMAIN, &["a.example.org"]);
    signaling.disconnected.store(true, Ordering::SeqCst);
    let (discovery, signaling) = discovery(RelayNodeService::new(), signaling, RelayConfig::default());

    let report = discovery.run().await;

    assert!(report.interrupted);
    assert!(signaling.queried().is_empty());
}

#[tokio::test]
async fn test_trusted_nodes_first_and_own_address_skipped() {
    let signaling = ScriptedSignaling::new()
        .directory(DOMAIN, &[OWN_ADDRESS, "x.example.org"])
        .tracker("t1.example.org", vec![TrackerEntry::relay("r1.example.org")]);
    let service = RelayNodeService::new();
    service.add_entry(TrackerEntry::tracker("t1.example.org"));
    let (discovery, signaling) = discovery(service, signaling, config("", false));

    discovery.run().await;

    assert_eq!(signaling.queried(), vec!["t1.example.org", "x.example.org"]);
}

#[tokio::test]
async fn test_buddies_searched_only_when_enabled() {
    let buddy = "bob@example.org/phone";
    for (search_buddies, expected) in [
        (false, vec!["xmpp.example.org"]),
        (true, vec!["xmpp.example.org", buddy]),
    ] {
        let mut signaling = ScriptedSignaling::new();
        signaling.server_host = Some("xmpp.example.org".into());
        let signaling = Arc::new(signaling);
        let config = RelayConfig { search_buddies, ..Default::default() };
        let discovery = RelayServiceDiscovery::new(Arc::new(RelayNodeService::new()), signaling.clone(), config)
            .with_presences(Arc::new(StaticPresences(vec![buddy.into()])));

        discovery.run().await;

        assert_eq!(signaling.queried(), expected);
    }
}

#[tokio::test]
async fn test_runs_for_one_account_are_serialized() {
    let mut signaling = ScriptedSignaling::new();
    signaling.query_delay = Some(Duration::from_millis(50));
    let service = RelayNodeService::new();
    service.add_entry(TrackerEntry::tracker("t1.example.org"));
    let config = RelayConfig { auto_discovery: false, ..Default::default() };
    let (discovery, signaling) = discovery(service, signaling, config);
    let discovery = Arc::new(discovery);

    let first = discovery.clone().spawn();
    let second = discovery.clone().spawn();
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(signaling.queried().len(), 2);
    assert_eq!(signaling.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(!discovery.is_running());
}
