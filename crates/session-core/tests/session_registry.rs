// Tests for the session registry
//
// Registration lifecycle, callback dispatch and the channel-driven
// dispatcher.

mod common;

use std::time::Duration;

use jingle_session_core::prelude::*;
use jingle_session_core::RegistryStats;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use common::*;

#[tokio::test]
async fn test_register_and_dispatch() {
    let registry = SessionRegistry::new();
    let session = incoming_offer(RecordingSignaling::new(), "sid-1");
    registry.register(session.clone()).unwrap();

    assert!(registry.contains(&SessionId::from("sid-1")));
    assert!(session.core().is_registered());

    assert!(registry.dispatch(&SessionId::from("sid-1"), SignalingEvent::Started));
    assert_eq!(session.core().state(), SessionState::Active);
}

#[tokio::test]
async fn test_duplicate_registration_is_refused() {
    let registry = SessionRegistry::new();
    let signaling = RecordingSignaling::new();
    registry.register(incoming_offer(signaling.clone(), "sid-1")).unwrap();

    let again = registry.register(incoming_offer(signaling, "sid-1"));
    assert!(matches!(again, Err(SessionError::AlreadyRegistered(_))));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_terminal_state_unregisters() {
    let registry = SessionRegistry::new();
    let session = incoming_offer(RecordingSignaling::new(), "sid-1");
    registry.register(session.clone()).unwrap();

    registry.dispatch(
        &SessionId::from("sid-1"),
        SignalingEvent::Terminated(TerminationReason::Busy),
    );

    assert_eq!(session.core().state(), SessionState::Cancelled);
    assert!(!session.core().is_registered());
    assert!(registry.is_empty());

    // Late callbacks for a finished session are dropped
    assert!(!registry.dispatch(&SessionId::from("sid-1"), SignalingEvent::Finished));
    assert_eq!(session.core().state(), SessionState::Cancelled);
    assert_eq!(
        registry.stats(),
        RegistryStats {
            registered: 1,
            unregistered: 1,
            dispatched: 1,
            dropped: 1,
        }
    );
}

#[tokio::test]
async fn test_unregister_is_idempotent() {
    let registry = SessionRegistry::new();
    let session = incoming_offer(RecordingSignaling::new(), "sid-1");
    registry.register(session.clone()).unwrap();

    assert!(registry.unregister(&SessionId::from("sid-1")));
    assert!(!registry.unregister(&SessionId::from("sid-1")));
    session.cancel().await;

    assert_eq!(registry.stats().unregistered, 1);
    assert_eq!(session.core().state(), SessionState::Cancelled);
}

#[tokio::test]
async fn test_cancel_unregisters_even_when_remote_forgot() {
    let registry = SessionRegistry::new();
    let signaling = RecordingSignaling::new();
    signaling.fail("cancel", SignalingError::ItemNotFound);
    let session = outgoing_offer(signaling, None);
    registry.register(session.clone()).unwrap();
    session.send_offer().await.unwrap();

    session.cancel().await;

    assert!(registry.get(session.core().id()).is_none());
}

#[tokio::test]
async fn test_registering_finished_session_releases_it() {
    let registry = SessionRegistry::new();
    let session = incoming_offer(RecordingSignaling::new(), "sid-1");
    session.cancel().await;

    registry.register(session.clone()).unwrap();

    assert!(registry.is_empty());
    assert!(!session.core().is_registered());
}

#[tokio::test]
async fn test_registry_holds_calls() {
    let registry = SessionRegistry::new();
    let call = CallSession::incoming(
        SessionId::from("call-1"),
        Contact::volatile(bob()),
        RecordingSignaling::new(),
    );
    registry.register(call.clone()).unwrap();

    let stored = registry.get(&SessionId::from("call-1")).unwrap();
    assert!(stored.as_call().is_some());
    assert!(stored.as_file().is_none());

    registry.dispatch(&SessionId::from("call-1"), SignalingEvent::Finished);
    assert_eq!(call.core().state(), SessionState::Ended);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_dispatcher_drains_channel() {
    let registry = SessionRegistry::new();
    let session = outgoing_offer(RecordingSignaling::new(), None);
    let id = session.core().id().clone();
    registry.register(session.clone()).unwrap();
    session.send_offer().await.unwrap();

    let (tx, rx) = mpsc::channel(16);
    let dispatcher = registry.spawn_dispatcher(rx);

    tx.send((id.clone(), SignalingEvent::Started)).await.unwrap();
    tx.send((id.clone(), SignalingEvent::Progress(512))).await.unwrap();
    tx.send((id.clone(), SignalingEvent::Finished)).await.unwrap();
    tx.send((SessionId::from("unknown"), SignalingEvent::Started)).await.unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), dispatcher)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(session.core().state(), SessionState::Ended);
    assert_eq!(session.transferred_bytes(), 512);
    assert_eq!(registry.stats().dropped, 1);
    assert!(registry.session_ids().is_empty());
}
