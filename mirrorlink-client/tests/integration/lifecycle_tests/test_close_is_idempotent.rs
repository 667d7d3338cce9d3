use mirrorlink_client::{ConnectionStatus, MediaEvent, NegotiationState, Role};

use crate::integration::init_tracing;
use crate::utils::{FakeBackend, FakeConnector, FakeStream, answer_from_viewer, entered};

#[tokio::test]
async fn test_close_is_idempotent() {
    init_tracing();

    let backend = FakeBackend::new();
    let connector = FakeConnector::new();
    let (mut session, observed) = entered(Role::Sender, &backend, &connector).await;
    session.start_capture().await.expect("Capture failed");
    session.create_offer().await.expect("Offer failed");
    connector.take_sent();

    session.close().await;
    session.close().await;

    assert_eq!(session.state(), NegotiationState::Closed);
    assert!(!session.is_sharing());
    {
        let log = backend.log.borrow();
        assert_eq!(log.capture_stops, 1);
        assert_eq!(log.closes, 1);
    }
    assert_eq!(connector.closes(), 1);
    assert_eq!(observed.statuses().last(), Some(&ConnectionStatus::Idle));

    // Stale frames and media events after teardown are discarded.
    session
        .handle_signal(answer_from_viewer())
        .await
        .expect("Stale frame must be discarded");
    session
        .handle_media_event(MediaEvent::RemoteStream(FakeStream("late")))
        .await;

    assert!(session.remote_description().is_none());
    assert!(observed.streams().is_empty());
    assert!(connector.take_sent().is_empty());
}

#[tokio::test]
async fn test_capture_resolving_after_close_is_stopped() {
    init_tracing();

    let backend = FakeBackend::new();
    let connector = FakeConnector::new();
    let (mut session, _observed) = entered(Role::Sender, &backend, &connector).await;

    let request = session.begin_capture().expect("Capture not allowed");
    session.close().await;
    let capture = request.await;

    assert!(session.finish_capture(capture).is_err());
    assert!(!session.is_sharing());
    assert_eq!(backend.log.borrow().capture_stops, 1);
}
