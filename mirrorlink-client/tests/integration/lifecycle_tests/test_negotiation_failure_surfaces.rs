use mirrorlink_client::{ClientError, ConnectionStatus, NegotiationState, Role};

use crate::integration::init_tracing;
use crate::utils::{FakeBackend, FakeConnector, entered, offer_from_sender};

#[tokio::test]
async fn test_negotiation_failure_surfaces() {
    init_tracing();

    let backend = FakeBackend::rejecting_remote();
    let connector = FakeConnector::new();
    let (mut session, observed) = entered(Role::Viewer, &backend, &connector).await;
    connector.take_sent();

    let res = session.handle_signal(offer_from_sender()).await;

    assert!(matches!(res, Err(ClientError::NegotiationFailure(_))));
    assert_eq!(session.state(), NegotiationState::Error);
    assert_eq!(session.status(), ConnectionStatus::Error);
    assert!(matches!(
        observed.errors().as_slice(),
        [ClientError::NegotiationFailure(_)]
    ));
    assert!(connector.take_sent().is_empty(), "no answer after a failed install");

    // Error is terminal: later frames do nothing.
    session
        .handle_signal(offer_from_sender())
        .await
        .expect("Frames after failure must be discarded");
    assert_eq!(backend.log.borrow().sessions_opened, 1);

    session.close().await;
    assert_eq!(session.state(), NegotiationState::Closed);
    assert_eq!(backend.log.borrow().closes, 1);
}
