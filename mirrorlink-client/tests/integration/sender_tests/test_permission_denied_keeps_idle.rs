use mirrorlink_client::{ClientError, ConnectionStatus, NegotiationState, Role};

use crate::integration::init_tracing;
use crate::utils::{FakeBackend, FakeConnector, entered, join_from};

#[tokio::test]
async fn test_permission_denied_keeps_idle() {
    init_tracing();

    let backend = FakeBackend::denying_capture();
    let connector = FakeConnector::new();
    let (mut session, observed) = entered(Role::Sender, &backend, &connector).await;

    let stream = session.start_capture().await.expect("Denial must not be an error");

    assert!(stream.is_none());
    assert!(!session.is_sharing());
    assert_eq!(session.state(), NegotiationState::Idle);
    assert_eq!(
        observed.statuses(),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Idle]
    );
    assert!(observed.errors().is_empty());

    // Without a capture there is nothing to offer.
    let res = session.create_offer().await;
    assert!(matches!(res, Err(ClientError::ProtocolViolation(_))));
    assert_eq!(session.state(), NegotiationState::Idle);
    assert_eq!(backend.log.borrow().sessions_opened, 0);
    assert_eq!(connector.sent(), vec![join_from(Role::Sender)]);
}
