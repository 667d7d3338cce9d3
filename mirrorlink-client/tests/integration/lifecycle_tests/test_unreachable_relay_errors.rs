use mirrorlink_client::{ClientError, ConnectionStatus, NegotiationState, Role};

use crate::integration::init_tracing;
use crate::utils::{FakeBackend, FakeConnector, FakePeerSession, config, observe};

#[tokio::test]
async fn test_unreachable_relay_errors() {
    init_tracing();

    let connector = FakeConnector::unreachable();
    let mut session = FakePeerSession::new(config(Role::Viewer), FakeBackend::new());
    let observed = observe(&mut session);

    let res = session.enter(&connector).await;

    assert!(matches!(res, Err(ClientError::TransportUnreachable(_))));
    assert_eq!(session.state(), NegotiationState::Error);
    assert_eq!(
        observed.statuses(),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Error]
    );
    let errors = observed.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("unreachable"));
    assert!(connector.sent().is_empty());
}
