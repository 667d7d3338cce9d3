use mirrorlink_client::{ClientError, ConnectionStatus, Role, run_session, session_handle};
use tokio::task::LocalSet;

use crate::integration::init_tracing;
use crate::utils::{
    FakeBackend, FakeConnector, FakePeerSession, FakeStream, config, kinds, observe, wait_until,
};

#[tokio::test]
async fn test_driver_stops_while_connecting() {
    init_tracing();

    let connector = FakeConnector::gated();
    let mut session = FakePeerSession::new(config(Role::Sender), FakeBackend::new());
    let observed = observe(&mut session);
    let (handle, commands) = session_handle();

    LocalSet::new()
        .run_until(async {
            let driver =
                tokio::task::spawn_local(run_session(session, connector.clone(), commands));
            wait_until(|| observed.statuses().contains(&ConnectionStatus::Connecting)).await;

            let mut sharing = Box::pin(handle.start_sharing());
            assert!(futures::poll!(sharing.as_mut()).is_pending());

            handle.stop();
            driver.await.expect("Driver panicked");
            assert!(matches!(sharing.await, Err(ClientError::SessionClosed)));

            // The relay answering late must not resurrect the visit.
            connector.open_gate();
            tokio::task::yield_now().await;
        })
        .await;

    assert!(connector.sent().is_empty());
    assert_eq!(connector.closes(), 0);
    assert_eq!(
        observed.statuses(),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Idle]
    );
}

#[tokio::test]
async fn test_driver_shares_once_channel_opens() {
    init_tracing();

    let backend = FakeBackend::new();
    let connector = FakeConnector::gated();
    let session = FakePeerSession::new(config(Role::Sender), backend.clone());
    let (handle, commands) = session_handle();

    LocalSet::new()
        .run_until(async {
            let driver =
                tokio::task::spawn_local(run_session(session, connector.clone(), commands));

            let mut sharing = Box::pin(handle.start_sharing());
            assert!(futures::poll!(sharing.as_mut()).is_pending());
            tokio::task::yield_now().await;
            assert!(connector.sent().is_empty());

            connector.open_gate();
            let stream = sharing.await.expect("Sharing failed");
            assert_eq!(stream, Some(FakeStream("local")));
            assert_eq!(kinds(&connector.take_sent()), vec!["join", "offer"]);

            handle.stop();
            driver.await.expect("Driver panicked");
        })
        .await;

    assert_eq!(backend.log.borrow().capture_stops, 1);
    assert_eq!(connector.closes(), 1);
}
