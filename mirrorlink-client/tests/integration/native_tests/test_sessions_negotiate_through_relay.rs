use mirrorlink_client::native::{NativeBackend, WsChannel, WsConnector};
use mirrorlink_client::{
    ClientError, ConnectionStatus, PeerSession, Role, RoomId, SessionConfig, run_session,
    session_handle,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use webrtc::media::Sample;
use webrtc::track::track_local::TrackLocal;

use crate::integration::init_tracing;
use crate::utils::{LocalRelay, ROOM, wait_within};

type RelayedSession = PeerSession<NativeBackend, WsChannel>;

struct Seen {
    statuses: Rc<RefCell<Vec<ConnectionStatus>>>,
    errors: Rc<RefCell<Vec<ClientError>>>,
}

fn relayed(url: &str, role: Role) -> (RelayedSession, Seen) {
    let config = SessionConfig::new(url, RoomId::from(ROOM), role)
        .with_open_timeout(Duration::from_secs(2))
        .with_ice_servers(Vec::new());
    let mut session = RelayedSession::new(config, NativeBackend);

    let seen = Seen {
        statuses: Rc::new(RefCell::new(Vec::new())),
        errors: Rc::new(RefCell::new(Vec::new())),
    };
    let statuses = seen.statuses.clone();
    session.on_status(move |s| statuses.borrow_mut().push(s));
    let errors = seen.errors.clone();
    session.on_error(move |e| errors.borrow_mut().push(e));
    (session, seen)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sessions_negotiate_through_relay() {
    init_tracing();

    let relay = LocalRelay::start().await.expect("Failed to start relay");
    let (viewer, viewer_seen) = relayed(&relay.url(), Role::Viewer);
    let (sender, sender_seen) = relayed(&relay.url(), Role::Sender);
    let (viewer_handle, viewer_commands) = session_handle();
    let (sender_handle, sender_commands) = session_handle();

    LocalSet::new()
        .run_until(async {
            let viewer_task =
                tokio::task::spawn_local(run_session(viewer, WsConnector, viewer_commands));
            relay.wait_for_members(ROOM, 1).await.expect("Viewer never joined");

            let sender_task =
                tokio::task::spawn_local(run_session(sender, WsConnector, sender_commands));
            relay.wait_for_members(ROOM, 2).await.expect("Sender never joined");

            let track = sender_handle
                .start_sharing()
                .await
                .expect("Sharing failed")
                .expect("Capture declined");
            assert_eq!(track.id(), "screen");

            // Frames only flow once DTLS is up, so keep writing until then.
            let feeder = tokio::task::spawn_local(async move {
                let frame = Sample {
                    data: vec![0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a].into(),
                    duration: Duration::from_millis(33),
                    ..Default::default()
                };
                loop {
                    if track.write_sample(&frame).await.is_err() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(33)).await;
                }
            });

            wait_within(Duration::from_secs(15), || {
                viewer_seen.statuses.borrow().contains(&ConnectionStatus::Connected)
            })
            .await;
            wait_within(Duration::from_secs(15), || {
                sender_seen.statuses.borrow().contains(&ConnectionStatus::Connected)
            })
            .await;
            feeder.abort();

            sender_handle.stop();
            viewer_handle.stop();
            sender_task.await.expect("Sender driver panicked");
            viewer_task.await.expect("Viewer driver panicked");
        })
        .await;

    assert_eq!(
        viewer_seen.statuses.borrow()[..3],
        [
            ConnectionStatus::Connecting,
            ConnectionStatus::Idle,
            ConnectionStatus::Connecting,
        ]
    );
    assert_eq!(
        viewer_seen.statuses.borrow()[3],
        ConnectionStatus::Connected
    );
    assert!(!viewer_seen.statuses.borrow().contains(&ConnectionStatus::Error));
    assert!(!sender_seen.statuses.borrow().contains(&ConnectionStatus::Error));
    assert!(viewer_seen.errors.borrow().is_empty());
    assert!(sender_seen.errors.borrow().is_empty());

    relay.wait_for_members(ROOM, 0).await.expect("Room outlived its members");
}
