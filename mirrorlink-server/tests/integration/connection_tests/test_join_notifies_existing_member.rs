use mirrorlink_core::{Role, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{RECV_TIMEOUT_MS, SILENCE_MS, TestServer, join, join_room};

#[tokio::test]
async fn test_join_notifies_existing_member() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start relay");

    let mut viewer = join_room(&server, "ab12xyz", Role::Viewer, 1)
        .await
        .expect("Viewer failed to join");
    let mut sender = join_room(&server, "ab12xyz", Role::Sender, 2)
        .await
        .expect("Sender failed to join");

    let notice = viewer.recv(RECV_TIMEOUT_MS).await.expect("No join notice");
    assert_eq!(notice, join("ab12xyz", Role::Sender));
    assert!(matches!(notice, SignalMessage::Join { .. }));

    sender
        .expect_silence(SILENCE_MS)
        .await
        .expect("Joiner must not receive its own notice");

    viewer.close().await.expect("Failed to close viewer");
    sender.close().await.expect("Failed to close sender");
}
