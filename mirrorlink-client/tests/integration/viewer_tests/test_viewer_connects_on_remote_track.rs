use mirrorlink_client::{
    ConnectionStatus, MediaEvent, NegotiationState, Role, RoomId, SdpKind, SignalMessage,
};

use crate::integration::init_tracing;
use crate::utils::{
    FakeBackend, FakeConnector, FakeStream, ROOM, entered, join_from, kinds, offer_from_sender,
};

#[tokio::test]
async fn test_viewer_connects_on_remote_track() {
    init_tracing();

    let backend = FakeBackend::new();
    let connector = FakeConnector::new();
    let (mut session, observed) = entered(Role::Viewer, &backend, &connector).await;
    assert_eq!(connector.take_sent(), vec![join_from(Role::Viewer)]);

    // Sender arrives after us: we tell it we are here.
    session
        .handle_signal(join_from(Role::Sender))
        .await
        .expect("Join rejected");
    assert_eq!(
        connector.take_sent(),
        vec![SignalMessage::Ready {
            room_id: RoomId::from(ROOM),
            sender: Some(Role::Viewer),
        }]
    );

    session
        .handle_signal(offer_from_sender())
        .await
        .expect("Offer rejected");

    assert_eq!(session.state(), NegotiationState::Answering);
    assert_eq!(
        backend.calls(),
        vec!["set_remote:Offer", "create_answer", "set_local:Answer"]
    );
    let sent = connector.take_sent();
    assert_eq!(kinds(&sent), vec!["answer"]);
    let SignalMessage::Answer { sender, payload, .. } = &sent[0] else {
        panic!("expected answer, got {:?}", sent[0]);
    };
    assert_eq!(*sender, Role::Viewer);
    assert_eq!(payload.kind, SdpKind::Answer);

    session
        .handle_media_event(MediaEvent::RemoteStream(FakeStream("screen")))
        .await;
    assert_eq!(session.state(), NegotiationState::Connected);

    // Further tracks do not re-deliver.
    session
        .handle_media_event(MediaEvent::RemoteStream(FakeStream("screen-2")))
        .await;
    assert_eq!(observed.streams(), vec![FakeStream("screen")]);

    assert_eq!(
        observed.statuses(),
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Idle,
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
        ]
    );
    assert!(observed.errors().is_empty());
}
