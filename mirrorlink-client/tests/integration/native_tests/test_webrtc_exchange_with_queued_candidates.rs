use mirrorlink_client::native::NativeBackend;
use mirrorlink_client::{
    ClientError, IceCandidate, NegotiationState, PeerSession, Role, RoomId, SdpKind,
    SignalMessage,
};
use std::cell::RefCell;
use std::rc::Rc;

use crate::integration::init_tracing;
use crate::utils::{FakeChannel, FakeConnector, ROOM, config};

type NativePeerSession = PeerSession<NativeBackend, FakeChannel>;

fn synthetic_candidate(n: u16) -> SignalMessage {
    SignalMessage::Candidate {
        room_id: RoomId::from(ROOM),
        sender: Role::Sender,
        payload: IceCandidate {
            candidate: format!("candidate:{n} 1 udp 2122252543 192.168.0.10 5432{n} typ host"),
            sdp_mid: Some("0".to_owned()),
            sdp_m_line_index: Some(0),
            username_fragment: None,
        },
    }
}

fn session(role: Role) -> (NativePeerSession, Rc<RefCell<Vec<ClientError>>>) {
    let mut session =
        NativePeerSession::new(config(role).with_ice_servers(Vec::new()), NativeBackend);
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    session.on_error(move |e| sink.borrow_mut().push(e));
    (session, errors)
}

fn take_one(connector: &FakeConnector, kind: &str) -> SignalMessage {
    connector
        .take_sent()
        .into_iter()
        .find(|m| m.kind().to_string() == kind)
        .unwrap_or_else(|| panic!("No {kind} was sent"))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_webrtc_exchange_with_queued_candidates() {
    init_tracing();

    let sender_wire = FakeConnector::new();
    let viewer_wire = FakeConnector::new();
    let (mut sender, sender_errors) = session(Role::Sender);
    let (mut viewer, viewer_errors) = session(Role::Viewer);

    sender.enter(&sender_wire).await.expect("Sender failed to enter");
    viewer.enter(&viewer_wire).await.expect("Viewer failed to enter");

    sender
        .start_capture()
        .await
        .expect("Capture failed")
        .expect("Capture declined");
    sender.create_offer().await.expect("Offer failed");
    let offer = take_one(&sender_wire, "offer");

    // Three candidates overtake the offer.
    for n in 1..=3 {
        viewer
            .handle_signal(synthetic_candidate(n))
            .await
            .expect("Early candidate rejected");
    }
    assert_eq!(viewer.queued_candidates(), 3);

    viewer.handle_signal(offer).await.expect("Offer rejected");
    assert_eq!(viewer.state(), NegotiationState::Answering);
    assert_eq!(viewer.queued_candidates(), 0);
    assert!(viewer_errors.borrow().is_empty(), "{:?}", viewer_errors.borrow());

    let answer = take_one(&viewer_wire, "answer");
    let SignalMessage::Answer { payload, .. } = &answer else {
        panic!("expected answer, got {answer:?}");
    };
    assert_eq!(payload.kind, SdpKind::Answer);
    assert!(payload.sdp.starts_with("v=0"));

    sender.handle_signal(answer).await.expect("Answer rejected");
    assert!(sender.remote_description().is_some());
    assert_ne!(sender.state(), NegotiationState::Error);
    assert!(sender_errors.borrow().is_empty(), "{:?}", sender_errors.borrow());

    sender.close().await;
    viewer.close().await;
    assert_eq!(sender.state(), NegotiationState::Closed);
    assert_eq!(viewer.state(), NegotiationState::Closed);
}

