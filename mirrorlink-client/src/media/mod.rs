use crate::config::IceServerConfig;
use crate::error::Result;
use async_trait::async_trait;
use futures::channel::mpsc;
use mirrorlink_core::{IceCandidate, SessionDescription};

/// Things the media layer reports back to the negotiation layer.
#[derive(Debug)]
pub enum MediaEvent<S> {
    /// A local network-path descriptor was discovered; trickle it out.
    CandidateDiscovered(IceCandidate),
    /// Inbound media arrived on the session.
    RemoteStream(S),
    /// The media transport reports a usable path.
    PathEstablished,
    /// The capture source ended on its own (the device's "stop sharing").
    CaptureEnded,
}

pub type MediaEventSender<S> = mpsc::UnboundedSender<MediaEvent<S>>;
pub type MediaEventReceiver<S> = mpsc::UnboundedReceiver<MediaEvent<S>>;

/// The local session object of one visit (a peer connection).
#[async_trait(?Send)]
pub trait MediaSession {
    type Capture;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: &SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<()>;

    /// Binds the captured track(s) to the outgoing side of the session.
    async fn attach(&self, capture: &Self::Capture) -> Result<()>;

    async fn close(&self);
}

/// A running local capture.
pub trait LocalCapture {
    /// Handle the presentation layer can preview.
    type Stream: Clone + 'static;

    fn stream(&self) -> Self::Stream;

    /// Stops every captured track. Safe to call more than once.
    fn stop(&self);
}

/// Platform glue: builds session objects and acquires captures, reporting
/// asynchronous happenings through the given event sender.
#[async_trait(?Send)]
pub trait MediaBackend: Clone + 'static {
    type RemoteStream: 'static;
    type Capture: LocalCapture + 'static;
    type Session: MediaSession<Capture = Self::Capture> + 'static;

    async fn open_session(
        &self,
        ice_servers: &[IceServerConfig],
        events: MediaEventSender<Self::RemoteStream>,
    ) -> Result<Self::Session>;

    /// Video-only display capture. Denial maps to
    /// [`ClientError::CapturePermissionDenied`](crate::ClientError::CapturePermissionDenied).
    async fn capture_display(
        &self,
        events: MediaEventSender<Self::RemoteStream>,
    ) -> Result<Self::Capture>;
}

pub type LocalStream<B> = <<B as MediaBackend>::Capture as LocalCapture>::Stream;
