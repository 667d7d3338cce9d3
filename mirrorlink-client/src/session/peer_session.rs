use crate::channel::{InboundSignals, SignalChannel, SignalConnector};
use crate::config::SessionConfig;
use crate::error::{ClientError, Result};
use crate::media::{
    LocalCapture, LocalStream, MediaBackend, MediaEvent, MediaEventReceiver, MediaEventSender,
    MediaSession,
};
use crate::session::candidate_queue::CandidateQueue;
use crate::session::listener::ListenerSlot;
use crate::session::state::NegotiationState;
use futures::FutureExt;
use futures::channel::mpsc;
use futures::future::LocalBoxFuture;
use mirrorlink_core::{
    ConnectionStatus, IceCandidate, Role, RoomId, SdpKind, SessionDescription, SignalMessage,
};
use tracing::{debug, error, info, warn};

/// One room visit for one role.
///
/// Owns the signaling channel, the media session, the capture and the
/// listener slots. Never reused: leaving the room means [`close`](Self::close)
/// and building a new one for the next visit.
pub struct PeerSession<B: MediaBackend, C: SignalChannel> {
    config: SessionConfig,
    backend: B,
    state: NegotiationState,
    channel: Option<C>,
    media: Option<B::Session>,
    capture: Option<B::Capture>,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    candidates: CandidateQueue,
    sent_candidates: Vec<IceCandidate>,
    events_tx: MediaEventSender<B::RemoteStream>,
    events_rx: Option<MediaEventReceiver<B::RemoteStream>>,
    remote_stream: ListenerSlot<B::RemoteStream>,
    status_listener: ListenerSlot<ConnectionStatus>,
    error_listener: ListenerSlot<ClientError>,
    last_status: ConnectionStatus,
    stream_delivered: bool,
}

impl<B: MediaBackend, C: SignalChannel> PeerSession<B, C> {
    pub fn new(config: SessionConfig, backend: B) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded();
        Self {
            config,
            backend,
            state: NegotiationState::Idle,
            channel: None,
            media: None,
            capture: None,
            local_description: None,
            remote_description: None,
            candidates: CandidateQueue::new(),
            sent_candidates: Vec::new(),
            events_tx,
            events_rx: Some(events_rx),
            remote_stream: ListenerSlot::new(),
            status_listener: ListenerSlot::new(),
            error_listener: ListenerSlot::new(),
            last_status: ConnectionStatus::Idle,
            stream_delivered: false,
        }
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    pub fn room_id(&self) -> &RoomId {
        &self.config.room_id
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    pub fn is_sharing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub fn queued_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Receiver for what the media layer reports. Handed out once; whoever
    /// holds it feeds the events back through
    /// [`handle_media_event`](Self::handle_media_event).
    pub fn take_media_events(&mut self) -> Option<MediaEventReceiver<B::RemoteStream>> {
        self.events_rx.take()
    }

    pub fn on_remote_stream(&mut self, callback: impl FnMut(B::RemoteStream) + 'static) {
        self.remote_stream.set(callback);
    }

    pub fn on_status(&mut self, callback: impl FnMut(ConnectionStatus) + 'static) {
        self.status_listener.set(callback);
    }

    /// Errors that reach the user: unreachable relay, failed capture, failed
    /// negotiation.
    pub fn on_error(&mut self, callback: impl FnMut(ClientError) + 'static) {
        self.error_listener.set(callback);
    }

    /// Opens the signaling channel and announces this endpoint in the room.
    pub async fn enter<K>(&mut self, connector: &K) -> Result<InboundSignals>
    where
        K: SignalConnector<Channel = C>,
    {
        if self.state != NegotiationState::Idle || self.channel.is_some() {
            return Err(ClientError::ProtocolViolation(
                "session already entered its room".into(),
            ));
        }

        self.set_state(NegotiationState::Connecting);
        let (channel, inbound) = match connector
            .connect(&self.config.url, self.config.open_timeout)
            .await
        {
            Ok(opened) => opened,
            Err(err) => return Err(self.fail(err)),
        };

        info!("Joined signaling for room {} as {}", self.config.room_id, self.config.role);
        self.channel = Some(channel);
        self.set_state(NegotiationState::Idle);
        self.send(SignalMessage::Join {
            room_id: self.config.room_id.clone(),
            sender: Some(self.config.role),
        });
        Ok(inbound)
    }

    /// Starts a display capture request. The returned future owns everything
    /// it needs, so it can be dropped to abandon the prompt.
    pub fn begin_capture(&self) -> Result<LocalBoxFuture<'static, Result<B::Capture>>> {
        if self.config.role != Role::Sender {
            return Err(ClientError::ProtocolViolation("viewers do not capture".into()));
        }
        if self.state != NegotiationState::Idle || self.capture.is_some() {
            return Err(ClientError::ProtocolViolation(format!(
                "cannot capture in state {}",
                self.state
            )));
        }

        let backend = self.backend.clone();
        let events = self.events_tx.clone();
        Ok(async move { backend.capture_display(events).await }.boxed_local())
    }

    /// Takes the outcome of [`begin_capture`](Self::begin_capture).
    ///
    /// `Ok(None)` means the user declined and nothing changed.
    pub fn finish_capture(
        &mut self,
        result: Result<B::Capture>,
    ) -> Result<Option<LocalStream<B>>> {
        let capture = match result {
            Ok(capture) => capture,
            Err(ClientError::CapturePermissionDenied) => {
                info!("Screen capture was declined");
                return Ok(None);
            }
            Err(err) => {
                warn!("Screen capture failed: {}", err);
                self.error_listener.emit(err.clone());
                return Err(err);
            }
        };

        if self.state.is_terminal() || self.capture.is_some() {
            debug!("Capture resolved after it stopped being wanted, stopping it");
            capture.stop();
            return Err(ClientError::SessionClosed);
        }

        let stream = capture.stream();
        self.capture = Some(capture);
        Ok(Some(stream))
    }

    pub async fn start_capture(&mut self) -> Result<Option<LocalStream<B>>> {
        let request = self.begin_capture()?;
        let result = request.await;
        self.finish_capture(result)
    }

    /// Builds the media session around the capture, generates the offer,
    /// installs it locally and sends it.
    pub async fn create_offer(&mut self) -> Result<()> {
        if self.config.role != Role::Sender {
            return Err(ClientError::ProtocolViolation("viewers do not offer".into()));
        }
        if self.state != NegotiationState::Idle || self.local_description.is_some() {
            return Err(ClientError::ProtocolViolation(format!(
                "cannot offer in state {}",
                self.state
            )));
        }
        if self.capture.is_none() {
            return Err(ClientError::ProtocolViolation("no capture to offer".into()));
        }

        let offer = match self.negotiate_offer().await {
            Ok(offer) => offer,
            Err(err) => return Err(self.fail(err)),
        };

        info!("Sending offer to room {}", self.config.room_id);
        self.local_description = Some(offer.clone());
        self.set_state(NegotiationState::Offering);
        self.send(SignalMessage::Offer {
            room_id: self.config.room_id.clone(),
            sender: self.config.role,
            payload: offer,
        });
        Ok(())
    }

    /// Viewer side of the exchange: install the offer, apply what was
    /// queued, answer.
    pub async fn handle_offer(&mut self, offer: SessionDescription) -> Result<()> {
        if self.config.role != Role::Viewer {
            return self.drop_violation("offer received by a sender");
        }
        if offer.kind != SdpKind::Offer {
            return self.drop_violation("offer frame without an offer description");
        }
        if self.state != NegotiationState::Idle || self.remote_description.is_some() {
            return self.drop_violation("second offer in one visit");
        }

        info!("Received offer in room {}", self.config.room_id);
        self.set_state(NegotiationState::Answering);

        if let Err(err) = self.open_media().await {
            return Err(self.fail(err));
        }
        self.install_remote(offer).await?;

        let answer = match self.negotiate_answer().await {
            Ok(answer) => answer,
            Err(err) => return Err(self.fail(err)),
        };

        info!("Sending answer to room {}", self.config.room_id);
        self.local_description = Some(answer.clone());
        self.send(SignalMessage::Answer {
            room_id: self.config.room_id.clone(),
            sender: self.config.role,
            payload: answer,
        });
        Ok(())
    }

    /// Routes one inbound frame.
    pub async fn handle_signal(&mut self, msg: SignalMessage) -> Result<()> {
        if self.state.is_terminal() {
            debug!("Discarding {} received after teardown", msg.kind());
            return Ok(());
        }
        if msg.room_id() != &self.config.room_id {
            return self.drop_violation("frame for another room");
        }
        if msg.sender() == Some(self.config.role) {
            debug!("Ignoring {} from another {}", msg.kind(), self.config.role);
            return Ok(());
        }

        match msg {
            SignalMessage::Join { sender, .. } => {
                self.on_peer_arrived(sender);
                Ok(())
            }
            SignalMessage::Ready { .. } => {
                if self.config.role == Role::Sender {
                    self.redeliver_offer();
                }
                Ok(())
            }
            SignalMessage::Offer { payload, .. } => self.handle_offer(payload).await,
            SignalMessage::Answer { payload, .. } => self.handle_answer(payload).await,
            SignalMessage::Candidate { payload, .. } => self.handle_remote_candidate(payload).await,
        }
    }

    pub async fn handle_media_event(&mut self, event: MediaEvent<B::RemoteStream>) {
        if self.state.is_terminal() {
            debug!("Discarding media event after teardown");
            return;
        }

        match event {
            MediaEvent::CandidateDiscovered(candidate) => {
                debug!("Sending local candidate: {}", candidate.candidate);
                self.sent_candidates.push(candidate.clone());
                self.send(SignalMessage::Candidate {
                    room_id: self.config.room_id.clone(),
                    sender: self.config.role,
                    payload: candidate,
                });
            }
            MediaEvent::RemoteStream(stream) => {
                if !self.stream_delivered {
                    info!("Remote stream arrived");
                    self.stream_delivered = true;
                    self.remote_stream.emit(stream);
                }
                self.mark_connected();
            }
            MediaEvent::PathEstablished => {
                // A send-only sender never sees an inbound track.
                if self.config.role == Role::Sender {
                    self.mark_connected();
                }
            }
            MediaEvent::CaptureEnded => {
                info!("Capture ended from the device, tearing down");
                self.close().await;
            }
        }
    }

    /// The relay went away. Media keeps flowing if it already does.
    pub fn on_channel_lost(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        warn!("Signaling channel to {} closed", self.config.url);
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
    }

    /// Stops the capture, closes the media session and the channel, and
    /// clears the listeners. The peer is not notified. Safe to call again.
    pub async fn close(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }

        if let Some(capture) = self.capture.take() {
            capture.stop();
        }
        self.remote_stream.clear();
        self.events_tx.close_channel();
        self.candidates.clear();

        if let Some(media) = self.media.take() {
            media.close().await;
        }
        if let Some(channel) = self.channel.take() {
            channel.close();
        }

        info!("Left room {}", self.config.room_id);
        self.set_state(NegotiationState::Closed);
        self.status_listener.clear();
        self.error_listener.clear();
    }

    async fn handle_answer(&mut self, answer: SessionDescription) -> Result<()> {
        if self.config.role != Role::Sender {
            return self.drop_violation("answer received by a viewer");
        }
        if answer.kind != SdpKind::Answer {
            return self.drop_violation("answer frame without an answer description");
        }
        if self.state != NegotiationState::Offering || self.remote_description.is_some() {
            return self.drop_violation("unexpected answer");
        }

        info!("Received answer in room {}", self.config.room_id);
        self.install_remote(answer).await
    }

    async fn handle_remote_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        match self.candidates.admit(candidate) {
            Some(candidate) => self.apply_candidate(&candidate).await,
            None => {
                debug!("Queued remote candidate ({} waiting)", self.candidates.len());
                Ok(())
            }
        }
    }

    fn on_peer_arrived(&mut self, role: Option<Role>) {
        match self.config.role {
            Role::Viewer => {
                if role.is_none_or(|r| r == Role::Viewer.counterpart()) {
                    debug!("Sender joined, announcing readiness");
                    self.send(SignalMessage::Ready {
                        room_id: self.config.room_id.clone(),
                        sender: Some(Role::Viewer),
                    });
                }
            }
            Role::Sender => self.redeliver_offer(),
        }
    }

    /// Sends the pending offer again, with the candidates that went out
    /// alongside it, for a viewer that was not there the first time.
    fn redeliver_offer(&mut self) {
        if self.state != NegotiationState::Offering || self.remote_description.is_some() {
            return;
        }
        let Some(offer) = self.local_description.clone() else {
            return;
        };

        info!(
            "Viewer arrived in room {}, re-sending offer with {} candidates",
            self.config.room_id,
            self.sent_candidates.len()
        );
        self.send(SignalMessage::Offer {
            room_id: self.config.room_id.clone(),
            sender: self.config.role,
            payload: offer,
        });
        for candidate in self.sent_candidates.clone() {
            self.send(SignalMessage::Candidate {
                room_id: self.config.room_id.clone(),
                sender: self.config.role,
                payload: candidate,
            });
        }
    }

    async fn open_media(&mut self) -> Result<()> {
        if self.media.is_none() {
            let session = self
                .backend
                .open_session(&self.config.ice_servers, self.events_tx.clone())
                .await?;
            self.media = Some(session);
        }
        Ok(())
    }

    async fn negotiate_offer(&mut self) -> Result<SessionDescription> {
        self.open_media().await?;
        let (Some(media), Some(capture)) = (self.media.as_ref(), self.capture.as_ref()) else {
            return Err(ClientError::SessionClosed);
        };

        media.attach(capture).await?;
        let offer = media.create_offer().await?;
        media.set_local_description(&offer).await?;
        Ok(offer)
    }

    async fn negotiate_answer(&mut self) -> Result<SessionDescription> {
        let Some(media) = self.media.as_ref() else {
            return Err(ClientError::SessionClosed);
        };

        let answer = media.create_answer().await?;
        media.set_local_description(&answer).await?;
        Ok(answer)
    }

    /// Installs the remote description, then releases queued candidates in
    /// arrival order.
    async fn install_remote(&mut self, desc: SessionDescription) -> Result<()> {
        let installed = match self.media.as_ref() {
            Some(media) => media.set_remote_description(&desc).await,
            None => Err(ClientError::SessionClosed),
        };
        if let Err(err) = installed {
            return Err(self.fail(err));
        }
        self.remote_description = Some(desc);

        let queued = self.candidates.release();
        if !queued.is_empty() {
            debug!("Applying {} queued remote candidates", queued.len());
        }
        for candidate in queued {
            self.apply_candidate(&candidate).await?;
        }
        Ok(())
    }

    async fn apply_candidate(&mut self, candidate: &IceCandidate) -> Result<()> {
        let applied = match self.media.as_ref() {
            Some(media) => media.add_ice_candidate(candidate).await,
            None => Err(ClientError::SessionClosed),
        };
        match applied {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Viewers arrive here on their first remote track, senders once the
    /// media transport reports connected.
    fn mark_connected(&mut self) {
        if matches!(
            self.state,
            NegotiationState::Offering | NegotiationState::Answering
        ) {
            info!("Media path up in room {}", self.config.room_id);
            self.set_state(NegotiationState::Connected);
        }
    }

    fn send(&self, msg: SignalMessage) {
        let Some(channel) = self.channel.as_ref() else {
            warn!("No signaling channel, dropping {}", msg.kind());
            return;
        };
        if let Err(err) = channel.send(&msg) {
            warn!("Failed to send {}: {}", msg.kind(), err);
        }
    }

    fn drop_violation(&self, what: &str) -> Result<()> {
        warn!("Dropping frame in state {}: {}", self.state, what);
        Ok(())
    }

    /// Moves to `Error` and surfaces `err`. Hands it back for returning.
    fn fail(&mut self, err: ClientError) -> ClientError {
        error!("Session in room {} failed: {}", self.config.room_id, err);
        self.set_state(NegotiationState::Error);
        self.error_listener.emit(err.clone());
        err
    }

    fn set_state(&mut self, next: NegotiationState) {
        if self.state == next {
            return;
        }
        debug!("{} -> {}", self.state, next);
        self.state = next;

        let status = next.status();
        if status != self.last_status {
            self.last_status = status;
            self.status_listener.emit(status);
        }
    }
}
