use crate::channel::{SignalChannel, SignalConnector};
use crate::error::{ClientError, Result};
use crate::media::{LocalStream, MediaBackend};
use crate::session::peer_session::PeerSession;
use crate::session::state::NegotiationState;
use futures::channel::{mpsc, oneshot};
use futures::future::{Fuse, FusedFuture, LocalBoxFuture, OptionFuture};
use futures::{FutureExt, StreamExt};
use tracing::{debug, info};

type CaptureReply<S> = oneshot::Sender<Result<Option<S>>>;
type PendingCapture<B> =
    OptionFuture<Fuse<LocalBoxFuture<'static, Result<<B as MediaBackend>::Capture>>>>;

pub enum Command<S> {
    /// Capture the display, then offer. Replies with the local stream, or
    /// `None` when the user declined.
    StartSharing(Option<CaptureReply<S>>),
    Stop,
}

/// Presentation-side handle onto a running [`run_session`] loop.
pub struct SessionHandle<S> {
    commands: mpsc::UnboundedSender<Command<S>>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<S> SessionHandle<S> {
    pub async fn start_sharing(&self) -> Result<Option<S>> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .unbounded_send(Command::StartSharing(Some(tx)))
            .map_err(|_| ClientError::SessionClosed)?;
        rx.await.map_err(|_| ClientError::SessionClosed)?
    }

    pub fn stop(&self) {
        let _ = self.commands.unbounded_send(Command::Stop);
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

pub fn session_handle<S>() -> (SessionHandle<S>, mpsc::UnboundedReceiver<Command<S>>) {
    let (commands, rx) = mpsc::unbounded();
    (SessionHandle { commands }, rx)
}

/// Drives one room visit until it is stopped, the handle is dropped or the
/// session tears itself down.
///
/// Commands, inbound frames, media events and a pending capture prompt are
/// handled one at a time, each to completion, so the session never sees two
/// of them interleave.
pub async fn run_session<B, K>(
    mut session: PeerSession<B, K::Channel>,
    connector: K,
    mut commands: mpsc::UnboundedReceiver<Command<LocalStream<B>>>,
) where
    B: MediaBackend,
    K: SignalConnector,
{
    let Some(events) = session.take_media_events() else {
        debug!("Media events already taken, nothing to drive");
        return;
    };

    // Sharing requests made while the channel opens wait for the join.
    let mut deferred = Vec::new();
    let entered = {
        let enter = session.enter(&connector).fuse();
        futures::pin_mut!(enter);
        loop {
            futures::select! {
                result = enter => break Some(result),
                command = commands.next() => match command {
                    Some(Command::StartSharing(reply)) => deferred.push(reply),
                    Some(Command::Stop) | None => break None,
                },
            }
        }
    };

    let inbound = match entered {
        Some(Ok(inbound)) => inbound,
        Some(Err(err)) => {
            debug!("Room entry failed: {}", err);
            for reply in deferred {
                reply_with(reply, Err(err.clone()));
            }
            // Keep the error status visible until the presentation side lets go.
            while let Some(command) = commands.next().await {
                match command {
                    Command::StartSharing(reply) => reply_with(reply, Err(err.clone())),
                    Command::Stop => break,
                }
            }
            session.close().await;
            return;
        }
        None => {
            info!("Left room {} before the signaling channel opened", session.room_id());
            for reply in deferred {
                reply_with(reply, Err(ClientError::SessionClosed));
            }
            session.close().await;
            return;
        }
    };

    let mut inbound = inbound.fuse();
    let mut events = events.fuse();
    let mut capture: PendingCapture<B> = None.into();
    let mut capture_reply: Option<CaptureReply<LocalStream<B>>> = None;
    for reply in deferred {
        start_sharing(&session, &mut capture, &mut capture_reply, reply);
    }

    loop {
        futures::select! {
            command = commands.next() => match command {
                Some(Command::StartSharing(reply)) => {
                    start_sharing(&session, &mut capture, &mut capture_reply, reply);
                }
                Some(Command::Stop) | None => break,
            },
            result = capture => {
                let Some(result) = result else { continue };
                let outcome = match session.finish_capture(result) {
                    Ok(Some(stream)) => session.create_offer().await.map(|()| Some(stream)),
                    other => other,
                };
                reply_with(capture_reply.take(), outcome);
            },
            msg = inbound.next() => match msg {
                Some(msg) => {
                    let _ = session.handle_signal(msg).await;
                }
                None => session.on_channel_lost(),
            },
            event = events.next() => match event {
                Some(event) => session.handle_media_event(event).await,
                None => break,
            },
        }

        if session.state() == NegotiationState::Closed {
            break;
        }
    }

    info!("Session driver for room {} stopping", session.room_id());
    session.close().await;
}

fn start_sharing<B, C>(
    session: &PeerSession<B, C>,
    capture: &mut PendingCapture<B>,
    capture_reply: &mut Option<CaptureReply<LocalStream<B>>>,
    reply: Option<CaptureReply<LocalStream<B>>>,
) where
    B: MediaBackend,
    C: SignalChannel,
{
    if !capture.is_terminated() {
        debug!("Capture already pending");
        reply_with(
            reply,
            Err(ClientError::ProtocolViolation("capture already pending".into())),
        );
        return;
    }
    match session.begin_capture() {
        Ok(request) => {
            *capture = Some(request.fuse()).into();
            *capture_reply = reply;
        }
        Err(err) => reply_with(reply, Err(err)),
    }
}

fn reply_with<S>(reply: Option<CaptureReply<S>>, outcome: Result<Option<S>>) {
    if let Some(reply) = reply {
        let _ = reply.send(outcome);
    }
}
