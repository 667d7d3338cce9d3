use crate::config::IceServerConfig;
use crate::error::{ClientError, Result};
use crate::media::{LocalCapture, MediaBackend, MediaEvent, MediaEventSender, MediaSession};
use anyhow::{Context, bail};
use async_trait::async_trait;
use mirrorlink_core::{IceCandidate, SdpKind, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

const CAPTURE_TRACK_ID: &str = "screen";
const CAPTURE_STREAM_ID: &str = "mirrorlink";

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

/// Video track fed by whoever grabs frames (`track().write_sample(..)`).
pub struct SampleCapture {
    track: Arc<TrackLocalStaticSample>,
    events: MediaEventSender<Arc<TrackRemote>>,
    stopped: Arc<AtomicBool>,
}

impl SampleCapture {
    pub fn track(&self) -> Arc<TrackLocalStaticSample> {
        self.track.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// The frame source dried up. Ends the visit the same way the browser's
    /// "stop sharing" button does.
    pub fn end(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            let _ = self.events.unbounded_send(MediaEvent::CaptureEnded);
        }
    }
}

impl LocalCapture for SampleCapture {
    type Stream = Arc<TrackLocalStaticSample>;

    fn stream(&self) -> Self::Stream {
        self.track()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub struct NativeSession {
    peer_connection: Arc<RTCPeerConnection>,
}

impl NativeSession {
    async fn new(
        ice_servers: &[IceServerConfig],
        events: MediaEventSender<Arc<TrackRemote>>,
    ) -> anyhow::Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                info!("Peer connection state changed: {:?}", state);
                if state == RTCPeerConnectionState::Connected {
                    let _ = state_tx.unbounded_send(MediaEvent::PathEstablished);
                }
                Box::pin(async {})
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            if let Some(candidate) = c {
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = ice_tx.unbounded_send(MediaEvent::CandidateDiscovered(
                            IceCandidate {
                                candidate: init.candidate,
                                sdp_mid: init.sdp_mid,
                                sdp_m_line_index: init.sdp_mline_index,
                                username_fragment: init.username_fragment,
                            },
                        ));
                    }
                    Err(e) => warn!("Failed to serialize local candidate: {}", e),
                }
            }
            Box::pin(async {})
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            debug!("Remote track received: kind={}, ssrc={}", track.kind(), track.ssrc());
            let _ = track_tx.unbounded_send(MediaEvent::RemoteStream(track));
            Box::pin(async {})
        }));

        Ok(Self { peer_connection })
    }
}

fn to_rtc_description(desc: &SessionDescription) -> anyhow::Result<RTCSessionDescription> {
    let sdp = desc.sdp.clone();
    Ok(match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
        SdpKind::Pranswer => RTCSessionDescription::pranswer(sdp)?,
        SdpKind::Rollback => bail!("rollback descriptions are not supported"),
    })
}

fn negotiation<E: std::fmt::Display>(err: E) -> ClientError {
    ClientError::NegotiationFailure(err.to_string())
}

#[async_trait(?Send)]
impl MediaSession for NativeSession {
    type Capture = SampleCapture;

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(negotiation)?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(negotiation)?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: &SessionDescription) -> Result<()> {
        let desc = to_rtc_description(desc).map_err(negotiation)?;
        self.peer_connection
            .set_local_description(desc)
            .await
            .map_err(negotiation)
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<()> {
        let desc = to_rtc_description(desc).map_err(negotiation)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(negotiation)
    }

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment.clone(),
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(negotiation)
    }

    async fn attach(&self, capture: &SampleCapture) -> Result<()> {
        self.peer_connection
            .add_track(capture.track() as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(negotiation)?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.peer_connection.close().await {
            warn!("Failed to close peer connection: {}", e);
        }
    }
}

#[async_trait(?Send)]
impl MediaBackend for NativeBackend {
    type RemoteStream = Arc<TrackRemote>;
    type Capture = SampleCapture;
    type Session = NativeSession;

    async fn open_session(
        &self,
        ice_servers: &[IceServerConfig],
        events: MediaEventSender<Arc<TrackRemote>>,
    ) -> Result<NativeSession> {
        NativeSession::new(ice_servers, events)
            .await
            .map_err(|e| ClientError::NegotiationFailure(format!("{e:#}")))
    }

    async fn capture_display(
        &self,
        events: MediaEventSender<Arc<TrackRemote>>,
    ) -> Result<SampleCapture> {
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            CAPTURE_TRACK_ID.to_owned(),
            CAPTURE_STREAM_ID.to_owned(),
        ));
        Ok(SampleCapture {
            track,
            events,
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }
}
