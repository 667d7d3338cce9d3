use crate::config::IceServerConfig;
use crate::error::{ClientError, Result};
use crate::media::{LocalCapture, MediaBackend, MediaEvent, MediaEventSender, MediaSession};
use crate::web::{describe, error_name};
use async_trait::async_trait;
use futures::channel::oneshot;
use js_sys::{Array, Promise, Reflect};
use mirrorlink_core::{IceCandidate, SdpKind, SessionDescription};
use tracing::{debug, info};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    DisplayMediaStreamConstraints, MediaStream, MediaStreamTrack, RtcConfiguration,
    RtcIceCandidateInit, RtcIceServer, RtcPeerConnection, RtcPeerConnectionIceEvent,
    RtcPeerConnectionState, RtcSdpType, RtcSessionDescriptionInit, RtcTrackEvent,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct WebBackend;

/// A `getDisplayMedia` stream whose video track ending tears the visit down.
pub struct DisplayCapture {
    stream: MediaStream,
    _on_ended: Closure<dyn FnMut(JsValue)>,
}

impl DisplayCapture {
    fn new(stream: MediaStream, events: MediaEventSender<MediaStream>) -> Self {
        let on_ended = Closure::<dyn FnMut(JsValue)>::new(move |_| {
            info!("Screen capture ended by the browser");
            let _ = events.unbounded_send(MediaEvent::CaptureEnded);
        });
        for track in tracks(&stream.get_video_tracks()) {
            track.set_onended(Some(on_ended.as_ref().unchecked_ref()));
        }
        Self {
            stream,
            _on_ended: on_ended,
        }
    }
}

impl LocalCapture for DisplayCapture {
    type Stream = MediaStream;

    fn stream(&self) -> MediaStream {
        self.stream.clone()
    }

    fn stop(&self) {
        stop_tracks(&self.stream);
    }
}

fn tracks(list: &Array) -> impl Iterator<Item = MediaStreamTrack> + '_ {
    list.iter().filter_map(|t| t.dyn_into::<MediaStreamTrack>().ok())
}

fn stop_tracks(stream: &MediaStream) {
    for track in tracks(&stream.get_tracks()) {
        track.set_onended(None);
        track.stop();
    }
}

pub struct WebSession {
    pc: RtcPeerConnection,
    _on_ice: Closure<dyn FnMut(RtcPeerConnectionIceEvent)>,
    _on_track: Closure<dyn FnMut(RtcTrackEvent)>,
    _on_state: Closure<dyn FnMut(JsValue)>,
}

impl WebSession {
    fn new(
        ice_servers: &[IceServerConfig],
        events: MediaEventSender<MediaStream>,
    ) -> std::result::Result<Self, JsValue> {
        let rtc_config = RtcConfiguration::new();
        let ice_servers_arr = Array::new();
        for server_config in ice_servers {
            let rtc_ice_server = RtcIceServer::new();

            let urls = Array::new();
            for url in &server_config.urls {
                urls.push(&JsValue::from_str(url));
            }
            rtc_ice_server.set_urls(&urls);

            if let Some(username) = &server_config.username {
                rtc_ice_server.set_username(username);
            }
            if let Some(credential) = &server_config.credential {
                rtc_ice_server.set_credential(credential);
            }

            ice_servers_arr.push(&rtc_ice_server);
        }
        rtc_config.set_ice_servers(&ice_servers_arr);

        let pc = RtcPeerConnection::new_with_configuration(&rtc_config)?;

        let ice_tx = events.clone();
        let on_ice = Closure::<dyn FnMut(RtcPeerConnectionIceEvent)>::new(
            move |ev: RtcPeerConnectionIceEvent| {
                if let Some(candidate) = ev.candidate() {
                    let _ = ice_tx.unbounded_send(MediaEvent::CandidateDiscovered(IceCandidate {
                        candidate: candidate.candidate(),
                        sdp_mid: candidate.sdp_mid(),
                        sdp_m_line_index: candidate.sdp_m_line_index(),
                        username_fragment: candidate.username_fragment(),
                    }));
                }
            },
        );
        pc.set_onicecandidate(Some(on_ice.as_ref().unchecked_ref()));

        let track_tx = events.clone();
        let on_track = Closure::<dyn FnMut(RtcTrackEvent)>::new(move |ev: RtcTrackEvent| {
            let stream = match ev.streams().get(0).dyn_into::<MediaStream>() {
                Ok(stream) => stream,
                Err(_) => match MediaStream::new() {
                    Ok(stream) => {
                        stream.add_track(&ev.track());
                        stream
                    }
                    Err(e) => {
                        debug!("Could not wrap remote track: {}", describe(&e));
                        return;
                    }
                },
            };
            let _ = track_tx.unbounded_send(MediaEvent::RemoteStream(stream));
        });
        pc.set_ontrack(Some(on_track.as_ref().unchecked_ref()));

        let state_tx = events;
        let state_pc = pc.clone();
        let on_state = Closure::<dyn FnMut(JsValue)>::new(move |_| {
            let state = state_pc.connection_state();
            debug!("Peer connection state changed: {:?}", state);
            if state == RtcPeerConnectionState::Connected {
                let _ = state_tx.unbounded_send(MediaEvent::PathEstablished);
            }
        });
        pc.set_onconnectionstatechange(Some(on_state.as_ref().unchecked_ref()));

        Ok(Self {
            pc,
            _on_ice: on_ice,
            _on_track: on_track,
            _on_state: on_state,
        })
    }
}

fn description_init(desc: &SessionDescription) -> RtcSessionDescriptionInit {
    let kind = match desc.kind {
        SdpKind::Offer => RtcSdpType::Offer,
        SdpKind::Answer => RtcSdpType::Answer,
        SdpKind::Pranswer => RtcSdpType::Pranswer,
        SdpKind::Rollback => RtcSdpType::Rollback,
    };
    let init = RtcSessionDescriptionInit::new(kind);
    init.set_sdp(&desc.sdp);
    init
}

async fn negotiate(promise: Promise) -> Result<JsValue> {
    JsFuture::from(promise)
        .await
        .map_err(|e| ClientError::NegotiationFailure(describe(&e)))
}

fn sdp_of(value: &JsValue) -> Result<String> {
    Reflect::get(value, &JsValue::from_str("sdp"))
        .ok()
        .and_then(|v| v.as_string())
        .ok_or_else(|| ClientError::NegotiationFailure("description without sdp".into()))
}

#[async_trait(?Send)]
impl MediaSession for WebSession {
    type Capture = DisplayCapture;

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = negotiate(self.pc.create_offer()).await?;
        Ok(SessionDescription::offer(sdp_of(&offer)?))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = negotiate(self.pc.create_answer()).await?;
        Ok(SessionDescription::answer(sdp_of(&answer)?))
    }

    async fn set_local_description(&self, desc: &SessionDescription) -> Result<()> {
        negotiate(self.pc.set_local_description(&description_init(desc))).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<()> {
        negotiate(self.pc.set_remote_description(&description_init(desc))).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        let init = RtcIceCandidateInit::new(&candidate.candidate);
        init.set_sdp_mid(candidate.sdp_mid.as_deref());
        init.set_sdp_m_line_index(candidate.sdp_m_line_index);
        init.set_username_fragment(candidate.username_fragment.as_deref());
        negotiate(
            self.pc
                .add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&init)),
        )
        .await?;
        Ok(())
    }

    async fn attach(&self, capture: &DisplayCapture) -> Result<()> {
        for track in tracks(&capture.stream.get_video_tracks()) {
            self.pc.add_track_0(&track, &capture.stream);
        }
        Ok(())
    }

    async fn close(&self) {
        self.pc.set_onicecandidate(None);
        self.pc.set_ontrack(None);
        self.pc.set_onconnectionstatechange(None);
        self.pc.close();
    }
}

fn request_display_media() -> std::result::Result<Promise, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let devices = window.navigator().media_devices()?;
    let constraints = DisplayMediaStreamConstraints::new();
    constraints.set_video(&JsValue::TRUE);
    constraints.set_audio(&JsValue::FALSE);
    devices.get_display_media_with_constraints(&constraints)
}

#[async_trait(?Send)]
impl MediaBackend for WebBackend {
    type RemoteStream = MediaStream;
    type Capture = DisplayCapture;
    type Session = WebSession;

    async fn open_session(
        &self,
        ice_servers: &[IceServerConfig],
        events: MediaEventSender<MediaStream>,
    ) -> Result<WebSession> {
        WebSession::new(ice_servers, events)
            .map_err(|e| ClientError::NegotiationFailure(describe(&e)))
    }

    async fn capture_display(
        &self,
        events: MediaEventSender<MediaStream>,
    ) -> Result<DisplayCapture> {
        let promise =
            request_display_media().map_err(|e| ClientError::CaptureFailed(describe(&e)))?;

        // The prompt keeps running on its own task so a late grant can still
        // be stopped after this request was dropped.
        let (tx, rx) = oneshot::channel::<Result<MediaStream>>();
        let watch = events.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = match JsFuture::from(promise).await {
                Ok(value) => value
                    .dyn_into::<MediaStream>()
                    .map_err(|_| ClientError::CaptureFailed("capture did not yield a stream".into())),
                Err(err) if error_name(&err).as_deref() == Some("NotAllowedError") => {
                    Err(ClientError::CapturePermissionDenied)
                }
                Err(err) => Err(ClientError::CaptureFailed(describe(&err))),
            };

            if watch.is_closed() {
                if let Ok(stream) = &outcome {
                    debug!("Capture granted after teardown, stopping it");
                    stop_tracks(stream);
                }
                return;
            }
            if let Err(Ok(stream)) = tx.send(outcome) {
                debug!("Capture granted after the request was dropped, stopping it");
                stop_tracks(&stream);
            }
        });

        let stream = rx.await.map_err(|_| ClientError::SessionClosed)??;
        Ok(DisplayCapture::new(stream, events))
    }
}
