use crate::config::{IceServerConfig, SessionConfig};
use crate::session::{Command, PeerSession, SessionHandle, run_session, session_handle};
use crate::web::{ConsoleMakeWriter, WebBackend, WebSocketChannel, WebSocketConnector};
use futures::channel::mpsc::UnboundedReceiver;
use js_sys::{Function, Promise};
use mirrorlink_core::{ConnectionStatus, Role, RoomId};
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::Level;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::MediaStream;

type WebPeerSession = PeerSession<WebBackend, WebSocketChannel>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SessionOptions {
    open_timeout_ms: Option<u64>,
    ice_servers: Option<Vec<IceServerConfig>>,
}

struct Shared {
    status: ConnectionStatus,
    last_error: Option<String>,
    sharing: bool,
    on_status: Option<Function>,
    on_remote_stream: Option<Function>,
    on_error: Option<Function>,
}

/// One room visit, driven on the page's event loop.
///
/// ```js
/// const session = new MirrorLinkSession(url, roomId, "viewer");
/// session.onRemoteStream((stream) => (video.srcObject = stream));
/// session.onStatus((status) => render(status));
/// session.start();
/// ```
#[wasm_bindgen]
pub struct MirrorLinkSession {
    handle: SessionHandle<MediaStream>,
    shared: Rc<RefCell<Shared>>,
    pending: Option<(WebPeerSession, UnboundedReceiver<Command<MediaStream>>)>,
}

#[wasm_bindgen]
impl MirrorLinkSession {
    /// `options` may carry `openTimeoutMs` and `iceServers`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        url: String,
        room_id: String,
        role: String,
        options: JsValue,
    ) -> Result<MirrorLinkSession, JsValue> {
        let role: Role = role.parse().map_err(|e: String| JsValue::from_str(&e))?;
        let options: SessionOptions = if options.is_undefined() || options.is_null() {
            SessionOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };

        let mut config = SessionConfig::new(url, RoomId::new(room_id), role);
        if let Some(ms) = options.open_timeout_ms {
            config = config.with_open_timeout(Duration::from_millis(ms));
        }
        if let Some(ice_servers) = options.ice_servers {
            config = config.with_ice_servers(ice_servers);
        }

        let shared = Rc::new(RefCell::new(Shared {
            status: ConnectionStatus::Idle,
            last_error: None,
            sharing: false,
            on_status: None,
            on_remote_stream: None,
            on_error: None,
        }));

        let mut session = WebPeerSession::new(config, WebBackend);

        let status_shared = shared.clone();
        session.on_status(move |status| {
            let callback = {
                let mut shared = status_shared.borrow_mut();
                shared.status = status;
                if status == ConnectionStatus::Idle {
                    shared.sharing = false;
                }
                shared.on_status.clone()
            };
            if let Some(callback) = callback {
                let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(status.as_str()));
            }
        });

        let stream_shared = shared.clone();
        session.on_remote_stream(move |stream: MediaStream| {
            let callback = stream_shared.borrow().on_remote_stream.clone();
            if let Some(callback) = callback {
                let _ = callback.call1(&JsValue::NULL, &stream);
            }
        });

        let error_shared = shared.clone();
        session.on_error(move |err| {
            let message = err.to_string();
            let callback = {
                let mut shared = error_shared.borrow_mut();
                shared.last_error = Some(message.clone());
                shared.on_error.clone()
            };
            if let Some(callback) = callback {
                let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(&message));
            }
        });

        let (handle, commands) = session_handle();
        Ok(MirrorLinkSession {
            handle,
            shared,
            pending: Some((session, commands)),
        })
    }

    /// Opens the signaling channel and joins the room.
    pub fn start(&mut self) -> Result<(), JsValue> {
        let (session, commands) = self
            .pending
            .take()
            .ok_or_else(|| JsValue::from_str("session already started"))?;
        wasm_bindgen_futures::spawn_local(run_session(session, WebSocketConnector, commands));
        Ok(())
    }

    /// Prompts for a screen and offers it. Resolves to the local stream, or
    /// `null` if the user declined.
    #[wasm_bindgen(js_name = startCapture)]
    pub fn start_capture(&self) -> Promise {
        let handle = self.handle.clone();
        let shared = self.shared.clone();
        future_to_promise(async move {
            match handle.start_sharing().await {
                Ok(Some(stream)) => {
                    shared.borrow_mut().sharing = true;
                    Ok(stream.into())
                }
                Ok(None) => Ok(JsValue::NULL),
                Err(err) => Err(JsValue::from_str(&err.to_string())),
            }
        })
    }

    /// Leaves the room. No callback fires afterwards.
    pub fn stop(&mut self) {
        {
            let mut shared = self.shared.borrow_mut();
            shared.on_status = None;
            shared.on_remote_stream = None;
            shared.on_error = None;
            shared.status = ConnectionStatus::Idle;
            shared.sharing = false;
        }
        self.handle.stop();
        if let Some((mut session, _)) = self.pending.take() {
            wasm_bindgen_futures::spawn_local(async move { session.close().await });
        }
    }

    #[wasm_bindgen(js_name = onStatus)]
    pub fn on_status(&self, callback: Function) {
        self.shared.borrow_mut().on_status = Some(callback);
    }

    #[wasm_bindgen(js_name = onRemoteStream)]
    pub fn on_remote_stream(&self, callback: Function) {
        self.shared.borrow_mut().on_remote_stream = Some(callback);
    }

    #[wasm_bindgen(js_name = onError)]
    pub fn on_error(&self, callback: Function) {
        self.shared.borrow_mut().on_error = Some(callback);
    }

    pub fn status(&self) -> String {
        self.shared.borrow().status.as_str().to_owned()
    }

    #[wasm_bindgen(js_name = isSharing)]
    pub fn is_sharing(&self) -> bool {
        self.shared.borrow().sharing
    }

    #[wasm_bindgen(js_name = lastError)]
    pub fn last_error(&self) -> Option<String> {
        self.shared.borrow().last_error.clone()
    }
}

#[wasm_bindgen(js_name = generateRoomId)]
pub fn generate_room_id() -> String {
    RoomId::generate().to_string()
}

/// Sends `tracing` output to the browser console. `level` defaults to info.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    let level = level
        .and_then(|l| l.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter)
        .with_ansi(false)
        .without_time()
        .with_max_level(level)
        .try_init();
}
