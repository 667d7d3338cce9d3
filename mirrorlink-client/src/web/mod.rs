//! Browser backends over `web-sys`, plus the `wasm-bindgen` surface.

mod bindings;
mod logger;
mod rtc_session;
mod ws_channel;

pub use bindings::{MirrorLinkSession, generate_room_id, init_logging};
pub use logger::ConsoleMakeWriter;
pub use rtc_session::{DisplayCapture, WebBackend, WebSession};
pub use ws_channel::{WebSocketChannel, WebSocketConnector};

use wasm_bindgen::JsValue;

/// Best-effort readable form of a thrown JS value.
pub(crate) fn describe(err: &JsValue) -> String {
    let field = |name: &str| {
        js_sys::Reflect::get(err, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.as_string())
    };
    match (field("name"), field("message")) {
        (Some(name), Some(message)) => format!("{name}: {message}"),
        (None, Some(message)) => message,
        _ => err.as_string().unwrap_or_else(|| format!("{err:?}")),
    }
}

pub(crate) fn error_name(err: &JsValue) -> Option<String> {
    js_sys::Reflect::get(err, &JsValue::from_str("name"))
        .ok()
        .and_then(|v| v.as_string())
}
