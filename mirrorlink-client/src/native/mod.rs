//! Native backends: `webrtc` media sessions and a `tokio-tungstenite`
//! signaling channel. Both need a tokio runtime.

mod rtc_session;
mod ws_channel;

pub use rtc_session::{NativeBackend, NativeSession, SampleCapture};
pub use ws_channel::{WsChannel, WsConnector};
