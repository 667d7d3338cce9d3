mod channel;
mod config;
mod error;
mod media;
mod session;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use channel::*;
pub use config::*;
pub use error::{ClientError, Result};
pub use media::*;
pub use session::*;

pub use mirrorlink_core::{
    ConnectionStatus, IceCandidate, Role, RoomId, SdpKind, SessionDescription, SignalMessage,
};
