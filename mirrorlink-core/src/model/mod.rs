mod role;
mod room;
mod signaling;
mod status;

pub use role::Role;
pub use room::RoomId;
pub use signaling::{IceCandidate, MessageKind, SdpKind, SessionDescription, SignalMessage, WireError};
pub use status::ConnectionStatus;
