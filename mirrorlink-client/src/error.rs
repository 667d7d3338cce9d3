use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The signaling channel did not open within its timeout.
    #[error("signaling server unreachable: {0}")]
    TransportUnreachable(String),

    /// Unexpected kind, duplicate offer or out-of-order exchange.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The user declined the capture prompt.
    #[error("capture permission denied")]
    CapturePermissionDenied,

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// A description or candidate operation was rejected.
    #[error("negotiation failed: {0}")]
    NegotiationFailure(String),

    #[error("signaling channel closed")]
    ChannelClosed,

    #[error("session closed")]
    SessionClosed,
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
