use mirrorlink_core::ConnectionStatus;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    Idle,
    Connecting,
    Offering,
    Answering,
    Connected,
    Closed,
    Error,
}

impl NegotiationState {
    /// What the presentation layer gets to see.
    pub fn status(self) -> ConnectionStatus {
        match self {
            NegotiationState::Idle | NegotiationState::Closed => ConnectionStatus::Idle,
            NegotiationState::Connecting
            | NegotiationState::Offering
            | NegotiationState::Answering => ConnectionStatus::Connecting,
            NegotiationState::Connected => ConnectionStatus::Connected,
            NegotiationState::Error => ConnectionStatus::Error,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Closed | NegotiationState::Error)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
