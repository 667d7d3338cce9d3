use crate::model::role::Role;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed signaling frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Session description as browsers serialize `RTCSessionDescriptionInit`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Network-path descriptor, shaped like `RTCIceCandidateInit`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Join,
    Offer,
    Answer,
    Candidate,
    Ready,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Join => "join",
            MessageKind::Offer => "offer",
            MessageKind::Answer => "answer",
            MessageKind::Candidate => "candidate",
            MessageKind::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// One signaling frame. Each kind carries exactly the fields it needs;
/// frames that fail to decode into one of these shapes are dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    Join {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<Role>,
    },
    Offer {
        room_id: RoomId,
        sender: Role,
        payload: SessionDescription,
    },
    Answer {
        room_id: RoomId,
        sender: Role,
        payload: SessionDescription,
    },
    Candidate {
        room_id: RoomId,
        sender: Role,
        payload: IceCandidate,
    },
    Ready {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<Role>,
    },
}

impl SignalMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            SignalMessage::Join { .. } => MessageKind::Join,
            SignalMessage::Offer { .. } => MessageKind::Offer,
            SignalMessage::Answer { .. } => MessageKind::Answer,
            SignalMessage::Candidate { .. } => MessageKind::Candidate,
            SignalMessage::Ready { .. } => MessageKind::Ready,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        match self {
            SignalMessage::Join { room_id, .. }
            | SignalMessage::Offer { room_id, .. }
            | SignalMessage::Answer { room_id, .. }
            | SignalMessage::Candidate { room_id, .. }
            | SignalMessage::Ready { room_id, .. } => room_id,
        }
    }

    pub fn sender(&self) -> Option<Role> {
        match self {
            SignalMessage::Join { sender, .. } | SignalMessage::Ready { sender, .. } => *sender,
            SignalMessage::Offer { sender, .. }
            | SignalMessage::Answer { sender, .. }
            | SignalMessage::Candidate { sender, .. } => Some(*sender),
        }
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(text)?)
    }
}
