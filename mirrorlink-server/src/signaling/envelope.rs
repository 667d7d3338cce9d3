use mirrorlink_core::{MessageKind, Role, RoomId};
use serde::Deserialize;

/// Routing fields of a signaling frame. The payload is never decoded here;
/// the original text is what gets forwarded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub room_id: RoomId,
    #[serde(default)]
    pub sender: Option<Role>,
}

impl Envelope {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
