use crate::room::{ConnectionHandle, ConnectionId, RelayOutcome, RoomRegistry};
use crate::signaling::Envelope;
use mirrorlink_core::MessageKind;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct RelayInner {
    registry: RoomRegistry,
    max_frame_bytes: usize,
}

/// Entry point for frames read off a connection. Shared by every socket task.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(registry: RoomRegistry, max_frame_bytes: usize) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                registry,
                max_frame_bytes,
            }),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.inner.registry
    }

    /// Routes one text frame: `join` registers the connection, every other
    /// kind is forwarded verbatim to the rest of the room.
    pub fn on_frame(&self, conn: &ConnectionHandle, text: &str) {
        if text.len() > self.inner.max_frame_bytes {
            warn!(
                "Dropping {} byte frame from {}: over the {} byte limit",
                text.len(),
                conn.id(),
                self.inner.max_frame_bytes
            );
            return;
        }

        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Invalid signaling frame from {}: {}", conn.id(), e);
                return;
            }
        };

        match envelope.kind {
            MessageKind::Join => {
                self.inner
                    .registry
                    .join(conn, &envelope.room_id, envelope.sender, text);
            }
            kind => match self.inner.registry.relay(conn.id(), &envelope.room_id, text) {
                RelayOutcome::Delivered(count) => {
                    debug!(
                        "Relayed {} from {} in room {} to {} peer(s)",
                        kind,
                        conn.id(),
                        envelope.room_id,
                        count
                    );
                }
                RelayOutcome::NotMember => {
                    warn!(
                        "Dropping {} from {}: not a member of room {}",
                        kind,
                        conn.id(),
                        envelope.room_id
                    );
                }
            },
        }
    }

    /// Transport closed: clear the connection's room association.
    pub fn on_close(&self, conn_id: ConnectionId) {
        if let Some(room_id) = self.inner.registry.leave(conn_id) {
            info!("Connection {} removed from room {}", conn_id, room_id);
        }
    }
}
