use crate::room::connection::{ConnectionHandle, ConnectionId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mirrorlink_core::{Role, RoomId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

type Members = HashMap<ConnectionId, ConnectionHandle>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Frame handed to this many other members.
    Delivered(usize),
    /// Sender is not a member of the named room, frame dropped.
    NotMember,
}

/// Which connections are in which room.
///
/// Member sets live in a sharded map; every mutation or broadcast on a room
/// runs under that room's entry guard, so join, leave and relay on the same
/// room never interleave. Different rooms never contend beyond shard locks.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomId, Members>>,
    memberships: Arc<DashMap<ConnectionId, RoomId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `conn` under `room_id`, creating the room if needed, and
    /// hands the join frame to everyone already there. Returns how many
    /// members were notified.
    pub fn join(
        &self,
        conn: &ConnectionHandle,
        room_id: &RoomId,
        role: Option<Role>,
        frame: &str,
    ) -> usize {
        if let Some(previous) = self.memberships.insert(conn.id(), room_id.clone()) {
            if &previous != room_id {
                self.remove_member(conn.id(), &previous);
            }
        }

        let mut members = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room_id);
            Members::new()
        });
        members.insert(conn.id(), conn.clone());
        info!(
            "Connection {} joined room {} as {}",
            conn.id(),
            room_id,
            role.map_or("unspecified", |r| r.as_str())
        );

        broadcast(&members, conn.id(), frame)
    }

    /// Forwards `frame` to every other member of `room_id`. The sender has to
    /// be a member itself.
    pub fn relay(&self, from: ConnectionId, room_id: &RoomId, frame: &str) -> RelayOutcome {
        let Some(members) = self.rooms.get(room_id) else {
            return RelayOutcome::NotMember;
        };
        if !members.contains_key(&from) {
            return RelayOutcome::NotMember;
        }
        RelayOutcome::Delivered(broadcast(&members, from, frame))
    }

    /// Drops the connection from its room, deleting the room once empty.
    /// Returns the room it was in, if any.
    pub fn leave(&self, conn_id: ConnectionId) -> Option<RoomId> {
        let (_, room_id) = self.memberships.remove(&conn_id)?;
        self.remove_member(conn_id, &room_id);
        Some(room_id)
    }

    pub fn room_of(&self, conn_id: ConnectionId) -> Option<RoomId> {
        self.memberships.get(&conn_id).map(|r| r.value().clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn member_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |members| members.len())
    }

    fn remove_member(&self, conn_id: ConnectionId, room_id: &RoomId) {
        if let Entry::Occupied(mut entry) = self.rooms.entry(room_id.clone()) {
            entry.get_mut().remove(&conn_id);
            info!("Connection {} left room {}", conn_id, room_id);
            if entry.get().is_empty() {
                entry.remove();
                info!("Room {} is empty, removed", room_id);
            }
        }
    }
}

fn broadcast(members: &Members, from: ConnectionId, frame: &str) -> usize {
    let mut delivered = 0;
    for member in members.values().filter(|m| m.id() != from) {
        if member.deliver(frame) {
            delivered += 1;
        } else {
            debug!("Dropping frame for closed connection {}", member.id());
        }
    }
    delivered
}
