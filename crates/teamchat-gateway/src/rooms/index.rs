//! Room membership index
//!
//! Bidirectional subscription graph between connections and rooms. Holds no
//! authorization logic: callers check access before subscribing.

use std::collections::{HashMap, HashSet};

use teamchat_core::{ConnectionId, RoomKey};

#[derive(Debug, Default)]
pub struct RoomIndex {
    /// room -> subscribed connections; never holds an empty set
    rooms: HashMap<RoomKey, HashSet<ConnectionId>>,
    /// connection -> rooms it is in; never holds an empty set
    memberships: HashMap<ConnectionId, HashSet<RoomKey>>,
}

impl RoomIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room
    ///
    /// Returns false if it was already subscribed.
    pub fn subscribe(&mut self, connection_id: ConnectionId, room: RoomKey) -> bool {
        let added = self.rooms.entry(room).or_default().insert(connection_id);
        if added {
            self.memberships
                .entry(connection_id)
                .or_default()
                .insert(room);
            tracing::debug!(connection_id = %connection_id, room = %room, "Subscribed");
        }
        added
    }

    /// Remove a connection from a room
    ///
    /// Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, connection_id: ConnectionId, room: RoomKey) -> bool {
        let removed = detach(&mut self.rooms, room, connection_id);
        if removed {
            detach(&mut self.memberships, connection_id, room);
            tracing::debug!(connection_id = %connection_id, room = %room, "Unsubscribed");
        }
        removed
    }

    /// Remove a connection from every room it is in
    ///
    /// Returns the rooms it left; empty on a second call.
    pub fn unsubscribe_all(&mut self, connection_id: ConnectionId) -> Vec<RoomKey> {
        let Some(rooms) = self.memberships.remove(&connection_id) else {
            return Vec::new();
        };
        for room in &rooms {
            detach(&mut self.rooms, *room, connection_id);
        }

        tracing::debug!(
            connection_id = %connection_id,
            rooms = rooms.len(),
            "Unsubscribed from all rooms"
        );
        rooms.into_iter().collect()
    }

    /// Current subscribers of a room
    pub fn subscribers_of(&self, room: &RoomKey) -> impl Iterator<Item = ConnectionId> + '_ {
        self.rooms.get(room).into_iter().flatten().copied()
    }

    pub fn subscriber_count(&self, room: &RoomKey) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    pub fn is_subscribed(&self, connection_id: ConnectionId, room: &RoomKey) -> bool {
        self.memberships
            .get(&connection_id)
            .is_some_and(|rooms| rooms.contains(room))
    }

    /// Rooms a connection is subscribed to
    pub fn rooms_of(&self, connection_id: ConnectionId) -> impl Iterator<Item = RoomKey> + '_ {
        self.memberships
            .get(&connection_id)
            .into_iter()
            .flatten()
            .copied()
    }

    /// Number of non-empty rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Every (room, subscribers) pair
    pub fn iter(&self) -> impl Iterator<Item = (&RoomKey, &HashSet<ConnectionId>)> {
        self.rooms.iter()
    }
}

/// Remove `value` from the set under `key`, dropping the set once empty
fn detach<K, V>(map: &mut HashMap<K, HashSet<V>>, key: K, value: V) -> bool
where
    K: std::hash::Hash + Eq,
    V: std::hash::Hash + Eq,
{
    let Some(set) = map.get_mut(&key) else {
        return false;
    };
    let removed = set.remove(&value);
    if set.is_empty() {
        map.remove(&key);
    }
    removed
}
