//! WebSocket Gateway
//!
//! Registry of live connections and the rooms they joined. Each
//! authenticated connection owns an unbounded channel drained by its
//! socket writer task; emitting clones the event into every member
//! channel and never waits for delivery. Sends to a closing connection
//! are dropped silently.

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::ChatEvent;
use crate::infrastructure::metrics;

/// Broadcast scope key. User ids and chat ids share the same integer
/// space; the variant keeps the two namespaces apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// A user's personal room, joined automatically on authentication.
    User(i64),
    /// A chat's room, joined on request for typing traffic.
    Chat(i64),
}

/// A live authenticated connection.
pub struct ConnectedClient {
    pub user_id: i64,
    pub sender: mpsc::UnboundedSender<ChatEvent>,
}

/// WebSocket gateway managing all connections
pub struct ChatGateway {
    /// Active connections by connection id
    connections: DashMap<Uuid, ConnectedClient>,
    /// Room membership; a connection may be in many rooms
    rooms: DashMap<RoomKey, HashSet<Uuid>>,
}

impl ChatGateway {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    /// Register an authenticated connection and join its personal room.
    pub fn register(
        &self,
        connection_id: Uuid,
        user_id: i64,
        sender: mpsc::UnboundedSender<ChatEvent>,
    ) {
        self.connections
            .insert(connection_id, ConnectedClient { user_id, sender });
        self.join(connection_id, RoomKey::User(user_id));
        metrics::set_websocket_connections(self.connections.len() as i64);

        tracing::info!(
            user_id = user_id,
            connection_id = %connection_id,
            "Connection registered"
        );
    }

    /// Unregister a connection and remove it from every room.
    pub fn unregister(&self, connection_id: Uuid) {
        if let Some((_, client)) = self.connections.remove(&connection_id) {
            for mut members in self.rooms.iter_mut() {
                members.remove(&connection_id);
            }
            self.rooms.retain(|_, members| !members.is_empty());
            metrics::set_websocket_connections(self.connections.len() as i64);

            tracing::info!(
                user_id = client.user_id,
                connection_id = %connection_id,
                "Connection unregistered"
            );
        }
    }

    /// Add a connection to a room.
    pub fn join(&self, connection_id: Uuid, room: RoomKey) {
        self.rooms.entry(room).or_default().insert(connection_id);
        tracing::debug!(connection_id = %connection_id, room = ?room, "Joined room");
    }

    /// Emit an event to every member of a room.
    pub fn emit_to_room(&self, room: &RoomKey, event: &ChatEvent) {
        metrics::record_websocket_event(event.event_name());
        if let Some(members) = self.rooms.get(room) {
            for connection_id in members.iter() {
                if let Some(client) = self.connections.get(connection_id) {
                    let _ = client.sender.send(event.clone());
                }
            }
        }
    }

    /// Emit an event to every member of a room except one connection.
    ///
    /// Used for typing rebroadcast, where the originator must not hear
    /// its own event back.
    pub fn emit_to_room_except(&self, room: &RoomKey, except: Uuid, event: &ChatEvent) {
        metrics::record_websocket_event(event.event_name());
        if let Some(members) = self.rooms.get(room) {
            for connection_id in members.iter() {
                if *connection_id == except {
                    continue;
                }
                if let Some(client) = self.connections.get(connection_id) {
                    let _ = client.sender.send(event.clone());
                }
            }
        }
    }

    /// Send an event directly to one connection.
    pub fn send_to_connection(&self, connection_id: Uuid, event: ChatEvent) -> bool {
        metrics::record_websocket_event(event.event_name());
        if let Some(client) = self.connections.get(&connection_id) {
            client.sender.send(event).is_ok()
        } else {
            false
        }
    }

    /// Get the active connection count
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ChatGateway {
    fn default() -> Self {
        Self::new()
    }
}
