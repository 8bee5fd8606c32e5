//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections.

pub mod events;
pub mod gateway;
pub mod handler;

pub use events::{ChatEvent, ClientEvent};
pub use gateway::{ChatGateway, ConnectedClient, RoomKey};
pub use handler::ws_handler;
