use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Commands sent by a chat client over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatCommand {
    /// Request admission to the global room.
    #[serde(rename = "join-chat")]
    Join { account_id: Uuid },

    /// Post a message to the room. Ignored before a successful join.
    #[serde(rename = "send-message")]
    Send { message: String },
}

/// Events emitted by the server to room members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// A message was persisted and fanned out to the room.
    #[serde(rename = "new-message")]
    NewMessage {
        username: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}
