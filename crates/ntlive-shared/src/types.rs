use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered viewer or streamer as stored by the users API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub point: i64,
    /// Identity of the viewer this user (as a room owner) is linked to.
    /// Empty when unlinked.
    #[serde(default)]
    pub link: String,
}

impl User {
    pub fn is_linked_to(&self, identity: &str) -> bool {
        !self.link.is_empty() && self.link == identity
    }
}

/// A live room as reported by the room listing API. `name` is the owner's
/// user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub name: String,
    #[serde(default)]
    pub num_participants: u32,
}

impl Room {
    pub fn is_live(&self) -> bool {
        self.num_participants > 0
    }
}

/// One participant's presence in a transport session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Transport identity. For signed-in viewers this is their user id.
    pub identity: String,
    pub name: String,
    #[serde(default)]
    pub is_local: bool,
}

impl Participant {
    pub fn new(identity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
            is_local: false,
        }
    }

    pub fn as_local(mut self) -> Self {
        self.is_local = true;
        self
    }
}

/// Delivery guarantee requested for a data-channel publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataPacketKind {
    Reliable,
    Lossy,
}

/// An outbound chat message before it is framed for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A chat message as observed by this participant, local or remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedChatMessage {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub from: Option<Participant>,
}

impl ReceivedChatMessage {
    pub fn from_message(message: ChatMessage, from: Option<Participant>) -> Self {
        Self {
            id: message.id,
            message: message.message,
            timestamp: message.timestamp,
            from,
        }
    }

    pub fn is_local(&self) -> bool {
        self.from.as_ref().is_some_and(|p| p.is_local)
    }
}
