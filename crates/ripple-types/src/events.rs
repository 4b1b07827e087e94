use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::{Filter, Row};

/// Tables that emit change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Posts,
    Comments,
    Likes,
    Followers,
    Messages,
    Conversations,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Posts => "posts",
            Self::Comments => "comments",
            Self::Likes => "likes",
            Self::Followers => "followers",
            Self::Messages => "messages",
            Self::Conversations => "conversations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A committed mutation, published to the change hub after the write lands.
/// `row` is a snapshot of the columns subscriptions may filter on; consumers
/// are expected to re-fetch, not to patch state from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeOp,
    pub row: Row,
}

/// Commands sent FROM client TO server over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Watch a table for changes matching a filter
    Subscribe { table: Table, filter: Filter },

    /// Stop watching
    Unsubscribe { subscription_id: Uuid },
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String },

    /// Server confirms a subscription and assigns its id
    Subscribed { subscription_id: Uuid, table: Table },

    /// A watched row changed; the client should re-run its fetch
    Change {
        subscription_id: Uuid,
        table: Table,
        op: ChangeOp,
    },
}
