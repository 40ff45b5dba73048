use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineResult;

/// The author of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub is_bot: bool,
}

/// One inbound chat message, as handed to the dispatcher by the embedding
/// application. Opaque to this crate beyond the fields below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub body: String,
    pub author: Author,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A message from an ordinary (non-bot) user, stamped now.
    pub fn user(
        id: impl Into<String>,
        author_id: impl Into<String>,
        channel_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            author: Author {
                id: author_id.into(),
                is_bot: false,
            },
            channel_id: channel_id.into(),
            guild_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn from_bot(mut self) -> Self {
        self.author.is_bot = true;
        self
    }
}

/// Outbound half of the chat connection. The wire protocol itself lives in
/// the embedding application; the engine only sends prompt content and waits
/// for replies through this seam.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Deliver content to a channel.
    async fn send(&self, channel_id: &str, content: Value) -> EngineResult<()>;

    /// The next message from `user_id` in `channel_id`. `None` means the
    /// reply stream ended. Time limits are enforced by the caller.
    async fn next_reply(&self, channel_id: &str, user_id: &str)
        -> EngineResult<Option<ChatMessage>>;
}

/// Chat-platform object lookup, consumed by the resolver-backed argument
/// types. Every method defaults to "not found" so implementations only
/// override what their platform supports.
#[async_trait]
pub trait ChatResolver: Send + Sync {
    async fn resolve_user(&self, _message: &ChatMessage, _phrase: &str) -> Option<Value> {
        None
    }

    async fn resolve_member(&self, _message: &ChatMessage, _phrase: &str) -> Option<Value> {
        None
    }

    async fn resolve_channel(&self, _message: &ChatMessage, _phrase: &str) -> Option<Value> {
        None
    }

    async fn resolve_role(&self, _message: &ChatMessage, _phrase: &str) -> Option<Value> {
        None
    }

    async fn resolve_emoji(&self, _message: &ChatMessage, _phrase: &str) -> Option<Value> {
        None
    }

    async fn resolve_guild(&self, _message: &ChatMessage, _phrase: &str) -> Option<Value> {
        None
    }
}

/// Resolver that never finds anything. Default until the embedding
/// application wires in a real one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl ChatResolver for NullResolver {}
