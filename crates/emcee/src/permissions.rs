use async_trait::async_trait;
use serde::Serialize;

use crate::message::ChatMessage;

/// Which side of the conversation a permission requirement applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionHolder {
    /// The bot's own account.
    Client,
    /// The invoking user.
    User,
}

/// Permission introspection seam. The engine never inspects platform
/// permission bits itself; it asks the gate which of a command's required
/// permissions are missing.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// The subset of `required` that `holder` lacks in the message's
    /// channel/guild. Empty means the check passes.
    async fn missing(
        &self,
        message: &ChatMessage,
        holder: PermissionHolder,
        required: &[String],
    ) -> Vec<String>;

    /// Whether the given user owns the bot. Owner status bypasses
    /// owner-only checks and cooldowns.
    async fn is_owner(&self, _user_id: &str) -> bool {
        false
    }
}

/// Gate that grants everything. Default until a real gate is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

#[async_trait]
impl PermissionGate for Unrestricted {
    async fn missing(
        &self,
        _message: &ChatMessage,
        _holder: PermissionHolder,
        _required: &[String],
    ) -> Vec<String> {
        Vec::new()
    }
}
