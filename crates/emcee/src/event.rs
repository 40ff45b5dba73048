use serde::Serialize;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::permissions::PermissionHolder;

/// Lifecycle notifications published on the [`Bus`](crate::bus::Bus) as a
/// dispatch moves through the pipeline. Rejections are reported here, never
/// raised as errors.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DispatchEvent {
    /// A message was rejected before any command was resolved.
    MessageBlocked(MessageBlockedPayload),
    /// A message matched no prefix or no known alias.
    MessageInvalid(MessageInvalidPayload),
    /// A resolved command was rejected by an inhibitor or a built-in check.
    CommandBlocked(CommandBlockedPayload),
    CommandStarted(CommandStartedPayload),
    CommandFinished(CommandFinishedPayload),
    /// Argument resolution was cancelled (explicitly, by prompt timeout, or
    /// by retry exhaustion).
    CommandCancelled(CommandCancelledPayload),
    /// A prompt reply invoked a different command and resolution handed off.
    CommandBreakout(CommandBreakoutPayload),
    /// The command's execution lock was already held for this key.
    CommandLocked(CommandLockedPayload),
    Cooldown(CooldownPayload),
    MissingPermissions(MissingPermissionsPayload),
    /// A message arrived from a user who is mid-prompt in this channel.
    InPrompt(InPromptPayload),
    /// The command body raised an error.
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageBlockedPayload {
    pub message: ChatMessage,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageInvalidPayload {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandBlockedPayload {
    pub message: ChatMessage,
    pub command_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandStartedPayload {
    pub message: ChatMessage,
    pub command_id: String,
    pub args: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandFinishedPayload {
    pub message: ChatMessage,
    pub command_id: String,
    pub args: Value,
    pub return_value: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandCancelledPayload {
    pub message: ChatMessage,
    pub command_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandBreakoutPayload {
    pub message: ChatMessage,
    pub command_id: String,
    pub breakout_message: ChatMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandLockedPayload {
    pub message: ChatMessage,
    pub command_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CooldownPayload {
    pub message: ChatMessage,
    pub command_id: String,
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingPermissionsPayload {
    pub message: ChatMessage,
    pub command_id: String,
    pub holder: PermissionHolder,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InPromptPayload {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: ChatMessage,
    pub command_id: Option<String>,
    pub error: String,
}
