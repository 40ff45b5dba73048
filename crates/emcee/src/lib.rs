//! Command dispatch and argument resolution engine for chat bots.
//!
//! Given a raw message, the engine decides whether it invokes a command,
//! tokenizes and types its arguments, and drives an interactive prompt
//! protocol when arguments are missing or invalid. The chat protocol
//! itself, platform object lookup and permission introspection are seams
//! ([`ChatGateway`], [`ChatResolver`], [`PermissionGate`]) supplied by the
//! embedding application.

pub mod bus;
pub mod command;
pub mod error;
pub mod event;
pub mod message;
pub mod permissions;

pub use crate::bus::Bus;
pub use crate::command::{
    Command, CommandConfig, CommandHandler, CommandHandlerOptions, DispatchOutcome, Resolved,
    Signal,
};
pub use crate::error::{EngineError, EngineResult};
pub use crate::event::DispatchEvent;
pub use crate::message::{Author, ChatGateway, ChatMessage, ChatResolver, NullResolver};
pub use crate::permissions::{PermissionGate, PermissionHolder, Unrestricted};
