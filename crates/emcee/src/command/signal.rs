use serde_json::Value;

use crate::message::ChatMessage;

/// Short-circuiting outcome produced in place of an ordinary argument value.
/// Checked structurally by the runner and the dispatch pipeline; ordinary
/// argument types never see one.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Abort the current dispatch.
    Cancel,
    /// Re-run argument resolution against a replacement message.
    Retry { message: ChatMessage },
    /// Hand off to another command, carrying the unconsumed input.
    Continue {
        command: String,
        ignore_permissions: bool,
        /// Leftover raw text for the target command. `None` until the
        /// runner fills it from the cursor; a breakout sets it directly.
        rest: Option<String>,
    },
    /// Abort resolution with an arbitrary payload for the caller to report.
    Fail { value: Value },
}

impl Signal {
    pub fn retry(message: ChatMessage) -> Self {
        Signal::Retry { message }
    }

    pub fn continue_with(command: impl Into<String>) -> Self {
        Signal::Continue {
            command: command.into(),
            ignore_permissions: false,
            rest: None,
        }
    }

    pub fn fail(value: Value) -> Self {
        Signal::Fail { value }
    }
}

/// What one argument request (or a whole run) resolved to: an ordinary
/// value, or a signal that stops resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    Signal(Signal),
}

impl Resolved {
    pub fn value(self) -> Option<Value> {
        match self {
            Resolved::Value(value) => Some(value),
            Resolved::Signal(_) => None,
        }
    }
}
