use std::fmt;

/// Unified error type for the emcee crate.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// An argument declaration named a match strategy that does not exist.
    UnknownMatchStrategy(String),
    /// An argument declaration named a type with no registered caster.
    UnknownType(String),
    /// A command registration clashed with an alias already taken.
    AliasConflict {
        alias: String,
        id: String,
        existing: String,
    },
    /// Invalid input provided by the caller.
    InvalidInput(String),
    /// The chat gateway failed to deliver or receive.
    Gateway(String),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownMatchStrategy(name) => {
                write!(f, "unknown match strategy: {name}")
            }
            EngineError::UnknownType(name) => write!(f, "unknown argument type: {name}"),
            EngineError::AliasConflict {
                alias,
                id,
                existing,
            } => write!(
                f,
                "alias {alias} of command {id} already used by command {existing}"
            ),
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::Gateway(msg) => write!(f, "gateway error: {msg}"),
            EngineError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type alias using [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;
