pub mod arguments;
pub mod handler;
pub mod inhibitor;
pub mod registry;
pub mod signal;
pub mod tokenizer;
pub mod types;

pub use self::handler::{CommandHandler, CommandHandlerOptions, DispatchOutcome, ParsedInvocation};
pub use self::inhibitor::{Inhibitor, InhibitorPhase, InhibitorRegistry};
pub use self::registry::CommandRegistry;
pub use self::signal::{Resolved, Signal};
pub use self::tokenizer::{Token, Tokenized, Tokenizer};
pub use self::types::{
    reasons, ChannelScope, Command, CommandConfig, IgnoreList, LockScope, PrefixSource,
    PrefixSupplier,
};
