use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::command::arguments::argument::{ArgumentOptions, DefaultArgumentOptions};
use crate::command::arguments::runner::{ArgumentSequence, DeclaredSequence};
use crate::command::arguments::types::ArgumentMatch;
use crate::command::handler::CommandHandler;
use crate::error::EngineResult;
use crate::message::ChatMessage;

/// Built-in rejection reasons reported through lifecycle notifications.
pub mod reasons {
    pub const CLIENT: &str = "client";
    pub const BOT: &str = "bot";
    pub const OWNER: &str = "owner";
    pub const GUILD: &str = "guild";
    pub const DM: &str = "dm";
}

/// Where a command may be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelScope {
    #[default]
    Any,
    GuildOnly,
    DmOnly,
}

pub type LockKeySupplier = Arc<dyn Fn(&ChatMessage) -> String + Send + Sync>;

/// What identity scopes a command's execution lock.
#[derive(Clone)]
pub enum LockScope {
    Guild,
    Channel,
    User,
    Custom(LockKeySupplier),
}

impl LockScope {
    pub fn key(&self, message: &ChatMessage) -> String {
        match self {
            LockScope::Guild => message
                .guild_id
                .as_deref()
                .unwrap_or(&message.channel_id)
                .to_string(),
            LockScope::Channel => message.channel_id.clone(),
            LockScope::User => message.author.id.clone(),
            LockScope::Custom(supplier) => supplier(message),
        }
    }
}

impl fmt::Debug for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockScope::Guild => write!(f, "Guild"),
            LockScope::Channel => write!(f, "Channel"),
            LockScope::User => write!(f, "User"),
            LockScope::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Computes the prefixes accepted for a message, for per-guild or otherwise
/// dynamic prefix setups.
#[async_trait]
pub trait PrefixSupplier: Send + Sync {
    async fn prefixes(&self, message: &ChatMessage) -> Vec<String>;
}

/// Handler-wide prefix configuration.
#[derive(Clone)]
pub enum PrefixSource {
    Static(Vec<String>),
    Supplier(Arc<dyn PrefixSupplier>),
}

impl PrefixSource {
    pub fn single(prefix: impl Into<String>) -> Self {
        PrefixSource::Static(vec![prefix.into()])
    }

    pub async fn resolve(&self, message: &ChatMessage) -> Vec<String> {
        match self {
            PrefixSource::Static(prefixes) => prefixes.clone(),
            PrefixSource::Supplier(supplier) => supplier.prefixes(message).await,
        }
    }
}

impl fmt::Debug for PrefixSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixSource::Static(prefixes) => write!(f, "Static({prefixes:?})"),
            PrefixSource::Supplier(_) => write!(f, "Supplier(..)"),
        }
    }
}

pub type IgnorePredicate = Arc<dyn Fn(&ChatMessage, &CommandConfig) -> bool + Send + Sync>;

/// Who bypasses a permission or cooldown check: nobody, a fixed set of
/// user/guild ids, or an arbitrary predicate.
#[derive(Clone, Default)]
pub enum IgnoreList {
    #[default]
    Nobody,
    Ids(Vec<String>),
    Predicate(IgnorePredicate),
}

impl IgnoreList {
    pub fn matches(&self, message: &ChatMessage, command: &CommandConfig) -> bool {
        match self {
            IgnoreList::Nobody => false,
            IgnoreList::Ids(ids) => {
                ids.iter().any(|id| *id == message.author.id)
                    || message
                        .guild_id
                        .as_ref()
                        .is_some_and(|guild| ids.iter().any(|id| id == guild))
            }
            IgnoreList::Predicate(predicate) => predicate(message, command),
        }
    }
}

impl fmt::Debug for IgnoreList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreList::Nobody => write!(f, "Nobody"),
            IgnoreList::Ids(ids) => write!(f, "Ids({ids:?})"),
            IgnoreList::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Immutable per-command configuration: identity, argument declarations and
/// every dispatch-stage policy.
#[derive(Debug, Clone)]
pub struct CommandConfig {
    pub id: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub args: Vec<ArgumentOptions>,
    pub argument_defaults: DefaultArgumentOptions,
    /// Treat quoted spans as single phrases.
    pub quoted: bool,
    /// Custom phrase separator instead of whitespace.
    pub separator: Option<String>,
    /// Flag names recognized beyond those declared by the arguments.
    pub extra_flag_words: Vec<String>,
    pub extra_option_flag_words: Vec<String>,
    pub channel: ChannelScope,
    pub owner_only: bool,
    pub client_permissions: Vec<String>,
    pub user_permissions: Vec<String>,
    pub ignore_permissions: IgnoreList,
    pub ignore_cooldown: IgnoreList,
    pub cooldown: Option<Duration>,
    /// Allowed uses per cooldown window.
    pub ratelimit: u32,
    /// Identity scoping cooldown entries; defaults to the invoking user.
    pub cooldown_scope: Option<LockScope>,
    pub lock: Option<LockScope>,
    /// When set, the command only matches these prefixes, never the
    /// handler-wide ones.
    pub prefix_override: Option<Vec<String>>,
}

impl CommandConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            aliases: Vec::new(),
            description: String::new(),
            args: Vec::new(),
            argument_defaults: DefaultArgumentOptions::default(),
            quoted: true,
            separator: None,
            extra_flag_words: Vec::new(),
            extra_option_flag_words: Vec::new(),
            channel: ChannelScope::Any,
            owner_only: false,
            client_permissions: Vec::new(),
            user_permissions: Vec::new(),
            ignore_permissions: IgnoreList::Nobody,
            ignore_cooldown: IgnoreList::Nobody,
            cooldown: None,
            ratelimit: 1,
            cooldown_scope: None,
            lock: None,
            prefix_override: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn arg(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options);
        self
    }

    pub fn args(mut self, options: Vec<ArgumentOptions>) -> Self {
        self.args = options;
        self
    }

    pub fn argument_defaults(mut self, defaults: DefaultArgumentOptions) -> Self {
        self.argument_defaults = defaults;
        self
    }

    pub fn quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn channel(mut self, scope: ChannelScope) -> Self {
        self.channel = scope;
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn client_permissions(mut self, permissions: Vec<String>) -> Self {
        self.client_permissions = permissions;
        self
    }

    pub fn user_permissions(mut self, permissions: Vec<String>) -> Self {
        self.user_permissions = permissions;
        self
    }

    pub fn cooldown(mut self, window: Duration, ratelimit: u32) -> Self {
        self.cooldown = Some(window);
        self.ratelimit = ratelimit;
        self
    }

    pub fn cooldown_scope(mut self, scope: LockScope) -> Self {
        self.cooldown_scope = Some(scope);
        self
    }

    pub fn lock(mut self, scope: LockScope) -> Self {
        self.lock = Some(scope);
        self
    }

    /// The identity scoping this command's cooldown entries.
    pub fn dispatch_key(&self, message: &ChatMessage) -> String {
        match &self.cooldown_scope {
            Some(scope) => scope.key(message),
            None => message.author.id.clone(),
        }
    }

    pub fn prefix_override(mut self, prefixes: Vec<String>) -> Self {
        self.prefix_override = Some(prefixes);
        self
    }

    /// Flag and option-flag words the tokenizer should recognize for this
    /// command: the names declared by flag/option arguments plus any
    /// explicit extras.
    pub fn flag_words(&self) -> (Vec<String>, Vec<String>) {
        let mut flags = self.extra_flag_words.clone();
        let mut options = self.extra_option_flag_words.clone();
        for arg in &self.args {
            match arg.match_kind {
                ArgumentMatch::Flag => flags.extend(arg.flags.iter().cloned()),
                ArgumentMatch::Option => options.extend(arg.flags.iter().cloned()),
                _ => {}
            }
        }
        (flags, options)
    }
}

/// One command. The engine owns parsing, argument resolution and every
/// dispatch check; implementations provide configuration and the body.
#[async_trait]
pub trait Command: Send + Sync {
    fn config(&self) -> &CommandConfig;

    /// The argument request sequence for one dispatch. Defaults to the
    /// declared argument list; override for conditional argument flows.
    fn arguments(&self) -> Box<dyn ArgumentSequence> {
        Box::new(DeclaredSequence::new(self.config().args.clone()))
    }

    /// Hook run after inhibition and before argument resolution.
    async fn before(&self, _message: &ChatMessage) {}

    /// The command body. Runs under the execution lock with fully resolved
    /// arguments.
    async fn exec(
        &self,
        handler: &CommandHandler,
        message: &ChatMessage,
        args: Value,
    ) -> EngineResult<Value>;
}
