use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use moka::ops::compute::Op;
use moka::sync::Cache;
use moka::Expiry;
use serde_json::Value;
use uuid::Uuid;

use crate::bus::Bus;
use crate::command::arguments::argument::{ArgumentOptions, DefaultArgumentOptions};
use crate::command::arguments::runner::{ArgumentRunner, DeclaredSequence};
use crate::command::arguments::types::TypeRegistry;
use crate::command::inhibitor::{Inhibitor, InhibitorPhase, InhibitorRegistry};
use crate::command::registry::CommandRegistry;
use crate::command::signal::{Resolved, Signal};
use crate::command::tokenizer::Tokenizer;
use crate::command::types::{reasons, ChannelScope, Command, CommandConfig, IgnoreList, PrefixSource};
use crate::error::{EngineError, EngineResult};
use crate::event::{
    CommandBlockedPayload, CommandBreakoutPayload, CommandCancelledPayload,
    CommandFinishedPayload, CommandLockedPayload, CommandStartedPayload, CooldownPayload,
    DispatchEvent, ErrorPayload, InPromptPayload, MessageBlockedPayload, MessageInvalidPayload,
    MissingPermissionsPayload,
};
use crate::message::{ChatGateway, ChatMessage, ChatResolver, NullResolver};
use crate::permissions::{PermissionGate, PermissionHolder, Unrestricted};

/// Ceiling on chained `continue` handoffs within one dispatch.
const MAX_HANDOFF_DEPTH: usize = 64;

/// Handler-wide dispatch configuration.
#[derive(Debug, Clone)]
pub struct CommandHandlerOptions {
    /// The bot's own user id; its messages are rejected when `block_self`
    /// is set, and mention prefixes are derived from it.
    pub self_id: String,
    pub prefix: PrefixSource,
    /// Accept `<@self_id>` as a prefix.
    pub allow_mention: bool,
    pub block_bots: bool,
    pub block_self: bool,
    /// Cooldown window applied to commands that configure a ratelimit but
    /// no window of their own.
    pub default_cooldown: Option<Duration>,
    pub ignore_cooldown: IgnoreList,
    pub ignore_permissions: IgnoreList,
    pub argument_defaults: DefaultArgumentOptions,
}

impl Default for CommandHandlerOptions {
    fn default() -> Self {
        Self {
            self_id: String::new(),
            prefix: PrefixSource::single("!"),
            allow_mention: false,
            block_bots: true,
            block_self: true,
            default_cooldown: None,
            ignore_cooldown: IgnoreList::Nobody,
            ignore_permissions: IgnoreList::Nobody,
            argument_defaults: DefaultArgumentOptions::default(),
        }
    }
}

/// The result of stage 2: which command a message invokes and with what
/// remaining text.
#[derive(Clone)]
pub struct ParsedInvocation {
    pub command: Arc<dyn Command>,
    pub prefix: String,
    pub alias: String,
    /// Text after the alias, fed to argument resolution.
    pub content: String,
    /// Text after the prefix, alias included.
    pub after_prefix: String,
}

/// Terminal outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Completed {
        value: Value,
    },
    /// No prefix or alias matched.
    Invalid,
    /// The author is mid-prompt in this channel.
    InPrompt,
    Blocked {
        reason: String,
    },
    Cancelled,
    Locked,
    OnCooldown {
        remaining: Duration,
    },
    MissingPermissions {
        holder: PermissionHolder,
        missing: Vec<String>,
    },
    Failed {
        error: String,
    },
}

#[derive(Clone)]
struct CooldownRecord {
    uses: u32,
    ends_at: Instant,
    window: Duration,
}

struct CooldownExpiry;

impl Expiry<String, CooldownRecord> for CooldownExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        record: &CooldownRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(record.window)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        record: &CooldownRecord,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(record.ends_at.saturating_duration_since(updated_at))
    }
}

/// Orchestrates one inbound message end to end: prefix and alias
/// resolution, inhibition, argument resolution, permission, cooldown and
/// lock checks, then execution. Stages run strictly in that order; any
/// stage may abort the dispatch, reporting through the bus.
pub struct CommandHandler {
    options: CommandHandlerOptions,
    registry: CommandRegistry,
    inhibitors: InhibitorRegistry,
    types: TypeRegistry,
    gateway: Arc<dyn ChatGateway>,
    permissions: Arc<dyn PermissionGate>,
    resolver: Arc<dyn ChatResolver>,
    bus: Bus,
    cooldowns: Cache<String, CooldownRecord>,
    locks: Mutex<HashSet<String>>,
    prompts: Mutex<HashSet<(String, String)>>,
}

impl CommandHandler {
    pub fn new(gateway: Arc<dyn ChatGateway>, options: CommandHandlerOptions) -> Self {
        Self {
            options,
            registry: CommandRegistry::new(),
            inhibitors: InhibitorRegistry::new(),
            types: TypeRegistry::with_builtins(),
            gateway,
            permissions: Arc::new(Unrestricted),
            resolver: Arc::new(NullResolver),
            bus: Bus::default(),
            cooldowns: Cache::builder().expire_after(CooldownExpiry).build(),
            locks: Mutex::new(HashSet::new()),
            prompts: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_permissions(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permissions = gate;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ChatResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn register_command(&mut self, command: Arc<dyn Command>) -> EngineResult<()> {
        self.registry.register(command)
    }

    pub fn register_inhibitor(&mut self, inhibitor: Arc<dyn Inhibitor>) {
        self.inhibitors.register(inhibitor);
    }

    pub fn register_type(
        &mut self,
        name: impl Into<String>,
        caster: Arc<dyn crate::command::arguments::types::TypeCaster>,
    ) {
        self.types.register(name, caster);
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DispatchEvent> {
        self.bus.subscribe()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn resolver(&self) -> &dyn ChatResolver {
        self.resolver.as_ref()
    }

    pub fn argument_defaults(&self) -> &DefaultArgumentOptions {
        &self.options.argument_defaults
    }

    /// Dispatch one inbound message through the full pipeline.
    pub async fn handle(&self, message: &ChatMessage) -> EngineResult<DispatchOutcome> {
        let dispatch_id = Uuid::now_v7();
        tracing::debug!(%dispatch_id, message_id = %message.id, "handling message");

        // Eligibility: never dispatch our own or other bots' messages, and
        // never treat a prompt reply as a fresh invocation.
        if self.options.block_self
            && !self.options.self_id.is_empty()
            && message.author.id == self.options.self_id
        {
            self.notify_message_blocked(message, reasons::CLIENT);
            return Ok(DispatchOutcome::Blocked {
                reason: reasons::CLIENT.to_string(),
            });
        }
        if self.options.block_bots && message.author.is_bot {
            self.notify_message_blocked(message, reasons::BOT);
            return Ok(DispatchOutcome::Blocked {
                reason: reasons::BOT.to_string(),
            });
        }
        if self.has_prompt(&message.channel_id, &message.author.id) {
            self.emit(DispatchEvent::InPrompt(InPromptPayload {
                message: message.clone(),
            }));
            return Ok(DispatchOutcome::InPrompt);
        }

        let Some(parsed) = self.parse_command(message).await? else {
            self.emit(DispatchEvent::MessageInvalid(MessageInvalidPayload {
                message: message.clone(),
            }));
            return Ok(DispatchOutcome::Invalid);
        };

        self.run_stages(message.clone(), parsed.command, parsed.content, false, 0)
            .await
    }

    /// Run a known command directly, skipping prefix resolution. Used for
    /// handoffs and exposed for embedders that route invocations
    /// themselves.
    pub async fn handle_direct(
        &self,
        message: &ChatMessage,
        command: Arc<dyn Command>,
        content: &str,
        ignore_permissions: bool,
    ) -> EngineResult<DispatchOutcome> {
        self.run_stages(
            message.clone(),
            command,
            content.to_string(),
            ignore_permissions,
            0,
        )
        .await
    }

    /// Resolve a command's arguments against a message without dispatching.
    pub async fn resolve_arguments(
        &self,
        message: &ChatMessage,
        command: &dyn Command,
        content: &str,
    ) -> EngineResult<Resolved> {
        let config = command.config();
        let (flag_words, option_flag_words) = config.flag_words();
        let tokens = Tokenizer::new()
            .flag_words(flag_words)
            .option_flag_words(option_flag_words)
            .quoted(config.quoted)
            .separator(config.separator.clone())
            .tokenize(content);
        let mut sequence = command.arguments();
        ArgumentRunner::new(self, config)
            .run(message, &tokens, sequence.as_mut())
            .await
    }

    /// Resolve a bare declaration list against a message, outside any
    /// registered command.
    pub async fn resolve_declarations(
        &self,
        message: &ChatMessage,
        declarations: Vec<ArgumentOptions>,
        content: &str,
    ) -> EngineResult<Resolved> {
        let config = CommandConfig::new("inline").args(declarations.clone());
        let (flag_words, option_flag_words) = config.flag_words();
        let tokens = Tokenizer::new()
            .flag_words(flag_words)
            .option_flag_words(option_flag_words)
            .tokenize(content);
        let mut sequence = DeclaredSequence::new(declarations);
        ArgumentRunner::new(self, &config)
            .run(message, &tokens, &mut sequence)
            .await
    }

    /// Stage 2: match a prefix (per-command overrides first, then the
    /// handler-wide set, longest first) and resolve the following word to a
    /// command alias.
    pub async fn parse_command(
        &self,
        message: &ChatMessage,
    ) -> EngineResult<Option<ParsedInvocation>> {
        if let Some(parsed) = self.parse_overridden(message) {
            return Ok(Some(parsed));
        }

        let mut prefixes = self.options.prefix.resolve(message).await;
        if self.options.allow_mention && !self.options.self_id.is_empty() {
            prefixes.push(format!("<@{}>", self.options.self_id));
            prefixes.push(format!("<@!{}>", self.options.self_id));
        }
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));

        for prefix in &prefixes {
            if let Some(parsed) = self.parse_with_prefix(message, prefix, None) {
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }

    fn parse_overridden(&self, message: &ChatMessage) -> Option<ParsedInvocation> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for command in self.registry.iter() {
            if let Some(prefixes) = &command.config().prefix_override {
                for prefix in prefixes {
                    pairs.push((prefix.clone(), command.config().id.clone()));
                }
            }
        }
        pairs.sort_by_key(|(p, _)| std::cmp::Reverse(p.len()));

        for (prefix, id) in &pairs {
            if let Some(parsed) = self.parse_with_prefix(message, prefix, Some(id.as_str())) {
                return Some(parsed);
            }
        }
        None
    }

    fn parse_with_prefix(
        &self,
        message: &ChatMessage,
        prefix: &str,
        expected_id: Option<&str>,
    ) -> Option<ParsedInvocation> {
        let body = &message.body;
        if !body
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            return None;
        }

        let after_prefix = body[prefix.len()..].trim_start();
        let alias_end = after_prefix
            .find(char::is_whitespace)
            .unwrap_or(after_prefix.len());
        let alias = &after_prefix[..alias_end];
        if alias.is_empty() {
            return None;
        }

        let command = self.registry.find(alias)?;
        match expected_id {
            Some(expected) => {
                if command.config().id != expected {
                    return None;
                }
            }
            // Commands with their own prefixes never match the global set.
            None => {
                if command.config().prefix_override.is_some() {
                    return None;
                }
            }
        }

        Some(ParsedInvocation {
            command,
            prefix: prefix.to_string(),
            alias: alias.to_string(),
            content: after_prefix[alias_end..].trim_start().to_string(),
            after_prefix: after_prefix.to_string(),
        })
    }

    fn run_stages_boxed<'a>(
        &'a self,
        message: ChatMessage,
        command: Arc<dyn Command>,
        content: String,
        ignore_permissions: bool,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = EngineResult<DispatchOutcome>> + Send + 'a>> {
        Box::pin(self.run_stages(message, command, content, ignore_permissions, depth))
    }

    /// Stages 3 through 9 for a resolved command.
    async fn run_stages(
        &self,
        message: ChatMessage,
        command: Arc<dyn Command>,
        content: String,
        ignore_permissions: bool,
        depth: usize,
    ) -> EngineResult<DispatchOutcome> {
        if depth > MAX_HANDOFF_DEPTH {
            return Err(EngineError::Internal(
                "command handoff depth exceeded".to_string(),
            ));
        }
        let config = command.config();

        // Stage 3: pre-type inhibitors, before any command-specific logic.
        if let Some(reason) = self
            .inhibitors
            .test(InhibitorPhase::Pre, &message, None)
            .await
        {
            self.notify_message_blocked(&message, &reason);
            return Ok(DispatchOutcome::Blocked { reason });
        }

        command.before(&message).await;

        // Stage 4: argument resolution, re-entered on retry signals.
        let mut current = message.clone();
        let mut content = content;
        let args = loop {
            match self
                .resolve_arguments(&current, command.as_ref(), &content)
                .await?
            {
                Resolved::Value(args) => break args,
                Resolved::Signal(Signal::Cancel) => {
                    self.notify_cancelled(&current, &config.id);
                    return Ok(DispatchOutcome::Cancelled);
                }
                Resolved::Signal(Signal::Fail { value }) => {
                    if !value.is_null() {
                        self.send(&current.channel_id, value).await?;
                    }
                    self.notify_cancelled(&current, &config.id);
                    return Ok(DispatchOutcome::Cancelled);
                }
                Resolved::Signal(Signal::Retry {
                    message: replacement,
                }) => {
                    content = match self.parse_command(&replacement).await? {
                        Some(parsed) => parsed.content,
                        None => replacement.body.clone(),
                    };
                    current = replacement;
                }
                Resolved::Signal(Signal::Continue {
                    command: target,
                    ignore_permissions: ignore,
                    rest,
                }) => {
                    let Some(next) = self.registry.find(&target) else {
                        self.emit(DispatchEvent::MessageInvalid(MessageInvalidPayload {
                            message: current.clone(),
                        }));
                        return Ok(DispatchOutcome::Invalid);
                    };
                    return self
                        .run_stages_boxed(
                            current,
                            next,
                            rest.unwrap_or_default(),
                            ignore,
                            depth + 1,
                        )
                        .await;
                }
            }
        };

        // Stage 5: permission checks.
        if !ignore_permissions {
            if let Some(outcome) = self.permission_checks(&message, config).await {
                return Ok(outcome);
            }
        }

        // Stage 6: post-type inhibitors, with the resolved command in hand.
        if let Some(reason) = self
            .inhibitors
            .test(InhibitorPhase::Post, &message, Some(config))
            .await
        {
            self.emit(DispatchEvent::CommandBlocked(CommandBlockedPayload {
                message: message.clone(),
                command_id: config.id.clone(),
                reason: reason.clone(),
            }));
            return Ok(DispatchOutcome::Blocked { reason });
        }

        // Stage 7: cooldown.
        if !self.cooldown_ignored(&message, config).await {
            if let Some(remaining) = self.check_cooldown(&message, config) {
                self.emit(DispatchEvent::Cooldown(CooldownPayload {
                    message: message.clone(),
                    command_id: config.id.clone(),
                    remaining_ms: remaining.as_millis() as u64,
                }));
                return Ok(DispatchOutcome::OnCooldown { remaining });
            }
        }

        // Stages 8 and 9: execution lock, body, notifications. The guard
        // releases on every exit path.
        let guard = match &config.lock {
            Some(scope) => {
                let key = format!("{}:{}", config.id, scope.key(&message));
                match self.acquire_lock(key) {
                    Some(guard) => Some(guard),
                    None => {
                        self.emit(DispatchEvent::CommandLocked(CommandLockedPayload {
                            message: message.clone(),
                            command_id: config.id.clone(),
                        }));
                        return Ok(DispatchOutcome::Locked);
                    }
                }
            }
            None => None,
        };

        self.emit(DispatchEvent::CommandStarted(CommandStartedPayload {
            message: message.clone(),
            command_id: config.id.clone(),
            args: args.clone(),
        }));

        let result = command.exec(self, &message, args.clone()).await;
        drop(guard);

        match result {
            Ok(value) => {
                self.emit(DispatchEvent::CommandFinished(CommandFinishedPayload {
                    message: message.clone(),
                    command_id: config.id.clone(),
                    args,
                    return_value: value.clone(),
                }));
                Ok(DispatchOutcome::Completed { value })
            }
            Err(error) => {
                tracing::warn!(command = %config.id, %error, "command body failed");
                self.emit(DispatchEvent::Error(ErrorPayload {
                    message: message.clone(),
                    command_id: Some(config.id.clone()),
                    error: error.to_string(),
                }));
                Ok(DispatchOutcome::Failed {
                    error: error.to_string(),
                })
            }
        }
    }

    async fn permission_checks(
        &self,
        message: &ChatMessage,
        config: &CommandConfig,
    ) -> Option<DispatchOutcome> {
        if config.owner_only && !self.permissions.is_owner(&message.author.id).await {
            self.notify_command_blocked(message, &config.id, reasons::OWNER);
            return Some(DispatchOutcome::Blocked {
                reason: reasons::OWNER.to_string(),
            });
        }

        match config.channel {
            ChannelScope::GuildOnly if message.guild_id.is_none() => {
                self.notify_command_blocked(message, &config.id, reasons::GUILD);
                return Some(DispatchOutcome::Blocked {
                    reason: reasons::GUILD.to_string(),
                });
            }
            ChannelScope::DmOnly if message.guild_id.is_some() => {
                self.notify_command_blocked(message, &config.id, reasons::DM);
                return Some(DispatchOutcome::Blocked {
                    reason: reasons::DM.to_string(),
                });
            }
            _ => {}
        }

        if !config.client_permissions.is_empty() {
            let missing = self
                .permissions
                .missing(message, PermissionHolder::Client, &config.client_permissions)
                .await;
            if !missing.is_empty() {
                self.notify_missing_permissions(message, config, PermissionHolder::Client, &missing);
                return Some(DispatchOutcome::MissingPermissions {
                    holder: PermissionHolder::Client,
                    missing,
                });
            }
        }

        let ignored = config.ignore_permissions.matches(message, config)
            || self.options.ignore_permissions.matches(message, config);
        if !config.user_permissions.is_empty() && !ignored {
            let missing = self
                .permissions
                .missing(message, PermissionHolder::User, &config.user_permissions)
                .await;
            if !missing.is_empty() {
                self.notify_missing_permissions(message, config, PermissionHolder::User, &missing);
                return Some(DispatchOutcome::MissingPermissions {
                    holder: PermissionHolder::User,
                    missing,
                });
            }
        }

        None
    }

    async fn cooldown_ignored(&self, message: &ChatMessage, config: &CommandConfig) -> bool {
        config.ignore_cooldown.matches(message, config)
            || self.options.ignore_cooldown.matches(message, config)
            || self.permissions.is_owner(&message.author.id).await
    }

    /// Returns the remaining window when the dispatch key is rate limited,
    /// otherwise counts this use. Entries evict on their own window.
    fn check_cooldown(&self, message: &ChatMessage, config: &CommandConfig) -> Option<Duration> {
        let window = config.cooldown.or(self.options.default_cooldown)?;
        let ratelimit = config.ratelimit.max(1);
        let key = format!("{}:{}", config.id, config.dispatch_key(message));
        let now = Instant::now();

        let mut remaining = None;
        let _ = self.cooldowns.entry(key).and_compute_with(|entry| match entry {
            Some(entry) => {
                let mut record = entry.into_value();
                if record.uses >= ratelimit {
                    remaining = Some(record.ends_at.saturating_duration_since(now));
                    Op::Nop
                } else {
                    record.uses += 1;
                    Op::Put(record)
                }
            }
            None => Op::Put(CooldownRecord {
                uses: 1,
                ends_at: now + window,
                window,
            }),
        });
        remaining
    }

    fn acquire_lock(&self, key: String) -> Option<LockGuard<'_>> {
        let mut held = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !held.insert(key.clone()) {
            return None;
        }
        drop(held);
        Some(LockGuard {
            locks: &self.locks,
            key,
        })
    }

    pub(crate) fn add_prompt(&self, channel_id: &str, user_id: &str) {
        let mut prompts = self
            .prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        prompts.insert((channel_id.to_string(), user_id.to_string()));
    }

    pub(crate) fn remove_prompt(&self, channel_id: &str, user_id: &str) {
        let mut prompts = self
            .prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        prompts.remove(&(channel_id.to_string(), user_id.to_string()));
    }

    /// Whether a prompt is live for this channel and user.
    pub fn has_prompt(&self, channel_id: &str, user_id: &str) -> bool {
        let prompts = self
            .prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        prompts.contains(&(channel_id.to_string(), user_id.to_string()))
    }

    pub(crate) async fn send(&self, channel_id: &str, content: Value) -> EngineResult<()> {
        self.gateway.send(channel_id, content).await
    }

    /// Next reply from the user in the channel, bounded by the prompt time
    /// limit when one applies. `None` is a timeout or a closed stream.
    pub(crate) async fn await_reply(
        &self,
        channel_id: &str,
        user_id: &str,
        limit: Option<Duration>,
    ) -> EngineResult<Option<ChatMessage>> {
        match limit {
            None => self.gateway.next_reply(channel_id, user_id).await,
            Some(limit) => {
                match tokio::time::timeout(limit, self.gateway.next_reply(channel_id, user_id))
                    .await
                {
                    Ok(reply) => reply,
                    Err(_) => Ok(None),
                }
            }
        }
    }

    pub(crate) fn notify_breakout(
        &self,
        message: &ChatMessage,
        command_id: &str,
        breakout_message: &ChatMessage,
    ) {
        self.emit(DispatchEvent::CommandBreakout(CommandBreakoutPayload {
            message: message.clone(),
            command_id: command_id.to_string(),
            breakout_message: breakout_message.clone(),
        }));
    }

    fn notify_message_blocked(&self, message: &ChatMessage, reason: &str) {
        self.emit(DispatchEvent::MessageBlocked(MessageBlockedPayload {
            message: message.clone(),
            reason: reason.to_string(),
        }));
    }

    fn notify_command_blocked(&self, message: &ChatMessage, command_id: &str, reason: &str) {
        self.emit(DispatchEvent::CommandBlocked(CommandBlockedPayload {
            message: message.clone(),
            command_id: command_id.to_string(),
            reason: reason.to_string(),
        }));
    }

    fn notify_cancelled(&self, message: &ChatMessage, command_id: &str) {
        self.emit(DispatchEvent::CommandCancelled(CommandCancelledPayload {
            message: message.clone(),
            command_id: command_id.to_string(),
        }));
    }

    fn notify_missing_permissions(
        &self,
        message: &ChatMessage,
        config: &CommandConfig,
        holder: PermissionHolder,
        missing: &[String],
    ) {
        self.emit(DispatchEvent::MissingPermissions(
            MissingPermissionsPayload {
                message: message.clone(),
                command_id: config.id.clone(),
                holder,
                missing: missing.to_vec(),
            },
        ));
    }

    fn emit(&self, event: DispatchEvent) {
        let _ = self.bus.publish(event);
    }
}

/// Releases a held execution lock on every exit path, panic included.
struct LockGuard<'a> {
    locks: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.key);
    }
}
