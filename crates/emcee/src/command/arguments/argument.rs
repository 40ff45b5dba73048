use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::command::arguments::types::{
    cast_type, ArgumentMatch, ArgumentType, Cast, CastContext, Unordered,
};
use crate::command::handler::CommandHandler;
use crate::command::signal::{Resolved, Signal};
use crate::command::types::CommandConfig;
use crate::error::EngineResult;
use crate::message::ChatMessage;

/// What failed while casting a phrase, handed to default suppliers and
/// otherwise content.
#[derive(Debug, Clone)]
pub struct FailureData {
    pub phrase: String,
    pub failure: Option<Value>,
}

/// Protocol metadata handed to prompt content suppliers and modifiers.
#[derive(Debug, Clone)]
pub struct PromptData {
    /// Attempt number, starting at 1.
    pub retries: u32,
    pub infinite: bool,
    /// The phrase that originally failed to cast.
    pub phrase: String,
    pub failure: Option<Value>,
}

pub type DefaultSupplier = Arc<dyn Fn(&ChatMessage, &FailureData) -> Value + Send + Sync>;

/// Fallback when casting fails and no prompt resolves the argument.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Supplier(DefaultSupplier),
}

impl DefaultValue {
    pub fn resolve(&self, message: &ChatMessage, data: &FailureData) -> Value {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Supplier(supplier) => supplier(message, data),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => write!(f, "Value({value})"),
            DefaultValue::Supplier(_) => write!(f, "Supplier(..)"),
        }
    }
}

pub type OtherwiseSupplier = Arc<dyn Fn(&ChatMessage, &FailureData) -> Value + Send + Sync>;
pub type OtherwiseModifier = Arc<dyn Fn(&ChatMessage, Value, &FailureData) -> Value + Send + Sync>;

/// User-facing content produced when an argument cannot be resolved and no
/// prompt is configured.
#[derive(Clone)]
pub enum OtherwiseContent {
    Value(Value),
    Supplier(OtherwiseSupplier),
}

impl OtherwiseContent {
    pub fn text(text: impl Into<String>) -> Self {
        OtherwiseContent::Value(Value::String(text.into()))
    }

    pub fn resolve(&self, message: &ChatMessage, data: &FailureData) -> Value {
        match self {
            OtherwiseContent::Value(value) => value.clone(),
            OtherwiseContent::Supplier(supplier) => supplier(message, data),
        }
    }
}

impl fmt::Debug for OtherwiseContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtherwiseContent::Value(value) => write!(f, "Value({value})"),
            OtherwiseContent::Supplier(_) => write!(f, "Supplier(..)"),
        }
    }
}

pub type PromptSupplier = Arc<dyn Fn(&ChatMessage, &PromptData) -> Value + Send + Sync>;
pub type PromptModifier = Arc<dyn Fn(&ChatMessage, Value, &PromptData) -> Value + Send + Sync>;

/// Content for one prompt protocol state.
#[derive(Clone)]
pub enum PromptContent {
    Value(Value),
    Supplier(PromptSupplier),
}

impl PromptContent {
    pub fn text(text: impl Into<String>) -> Self {
        PromptContent::Value(Value::String(text.into()))
    }

    pub fn resolve(&self, message: &ChatMessage, data: &PromptData) -> Value {
        match self {
            PromptContent::Value(value) => value.clone(),
            PromptContent::Supplier(supplier) => supplier(message, data),
        }
    }
}

impl fmt::Debug for PromptContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptContent::Value(value) => write!(f, "Value({value})"),
            PromptContent::Supplier(_) => write!(f, "Supplier(..)"),
        }
    }
}

/// Policy for prompting the user when a required argument is missing or
/// invalid.
#[derive(Clone)]
pub struct PromptOptions {
    /// Replies accepted after the first failed attempt.
    pub retries: u32,
    /// Reply time limit per attempt.
    pub time: Duration,
    /// Disable the reply time limit.
    pub infinite: bool,
    pub cancel_word: String,
    pub stop_word: String,
    /// Resolve to the default instead of cancelling on timeout.
    pub optional: bool,
    /// Allow a reply that invokes another command to hand the dispatch off.
    pub breakout: bool,
    pub start: Option<PromptContent>,
    pub retry: Option<PromptContent>,
    pub timeout: Option<PromptContent>,
    pub ended: Option<PromptContent>,
    pub cancel: Option<PromptContent>,
    pub modify_start: Option<PromptModifier>,
    pub modify_retry: Option<PromptModifier>,
    pub modify_timeout: Option<PromptModifier>,
    pub modify_ended: Option<PromptModifier>,
    pub modify_cancel: Option<PromptModifier>,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            retries: 1,
            time: Duration::from_secs(30),
            infinite: false,
            cancel_word: "cancel".to_string(),
            stop_word: "stop".to_string(),
            optional: false,
            breakout: true,
            start: None,
            retry: None,
            timeout: None,
            ended: None,
            cancel: None,
            modify_start: None,
            modify_retry: None,
            modify_timeout: None,
            modify_ended: None,
            modify_cancel: None,
        }
    }
}

impl fmt::Debug for PromptOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptOptions")
            .field("retries", &self.retries)
            .field("time", &self.time)
            .field("infinite", &self.infinite)
            .field("cancel_word", &self.cancel_word)
            .field("stop_word", &self.stop_word)
            .field("optional", &self.optional)
            .field("breakout", &self.breakout)
            .finish_non_exhaustive()
    }
}

/// Handler- or command-level defaults applied to every argument that does
/// not override them.
#[derive(Clone, Default)]
pub struct DefaultArgumentOptions {
    pub prompt: Option<PromptOptions>,
    pub otherwise: Option<OtherwiseContent>,
    pub modify_otherwise: Option<OtherwiseModifier>,
}

impl fmt::Debug for DefaultArgumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultArgumentOptions")
            .field("prompt", &self.prompt)
            .field("otherwise", &self.otherwise)
            .finish_non_exhaustive()
    }
}

/// Immutable configuration of one argument slot.
#[derive(Clone)]
pub struct ArgumentOptions {
    pub id: String,
    pub match_kind: ArgumentMatch,
    pub ty: ArgumentType,
    /// Explicit token position; `None` means sequential.
    pub index: Option<usize>,
    /// Maximum tokens consumed.
    pub limit: usize,
    /// Flag names for flag/option matching, without leading dashes.
    pub flags: Vec<String>,
    /// Collect every occurrence of the flag instead of the first.
    pub multiple_flags: bool,
    pub unordered: Unordered,
    pub default: Option<DefaultValue>,
    pub otherwise: Option<OtherwiseContent>,
    pub modify_otherwise: Option<OtherwiseModifier>,
    pub prompt: Option<PromptOptions>,
    pub description: String,
}

impl ArgumentOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            match_kind: ArgumentMatch::Phrase,
            ty: ArgumentType::name("string"),
            index: None,
            limit: usize::MAX,
            flags: Vec::new(),
            multiple_flags: false,
            unordered: Unordered::No,
            default: None,
            otherwise: None,
            modify_otherwise: None,
            prompt: None,
            description: String::new(),
        }
    }

    pub fn match_kind(mut self, kind: ArgumentMatch) -> Self {
        self.match_kind = kind;
        self
    }

    pub fn ty(mut self, ty: ArgumentType) -> Self {
        self.ty = ty;
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.flags.push(name.into());
        self
    }

    pub fn multiple_flags(mut self) -> Self {
        self.multiple_flags = true;
        self
    }

    pub fn unordered(mut self, unordered: Unordered) -> Self {
        self.unordered = unordered;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    pub fn default_with(mut self, supplier: DefaultSupplier) -> Self {
        self.default = Some(DefaultValue::Supplier(supplier));
        self
    }

    pub fn otherwise(mut self, content: OtherwiseContent) -> Self {
        self.otherwise = Some(content);
        self
    }

    pub fn prompt(mut self, options: PromptOptions) -> Self {
        self.prompt = Some(options);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Debug for ArgumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentOptions")
            .field("id", &self.id)
            .field("match_kind", &self.match_kind)
            .field("ty", &self.ty)
            .field("index", &self.index)
            .field("limit", &self.limit)
            .field("flags", &self.flags)
            .field("unordered", &self.unordered)
            .finish_non_exhaustive()
    }
}

/// One declared argument slot bound to its command and handler for the
/// duration of a dispatch.
pub struct Argument<'a> {
    pub handler: &'a CommandHandler,
    pub command: &'a CommandConfig,
    pub options: &'a ArgumentOptions,
}

impl<'a> Argument<'a> {
    /// Apply the configured type to one phrase. Never prompts.
    pub async fn cast(&self, message: &ChatMessage, phrase: &str) -> EngineResult<Cast> {
        let ctx = self.cast_context(message);
        cast_type(&self.options.ty, &ctx, phrase).await
    }

    /// Cast, then fall back in order to the prompt protocol, the default
    /// supplier, the otherwise content (as a fail signal), or null.
    pub async fn process(&self, message: &ChatMessage, phrase: &str) -> EngineResult<Resolved> {
        let cast = self.cast(message, phrase).await?;
        let failure = match cast {
            Cast::Ok(value) => return Ok(Resolved::Value(value)),
            Cast::NoMatch(failure) => failure,
        };
        let data = FailureData {
            phrase: phrase.to_string(),
            failure: failure.clone(),
        };

        if let Some(prompt) = self.merged_prompt() {
            if phrase.is_empty() && prompt.optional {
                return Ok(Resolved::Value(self.default_or_null(message, &data)));
            }
            let prompt = prompt.clone();
            return self.collect(message, phrase, failure, &prompt).await;
        }

        if self.options.default.is_some() {
            return Ok(Resolved::Value(self.default_or_null(message, &data)));
        }

        if let Some(otherwise) = self.merged_otherwise() {
            let mut content = otherwise.resolve(message, &data);
            if let Some(modifier) = self.merged_modify_otherwise() {
                content = modifier(message, content, &data);
            }
            return Ok(Resolved::Signal(Signal::Fail { value: content }));
        }

        Ok(Resolved::Value(Value::Null))
    }

    /// Prompt Retry Protocol: suspend on the gateway awaiting replies from
    /// the same user and channel until one casts, the user opts out, the
    /// time limit passes, or retries run out.
    pub async fn collect(
        &self,
        message: &ChatMessage,
        phrase: &str,
        failure: Option<Value>,
        prompt: &PromptOptions,
    ) -> EngineResult<Resolved> {
        let channel = message.channel_id.clone();
        let user = message.author.id.clone();
        self.handler.add_prompt(&channel, &user);
        let _guard = PromptGuard {
            handler: self.handler,
            channel: channel.clone(),
            user: user.clone(),
        };

        let mut failures: u32 = 0;
        let mut last_failure = failure;
        let data = |attempt: u32, failure: &Option<Value>| PromptData {
            retries: attempt,
            infinite: prompt.infinite,
            phrase: phrase.to_string(),
            failure: failure.clone(),
        };

        self.send_prompt(
            message,
            prompt.start.as_ref(),
            prompt.modify_start.as_ref(),
            &data(1, &last_failure),
        )
        .await?;

        loop {
            let limit = (!prompt.infinite).then_some(prompt.time);
            let reply = self.handler.await_reply(&channel, &user, limit).await?;
            let Some(reply) = reply else {
                self.send_prompt(
                    message,
                    prompt.timeout.as_ref(),
                    prompt.modify_timeout.as_ref(),
                    &data(failures + 1, &last_failure),
                )
                .await?;
                if prompt.optional {
                    let failure_data = FailureData {
                        phrase: phrase.to_string(),
                        failure: last_failure.clone(),
                    };
                    return Ok(Resolved::Value(self.default_or_null(message, &failure_data)));
                }
                return Ok(Resolved::Signal(Signal::Cancel));
            };

            let body = reply.body.trim().to_string();
            if body.eq_ignore_ascii_case(&prompt.cancel_word) {
                self.send_prompt(
                    message,
                    prompt.cancel.as_ref(),
                    prompt.modify_cancel.as_ref(),
                    &data(failures + 1, &last_failure),
                )
                .await?;
                return Ok(Resolved::Signal(Signal::Cancel));
            }
            if body.eq_ignore_ascii_case(&prompt.stop_word) {
                return Ok(Resolved::Value(Value::Null));
            }

            if prompt.breakout {
                if let Some(parsed) = self.handler.parse_command(&reply).await? {
                    self.handler.notify_breakout(message, &self.command.id, &reply);
                    return Ok(Resolved::Signal(Signal::Continue {
                        command: parsed.command.config().id.clone(),
                        ignore_permissions: false,
                        rest: Some(parsed.content),
                    }));
                }
            }

            match self.cast(&reply, &body).await? {
                Cast::Ok(value) => return Ok(Resolved::Value(value)),
                Cast::NoMatch(f) => {
                    last_failure = f;
                    failures += 1;
                    if failures <= prompt.retries {
                        self.send_prompt(
                            message,
                            prompt.retry.as_ref(),
                            prompt.modify_retry.as_ref(),
                            &data(failures + 1, &last_failure),
                        )
                        .await?;
                    } else {
                        self.send_prompt(
                            message,
                            prompt.ended.as_ref(),
                            prompt.modify_ended.as_ref(),
                            &data(failures + 1, &last_failure),
                        )
                        .await?;
                        return Ok(Resolved::Signal(Signal::Cancel));
                    }
                }
            }
        }
    }

    fn cast_context<'m>(&'m self, message: &'m ChatMessage) -> CastContext<'m> {
        CastContext {
            message,
            resolver: self.handler.resolver(),
            registry: self.handler.registry(),
            types: self.handler.types(),
        }
    }

    fn merged_prompt(&self) -> Option<&PromptOptions> {
        self.options
            .prompt
            .as_ref()
            .or(self.command.argument_defaults.prompt.as_ref())
            .or(self.handler.argument_defaults().prompt.as_ref())
    }

    fn merged_otherwise(&self) -> Option<&OtherwiseContent> {
        self.options
            .otherwise
            .as_ref()
            .or(self.command.argument_defaults.otherwise.as_ref())
            .or(self.handler.argument_defaults().otherwise.as_ref())
    }

    fn merged_modify_otherwise(&self) -> Option<&OtherwiseModifier> {
        self.options
            .modify_otherwise
            .as_ref()
            .or(self.command.argument_defaults.modify_otherwise.as_ref())
            .or(self.handler.argument_defaults().modify_otherwise.as_ref())
    }

    fn default_or_null(&self, message: &ChatMessage, data: &FailureData) -> Value {
        self.options
            .default
            .as_ref()
            .map_or(Value::Null, |d| d.resolve(message, data))
    }

    async fn send_prompt(
        &self,
        message: &ChatMessage,
        content: Option<&PromptContent>,
        modifier: Option<&PromptModifier>,
        data: &PromptData,
    ) -> EngineResult<()> {
        let mut value = match (content, modifier) {
            (None, None) => return Ok(()),
            (content, _) => content.map_or(Value::Null, |c| c.resolve(message, data)),
        };
        if let Some(modifier) = modifier {
            value = modifier(message, value, data);
        }
        match &value {
            Value::Null => Ok(()),
            Value::String(s) if s.is_empty() => Ok(()),
            _ => self.handler.send(&message.channel_id, value).await,
        }
    }
}

/// Clears the in-prompt marker on every exit path out of [`Argument::collect`].
struct PromptGuard<'a> {
    handler: &'a CommandHandler,
    channel: String,
    user: String,
}

impl Drop for PromptGuard<'_> {
    fn drop(&mut self) {
        self.handler.remove_prompt(&self.channel, &self.user);
    }
}
