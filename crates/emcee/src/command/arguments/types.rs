use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use url::Url;

use crate::command::registry::CommandRegistry;
use crate::error::{EngineError, EngineResult};
use crate::message::{ChatMessage, ChatResolver};

/// How an argument slot consumes tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentMatch {
    Phrase,
    Rest,
    Separate,
    Flag,
    Option,
    Text,
    Content,
    RestContent,
    None,
}

impl ArgumentMatch {
    /// Parse a strategy name. Unknown names are a configuration error, not
    /// a crash at match time.
    pub fn parse(name: &str) -> EngineResult<Self> {
        match name {
            "phrase" => Ok(Self::Phrase),
            "rest" => Ok(Self::Rest),
            "separate" => Ok(Self::Separate),
            "flag" => Ok(Self::Flag),
            "option" => Ok(Self::Option),
            "text" => Ok(Self::Text),
            "content" => Ok(Self::Content),
            "restContent" => Ok(Self::RestContent),
            "none" => Ok(Self::None),
            other => Err(EngineError::UnknownMatchStrategy(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phrase => "phrase",
            Self::Rest => "rest",
            Self::Separate => "separate",
            Self::Flag => "flag",
            Self::Option => "option",
            Self::Text => "text",
            Self::Content => "content",
            Self::RestContent => "restContent",
            Self::None => "none",
        }
    }
}

/// Candidate phrase positions for unordered matching.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Unordered {
    /// Ordinary positional matching.
    #[default]
    No,
    /// Scan every phrase.
    All,
    /// Scan phrases from the given offset onward.
    From(usize),
    /// Scan exactly these phrase positions.
    Indices(Vec<usize>),
}

/// Outcome of one cast attempt. `NoMatch` is not an error; it drives the
/// default/prompt logic. Its payload carries a caster-supplied failure value
/// surfaced to prompts and default suppliers.
#[derive(Debug, Clone, PartialEq)]
pub enum Cast {
    Ok(Value),
    NoMatch(Option<Value>),
}

impl Cast {
    pub fn none() -> Self {
        Cast::NoMatch(None)
    }

    pub fn ok(value: impl Into<Value>) -> Self {
        Cast::Ok(value.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Cast::NoMatch(_))
    }
}

/// Everything a caster may consult while converting one phrase.
pub struct CastContext<'a> {
    pub message: &'a ChatMessage,
    pub resolver: &'a dyn ChatResolver,
    pub registry: &'a CommandRegistry,
    pub types: &'a TypeRegistry,
}

/// Converts one textual token into a typed value, or signals no-match.
/// Casters must be pure given a fixed context.
#[async_trait]
pub trait TypeCaster: Send + Sync {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast>;
}

/// The type an argument slot casts to.
#[derive(Clone)]
pub enum ArgumentType {
    /// Named entry in the [`TypeRegistry`].
    Name(String),
    /// Restrict input to the given strings, case-insensitive. Inner vectors
    /// are alias groups; the first entry of a matched group is returned.
    Choices(Vec<Vec<String>>),
    /// Whole-token regular expression. Yields the match text and capture
    /// groups; with `global` set, also every match in the token.
    Pattern { regex: Regex, global: bool },
    /// Custom caster object.
    Caster(Arc<dyn TypeCaster>),
}

impl ArgumentType {
    pub fn name(name: impl Into<String>) -> Self {
        ArgumentType::Name(name.into())
    }

    /// Flat alternative list: every entry is its own canonical value.
    pub fn choices<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArgumentType::Choices(entries.into_iter().map(|e| vec![e.into()]).collect())
    }

    pub fn alias_groups(groups: Vec<Vec<String>>) -> Self {
        ArgumentType::Choices(groups)
    }

    pub fn pattern(regex: Regex) -> Self {
        ArgumentType::Pattern {
            regex,
            global: false,
        }
    }

    pub fn pattern_global(regex: Regex) -> Self {
        ArgumentType::Pattern {
            regex,
            global: true,
        }
    }

    pub fn caster(caster: Arc<dyn TypeCaster>) -> Self {
        ArgumentType::Caster(caster)
    }
}

impl fmt::Debug for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentType::Name(name) => write!(f, "Name({name:?})"),
            ArgumentType::Choices(groups) => write!(f, "Choices({groups:?})"),
            ArgumentType::Pattern { regex, global } => {
                write!(f, "Pattern({:?}, global: {global})", regex.as_str())
            }
            ArgumentType::Caster(_) => write!(f, "Caster(..)"),
        }
    }
}

/// Apply an argument type to one phrase. Unknown type names surface as a
/// configuration error.
pub async fn cast_type(
    ty: &ArgumentType,
    ctx: &CastContext<'_>,
    phrase: &str,
) -> EngineResult<Cast> {
    match ty {
        ArgumentType::Name(name) => match ctx.types.get(name) {
            Some(caster) => caster.cast(ctx, phrase).await,
            None => Err(EngineError::UnknownType(name.clone())),
        },
        ArgumentType::Choices(groups) => {
            if phrase.is_empty() {
                return Ok(Cast::none());
            }
            for group in groups {
                if group.iter().any(|entry| entry.eq_ignore_ascii_case(phrase)) {
                    if let Some(canonical) = group.first() {
                        return Ok(Cast::ok(canonical.clone()));
                    }
                }
            }
            Ok(Cast::none())
        }
        ArgumentType::Pattern { regex, global } => {
            if phrase.is_empty() {
                return Ok(Cast::none());
            }
            let Some(captures) = regex.captures(phrase) else {
                return Ok(Cast::none());
            };
            let groups: Vec<Value> = captures
                .iter()
                .skip(1)
                .map(|m| m.map_or(Value::Null, |m| Value::String(m.as_str().to_string())))
                .collect();
            let mut result = json!({
                "match": captures.get(0).map_or("", |m| m.as_str()),
                "groups": groups,
            });
            if *global {
                let matches: Vec<Value> = regex
                    .find_iter(phrase)
                    .map(|m| Value::String(m.as_str().to_string()))
                    .collect();
                result["matches"] = Value::Array(matches);
            }
            Ok(Cast::Ok(result))
        }
        ArgumentType::Caster(caster) => caster.cast(ctx, phrase).await,
    }
}

/// Registry mapping type names to casters. Prepopulated with the built-in
/// types; embedders register their own on top.
pub struct TypeRegistry {
    casters: HashMap<String, Arc<dyn TypeCaster>>,
}

impl TypeRegistry {
    pub fn empty() -> Self {
        Self {
            casters: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("string", sync_caster(string_caster));
        registry.register("lowercase", sync_caster(lowercase_caster));
        registry.register("uppercase", sync_caster(uppercase_caster));
        registry.register("char_codes", sync_caster(char_codes_caster));
        registry.register("number", sync_caster(number_caster));
        registry.register("integer", sync_caster(integer_caster));
        registry.register("emojint", sync_caster(emojint_caster));
        registry.register("url", sync_caster(url_caster));
        registry.register("date", sync_caster(date_caster));
        registry.register("color", sync_caster(color_caster));
        registry.register("timespan", sync_caster(timespan_caster));
        registry.register("user", Arc::new(ResolverType(ResolveKind::User)));
        registry.register("member", Arc::new(ResolverType(ResolveKind::Member)));
        registry.register("channel", Arc::new(ResolverType(ResolveKind::Channel)));
        registry.register("role", Arc::new(ResolverType(ResolveKind::Role)));
        registry.register("emoji", Arc::new(ResolverType(ResolveKind::Emoji)));
        registry.register("guild", Arc::new(ResolverType(ResolveKind::Guild)));
        registry.register("command_alias", Arc::new(CommandAliasType));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, caster: Arc<dyn TypeCaster>) {
        self.casters.insert(name.into(), caster);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TypeCaster>> {
        self.casters.get(name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

struct FnCaster<F>(F);

#[async_trait]
impl<F> TypeCaster for FnCaster<F>
where
    F: Fn(&CastContext<'_>, &str) -> Cast + Send + Sync,
{
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        Ok((self.0)(ctx, phrase))
    }
}

fn sync_caster<F>(f: F) -> Arc<dyn TypeCaster>
where
    F: Fn(&CastContext<'_>, &str) -> Cast + Send + Sync + 'static,
{
    Arc::new(FnCaster(f))
}

fn string_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        Cast::none()
    } else {
        Cast::ok(phrase)
    }
}

fn lowercase_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        Cast::none()
    } else {
        Cast::ok(phrase.to_lowercase())
    }
}

fn uppercase_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        Cast::none()
    } else {
        Cast::ok(phrase.to_uppercase())
    }
}

fn char_codes_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        return Cast::none();
    }
    let codes: Vec<Value> = phrase.chars().map(|c| json!(c as u32)).collect();
    Cast::Ok(Value::Array(codes))
}

fn number_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    match phrase.parse::<f64>() {
        Ok(n) if n.is_finite() => number_value(n),
        _ => Cast::none(),
    }
}

fn integer_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if let Ok(n) = phrase.parse::<i64>() {
        return Cast::ok(n);
    }
    match phrase.parse::<f64>() {
        Ok(n) if n.is_finite() => Cast::ok(n.trunc() as i64),
        _ => Cast::none(),
    }
}

const EMOJI_DIGITS: [&str; 11] = [
    "0\u{20e3}",
    "1\u{20e3}",
    "2\u{20e3}",
    "3\u{20e3}",
    "4\u{20e3}",
    "5\u{20e3}",
    "6\u{20e3}",
    "7\u{20e3}",
    "8\u{20e3}",
    "9\u{20e3}",
    "\u{1f51f}",
];

fn emojint_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        return Cast::none();
    }
    let mut text = phrase.to_string();
    for (digit, emoji) in EMOJI_DIGITS.iter().enumerate() {
        text = text.replace(emoji, &digit.to_string());
    }
    match text.parse::<i64>() {
        Ok(n) => Cast::ok(n),
        Err(_) => Cast::none(),
    }
}

fn url_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        return Cast::none();
    }
    let inner = phrase
        .strip_prefix('<')
        .and_then(|p| p.strip_suffix('>'))
        .unwrap_or(phrase);
    match Url::parse(inner) {
        Ok(url) => Cast::ok(String::from(url)),
        Err(_) => Cast::none(),
    }
}

fn date_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        return Cast::none();
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(phrase) {
        return Cast::ok(dt.timestamp_millis());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(phrase, "%Y-%m-%d %H:%M:%S") {
        return Cast::ok(dt.and_utc().timestamp_millis());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(phrase, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Cast::ok(dt.and_utc().timestamp_millis());
        }
    }
    Cast::none()
}

fn color_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        return Cast::none();
    }
    let hex = phrase.strip_prefix('#').unwrap_or(phrase);
    match u32::from_str_radix(hex, 16) {
        Ok(color) if color <= 0xFF_FF_FF => Cast::ok(color),
        _ => Cast::none(),
    }
}

struct TimeUnit {
    name: &'static str,
    label: &'static str,
    millis: i64,
}

const TIME_UNITS: [TimeUnit; 8] = [
    TimeUnit {
        name: "years",
        label: "(?:years?|y)",
        millis: 1000 * 60 * 60 * 24 * 365,
    },
    TimeUnit {
        name: "months",
        label: "(?:months?|mo)",
        millis: 1000 * 60 * 60 * 24 * 30,
    },
    TimeUnit {
        name: "weeks",
        label: "(?:weeks?|w)",
        millis: 1000 * 60 * 60 * 24 * 7,
    },
    TimeUnit {
        name: "days",
        label: "(?:days?|d)",
        millis: 1000 * 60 * 60 * 24,
    },
    TimeUnit {
        name: "hours",
        label: "(?:hours?|hrs?|h)",
        millis: 1000 * 60 * 60,
    },
    TimeUnit {
        name: "minutes",
        label: "(?:minutes?|mins?|m)",
        millis: 1000 * 60,
    },
    TimeUnit {
        name: "seconds",
        label: "(?:seconds?|secs?|s)",
        millis: 1000,
    },
    TimeUnit {
        name: "milliseconds",
        label: "(?:milliseconds?|msecs?|ms)",
        millis: 1,
    },
];

static TIMESPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = TIME_UNITS
        .iter()
        .map(|unit| format!(r"(?:(?P<{}>-?(?:\d+)?\.?\d+) *{})?", unit.name, unit.label))
        .collect::<Vec<_>>()
        .join(r"\s*");
    Regex::new(&format!("(?i)^{pattern}$")).expect("timespan pattern")
});

fn timespan_caster(_ctx: &CastContext<'_>, phrase: &str) -> Cast {
    if phrase.is_empty() {
        return Cast::none();
    }
    let Some(captures) = TIMESPAN_RE.captures(phrase) else {
        return Cast::none();
    };
    let mut millis = 0.0_f64;
    for unit in &TIME_UNITS {
        if let Some(m) = captures.name(unit.name) {
            let amount: f64 = match m.as_str().parse() {
                Ok(amount) => amount,
                Err(_) => return Cast::none(),
            };
            millis += amount * unit.millis as f64;
        }
    }
    number_value(millis)
}

fn number_value(n: f64) -> Cast {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Cast::ok(n as i64)
    } else {
        match serde_json::Number::from_f64(n) {
            Some(n) => Cast::Ok(Value::Number(n)),
            None => Cast::none(),
        }
    }
}

#[derive(Clone, Copy)]
enum ResolveKind {
    User,
    Member,
    Channel,
    Role,
    Emoji,
    Guild,
}

struct ResolverType(ResolveKind);

#[async_trait]
impl TypeCaster for ResolverType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        if phrase.is_empty() {
            return Ok(Cast::none());
        }
        let resolved = match self.0 {
            ResolveKind::User => ctx.resolver.resolve_user(ctx.message, phrase).await,
            ResolveKind::Member => ctx.resolver.resolve_member(ctx.message, phrase).await,
            ResolveKind::Channel => ctx.resolver.resolve_channel(ctx.message, phrase).await,
            ResolveKind::Role => ctx.resolver.resolve_role(ctx.message, phrase).await,
            ResolveKind::Emoji => ctx.resolver.resolve_emoji(ctx.message, phrase).await,
            ResolveKind::Guild => ctx.resolver.resolve_guild(ctx.message, phrase).await,
        };
        Ok(resolved.map_or_else(Cast::none, Cast::Ok))
    }
}

struct CommandAliasType;

#[async_trait]
impl TypeCaster for CommandAliasType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        if phrase.is_empty() {
            return Ok(Cast::none());
        }
        Ok(ctx
            .registry
            .find(phrase)
            .map_or_else(Cast::none, |command| {
                Cast::ok(command.config().id.clone())
            }))
    }
}

/// Predicate applied by [`validate`] to a successfully cast value.
pub type ParsedValuePredicate = Arc<dyn Fn(&ChatMessage, &str, &Value) -> bool + Send + Sync>;

/// First component type that casts successfully wins.
pub fn union(types: Vec<ArgumentType>) -> ArgumentType {
    ArgumentType::caster(Arc::new(UnionType(types)))
}

/// Pipe each successful result into the next type as its phrase; no-match
/// short-circuits.
pub fn compose(types: Vec<ArgumentType>) -> ArgumentType {
    ArgumentType::caster(Arc::new(ComposeType(types)))
}

/// Wrap a successful result as `{tag, value}`.
pub fn tagged(ty: ArgumentType, tag: Value) -> ArgumentType {
    ArgumentType::caster(Arc::new(TaggedType { ty, tag }))
}

/// Try each type; tag the first success with the originating type's label.
pub fn tagged_union(types: Vec<ArgumentType>) -> ArgumentType {
    ArgumentType::caster(Arc::new(TaggedUnionType(types)))
}

/// Reject numeric results (or string/array lengths) outside the bounds.
pub fn range(ty: ArgumentType, min: f64, max: f64, inclusive: bool) -> ArgumentType {
    ArgumentType::caster(Arc::new(RangeType {
        ty,
        min,
        max,
        inclusive,
    }))
}

/// Reject successfully cast values failing the predicate.
pub fn validate(ty: ArgumentType, predicate: ParsedValuePredicate) -> ArgumentType {
    ArgumentType::caster(Arc::new(ValidateType { ty, predicate }))
}

/// Augment a successful result with the original raw text as
/// `{input, value}`.
pub fn with_input(ty: ArgumentType) -> ArgumentType {
    ArgumentType::caster(Arc::new(WithInputType { ty, tag: None }))
}

/// Like [`with_input`], plus a tag: `{tag, input, value}`.
pub fn tagged_with_input(ty: ArgumentType, tag: Value) -> ArgumentType {
    ArgumentType::caster(Arc::new(WithInputType { ty, tag: Some(tag) }))
}

fn type_label(ty: &ArgumentType) -> Value {
    match ty {
        ArgumentType::Name(name) => Value::String(name.clone()),
        ArgumentType::Choices(_) => Value::String("choices".to_string()),
        ArgumentType::Pattern { .. } => Value::String("pattern".to_string()),
        ArgumentType::Caster(_) => Value::String("caster".to_string()),
    }
}

fn value_to_phrase(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

struct UnionType(Vec<ArgumentType>);

#[async_trait]
impl TypeCaster for UnionType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        for ty in &self.0 {
            let result = cast_type(ty, ctx, phrase).await?;
            if !result.is_failure() {
                return Ok(result);
            }
        }
        Ok(Cast::none())
    }
}

struct ComposeType(Vec<ArgumentType>);

#[async_trait]
impl TypeCaster for ComposeType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        let mut current = phrase.to_string();
        let mut result = Cast::none();
        for ty in &self.0 {
            result = cast_type(ty, ctx, &current).await?;
            match &result {
                Cast::Ok(value) => current = value_to_phrase(value),
                Cast::NoMatch(_) => return Ok(result),
            }
        }
        Ok(result)
    }
}

struct TaggedType {
    ty: ArgumentType,
    tag: Value,
}

#[async_trait]
impl TypeCaster for TaggedType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        match cast_type(&self.ty, ctx, phrase).await? {
            Cast::Ok(value) => Ok(Cast::Ok(json!({ "tag": self.tag, "value": value }))),
            failure => Ok(failure),
        }
    }
}

struct TaggedUnionType(Vec<ArgumentType>);

#[async_trait]
impl TypeCaster for TaggedUnionType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        for ty in &self.0 {
            if let Cast::Ok(value) = cast_type(ty, ctx, phrase).await? {
                return Ok(Cast::Ok(json!({
                    "tag": type_label(ty),
                    "value": value,
                })));
            }
        }
        Ok(Cast::none())
    }
}

struct RangeType {
    ty: ArgumentType,
    min: f64,
    max: f64,
    inclusive: bool,
}

#[async_trait]
impl TypeCaster for RangeType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        let result = cast_type(&self.ty, ctx, phrase).await?;
        let Cast::Ok(value) = &result else {
            return Ok(result);
        };
        let measure = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => Some(s.chars().count() as f64),
            Value::Array(a) => Some(a.len() as f64),
            _ => None,
        };
        let Some(measure) = measure else {
            return Ok(Cast::none());
        };
        let in_range = measure >= self.min
            && if self.inclusive {
                measure <= self.max
            } else {
                measure < self.max
            };
        if in_range {
            Ok(result)
        } else {
            Ok(Cast::none())
        }
    }
}

struct ValidateType {
    ty: ArgumentType,
    predicate: ParsedValuePredicate,
}

#[async_trait]
impl TypeCaster for ValidateType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        let result = cast_type(&self.ty, ctx, phrase).await?;
        match &result {
            Cast::Ok(value) if (self.predicate)(ctx.message, phrase, value) => Ok(result),
            Cast::Ok(_) => Ok(Cast::none()),
            Cast::NoMatch(_) => Ok(result),
        }
    }
}

struct WithInputType {
    ty: ArgumentType,
    tag: Option<Value>,
}

#[async_trait]
impl TypeCaster for WithInputType {
    async fn cast(&self, ctx: &CastContext<'_>, phrase: &str) -> EngineResult<Cast> {
        match cast_type(&self.ty, ctx, phrase).await? {
            Cast::Ok(value) => {
                let mut result = json!({ "input": phrase, "value": value });
                if let Some(tag) = &self.tag {
                    result["tag"] = tag.clone();
                }
                Ok(Cast::Ok(result))
            }
            failure => Ok(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::NullResolver;

    struct TestBed {
        message: ChatMessage,
        resolver: NullResolver,
        registry: CommandRegistry,
        types: TypeRegistry,
    }

    impl TestBed {
        fn new() -> Self {
            Self {
                message: ChatMessage::user("m1", "u1", "c1", "irrelevant"),
                resolver: NullResolver,
                registry: CommandRegistry::new(),
                types: TypeRegistry::with_builtins(),
            }
        }

        fn ctx(&self) -> CastContext<'_> {
            CastContext {
                message: &self.message,
                resolver: &self.resolver,
                registry: &self.registry,
                types: &self.types,
            }
        }
    }

    async fn cast(bed: &TestBed, ty: &ArgumentType, phrase: &str) -> Cast {
        cast_type(ty, &bed.ctx(), phrase).await.expect("cast")
    }

    #[tokio::test]
    async fn string_type_rejects_empty() {
        let bed = TestBed::new();
        let ty = ArgumentType::name("string");
        assert_eq!(cast(&bed, &ty, "hello").await, Cast::ok("hello"));
        assert!(cast(&bed, &ty, "").await.is_failure());
    }

    #[tokio::test]
    async fn number_and_integer_types() {
        let bed = TestBed::new();
        assert_eq!(
            cast(&bed, &ArgumentType::name("number"), "2.5").await,
            Cast::ok(2.5)
        );
        assert_eq!(
            cast(&bed, &ArgumentType::name("integer"), "42").await,
            Cast::ok(42)
        );
        assert_eq!(
            cast(&bed, &ArgumentType::name("integer"), "7.9").await,
            Cast::ok(7)
        );
        assert!(cast(&bed, &ArgumentType::name("number"), "seven")
            .await
            .is_failure());
    }

    #[tokio::test]
    async fn timespan_type_sums_units() {
        let bed = TestBed::new();
        let ty = ArgumentType::name("timespan");
        assert_eq!(cast(&bed, &ty, "7d").await, Cast::ok(604_800_000));
        assert_eq!(cast(&bed, &ty, "1h30m").await, Cast::ok(5_400_000));
        assert_eq!(cast(&bed, &ty, "2 weeks").await, Cast::ok(1_209_600_000));
        assert!(cast(&bed, &ty, "soon").await.is_failure());
        assert!(cast(&bed, &ty, "7").await.is_failure());
    }

    #[tokio::test]
    async fn color_type_parses_hex() {
        let bed = TestBed::new();
        let ty = ArgumentType::name("color");
        assert_eq!(cast(&bed, &ty, "#ff0000").await, Cast::ok(0xFF0000));
        assert!(cast(&bed, &ty, "#ggg").await.is_failure());
        assert!(cast(&bed, &ty, "1000000000").await.is_failure());
    }

    #[tokio::test]
    async fn choices_match_case_insensitively_and_canonicalize() {
        let bed = TestBed::new();
        let ty = ArgumentType::alias_groups(vec![
            vec!["add".to_string(), "plus".to_string()],
            vec!["remove".to_string(), "minus".to_string()],
        ]);
        assert_eq!(cast(&bed, &ty, "PLUS").await, Cast::ok("add"));
        assert_eq!(cast(&bed, &ty, "remove").await, Cast::ok("remove"));
        assert!(cast(&bed, &ty, "divide").await.is_failure());
    }

    #[tokio::test]
    async fn pattern_type_yields_match_and_groups() {
        let bed = TestBed::new();
        let ty = ArgumentType::pattern(Regex::new(r"^<@!?(\d+)>$").unwrap());
        let Cast::Ok(value) = cast(&bed, &ty, "<@123>").await else {
            panic!("expected match");
        };
        assert_eq!(value["match"], "<@123>");
        assert_eq!(value["groups"][0], "123");
        assert!(cast(&bed, &ty, "plain").await.is_failure());
    }

    #[tokio::test]
    async fn global_pattern_reports_every_match() {
        let bed = TestBed::new();
        let ty = ArgumentType::pattern_global(Regex::new(r"\d+").unwrap());
        let Cast::Ok(value) = cast(&bed, &ty, "1a2b3").await else {
            panic!("expected match");
        };
        assert_eq!(value["matches"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn union_takes_first_success() {
        let bed = TestBed::new();
        let ty = union(vec![
            ArgumentType::name("integer"),
            ArgumentType::name("string"),
        ]);
        assert_eq!(cast(&bed, &ty, "12").await, Cast::ok(12));
        assert_eq!(cast(&bed, &ty, "word").await, Cast::ok("word"));
    }

    #[tokio::test]
    async fn compose_pipes_values() {
        let bed = TestBed::new();
        let ty = compose(vec![
            ArgumentType::name("lowercase"),
            ArgumentType::choices(["yes", "no"]),
        ]);
        assert_eq!(cast(&bed, &ty, "YES").await, Cast::ok("yes"));
        assert!(cast(&bed, &ty, "maybe").await.is_failure());
    }

    #[tokio::test]
    async fn range_bounds_numbers_and_lengths() {
        let bed = TestBed::new();
        let ty = range(ArgumentType::name("integer"), 1.0, 10.0, true);
        assert_eq!(cast(&bed, &ty, "10").await, Cast::ok(10));
        assert!(cast(&bed, &ty, "11").await.is_failure());

        let ty = range(ArgumentType::name("string"), 0.0, 3.0, false);
        assert_eq!(cast(&bed, &ty, "ab").await, Cast::ok("ab"));
        assert!(cast(&bed, &ty, "abcd").await.is_failure());
    }

    #[tokio::test]
    async fn validate_applies_predicate() {
        let bed = TestBed::new();
        let ty = validate(
            ArgumentType::name("integer"),
            Arc::new(|_msg, _phrase, value| value.as_i64().is_some_and(|n| n % 2 == 0)),
        );
        assert_eq!(cast(&bed, &ty, "4").await, Cast::ok(4));
        assert!(cast(&bed, &ty, "3").await.is_failure());
    }

    #[tokio::test]
    async fn tagged_and_with_input_wrap_results() {
        let bed = TestBed::new();
        let ty = tagged(ArgumentType::name("integer"), json!("count"));
        let Cast::Ok(value) = cast(&bed, &ty, "5").await else {
            panic!("expected match");
        };
        assert_eq!(value, json!({ "tag": "count", "value": 5 }));

        let ty = with_input(ArgumentType::name("integer"));
        let Cast::Ok(value) = cast(&bed, &ty, "5").await else {
            panic!("expected match");
        };
        assert_eq!(value, json!({ "input": "5", "value": 5 }));
    }

    #[tokio::test]
    async fn tagged_union_labels_the_winner() {
        let bed = TestBed::new();
        let ty = tagged_union(vec![
            ArgumentType::name("integer"),
            ArgumentType::name("string"),
        ]);
        let Cast::Ok(value) = cast(&bed, &ty, "word").await else {
            panic!("expected match");
        };
        assert_eq!(value["tag"], "string");
    }

    #[tokio::test]
    async fn casting_is_idempotent() {
        let bed = TestBed::new();
        let ty = ArgumentType::name("timespan");
        let first = cast(&bed, &ty, "90s").await;
        let second = cast(&bed, &ty, "90s").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_type_is_a_configuration_error() {
        let bed = TestBed::new();
        let result = cast_type(&ArgumentType::name("nonexistent"), &bed.ctx(), "x").await;
        assert!(matches!(result, Err(EngineError::UnknownType(_))));
    }

    #[test]
    fn unknown_match_strategy_is_rejected() {
        assert!(matches!(
            ArgumentMatch::parse("sideways"),
            Err(EngineError::UnknownMatchStrategy(_))
        ));
        assert_eq!(
            ArgumentMatch::parse("restContent").unwrap(),
            ArgumentMatch::RestContent
        );
    }

    #[tokio::test]
    async fn emojint_reads_emoji_digits() {
        let bed = TestBed::new();
        let ty = ArgumentType::name("emojint");
        assert_eq!(cast(&bed, &ty, "4\u{20e3}2\u{20e3}").await, Cast::ok(42));
        assert_eq!(cast(&bed, &ty, "\u{1f51f}").await, Cast::ok(10));
    }

    #[tokio::test]
    async fn url_type_unwraps_angle_brackets() {
        let bed = TestBed::new();
        let ty = ArgumentType::name("url");
        assert!(matches!(
            cast(&bed, &ty, "<https://example.com/a>").await,
            Cast::Ok(Value::String(s)) if s.starts_with("https://example.com")
        ));
        assert!(cast(&bed, &ty, "not a url").await.is_failure());
    }
}
