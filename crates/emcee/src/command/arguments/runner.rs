use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::command::arguments::argument::{Argument, ArgumentOptions};
use crate::command::arguments::types::{ArgumentMatch, Cast, Unordered};
use crate::command::handler::CommandHandler;
use crate::command::signal::{Resolved, Signal};
use crate::command::tokenizer::{Token, Tokenized};
use crate::command::types::CommandConfig;
use crate::error::EngineResult;
use crate::message::ChatMessage;

/// Shared cursor state for one resolution run. Created at the start of
/// argument resolution, discarded at its end, never shared across messages.
#[derive(Debug, Default)]
pub struct RunnerState {
    /// Cursor into the full token sequence.
    pub index: usize,
    /// Cursor in terms of phrases only.
    pub phrase_index: usize,
    /// Phrase positions already consumed by unordered matching.
    pub used_indices: HashSet<usize>,
}

/// One step of an argument request sequence.
pub enum SequenceStep {
    /// Resolve this declaration and feed the value back.
    Request(ArgumentOptions),
    /// Short-circuit the run with this signal.
    Signal(Signal),
    /// The sequence is complete; this is the aggregated result.
    Done(Value),
}

/// Pull-based argument request protocol: the runner calls [`next`] with the
/// value resolved for the previous request until the sequence reports
/// [`SequenceStep::Done`] or short-circuits with a signal.
///
/// [`next`]: ArgumentSequence::next
#[async_trait]
pub trait ArgumentSequence: Send {
    async fn next(&mut self, previous: Option<Value>) -> EngineResult<SequenceStep>;
}

/// The standard sequence: resolve each declared argument in order and
/// aggregate the values into an object keyed by argument id.
pub struct DeclaredSequence {
    args: Vec<ArgumentOptions>,
    position: usize,
    pending_id: Option<String>,
    acc: Map<String, Value>,
}

impl DeclaredSequence {
    pub fn new(args: Vec<ArgumentOptions>) -> Self {
        Self {
            args,
            position: 0,
            pending_id: None,
            acc: Map::new(),
        }
    }
}

#[async_trait]
impl ArgumentSequence for DeclaredSequence {
    async fn next(&mut self, previous: Option<Value>) -> EngineResult<SequenceStep> {
        if let Some(id) = self.pending_id.take() {
            self.acc.insert(id, previous.unwrap_or(Value::Null));
        }
        match self.args.get(self.position) {
            Some(options) => {
                self.pending_id = Some(options.id.clone());
                self.position += 1;
                Ok(SequenceStep::Request(options.clone()))
            }
            None => Ok(SequenceStep::Done(Value::Object(std::mem::take(
                &mut self.acc,
            )))),
        }
    }
}

/// Drives an argument request sequence over one tokenized message,
/// dispatching each request to its match strategy.
pub struct ArgumentRunner<'a> {
    handler: &'a CommandHandler,
    command: &'a CommandConfig,
}

impl<'a> ArgumentRunner<'a> {
    pub fn new(handler: &'a CommandHandler, command: &'a CommandConfig) -> Self {
        Self { handler, command }
    }

    /// Run the sequence to completion or to the first signal. A `continue`
    /// signal without leftover text is augmented with the unconsumed
    /// trailing raw text at the cursor.
    pub async fn run(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        sequence: &mut dyn ArgumentSequence,
    ) -> EngineResult<Resolved> {
        let mut state = RunnerState::default();
        let mut previous: Option<Value> = None;

        loop {
            match sequence.next(previous.take()).await? {
                SequenceStep::Done(value) => return Ok(Resolved::Value(value)),
                SequenceStep::Signal(signal) => {
                    return Ok(Resolved::Signal(augment_rest(signal, tokens, &state)));
                }
                SequenceStep::Request(options) => {
                    let argument = Argument {
                        handler: self.handler,
                        command: self.command,
                        options: &options,
                    };
                    match self.run_one(message, tokens, &mut state, &argument).await? {
                        Resolved::Signal(signal) => {
                            return Ok(Resolved::Signal(augment_rest(signal, tokens, &state)));
                        }
                        Resolved::Value(value) => previous = Some(value),
                    }
                }
            }
        }
    }

    /// Resolve one argument with its match strategy. Each strategy owns its
    /// cursor advancement.
    pub async fn run_one(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        state: &mut RunnerState,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        match argument.options.match_kind {
            ArgumentMatch::Phrase => self.match_phrase(message, tokens, state, argument).await,
            ArgumentMatch::Rest => self.match_rest(message, tokens, state, argument).await,
            ArgumentMatch::Separate => self.match_separate(message, tokens, state, argument).await,
            ArgumentMatch::Flag => self.match_flag(tokens, argument),
            ArgumentMatch::Option => self.match_option(message, tokens, argument).await,
            ArgumentMatch::Text => self.match_text(message, tokens, argument).await,
            ArgumentMatch::Content => self.match_content(message, tokens, argument).await,
            ArgumentMatch::RestContent => {
                self.match_rest_content(message, tokens, state, argument).await
            }
            ArgumentMatch::None => argument.process(message, "").await,
        }
    }

    async fn match_phrase(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        state: &mut RunnerState,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        if argument.options.unordered != Unordered::No {
            return self.match_unordered(message, tokens, state, argument).await;
        }

        let positional = argument.options.index.is_none();
        let index = argument.options.index.unwrap_or(state.phrase_index);
        let phrase = tokens
            .phrase(index)
            .map(|t| t.value().to_string())
            .unwrap_or_default();

        let resolved = argument.process(message, &phrase).await?;
        if positional {
            increase_index(tokens, state, 1);
        }
        Ok(resolved)
    }

    /// Scan the candidate phrase positions for the first whose cast
    /// succeeds; the winner's index is marked used so no two unordered
    /// arguments consume the same phrase. Uses `cast` rather than
    /// `process`: a scan miss must not prompt.
    async fn match_unordered(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        state: &mut RunnerState,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        let candidates: Vec<usize> = match &argument.options.unordered {
            Unordered::All => (0..tokens.phrase_count()).collect(),
            Unordered::From(offset) => (*offset..tokens.phrase_count()).collect(),
            Unordered::Indices(indices) => indices.clone(),
            Unordered::No => Vec::new(),
        };

        for i in candidates {
            if state.used_indices.contains(&i) {
                continue;
            }
            let phrase = tokens
                .phrase(i)
                .map(|t| t.value().to_string())
                .unwrap_or_default();
            if let Cast::Ok(value) = argument.cast(message, &phrase).await? {
                state.used_indices.insert(i);
                return Ok(Resolved::Value(value));
            }
        }

        // No candidate matched; fall through to default/prompt handling.
        argument.process(message, "").await
    }

    async fn match_rest(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        state: &mut RunnerState,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        let positional = argument.options.index.is_none();
        let index = argument.options.index.unwrap_or(state.phrase_index);
        let rest = tokens
            .phrase_raw_join(index, argument.options.limit)
            .trim()
            .to_string();

        let resolved = argument.process(message, &rest).await?;
        if positional {
            increase_index(tokens, state, 1);
        }
        Ok(resolved)
    }

    async fn match_separate(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        state: &mut RunnerState,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        let positional = argument.options.index.is_none();
        let index = argument.options.index.unwrap_or(state.phrase_index);
        let end = index
            .saturating_add(argument.options.limit)
            .min(tokens.phrase_count());

        if index >= end {
            let resolved = argument.process(message, "").await?;
            if positional {
                increase_index(tokens, state, 1);
            }
            return Ok(resolved);
        }

        let mut values = Vec::with_capacity(end - index);
        for i in index..end {
            let phrase = tokens
                .phrase(i)
                .map(|t| t.value().to_string())
                .unwrap_or_default();
            match argument.process(message, &phrase).await? {
                Resolved::Signal(signal) => return Ok(Resolved::Signal(signal)),
                Resolved::Value(value) => values.push(value),
            }
        }

        if positional {
            increase_index(tokens, state, 1);
        }
        Ok(Resolved::Value(Value::Array(values)))
    }

    fn match_flag(&self, tokens: &Tokenized, argument: &Argument<'_>) -> EngineResult<Resolved> {
        let names = &argument.options.flags;
        let matches = |token: &&Token| {
            token
                .key()
                .is_some_and(|key| names.iter().any(|n| n.eq_ignore_ascii_case(key)))
        };

        if argument.options.multiple_flags {
            let count = tokens.flags().filter(matches).count();
            return Ok(Resolved::Value(Value::from(count)));
        }

        let found = tokens.flags().any(|t| matches(&t));
        // A configured default inverts the boolean meaning.
        let value = if argument.options.default.is_some() {
            !found
        } else {
            found
        };
        Ok(Resolved::Value(Value::Bool(value)))
    }

    async fn match_option(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        let names = &argument.options.flags;
        let matches = |token: &&Token| {
            token
                .key()
                .is_some_and(|key| names.iter().any(|n| n.eq_ignore_ascii_case(key)))
        };

        if argument.options.multiple_flags {
            let values: Vec<String> = tokens
                .option_flags()
                .filter(matches)
                .map(|t| t.value().to_string())
                .take(argument.options.limit)
                .collect();
            let mut out = Vec::with_capacity(values.len());
            for value in values {
                match argument.process(message, &value).await? {
                    Resolved::Signal(signal) => return Ok(Resolved::Signal(signal)),
                    Resolved::Value(value) => out.push(value),
                }
            }
            return Ok(Resolved::Value(Value::Array(out)));
        }

        let value = tokens
            .option_flags()
            .find(matches)
            .map(|t| t.value().to_string())
            .unwrap_or_default();
        argument.process(message, &value).await
    }

    async fn match_text(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        let index = argument.options.index.unwrap_or(0);
        let text = tokens
            .phrase_raw_join(index, argument.options.limit)
            .trim()
            .to_string();
        argument.process(message, &text).await
    }

    async fn match_content(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        let index = argument.options.index.unwrap_or(0);
        let content = tokens
            .all_raw_join(index, argument.options.limit)
            .trim()
            .to_string();
        argument.process(message, &content).await
    }

    async fn match_rest_content(
        &self,
        message: &ChatMessage,
        tokens: &Tokenized,
        state: &mut RunnerState,
        argument: &Argument<'_>,
    ) -> EngineResult<Resolved> {
        let positional = argument.options.index.is_none();
        let index = argument.options.index.unwrap_or(state.index);
        let rest = tokens
            .all_raw_join(index, argument.options.limit)
            .trim()
            .to_string();

        let resolved = argument.process(message, &rest).await?;
        if positional {
            increase_index(tokens, state, 1);
        }
        Ok(resolved)
    }
}

/// Advance the phrase cursor by `n`, moving the main cursor to the next
/// phrase-typed token each step; non-phrase tokens never consume a
/// positional slot.
pub fn increase_index(tokens: &Tokenized, state: &mut RunnerState, n: usize) {
    state.phrase_index += n;
    for _ in 0..n {
        state.index += 1;
        while tokens
            .all()
            .get(state.index)
            .is_some_and(|t| !t.is_phrase())
        {
            state.index += 1;
        }
    }
}

fn augment_rest(mut signal: Signal, tokens: &Tokenized, state: &RunnerState) -> Signal {
    if let Signal::Continue { rest, .. } = &mut signal {
        if rest.is_none() {
            *rest = Some(tokens.trailing_raw(state.index));
        }
    }
    signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn declared_sequence_aggregates_by_id() {
        let mut sequence = DeclaredSequence::new(vec![
            ArgumentOptions::new("first"),
            ArgumentOptions::new("second"),
        ]);

        let step = sequence.next(None).await.unwrap();
        assert!(matches!(step, SequenceStep::Request(ref o) if o.id == "first"));
        let step = sequence.next(Some(Value::from(1))).await.unwrap();
        assert!(matches!(step, SequenceStep::Request(ref o) if o.id == "second"));
        let step = sequence.next(Some(Value::from(2))).await.unwrap();
        let SequenceStep::Done(result) = step else {
            panic!("expected completion");
        };
        assert_eq!(result["first"], 1);
        assert_eq!(result["second"], 2);
    }

    #[tokio::test]
    async fn declared_sequence_fills_missing_value_with_null() {
        let mut sequence = DeclaredSequence::new(vec![ArgumentOptions::new("only")]);
        let _ = sequence.next(None).await.unwrap();
        let SequenceStep::Done(result) = sequence.next(None).await.unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(result["only"], Value::Null);
    }

    #[test]
    fn increase_index_skips_non_phrase_tokens() {
        use crate::command::tokenizer::Tokenizer;

        let tokens = Tokenizer::new()
            .flag_words(vec!["force".to_string()])
            .tokenize("a --force b");
        let mut state = RunnerState::default();

        increase_index(&tokens, &mut state, 1);
        assert_eq!(state.phrase_index, 1);
        // Cursor lands on "b", skipping the flag token.
        assert_eq!(state.index, 2);

        increase_index(&tokens, &mut state, 1);
        assert_eq!(state.index, 3);
    }
}
