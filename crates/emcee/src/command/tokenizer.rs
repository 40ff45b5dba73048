use serde::Serialize;

/// One typed token of message input. `raw` is the exact original substring
/// including quotes and adjacent separators, so that joining raws
/// reconstructs the original body byte for byte.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Token {
    Phrase { value: String, raw: String },
    Flag { key: String, raw: String },
    OptionFlag { key: String, value: String, raw: String },
}

impl Token {
    pub fn raw(&self) -> &str {
        match self {
            Token::Phrase { raw, .. } | Token::Flag { raw, .. } | Token::OptionFlag { raw, .. } => {
                raw
            }
        }
    }

    /// The usable text of the token; flags carry none.
    pub fn value(&self) -> &str {
        match self {
            Token::Phrase { value, .. } | Token::OptionFlag { value, .. } => value,
            Token::Flag { .. } => "",
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Token::Flag { key, .. } | Token::OptionFlag { key, .. } => Some(key),
            Token::Phrase { .. } => None,
        }
    }

    pub fn is_phrase(&self) -> bool {
        matches!(self, Token::Phrase { .. })
    }

    fn prepend_raw(&mut self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        match self {
            Token::Phrase { raw, .. } | Token::Flag { raw, .. } | Token::OptionFlag { raw, .. } => {
                raw.insert_str(0, prefix);
            }
        }
    }

    fn append_raw(&mut self, suffix: &str) {
        if suffix.is_empty() {
            return;
        }
        match self {
            Token::Phrase { raw, .. } | Token::Flag { raw, .. } | Token::OptionFlag { raw, .. } => {
                raw.push_str(suffix);
            }
        }
    }
}

/// The token sequence of one message, with index projections for each token
/// kind over the same storage.
#[derive(Debug, Clone, Default)]
pub struct Tokenized {
    tokens: Vec<Token>,
    phrases: Vec<usize>,
    flags: Vec<usize>,
    option_flags: Vec<usize>,
}

impl Tokenized {
    pub fn all(&self) -> &[Token] {
        &self.tokens
    }

    pub fn phrase(&self, index: usize) -> Option<&Token> {
        self.phrases.get(index).map(|i| &self.tokens[*i])
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    pub fn flags(&self) -> impl Iterator<Item = &Token> {
        self.flags.iter().map(|i| &self.tokens[*i])
    }

    pub fn option_flags(&self) -> impl Iterator<Item = &Token> {
        self.option_flags.iter().map(|i| &self.tokens[*i])
    }

    /// Joined raws of phrases `[start, start + limit)`.
    pub fn phrase_raw_join(&self, start: usize, limit: usize) -> String {
        let end = start.saturating_add(limit).min(self.phrases.len());
        if start >= end {
            return String::new();
        }
        self.phrases[start..end]
            .iter()
            .map(|i| self.tokens[*i].raw())
            .collect()
    }

    /// Joined raws of all tokens `[start, start + limit)`.
    pub fn all_raw_join(&self, start: usize, limit: usize) -> String {
        let end = start.saturating_add(limit).min(self.tokens.len());
        if start >= end {
            return String::new();
        }
        self.tokens[start..end].iter().map(Token::raw).collect()
    }

    /// Joined raws of every token from `start` to the end.
    pub fn trailing_raw(&self, start: usize) -> String {
        self.all_raw_join(start, usize::MAX)
    }

    fn push(&mut self, token: Token) {
        let index = self.tokens.len();
        match &token {
            Token::Phrase { .. } => self.phrases.push(index),
            Token::Flag { .. } => self.flags.push(index),
            Token::OptionFlag { .. } => self.option_flags.push(index),
        }
        self.tokens.push(token);
    }

    fn append_raw_to_last(&mut self, suffix: &str) {
        if let Some(last) = self.tokens.last_mut() {
            last.append_raw(suffix);
        }
    }
}

/// Splits raw message text into typed tokens. Pure function of
/// (text, config); flag and option-flag names are matched
/// case-insensitively and declared without the leading dashes.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    flag_words: Vec<String>,
    option_flag_words: Vec<String>,
    quoted: bool,
    separator: Option<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            flag_words: Vec::new(),
            option_flag_words: Vec::new(),
            quoted: true,
            separator: None,
        }
    }

    pub fn flag_words(mut self, words: Vec<String>) -> Self {
        self.flag_words = words.into_iter().map(|w| w.to_lowercase()).collect();
        self
    }

    pub fn option_flag_words(mut self, words: Vec<String>) -> Self {
        self.option_flag_words = words.into_iter().map(|w| w.to_lowercase()).collect();
        self
    }

    pub fn quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    pub fn separator(mut self, separator: Option<String>) -> Self {
        self.separator = separator;
        self
    }

    pub fn tokenize(&self, content: &str) -> Tokenized {
        match &self.separator {
            Some(separator) if !separator.is_empty() => {
                self.tokenize_separated(content, separator)
            }
            _ => self.tokenize_whitespace(content),
        }
    }

    fn is_flag(&self, name: &str) -> bool {
        self.flag_words.iter().any(|w| w.eq_ignore_ascii_case(name))
    }

    fn is_option_flag(&self, name: &str) -> bool {
        self.option_flag_words
            .iter()
            .any(|w| w.eq_ignore_ascii_case(name))
    }

    fn tokenize_whitespace(&self, content: &str) -> Tokenized {
        let mut out = Tokenized::default();
        let mut rest = content;

        loop {
            let trimmed = rest.trim_start();
            let ws = &rest[..rest.len() - trimmed.len()];
            if trimmed.is_empty() {
                out.append_raw_to_last(ws);
                break;
            }

            let (mut token, consumed) = self.read_token(trimmed);
            token.prepend_raw(ws);
            out.push(token);
            rest = &trimmed[consumed..];
        }

        out
    }

    /// One token from `s`, which starts at non-whitespace. Returns the token
    /// and the number of bytes consumed.
    fn read_token(&self, s: &str) -> (Token, usize) {
        if self.quoted && s.starts_with('"') {
            let (value, consumed) = read_quoted(s);
            return (
                Token::Phrase {
                    value,
                    raw: s[..consumed].to_string(),
                },
                consumed,
            );
        }

        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        let word = &s[..end];

        if let Some(name) = word.strip_prefix("--") {
            if let Some((key, value)) = name.split_once('=') {
                if self.is_option_flag(key) {
                    return (
                        Token::OptionFlag {
                            key: key.to_string(),
                            value: value.to_string(),
                            raw: word.to_string(),
                        },
                        end,
                    );
                }
            }
            if self.is_flag(name) {
                return (
                    Token::Flag {
                        key: name.to_string(),
                        raw: word.to_string(),
                    },
                    end,
                );
            }
            if self.is_option_flag(name) {
                return self.read_option_value(s, name, end);
            }
        }

        (
            Token::Phrase {
                value: word.to_string(),
                raw: word.to_string(),
            },
            end,
        )
    }

    /// Spaced option-flag form: `--name value`. The separator and the value
    /// word (or quoted span) become part of the flag's raw text.
    fn read_option_value(&self, s: &str, name: &str, name_end: usize) -> (Token, usize) {
        let after = &s[name_end..];
        let trimmed = after.trim_start();
        let ws_len = after.len() - trimmed.len();

        if trimmed.is_empty() {
            return (
                Token::OptionFlag {
                    key: name.to_string(),
                    value: String::new(),
                    raw: s[..name_end].to_string(),
                },
                name_end,
            );
        }

        let (value, value_len) = if self.quoted && trimmed.starts_with('"') {
            read_quoted(trimmed)
        } else {
            let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
            (trimmed[..end].to_string(), end)
        };

        let consumed = name_end + ws_len + value_len;
        (
            Token::OptionFlag {
                key: name.to_string(),
                value,
                raw: s[..consumed].to_string(),
            },
            consumed,
        )
    }

    fn tokenize_separated(&self, content: &str, separator: &str) -> Tokenized {
        let mut out = Tokenized::default();
        let mut start = 0;

        while let Some(found) = content[start..].find(separator) {
            let chunk = &content[start..start + found];
            let raw = &content[start..start + found + separator.len()];
            out.push(self.classify_chunk(chunk, raw));
            start += found + separator.len();
        }

        let chunk = &content[start..];
        if chunk.trim().is_empty() {
            out.append_raw_to_last(chunk);
        } else {
            out.push(self.classify_chunk(chunk, chunk));
        }

        out
    }

    fn classify_chunk(&self, chunk: &str, raw: &str) -> Token {
        let trimmed = chunk.trim();
        if let Some(name) = trimmed.strip_prefix("--") {
            if let Some((key, value)) = name.split_once('=') {
                if self.is_option_flag(key) {
                    return Token::OptionFlag {
                        key: key.to_string(),
                        value: value.to_string(),
                        raw: raw.to_string(),
                    };
                }
            }
            if let Some((key, value)) = name.split_once(char::is_whitespace) {
                if self.is_option_flag(key) {
                    return Token::OptionFlag {
                        key: key.to_string(),
                        value: value.trim_start().to_string(),
                        raw: raw.to_string(),
                    };
                }
            }
            if self.is_flag(name) {
                return Token::Flag {
                    key: name.to_string(),
                    raw: raw.to_string(),
                };
            }
            if self.is_option_flag(name) {
                return Token::OptionFlag {
                    key: name.to_string(),
                    value: String::new(),
                    raw: raw.to_string(),
                };
            }
        }
        Token::Phrase {
            value: trimmed.to_string(),
            raw: raw.to_string(),
        }
    }
}

/// A quoted span starting at `s[0] == '"'`. An unterminated quote runs to
/// the end of input.
fn read_quoted(s: &str) -> (String, usize) {
    match s[1..].find('"') {
        Some(i) => (s[1..1 + i].to_string(), i + 2),
        None => (s[1..].to_string(), s.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new()
            .flag_words(vec!["verbose".to_string(), "force".to_string()])
            .option_flag_words(vec!["limit".to_string(), "reason".to_string()])
    }

    fn round_trip(content: &str) {
        let parsed = tokenizer().tokenize(content);
        let joined: String = parsed.all().iter().map(Token::raw).collect();
        assert_eq!(joined, content);
    }

    #[test]
    fn splits_plain_words() {
        let parsed = tokenizer().tokenize("ban spammer now");
        assert_eq!(parsed.phrase_count(), 3);
        assert_eq!(parsed.phrase(0).unwrap().value(), "ban");
        assert_eq!(parsed.phrase(2).unwrap().value(), "now");
    }

    #[test]
    fn quoted_span_is_one_phrase() {
        let parsed = tokenizer().tokenize(r#"say "hello there" loudly"#);
        assert_eq!(parsed.phrase_count(), 3);
        assert_eq!(parsed.phrase(1).unwrap().value(), "hello there");
        assert_eq!(parsed.phrase(1).unwrap().raw().trim_start(), r#""hello there""#);
    }

    #[test]
    fn declared_flag_is_recognized() {
        let parsed = tokenizer().tokenize("prune --verbose old");
        assert_eq!(parsed.phrase_count(), 2);
        let flags: Vec<_> = parsed.flags().collect();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].key(), Some("verbose"));
    }

    #[test]
    fn flag_names_match_case_insensitively() {
        let parsed = tokenizer().tokenize("prune --VERBOSE");
        assert_eq!(parsed.flags().count(), 1);
    }

    #[test]
    fn undeclared_double_dash_word_is_a_phrase() {
        let parsed = tokenizer().tokenize("echo --unknown");
        assert_eq!(parsed.phrase_count(), 2);
        assert_eq!(parsed.phrase(1).unwrap().value(), "--unknown");
    }

    #[test]
    fn option_flag_equals_form() {
        let parsed = tokenizer().tokenize("prune --limit=10");
        let options: Vec<_> = parsed.option_flags().collect();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].key(), Some("limit"));
        assert_eq!(options[0].value(), "10");
    }

    #[test]
    fn option_flag_spaced_form() {
        let parsed = tokenizer().tokenize("prune --limit 10 old");
        let options: Vec<_> = parsed.option_flags().collect();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].value(), "10");
        assert_eq!(parsed.phrase_count(), 2);
    }

    #[test]
    fn option_flag_spaced_form_takes_quoted_value() {
        let parsed = tokenizer().tokenize(r#"kick --reason "was rude" user"#);
        let options: Vec<_> = parsed.option_flags().collect();
        assert_eq!(options[0].value(), "was rude");
        assert_eq!(parsed.phrase_count(), 2);
    }

    #[test]
    fn raw_concatenation_reproduces_the_body() {
        round_trip("ban spammer now");
        round_trip(r#"say "hello there"   loudly"#);
        round_trip("prune --verbose --limit=10 old  ");
        round_trip(r#"  kick --reason "was rude" user --force"#);
        round_trip("--verbose");
        round_trip("a --unknown b");
    }

    #[test]
    fn quotes_disabled_leaves_quotes_in_words() {
        let parsed = tokenizer().quoted(false).tokenize(r#"say "hello there""#);
        assert_eq!(parsed.phrase_count(), 3);
        assert_eq!(parsed.phrase(1).unwrap().value(), r#""hello"#);
    }

    #[test]
    fn separator_mode_splits_on_separator_only() {
        let parsed = tokenizer()
            .separator(Some(",".to_string()))
            .tokenize("first thing, second thing, --verbose");
        assert_eq!(parsed.phrase_count(), 2);
        assert_eq!(parsed.phrase(0).unwrap().value(), "first thing");
        assert_eq!(parsed.phrase(1).unwrap().value(), "second thing");
        assert_eq!(parsed.flags().count(), 1);
    }

    #[test]
    fn separator_mode_round_trips() {
        let content = "a, b , c,";
        let parsed = tokenizer().separator(Some(",".to_string())).tokenize(content);
        let joined: String = parsed.all().iter().map(Token::raw).collect();
        assert_eq!(joined, content);
    }

    #[test]
    fn empty_content_yields_no_tokens() {
        assert!(tokenizer().tokenize("").all().is_empty());
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let parsed = tokenizer().tokenize(r#"say "hello there"#);
        assert_eq!(parsed.phrase_count(), 2);
        assert_eq!(parsed.phrase(1).unwrap().value(), "hello there");
        round_trip(r#"say "hello there"#);
    }
}
