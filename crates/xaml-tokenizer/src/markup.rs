//! Tokenizer for markup-extension text: `{Type arg, Name=value}`.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::Span;
use crate::text::is_whitespace_char;

/// Opening/closing character pairs a member declares as escape brackets.
///
/// Inside a value, text between a registered opening character and its
/// closing partner is taken literally, so `,`, `=` and `}` do not terminate
/// the value there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketCharacters {
    pairs: Vec<(char, char)>,
}

impl BracketCharacters {
    pub fn new(pairs: impl IntoIterator<Item = (char, char)>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(char, char)] {
        &self.pairs
    }

    pub fn starts_escape_sequence(&self, c: char) -> bool {
        self.pairs.iter().any(|&(open, _)| open == c)
    }

    pub fn ends_escape_sequence(&self, c: char) -> bool {
        self.pairs.iter().any(|&(_, close)| close == c)
    }

    /// Whether `open` and `close` form a registered pair.
    pub fn is_pair(&self, open: char, close: char) -> bool {
        self.pairs.contains(&(open, close))
    }
}

/// Escape-bracket and constructor-argument state of one markup extension.
///
/// Created when the extension's type is known and handed to
/// [`MeTokenizer::next_token`] for every token read inside that extension.
#[derive(Debug, Clone, Default)]
pub struct BracketMode {
    /// Parameter names of the extension's longest constructor.
    constructor_parameters: Vec<String>,
    /// Bracket characters keyed by parameter or property name.
    bracket_characters: HashMap<String, BracketCharacters>,
    current_constructor_param: usize,
    constructor_parsing: bool,
    bracket_escape: bool,
    open_brackets: Vec<char>,
}

impl BracketMode {
    pub fn new(
        constructor_parameters: Vec<String>,
        bracket_characters: HashMap<String, BracketCharacters>,
    ) -> Self {
        let constructor_parsing = !constructor_parameters.is_empty();
        Self {
            constructor_parameters,
            bracket_characters,
            current_constructor_param: 0,
            constructor_parsing,
            bracket_escape: false,
            open_brackets: Vec::new(),
        }
    }

    /// Whether positional arguments are still being matched to constructor
    /// parameters.
    #[inline]
    pub fn is_constructor_parsing_mode(&self) -> bool {
        self.constructor_parsing
    }

    #[inline]
    pub fn is_bracket_escape_mode(&self) -> bool {
        self.bracket_escape
    }

    /// Index of the positional parameter the next value binds to.
    #[inline]
    pub fn current_constructor_param(&self) -> usize {
        self.current_constructor_param
    }

    #[inline]
    pub fn max_constructor_params(&self) -> usize {
        self.constructor_parameters.len()
    }

    /// Bracket characters registered for the parameter or property `name`.
    pub fn characters_for(&self, name: &str) -> Option<&BracketCharacters> {
        self.bracket_characters
            .get(name)
            .filter(|chars| !chars.is_empty())
    }

    fn current_parameter_characters(&self) -> Option<BracketCharacters> {
        let name = self
            .constructor_parameters
            .get(self.current_constructor_param)?;
        self.characters_for(name).cloned()
    }

    fn on_comma(&mut self) {
        if self.constructor_parsing {
            self.current_constructor_param += 1;
            self.constructor_parsing =
                self.current_constructor_param < self.constructor_parameters.len();
        }
    }
}

/// The kind of a markup-extension token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeTokenKind {
    /// End of the text.
    None,
    /// `{`
    Open,
    /// `}`
    Close,
    /// `,`
    Comma,
    /// `=`
    EqualSign,
    /// The type name right after `{`.
    TypeName,
    /// A name followed by `=`.
    PropertyName,
    /// A value.
    String,
    /// A quoted value whose content is itself a markup extension.
    QuotedMarkupExtension,
}

/// A markup-extension token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeToken {
    pub kind: MeTokenKind,
    /// Token text with quotes and escapes removed. Empty for punctuation.
    pub text: String,
    /// Byte range in the extension text.
    pub span: Span,
    /// Character offset of the token start, for line/column reporting.
    pub offset: u32,
}

/// A lexical error in markup-extension text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeTokenError {
    pub kind: MeTokenErrorKind,
    /// Character offset where the error was detected.
    pub offset: u32,
}

/// The kind of markup-extension lexical error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeTokenErrorKind {
    /// A quoted value was not closed.
    UnclosedQuote,
    /// A quote appeared after the start of a value.
    QuoteOutOfPlace,
    /// A closing bracket did not match the innermost opening bracket.
    InvalidClosingBracket { ch: char },
    /// A value ended while escape brackets were still open.
    MalformedBracketCharacters { ch: char },
    /// A value ended inside an unbalanced `{`.
    UnbalancedBraces,
}

impl fmt::Display for MeTokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeTokenErrorKind::UnclosedQuote => {
                write!(f, "unclosed quote in markup extension")
            }
            MeTokenErrorKind::QuoteOutOfPlace => write!(
                f,
                "quote characters are only allowed at the start of a markup extension value"
            ),
            MeTokenErrorKind::InvalidClosingBracket { ch } => write!(
                f,
                "closing bracket '{ch}' does not match the open bracket in markup extension"
            ),
            MeTokenErrorKind::MalformedBracketCharacters { ch } => write!(
                f,
                "bracket characters are not closed before '{ch}' in markup extension"
            ),
            MeTokenErrorKind::UnbalancedBraces => {
                write!(f, "unbalanced '{{' in markup extension value")
            }
        }
    }
}

impl fmt::Display for MeTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for MeTokenError {}

/// What the next string token will be read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringState {
    Value,
    Type,
    Property,
}

/// A tokenizer over the text of one markup extension.
#[derive(Clone)]
pub struct MeTokenizer<'src> {
    /// The extension text.
    source: &'src str,
    /// The remaining text (suffix of `source`).
    remaining: &'src str,
    /// Current byte position in `source`.
    pos: u32,
    /// Current character position in `source`.
    char_pos: u32,
    state: StringState,
    /// Bracket characters of the property whose name was just read.
    property_brackets: Option<BracketCharacters>,
    has_trailing_whitespace: bool,
}

impl<'src> MeTokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            remaining: source,
            pos: 0,
            char_pos: 0,
            state: StringState::Value,
            property_brackets: None,
            has_trailing_whitespace: false,
        }
    }

    /// The extension text being tokenized.
    #[inline]
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Whether whitespace was skipped right before the end of the text.
    #[inline]
    pub fn has_trailing_whitespace(&self) -> bool {
        self.has_trailing_whitespace
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.remaining.is_empty()
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    #[inline]
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining.chars().nth(n)
    }

    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as u32;
        self.char_pos += 1;
        self.remaining = &self.remaining[c.len_utf8()..];
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        let mut skipped = false;
        while self.peek().is_some_and(is_whitespace_char) {
            self.advance();
            skipped = true;
        }
        if skipped && self.is_eof() {
            self.has_trailing_whitespace = true;
        }
    }

    fn token(&self, kind: MeTokenKind, text: String, start: u32, start_char: u32) -> MeToken {
        let span = Span::new(start, self.pos);
        trace!("Token {:?} at {:?}: {:?}", kind, span, text);
        MeToken {
            kind,
            text,
            span,
            offset: start_char,
        }
    }

    fn error(&self, kind: MeTokenErrorKind) -> MeTokenError {
        MeTokenError {
            kind,
            offset: self.char_pos,
        }
    }

    /// Read the next token using the escape-bracket state of the enclosing
    /// extension.
    pub fn next_token(&mut self, mode: &mut BracketMode) -> Result<MeToken, MeTokenError> {
        self.skip_whitespace();

        let start = self.pos;
        let start_char = self.char_pos;
        let Some(c) = self.peek() else {
            return Ok(self.token(MeTokenKind::None, String::new(), start, start_char));
        };

        let mut quoted_markup_extension = false;
        match c {
            '{' if self.peek_nth(1) != Some('}') => {
                self.advance();
                self.state = StringState::Type;
                return Ok(self.token(MeTokenKind::Open, String::new(), start, start_char));
            }
            '}' => {
                self.advance();
                self.state = StringState::Value;
                return Ok(self.token(MeTokenKind::Close, String::new(), start, start_char));
            }
            '=' => {
                self.advance();
                self.state = StringState::Value;
                mode.constructor_parsing = false;
                return Ok(self.token(MeTokenKind::EqualSign, String::new(), start, start_char));
            }
            ',' => {
                self.advance();
                self.state = StringState::Value;
                mode.on_comma();
                return Ok(self.token(MeTokenKind::Comma, String::new(), start, start_char));
            }
            '\'' | '"' => {
                quoted_markup_extension =
                    self.peek_nth(1) == Some('{') && self.peek_nth(2) != Some('}');
            }
            _ => {}
        }

        let brackets = if mode.constructor_parsing {
            self.property_brackets = None;
            mode.current_parameter_characters()
        } else {
            self.property_brackets.take()
        };

        let state = self.state;
        let raw = self.read_string(mode, brackets.as_ref())?;
        let kind = match self.state {
            StringState::Property => MeTokenKind::PropertyName,
            _ if state == StringState::Type => MeTokenKind::TypeName,
            _ if quoted_markup_extension => MeTokenKind::QuotedMarkupExtension,
            _ => MeTokenKind::String,
        };
        if kind == MeTokenKind::PropertyName {
            self.property_brackets = mode.characters_for(&raw).cloned();
        }
        self.state = StringState::Value;
        // Quoted extensions are tokenized again, so their escapes stay.
        let text = if kind == MeTokenKind::QuotedMarkupExtension {
            raw
        } else {
            remove_escapes(&raw)
        };
        Ok(self.token(kind, text, start, start_char))
    }

    /// Read one string up to its terminator, leaving the terminator unread.
    ///
    /// A `=` terminator switches the state to [`StringState::Property`].
    fn read_string(
        &mut self,
        mode: &mut BracketMode,
        brackets: Option<&BracketCharacters>,
    ) -> Result<String, MeTokenError> {
        let mut out = String::new();
        let mut escaped = false;
        let mut quote: Option<char> = None;
        let mut was_quoted = false;
        let mut at_start = true;
        let mut brace_depth = 0u32;

        while let Some(ch) = self.peek() {
            if escaped {
                out.push('\\');
                out.push(ch);
                escaped = false;
            } else if let Some(q) = quote {
                if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    self.advance();
                    quote = None;
                    break;
                } else {
                    out.push(ch);
                }
            } else if mode.bracket_escape {
                if let Some(brackets) = brackets {
                    if brackets.starts_escape_sequence(ch) {
                        mode.open_brackets.push(ch);
                    } else if brackets.ends_escape_sequence(ch) {
                        match mode.open_brackets.last() {
                            Some(&open) if brackets.is_pair(open, ch) => {
                                mode.open_brackets.pop();
                            }
                            _ => {
                                return Err(
                                    self.error(MeTokenErrorKind::InvalidClosingBracket { ch })
                                );
                            }
                        }
                    } else if ch == '\\' {
                        escaped = true;
                    }
                }
                if mode.open_brackets.is_empty() {
                    mode.bracket_escape = false;
                }
                if !escaped {
                    out.push(ch);
                }
            } else {
                let done = match ch {
                    c if is_whitespace_char(c) && self.state == StringState::Type => true,
                    '{' => {
                        brace_depth += 1;
                        out.push(ch);
                        false
                    }
                    '}' if brace_depth == 0 => true,
                    '}' => {
                        brace_depth -= 1;
                        out.push(ch);
                        false
                    }
                    ',' => true,
                    '=' => {
                        self.state = StringState::Property;
                        true
                    }
                    '\\' => {
                        escaped = true;
                        false
                    }
                    '\'' | '"' => {
                        if !at_start {
                            return Err(self.error(MeTokenErrorKind::QuoteOutOfPlace));
                        }
                        quote = Some(ch);
                        was_quoted = true;
                        false
                    }
                    _ => {
                        if brackets.is_some_and(|b| b.starts_escape_sequence(ch)) {
                            mode.open_brackets.clear();
                            mode.open_brackets.push(ch);
                            mode.bracket_escape = true;
                        }
                        out.push(ch);
                        false
                    }
                };

                if done {
                    if brace_depth > 0 {
                        return Err(self.error(MeTokenErrorKind::UnbalancedBraces));
                    }
                    if !mode.open_brackets.is_empty() {
                        return Err(
                            self.error(MeTokenErrorKind::MalformedBracketCharacters { ch })
                        );
                    }
                    break;
                }
            }

            at_start = false;
            self.advance();
        }

        if quote.is_some() {
            return Err(self.error(MeTokenErrorKind::UnclosedQuote));
        }
        if !mode.open_brackets.is_empty() {
            let ch = mode.open_brackets.last().copied().unwrap_or_default();
            return Err(self.error(MeTokenErrorKind::MalformedBracketCharacters { ch }));
        }
        if !was_quoted {
            let trimmed = out.trim_matches(is_whitespace_char);
            if trimmed.len() != out.len() {
                out = trimmed.to_string();
            }
        }
        Ok(out)
    }
}

/// Strip a leading `{}` and remove backslash escapes.
pub fn remove_escapes(value: &str) -> String {
    let value = value.strip_prefix("{}").unwrap_or(value);
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn tokens_with(source: &str, mode: &mut BracketMode) -> Vec<(MeTokenKind, String)> {
        let mut tokenizer = MeTokenizer::new(source);
        let mut out = Vec::new();
        loop {
            let token = tokenizer.next_token(mode).unwrap();
            if token.kind == MeTokenKind::None {
                break;
            }
            out.push((token.kind, token.text));
        }
        out
    }

    fn tokens(source: &str) -> Vec<(MeTokenKind, String)> {
        tokens_with(source, &mut BracketMode::default())
    }

    fn first_error(source: &str, mode: &mut BracketMode) -> MeTokenError {
        let mut tokenizer = MeTokenizer::new(source);
        loop {
            match tokenizer.next_token(mode) {
                Ok(token) if token.kind == MeTokenKind::None => {
                    panic!("expected an error for {source:?}")
                }
                Ok(_) => {}
                Err(err) => return err,
            }
        }
    }

    fn tok(kind: MeTokenKind, text: &str) -> (MeTokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn test_positional_and_named() {
        use MeTokenKind::*;
        assert_eq!(
            tokens("{Foo Type, Bar=Baz}"),
            vec![
                tok(Open, ""),
                tok(TypeName, "Foo"),
                tok(String, "Type"),
                tok(Comma, ""),
                tok(PropertyName, "Bar"),
                tok(EqualSign, ""),
                tok(String, "Baz"),
                tok(Close, ""),
            ]
        );
    }

    #[test]
    fn test_nested_extension() {
        use MeTokenKind::*;
        assert_eq!(
            tokens("{Binding Path={StaticResource Foo}}"),
            vec![
                tok(Open, ""),
                tok(TypeName, "Binding"),
                tok(PropertyName, "Path"),
                tok(EqualSign, ""),
                tok(Open, ""),
                tok(TypeName, "StaticResource"),
                tok(String, "Foo"),
                tok(Close, ""),
                tok(Close, ""),
            ]
        );
    }

    #[test]
    fn test_type_name_only() {
        use MeTokenKind::*;
        assert_eq!(
            tokens("{x:Null}"),
            vec![tok(Open, ""), tok(TypeName, "x:Null"), tok(Close, "")]
        );
    }

    #[test]
    fn test_quoted_values() {
        use MeTokenKind::*;
        assert_eq!(
            tokens("{Foo Text='a, b = c'}"),
            vec![
                tok(Open, ""),
                tok(TypeName, "Foo"),
                tok(PropertyName, "Text"),
                tok(EqualSign, ""),
                tok(String, "a, b = c"),
                tok(Close, ""),
            ]
        );
    }

    #[test]
    fn test_quoted_markup_extension() {
        use MeTokenKind::*;
        assert_eq!(
            tokens("{Foo Value='{Bar}'}")[4],
            tok(QuotedMarkupExtension, "{Bar}")
        );
        // `{}` escapes the quoted text instead.
        assert_eq!(tokens("{Foo Value='{}{Bar}'}")[4], tok(String, "{Bar}"));
        // Escapes are left for the nested extension to resolve.
        assert_eq!(
            tokens(r"{Foo Value='{Bar Path=a\,b}'}")[4],
            tok(QuotedMarkupExtension, r"{Bar Path=a\,b}")
        );
    }

    #[test]
    fn test_backslash_escapes() {
        use MeTokenKind::*;
        assert_eq!(
            tokens(r"{Foo Text=a\,b\}c}")[4],
            tok(String, "a,b}c")
        );
    }

    #[test]
    fn test_literal_brace_prefix() {
        use MeTokenKind::*;
        assert_eq!(tokens("{Foo {}literal}")[2], tok(String, "literal"));
    }

    #[test]
    fn test_nested_braces_in_unquoted_value() {
        use MeTokenKind::*;
        assert_eq!(tokens("{Foo Text=a{b}c}")[4], tok(String, "a{b}c"));
    }

    #[test]
    fn test_unquoted_values_are_trimmed() {
        use MeTokenKind::*;
        assert_eq!(
            tokens("{Foo  a b  , c }"),
            vec![
                tok(Open, ""),
                tok(TypeName, "Foo"),
                tok(String, "a b"),
                tok(Comma, ""),
                tok(String, "c"),
                tok(Close, ""),
            ]
        );
    }

    #[test]
    fn test_trailing_whitespace_flag() {
        let mut mode = BracketMode::default();
        let mut tokenizer = MeTokenizer::new("{Foo}  ");
        while tokenizer.next_token(&mut mode).unwrap().kind != MeTokenKind::None {}
        assert!(tokenizer.has_trailing_whitespace());

        let mut tokenizer = MeTokenizer::new("{Foo}");
        while tokenizer.next_token(&mut mode).unwrap().kind != MeTokenKind::None {}
        assert!(!tokenizer.has_trailing_whitespace());
    }

    #[test]
    fn test_quote_errors() {
        let err = first_error("{Foo Text='abc}", &mut BracketMode::default());
        assert_eq!(err.kind, MeTokenErrorKind::UnclosedQuote);

        let err = first_error("{Foo Text=ab'c'}", &mut BracketMode::default());
        assert_eq!(err.kind, MeTokenErrorKind::QuoteOutOfPlace);
        assert_eq!(err.offset, 12);
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = first_error("{Foo Text=a{b,c}", &mut BracketMode::default());
        assert_eq!(err.kind, MeTokenErrorKind::UnbalancedBraces);
    }

    fn path_mode() -> BracketMode {
        let mut chars = HashMap::new();
        chars.insert("Path".to_string(), BracketCharacters::new([('[', ']'), ('(', ')')]));
        BracketMode::new(vec!["Path".to_string()], chars)
    }

    #[test]
    fn test_bracket_escape_for_named_property() {
        use MeTokenKind::*;
        let mut chars = HashMap::new();
        chars.insert("Path".to_string(), BracketCharacters::new([('[', ']')]));
        let mut mode = BracketMode::new(Vec::new(), chars);
        assert_eq!(
            tokens_with("{Binding Path=Items[a,b=c], Mode=x}", &mut mode),
            vec![
                tok(Open, ""),
                tok(TypeName, "Binding"),
                tok(PropertyName, "Path"),
                tok(EqualSign, ""),
                tok(String, "Items[a,b=c]"),
                tok(Comma, ""),
                tok(PropertyName, "Mode"),
                tok(EqualSign, ""),
                tok(String, "x"),
                tok(Close, ""),
            ]
        );
    }

    #[test]
    fn test_bracket_escape_for_positional_parameter() {
        use MeTokenKind::*;
        let mut mode = path_mode();
        assert!(mode.is_constructor_parsing_mode());
        let tokens = tokens_with("{Binding Items[(a,b)], Mode=x}", &mut mode);
        assert_eq!(tokens[2], tok(String, "Items[(a,b)]"));
        assert!(!mode.is_constructor_parsing_mode());
        assert_eq!(mode.current_constructor_param(), 1);
    }

    #[test]
    fn test_mismatched_closing_bracket() {
        let err = first_error("{Binding Items[(a])}", &mut path_mode());
        assert_eq!(err.kind, MeTokenErrorKind::InvalidClosingBracket { ch: ']' });
    }

    #[test]
    fn test_unclosed_bracket() {
        let err = first_error("{Binding Items[a", &mut path_mode());
        assert_eq!(
            err.kind,
            MeTokenErrorKind::MalformedBracketCharacters { ch: '[' }
        );
    }

    #[test]
    fn test_equal_sign_ends_constructor_parsing() {
        let mut mode = BracketMode::new(vec!["a".to_string(), "b".to_string()], HashMap::new());
        let mut tokenizer = MeTokenizer::new("{Foo x, Name=y}");
        for _ in 0..3 {
            tokenizer.next_token(&mut mode).unwrap();
        }
        assert!(mode.is_constructor_parsing_mode());
        // `,`
        tokenizer.next_token(&mut mode).unwrap();
        assert!(mode.is_constructor_parsing_mode());
        assert_eq!(mode.current_constructor_param(), 1);
        // `Name`, `=`
        tokenizer.next_token(&mut mode).unwrap();
        tokenizer.next_token(&mut mode).unwrap();
        assert!(!mode.is_constructor_parsing_mode());
    }

    #[test]
    fn test_remove_escapes() {
        assert_eq!(remove_escapes(r"{}a\\b\c"), r"a\bc");
        assert_eq!(remove_escapes("plain"), "plain");
    }

    #[test]
    fn test_token_offsets() {
        let mut mode = BracketMode::default();
        let mut tokenizer = MeTokenizer::new("{Foo  Bar}");
        let open = tokenizer.next_token(&mut mode).unwrap();
        let name = tokenizer.next_token(&mut mode).unwrap();
        let value = tokenizer.next_token(&mut mode).unwrap();
        assert_eq!(open.offset, 0);
        assert_eq!(name.offset, 1);
        assert_eq!(value.offset, 6);
        assert_eq!(value.span, Span::new(6, 9));
    }
}
