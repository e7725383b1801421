//! Generic XAML type names: `prefix:Name(prefix:Arg, ...)[,]`.
//!
//! ```text
//! XamlTypeName     ::= SimpleTypeName TypeParameters? SUBSCRIPT*
//! SimpleTypeName   ::= (PREFIX ':')? NAME
//! TypeParameters   ::= '(' XamlTypeNameList ')'
//! XamlTypeNameList ::= XamlTypeName (',' XamlTypeName)*
//! ```

use std::fmt;

use tracing::trace;

use crate::name::{XamlQualifiedName, is_name_char, is_name_start_char};

/// A resolved type name: namespace, local name and ordered type arguments.
///
/// Array subscripts are part of the local name (`Grid[,]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct XamlTypeName {
    pub namespace: String,
    pub name: String,
    pub type_arguments: Vec<XamlTypeName>,
}

/// Error raised while parsing or rendering a type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNameError {
    pub kind: TypeNameErrorKind,
    /// Character offset into the type-name text.
    pub offset: u32,
}

/// The kind of type-name error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNameErrorKind {
    /// A character that cannot start any token.
    UnexpectedChar { ch: char, text: String },
    /// A token that does not fit the grammar.
    InvalidTypeName { text: String },
    /// A prefix with no namespace in scope.
    PrefixNotFound { prefix: String },
    /// Rendering found no prefix for a namespace.
    NoPrefixForNamespace { namespace: String },
}

impl fmt::Display for TypeNameErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNameErrorKind::UnexpectedChar { ch, text } => write!(
                f,
                "character '{ch}' was unexpected in type name '{text}'"
            ),
            TypeNameErrorKind::InvalidTypeName { text } => {
                write!(f, "'{text}' is not a valid type name")
            }
            TypeNameErrorKind::PrefixNotFound { prefix } => {
                write!(f, "namespace prefix '{prefix}' is not defined")
            }
            TypeNameErrorKind::NoPrefixForNamespace { namespace } => {
                write!(f, "no prefix is defined for namespace '{namespace}'")
            }
        }
    }
}

impl fmt::Display for TypeNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for TypeNameError {}

impl XamlTypeName {
    /// A type name without type arguments.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            type_arguments: Vec::new(),
        }
    }

    /// A type name with type arguments.
    pub fn with_arguments(
        namespace: impl Into<String>,
        name: impl Into<String>,
        type_arguments: Vec<XamlTypeName>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            type_arguments,
        }
    }

    #[inline]
    pub fn has_type_arguments(&self) -> bool {
        !self.type_arguments.is_empty()
    }

    /// Parse text that contains neither `(` nor `[` as a plain `prefix:Name`.
    ///
    /// Returns `None` when the text is not trivial, so the caller falls back
    /// to [`XamlTypeName::parse`].
    pub fn parse_if_trivial<F>(text: &str, resolve_prefix: F) -> Option<Result<Self, TypeNameError>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if text.contains(['(', '[']) {
            return None;
        }
        let trimmed = text.trim();
        let Some(qualified) = XamlQualifiedName::parse(trimmed) else {
            return Some(Err(TypeNameError {
                kind: TypeNameErrorKind::InvalidTypeName {
                    text: text.to_string(),
                },
                offset: 0,
            }));
        };
        let Some(namespace) = resolve_prefix(&qualified.prefix) else {
            return Some(Err(TypeNameError {
                kind: TypeNameErrorKind::PrefixNotFound {
                    prefix: qualified.prefix,
                },
                offset: 0,
            }));
        };
        Some(Ok(Self::new(namespace, qualified.name)))
    }

    /// Parse a single type name.
    pub fn parse<F>(text: &str, resolve_prefix: F) -> Result<Self, TypeNameError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(result) = Self::parse_if_trivial(text, &resolve_prefix) {
            return result;
        }
        let mut names = TypeNameParser::new(text, &resolve_prefix).parse(false)?;
        match names.pop() {
            Some(name) if names.is_empty() => Ok(name),
            _ => Err(TypeNameError {
                kind: TypeNameErrorKind::InvalidTypeName {
                    text: text.to_string(),
                },
                offset: 0,
            }),
        }
    }

    /// Parse a comma-separated list of type names (`x:TypeArguments`).
    pub fn parse_list<F>(text: &str, resolve_prefix: F) -> Result<Vec<Self>, TypeNameError>
    where
        F: Fn(&str) -> Option<String>,
    {
        TypeNameParser::new(text, &resolve_prefix).parse(true)
    }

    /// Render as `prefix:Name(prefix:Arg, ...)[..]`, asking `lookup_prefix`
    /// for the prefix of each namespace. An empty prefix renders without a
    /// colon.
    pub fn to_qualified_string<F>(&self, lookup_prefix: F) -> Result<String, TypeNameError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::new();
        self.write_qualified(&mut out, &lookup_prefix)?;
        Ok(out)
    }

    fn write_qualified(
        &self,
        out: &mut String,
        lookup_prefix: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(), TypeNameError> {
        let Some(prefix) = lookup_prefix(&self.namespace) else {
            return Err(TypeNameError {
                kind: TypeNameErrorKind::NoPrefixForNamespace {
                    namespace: self.namespace.clone(),
                },
                offset: 0,
            });
        };
        if !prefix.is_empty() {
            out.push_str(&prefix);
            out.push(':');
        }

        let (base, subscript) = split_subscript(&self.name);
        out.push_str(base);
        if self.has_type_arguments() {
            out.push('(');
            for (i, argument) in self.type_arguments.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                argument.write_qualified(out, lookup_prefix)?;
            }
            out.push(')');
        }
        out.push_str(subscript);
        Ok(())
    }
}

impl fmt::Display for XamlTypeName {
    /// `{namespace}Name(...)`, for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{{{}}}", self.namespace)?;
        }
        let (base, subscript) = split_subscript(&self.name);
        f.write_str(base)?;
        if self.has_type_arguments() {
            f.write_str("(")?;
            for (i, argument) in self.type_arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{argument}")?;
            }
            f.write_str(")")?;
        }
        f.write_str(subscript)
    }
}

/// Split `Name[,][]` into `("Name", "[,][]")`.
fn split_subscript(name: &str) -> (&str, &str) {
    match name.find('[') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeNameToken {
    Name(String),
    Colon,
    OpenParen,
    CloseParen,
    Comma,
    Subscript(String),
    End,
}

/// Splits type-name text into tokens, skipping whitespace.
struct TypeNameScanner<'src> {
    source: &'src str,
    remaining: &'src str,
    /// Character offset of `remaining` in `source`.
    offset: u32,
}

impl<'src> TypeNameScanner<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            remaining: source,
            offset: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.remaining = &self.remaining[c.len_utf8()..];
        self.offset += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn unexpected(&self, ch: char, offset: u32) -> TypeNameError {
        TypeNameError {
            kind: TypeNameErrorKind::UnexpectedChar {
                ch,
                text: self.source.to_string(),
            },
            offset,
        }
    }

    /// Returns the token and the character offset it starts at.
    fn next_token(&mut self) -> Result<(TypeNameToken, u32), TypeNameError> {
        self.skip_whitespace();
        let start = self.offset;
        let Some(c) = self.advance() else {
            return Ok((TypeNameToken::End, start));
        };

        let token = match c {
            ':' => TypeNameToken::Colon,
            '(' => TypeNameToken::OpenParen,
            ')' => TypeNameToken::CloseParen,
            ',' => TypeNameToken::Comma,
            '[' => {
                let mut subscript = String::from("[");
                loop {
                    match self.advance() {
                        Some(',') => subscript.push(','),
                        Some(']') => {
                            subscript.push(']');
                            break;
                        }
                        Some(ws) if ws.is_whitespace() => {}
                        Some(other) => return Err(self.unexpected(other, self.offset - 1)),
                        None => return Err(self.unexpected('[', start)),
                    }
                }
                TypeNameToken::Subscript(subscript)
            }
            c if is_name_start_char(c) => {
                let mut name = String::from(c);
                while let Some(next) = self.peek() {
                    if is_name_char(next) || next == '.' || next == '-' {
                        name.push(next);
                        self.advance();
                    } else {
                        break;
                    }
                }
                TypeNameToken::Name(name)
            }
            other => return Err(self.unexpected(other, start)),
        };

        trace!("Type name token {:?} at {}", token, start);
        Ok((token, start))
    }
}

/// One type name under construction.
struct Frame {
    prefix: String,
    name: String,
    /// Character offset of the name, for prefix errors.
    offset: u32,
    type_arguments: Vec<XamlTypeName>,
}

/// What the parser expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// A prefix or name starting a type name.
    TypeName,
    /// `:` or anything that may follow a simple name.
    AfterFirstName,
    /// The name after `prefix:`.
    NameAfterColon,
    /// `(`, a subscript, `,`, `)` or the end.
    AfterSimpleName,
    /// A subscript, `,`, `)` or the end.
    AfterTypeArguments,
}

/// Explicit-stack parser over [`TypeNameScanner`] tokens.
struct TypeNameParser<'src, 'f> {
    scanner: TypeNameScanner<'src>,
    resolve_prefix: &'f dyn Fn(&str) -> Option<String>,
    stack: Vec<Frame>,
}

impl<'src, 'f> TypeNameParser<'src, 'f> {
    fn new(source: &'src str, resolve_prefix: &'f dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            scanner: TypeNameScanner::new(source),
            resolve_prefix,
            stack: Vec::new(),
        }
    }

    fn invalid(&self, offset: u32) -> TypeNameError {
        TypeNameError {
            kind: TypeNameErrorKind::InvalidTypeName {
                text: self.scanner.source.to_string(),
            },
            offset,
        }
    }

    /// Pop the innermost frame, resolve its prefix and attach it to its parent
    /// (or to `results` at the top level).
    fn close_frame(&mut self, results: &mut Vec<XamlTypeName>) -> Result<(), TypeNameError> {
        let Some(frame) = self.stack.pop() else {
            return Err(self.invalid(self.scanner.offset));
        };
        let Some(namespace) = (self.resolve_prefix)(&frame.prefix) else {
            return Err(TypeNameError {
                kind: TypeNameErrorKind::PrefixNotFound {
                    prefix: frame.prefix,
                },
                offset: frame.offset,
            });
        };
        let name = XamlTypeName::with_arguments(namespace, frame.name, frame.type_arguments);
        trace!("Parsed type name {}", name);
        match self.stack.last_mut() {
            Some(parent) => parent.type_arguments.push(name),
            None => results.push(name),
        }
        Ok(())
    }

    fn parse(mut self, allow_list: bool) -> Result<Vec<XamlTypeName>, TypeNameError> {
        let mut results = Vec::new();
        let mut expect = Expect::TypeName;
        // Number of frames whose `(` is still open.
        let mut open_parens = 0usize;

        loop {
            let (token, offset) = self.scanner.next_token()?;
            match (expect, token) {
                (Expect::TypeName, TypeNameToken::Name(name)) => {
                    self.stack.push(Frame {
                        prefix: String::new(),
                        name,
                        offset,
                        type_arguments: Vec::new(),
                    });
                    expect = Expect::AfterFirstName;
                }
                (Expect::AfterFirstName, TypeNameToken::Colon) => {
                    expect = Expect::NameAfterColon;
                }
                (Expect::NameAfterColon, TypeNameToken::Name(name)) => {
                    let Some(frame) = self.stack.last_mut() else {
                        return Err(self.invalid(offset));
                    };
                    frame.prefix = std::mem::take(&mut frame.name);
                    frame.name = name;
                    expect = Expect::AfterSimpleName;
                }
                (Expect::AfterFirstName | Expect::AfterSimpleName, TypeNameToken::OpenParen) => {
                    open_parens += 1;
                    expect = Expect::TypeName;
                }
                (
                    Expect::AfterFirstName | Expect::AfterSimpleName | Expect::AfterTypeArguments,
                    TypeNameToken::Subscript(subscript),
                ) => {
                    let Some(frame) = self.stack.last_mut() else {
                        return Err(self.invalid(offset));
                    };
                    frame.name.push_str(&subscript);
                    expect = Expect::AfterTypeArguments;
                }
                (
                    Expect::AfterFirstName | Expect::AfterSimpleName | Expect::AfterTypeArguments,
                    TypeNameToken::Comma,
                ) => {
                    self.close_frame(&mut results)?;
                    if self.stack.len() != open_parens || (open_parens == 0 && !allow_list) {
                        return Err(self.invalid(offset));
                    }
                    expect = Expect::TypeName;
                }
                (
                    Expect::AfterFirstName | Expect::AfterSimpleName | Expect::AfterTypeArguments,
                    TypeNameToken::CloseParen,
                ) => {
                    if open_parens == 0 {
                        return Err(self.invalid(offset));
                    }
                    // Close the last argument; its parent is the frame whose
                    // parenthesis this closes.
                    self.close_frame(&mut results)?;
                    if self.stack.len() != open_parens {
                        return Err(self.invalid(offset));
                    }
                    open_parens -= 1;
                    expect = Expect::AfterTypeArguments;
                }
                (
                    Expect::AfterFirstName | Expect::AfterSimpleName | Expect::AfterTypeArguments,
                    TypeNameToken::End,
                ) => {
                    if open_parens != 0 {
                        return Err(self.invalid(offset));
                    }
                    self.close_frame(&mut results)?;
                    if !self.stack.is_empty() {
                        return Err(self.invalid(offset));
                    }
                    return Ok(results);
                }
                (_, _) => return Err(self.invalid(offset)),
            }
        }
    }
}
