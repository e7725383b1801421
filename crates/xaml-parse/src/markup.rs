//! Markup-extension parser: turns `{Type arg, Name=value}` attribute text
//! into XAML nodes.

use tracing::debug;
use xaml_schema::{XamlMember, XamlType, XamlTypeName, xaml_language};
use xaml_tokenizer::{BracketMode, MeToken, MeTokenKind, MeTokenizer, Position};

use crate::context::ParserContext;
use crate::error::{XamlParseError, XamlParseErrorKind};
use crate::node::XamlNode;

/// Recursive-descent parser over one markup extension.
///
/// ```text
/// MarkupExtension ::= '{' TYPENAME (Arguments)? '}'
/// Arguments       ::= (PositionalArgs (',' NamedArgs)?) | NamedArgs
/// PositionalArgs  ::= Value (',' PositionalArgs)? | NamedArg
/// NamedArgs       ::= NamedArg (',' NamedArg)*
/// NamedArg        ::= PROPERTYNAME '=' Value
/// Value           ::= STRING | QUOTEDMARKUPEXTENSION | MarkupExtension
/// ```
///
/// Every extension gets a scope on the context while its arguments are
/// read; the scope carries the extension's escape-bracket state.
pub(crate) struct MePullParser<'c, 's, 't> {
    ctx: &'c mut ParserContext<'s>,
    tokenizer: MeTokenizer<'t>,
    /// Position of the first character of the text.
    position: Position,
    /// Scopes this parser has pushed and not yet popped.
    open: usize,
    /// Extensions open in the parsers this one is quoted inside of.
    outer: usize,
}

/// Deepest nesting of markup extensions, quoted ones included.
pub(crate) const MAX_NESTING: usize = 64;

impl<'c, 's, 't> MePullParser<'c, 's, 't> {
    pub(crate) fn new(ctx: &'c mut ParserContext<'s>, text: &'t str, position: Position) -> Self {
        Self::nested(ctx, text, position, 0)
    }

    fn nested(ctx: &'c mut ParserContext<'s>, text: &'t str, position: Position, outer: usize) -> Self {
        Self {
            ctx,
            tokenizer: MeTokenizer::new(text),
            position,
            open: 0,
            outer,
        }
    }

    /// Parse the whole text, which must hold exactly one markup extension.
    pub(crate) fn parse(mut self) -> Result<Vec<XamlNode>, XamlParseError> {
        let mut out = Vec::new();
        let token = self.next_token()?;
        if token.kind != MeTokenKind::Open {
            return Err(self.rule_error("MarkupExtension", &token));
        }
        self.markup_extension(&mut out)?;

        let token = self.next_token()?;
        if token.kind != MeTokenKind::None {
            return Err(self.error(
                XamlParseErrorKind::TrailingMarkupExtensionToken,
                token.offset,
            ));
        }
        if self.tokenizer.has_trailing_whitespace() {
            let end = self.tokenizer.source().chars().count() as u32;
            return Err(self.error(XamlParseErrorKind::WhitespaceAfterMarkupExtension, end));
        }
        Ok(out)
    }

    fn next_token(&mut self) -> Result<MeToken, XamlParseError> {
        let mut scratch = BracketMode::default();
        let mode = match self.ctx.current_mut() {
            Some(scope) if self.open > 0 => scope.bracket_mode.get_or_insert_with(BracketMode::default),
            _ => &mut scratch,
        };
        self.tokenizer.next_token(mode).map_err(|err| {
            XamlParseError::new(
                XamlParseErrorKind::MarkupExtension(err.kind),
                self.position.advance(err.offset),
            )
        })
    }

    fn error(&self, kind: XamlParseErrorKind, offset: u32) -> XamlParseError {
        XamlParseError::new(kind, self.position.advance(offset))
    }

    fn rule_error(&self, rule: &'static str, token: &MeToken) -> XamlParseError {
        self.error(
            XamlParseErrorKind::MarkupExtensionRule {
                rule,
                found: token.kind,
            },
            token.offset,
        )
    }

    /// The rest of a markup extension, after its `{`.
    fn markup_extension(&mut self, out: &mut Vec<XamlNode>) -> Result<(), XamlParseError> {
        let token = self.next_token()?;
        if token.kind != MeTokenKind::TypeName {
            return Err(self.rule_error("MarkupExtension", &token));
        }
        if self.outer + self.open >= MAX_NESTING {
            return Err(self.error(
                XamlParseErrorKind::MarkupExtensionTooDeep { limit: MAX_NESTING },
                token.offset,
            ));
        }
        let ty = self.resolve_type(&token)?;
        debug!(%ty, "markup extension");

        let mode = BracketMode::new(
            ty.constructor_parameters().to_vec(),
            ty.bracket_characters().clone(),
        );
        self.ctx.push_scope(ty.clone()).bracket_mode = Some(mode);
        self.open += 1;
        out.push(XamlNode::StartObject(ty.clone()));

        let token = self.next_token()?;
        if token.kind != MeTokenKind::Close {
            self.arguments(token, &ty, out)?;
        }

        out.push(XamlNode::EndObject);
        self.ctx.pop_scope();
        self.open -= 1;
        Ok(())
    }

    fn resolve_type(&self, token: &MeToken) -> Result<XamlType, XamlParseError> {
        let name = XamlTypeName::parse(&token.text, |prefix| {
            self.ctx
                .find_namespace_by_prefix(prefix)
                .or_else(|| prefix.is_empty().then(String::new))
        })
        .map_err(|err| {
            let offset = token.offset + err.offset;
            self.error(XamlParseErrorKind::InvalidTypeName(err), offset)
        })?;
        Ok(self.ctx.resolve_markup_extension_type(&name))
    }

    /// Arguments up to and including the closing `}`. Positional values are
    /// wrapped in one `_PositionalParameters` member.
    fn arguments(
        &mut self,
        first: MeToken,
        ty: &XamlType,
        out: &mut Vec<XamlNode>,
    ) -> Result<(), XamlParseError> {
        let mut token = first;
        let mut positional = false;
        let mut named = false;
        loop {
            match token.kind {
                MeTokenKind::String | MeTokenKind::QuotedMarkupExtension | MeTokenKind::Open => {
                    if named {
                        return Err(self.rule_error("NamedArgs", &token));
                    }
                    if !positional {
                        out.push(XamlNode::StartMember(
                            xaml_language::positional_parameters().clone(),
                        ));
                        positional = true;
                    }
                    self.value(token, out)?;
                }
                MeTokenKind::PropertyName => {
                    if positional {
                        out.push(XamlNode::EndMember);
                        positional = false;
                    }
                    named = true;
                    self.named_argument(token, ty, out)?;
                }
                _ => return Err(self.rule_error("Arguments", &token)),
            }

            token = self.next_token()?;
            match token.kind {
                MeTokenKind::Close => break,
                MeTokenKind::Comma => token = self.next_token()?,
                MeTokenKind::PropertyName => {
                    return Err(self.error(
                        XamlParseErrorKind::MissingComma { name: token.text },
                        token.offset,
                    ));
                }
                _ => return Err(self.rule_error("Arguments", &token)),
            }
        }

        if positional {
            out.push(XamlNode::EndMember);
        }
        Ok(())
    }

    /// `PROPERTYNAME '=' Value`
    fn named_argument(
        &mut self,
        name: MeToken,
        ty: &XamlType,
        out: &mut Vec<XamlNode>,
    ) -> Result<(), XamlParseError> {
        let member = self
            .ctx
            .resolve_property(ty, &name.text)
            .unwrap_or_else(|| XamlMember::unknown(name.text.as_str(), ty, false));

        let token = self.next_token()?;
        if token.kind != MeTokenKind::EqualSign {
            return Err(self.rule_error("NamedArg", &token));
        }

        let value = self.next_token()?;
        match value.kind {
            MeTokenKind::String | MeTokenKind::QuotedMarkupExtension | MeTokenKind::Open => {}
            MeTokenKind::PropertyName => {
                return Err(self.error(
                    XamlParseErrorKind::MissingComma { name: value.text },
                    value.offset,
                ));
            }
            _ => return Err(self.rule_error("NamedArg", &value)),
        }

        out.push(XamlNode::StartMember(member));
        self.value(value, out)?;
        out.push(XamlNode::EndMember);
        Ok(())
    }

    fn value(&mut self, token: MeToken, out: &mut Vec<XamlNode>) -> Result<(), XamlParseError> {
        match token.kind {
            MeTokenKind::String => out.push(XamlNode::Value(token.text)),
            MeTokenKind::Open => self.markup_extension(out)?,
            MeTokenKind::QuotedMarkupExtension => {
                // The nested text starts after the opening quote.
                let position = self.position.advance(token.offset + 1);
                let outer = self.outer + self.open;
                let nested = MePullParser::nested(&mut *self.ctx, &token.text, position, outer).parse()?;
                out.extend(nested);
            }
            _ => return Err(self.rule_error("Value", &token)),
        }
        Ok(())
    }
}
