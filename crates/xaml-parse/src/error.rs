//! Parse errors and their diagnostic rendering.

use std::fmt;
use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use xaml_tokenizer::{LineIndex, MeTokenErrorKind, MeTokenKind, Position, TypeNameError};

use crate::scanner::ScannerNodeKind;

/// Byte-indexed ariadne config honouring `NO_COLOR`.
fn ariadne_config() -> Config {
    let config = Config::default().with_index_type(IndexType::Byte);
    if std::env::var("NO_COLOR").is_ok() {
        config.with_color(false)
    } else {
        config
    }
}

/// A parse error with the line/column it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XamlParseError {
    pub kind: XamlParseErrorKind,
    /// Where the error was detected. Unknown for errors at end of input
    /// the reader could not place.
    pub position: Position,
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XamlParseErrorKind {
    // =========================================================================
    // XML layer
    // =========================================================================
    /// The XML reader rejected the document.
    Xml { message: String },

    /// The document ended inside an element.
    UnexpectedEndOfDocument { element: String },

    // =========================================================================
    // Names
    // =========================================================================
    /// A property element (`<Owner.Member>`) appeared with no enclosing
    /// object element.
    ParentlessPropertyElement { name: String },

    /// A prefix with no `xmlns` declaration in scope.
    UndeclaredPrefix { prefix: String },

    /// An attribute or property-element name that is not a valid member
    /// name.
    InvalidMemberName { name: String },

    /// A malformed type name, or one whose prefix cannot be resolved.
    InvalidTypeName(TypeNameError),

    // =========================================================================
    // Grammar
    // =========================================================================
    /// A scanner node that does not fit the active production.
    UnexpectedNode {
        rule: &'static str,
        found: ScannerNodeKind,
    },

    /// A markup-extension token that does not fit the active rule.
    MarkupExtensionRule {
        rule: &'static str,
        found: MeTokenKind,
    },

    // =========================================================================
    // Markup extensions
    // =========================================================================
    /// A lexical error in markup-extension text.
    MarkupExtension(MeTokenErrorKind),

    /// A property name where a value was expected: two named arguments
    /// without a comma between them.
    MissingComma { name: String },

    /// Tokens after the closing `}` of a markup extension.
    TrailingMarkupExtensionToken,

    /// Whitespace after the closing `}` of a markup extension.
    WhitespaceAfterMarkupExtension,

    /// Markup extensions nested deeper than `limit`.
    MarkupExtensionTooDeep { limit: usize },
}

impl XamlParseError {
    pub fn new(kind: XamlParseErrorKind, position: Position) -> Self {
        Self { kind, position }
    }

    /// Render this error with ariadne.
    ///
    /// Returns a string containing the formatted error message with source
    /// context. `source` must be the parsed document.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let range = self.range(source);
        let report = self.build_report(filename, range);
        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    /// Byte range of the offending character.
    fn range(&self, source: &str) -> Range<usize> {
        let start = if self.position.is_known() {
            LineIndex::new(source).offset(source, self.position) as usize
        } else {
            source.len()
        };
        let start = start.min(source.len());
        let end = source
            .get(start..)
            .and_then(|rest| rest.chars().next())
            .map_or(start, |c| start + c.len_utf8());
        start..end
    }

    fn build_report<'a>(
        &self,
        filename: &'a str,
        range: Range<usize>,
    ) -> ariadne::ReportBuilder<'static, (&'a str, Range<usize>)> {
        let report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_config(ariadne_config())
            .with_message(self.kind.to_string());

        let (label, help): (&str, Option<String>) = match &self.kind {
            XamlParseErrorKind::Xml { .. } => ("malformed XML", None),
            XamlParseErrorKind::UnexpectedEndOfDocument { element } => (
                "document ends here",
                Some(format!("close <{element}> before the end of the document")),
            ),
            XamlParseErrorKind::ParentlessPropertyElement { .. } => (
                "property element outside an object element",
                Some("wrap the property element in the object element it sets".to_string()),
            ),
            XamlParseErrorKind::UndeclaredPrefix { prefix } => (
                "undeclared prefix",
                Some(format!("declare it with xmlns:{prefix}=\"...\"")),
            ),
            XamlParseErrorKind::InvalidMemberName { .. } => ("invalid member name", None),
            XamlParseErrorKind::InvalidTypeName(_) => ("invalid type name", None),
            XamlParseErrorKind::UnexpectedNode { rule, .. } => {
                ("unexpected here", Some(format!("while parsing {rule}")))
            }
            XamlParseErrorKind::MarkupExtensionRule { rule, .. } => {
                ("unexpected token", Some(format!("while parsing {rule}")))
            }
            XamlParseErrorKind::MarkupExtension(_) => ("in this markup extension", None),
            XamlParseErrorKind::MissingComma { .. } => (
                "expected a value",
                Some("separate named arguments with ','".to_string()),
            ),
            XamlParseErrorKind::TrailingMarkupExtensionToken => (
                "after the closing '}'",
                Some("quote the value or escape it with a leading '{}'".to_string()),
            ),
            XamlParseErrorKind::WhitespaceAfterMarkupExtension => (
                "whitespace after the closing '}'",
                Some("remove the trailing whitespace".to_string()),
            ),
            XamlParseErrorKind::MarkupExtensionTooDeep { .. } => ("nested too deeply", None),
        };

        let report = report.with_label(
            Label::new((filename, range))
                .with_message(label)
                .with_color(Color::Red),
        );
        match help {
            Some(help) => report.with_help(help),
            None => report,
        }
    }
}

impl fmt::Display for XamlParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XamlParseErrorKind::Xml { message } => write!(f, "XML error: {message}"),
            XamlParseErrorKind::UnexpectedEndOfDocument { element } => {
                write!(f, "unexpected end of document inside <{element}>")
            }
            XamlParseErrorKind::ParentlessPropertyElement { name } => {
                write!(f, "property element <{name}> has no enclosing object element")
            }
            XamlParseErrorKind::UndeclaredPrefix { prefix } => {
                write!(f, "prefix '{prefix}' is not declared")
            }
            XamlParseErrorKind::InvalidMemberName { name } => {
                write!(f, "'{name}' is not a valid member name")
            }
            XamlParseErrorKind::InvalidTypeName(err) => write!(f, "{err}"),
            XamlParseErrorKind::UnexpectedNode { rule, found } => {
                write!(f, "unexpected {found} in {rule}")
            }
            XamlParseErrorKind::MarkupExtensionRule { rule, found } => {
                write!(f, "unexpected token {found:?} in markup extension {rule}")
            }
            XamlParseErrorKind::MarkupExtension(kind) => write!(f, "{kind}"),
            XamlParseErrorKind::MissingComma { name } => {
                write!(f, "missing ',' before '{name}' in markup extension")
            }
            XamlParseErrorKind::TrailingMarkupExtensionToken => {
                write!(f, "unexpected text after the end of the markup extension")
            }
            XamlParseErrorKind::WhitespaceAfterMarkupExtension => {
                write!(f, "whitespace after the end of the markup extension")
            }
            XamlParseErrorKind::MarkupExtensionTooDeep { limit } => {
                write!(f, "markup extensions nested more than {limit} deep")
            }
        }
    }
}

impl fmt::Display for XamlParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.position.is_known() {
            write!(f, "{} at {}", self.kind, self.position)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl std::error::Error for XamlParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            XamlParseErrorKind::InvalidTypeName(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_display_appends_position() {
        let err = XamlParseError::new(
            XamlParseErrorKind::UndeclaredPrefix {
                prefix: "ui".into(),
            },
            Position::new(2, 5),
        );
        assert_eq!(err.to_string(), "prefix 'ui' is not declared at line 2, column 5");

        let err = XamlParseError::new(
            XamlParseErrorKind::WhitespaceAfterMarkupExtension,
            Position::default(),
        );
        assert_eq!(
            err.to_string(),
            "whitespace after the end of the markup extension"
        );
    }

    #[test]
    fn test_render_points_at_position() {
        let source = "<a>\n  <b:c/>\n</a>";
        let err = XamlParseError::new(
            XamlParseErrorKind::UndeclaredPrefix { prefix: "b".into() },
            Position::new(2, 3),
        );
        let rendered = err.render("test.xaml", source);
        let plain = String::from_utf8(strip_ansi_escapes::strip(rendered.as_bytes())).unwrap();
        assert!(plain.contains("prefix 'b' is not declared"), "{plain}");
        assert!(plain.contains("test.xaml:2:3"), "{plain}");
        assert!(plain.contains("undeclared prefix"), "{plain}");
        assert!(plain.contains("xmlns:b"), "{plain}");
    }

    #[test]
    fn test_range_of_unknown_position_is_end_of_source() {
        let source = "<a>";
        let err = XamlParseError::new(
            XamlParseErrorKind::UnexpectedEndOfDocument {
                element: "a".into(),
            },
            Position::default(),
        );
        assert_eq!(err.range(source), 3..3);
    }
}
