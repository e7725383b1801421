//! XAML pull parser.
//!
//! Reads XAML markup and produces a lazy stream of [`XamlNode`]s: object and
//! member boundaries, values, namespace declarations and optional line
//! information, ready for an object writer.
//!
//! ```
//! use xaml_parse::{XamlReaderSettings, parse_to_vec};
//! use xaml_schema::MemorySchema;
//!
//! let schema = MemorySchema::new();
//! let nodes = parse_to_vec("<Button xmlns=\"urn:ui\" Content=\"OK\"/>", &schema, XamlReaderSettings::default()).unwrap();
//! assert_eq!(nodes.first().unwrap().to_string(), "NamespaceDeclaration(\"\", \"urn:ui\")");
//! ```

use xaml_schema::SchemaContext;

mod context;
pub use context::{ParserContext, Scope};

mod error;
pub use error::{XamlParseError, XamlParseErrorKind};

mod markup;

mod node;
pub use node::XamlNode;

mod parser;
pub use parser::XamlPullParser;

mod prefix;

mod scanner;
pub use scanner::{ScannerNode, ScannerNodeKind, XamlScanner};

mod settings;
pub use settings::XamlReaderSettings;

/// Parse `source`, resolving names against `schema`.
pub fn parse<'s, 'src>(
    source: &'src str,
    schema: &'s dyn SchemaContext,
    settings: XamlReaderSettings,
) -> XamlPullParser<'s, 'src> {
    XamlPullParser::new(source, schema, settings)
}

/// Parse `source` to completion.
pub fn parse_to_vec(
    source: &str,
    schema: &dyn SchemaContext,
    settings: XamlReaderSettings,
) -> Result<Vec<XamlNode>, XamlParseError> {
    parse(source, schema, settings).collect()
}
