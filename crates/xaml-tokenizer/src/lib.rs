//! Lexical layer for XAML: source positions, text whitespace rules, member
//! and type names, and markup extension tokens.

mod span;
pub use span::{LineIndex, Position, Span};

pub mod text;
pub use text::XamlText;

mod name;
pub use name::{XamlPropertyName, XamlQualifiedName, is_name_char, is_name_start_char, is_valid_name};

mod type_name;
pub use type_name::{TypeNameError, TypeNameErrorKind, XamlTypeName};

mod markup;
pub use markup::{
    BracketCharacters, BracketMode, MeToken, MeTokenError, MeTokenErrorKind, MeTokenKind,
    MeTokenizer, remove_escapes,
};
