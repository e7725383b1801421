//! Type and member descriptors for the XAML parser, the [`SchemaContext`]
//! resolver trait, the built-in XAML language vocabulary and an in-memory
//! resolver.

mod context;
pub use context::SchemaContext;

mod member;
pub use member::{MemberKind, XamlMember};

mod memory;
pub use memory::MemorySchema;

mod types;
pub use types::{CollectionKind, TypeConverter, XamlType, XamlTypeBuilder};

pub mod xaml_language;

pub use xaml_tokenizer::{BracketCharacters, XamlTypeName};
