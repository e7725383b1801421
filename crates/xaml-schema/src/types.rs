//! Type descriptors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use xaml_tokenizer::{BracketCharacters, XamlTypeName};

use crate::xaml_language;

/// How a type converts from text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeConverter {
    /// Text is the value itself.
    String,
    /// Text is accepted as an untyped value.
    Object,
    /// A named, type-specific converter.
    Named(String),
}

/// Whether and how a type holds items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollectionKind {
    #[default]
    None,
    Collection,
    Dictionary,
    Array,
}

/// A type as seen by the parser: a name plus the capability flags that drive
/// node-stream decisions.
///
/// Cheap to clone. Two descriptors are equal when their names are equal.
#[derive(Clone)]
pub struct XamlType(Arc<TypeData>);

#[derive(Debug)]
struct TypeData {
    name: XamlTypeName,
    unknown: bool,
    collection_kind: CollectionKind,
    item_type: Option<XamlType>,
    allowed_content_types: Vec<XamlTypeName>,
    markup_extension: bool,
    whitespace_significant_collection: bool,
    trim_surrounding_whitespace: bool,
    constructible: bool,
    construction_requires_arguments: bool,
    type_converter: Option<TypeConverter>,
    content_property: Option<String>,
    runtime_name_property: Option<String>,
    constructor_parameters: Vec<String>,
    bracket_characters: HashMap<String, BracketCharacters>,
    base_types: Vec<XamlTypeName>,
}

impl XamlType {
    /// Start describing a known type.
    pub fn builder(name: XamlTypeName) -> XamlTypeBuilder {
        XamlTypeBuilder::new(name)
    }

    /// A descriptor for a type the schema could not resolve.
    pub fn unknown(name: XamlTypeName) -> Self {
        let mut builder = XamlTypeBuilder::new(name);
        builder.data.unknown = true;
        builder.build()
    }

    pub fn name(&self) -> &XamlTypeName {
        &self.0.name
    }

    pub fn namespace(&self) -> &str {
        &self.0.name.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.0.name.name
    }

    pub fn type_arguments(&self) -> &[XamlTypeName] {
        &self.0.name.type_arguments
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.0.unknown
    }

    #[inline]
    pub fn collection_kind(&self) -> CollectionKind {
        self.0.collection_kind
    }

    /// Whether the type is a list-like collection (arrays included).
    #[inline]
    pub fn is_collection(&self) -> bool {
        matches!(
            self.0.collection_kind,
            CollectionKind::Collection | CollectionKind::Array
        )
    }

    #[inline]
    pub fn is_dictionary(&self) -> bool {
        self.0.collection_kind == CollectionKind::Dictionary
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.0.collection_kind == CollectionKind::Array
    }

    /// Element type of an array or collection.
    pub fn item_type(&self) -> Option<&XamlType> {
        self.0.item_type.as_ref()
    }

    /// Types a collection accepts as direct content.
    pub fn allowed_content_types(&self) -> &[XamlTypeName] {
        &self.0.allowed_content_types
    }

    #[inline]
    pub fn is_markup_extension(&self) -> bool {
        self.0.markup_extension
    }

    /// Whether whitespace between items of this collection is content.
    #[inline]
    pub fn is_whitespace_significant_collection(&self) -> bool {
        self.0.whitespace_significant_collection
    }

    /// Whether text next to an element of this type loses its adjacent
    /// whitespace.
    #[inline]
    pub fn trims_surrounding_whitespace(&self) -> bool {
        self.0.trim_surrounding_whitespace
    }

    /// Whether the type has a parameterless constructor.
    #[inline]
    pub fn is_constructible(&self) -> bool {
        self.0.constructible
    }

    #[inline]
    pub fn construction_requires_arguments(&self) -> bool {
        self.0.construction_requires_arguments
    }

    pub fn type_converter(&self) -> Option<&TypeConverter> {
        self.0.type_converter.as_ref()
    }

    /// Name of the property that receives element content.
    pub fn content_property(&self) -> Option<&str> {
        self.0.content_property.as_deref()
    }

    /// Name of the property aliasing `x:Name`.
    pub fn runtime_name_property(&self) -> Option<&str> {
        self.0.runtime_name_property.as_deref()
    }

    /// Parameter names of the longest constructor.
    pub fn constructor_parameters(&self) -> &[String] {
        &self.0.constructor_parameters
    }

    /// Escape bracket characters by parameter or property name.
    pub fn bracket_characters(&self) -> &HashMap<String, BracketCharacters> {
        &self.0.bracket_characters
    }

    /// Direct and indirect base types and implemented interfaces.
    pub fn base_types(&self) -> &[XamlTypeName] {
        &self.0.base_types
    }

    /// Whether a value of this type can be stored where `target` is expected.
    ///
    /// Every type is assignable to the language's object type; unknown types
    /// are assignable only to themselves and object.
    pub fn can_assign_to(&self, target: &XamlType) -> bool {
        if self == target || target.name() == xaml_language::object().name() {
            return true;
        }
        self.0.base_types.iter().any(|base| base == target.name())
    }

    /// Whether text is a valid value: the type converts from string or object.
    pub fn accepts_text(&self) -> bool {
        matches!(
            self.0.type_converter,
            Some(TypeConverter::String | TypeConverter::Object)
        )
    }
}

impl PartialEq for XamlType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for XamlType {}

impl std::hash::Hash for XamlType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for XamlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XamlType({}", self.0.name)?;
        if self.0.unknown {
            f.write_str(", unknown")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for XamlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.name, f)
    }
}

/// Builder for [`XamlType`].
#[derive(Debug)]
pub struct XamlTypeBuilder {
    data: TypeData,
}

impl XamlTypeBuilder {
    fn new(name: XamlTypeName) -> Self {
        Self {
            data: TypeData {
                name,
                unknown: false,
                collection_kind: CollectionKind::None,
                item_type: None,
                allowed_content_types: Vec::new(),
                markup_extension: false,
                whitespace_significant_collection: false,
                trim_surrounding_whitespace: false,
                constructible: true,
                construction_requires_arguments: false,
                type_converter: None,
                content_property: None,
                runtime_name_property: None,
                constructor_parameters: Vec::new(),
                bracket_characters: HashMap::new(),
                base_types: Vec::new(),
            },
        }
    }

    /// A list-like collection accepting `item_type`.
    pub fn collection(mut self, item_type: XamlType) -> Self {
        self.data.collection_kind = CollectionKind::Collection;
        self.data.allowed_content_types = vec![item_type.name().clone()];
        self.data.item_type = Some(item_type);
        self
    }

    /// A keyed collection accepting `item_type` values.
    pub fn dictionary(mut self, item_type: XamlType) -> Self {
        self.data.collection_kind = CollectionKind::Dictionary;
        self.data.allowed_content_types = vec![item_type.name().clone()];
        self.data.item_type = Some(item_type);
        self
    }

    /// An array of `item_type`. Arrays are filled, never constructed.
    pub fn array(mut self, item_type: XamlType) -> Self {
        self.data.collection_kind = CollectionKind::Array;
        self.data.allowed_content_types = vec![item_type.name().clone()];
        self.data.item_type = Some(item_type);
        self.data.constructible = false;
        self
    }

    /// Additional types a collection accepts as content.
    pub fn allowed_content_type(mut self, name: XamlTypeName) -> Self {
        self.data.allowed_content_types.push(name);
        self
    }

    pub fn markup_extension(mut self) -> Self {
        self.data.markup_extension = true;
        self
    }

    pub fn whitespace_significant_collection(mut self) -> Self {
        self.data.whitespace_significant_collection = true;
        self
    }

    pub fn trim_surrounding_whitespace(mut self) -> Self {
        self.data.trim_surrounding_whitespace = true;
        self
    }

    /// The type has no parameterless constructor.
    pub fn not_constructible(mut self) -> Self {
        self.data.constructible = false;
        self
    }

    /// Every constructor takes arguments.
    pub fn construction_requires_arguments(mut self) -> Self {
        self.data.construction_requires_arguments = true;
        self.data.constructible = false;
        self
    }

    pub fn type_converter(mut self, converter: TypeConverter) -> Self {
        self.data.type_converter = Some(converter);
        self
    }

    pub fn content_property(mut self, name: impl Into<String>) -> Self {
        self.data.content_property = Some(name.into());
        self
    }

    pub fn runtime_name_property(mut self, name: impl Into<String>) -> Self {
        self.data.runtime_name_property = Some(name.into());
        self
    }

    /// Parameter names of the longest constructor.
    pub fn constructor_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data.constructor_parameters = names.into_iter().map(Into::into).collect();
        self
    }

    /// Escape brackets for the parameter or property `name`.
    pub fn bracket_characters(mut self, name: impl Into<String>, chars: BracketCharacters) -> Self {
        self.data.bracket_characters.insert(name.into(), chars);
        self
    }

    /// Record a base type or interface, inheriting its members and
    /// assignability.
    pub fn base_type(mut self, base: &XamlType) -> Self {
        for name in std::iter::once(base.name()).chain(base.base_types()) {
            if !self.data.base_types.contains(name) {
                self.data.base_types.push(name.clone());
            }
        }
        self
    }

    pub fn build(self) -> XamlType {
        XamlType(Arc::new(self.data))
    }
}
