//! The vocabulary of the XAML language namespace (`x:`) and the XML
//! namespace (`xml:`): directives and built-in types.

use std::sync::LazyLock;

use xaml_tokenizer::XamlTypeName;

use crate::member::XamlMember;
use crate::types::{TypeConverter, XamlType};

/// The XAML language namespace, conventionally bound to `x`.
pub const XAML_NAMESPACE: &str = "http://schemas.microsoft.com/winfx/2006/xaml";

/// The XML namespace, always bound to `xml`.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace of `xmlns` attributes themselves.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

struct Language {
    object: XamlType,
    string: XamlType,
    object_list: XamlType,
    array: XamlType,
    xdata: XamlType,
    type_extension: XamlType,
    null_extension: XamlType,
    static_extension: XamlType,

    array_type: XamlMember,
    array_items: XamlMember,
    xdata_text: XamlMember,
    type_extension_type_name: XamlMember,
    static_extension_member: XamlMember,

    // Directives
    arguments: XamlMember,
    factory_method: XamlMember,
    type_arguments: XamlMember,
    name: XamlMember,
    key: XamlMember,
    uid: XamlMember,
    class: XamlMember,
    class_modifier: XamlMember,
    field_modifier: XamlMember,
    shared: XamlMember,
    items: XamlMember,
    initialization: XamlMember,
    positional_parameters: XamlMember,
    unknown_content: XamlMember,
    space: XamlMember,
    lang: XamlMember,
    base: XamlMember,
}

fn xaml_name(local: &str) -> XamlTypeName {
    XamlTypeName::new(XAML_NAMESPACE, local)
}

impl Language {
    fn new() -> Self {
        let object = XamlType::builder(xaml_name("Object"))
            .type_converter(TypeConverter::Object)
            .build();
        let string = XamlType::builder(xaml_name("String"))
            .type_converter(TypeConverter::String)
            .not_constructible()
            .base_type(&object)
            .build();
        let object_list = XamlType::builder(xaml_name("ObjectList"))
            .collection(object.clone())
            .base_type(&object)
            .build();

        let array = XamlType::builder(xaml_name("Array"))
            .markup_extension()
            .content_property("Items")
            .constructor_parameters(["Type"])
            .base_type(&object)
            .build();
        let xdata = XamlType::builder(xaml_name("XData"))
            .content_property("Text")
            .base_type(&object)
            .build();
        let type_extension = XamlType::builder(xaml_name("Type"))
            .markup_extension()
            .constructor_parameters(["TypeName"])
            .base_type(&object)
            .build();
        let null_extension = XamlType::builder(xaml_name("Null"))
            .markup_extension()
            .base_type(&object)
            .build();
        let static_extension = XamlType::builder(xaml_name("Static"))
            .markup_extension()
            .constructor_parameters(["Member"])
            .base_type(&object)
            .build();

        let array_type = XamlMember::property("Type", &array, type_extension.clone());
        let array_items =
            XamlMember::property("Items", &array, object_list.clone()).into_read_only();
        let xdata_text = XamlMember::property("Text", &xdata, string.clone());
        let type_extension_type_name =
            XamlMember::property("TypeName", &type_extension, string.clone());
        let static_extension_member =
            XamlMember::property("Member", &static_extension, string.clone());

        let directive = |name: &str, value_type: &XamlType| {
            XamlMember::directive(name, XAML_NAMESPACE, value_type.clone())
        };
        let xml_directive = |name: &str| XamlMember::directive(name, XML_NAMESPACE, string.clone());

        Self {
            arguments: directive("Arguments", &object_list),
            factory_method: directive("FactoryMethod", &string),
            type_arguments: directive("TypeArguments", &string),
            name: directive("Name", &string),
            key: directive("Key", &object),
            uid: directive("Uid", &string),
            class: directive("Class", &string),
            class_modifier: directive("ClassModifier", &string),
            field_modifier: directive("FieldModifier", &string),
            shared: directive("Shared", &string),
            items: directive("_Items", &object_list),
            initialization: directive("_Initialization", &object),
            positional_parameters: directive("_PositionalParameters", &object_list),
            unknown_content: directive("_UnknownContent", &object),
            space: xml_directive("space"),
            lang: xml_directive("lang"),
            base: xml_directive("base"),

            array_type,
            array_items,
            xdata_text,
            type_extension_type_name,
            static_extension_member,

            object,
            string,
            object_list,
            array,
            xdata,
            type_extension,
            null_extension,
            static_extension,
        }
    }

    fn directives(&self) -> [&XamlMember; 17] {
        [
            &self.arguments,
            &self.factory_method,
            &self.type_arguments,
            &self.name,
            &self.key,
            &self.uid,
            &self.class,
            &self.class_modifier,
            &self.field_modifier,
            &self.shared,
            &self.items,
            &self.initialization,
            &self.positional_parameters,
            &self.unknown_content,
            &self.space,
            &self.lang,
            &self.base,
        ]
    }
}

static LANGUAGE: LazyLock<Language> = LazyLock::new(Language::new);

// =========================================================================
// Built-in types
// =========================================================================

/// `x:Object`, the root of assignability.
pub fn object() -> &'static XamlType {
    &LANGUAGE.object
}

/// `x:String`.
pub fn string() -> &'static XamlType {
    &LANGUAGE.string
}

/// The list type of `_Items`, `_PositionalParameters` and `x:Arguments`.
pub fn object_list() -> &'static XamlType {
    &LANGUAGE.object_list
}

/// `x:Array`, the array markup extension.
pub fn array() -> &'static XamlType {
    &LANGUAGE.array
}

/// `x:XData`, an island of verbatim XML.
pub fn xdata() -> &'static XamlType {
    &LANGUAGE.xdata
}

/// `x:Type`.
pub fn type_extension() -> &'static XamlType {
    &LANGUAGE.type_extension
}

/// `x:Null`.
pub fn null_extension() -> &'static XamlType {
    &LANGUAGE.null_extension
}

/// `x:Static`.
pub fn static_extension() -> &'static XamlType {
    &LANGUAGE.static_extension
}

/// `x:Array.Type`.
pub fn array_type() -> &'static XamlMember {
    &LANGUAGE.array_type
}

/// `x:Array.Items`.
pub fn array_items() -> &'static XamlMember {
    &LANGUAGE.array_items
}

/// `x:XData.Text`.
pub fn xdata_text() -> &'static XamlMember {
    &LANGUAGE.xdata_text
}

// =========================================================================
// Directives
// =========================================================================

pub fn arguments() -> &'static XamlMember {
    &LANGUAGE.arguments
}

pub fn factory_method() -> &'static XamlMember {
    &LANGUAGE.factory_method
}

pub fn type_arguments() -> &'static XamlMember {
    &LANGUAGE.type_arguments
}

pub fn name() -> &'static XamlMember {
    &LANGUAGE.name
}

pub fn key() -> &'static XamlMember {
    &LANGUAGE.key
}

pub fn uid() -> &'static XamlMember {
    &LANGUAGE.uid
}

pub fn class() -> &'static XamlMember {
    &LANGUAGE.class
}

/// The implicit member holding collection items.
pub fn items() -> &'static XamlMember {
    &LANGUAGE.items
}

/// The implicit member holding text that initializes an object.
pub fn initialization() -> &'static XamlMember {
    &LANGUAGE.initialization
}

/// The implicit member holding markup-extension positional arguments.
pub fn positional_parameters() -> &'static XamlMember {
    &LANGUAGE.positional_parameters
}

/// The implicit member for content of a type with no content property.
pub fn unknown_content() -> &'static XamlMember {
    &LANGUAGE.unknown_content
}

/// `xml:space`.
pub fn space() -> &'static XamlMember {
    &LANGUAGE.space
}

/// `xml:lang`.
pub fn lang() -> &'static XamlMember {
    &LANGUAGE.lang
}

/// Whether `member` must be known before the object is created.
pub fn is_constructor_directive(member: &XamlMember) -> bool {
    member == arguments() || member == factory_method() || member == type_arguments()
}

/// Look up a directive of the XAML or XML namespace.
pub fn lookup_directive(namespace: &str, name: &str) -> Option<XamlMember> {
    if namespace != XAML_NAMESPACE && namespace != XML_NAMESPACE {
        return None;
    }
    LANGUAGE
        .directives()
        .into_iter()
        .find(|d| d.namespace() == namespace && d.name() == name)
        .cloned()
}

/// Look up a built-in type of the XAML namespace. Markup extensions also
/// answer to their `…Extension` names.
pub fn lookup_type(name: &XamlTypeName) -> Option<XamlType> {
    if name.namespace != XAML_NAMESPACE || name.has_type_arguments() {
        return None;
    }
    let local = match name.name.as_str() {
        "ArrayExtension" => "Array",
        "TypeExtension" => "Type",
        "NullExtension" => "Null",
        "StaticExtension" => "Static",
        other => other,
    };
    let language = &*LANGUAGE;
    [
        &language.object,
        &language.string,
        &language.array,
        &language.xdata,
        &language.type_extension,
        &language.null_extension,
        &language.static_extension,
    ]
    .into_iter()
    .find(|ty| ty.local_name() == local)
    .cloned()
}

/// Look up a property of a built-in type.
pub fn lookup_property(owner: &XamlType, name: &str) -> Option<XamlMember> {
    let language = &*LANGUAGE;
    [
        &language.array_type,
        &language.array_items,
        &language.xdata_text,
        &language.type_extension_type_name,
        &language.static_extension_member,
    ]
    .into_iter()
    .find(|m| m.declaring_type() == Some(owner.name()) && m.name() == name)
    .cloned()
}
