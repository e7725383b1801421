//! Shared fixtures for the XAML parser tests: a small UI vocabulary
//! registered in a [`MemorySchema`], and helpers that parse documents and
//! dump node streams one node per line.

use xaml_parse::{XamlNode, XamlParseError, XamlReaderSettings};
use xaml_schema::{BracketCharacters, MemorySchema, TypeConverter, XamlMember, XamlType, XamlTypeName, xaml_language};

/// Namespace of the fixture vocabulary.
pub const UI: &str = "urn:xaml-test:ui";

/// Declarations for the fixture vocabulary as the default namespace and the
/// XAML language under `x`.
pub const XMLNS: &str = r#"xmlns="urn:xaml-test:ui" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml""#;

fn ui(name: &str) -> XamlTypeName {
    XamlTypeName::new(UI, name)
}

/// The fixture schema.
///
/// | type | shape |
/// |------|-------|
/// | `Button` | content property `Content`, runtime name `Name`, `Background`, `Click` |
/// | `StackPanel` | read-only `Children` collection as content |
/// | `TextBlock` | string `Text` as content |
/// | `Paragraph` | whitespace-significant `Inlines` as content |
/// | `LineBreak` | trims surrounding whitespace |
/// | `Brush` | text-only: named converter, not constructible |
/// | `Color` | named converter, constructible |
/// | `Gradient` | `Stops` of type `Color[]` |
/// | `Window` | `Content`, read-only `Resources` dictionary |
/// | `Grid` | attachable `Row` and `Column` |
/// | `Binding`, `StaticResourceExtension`, `FooExtension` | markup extensions |
pub fn schema() -> MemorySchema {
    let object = xaml_language::object().clone();
    let string = xaml_language::string().clone();
    let mut schema = MemorySchema::new();

    let brush = XamlType::builder(ui("Brush"))
        .type_converter(TypeConverter::Named("BrushConverter".into()))
        .not_constructible()
        .build();
    let color = XamlType::builder(ui("Color"))
        .type_converter(TypeConverter::Named("ColorConverter".into()))
        .build();
    let colors = XamlType::builder(ui("Color[]")).array(color.clone()).build();

    let element = XamlType::builder(ui("UIElement")).build();
    let element_collection = XamlType::builder(ui("UIElementCollection"))
        .collection(element.clone())
        .build();
    let inline_collection = XamlType::builder(ui("InlineCollection"))
        .collection(object.clone())
        .allowed_content_type(string.name().clone())
        .whitespace_significant_collection()
        .build();
    let resources = XamlType::builder(ui("ResourceDictionary"))
        .dictionary(object.clone())
        .build();

    let button = XamlType::builder(ui("Button"))
        .base_type(&element)
        .content_property("Content")
        .runtime_name_property("Name")
        .build();
    let stack_panel = XamlType::builder(ui("StackPanel"))
        .base_type(&element)
        .content_property("Children")
        .build();
    let text_block = XamlType::builder(ui("TextBlock"))
        .base_type(&element)
        .content_property("Text")
        .build();
    let paragraph = XamlType::builder(ui("Paragraph"))
        .content_property("Inlines")
        .build();
    let line_break = XamlType::builder(ui("LineBreak"))
        .trim_surrounding_whitespace()
        .build();
    let gradient = XamlType::builder(ui("Gradient")).build();
    let window = XamlType::builder(ui("Window"))
        .content_property("Content")
        .build();
    let grid = XamlType::builder(ui("Grid"))
        .base_type(&element)
        .content_property("Children")
        .build();

    let binding = XamlType::builder(ui("Binding"))
        .markup_extension()
        .constructor_parameters(["Path"])
        .bracket_characters("Path", BracketCharacters::new([('[', ']')]))
        .build();
    let static_resource = XamlType::builder(ui("StaticResourceExtension"))
        .markup_extension()
        .constructor_parameters(["ResourceKey"])
        .build();
    let foo = XamlType::builder(ui("FooExtension"))
        .markup_extension()
        .constructor_parameters(["Type"])
        .build();

    for ty in [
        &brush,
        &color,
        &colors,
        &element,
        &element_collection,
        &inline_collection,
        &resources,
        &button,
        &stack_panel,
        &text_block,
        &paragraph,
        &line_break,
        &gradient,
        &window,
        &grid,
        &binding,
        &static_resource,
        &foo,
    ] {
        schema.add_type(ty.clone());
    }

    let members = [
        XamlMember::property("Content", &button, object.clone()),
        XamlMember::property("Name", &button, string.clone()),
        XamlMember::property("Background", &button, brush.clone()),
        XamlMember::event("Click", &button, object.clone()),
        XamlMember::property("Children", &stack_panel, element_collection.clone()).into_read_only(),
        XamlMember::property("Orientation", &stack_panel, string.clone()),
        XamlMember::property("Text", &text_block, string.clone()),
        XamlMember::property("Inlines", &paragraph, inline_collection).into_read_only(),
        XamlMember::property("Stops", &gradient, colors),
        XamlMember::property("Content", &window, object.clone()),
        XamlMember::property("Resources", &window, resources).into_read_only(),
        XamlMember::property("Children", &grid, element_collection).into_read_only(),
        XamlMember::attachable("Row", &grid, string.clone()),
        XamlMember::attachable("Column", &grid, string.clone()),
        XamlMember::property("Path", &binding, string.clone()),
        XamlMember::property("Mode", &binding, string.clone()),
        XamlMember::property("ElementName", &binding, string.clone()),
        XamlMember::property("ResourceKey", &static_resource, object.clone()),
        XamlMember::property("Bar", &foo, string),
    ];
    for member in members {
        schema.add_member(member);
    }
    schema
}

/// Parse `source` against the fixture schema, panicking with a rendered
/// report on error.
pub fn parse_with(source: &str, settings: XamlReaderSettings) -> Vec<XamlNode> {
    let schema = schema();
    match xaml_parse::parse_to_vec(source, &schema, settings) {
        Ok(nodes) => nodes,
        Err(err) => panic!("{}", err.render("test.xaml", source)),
    }
}

/// Parse `source` with default settings.
pub fn parse(source: &str) -> Vec<XamlNode> {
    parse_with(source, XamlReaderSettings::default())
}

/// Parse `source`, expecting an error.
pub fn parse_err(source: &str) -> XamlParseError {
    let schema = schema();
    match xaml_parse::parse_to_vec(source, &schema, XamlReaderSettings::default()) {
        Ok(nodes) => panic!("expected an error, got {} nodes:\n{}", nodes.len(), dump(&nodes)),
        Err(err) => err,
    }
}

/// One node per line, indented by nesting. `LineInfo` nodes are skipped.
pub fn dump(nodes: &[XamlNode]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for node in nodes.iter().filter(|node| !node.is_line_info()) {
        if matches!(node, XamlNode::EndObject | XamlNode::EndMember) {
            depth = depth.saturating_sub(1);
        }
        out.push_str(&"  ".repeat(depth));
        out.push_str(&node.to_string());
        out.push('\n');
        if matches!(
            node,
            XamlNode::StartObject(_) | XamlNode::GetObject | XamlNode::StartMember(_)
        ) {
            depth += 1;
        }
    }
    out
}

/// Flat node labels, `LineInfo` skipped.
pub fn labels(nodes: &[XamlNode]) -> Vec<String> {
    nodes
        .iter()
        .filter(|node| !node.is_line_info())
        .map(ToString::to_string)
        .collect()
}
