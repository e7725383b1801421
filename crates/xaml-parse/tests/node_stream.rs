//! Node streams for whole documents against the fixture schema.

use xaml_parse::{XamlNode, XamlReaderSettings};
use xaml_testhelpers::{XMLNS, dump, labels, parse, parse_with};

/// Every start has one matching end, in nesting order.
fn assert_balanced(nodes: &[XamlNode]) {
    #[derive(Debug, PartialEq)]
    enum Open {
        Object,
        Member,
    }
    let mut stack = Vec::new();
    for node in nodes {
        match node {
            XamlNode::StartObject(_) | XamlNode::GetObject => stack.push(Open::Object),
            XamlNode::StartMember(_) => stack.push(Open::Member),
            XamlNode::EndObject => assert_eq!(stack.pop(), Some(Open::Object), "{}", dump(nodes)),
            XamlNode::EndMember => assert_eq!(stack.pop(), Some(Open::Member), "{}", dump(nodes)),
            _ => {}
        }
    }
    assert!(stack.is_empty(), "{}", dump(nodes));
}

#[test]
fn test_attributes_are_reordered() {
    let nodes = parse(&format!(
        r#"<Button {XMLNS} Content="hi" x:Name="b" x:Arguments="a"/>"#
    ));
    insta::assert_snapshot!(dump(&nodes), @r#"
    NamespaceDeclaration("", "urn:xaml-test:ui")
    NamespaceDeclaration("x", "http://schemas.microsoft.com/winfx/2006/xaml")
    StartObject(Button)
      StartMember(x:Arguments)
        Value("a")
      EndMember
      StartMember(x:Name)
        Value("b")
      EndMember
      StartMember(Button.Content)
        Value("hi")
      EndMember
      EndOfAttributes
    EndObject
    "#);
}

#[test]
fn test_text_is_collapsed_into_content_property() {
    let nodes = parse(&format!("<TextBlock {XMLNS}>a   b\n\tc</TextBlock>"));
    assert_eq!(
        labels(&nodes)[2..],
        [
            "StartObject(TextBlock)",
            "EndOfAttributes",
            "StartMember(TextBlock.Text)",
            "Value(\"a b c\")",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_whitespace_between_siblings_is_dropped() {
    let nodes = parse(&format!(
        "<StackPanel {XMLNS}>\n  <Button/>\n  <Button/>\n</StackPanel>"
    ));
    assert_balanced(&nodes);
    insta::assert_snapshot!(dump(&nodes), @r#"
    NamespaceDeclaration("", "urn:xaml-test:ui")
    NamespaceDeclaration("x", "http://schemas.microsoft.com/winfx/2006/xaml")
    StartObject(StackPanel)
      EndOfAttributes
      StartMember(StackPanel.Children)
        GetObject
          StartMember(x:_Items)
            StartObject(Button)
              EndOfAttributes
            EndObject
            StartObject(Button)
              EndOfAttributes
            EndObject
          EndMember
        EndObject
      EndMember
    EndObject
    "#);
}

#[test]
fn test_markup_extension_attribute() {
    let nodes = parse(&format!(
        r#"<Button {XMLNS} Content="{{Foo Type, Bar=Baz}}"/>"#
    ));
    insta::assert_snapshot!(dump(&nodes), @r#"
    NamespaceDeclaration("", "urn:xaml-test:ui")
    NamespaceDeclaration("x", "http://schemas.microsoft.com/winfx/2006/xaml")
    StartObject(Button)
      StartMember(Button.Content)
        StartObject(FooExtension)
          StartMember(x:_PositionalParameters)
            Value("Type")
          EndMember
          StartMember(FooExtension.Bar)
            Value("Baz")
          EndMember
        EndObject
      EndMember
      EndOfAttributes
    EndObject
    "#);
}

#[test]
fn test_nested_markup_extension_stays_inside_its_member() {
    let nodes = parse(&format!(
        r#"<Button {XMLNS} Content="{{Binding Path={{StaticResource Foo}}}}"/>"#
    ));
    assert_balanced(&nodes);
    let labels = labels(&nodes);
    let path = labels
        .iter()
        .position(|label| label == "StartMember(Binding.Path)")
        .unwrap();
    assert_eq!(
        labels[path..path + 8],
        [
            "StartMember(Binding.Path)",
            "StartObject(StaticResourceExtension)",
            "StartMember(x:_PositionalParameters)",
            "Value(\"Foo\")",
            "EndMember",
            "EndObject",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_escaped_braces_are_literal() {
    let nodes = parse(&format!(r#"<Button {XMLNS} Content="{{}}{{literal}}"/>"#));
    assert!(labels(&nodes).contains(&"Value(\"{literal}\")".to_string()));
}

#[test]
fn test_array_property_gets_implicit_array() {
    let nodes = parse(&format!(
        "<Gradient {XMLNS}><Gradient.Stops><Color/><Color/></Gradient.Stops></Gradient>"
    ));
    assert_balanced(&nodes);
    insta::assert_snapshot!(dump(&nodes), @r#"
    NamespaceDeclaration("", "urn:xaml-test:ui")
    NamespaceDeclaration("x", "http://schemas.microsoft.com/winfx/2006/xaml")
    StartObject(Gradient)
      EndOfAttributes
      StartMember(Gradient.Stops)
        StartObject(x:Array)
          StartMember(Array.Type)
            Value("Color")
          EndMember
          EndOfAttributes
          StartMember(Array.Items)
            StartObject(Color)
              EndOfAttributes
            EndObject
            StartObject(Color)
              EndOfAttributes
            EndObject
          EndMember
        EndObject
      EndMember
    EndObject
    "#);
}

#[test]
fn test_implicit_array_uses_prefix_in_scope() {
    let nodes = parse(
        r#"<ui:Gradient xmlns:ui="urn:xaml-test:ui"><ui:Gradient.Stops><ui:Color/></ui:Gradient.Stops></ui:Gradient>"#,
    );
    assert!(labels(&nodes).contains(&"Value(\"ui:Color\")".to_string()));
}

#[test]
fn test_keyed_dictionary_entry() {
    let nodes = parse(&format!(
        r#"<Window {XMLNS}><Window.Resources><Color x:Key="red"/></Window.Resources></Window>"#
    ));
    assert_eq!(
        labels(&nodes)[2..],
        [
            "StartObject(Window)",
            "EndOfAttributes",
            "StartMember(Window.Resources)",
            "GetObject",
            "StartMember(x:_Items)",
            "StartObject(Color)",
            "StartMember(x:Key)",
            "Value(\"red\")",
            "EndMember",
            "EndOfAttributes",
            "EndObject",
            "EndMember",
            "EndObject",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_xdata_is_passed_through() {
    let nodes = parse(&format!(
        r#"<Window {XMLNS}><x:XData><data a="1"/></x:XData></Window>"#
    ));
    assert_eq!(
        labels(&nodes)[2..],
        [
            "StartObject(Window)",
            "EndOfAttributes",
            "StartMember(Window.Content)",
            "StartObject(x:XData)",
            "EndOfAttributes",
            "StartMember(XData.Text)",
            "Value(\"<data a=\\\"1\\\"/>\")",
            "EndMember",
            "EndObject",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_text_only_type_gets_empty_initialization() {
    let nodes = parse(&format!(
        "<Button {XMLNS}><Button.Background><Brush/></Button.Background></Button>"
    ));
    assert_eq!(
        labels(&nodes)[5..11],
        [
            "StartObject(Brush)",
            "EndOfAttributes",
            "StartMember(x:_Initialization)",
            "Value(\"\")",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_text_initialization() {
    let nodes = parse(&format!(
        "<Button {XMLNS}><Button.Background><Brush> Red </Brush></Button.Background></Button>"
    ));
    assert_eq!(
        labels(&nodes)[5..11],
        [
            "StartObject(Brush)",
            "EndOfAttributes",
            "StartMember(x:_Initialization)",
            "Value(\"Red\")",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_attachable_member_does_not_force_constructor() {
    let nodes = parse(&format!(r#"<Grid {XMLNS}><Button Grid.Row="1"/></Grid>"#));
    let labels = labels(&nodes);
    assert!(labels.contains(&"StartMember(Grid.Row)".to_string()));
    assert_balanced(&nodes);
}

#[test]
fn test_surrounding_whitespace_is_trimmed() {
    let nodes = parse(&format!(
        "<Paragraph {XMLNS}>Hello <LineBreak/> world</Paragraph>"
    ));
    assert_eq!(
        labels(&nodes)[2..],
        [
            "StartObject(Paragraph)",
            "EndOfAttributes",
            "StartMember(Paragraph.Inlines)",
            "GetObject",
            "StartMember(x:_Items)",
            "Value(\"Hello\")",
            "StartObject(LineBreak)",
            "EndOfAttributes",
            "EndObject",
            "Value(\"world\")",
            "EndMember",
            "EndObject",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_whitespace_significant_collection_keeps_separator() {
    let nodes = parse(&format!(
        "<Paragraph {XMLNS}><Button/> <Button/></Paragraph>"
    ));
    assert_eq!(
        labels(&nodes)[7..12],
        [
            "StartObject(Button)",
            "EndOfAttributes",
            "EndObject",
            "Value(\" \")",
            "StartObject(Button)",
        ]
    );
}

#[test]
fn test_prefixes_in_content_follow_the_preamble() {
    let nodes = parse(r#"<StackPanel xmlns="urn:xaml-test:ui"><Button xmlns:p="urn:p"/></StackPanel>"#);
    assert_eq!(
        labels(&nodes),
        [
            "NamespaceDeclaration(\"\", \"urn:xaml-test:ui\")",
            "StartObject(StackPanel)",
            "EndOfAttributes",
            "StartMember(StackPanel.Children)",
            "GetObject",
            "StartMember(x:_Items)",
            "NamespaceDeclaration(\"p\", \"urn:p\")",
            "StartObject(Button)",
            "EndOfAttributes",
            "EndObject",
            "EndMember",
            "EndObject",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_line_info() {
    let nodes = parse_with(
        "<Button xmlns=\"urn:xaml-test:ui\"\n        Content=\"hi\"/>",
        XamlReaderSettings::new().provide_line_info(true),
    );
    let rendered: Vec<String> = nodes.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        [
            "LineInfo(1, 9)",
            "NamespaceDeclaration(\"\", \"urn:xaml-test:ui\")",
            "LineInfo(1, 1)",
            "StartObject(Button)",
            "LineInfo(2, 9)",
            "StartMember(Button.Content)",
            "Value(\"hi\")",
            "EndMember",
            "EndOfAttributes",
            "EndObject",
        ]
    );
}

#[test]
fn test_end_of_attributes_once_per_element() {
    let nodes = parse(&format!(
        r#"<StackPanel {XMLNS} Orientation="Vertical">
  <Button x:Name="a" Content="one"/>
  <Button><Button.Background><Brush>Red</Brush></Button.Background>two</Button>
  <TextBlock>three</TextBlock>
</StackPanel>"#
    ));
    assert_balanced(&nodes);
    let objects = nodes
        .iter()
        .filter(|node| matches!(node, XamlNode::StartObject(_)))
        .count();
    let separators = nodes
        .iter()
        .filter(|node| matches!(node, XamlNode::EndOfAttributes))
        .count();
    assert_eq!(objects, 5);
    assert_eq!(separators, objects);
}

#[test]
fn test_space_preserve_keeps_text() {
    let nodes = parse(&format!(
        r#"<TextBlock {XMLNS} xml:space="preserve">  a  b </TextBlock>"#
    ));
    assert!(labels(&nodes).contains(&"Value(\"  a  b \")".to_string()));
}

/// Whether `first` is directly followed by `second`.
fn adjacent(labels: &[String], first: &str, second: &str) -> bool {
    labels.windows(2).any(|pair| pair[0] == first && pair[1] == second)
}

#[test]
fn test_uid_on_property_element_is_ignored() {
    let nodes = parse_with(
        &format!(r#"<Button {XMLNS}><Button.Content x:Uid="u">hi</Button.Content></Button>"#),
        XamlReaderSettings::new().ignore_uids_on_property_elements(true),
    );
    assert_eq!(
        labels(&nodes)[2..],
        [
            "StartObject(Button)",
            "EndOfAttributes",
            "StartMember(Button.Content)",
            "Value(\"hi\")",
            "EndMember",
            "EndObject",
        ]
    );
}

#[test]
fn test_space_preserve_setting_keeps_text() {
    let source = format!("<TextBlock {XMLNS}>  a   b  </TextBlock>");
    let preserved = labels(&parse_with(
        &source,
        XamlReaderSettings::new().xml_space_preserve(true),
    ));
    assert!(preserved.contains(&"Value(\"  a   b  \")".to_string()), "{preserved:?}");

    let collapsed = labels(&parse(&source));
    assert!(collapsed.contains(&"Value(\"a b\")".to_string()), "{collapsed:?}");
}

#[test]
fn test_preserved_whitespace_before_end_tag() {
    let text_block = labels(&parse(&format!(
        r#"<TextBlock {XMLNS} xml:space="preserve">   </TextBlock>"#
    )));
    assert!(
        adjacent(&text_block, "StartMember(TextBlock.Text)", "Value(\"   \")"),
        "{text_block:?}"
    );

    let content = labels(&parse(&format!(
        r#"<Button {XMLNS} xml:space="preserve"><Button.Content>   </Button.Content></Button>"#
    )));
    assert!(
        adjacent(&content, "StartMember(Button.Content)", "Value(\"   \")"),
        "{content:?}"
    );

    let brush = labels(&parse(&format!(
        r#"<Button {XMLNS}><Button.Background><Brush xml:space="preserve">  </Brush></Button.Background></Button>"#
    )));
    assert!(
        adjacent(&brush, "StartMember(x:_Initialization)", "Value(\"  \")"),
        "{brush:?}"
    );
}

#[test]
fn test_line_info_precedes_the_node_it_describes() {
    let source = "<StackPanel xmlns=\"urn:xaml-test:ui\">\n  <Button/>\n  <TextBlock>hi</TextBlock>\n</StackPanel>";
    let nodes = parse_with(source, XamlReaderSettings::new().provide_line_info(true));
    let rendered: Vec<String> = nodes.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        [
            "LineInfo(1, 13)",
            "NamespaceDeclaration(\"\", \"urn:xaml-test:ui\")",
            "LineInfo(1, 1)",
            "StartObject(StackPanel)",
            "EndOfAttributes",
            "StartMember(StackPanel.Children)",
            "GetObject",
            "StartMember(x:_Items)",
            "LineInfo(2, 3)",
            "StartObject(Button)",
            "EndOfAttributes",
            "EndObject",
            "LineInfo(3, 3)",
            "StartObject(TextBlock)",
            "EndOfAttributes",
            "StartMember(TextBlock.Text)",
            "LineInfo(3, 14)",
            "Value(\"hi\")",
            "LineInfo(3, 16)",
            "EndMember",
            "EndObject",
            "LineInfo(4, 1)",
            "EndMember",
            "EndObject",
            "EndMember",
            "EndObject",
        ]
    );
    for pair in nodes.windows(2) {
        assert!(!(pair[0].is_line_info() && pair[1].is_line_info()), "{rendered:?}");
    }
}

#[test]
fn test_explicit_array_replaces_array_member() {
    let stops = labels(&parse(&format!(
        r#"<Gradient {XMLNS}><Gradient.Stops><x:Array Type="Color"/></Gradient.Stops></Gradient>"#
    )));
    assert!(
        adjacent(&stops, "StartMember(Gradient.Stops)", "StartObject(x:Array)"),
        "{stops:?}"
    );
    assert!(!stops.contains(&"GetObject".to_string()), "{stops:?}");

    let children = labels(&parse(&format!(
        r#"<StackPanel {XMLNS}><StackPanel.Children><x:Array Type="Button"/></StackPanel.Children></StackPanel>"#
    )));
    assert!(
        adjacent(&children, "StartMember(StackPanel.Children)", "GetObject"),
        "{children:?}"
    );
}
