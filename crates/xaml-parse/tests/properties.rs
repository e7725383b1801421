//! Property tests over generated documents.

use proptest::prelude::*;
use xaml_parse::XamlNode;
use xaml_testhelpers::{XMLNS, labels, parse};

/// Text content built from letters and XAML whitespace.
fn text() -> impl Strategy<Value = String> {
    "[a-c \t\n]{0,24}"
}

/// A child element of a `StackPanel`.
fn child() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("<Button/>".to_string()),
        text().prop_map(|text| format!("<TextBlock>{text}</TextBlock>")),
        text().prop_map(|text| format!("<Button Content=\"{}\"/>", text.trim())),
        Just("<Button Content=\"{Binding Path=a, Mode=b}\"/>".to_string()),
    ]
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec((text(), child()), 0..6).prop_map(|children| {
        let body: String = children
            .into_iter()
            .map(|(space, child)| {
                let space: String = space.chars().filter(|c| c.is_whitespace()).collect();
                format!("{space}{child}")
            })
            .collect();
        format!("<StackPanel {XMLNS}>{body}</StackPanel>")
    })
}

proptest! {
    #[test]
    fn parsing_is_deterministic(source in document()) {
        prop_assert_eq!(parse(&source), parse(&source));
    }

    #[test]
    fn collapsed_text_has_no_runs_of_whitespace(content in text()) {
        let nodes = parse(&format!("<TextBlock {XMLNS}>{content}</TextBlock>"));
        for node in &nodes {
            if let XamlNode::Value(value) = node {
                prop_assert!(!value.is_empty());
                prop_assert!(!value.contains("  "), "{:?}", value);
                prop_assert!(!value.starts_with(' ') && !value.ends_with(' '), "{:?}", value);
                prop_assert!(!value.contains(['\t', '\n']), "{:?}", value);
            }
        }
    }

    #[test]
    fn streams_are_balanced(source in document()) {
        #[derive(Debug, PartialEq)]
        enum Open {
            Object,
            Member,
        }

        let nodes = parse(&source);
        let mut open = Vec::new();
        for node in &nodes {
            match node {
                XamlNode::StartObject(_) | XamlNode::GetObject => open.push(Open::Object),
                XamlNode::StartMember(_) => open.push(Open::Member),
                XamlNode::EndObject => {
                    prop_assert_eq!(open.pop(), Some(Open::Object), "{:?}", labels(&nodes));
                }
                XamlNode::EndMember => {
                    prop_assert_eq!(open.pop(), Some(Open::Member), "{:?}", labels(&nodes));
                }
                _ => {}
            }
        }
        prop_assert!(open.is_empty(), "{:?}", labels(&nodes));
    }
}
