//! The XAML node stream.

use std::fmt;

use xaml_schema::{XamlMember, XamlType, xaml_language};
use xaml_tokenizer::Position;

/// One event of the XAML node stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XamlNode {
    /// Begin an object of the given type.
    StartObject(XamlType),
    /// Begin the object already held by the enclosing member.
    GetObject,
    /// End the innermost object.
    EndObject,
    /// Begin a member of the innermost object.
    StartMember(XamlMember),
    /// End the innermost member.
    EndMember,
    /// A text value.
    Value(String),
    /// A prefix binding that applies to the next object.
    NamespaceDeclaration { prefix: String, namespace: String },
    /// Source position of the nodes that follow.
    LineInfo(Position),
    /// Separates an element's attribute members from its content.
    EndOfAttributes,
}

impl XamlNode {
    #[inline]
    pub fn is_line_info(&self) -> bool {
        matches!(self, XamlNode::LineInfo(_))
    }
}

/// Short member label: `Owner.Name`, `x:Name` or `xml:space`.
pub(crate) struct MemberLabel<'a>(pub &'a XamlMember);

impl fmt::Display for MemberLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let member = self.0;
        if let Some(owner) = member.declaring_type() {
            return write!(f, "{}.{}", owner.name, member.name());
        }
        match member.namespace() {
            xaml_language::XAML_NAMESPACE => write!(f, "x:{}", member.name()),
            xaml_language::XML_NAMESPACE => write!(f, "xml:{}", member.name()),
            namespace => write!(f, "{{{namespace}}}{}", member.name()),
        }
    }
}

impl fmt::Display for XamlNode {
    /// A compact, single-line rendering using local names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XamlNode::StartObject(ty) => {
                if ty.namespace() == xaml_language::XAML_NAMESPACE {
                    write!(f, "StartObject(x:{})", ty.local_name())
                } else {
                    write!(f, "StartObject({})", ty.local_name())
                }
            }
            XamlNode::GetObject => f.write_str("GetObject"),
            XamlNode::EndObject => f.write_str("EndObject"),
            XamlNode::StartMember(member) => write!(f, "StartMember({})", MemberLabel(member)),
            XamlNode::EndMember => f.write_str("EndMember"),
            XamlNode::Value(text) => write!(f, "Value({text:?})"),
            XamlNode::NamespaceDeclaration { prefix, namespace } => {
                write!(f, "NamespaceDeclaration({prefix:?}, {namespace:?})")
            }
            XamlNode::LineInfo(position) => {
                write!(f, "LineInfo({}, {})", position.line, position.column)
            }
            XamlNode::EndOfAttributes => f.write_str("EndOfAttributes"),
        }
    }
}
