//! The resolver interface the parser queries for types and members.

use xaml_tokenizer::XamlTypeName;

use crate::member::XamlMember;
use crate::types::XamlType;
use crate::xaml_language;

/// Resolves names found in markup to type and member descriptors.
///
/// Every method is a pure lookup. `None` means "not known"; the parser then
/// synthesizes an unknown descriptor and keeps going.
pub trait SchemaContext {
    /// Resolve a (possibly generic) type name.
    fn resolve_type(&self, name: &XamlTypeName) -> Option<XamlType>;

    /// Resolve an instance property or event of `owner`, inherited members
    /// included.
    fn resolve_property(&self, owner: &XamlType, name: &str) -> Option<XamlMember>;

    /// Resolve an attachable property owned by `owner`.
    fn resolve_attachable_property(&self, owner: &XamlType, name: &str) -> Option<XamlMember>;

    /// Resolve a directive. Defaults to the XAML and XML language directives.
    fn resolve_directive(&self, namespace: &str, name: &str) -> Option<XamlMember> {
        xaml_language::lookup_directive(namespace, name)
    }

    /// Namespace of a prefix the document itself does not declare.
    ///
    /// Defaults to the always-bound `xml` prefix only.
    fn find_namespace_by_prefix(&self, prefix: &str) -> Option<String> {
        (prefix == "xml").then(|| xaml_language::XML_NAMESPACE.to_string())
    }
}

impl<T: SchemaContext + ?Sized> SchemaContext for &T {
    fn resolve_type(&self, name: &XamlTypeName) -> Option<XamlType> {
        (**self).resolve_type(name)
    }

    fn resolve_property(&self, owner: &XamlType, name: &str) -> Option<XamlMember> {
        (**self).resolve_property(owner, name)
    }

    fn resolve_attachable_property(&self, owner: &XamlType, name: &str) -> Option<XamlMember> {
        (**self).resolve_attachable_property(owner, name)
    }

    fn resolve_directive(&self, namespace: &str, name: &str) -> Option<XamlMember> {
        (**self).resolve_directive(namespace, name)
    }

    fn find_namespace_by_prefix(&self, prefix: &str) -> Option<String> {
        (**self).find_namespace_by_prefix(prefix)
    }
}
