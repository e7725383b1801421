//! A resolver over types and members registered in memory.

use std::collections::HashMap;

use tracing::trace;
use xaml_tokenizer::XamlTypeName;

use crate::context::SchemaContext;
use crate::member::{MemberKind, XamlMember};
use crate::types::XamlType;
use crate::xaml_language;

/// An in-memory [`SchemaContext`].
///
/// Instance members are looked up on the owner first, then on its base types
/// in the order they were recorded. Generic types resolve by exact name
/// first, then by their open definition (same namespace and local name,
/// registered without type arguments).
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    types: HashMap<XamlTypeName, XamlType>,
    /// Instance properties and events, by declaring type and name.
    members: HashMap<(XamlTypeName, String), XamlMember>,
    /// Attachable properties, by owner type and name.
    attachable: HashMap<(XamlTypeName, String), XamlMember>,
    prefixes: HashMap<String, String>,
}

impl MemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, replacing any type of the same name.
    pub fn add_type(&mut self, ty: XamlType) -> &mut Self {
        self.types.insert(ty.name().clone(), ty);
        self
    }

    /// Register a property, event or attachable property under its declaring
    /// type. Directives are rejected with `false`.
    pub fn add_member(&mut self, member: XamlMember) -> bool {
        let Some(owner) = member.declaring_type().cloned() else {
            return false;
        };
        let key = (owner, member.name().to_string());
        match member.kind() {
            MemberKind::Attachable => {
                self.attachable.insert(key, member);
            }
            MemberKind::Property | MemberKind::Event => {
                self.members.insert(key, member);
            }
            MemberKind::Directive => return false,
        }
        true
    }

    /// Bind a prefix that documents may use without declaring it.
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> &mut Self {
        self.prefixes.insert(prefix.into(), namespace.into());
        self
    }

    /// All registered types.
    pub fn types(&self) -> impl Iterator<Item = &XamlType> {
        self.types.values()
    }
}

impl SchemaContext for MemorySchema {
    fn resolve_type(&self, name: &XamlTypeName) -> Option<XamlType> {
        let found = self.types.get(name).cloned().or_else(|| {
            if !name.has_type_arguments() {
                return None;
            }
            let open = XamlTypeName::new(name.namespace.clone(), name.name.clone());
            self.types.get(&open).cloned()
        });
        trace!(%name, found = found.is_some(), "resolve type");
        found
    }

    fn resolve_property(&self, owner: &XamlType, name: &str) -> Option<XamlMember> {
        std::iter::once(owner.name())
            .chain(owner.base_types())
            .find_map(|ty| self.members.get(&(ty.clone(), name.to_string())))
            .cloned()
            .or_else(|| xaml_language::lookup_property(owner, name))
    }

    fn resolve_attachable_property(&self, owner: &XamlType, name: &str) -> Option<XamlMember> {
        self.attachable
            .get(&(owner.name().clone(), name.to_string()))
            .cloned()
    }

    fn find_namespace_by_prefix(&self, prefix: &str) -> Option<String> {
        match self.prefixes.get(prefix) {
            Some(namespace) => Some(namespace.clone()),
            None => (prefix == "xml").then(|| xaml_language::XML_NAMESPACE.to_string()),
        }
    }
}
