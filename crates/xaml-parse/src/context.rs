//! Parse-time state shared by the pull parser and the markup-extension
//! parser: the object scope stack and the namespace prefixes in effect.

use tracing::trace;
use xaml_schema::{SchemaContext, XamlMember, XamlType, XamlTypeName, xaml_language};
use xaml_tokenizer::BracketMode;

/// One open object: an element, a markup extension, an implicit array or a
/// get-object frame.
#[derive(Debug, Clone)]
pub struct Scope {
    pub ty: XamlType,
    /// The member currently open on this object.
    pub member: Option<XamlMember>,
    /// Whether the open member has already been checked for collection
    /// wrapping.
    pub member_checked: bool,
    /// Type of the last child object completed under the open member.
    pub previous_child_type: Option<XamlType>,
    /// Set once a member that requires constructing the object was seen.
    pub forced_to_use_constructor: bool,
    /// A `GetObject` frame filling the collection held by the parent member.
    pub in_collection_from_member: bool,
    /// An `x:Array` frame synthesized around the values of an array member.
    pub in_implicit_array: bool,
    /// Escape-bracket state, for markup-extension scopes.
    pub bracket_mode: Option<BracketMode>,
    namespaces: Vec<(String, String)>,
}

impl Scope {
    fn new(ty: XamlType, namespaces: Vec<(String, String)>) -> Self {
        Self {
            ty,
            member: None,
            member_checked: false,
            previous_child_type: None,
            forced_to_use_constructor: false,
            in_collection_from_member: false,
            in_implicit_array: false,
            bracket_mode: None,
            namespaces,
        }
    }

    /// Whether this scope was synthesized around a member's values rather
    /// than written in the document.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.in_collection_from_member || self.in_implicit_array
    }

    /// Open `member`, forgetting the previous member's children.
    pub fn open_member(&mut self, member: XamlMember) {
        self.member = Some(member);
        self.member_checked = false;
        self.previous_child_type = None;
    }

    /// Close the open member.
    pub fn close_member(&mut self) {
        self.member = None;
        self.member_checked = false;
        self.previous_child_type = None;
    }
}

/// The scope stack of one parse plus the schema it resolves against.
pub struct ParserContext<'s> {
    schema: &'s dyn SchemaContext,
    scopes: Vec<Scope>,
    /// Prefixes declared for the object about to be pushed.
    prescope_namespaces: Vec<(String, String)>,
}

impl<'s> ParserContext<'s> {
    pub fn new(schema: &'s dyn SchemaContext) -> Self {
        Self {
            schema,
            scopes: Vec::new(),
            prescope_namespaces: Vec::new(),
        }
    }

    #[inline]
    pub fn schema(&self) -> &'s dyn SchemaContext {
        self.schema
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    /// Open an object scope. Prefixes declared since the last push belong to
    /// it.
    pub fn push_scope(&mut self, ty: XamlType) -> &mut Scope {
        trace!(%ty, depth = self.scopes.len() + 1, "push scope");
        let namespaces = std::mem::take(&mut self.prescope_namespaces);
        self.scopes.push(Scope::new(ty, namespaces));
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn pop_scope(&mut self) -> Option<Scope> {
        let scope = self.scopes.pop();
        if let Some(scope) = &scope {
            trace!(ty = %scope.ty, depth = self.scopes.len(), "pop scope");
        }
        scope
    }

    #[inline]
    pub fn current(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    #[inline]
    pub fn current_mut(&mut self) -> Option<&mut Scope> {
        self.scopes.last_mut()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Declare a prefix for the next object scope.
    pub fn add_namespace_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prescope_namespaces
            .push((prefix.into(), namespace.into()));
    }

    /// Namespace bound to `prefix`: pending declarations first, then the
    /// open scopes innermost first, then the schema.
    pub fn find_namespace_by_prefix(&self, prefix: &str) -> Option<String> {
        self.declarations()
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.clone())
            .or_else(|| self.schema.find_namespace_by_prefix(prefix))
    }

    /// A prefix currently bound to `namespace` and not shadowed by an inner
    /// declaration.
    pub fn find_prefix_for_namespace(&self, namespace: &str) -> Option<String> {
        self.declarations()
            .filter(|(_, ns)| ns == namespace)
            .map(|(prefix, _)| prefix)
            .find(|prefix| self.find_namespace_by_prefix(prefix).as_deref() == Some(namespace))
            .cloned()
    }

    /// Declarations from innermost to outermost.
    fn declarations(&self) -> impl Iterator<Item = &(String, String)> {
        self.prescope_namespaces.iter().rev().chain(
            self.scopes
                .iter()
                .rev()
                .flat_map(|scope| scope.namespaces.iter().rev()),
        )
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a type through the schema, then the built-in language types.
    pub fn resolve_type(&self, name: &XamlTypeName) -> Option<XamlType> {
        self.schema
            .resolve_type(name)
            .or_else(|| xaml_language::lookup_type(name))
    }

    pub fn resolve_type_or_unknown(&self, name: &XamlTypeName) -> XamlType {
        self.resolve_type(name)
            .unwrap_or_else(|| XamlType::unknown(name.clone()))
    }

    /// Resolve a markup-extension type, preferring `NameExtension` over
    /// `Name`.
    pub fn resolve_markup_extension_type(&self, name: &XamlTypeName) -> XamlType {
        let extension = XamlTypeName::with_arguments(
            name.namespace.clone(),
            format!("{}Extension", name.name),
            name.type_arguments.clone(),
        );
        self.resolve_type(&extension)
            .or_else(|| self.resolve_type(name))
            .unwrap_or_else(|| XamlType::unknown(name.clone()))
    }

    pub fn resolve_property(&self, owner: &XamlType, name: &str) -> Option<XamlMember> {
        self.schema
            .resolve_property(owner, name)
            .or_else(|| xaml_language::lookup_property(owner, name))
    }

    pub fn resolve_attachable_property(&self, owner: &XamlType, name: &str) -> Option<XamlMember> {
        self.schema.resolve_attachable_property(owner, name)
    }

    pub fn resolve_directive(&self, namespace: &str, name: &str) -> Option<XamlMember> {
        self.schema.resolve_directive(namespace, name)
    }

    /// The content property of `ty` as a member, unknown if the schema does
    /// not define it.
    pub fn content_property(&self, ty: &XamlType) -> Option<XamlMember> {
        let name = ty.content_property()?;
        Some(
            self.resolve_property(ty, name)
                .unwrap_or_else(|| XamlMember::unknown(name, ty, false)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;
    use xaml_schema::MemorySchema;

    const NS: &str = "urn:ui";

    #[test]
    fn test_prefixes_attach_to_next_scope() {
        let schema = MemorySchema::new();
        let mut ctx = ParserContext::new(&schema);
        ctx.add_namespace_prefix("ui", NS);
        assert_eq!(ctx.find_namespace_by_prefix("ui").as_deref(), Some(NS));

        ctx.push_scope(xaml_language::object().clone());
        ctx.add_namespace_prefix("ui", "urn:inner");
        ctx.push_scope(xaml_language::object().clone());
        assert_eq!(ctx.find_namespace_by_prefix("ui").as_deref(), Some("urn:inner"));

        ctx.pop_scope();
        assert_eq!(ctx.find_namespace_by_prefix("ui").as_deref(), Some(NS));
        assert_eq!(
            ctx.find_namespace_by_prefix("xml").as_deref(),
            Some(xaml_language::XML_NAMESPACE)
        );
        assert_eq!(ctx.find_namespace_by_prefix("nope"), None);
    }

    #[test]
    fn test_shadowed_prefix_is_not_reused() {
        let schema = MemorySchema::new();
        let mut ctx = ParserContext::new(&schema);
        ctx.add_namespace_prefix("a", NS);
        ctx.push_scope(xaml_language::object().clone());
        assert_eq!(ctx.find_prefix_for_namespace(NS).as_deref(), Some("a"));

        ctx.add_namespace_prefix("a", "urn:other");
        ctx.push_scope(xaml_language::object().clone());
        assert_eq!(ctx.find_prefix_for_namespace(NS), None);
        assert_eq!(ctx.find_prefix_for_namespace("urn:other").as_deref(), Some("a"));
    }

    #[test]
    fn test_markup_extension_lookup_prefers_extension_suffix() {
        let mut schema = MemorySchema::new();
        schema
            .add_type(XamlType::builder(XamlTypeName::new(NS, "Foo")).build())
            .add_type(
                XamlType::builder(XamlTypeName::new(NS, "FooExtension"))
                    .markup_extension()
                    .build(),
            );
        let ctx = ParserContext::new(&schema);
        let ty = ctx.resolve_markup_extension_type(&XamlTypeName::new(NS, "Foo"));
        assert_eq!(ty.local_name(), "FooExtension");

        let null = ctx.resolve_markup_extension_type(&XamlTypeName::new(
            xaml_language::XAML_NAMESPACE,
            "Null",
        ));
        assert_eq!(&null, xaml_language::null_extension());

        let missing = ctx.resolve_markup_extension_type(&XamlTypeName::new(NS, "Bar"));
        assert!(missing.is_unknown());
        assert_eq!(missing.local_name(), "Bar");
    }

    #[test]
    fn test_scope_member_tracking() {
        let schema = MemorySchema::new();
        let mut ctx = ParserContext::new(&schema);
        let scope = ctx.push_scope(xaml_language::array().clone());
        scope.open_member(xaml_language::array_items().clone());
        scope.previous_child_type = Some(xaml_language::string().clone());
        scope.close_member();
        assert!(scope.member.is_none());
        assert!(scope.previous_child_type.is_none());
        assert_eq!(ctx.depth(), 1);
    }
}
