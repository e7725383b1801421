//! The grammar driver: scanner nodes in, XAML nodes out.
//!
//! ```text
//! Document        ::= PREFIXDEFINITION* Element NONE
//! Element         ::= PREFIXDEFINITION* (EmptyElement | StartElement ElementBody)
//! EmptyElement    ::= EMPTYELEMENT (DIRECTIVE | ATTRIBUTE)*
//! StartElement    ::= ELEMENT DIRECTIVE*
//! ElementBody     ::= ATTRIBUTE* (PropertyElement | Content)* ENDTAG
//! PropertyElement ::= EMPTYPROPERTYELEMENT | PROPERTYELEMENT PropertyContent* ENDTAG
//! Content         ::= (PREFIXDEFINITION* Element) | TEXT
//! ```
//!
//! Productions live on an explicit stack. Each pull reads one scanner node
//! and hands it to the innermost production; a production that ends on a
//! node it does not own passes the node on to its parent.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use tracing::{debug, trace};
use xaml_schema::{SchemaContext, XamlMember, XamlType, xaml_language};
use xaml_tokenizer::Position;
use xaml_tokenizer::text::{trim_leading_whitespace, trim_trailing_whitespace};

use crate::context::ParserContext;
use crate::error::{XamlParseError, XamlParseErrorKind};
use crate::markup::MePullParser;
use crate::node::XamlNode;
use crate::prefix::NamespacePrefixLookup;
use crate::scanner::{ScannerNode, ScannerNodeKind, XamlScanner};
use crate::settings::XamlReaderSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Production {
    Document {
        root_seen: bool,
    },
    /// An object element. `body` is set once its attributes are done.
    Element {
        empty: bool,
        body: bool,
        has_content: bool,
    },
    /// A non-empty property element.
    PropertyElement,
}

/// What is about to be stored in the open member.
#[derive(Debug, Clone, Copy)]
enum ContentValue<'a> {
    Text,
    Object { ty: &'a XamlType, has_key: bool },
}

/// Lazily turns a XAML document into [`XamlNode`]s.
///
/// Yields `Err` at most once; the iterator is fused after an error or the
/// end of the document. Nodes produced before the error are yielded first.
pub struct XamlPullParser<'s, 'src> {
    scanner: XamlScanner<'src>,
    ctx: ParserContext<'s>,
    settings: XamlReaderSettings,
    productions: Vec<Production>,
    output: VecDeque<XamlNode>,
    /// Prefix definitions waiting for the element they belong to.
    pending_prefixes: Vec<ScannerNode>,
    /// Position of the scanner node being processed, until the first node
    /// it produces is emitted.
    pending_line_info: Option<Position>,
    last_line_info: Option<Position>,
    done: bool,
    error: Option<XamlParseError>,
}

impl<'s, 'src> XamlPullParser<'s, 'src> {
    pub fn new(source: &'src str, schema: &'s dyn SchemaContext, settings: XamlReaderSettings) -> Self {
        Self {
            scanner: XamlScanner::new(source, settings.clone()),
            ctx: ParserContext::new(schema),
            settings,
            productions: vec![Production::Document { root_seen: false }],
            output: VecDeque::new(),
            pending_prefixes: Vec::new(),
            pending_line_info: None,
            last_line_info: None,
            done: false,
            error: None,
        }
    }

    /// The parse context, with the scopes currently open.
    pub fn context(&self) -> &ParserContext<'s> {
        &self.ctx
    }

    fn emit(&mut self, node: XamlNode) {
        trace!(%node, "emit");
        self.output.push_back(node);
    }

    fn line_info(&mut self, position: Position) {
        if !self.settings.provide_line_info || !position.is_known() {
            return;
        }
        if self.last_line_info == Some(position) {
            return;
        }
        self.last_line_info = Some(position);
        self.emit(XamlNode::LineInfo(position));
    }

    /// Emit the line info of the current scanner node, once, right before
    /// the first node it produces.
    fn flush_line_info(&mut self) {
        if let Some(position) = self.pending_line_info.take() {
            self.line_info(position);
        }
    }

    /// Read one scanner node and run productions on it.
    fn step(&mut self) -> Result<(), XamlParseError> {
        let node = self.scanner.read(&self.ctx)?;
        // Elements and prefixes place their own line info.
        self.pending_line_info = match node.kind {
            ScannerNodeKind::PrefixDefinition | ScannerNodeKind::Element | ScannerNodeKind::EmptyElement => None,
            _ => Some(node.position),
        };
        while self.dispatch(&node)? {}
        Ok(())
    }

    /// Hand `node` to the innermost production. Returns `true` when the
    /// production ended without consuming the node.
    fn dispatch(&mut self, node: &ScannerNode) -> Result<bool, XamlParseError> {
        let Some(production) = self.productions.last().copied() else {
            return Err(node.unexpected("Document"));
        };
        trace!(?production, kind = ?node.kind, "dispatch");
        match production {
            Production::Document { root_seen } => self.document(node, root_seen),
            Production::Element {
                empty, body: false, ..
            } => self.attributes(node, empty),
            Production::Element { body: true, .. } => self.element_body(node),
            Production::PropertyElement => self.property_content(node),
        }
    }

    // =========================================================================
    // Productions
    // =========================================================================

    fn document(&mut self, node: &ScannerNode, root_seen: bool) -> Result<bool, XamlParseError> {
        match node.kind {
            ScannerNodeKind::PrefixDefinition if !root_seen => {
                self.pending_prefixes.push(node.clone());
            }
            ScannerNodeKind::Element | ScannerNodeKind::EmptyElement if !root_seen => {
                if let Some(Production::Document { root_seen }) = self.productions.last_mut() {
                    *root_seen = true;
                }
                self.start_element(node)?;
            }
            ScannerNodeKind::None if root_seen => {
                debug!("end of document");
                self.done = true;
            }
            _ => return Err(node.unexpected("Document")),
        }
        Ok(false)
    }

    fn start_element(&mut self, node: &ScannerNode) -> Result<(), XamlParseError> {
        let ty = node.expect_type("Element")?.clone();
        self.flush_prefixes();
        self.line_info(node.position);
        debug!(%ty, depth = self.ctx.depth() + 1, "start object");

        self.ctx.push_scope(ty.clone());
        self.emit(XamlNode::StartObject(ty));
        self.productions.push(Production::Element {
            empty: node.kind == ScannerNodeKind::EmptyElement,
            body: false,
            has_content: false,
        });
        Ok(())
    }

    /// `(DIRECTIVE | ATTRIBUTE)*`, up to the first node that is neither.
    fn attributes(&mut self, node: &ScannerNode, empty: bool) -> Result<bool, XamlParseError> {
        if matches!(
            node.kind,
            ScannerNodeKind::Directive | ScannerNodeKind::Attribute
        ) {
            self.attribute(node)?;
            return Ok(false);
        }

        self.emit(XamlNode::EndOfAttributes);
        if empty {
            self.productions.pop();
            self.finish_object(false);
        } else if let Some(Production::Element { body, .. }) = self.productions.last_mut() {
            *body = true;
        }
        Ok(true)
    }

    fn attribute(&mut self, node: &ScannerNode) -> Result<(), XamlParseError> {
        let member = node.expect_member("Attribute")?.clone();
        if node.forces_constructor
            && let Some(scope) = self.ctx.current_mut()
        {
            scope.forced_to_use_constructor = true;
        }

        self.flush_line_info();
        self.emit(XamlNode::StartMember(member));
        if node.text.looks_like_markup_extension() {
            let nodes = MePullParser::new(&mut self.ctx, node.text.text(), node.value_position).parse()?;
            self.output.extend(nodes);
        } else {
            self.emit(XamlNode::Value(node.text.attribute_text().to_string()));
        }
        self.emit(XamlNode::EndMember);
        Ok(())
    }

    fn element_body(&mut self, node: &ScannerNode) -> Result<bool, XamlParseError> {
        match node.kind {
            ScannerNodeKind::PropertyElement | ScannerNodeKind::EmptyPropertyElement => {
                self.close_member();
                self.start_property_element(node)?;
            }
            ScannerNodeKind::Element | ScannerNodeKind::EmptyElement => {
                let ty = node.expect_type("ElementBody")?;
                self.start_content(
                    ContentValue::Object {
                        ty,
                        has_key: node.has_key_attribute,
                    },
                    node.position,
                )?;
                self.start_element(node)?;
            }
            ScannerNodeKind::Text => self.content_text(node)?,
            ScannerNodeKind::PrefixDefinition => self.pending_prefixes.push(node.clone()),
            ScannerNodeKind::EndTag => {
                self.flush_line_info();
                self.close_member();
                let has_content = match self.productions.pop() {
                    Some(Production::Element { has_content, .. }) => has_content,
                    _ => false,
                };
                self.finish_object(has_content);
            }
            _ => return Err(node.unexpected("ElementBody")),
        }
        Ok(false)
    }

    fn start_property_element(&mut self, node: &ScannerNode) -> Result<(), XamlParseError> {
        let member = node.expect_member("PropertyElement")?.clone();
        debug!(%member, "start property element");
        self.mark_content();
        if let Some(scope) = self.ctx.current_mut() {
            if !member.is_directive() {
                scope.forced_to_use_constructor = true;
            }
            scope.open_member(member.clone());
        }
        self.flush_line_info();
        self.emit(XamlNode::StartMember(member));

        if node.kind == ScannerNodeKind::EmptyPropertyElement {
            self.close_member();
        } else {
            self.productions.push(Production::PropertyElement);
        }
        Ok(())
    }

    /// `PropertyContent* ENDTAG` of a non-empty property element.
    fn property_content(&mut self, node: &ScannerNode) -> Result<bool, XamlParseError> {
        match node.kind {
            ScannerNodeKind::Element | ScannerNodeKind::EmptyElement => {
                let ty = node.expect_type("PropertyElement")?;
                self.start_content(
                    ContentValue::Object {
                        ty,
                        has_key: node.has_key_attribute,
                    },
                    node.position,
                )?;
                self.start_element(node)?;
            }
            ScannerNodeKind::Text => self.content_text(node)?,
            ScannerNodeKind::PrefixDefinition => self.pending_prefixes.push(node.clone()),
            ScannerNodeKind::EndTag => {
                self.flush_line_info();
                self.close_member();
                self.productions.pop();
            }
            _ => return Err(node.unexpected("PropertyElement")),
        }
        Ok(false)
    }

    // =========================================================================
    // Objects and members
    // =========================================================================

    fn flush_prefixes(&mut self) {
        for node in std::mem::take(&mut self.pending_prefixes) {
            self.ctx
                .add_namespace_prefix(node.prefix.clone(), node.namespace.clone());
            self.line_info(node.position);
            self.emit(XamlNode::NamespaceDeclaration {
                prefix: node.prefix,
                namespace: node.namespace,
            });
        }
    }

    /// Emit `EndObject` for the current scope and pop it. An object with no
    /// content that can only come from text gets an empty initialization
    /// value first.
    fn finish_object(&mut self, has_content: bool) {
        if !has_content
            && let Some(scope) = self.ctx.current()
            && scope.ty.type_converter().is_some()
            && !scope.ty.is_constructible()
            && !scope.forced_to_use_constructor
        {
            self.emit(XamlNode::StartMember(xaml_language::initialization().clone()));
            self.emit(XamlNode::Value(String::new()));
            self.emit(XamlNode::EndMember);
        }

        self.emit(XamlNode::EndObject);
        let finished = self.ctx.pop_scope();
        debug!(depth = self.ctx.depth(), "end object");
        if let Some(finished) = finished
            && let Some(parent) = self.ctx.current_mut()
        {
            parent.previous_child_type = Some(finished.ty);
        }
    }

    fn in_synthetic_scope(&self) -> bool {
        self.ctx.current().is_some_and(|scope| scope.is_synthetic())
    }

    /// Close the open member, unwinding any synthetic frames wrapped around
    /// its values first.
    fn close_member(&mut self) {
        while self.in_synthetic_scope() {
            self.emit(XamlNode::EndMember);
            self.emit(XamlNode::EndObject);
            self.ctx.pop_scope();
        }
        if let Some(scope) = self.ctx.current_mut()
            && scope.member.is_some()
        {
            scope.close_member();
            self.emit(XamlNode::EndMember);
        }
    }

    fn mark_content(&mut self) {
        if let Some(Production::Element { has_content, .. }) = self
            .productions
            .iter_mut()
            .rev()
            .find(|production| matches!(production, Production::Element { .. }))
        {
            *has_content = true;
        }
    }

    /// Open the member that receives content when none is open, then wrap
    /// collection members as needed.
    fn start_content(&mut self, value: ContentValue<'_>, position: Position) -> Result<(), XamlParseError> {
        self.mark_content();
        let Some(scope) = self.ctx.current() else {
            return Ok(());
        };
        if scope.member.is_none() {
            let member = self.content_member(
                &scope.ty,
                matches!(value, ContentValue::Text),
                scope.forced_to_use_constructor,
            );
            debug!(%member, "implicit content member");
            self.emit(XamlNode::StartMember(member.clone()));
            if let Some(scope) = self.ctx.current_mut() {
                scope.open_member(member);
            }
        }
        self.check_collection(value, position)
    }

    /// The member that receives content on an object of type `ty`.
    fn content_member(&self, ty: &XamlType, is_text: bool, forced: bool) -> XamlMember {
        let content = self.ctx.content_property(ty);
        if is_text {
            if let Some(member) = &content
                && accepts_string(member.value_type())
            {
                return member.clone();
            }
            if ty.type_converter().is_some() && !forced {
                return xaml_language::initialization().clone();
            }
        }
        if ty.is_collection() || ty.is_dictionary() {
            return xaml_language::items().clone();
        }
        content.unwrap_or_else(|| xaml_language::unknown_content().clone())
    }

    /// Wrap the values of the open member in an implicit array or a
    /// get-object frame, once per member.
    fn check_collection(&mut self, value: ContentValue<'_>, position: Position) -> Result<(), XamlParseError> {
        let Some(scope) = self.ctx.current_mut() else {
            return Ok(());
        };
        if scope.member_checked {
            return Ok(());
        }
        scope.member_checked = true;
        let Some(member) = scope.member.clone() else {
            return Ok(());
        };
        if member.is_directive() || scope.is_synthetic() {
            return Ok(());
        }

        let member_type = member.value_type().clone();
        let value_is_array = matches!(value, ContentValue::Object { ty, .. } if ty == xaml_language::array());
        if member_type.is_array() && !value_is_array {
            self.implicit_array(&member_type, position)?;
        } else if (member_type.is_collection() || member_type.is_dictionary())
            && needs_get_object(&member, &member_type, value)
        {
            debug!(%member, "get object from member");
            self.emit(XamlNode::GetObject);
            let scope = self.ctx.push_scope(member_type);
            scope.in_collection_from_member = true;
            scope.open_member(xaml_language::items().clone());
            scope.member_checked = true;
            self.emit(XamlNode::StartMember(xaml_language::items().clone()));
        }
        Ok(())
    }

    /// Open an `x:Array` of the member's item type around its values.
    fn implicit_array(&mut self, member_type: &XamlType, position: Position) -> Result<(), XamlParseError> {
        let item_type = member_type
            .item_type()
            .unwrap_or_else(|| xaml_language::object());
        let lookup = NamespacePrefixLookup::new(&self.ctx, item_type.name());
        let type_name = lookup
            .qualified_name(item_type.name())
            .map_err(|err| XamlParseError::new(XamlParseErrorKind::InvalidTypeName(err), position))?;
        debug!(%item_type, %type_name, "implicit array");

        for (prefix, namespace) in lookup.new_definitions() {
            self.ctx.add_namespace_prefix(prefix.as_str(), namespace.as_str());
            self.emit(XamlNode::NamespaceDeclaration {
                prefix: prefix.clone(),
                namespace: namespace.clone(),
            });
        }

        let scope = self.ctx.push_scope(xaml_language::array().clone());
        scope.in_implicit_array = true;
        scope.open_member(xaml_language::array_items().clone());
        scope.member_checked = true;

        self.emit(XamlNode::StartObject(xaml_language::array().clone()));
        self.emit(XamlNode::StartMember(xaml_language::array_type().clone()));
        self.emit(XamlNode::Value(type_name));
        self.emit(XamlNode::EndMember);
        self.emit(XamlNode::EndOfAttributes);
        self.emit(XamlNode::StartMember(xaml_language::array_items().clone()));
        Ok(())
    }

    // =========================================================================
    // Text
    // =========================================================================

    fn content_text(&mut self, node: &ScannerNode) -> Result<(), XamlParseError> {
        if node.is_xdata {
            return self.xdata(node);
        }

        if node.text.is_whitespace_only() && self.is_discardable_whitespace(node)? {
            trace!(position = %node.position, "discard whitespace");
            return Ok(());
        }
        let value = self.trim_text(node)?;
        if value.is_empty() {
            return Ok(());
        }

        self.start_content(ContentValue::Text, node.position)?;
        self.flush_line_info();
        self.emit(XamlNode::Value(value));
        Ok(())
    }

    fn xdata(&mut self, node: &ScannerNode) -> Result<(), XamlParseError> {
        let ty = xaml_language::xdata();
        self.start_content(ContentValue::Object { ty, has_key: false }, node.position)?;
        self.flush_line_info();
        self.emit(XamlNode::StartObject(ty.clone()));
        self.emit(XamlNode::EndOfAttributes);
        self.emit(XamlNode::StartMember(xaml_language::xdata_text().clone()));
        self.emit(XamlNode::Value(node.text.text().to_string()));
        self.emit(XamlNode::EndMember);
        self.emit(XamlNode::EndObject);
        if let Some(scope) = self.ctx.current_mut() {
            scope.previous_child_type = Some(ty.clone());
        }
        Ok(())
    }

    /// Whether a whitespace-only text node carries no content.
    fn is_discardable_whitespace(&mut self, node: &ScannerNode) -> Result<bool, XamlParseError> {
        let next = self.scanner.peek_node_kind(&self.ctx)?;
        let Some(scope) = self.ctx.current() else {
            return Ok(true);
        };
        let member = scope.member.as_ref();

        if member.is_some_and(XamlMember::is_unknown) {
            return Ok(false);
        }
        if member == Some(xaml_language::items()) && scope.ty.is_whitespace_significant_collection() {
            return Ok(false);
        }

        let in_container = member.is_some_and(|member| {
            member == xaml_language::items() || member == xaml_language::positional_parameters()
        });
        let next_is_element = matches!(
            next,
            ScannerNodeKind::Element | ScannerNodeKind::EmptyElement | ScannerNodeKind::PrefixDefinition
        );
        if !in_container && next_is_element {
            let significant = match member {
                Some(member) => member.value_type().is_whitespace_significant_collection(),
                None => {
                    scope.ty.is_whitespace_significant_collection()
                        || self
                            .ctx
                            .content_property(&scope.ty)
                            .is_some_and(|content| content.value_type().is_whitespace_significant_collection())
                }
            };
            if significant {
                return Ok(false);
            }
        }

        if node.text.is_space_preserved() && next == ScannerNodeKind::EndTag {
            let significant = match member {
                Some(_) => scope.previous_child_type.is_none(),
                None => match self.ctx.content_property(&scope.ty) {
                    Some(content) => {
                        let ty = content.value_type();
                        ty == xaml_language::string() || ty.is_whitespace_significant_collection()
                    }
                    None => scope.ty.type_converter().is_some() && !scope.forced_to_use_constructor,
                },
            };
            if significant {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Apply the trimming rules that depend on the neighbouring nodes.
    fn trim_text(&mut self, node: &ScannerNode) -> Result<String, XamlParseError> {
        let text = node.text.text();
        if node.text.is_space_preserved() {
            return Ok(text.to_string());
        }

        let mut value = text;
        let next = self.scanner.peek_node_kind(&self.ctx)?;
        if matches!(
            next,
            ScannerNodeKind::EndTag | ScannerNodeKind::PropertyElement | ScannerNodeKind::EmptyPropertyElement
        ) {
            value = trim_trailing_whitespace(value);
        }

        let trim_leading = self
            .ctx
            .current()
            .and_then(|scope| scope.previous_child_type.as_ref())
            .is_none_or(XamlType::trims_surrounding_whitespace);
        if trim_leading {
            value = trim_leading_whitespace(value);
        }

        if self
            .scanner
            .peek_type(&self.ctx)?
            .is_some_and(|ty| ty.trims_surrounding_whitespace())
        {
            value = trim_trailing_whitespace(value);
        }
        Ok(value.to_string())
    }
}

/// Whether text can be stored in a member of type `ty`.
fn accepts_string(ty: &XamlType) -> bool {
    ty.accepts_text()
        || (ty.is_collection()
            && ty.allowed_content_types().iter().any(|name| {
                name == xaml_language::string().name() || name == xaml_language::object().name()
            }))
}

/// Whether the values of a collection member go into the instance the
/// member already holds rather than replacing it.
fn needs_get_object(member: &XamlMember, member_type: &XamlType, value: ContentValue<'_>) -> bool {
    if member.is_read_only() {
        return true;
    }
    match value {
        ContentValue::Text => member_type.type_converter().is_none(),
        ContentValue::Object { ty, has_key } => {
            if ty == xaml_language::array() {
                !member_type.is_array() && !ty.can_assign_to(member_type)
            } else if ty.is_markup_extension() && !has_key {
                false
            } else if ty.is_unknown() || member_type.is_unknown() {
                false
            } else {
                !ty.can_assign_to(member_type)
            }
        }
    }
}

impl Iterator for XamlPullParser<'_, '_> {
    type Item = Result<XamlNode, XamlParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.output.pop_front() {
                return Some(Ok(node));
            }
            if let Some(err) = self.error.take() {
                return Some(Err(err));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.step() {
                debug!(%err, "parse failed");
                self.error = Some(err);
                self.done = true;
            }
        }
    }
}

impl FusedIterator for XamlPullParser<'_, '_> {}
