//! Turns XML reader events into XAML scanner nodes.
//!
//! The scanner classifies elements as object or property elements, splits
//! attributes into prefix definitions, directives and members (reordered so
//! constructor directives come first), accumulates character data into one
//! text node per run and captures `x:XData` islands verbatim.

use std::collections::VecDeque;
use std::fmt;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use tracing::{debug, trace};
use xaml_schema::{XamlMember, XamlType, XamlTypeName, xaml_language};
use xaml_tokenizer::text::{is_whitespace, is_whitespace_char, normalize_newlines};
use xaml_tokenizer::{
    LineIndex, Position, TypeNameError, TypeNameErrorKind, XamlPropertyName, XamlQualifiedName,
    XamlText,
};

use crate::context::ParserContext;
use crate::error::{XamlParseError, XamlParseErrorKind};
use crate::settings::XamlReaderSettings;

/// The kind of a scanner node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerNodeKind {
    /// End of input.
    None,
    /// `<Type ...>`
    Element,
    /// `<Type .../>`
    EmptyElement,
    /// `<Owner.Member>`
    PropertyElement,
    /// `<Owner.Member/>`
    EmptyPropertyElement,
    /// A member attribute.
    Attribute,
    /// A directive attribute (`x:Key`, `xml:space`, ...).
    Directive,
    /// A run of character data, or an `x:XData` island.
    Text,
    /// `</...>`
    EndTag,
    /// An `xmlns` attribute.
    PrefixDefinition,
}

impl fmt::Display for ScannerNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScannerNodeKind::None => "end of document",
            ScannerNodeKind::Element => "element",
            ScannerNodeKind::EmptyElement => "empty element",
            ScannerNodeKind::PropertyElement => "property element",
            ScannerNodeKind::EmptyPropertyElement => "empty property element",
            ScannerNodeKind::Attribute => "attribute",
            ScannerNodeKind::Directive => "directive",
            ScannerNodeKind::Text => "text",
            ScannerNodeKind::EndTag => "end tag",
            ScannerNodeKind::PrefixDefinition => "namespace declaration",
        };
        f.write_str(name)
    }
}

/// One scanner node.
#[derive(Debug, Clone)]
pub struct ScannerNode {
    pub kind: ScannerNodeKind,
    /// The object type, for elements.
    pub ty: Option<XamlType>,
    /// The member, for property elements, attributes and directives.
    pub member: Option<XamlMember>,
    /// Attribute value or character data.
    pub text: XamlText,
    /// Declared prefix, for prefix definitions.
    pub prefix: String,
    /// Declared namespace, for prefix definitions.
    pub namespace: String,
    pub position: Position,
    /// Where an attribute value starts.
    pub value_position: Position,
    /// The text is the inner XML of an `x:XData` element.
    pub is_xdata: bool,
    /// The member forces the object to be built through a constructor.
    pub forces_constructor: bool,
    /// The element carries an `x:Key` attribute.
    pub has_key_attribute: bool,
}

impl ScannerNode {
    fn new(kind: ScannerNodeKind, position: Position) -> Self {
        Self {
            kind,
            ty: None,
            member: None,
            text: XamlText::new(true),
            prefix: String::new(),
            namespace: String::new(),
            position,
            value_position: position,
            is_xdata: false,
            forces_constructor: false,
            has_key_attribute: false,
        }
    }

    /// The node's type, or an `UnexpectedNode` error naming `rule`.
    pub(crate) fn expect_type(&self, rule: &'static str) -> Result<&XamlType, XamlParseError> {
        self.ty.as_ref().ok_or_else(|| self.unexpected(rule))
    }

    /// The node's member, or an `UnexpectedNode` error naming `rule`.
    pub(crate) fn expect_member(&self, rule: &'static str) -> Result<&XamlMember, XamlParseError> {
        self.member.as_ref().ok_or_else(|| self.unexpected(rule))
    }

    /// An error for this node appearing where `rule` does not allow it.
    pub(crate) fn unexpected(&self, rule: &'static str) -> XamlParseError {
        XamlParseError::new(
            XamlParseErrorKind::UnexpectedNode {
                rule,
                found: self.kind,
            },
            self.position,
        )
    }
}

/// An object element the scanner is inside of.
#[derive(Debug)]
struct ScannerFrame {
    ty: XamlType,
    /// The property element open on this object.
    current_property: Option<XamlMember>,
    /// Whether character data or a child object was seen since the object
    /// or its current property element started.
    in_content: bool,
    xml_space_preserve: bool,
}

#[derive(Debug)]
enum OpenElement {
    Object(String),
    Property(String),
}

impl OpenElement {
    fn name(&self) -> &str {
        match self {
            OpenElement::Object(name) | OpenElement::Property(name) => name,
        }
    }
}

#[derive(Debug)]
struct PendingText {
    text: XamlText,
    position: Position,
}

/// An attribute as read from the tag.
#[derive(Debug)]
struct RawAttribute {
    name: String,
    value: String,
    position: Position,
    value_position: Position,
}

/// Attribute classes in emission order. Sorting is stable, so attributes
/// of one class keep their document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AttributeClass {
    ConstructorDirective,
    Directive,
    Name,
    Other,
}

/// Reads XML with `quick-xml` and produces [`ScannerNode`]s with one node of
/// lookahead.
pub struct XamlScanner<'src> {
    reader: Reader<&'src [u8]>,
    source: &'src str,
    lines: LineIndex,
    settings: XamlReaderSettings,
    queue: VecDeque<ScannerNode>,
    current: ScannerNode,
    stack: Vec<ScannerFrame>,
    open_elements: Vec<OpenElement>,
    /// `xmlns` declarations per open XML element.
    namespaces: Vec<Vec<(String, String)>>,
    pending_text: Option<PendingText>,
    eof: bool,
}

impl<'src> XamlScanner<'src> {
    pub fn new(source: &'src str, settings: XamlReaderSettings) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            source,
            lines: LineIndex::new(source),
            settings,
            queue: VecDeque::new(),
            current: ScannerNode::new(ScannerNodeKind::None, Position::default()),
            stack: Vec::new(),
            open_elements: Vec::new(),
            namespaces: Vec::new(),
            pending_text: None,
            eof: false,
        }
    }

    /// Advance to the next node and return it.
    pub fn read(&mut self, ctx: &ParserContext<'_>) -> Result<ScannerNode, XamlParseError> {
        self.fill(ctx)?;
        if let Some(node) = self.queue.pop_front() {
            trace!(kind = ?node.kind, position = %node.position, "scanner node");
            self.current = node;
        }
        Ok(self.current.clone())
    }

    /// The node returned by the last [`read`](Self::read).
    #[inline]
    pub fn current(&self) -> &ScannerNode {
        &self.current
    }

    /// Kind of the next node, without consuming it.
    pub fn peek_node_kind(&mut self, ctx: &ParserContext<'_>) -> Result<ScannerNodeKind, XamlParseError> {
        self.fill(ctx)?;
        Ok(self
            .queue
            .front()
            .map_or(ScannerNodeKind::None, |node| node.kind))
    }

    /// Type of the next element, looking past the prefix definitions that
    /// precede it.
    pub fn peek_type(&mut self, ctx: &ParserContext<'_>) -> Result<Option<XamlType>, XamlParseError> {
        self.fill(ctx)?;
        Ok(self
            .queue
            .iter()
            .find(|node| node.kind != ScannerNodeKind::PrefixDefinition)
            .filter(|node| {
                matches!(
                    node.kind,
                    ScannerNodeKind::Element | ScannerNodeKind::EmptyElement
                )
            })
            .and_then(|node| node.ty.clone()))
    }

    fn position(&self, offset: usize) -> Position {
        self.lines.position(self.source, offset as u32)
    }

    fn enqueue(&mut self, node: ScannerNode) {
        self.queue.push_back(node);
    }

    /// Read XML events until at least one node is queued.
    fn fill(&mut self, ctx: &ParserContext<'_>) -> Result<(), XamlParseError> {
        while self.queue.is_empty() {
            if self.eof {
                self.enqueue(ScannerNode::new(ScannerNodeKind::None, Position::default()));
                break;
            }

            let start = self.reader.buffer_position() as usize;
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    let offset = self.reader.error_position() as usize;
                    return Err(XamlParseError::new(
                        XamlParseErrorKind::Xml {
                            message: err.to_string(),
                        },
                        self.position(offset),
                    ));
                }
            };
            let end = self.reader.buffer_position() as usize;

            match event {
                Event::Start(e) => self.element(ctx, &e, start, end, false)?,
                Event::Empty(e) => self.element(ctx, &e, start, end, true)?,
                Event::End(_) => self.end_tag(start),
                Event::Text(e) => {
                    let raw = self.utf8(&e, start)?;
                    let normalized = normalize_newlines(raw);
                    let text = quick_xml::escape::unescape(&normalized)
                        .map_err(|err| self.xml_error(err, start))?;
                    self.paste(&text, start);
                }
                Event::CData(e) => {
                    let raw = self.utf8(&e, start)?;
                    self.paste(&normalize_newlines(raw), start);
                }
                Event::Eof => {
                    self.end_of_document()?;
                    self.eof = true;
                }
                // Comments, processing instructions, the declaration and
                // DOCTYPE neither produce nodes nor break a text run.
                _ => {}
            }
        }
        Ok(())
    }

    fn utf8<'a>(&self, bytes: &'a [u8], offset: usize) -> Result<&'a str, XamlParseError> {
        std::str::from_utf8(bytes).map_err(|err| self.xml_error(err, offset))
    }

    fn xml_error(&self, err: impl fmt::Display, offset: usize) -> XamlParseError {
        XamlParseError::new(
            XamlParseErrorKind::Xml {
                message: err.to_string(),
            },
            self.position(offset),
        )
    }

    // =========================================================================
    // Text
    // =========================================================================

    fn paste(&mut self, text: &str, offset: usize) {
        if text.is_empty() {
            return;
        }
        let whitespace = is_whitespace(text);
        if self.stack.is_empty() && whitespace && self.pending_text.is_none() {
            return;
        }

        let trim_leading = !self.stack.last().is_some_and(|frame| frame.in_content);
        let preserve = self
            .stack
            .last()
            .map_or(self.settings.xml_space_preserve, |frame| frame.xml_space_preserve);
        let position = self.position(offset);
        let pending = self.pending_text.get_or_insert_with(|| PendingText {
            text: XamlText::new(preserve),
            position,
        });
        pending.text.paste(text, trim_leading);

        if !whitespace && let Some(frame) = self.stack.last_mut() {
            frame.in_content = true;
        }
    }

    fn flush_text(&mut self) {
        let Some(pending) = self.pending_text.take() else {
            return;
        };
        if pending.text.is_empty() {
            return;
        }
        let mut node = ScannerNode::new(ScannerNodeKind::Text, pending.position);
        node.text = pending.text;
        self.enqueue(node);
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn element(
        &mut self,
        ctx: &ParserContext<'_>,
        e: &BytesStart<'_>,
        start: usize,
        end: usize,
        empty: bool,
    ) -> Result<(), XamlParseError> {
        self.flush_text();
        let position = self.position(start);
        let raw_name = self.utf8(e.name().as_ref(), start)?.to_string();
        let attributes = self.read_attributes(e, start, end)?;

        let mut scope = Vec::new();
        let mut definitions = Vec::new();
        let mut rest = Vec::new();
        for attr in attributes {
            let prefix = if attr.name == "xmlns" {
                Some(String::new())
            } else {
                attr.name.strip_prefix("xmlns:").map(str::to_string)
            };
            match prefix {
                Some(prefix) => {
                    let mut node = ScannerNode::new(ScannerNodeKind::PrefixDefinition, attr.position);
                    node.prefix = prefix.clone();
                    node.namespace = attr.value.clone();
                    scope.push((prefix, attr.value));
                    definitions.push(node);
                }
                None => rest.push(attr),
            }
        }
        self.namespaces.push(scope);

        let Some(qname) = XamlQualifiedName::parse(&raw_name) else {
            return Err(XamlParseError::new(
                XamlParseErrorKind::InvalidTypeName(TypeNameError {
                    kind: TypeNameErrorKind::InvalidTypeName { text: raw_name },
                    offset: 0,
                }),
                position,
            ));
        };
        let namespace = self.namespace_of(ctx, &qname.prefix, position)?;

        if qname.name.contains('.') {
            let member = self.property_element_member(ctx, &raw_name, &namespace, position)?;
            self.property_element(member, raw_name, definitions, rest, position, empty, ctx)
        } else if let Some(directive) = ctx.resolve_directive(&namespace, &qname.name) {
            if self.stack.is_empty() {
                return Err(XamlParseError::new(
                    XamlParseErrorKind::ParentlessPropertyElement { name: raw_name },
                    position,
                ));
            }
            self.property_element(directive, raw_name, definitions, rest, position, empty, ctx)
        } else {
            self.object_element(ctx, e, raw_name, namespace, qname.name, definitions, rest, position, empty)
        }
    }

    /// Collect the attributes of a tag with the positions of their names and
    /// values.
    fn read_attributes(
        &self,
        e: &BytesStart<'_>,
        start: usize,
        end: usize,
    ) -> Result<Vec<RawAttribute>, XamlParseError> {
        let tag = self.source.get(start..end).unwrap_or_default();
        let offsets = attribute_offsets(tag);
        let element_position = self.position(start);

        let mut out = Vec::new();
        for (i, attr) in e.attributes().enumerate() {
            let attr = attr.map_err(|err| self.xml_error(err, start))?;
            let name = self.utf8(attr.key.as_ref(), start)?.to_string();
            let raw = self.utf8(&attr.value, start)?;
            let normalized = normalize_attribute_value(raw);
            let value = quick_xml::escape::unescape(&normalized)
                .map_err(|err| self.xml_error(err, start))?
                .into_owned();
            let (position, value_position) = match offsets.get(i) {
                Some(&(name_at, value_at)) => (
                    self.position(start + name_at),
                    self.position(start + value_at),
                ),
                None => (element_position, element_position),
            };
            out.push(RawAttribute {
                name,
                value,
                position,
                value_position,
            });
        }
        Ok(out)
    }

    /// Namespace bound to `prefix`. An undeclared empty prefix is the empty
    /// namespace.
    fn namespace_of(
        &self,
        ctx: &ParserContext<'_>,
        prefix: &str,
        position: Position,
    ) -> Result<String, XamlParseError> {
        self.lookup_namespace(ctx, prefix)
            .or_else(|| prefix.is_empty().then(String::new))
            .ok_or_else(|| {
                XamlParseError::new(
                    XamlParseErrorKind::UndeclaredPrefix {
                        prefix: prefix.to_string(),
                    },
                    position,
                )
            })
    }

    fn lookup_namespace(&self, ctx: &ParserContext<'_>, prefix: &str) -> Option<String> {
        self.namespaces
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.clone())
            .or_else(|| ctx.schema().find_namespace_by_prefix(prefix))
    }

    /// Resolve `<Owner.Member>` against the enclosing object.
    fn property_element_member(
        &self,
        ctx: &ParserContext<'_>,
        raw_name: &str,
        namespace: &str,
        position: Position,
    ) -> Result<XamlMember, XamlParseError> {
        let Some(frame) = self.stack.last() else {
            return Err(XamlParseError::new(
                XamlParseErrorKind::ParentlessPropertyElement {
                    name: raw_name.to_string(),
                },
                position,
            ));
        };
        let invalid = || {
            XamlParseError::new(
                XamlParseErrorKind::InvalidMemberName {
                    name: raw_name.to_string(),
                },
                position,
            )
        };
        let name = XamlPropertyName::parse(raw_name).ok_or_else(invalid)?;
        let owner_name = name.owner.as_deref().ok_or_else(invalid)?;
        let owner = ctx.resolve_type_or_unknown(&XamlTypeName::new(namespace, owner_name));
        Ok(resolve_member(ctx, &frame.ty, &owner, &name.name))
    }

    #[allow(clippy::too_many_arguments)]
    fn property_element(
        &mut self,
        member: XamlMember,
        raw_name: String,
        definitions: Vec<ScannerNode>,
        attributes: Vec<RawAttribute>,
        position: Position,
        empty: bool,
        ctx: &ParserContext<'_>,
    ) -> Result<(), XamlParseError> {
        debug!(%member, empty, "property element");
        for node in definitions {
            self.enqueue(node);
        }

        let kind = if empty {
            ScannerNodeKind::EmptyPropertyElement
        } else {
            ScannerNodeKind::PropertyElement
        };
        let mut node = ScannerNode::new(kind, position);
        node.member = Some(member.clone());
        self.enqueue(node);

        // Anything but xmlns is left for the grammar to reject.
        let owner = self.stack.last().map(|frame| frame.ty.clone());
        for attr in attributes {
            if self.settings.ignore_uids_on_property_elements && self.is_uid(ctx, &attr.name) {
                continue;
            }
            let mut node = ScannerNode::new(ScannerNodeKind::Attribute, attr.position);
            node.value_position = attr.value_position;
            node.member = owner
                .as_ref()
                .map(|owner| XamlMember::unknown(attr.name.as_str(), owner, false));
            node.text = XamlText::preserved(&attr.value);
            self.enqueue(node);
        }

        if let Some(frame) = self.stack.last_mut() {
            frame.current_property = (!empty).then_some(member);
            frame.in_content = false;
        }
        if empty {
            self.namespaces.pop();
        } else {
            self.open_elements.push(OpenElement::Property(raw_name));
        }
        Ok(())
    }

    fn is_uid(&self, ctx: &ParserContext<'_>, name: &str) -> bool {
        XamlQualifiedName::parse(name).is_some_and(|qname| {
            qname.name == "Uid"
                && self.lookup_namespace(ctx, &qname.prefix).as_deref()
                    == Some(xaml_language::XAML_NAMESPACE)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn object_element(
        &mut self,
        ctx: &ParserContext<'_>,
        e: &BytesStart<'_>,
        raw_name: String,
        namespace: String,
        local_name: String,
        definitions: Vec<ScannerNode>,
        mut attributes: Vec<RawAttribute>,
        position: Position,
        empty: bool,
    ) -> Result<(), XamlParseError> {
        let mut type_arguments = Vec::new();
        if let Some(index) = attributes
            .iter()
            .position(|attr| self.is_type_arguments(ctx, &attr.name))
        {
            let attr = attributes.remove(index);
            type_arguments = XamlTypeName::parse_list(&attr.value, |prefix| {
                self.lookup_namespace(ctx, prefix)
            })
            .map_err(|err| {
                XamlParseError::new(XamlParseErrorKind::InvalidTypeName(err), attr.value_position)
            })?;
        }
        let name = XamlTypeName::with_arguments(namespace.clone(), local_name, type_arguments);
        let ty = ctx.resolve_type_or_unknown(&name);
        debug!(%ty, empty, "object element");

        if let Some(parent) = self.stack.last_mut() {
            parent.in_content = true;
        }

        if &ty == xaml_language::xdata() {
            return self.xdata(e, ty, position, empty);
        }

        for node in definitions {
            self.enqueue(node);
        }

        let preserve = self
            .stack
            .last()
            .map_or(self.settings.xml_space_preserve, |frame| frame.xml_space_preserve);
        self.stack.push(ScannerFrame {
            ty: ty.clone(),
            current_property: None,
            in_content: false,
            xml_space_preserve: preserve,
        });

        let members = self.classify_attributes(ctx, &ty, &namespace, attributes)?;

        let kind = if empty {
            ScannerNodeKind::EmptyElement
        } else {
            ScannerNodeKind::Element
        };
        let mut node = ScannerNode::new(kind, position);
        node.ty = Some(ty);
        node.has_key_attribute = members
            .iter()
            .any(|node| node.member.as_ref() == Some(xaml_language::key()));
        self.enqueue(node);
        for node in members {
            self.enqueue(node);
        }

        if empty {
            self.stack.pop();
            self.namespaces.pop();
        } else {
            self.open_elements.push(OpenElement::Object(raw_name));
        }
        Ok(())
    }

    fn is_type_arguments(&self, ctx: &ParserContext<'_>, name: &str) -> bool {
        XamlQualifiedName::parse(name).is_some_and(|qname| {
            !qname.prefix.is_empty()
                && qname.name == "TypeArguments"
                && self.lookup_namespace(ctx, &qname.prefix).as_deref()
                    == Some(xaml_language::XAML_NAMESPACE)
        })
    }

    /// Capture an `x:XData` element's inner XML as one text node.
    fn xdata(
        &mut self,
        e: &BytesStart<'_>,
        ty: XamlType,
        position: Position,
        empty: bool,
    ) -> Result<(), XamlParseError> {
        let inner = if empty {
            ""
        } else {
            let end_name = e.name().as_ref().to_vec();
            let span = match self.reader.read_to_end(QName(&end_name)) {
                Ok(span) => span,
                Err(err) => {
                    let offset = self.reader.error_position() as usize;
                    return Err(self.xml_error(err, offset));
                }
            };
            self.source
                .get(span.start as usize..span.end as usize)
                .unwrap_or_default()
        };
        self.namespaces.pop();

        let mut node = ScannerNode::new(ScannerNodeKind::Text, position);
        node.ty = Some(ty);
        node.is_xdata = true;
        node.text = XamlText::preserved(inner.trim_matches(is_whitespace_char));
        self.enqueue(node);
        Ok(())
    }

    /// Resolve, classify and order the member attributes of an object
    /// element. Updates the new frame's `xml:space` mode.
    fn classify_attributes(
        &mut self,
        ctx: &ParserContext<'_>,
        ty: &XamlType,
        element_namespace: &str,
        attributes: Vec<RawAttribute>,
    ) -> Result<Vec<ScannerNode>, XamlParseError> {
        let mut classified = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let Some(name) = XamlPropertyName::parse(&attr.name) else {
                return Err(XamlParseError::new(
                    XamlParseErrorKind::InvalidMemberName { name: attr.name },
                    attr.position,
                ));
            };
            let namespace = if name.prefix.is_empty() {
                None
            } else {
                Some(self.namespace_of(ctx, &name.prefix, attr.position)?)
            };

            let (member, class) = match (&name.owner, namespace) {
                (None, Some(ns)) if ns != element_namespace => {
                    let member = ctx
                        .resolve_directive(&ns, &name.name)
                        .unwrap_or_else(|| XamlMember::unknown_directive(name.name.as_str(), ns.as_str()));
                    (member.clone(), directive_class(&member))
                }
                (None, ns) => match ns.and_then(|ns| ctx.resolve_directive(&ns, &name.name)) {
                    Some(member) => {
                        let class = directive_class(&member);
                        (member, class)
                    }
                    None => {
                        let member = ctx
                            .resolve_property(ty, &name.name)
                            .unwrap_or_else(|| XamlMember::unknown(name.name.as_str(), ty, false));
                        let class = if ty.runtime_name_property() == Some(name.name.as_str()) {
                            AttributeClass::Name
                        } else {
                            AttributeClass::Other
                        };
                        (member, class)
                    }
                },
                (Some(owner), ns) => {
                    let ns = match ns {
                        Some(ns) => ns,
                        None => self.namespace_of(ctx, "", attr.position)?,
                    };
                    let owner = ctx.resolve_type_or_unknown(&XamlTypeName::new(ns, owner.as_str()));
                    (resolve_member(ctx, ty, &owner, &name.name), AttributeClass::Other)
                }
            };

            if &member == xaml_language::space()
                && let Some(frame) = self.stack.last_mut()
            {
                frame.xml_space_preserve = attr.value == "preserve";
            }

            let kind = if member.is_directive() {
                ScannerNodeKind::Directive
            } else {
                ScannerNodeKind::Attribute
            };
            let mut node = ScannerNode::new(kind, attr.position);
            node.value_position = attr.value_position;
            node.forces_constructor = !member.is_directive() && !member.is_attachable();
            node.text = XamlText::preserved(&attr.value);
            node.member = Some(member);
            classified.push((class, node));
        }

        classified.sort_by_key(|(class, _)| *class);
        Ok(classified.into_iter().map(|(_, node)| node).collect())
    }

    fn end_tag(&mut self, start: usize) {
        self.flush_text();
        match self.open_elements.pop() {
            Some(OpenElement::Property(_)) => {
                if let Some(frame) = self.stack.last_mut() {
                    if let Some(member) = frame.current_property.take() {
                        trace!(%member, "end property element");
                    }
                    frame.in_content = false;
                }
            }
            Some(OpenElement::Object(_)) => {
                self.stack.pop();
            }
            None => {}
        }
        self.namespaces.pop();
        let position = self.position(start);
        self.enqueue(ScannerNode::new(ScannerNodeKind::EndTag, position));
    }

    fn end_of_document(&mut self) -> Result<(), XamlParseError> {
        self.flush_text();
        if let Some(open) = self.open_elements.last() {
            return Err(XamlParseError::new(
                XamlParseErrorKind::UnexpectedEndOfDocument {
                    element: open.name().to_string(),
                },
                self.position(self.source.len()),
            ));
        }
        Ok(())
    }
}

fn directive_class(member: &XamlMember) -> AttributeClass {
    if xaml_language::is_constructor_directive(member) {
        AttributeClass::ConstructorDirective
    } else if member == xaml_language::name() {
        AttributeClass::Name
    } else {
        AttributeClass::Directive
    }
}

/// Resolve `owner.name` as set on an object of type `ty`: an instance
/// member when `ty` is (or derives from) the owner, an attachable member
/// otherwise. Unresolved names become unknown members.
fn resolve_member(ctx: &ParserContext<'_>, ty: &XamlType, owner: &XamlType, name: &str) -> XamlMember {
    if ty.can_assign_to(owner) {
        ctx.resolve_property(ty, name)
            .unwrap_or_else(|| XamlMember::unknown(name, owner, false))
    } else {
        ctx.resolve_attachable_property(owner, name)
            .unwrap_or_else(|| XamlMember::unknown(name, owner, true))
    }
}

/// Attribute-value normalization: every literal tab, newline or carriage
/// return becomes a space, a CRLF pair counting once.
fn normalize_attribute_value(raw: &str) -> String {
    normalize_newlines(raw).replace(['\t', '\n'], " ")
}

/// Byte offsets, relative to the tag start, of each attribute's name and
/// value in `tag` (the raw `<name a="..." ...>` text).
fn attribute_offsets(tag: &str) -> Vec<(usize, usize)> {
    let bytes = tag.as_bytes();
    let is_space = |b: u8| matches!(b, b' ' | b'\t' | b'\n' | b'\r');
    let mut out = Vec::new();

    let mut i = 1;
    while i < bytes.len() && !is_space(bytes[i]) && bytes[i] != b'>' && bytes[i] != b'/' {
        i += 1;
    }
    loop {
        while i < bytes.len() && is_space(bytes[i]) {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' || bytes[i] == b'/' {
            break;
        }
        let name = i;
        while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\'' {
            i += 1;
        }
        let Some(&quote) = bytes.get(i) else {
            break;
        };
        i += 1;
        let value = i;
        while i < bytes.len() && bytes[i] != quote {
            i += 1;
        }
        i += 1;
        out.push((name, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;
    use xaml_schema::MemorySchema;

    const UI: &str = "urn:ui";

    fn schema() -> MemorySchema {
        let mut schema = MemorySchema::new();
        let button = XamlType::builder(XamlTypeName::new(UI, "Button"))
            .runtime_name_property("Name")
            .build();
        schema.add_type(button.clone());
        schema.add_member(XamlMember::property("Content", &button, xaml_language::object().clone()));
        schema.add_member(XamlMember::property("Name", &button, xaml_language::string().clone()));
        schema
    }

    fn scan(source: &str) -> Vec<ScannerNode> {
        let schema = schema();
        let ctx = ParserContext::new(&schema);
        let mut scanner = XamlScanner::new(source, XamlReaderSettings::default());
        let mut out = Vec::new();
        loop {
            let node = scanner.read(&ctx).unwrap();
            if node.kind == ScannerNodeKind::None {
                break;
            }
            out.push(node);
        }
        out
    }

    fn kinds(nodes: &[ScannerNode]) -> Vec<ScannerNodeKind> {
        nodes.iter().map(|node| node.kind).collect()
    }

    #[test]
    fn test_attribute_offsets() {
        let tag = "<a x=\"1\"  y = '22'/>";
        assert_eq!(attribute_offsets(tag), vec![(3, 6), (10, 15)]);
        assert!(attribute_offsets("<a>").is_empty());
    }

    #[test]
    fn test_attribute_value_normalization() {
        assert_eq!(normalize_attribute_value("a\r\nb\tc\rd"), "a b c d");
    }

    #[test]
    fn test_prefix_definitions_precede_element() {
        use ScannerNodeKind::*;
        let nodes = scan(r#"<Button xmlns="urn:ui" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml"/>"#);
        assert_eq!(kinds(&nodes), vec![PrefixDefinition, PrefixDefinition, EmptyElement]);
        assert_eq!(nodes[0].prefix, "");
        assert_eq!(nodes[0].namespace, UI);
        assert_eq!(nodes[1].prefix, "x");
        assert_eq!(nodes[2].ty.as_ref().unwrap().local_name(), "Button");
        assert!(!nodes[2].ty.as_ref().unwrap().is_unknown());
    }

    #[test]
    fn test_attributes_are_reordered() {
        use ScannerNodeKind::*;
        let nodes = scan(
            r#"<Button xmlns="urn:ui" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml" Content="hi" x:Name="b" x:Arguments="a" x:Key="k"/>"#,
        );
        let members: Vec<_> = nodes[3..]
            .iter()
            .map(|node| node.member.as_ref().unwrap().name().to_string())
            .collect();
        assert_eq!(members, vec!["Arguments", "Key", "Name", "Content"]);
        assert_eq!(kinds(&nodes[3..]), vec![Directive, Directive, Directive, Attribute]);
        assert!(nodes[2].has_key_attribute);
        assert!(nodes[6].forces_constructor);
        assert!(!nodes[5].forces_constructor);
    }

    #[test]
    fn test_runtime_name_property_sorts_with_name() {
        let nodes = scan(r#"<Button xmlns="urn:ui" Content="hi" Name="b"/>"#);
        let members: Vec<_> = nodes[2..]
            .iter()
            .map(|node| node.member.as_ref().unwrap().name().to_string())
            .collect();
        assert_eq!(members, vec!["Name", "Content"]);
    }

    #[test]
    fn test_property_element_and_text() {
        use ScannerNodeKind::*;
        let nodes = scan("<Button xmlns=\"urn:ui\">\n  <Button.Content>  hello\n  world </Button.Content>\n</Button>");
        assert_eq!(
            kinds(&nodes),
            vec![PrefixDefinition, Element, PropertyElement, Text, EndTag, EndTag]
        );
        assert_eq!(nodes[2].member.as_ref().unwrap().name(), "Content");
        assert_eq!(nodes[3].text.text(), "hello world ");
        assert_eq!(nodes[3].position, Position::new(2, 19));
    }

    #[test]
    fn test_parentless_property_element() {
        let schema = schema();
        let ctx = ParserContext::new(&schema);
        let mut scanner = XamlScanner::new("<Button.Content xmlns=\"urn:ui\"/>", XamlReaderSettings::default());
        let err = scanner.read(&ctx).unwrap_err();
        assert!(matches!(
            err.kind,
            XamlParseErrorKind::ParentlessPropertyElement { .. }
        ));
    }

    #[test]
    fn test_undeclared_prefix() {
        let schema = schema();
        let ctx = ParserContext::new(&schema);
        let mut scanner = XamlScanner::new("<ui:Button/>", XamlReaderSettings::default());
        let err = scanner.read(&ctx).unwrap_err();
        assert_eq!(
            err.kind,
            XamlParseErrorKind::UndeclaredPrefix {
                prefix: "ui".into()
            }
        );
        assert_eq!(err.position, Position::new(1, 1));
    }

    #[test]
    fn test_xdata_is_captured_verbatim() {
        use ScannerNodeKind::*;
        let nodes = scan(
            r#"<Button xmlns="urn:ui" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml"><x:XData>
  <data a="1"><b/></data>
</x:XData></Button>"#,
        );
        assert_eq!(kinds(&nodes), vec![PrefixDefinition, PrefixDefinition, Element, Text, EndTag]);
        assert!(nodes[3].is_xdata);
        assert_eq!(nodes[3].text.text(), r#"<data a="1"><b/></data>"#);
    }

    #[test]
    fn test_type_arguments_parameterize_type() {
        let nodes = scan(
            r#"<List xmlns="urn:ui" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml" x:TypeArguments="Button"/>"#,
        );
        let ty = nodes[2].ty.as_ref().unwrap();
        assert_eq!(ty.local_name(), "List");
        assert_eq!(ty.type_arguments(), &[XamlTypeName::new(UI, "Button")]);
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_entities_and_cdata_join_one_run() {
        let nodes = scan("<Button xmlns=\"urn:ui\">a &amp; <![CDATA[<b>]]><!-- c --> d</Button>");
        assert_eq!(nodes[2].kind, ScannerNodeKind::Text);
        assert_eq!(nodes[2].text.text(), "a & <b> d");
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        let schema = schema();
        let ctx = ParserContext::new(&schema);
        let mut scanner = XamlScanner::new("<Button xmlns=\"urn:ui\">", XamlReaderSettings::default());
        let mut result = scanner.read(&ctx);
        while let Ok(node) = &result {
            assert_ne!(node.kind, ScannerNodeKind::None);
            result = scanner.read(&ctx);
        }
        assert!(result.is_err());
    }
}
