//! Member descriptors: properties, attachable properties, events and
//! directives.

use std::fmt;
use std::sync::Arc;

use xaml_tokenizer::XamlTypeName;

use crate::types::XamlType;

/// What kind of member a descriptor names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// An instance property of its declaring type.
    Property,
    /// A property owned by one type and set on another (`Grid.Row`).
    Attachable,
    /// An event; set from a handler name.
    Event,
    /// A language-level member such as `x:Key`, owned by a namespace rather
    /// than a type.
    Directive,
}

/// A member as seen by the parser.
///
/// Cheap to clone. Equality compares kind, owner and name.
#[derive(Clone)]
pub struct XamlMember(Arc<MemberData>);

#[derive(Debug)]
struct MemberData {
    name: String,
    kind: MemberKind,
    /// Declaring type for properties and events; `None` for directives.
    declaring_type: Option<XamlTypeName>,
    /// Namespace of the declaring type, or the directive namespace.
    namespace: String,
    value_type: XamlType,
    unknown: bool,
    read_only: bool,
}

impl XamlMember {
    /// An instance property declared on `declaring_type`.
    pub fn property(name: impl Into<String>, declaring_type: &XamlType, value_type: XamlType) -> Self {
        Self::for_type(MemberKind::Property, name.into(), declaring_type, value_type)
    }

    /// An attachable property owned by `owner_type`.
    pub fn attachable(name: impl Into<String>, owner_type: &XamlType, value_type: XamlType) -> Self {
        Self::for_type(MemberKind::Attachable, name.into(), owner_type, value_type)
    }

    /// An event declared on `declaring_type`.
    pub fn event(name: impl Into<String>, declaring_type: &XamlType, handler_type: XamlType) -> Self {
        Self::for_type(MemberKind::Event, name.into(), declaring_type, handler_type)
    }

    /// A directive in `namespace`.
    pub fn directive(
        name: impl Into<String>,
        namespace: impl Into<String>,
        value_type: XamlType,
    ) -> Self {
        Self(Arc::new(MemberData {
            name: name.into(),
            kind: MemberKind::Directive,
            declaring_type: None,
            namespace: namespace.into(),
            value_type,
            unknown: false,
            read_only: false,
        }))
    }

    /// A member that could not be resolved on `declaring_type`.
    pub fn unknown(name: impl Into<String>, declaring_type: &XamlType, attachable: bool) -> Self {
        let kind = if attachable {
            MemberKind::Attachable
        } else {
            MemberKind::Property
        };
        let mut data = MemberData {
            name: name.into(),
            kind,
            declaring_type: Some(declaring_type.name().clone()),
            namespace: declaring_type.namespace().to_string(),
            value_type: crate::xaml_language::object().clone(),
            unknown: true,
            read_only: false,
        };
        if declaring_type.is_unknown() {
            data.value_type = XamlType::unknown(XamlTypeName::new(
                declaring_type.namespace(),
                format!("{}.{}", declaring_type.local_name(), data.name),
            ));
        }
        Self(Arc::new(data))
    }

    /// A directive name the language does not define.
    pub fn unknown_directive(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self(Arc::new(MemberData {
            name: name.into(),
            kind: MemberKind::Directive,
            declaring_type: None,
            namespace: namespace.into(),
            value_type: crate::xaml_language::object().clone(),
            unknown: true,
            read_only: false,
        }))
    }

    fn for_type(kind: MemberKind, name: String, declaring_type: &XamlType, value_type: XamlType) -> Self {
        Self(Arc::new(MemberData {
            name,
            kind,
            declaring_type: Some(declaring_type.name().clone()),
            namespace: declaring_type.namespace().to_string(),
            value_type,
            unknown: false,
            read_only: false,
        }))
    }

    /// The same member, read-only: its value can be filled but not replaced.
    pub fn into_read_only(self) -> Self {
        let data = &self.0;
        Self(Arc::new(MemberData {
            name: data.name.clone(),
            kind: data.kind,
            declaring_type: data.declaring_type.clone(),
            namespace: data.namespace.clone(),
            value_type: data.value_type.clone(),
            unknown: data.unknown,
            read_only: true,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn kind(&self) -> MemberKind {
        self.0.kind
    }

    pub fn declaring_type(&self) -> Option<&XamlTypeName> {
        self.0.declaring_type.as_ref()
    }

    pub fn namespace(&self) -> &str {
        &self.0.namespace
    }

    /// The member's value type.
    pub fn value_type(&self) -> &XamlType {
        &self.0.value_type
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.0.unknown
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.0.read_only
    }

    #[inline]
    pub fn is_directive(&self) -> bool {
        self.0.kind == MemberKind::Directive
    }

    #[inline]
    pub fn is_attachable(&self) -> bool {
        self.0.kind == MemberKind::Attachable
    }

    #[inline]
    pub fn is_event(&self) -> bool {
        self.0.kind == MemberKind::Event
    }
}

impl PartialEq for XamlMember {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.kind == other.0.kind
                && self.0.name == other.0.name
                && self.0.namespace == other.0.namespace
                && self.0.declaring_type == other.0.declaring_type)
    }
}

impl Eq for XamlMember {}

impl fmt::Debug for XamlMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XamlMember({self}")?;
        if self.0.unknown {
            f.write_str(", unknown")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for XamlMember {
    /// `Owner.Name` for type members, `{namespace}Name` for directives.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.declaring_type {
            Some(owner) => write!(f, "{}.{}", owner.name, self.0.name),
            None => write!(f, "{{{}}}{}", self.0.namespace, self.0.name),
        }
    }
}
