//! Prefixed names as they appear on XAML tags and attributes.

use std::fmt;

/// Whether `c` may start a XAML name.
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Whether `c` may appear after the first character of a XAML name.
#[inline]
pub fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `c` may appear in an XML namespace prefix.
#[inline]
fn is_prefix_char(c: char) -> bool {
    is_name_char(c) || c == '-' || c == '.'
}

/// Whether `text` is a valid XAML name.
pub fn is_valid_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

fn is_valid_prefix(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_prefix_char),
        _ => false,
    }
}

/// A `prefix:Name` pair. The prefix is empty when none was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XamlQualifiedName {
    pub prefix: String,
    pub name: String,
}

impl XamlQualifiedName {
    /// Split `text` at its first `:`.
    ///
    /// The name part may contain dots (`Grid.Row`); each dot-separated
    /// segment must be a valid name. Returns `None` for malformed text.
    pub fn parse(text: &str) -> Option<Self> {
        let (prefix, name) = match text.split_once(':') {
            Some((prefix, name)) => {
                if !is_valid_prefix(prefix) {
                    return None;
                }
                (prefix, name)
            }
            None => ("", text),
        };
        if !name.split('.').all(is_valid_name) {
            return None;
        }
        Some(Self {
            prefix: prefix.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for XamlQualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}:{}", self.prefix, self.name)
        }
    }
}

/// A member name: `[prefix:][Owner.]Name`.
///
/// A dotted name names its owner type explicitly, as in property elements
/// (`<Button.Content>`) and attached properties (`Grid.Row="1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XamlPropertyName {
    pub prefix: String,
    /// The owner type name, for dotted names.
    pub owner: Option<String>,
    pub name: String,
}

impl XamlPropertyName {
    /// Parse a member name. At most one dot is allowed.
    pub fn parse(text: &str) -> Option<Self> {
        let qualified = XamlQualifiedName::parse(text)?;
        let (owner, name) = match qualified.name.split_once('.') {
            Some((owner, name)) => {
                if name.contains('.') {
                    return None;
                }
                (Some(owner.to_string()), name.to_string())
            }
            None => (None, qualified.name),
        };
        Some(Self {
            prefix: qualified.prefix,
            owner,
            name,
        })
    }

    /// Whether the name carries an owner type (`Owner.Name`).
    #[inline]
    pub fn is_dotted(&self) -> bool {
        self.owner.is_some()
    }

    /// `Owner.Name` for dotted names, `Name` otherwise. No prefix.
    pub fn full_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for XamlPropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write!(f, "{}:", self.prefix)?;
        }
        f.write_str(&self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_qualified_name() {
        let name = XamlQualifiedName::parse("x:Name").unwrap();
        assert_eq!(name.prefix, "x");
        assert_eq!(name.name, "Name");
        assert_eq!(name.to_string(), "x:Name");

        let name = XamlQualifiedName::parse("Button").unwrap();
        assert_eq!(name.prefix, "");
        assert_eq!(name.to_string(), "Button");
    }

    #[test]
    fn test_qualified_name_rejects_malformed() {
        assert_eq!(XamlQualifiedName::parse(""), None);
        assert_eq!(XamlQualifiedName::parse(":Name"), None);
        assert_eq!(XamlQualifiedName::parse("x:"), None);
        assert_eq!(XamlQualifiedName::parse("1abc"), None);
        assert_eq!(XamlQualifiedName::parse("a..b"), None);
        assert_eq!(XamlQualifiedName::parse("a:b:c"), None);
    }

    #[test]
    fn test_prefix_may_contain_dashes() {
        let name = XamlQualifiedName::parse("my-lib:Widget").unwrap();
        assert_eq!(name.prefix, "my-lib");
    }

    #[test]
    fn test_property_name_dotted() {
        let name = XamlPropertyName::parse("Grid.Row").unwrap();
        assert_eq!(name.owner.as_deref(), Some("Grid"));
        assert_eq!(name.name, "Row");
        assert!(name.is_dotted());
        assert_eq!(name.full_name(), "Grid.Row");

        let name = XamlPropertyName::parse("local:Canvas.Left").unwrap();
        assert_eq!(name.prefix, "local");
        assert_eq!(name.to_string(), "local:Canvas.Left");
    }

    #[test]
    fn test_property_name_plain() {
        let name = XamlPropertyName::parse("Content").unwrap();
        assert_eq!(name.owner, None);
        assert!(!name.is_dotted());
        assert_eq!(XamlPropertyName::parse("a.b.c"), None);
    }
}
