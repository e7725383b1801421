//! Reader settings.

/// Options for reading XAML.
#[derive(Debug, Clone, Default)]
pub struct XamlReaderSettings {
    /// Emit `LineInfo` nodes (default: false)
    pub provide_line_info: bool,

    /// Treat the document as if the root carried `xml:space="preserve"`
    /// (default: false)
    pub xml_space_preserve: bool,

    /// Drop `x:Uid` attributes on property elements instead of reporting
    /// them (default: false)
    pub ignore_uids_on_property_elements: bool,
}

impl XamlReaderSettings {
    /// Create new default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `LineInfo` nodes.
    pub fn provide_line_info(mut self, enabled: bool) -> Self {
        self.provide_line_info = enabled;
        self
    }

    /// Preserve whitespace throughout the document.
    pub fn xml_space_preserve(mut self, enabled: bool) -> Self {
        self.xml_space_preserve = enabled;
        self
    }

    /// Drop `x:Uid` on property elements.
    pub fn ignore_uids_on_property_elements(mut self, enabled: bool) -> Self {
        self.ignore_uids_on_property_elements = enabled;
        self
    }
}
