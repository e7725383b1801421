//! Character data accumulation and XAML whitespace rules.

/// Accumulates the character data of one text run.
///
/// Unless space is preserved, every run of whitespace collapses to a single
/// space as it is pasted in. Whether the run consisted only of whitespace is
/// tracked separately so the parser can decide whether to discard it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XamlText {
    text: String,
    space_preserve: bool,
    whitespace_only: bool,
}

impl XamlText {
    /// Create an empty accumulator.
    pub fn new(space_preserve: bool) -> Self {
        Self {
            text: String::new(),
            space_preserve,
            whitespace_only: true,
        }
    }

    /// Create an accumulator holding `text` verbatim (space preserved).
    pub fn preserved(text: &str) -> Self {
        let mut this = Self::new(true);
        this.paste(text, false);
        this
    }

    /// Whether nothing has been accumulated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The accumulated text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether `xml:space="preserve"` was in effect for this run.
    #[inline]
    pub fn is_space_preserved(&self) -> bool {
        self.space_preserve
    }

    /// Whether every pasted piece consisted only of whitespace.
    #[inline]
    pub fn is_whitespace_only(&self) -> bool {
        self.whitespace_only
    }

    /// Whether the text should be parsed as a markup extension: it starts
    /// with `{` and is not escaped with a leading `{}`.
    pub fn looks_like_markup_extension(&self) -> bool {
        self.text.starts_with('{') && !self.text.starts_with("{}")
    }

    /// The text as an attribute value, with a leading `{}` escape removed.
    pub fn attribute_text(&self) -> &str {
        self.text.strip_prefix("{}").unwrap_or(&self.text)
    }

    /// Append a piece of character data.
    ///
    /// `trim_leading_whitespace` drops whitespace at the start of the piece;
    /// the scanner sets it when the piece opens a content region.
    pub fn paste(&mut self, text: &str, trim_leading_whitespace: bool) {
        let piece_is_whitespace = is_whitespace(text);

        if self.space_preserve {
            self.text.push_str(text);
        } else if piece_is_whitespace {
            if text.is_empty() {
                // nothing to add
            } else if self.text.is_empty() {
                if !trim_leading_whitespace {
                    self.text.push(' ');
                }
            } else if !self.text.ends_with(' ') {
                self.text.push(' ');
            }
        } else {
            let had_leading = text.starts_with(is_whitespace_char);
            let had_trailing = text.ends_with(is_whitespace_char);
            let existing_trailing = self.text.ends_with(' ');

            let trimming = trim_leading_whitespace && self.text.is_empty();
            if had_leading && !existing_trailing && !trimming {
                self.text.push(' ');
            }
            self.text.push_str(&collapse_whitespace(text));
            if had_trailing {
                self.text.push(' ');
            }
        }

        self.whitespace_only = self.whitespace_only && piece_is_whitespace;
    }
}

/// XAML whitespace: space, tab, line feed and carriage return.
#[inline]
pub fn is_whitespace_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Whether `text` is empty or consists only of XAML whitespace.
pub fn is_whitespace(text: &str) -> bool {
    text.chars().all(is_whitespace_char)
}

/// Remove leading XAML whitespace.
pub fn trim_leading_whitespace(text: &str) -> &str {
    text.trim_start_matches(is_whitespace_char)
}

/// Remove trailing XAML whitespace.
pub fn trim_trailing_whitespace(text: &str) -> &str {
    text.trim_end_matches(is_whitespace_char)
}

/// Normalize XML line endings: `\r\n` and lone `\r` become `\n`.
pub fn normalize_newlines(text: &str) -> std::borrow::Cow<'_, str> {
    if !text.contains('\r') {
        return std::borrow::Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    std::borrow::Cow::Owned(out)
}

/// Collapse every interior whitespace run to one space and drop leading and
/// trailing runs.
///
/// A run made of a single `\n` between two East-Asian characters is removed
/// instead of becoming a space.
pub fn collapse_whitespace(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !is_whitespace_char(c) {
            out.push(c);
            i += 1;
            continue;
        }

        let run_start = i;
        while i < chars.len() && is_whitespace_char(chars[i]) {
            i += 1;
        }

        let interior = run_start != 0 && i != chars.len();
        if !interior {
            continue;
        }

        let single_newline = i - run_start == 1 && c == '\n';
        let between_east_asian =
            is_east_asian(chars[run_start - 1]) && is_east_asian(chars[i]);
        if !(single_newline && between_east_asian) {
            out.push(' ');
        }
    }
    out
}

/// Whether `c` belongs to one of the East-Asian blocks in which line breaks
/// do not stand for word separators.
pub fn is_east_asian(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x11FF       // Hangul Jamo
        | 0x2E80..=0x2FD5     // CJK and KangXi radicals
        | 0x2FF0..=0x2FFB     // Ideographic description characters
        | 0x3040..=0x319F     // Hiragana, Katakana, Bopomofo, Hangul compatibility Jamo, Kanbun
        | 0x31A0..=0x31B7     // Bopomofo extended
        | 0x3400..=0x4DBF     // CJK unified ideographs extension A
        | 0x4E00..=0x9FFF     // CJK unified ideographs
        | 0xA000..=0xA4CF     // Yi
        | 0xAC00..=0xD7A3     // Hangul syllables
        | 0xF900..=0xFAFF     // CJK compatibility ideographs
        | 0xFF00..=0xFFEF     // Halfwidth and fullwidth forms
        | 0x20000..=0x2A6D6   // CJK unified ideographs extension B
        | 0x2F800..=0x2FA1D   // CJK compatibility supplement
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn pasted(pieces: &[&str], trim_leading: bool) -> XamlText {
        let mut text = XamlText::new(false);
        for piece in pieces {
            text.paste(piece, trim_leading);
        }
        text
    }

    #[test]
    fn test_collapse_interior_runs() {
        assert_eq!(collapse_whitespace("a   b\n\tc"), "a b c");
        assert_eq!(collapse_whitespace("  a  "), "a");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn test_paste_collapses() {
        let text = pasted(&["a   b\n\tc"], false);
        assert_eq!(text.text(), "a b c");
        assert!(!text.is_whitespace_only());
    }

    #[test]
    fn test_paste_keeps_edge_spaces_as_single_space() {
        assert_eq!(pasted(&["  hello  "], false).text(), " hello ");
        assert_eq!(pasted(&["  hello  "], true).text(), "hello ");
    }

    #[test]
    fn test_paste_joins_pieces() {
        assert_eq!(pasted(&["a ", " b"], false).text(), "a b");
        assert_eq!(pasted(&["a", "b"], false).text(), "ab");
        assert_eq!(pasted(&["a", "   ", "b"], false).text(), "a b");
    }

    #[test]
    fn test_whitespace_only_run() {
        let text = pasted(&["  \n\t "], false);
        assert!(text.is_whitespace_only());
        assert_eq!(text.text(), " ");

        let text = pasted(&["  \n\t "], true);
        assert!(text.is_whitespace_only());
        assert!(text.is_empty());
    }

    #[test]
    fn test_space_preserve_keeps_everything() {
        let mut text = XamlText::new(true);
        text.paste("  a \n  b  ", true);
        assert_eq!(text.text(), "  a \n  b  ");
        assert!(text.is_space_preserved());
    }

    #[test]
    fn test_east_asian_newline_is_removed() {
        assert_eq!(collapse_whitespace("日本\n語"), "日本語");
        // Two newlines are a real separator.
        assert_eq!(collapse_whitespace("日本\n\n語"), "日本 語");
        // A space is a real separator.
        assert_eq!(collapse_whitespace("日本 語"), "日本 語");
        // Only between two East-Asian characters.
        assert_eq!(collapse_whitespace("日本\nabc"), "日本 abc");
        assert_eq!(collapse_whitespace("abc\n語"), "abc 語");
    }

    #[test]
    fn test_markup_extension_detection() {
        assert!(XamlText::preserved("{Binding}").looks_like_markup_extension());
        assert!(!XamlText::preserved("{}{Binding}").looks_like_markup_extension());
        assert!(!XamlText::preserved("plain").looks_like_markup_extension());
        assert_eq!(XamlText::preserved("{}{literal}").attribute_text(), "{literal}");
        assert_eq!(XamlText::preserved("plain").attribute_text(), "plain");
    }

    #[test]
    fn test_trimming_helpers() {
        assert_eq!(trim_leading_whitespace(" \n a "), "a ");
        assert_eq!(trim_trailing_whitespace(" a \t\r\n"), " a");
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
        assert!(matches!(
            normalize_newlines("plain\n"),
            std::borrow::Cow::Borrowed(_)
        ));
    }
}
