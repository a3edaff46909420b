//! Markup escaping for user-controlled text.

use std::borrow::Cow;

/// Escape text for use in HTML element content or a quoted attribute value.
#[must_use]
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(escape("Invoice 2024"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_script_tag_is_neutralized() {
        assert_eq!(
            escape("<script>x</script>"),
            "&lt;script&gt;x&lt;/script&gt;"
        );
    }

    #[test]
    fn test_attribute_breakout_is_neutralized() {
        assert_eq!(
            escape(r#"" onerror='alert(1)'"#),
            "&quot; onerror=&#39;alert(1)&#39;"
        );
    }

    #[test]
    fn test_ampersand_first() {
        assert_eq!(escape("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_unicode_passes_through() {
        assert_eq!(escape("Arsip – 日本 <b>"), "Arsip – 日本 &lt;b&gt;");
    }
}
