// src/utils/html.rs

use std::sync::LazyLock;

use regex::Regex;

/// Escape text for inclusion in HTML element content or a double-quoted attribute.
///
/// Student responses, names and quiz titles all go through this before they
/// are written to a page.
pub fn escape(input: &str) -> String {
    html_escape::encode_double_quoted_attribute(input).into_owned()
}

static ILLEGAL_FILENAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[\x00-\x1f\x7f/\\:*?"<>|]"#).expect("static regex")
});

/// Remove characters that are not allowed in a download file name.
/// Spaces are kept; surrounding whitespace is trimmed.
pub fn clean_filename(input: &str) -> String {
    ILLEGAL_FILENAME_CHARS
        .replace_all(input, "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralises_markup() {
        let escaped = escape("<script>alert(1)</script>");
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert_eq!(escape("a \"b\" & c"), "a &quot;b&quot; &amp; c");
    }

    #[test]
    fn clean_filename_keeps_spaces() {
        assert_eq!(
            clean_filename("responses CS101 Week 1: \"Intro\"/Basics"),
            "responses CS101 Week 1 IntroBasics"
        );
    }
}
