use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Strings that render without quotes; everything else gets JSON quoting
    /// so the rendered text parses back to the same value.
    static ref SAFE_UNQUOTED: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").unwrap();
}

/// Quotes and escapes a string as in the JSON specification.
pub fn render_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders a string unquoted when that round-trips, quoted otherwise. This
/// can quote unnecessarily as long as it never fails to quote when necessary.
pub fn render_string_unquoted_if_possible(s: &str) -> String {
    // a leading digit or hyphen would be read back as a number, and these
    // words would be read back as keywords or comments
    if s.starts_with("include")
        || s.starts_with("true")
        || s.starts_with("false")
        || s.starts_with("null")
        || s.contains("//")
    {
        return render_json_string(s);
    }

    if SAFE_UNQUOTED.is_match(s) {
        s.to_string()
    } else {
        render_json_string(s)
    }
}

/// True if the key needs quoting in a rendered path: empty, starting with a
/// non-alphabetic character, or containing anything outside `[A-Za-z0-9_-]`.
pub fn key_needs_quotes(s: &str) -> bool {
    !SAFE_UNQUOTED.is_match(s)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_string_escapes() {
        assert_eq!(r#""a\nb""#, render_json_string("a\nb"));
        assert_eq!(r#""say \"hi\"""#, render_json_string("say \"hi\""));
        assert_eq!(r#""back\\slash""#, render_json_string("back\\slash"));
        assert_eq!("\"\\u0001\"", render_json_string("\u{0001}"));
    }

    #[test]
    fn unquoted_when_safe() {
        assert_eq!("foo", render_string_unquoted_if_possible("foo"));
        assert_eq!("foo-bar_baz", render_string_unquoted_if_possible("foo-bar_baz"));
    }

    #[test]
    fn quoted_when_confusable() {
        assert_eq!("\"10\"", render_string_unquoted_if_possible("10"));
        assert_eq!("\"-x\"", render_string_unquoted_if_possible("-x"));
        assert_eq!("\"true\"", render_string_unquoted_if_possible("true"));
        assert_eq!("\"truelove\"", render_string_unquoted_if_possible("truelove"));
        assert_eq!("\"a b\"", render_string_unquoted_if_possible("a b"));
        assert_eq!("\"\"", render_string_unquoted_if_possible(""));
    }

    #[test]
    fn key_quoting_rule() {
        assert!(!key_needs_quotes("plainKey"));
        assert!(key_needs_quotes(""));
        assert!(key_needs_quotes("0key"));
        assert!(key_needs_quotes("has.dot"));
        assert!(key_needs_quotes("has space"));
    }
}
