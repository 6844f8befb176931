use std::fmt;

use hocon_lexing::{is_whitespace, tokenize, Literal, Origin, Token};

use crate::error::ConfigError;
use crate::util;

/// A non-empty sequence of keys addressing a leaf or subtree, rendered by
/// joining the keys with `.`. Path operations never produce an empty path;
/// "no path" is `Option<Path>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    keys: Vec<String>,
}

impl Path {
    pub fn new_key(key: impl Into<String>) -> Path {
        Path {
            keys: vec![key.into()],
        }
    }

    pub(crate) fn from_keys(keys: Vec<String>) -> Path {
        assert!(!keys.is_empty(), "empty path");
        Path { keys }
    }

    /// Parses a path expression such as `a.b.c`. Quoted segments use JSON
    /// string syntax and may contain any character, including `.` and the
    /// empty string.
    pub fn parse(expression: &str) -> Result<Path, ConfigError> {
        let origin = Origin::new(format!("path expression '{}'", expression));
        let mut tokens = tokenize(&origin, expression, true);

        if !matches!(tokens.next(), Some(Token::Start)) {
            return Err(ConfigError::bug("tokenizer did not start with START"));
        }

        let mut collected = vec![];
        for token in tokens {
            match token {
                Token::End => break,
                token => collected.push(token),
            }
        }

        from_path_tokens(&collected, expression)
    }

    pub fn first(&self) -> &str {
        &self.keys[0]
    }

    /// The path minus the first key, or `None` for a single-key path.
    pub fn remainder(&self) -> Option<Path> {
        if self.keys.len() == 1 {
            None
        } else {
            Some(Path {
                keys: self.keys[1..].to_vec(),
            })
        }
    }

    pub fn last(&self) -> &str {
        self.keys.last().expect("path is never empty")
    }

    /// The path minus the last key, or `None` for a single-key path.
    pub fn parent(&self) -> Option<Path> {
        if self.keys.len() == 1 {
            None
        } else {
            Some(Path {
                keys: self.keys[..self.keys.len() - 1].to_vec(),
            })
        }
    }

    pub fn prepend(&self, prefix: &Path) -> Path {
        let mut keys = prefix.keys.clone();
        keys.extend(self.keys.iter().cloned());
        Path { keys }
    }

    pub fn append_key(&self, key: impl Into<String>) -> Path {
        let mut keys = self.keys.clone();
        keys.push(key.into());
        Path { keys }
    }

    /// The keys in `[first_index, last_index)`.
    pub fn sub_path(&self, first_index: usize, last_index: usize) -> Path {
        assert!(
            first_index < last_index && last_index <= self.keys.len(),
            "bad call to sub_path"
        );
        Path {
            keys: self.keys[first_index..last_index].to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn starts_with(&self, other: &Path) -> bool {
        self.keys.len() >= other.keys.len() && self.keys[..other.keys.len()] == other.keys[..]
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Renders with quoting, so the result parses back to the same path.
    pub fn render(&self) -> String {
        let rendered: Vec<String> = self
            .keys
            .iter()
            .map(|key| {
                if util::key_needs_quotes(key) {
                    util::render_json_string(key)
                } else {
                    key.clone()
                }
            })
            .collect();
        rendered.join(".")
    }

    /// The keys joined with `.` and no quoting; the form used when a path
    /// doubles as an environment variable name.
    pub fn join_dotted(&self) -> String {
        self.keys.join(".")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Accumulates keys front to back.
#[derive(Default)]
pub struct PathBuilder {
    keys: Vec<String>,
}

impl PathBuilder {
    pub fn append_key(&mut self, key: impl Into<String>) {
        self.keys.push(key.into());
    }

    pub fn append_path(&mut self, path: &Path) {
        self.keys.extend(path.keys.iter().cloned());
    }

    /// `None` when nothing was appended; there is no empty path.
    pub fn result(self) -> Option<Path> {
        if self.keys.is_empty() {
            None
        } else {
            Some(Path { keys: self.keys })
        }
    }
}

/// Builds a path from already-lexed tokens. Unquoted text (and the original
/// text of number/boolean/null literals) splits on `.`; quoted strings are
/// whole keys and never split. Used both by [`Path::parse`] and by the
/// document parser for the key side of a field.
pub(crate) fn from_path_tokens(tokens: &[Token], original: &str) -> Result<Path, ConfigError> {
    let bad_path = |message: String| ConfigError::BadPath {
        path: original.to_string(),
        message,
    };

    let mut builder = PathBuilder::default();
    let mut current = String::new();
    // quoted segments may be empty; unquoted ones may not
    let mut can_be_empty = false;
    let mut saw_token = false;

    let mut finish_element =
        |builder: &mut PathBuilder, current: &mut String, can_be_empty: &mut bool| {
            if !*can_be_empty {
                // whitespace around an unquoted element separates it from
                // the periods and is not part of the key
                let trimmed = current.trim_matches(|c: char| is_whitespace(c)).to_string();
                *current = trimmed;
            }
            if current.is_empty() && !*can_be_empty {
                return Err(bad_path(
                    "path has a leading, trailing, or two adjacent period '.' \
                     (use quoted \"\" empty string if you want an empty element)"
                        .to_string(),
                ));
            }
            builder.append_key(std::mem::take(current));
            *can_be_empty = false;
            Ok(())
        };

    let mut add_text = |builder: &mut PathBuilder,
                        current: &mut String,
                        can_be_empty: &mut bool,
                        text: &str| {
        let mut parts = text.split('.');
        current.push_str(parts.next().unwrap_or(""));
        for part in parts {
            finish_element(builder, current, can_be_empty)?;
            current.push_str(part);
        }
        Ok(())
    };

    for token in tokens {
        saw_token = true;
        match token {
            Token::Value(_, Literal::Str(s)) => {
                current.push_str(s);
                can_be_empty = true;
            }
            Token::Value(_, literal) => {
                // numbers and keywords keep their original spelling as text
                add_text(
                    &mut builder,
                    &mut current,
                    &mut can_be_empty,
                    &literal.original_text(),
                )?;
            }
            Token::UnquotedText(_, text) => {
                add_text(&mut builder, &mut current, &mut can_be_empty, text)?;
            }
            token => {
                return Err(bad_path(format!(
                    "Token not allowed in path expression: {}",
                    token
                )));
            }
        }
    }

    if !saw_token {
        return Err(bad_path("path expression was empty".to_string()));
    }

    finish_element(&mut builder, &mut current, &mut can_be_empty)?;

    builder
        .result()
        .ok_or_else(|| ConfigError::bug("path builder produced no path"))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(path: &Path) -> Vec<&str> {
        path.keys().iter().map(|k| k.as_str()).collect()
    }

    #[test]
    fn parses_dotted_path() {
        let path = Path::parse("a.b.c").unwrap();
        assert_eq!(vec!["a", "b", "c"], keys(&path));
    }

    #[test]
    fn parses_single_key() {
        let path = Path::parse("foo").unwrap();
        assert_eq!(vec!["foo"], keys(&path));
    }

    #[test]
    fn quoted_segment_keeps_dots() {
        let path = Path::parse("a.\"b.c\".d").unwrap();
        assert_eq!(vec!["a", "b.c", "d"], keys(&path));
    }

    #[test]
    fn quoted_empty_segment() {
        let path = Path::parse("a.\"\".b").unwrap();
        assert_eq!(vec!["a", "", "b"], keys(&path));
    }

    #[test]
    fn numeric_looking_segments_are_preserved() {
        let path = Path::parse("10.0foo").unwrap();
        assert_eq!(vec!["10", "0foo"], keys(&path));

        let path = Path::parse("3e5").unwrap();
        assert_eq!(vec!["3e5"], keys(&path));
    }

    #[test]
    fn keywords_are_plain_keys() {
        let path = Path::parse("true.null").unwrap();
        assert_eq!(vec!["true", "null"], keys(&path));
    }

    #[test]
    fn unquoted_key_may_contain_spaces() {
        let path = Path::parse("a b.c").unwrap();
        assert_eq!(vec!["a b", "c"], keys(&path));
    }

    #[test]
    fn adjacent_periods_are_invalid() {
        assert!(matches!(
            Path::parse("a..b"),
            Err(ConfigError::BadPath { .. })
        ));
        assert!(matches!(
            Path::parse(".a"),
            Err(ConfigError::BadPath { .. })
        ));
        assert!(matches!(
            Path::parse("a."),
            Err(ConfigError::BadPath { .. })
        ));
        assert!(matches!(Path::parse(""), Err(ConfigError::BadPath { .. })));
    }

    #[test]
    fn substitution_not_allowed_in_path() {
        assert!(matches!(
            Path::parse("a.${b}"),
            Err(ConfigError::BadPath { .. })
        ));
    }

    #[test]
    fn render_quotes_funky_keys() {
        let path = Path::from_keys(vec![
            "plain".to_string(),
            "with.dot".to_string(),
            "0start".to_string(),
            "".to_string(),
        ]);
        assert_eq!(r#"plain."with.dot"."0start".""#, path.render());
    }

    #[test]
    fn render_round_trips() {
        let path = Path::from_keys(vec!["a".to_string(), "b.c".to_string(), "-d".to_string()]);
        let reparsed = Path::parse(&path.render()).unwrap();
        assert_eq!(path, reparsed);
    }

    #[test]
    fn parent_and_last_round_trip() {
        let path = Path::parse("a.b.c").unwrap();
        let parent = path.parent().unwrap();

        assert_eq!("c", path.last());
        assert_eq!(path, parent.append_key(path.last()));
    }

    #[test]
    fn first_and_remainder() {
        let path = Path::parse("a.b.c").unwrap();
        assert_eq!("a", path.first());
        assert_eq!(Path::parse("b.c").unwrap(), path.remainder().unwrap());
        assert_eq!(None, Path::parse("a").unwrap().remainder());
    }

    #[test]
    fn prepend_and_sub_path() {
        let path = Path::parse("c.d").unwrap();
        let full = path.prepend(&Path::parse("a.b").unwrap());

        assert_eq!(Path::parse("a.b.c.d").unwrap(), full);
        assert_eq!(Path::parse("b.c").unwrap(), full.sub_path(1, 3));
        assert_eq!(4, full.len());
    }

    #[test]
    fn starts_with_prefix() {
        let full = Path::parse("a.b.c").unwrap();
        assert!(full.starts_with(&Path::parse("a.b").unwrap()));
        assert!(full.starts_with(&full));
        assert!(!full.starts_with(&Path::parse("a.c").unwrap()));
        assert!(!Path::parse("a").unwrap().starts_with(&full));
    }
}
