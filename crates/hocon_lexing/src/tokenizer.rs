use std::collections::VecDeque;
use std::str::Chars;

use phf::phf_set;

use crate::origin::Origin;
use crate::tokens::{Literal, Token};

/// Characters JSON allows a number to start with.
const FIRST_NUMBER_CHARS: &str = "0123456789-";

/// Characters JSON allows inside a number.
const NUMBER_CHARS: &str = "0123456789eE+-.";

/// Characters that terminate unquoted text. Everything here is reserved
/// syntax, either in JSON or in one of the HOCON extensions.
static NOT_IN_UNQUOTED_TEXT: phf::Set<char> = phf_set! {
    '$', '"', '{', '}', '[', ']', ':', '=', ',', '+', '#', '`', '^', '?',
    '!', '@', '*', '&', '\\',
};

/// Whitespace as HOCON sees it: Unicode whitespace plus a few nonbreaking
/// spaces, and the BOM which we accept as a zero-width nonbreaking space.
pub fn is_whitespace(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{2007}' | '\u{202F}' | '\u{FEFF}') || c.is_whitespace()
}

fn is_whitespace_not_newline(c: char) -> bool {
    c != '\n' && is_whitespace(c)
}

fn is_iso_control(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

fn describe_char(c: char) -> String {
    match c {
        '\n' => "newline".to_string(),
        '\t' => "tab".to_string(),
        c if is_iso_control(c) => format!("control character {:#06x}", c as u32),
        c => c.to_string(),
    }
}

/// Tokenizes the input. `allow_comments` should be false for strict JSON,
/// which has no comment syntax.
pub fn tokenize<'a>(origin: &Origin, input: &'a str, allow_comments: bool) -> Tokenizer<'a> {
    Tokenizer {
        origin: origin.clone(),
        input: input.chars(),
        pushback: Vec::with_capacity(2),
        allow_comments,
        line_number: 1,
        line_origin: origin.with_line(1),
        tokens: VecDeque::from([Token::Start]),
        saver: WhitespaceSaver::default(),
        done: false,
    }
}

/// Keeps the whitespace between two simple values so the parser can decide
/// whether to concatenate them; whitespace next to anything else is noise
/// and gets dropped.
#[derive(Default)]
struct WhitespaceSaver {
    whitespace: String,
    last_token_was_simple_value: bool,
}

impl WhitespaceSaver {
    fn add(&mut self, c: char) {
        if self.last_token_was_simple_value {
            self.whitespace.push(c);
        }
    }

    /// Called for each produced token; returns a whitespace token to emit
    /// before it, if the saved run separates two simple values.
    fn check(&mut self, token: &Token, base_origin: &Origin, line_number: usize) -> Option<Token> {
        if token.is_simple_value() {
            self.next_is_a_simple_value(base_origin, line_number)
        } else {
            self.last_token_was_simple_value = false;
            self.whitespace.clear();
            None
        }
    }

    fn next_is_a_simple_value(&mut self, base_origin: &Origin, line_number: usize) -> Option<Token> {
        if self.last_token_was_simple_value {
            if self.whitespace.is_empty() {
                None
            } else {
                Some(Token::UnquotedText(
                    base_origin.with_line(line_number),
                    std::mem::take(&mut self.whitespace),
                ))
            }
        } else {
            self.last_token_was_simple_value = true;
            self.whitespace.clear();
            None
        }
    }
}

/// A lazy token stream over an input string.
///
/// The iterator itself never fails: lexer errors are emitted as
/// [`Token::Problem`] and the stream continues after the bad spot. The first
/// token is always [`Token::Start`] and the last one [`Token::End`].
pub struct Tokenizer<'a> {
    origin: Origin,
    input: Chars<'a>,
    pushback: Vec<char>,
    allow_comments: bool,
    line_number: usize,
    line_origin: Origin,
    tokens: VecDeque<Token>,
    saver: WhitespaceSaver,
    done: bool,
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let token = self
            .tokens
            .pop_front()
            .expect("token queue should never be empty before END");

        if matches!(token, Token::End) {
            self.done = true;
        } else if self.tokens.is_empty() {
            if let Err(problem) = self.queue_next_token() {
                self.tokens.push_back(problem);
            }
        }

        Some(token)
    }
}

impl Tokenizer<'_> {
    fn next_char_raw(&mut self) -> Option<char> {
        self.pushback.pop().or_else(|| self.input.next())
    }

    fn put_back(&mut self, c: char) {
        debug_assert!(
            self.pushback.len() < 3,
            "put_back() three times, undesirable look-ahead"
        );
        self.pushback.push(c);
    }

    /// One character of lookahead decides whether `#` or `//` opens a
    /// comment; the second slash is predictably not consumed.
    fn start_of_comment(&mut self, c: char) -> bool {
        if !self.allow_comments {
            return false;
        }
        if c == '#' {
            return true;
        }
        if c != '/' {
            return false;
        }
        match self.next_char_raw() {
            Some(second) => {
                self.put_back(second);
                second == '/'
            }
            None => false,
        }
    }

    /// Gets the next char, skipping non-newline whitespace.
    fn next_char_after_whitespace(&mut self, saver: &mut WhitespaceSaver) -> Option<char> {
        loop {
            let c = self.next_char_raw()?;
            if is_whitespace_not_newline(c) {
                saver.add(c);
                continue;
            }
            return Some(c);
        }
    }

    fn problem(
        &self,
        origin: Option<Origin>,
        what: impl Into<String>,
        message: impl Into<String>,
        suggest_quotes: bool,
    ) -> Token {
        Token::Problem {
            origin: origin.unwrap_or_else(|| self.line_origin.clone()),
            what: what.into(),
            message: message.into(),
            suggest_quotes,
        }
    }

    /// One char has always been consumed, either the `#` or the first `/`,
    /// but not both slashes.
    fn pull_comment(&mut self, first_char: char) -> Token {
        if first_char == '/' {
            let discard = self.next_char_raw();
            debug_assert_eq!(discard, Some('/'), "called pull_comment but // not seen");
        }

        let mut text = String::new();
        loop {
            match self.next_char_raw() {
                None => break,
                Some('\n') => {
                    self.put_back('\n');
                    break;
                }
                Some(c) => text.push(c),
            }
        }
        Token::Comment(self.line_origin.clone(), text)
    }

    /// The rules here are intended to maximize convenience while avoiding
    /// confusion with real valid JSON: anything that parses as JSON is
    /// treated the JSON way, and otherwise we assume it's a string and let
    /// the parser sort it out.
    fn pull_unquoted_text(&mut self) -> Token {
        let origin = self.line_origin.clone();
        let mut s = String::new();

        loop {
            let c = match self.next_char_raw() {
                None => break,
                Some(c) => c,
            };

            if NOT_IN_UNQUOTED_TEXT.contains(&c) || is_whitespace(c) || self.start_of_comment(c) {
                self.put_back(c);
                break;
            }

            s.push(c);

            // true/false/null are recognized as soon as they are complete,
            // no matter what comes after them, as long as they start the
            // unquoted run
            match s.as_str() {
                "true" => return Token::Value(origin, Literal::Bool(true)),
                "false" => return Token::Value(origin, Literal::Bool(false)),
                "null" => return Token::Value(origin, Literal::Null),
                _ => {}
            }
        }

        Token::UnquotedText(origin, s)
    }

    fn pull_number(&mut self, first_char: char) -> Result<Token, Token> {
        let mut s = String::new();
        s.push(first_char);
        let mut contained_decimal_or_e = false;

        loop {
            match self.next_char_raw() {
                Some(c) if NUMBER_CHARS.contains(c) => {
                    if matches!(c, '.' | 'e' | 'E') {
                        contained_decimal_or_e = true;
                    }
                    s.push(c);
                }
                Some(c) => {
                    // the last character we looked at wasn't part of the
                    // number, put it back
                    self.put_back(c);
                    break;
                }
                None => break,
            }
        }

        if contained_decimal_or_e {
            if let Ok(value) = s.parse::<f64>() {
                return Ok(Token::Value(
                    self.line_origin.clone(),
                    Literal::Double(value, s),
                ));
            }
        } else if let Ok(value) = s.parse::<i64>() {
            return Ok(Token::Value(
                self.line_origin.clone(),
                Literal::Long(value, s),
            ));
        }

        // not a number after all; reject if it contains reserved characters,
        // otherwise decide it was an unquoted string
        for c in s.chars() {
            if NOT_IN_UNQUOTED_TEXT.contains(&c) {
                return Err(self.problem(
                    None,
                    c,
                    format!("Reserved character '{}' is not allowed outside quotes", c),
                    true,
                ));
            }
        }
        Ok(Token::UnquotedText(self.line_origin.clone(), s))
    }

    fn pull_hex_code(&mut self) -> Result<u32, Token> {
        let mut digits = String::new();
        for _ in 0..4 {
            match self.next_char_raw() {
                Some(c) => digits.push(c),
                None => {
                    return Err(self.problem(
                        None,
                        "",
                        "End of input but expecting 4 hex digits for \\uXXXX escape",
                        false,
                    ))
                }
            }
        }

        match u32::from_str_radix(&digits, 16) {
            Ok(code) => Ok(code),
            Err(_) => Err(self.problem(
                None,
                digits.clone(),
                format!(
                    "Malformed hex digits after \\u escape in string: '{}'",
                    digits
                ),
                false,
            )),
        }
    }

    fn pull_escape_sequence(&mut self, s: &mut String) -> Result<(), Token> {
        let escaped = match self.next_char_raw() {
            Some(c) => c,
            None => {
                return Err(self.problem(
                    None,
                    "",
                    "End of input but backslash in string had nothing after it",
                    false,
                ))
            }
        };

        match escaped {
            '"' => s.push('"'),
            '\\' => s.push('\\'),
            '/' => s.push('/'),
            'b' => s.push('\u{0008}'),
            'f' => s.push('\u{000C}'),
            'n' => s.push('\n'),
            'r' => s.push('\r'),
            't' => s.push('\t'),
            'u' => {
                let code = self.pull_hex_code()?;
                let decoded = if (0xD800..0xDC00).contains(&code) {
                    // high half of a surrogate pair; JSON writes astral
                    // characters as two \uXXXX escapes
                    let backslash = self.next_char_raw();
                    let u = self.next_char_raw();
                    if backslash != Some('\\') || u != Some('u') {
                        return Err(self.problem(
                            None,
                            "",
                            "Expecting a low surrogate \\uXXXX escape after a high surrogate",
                            false,
                        ));
                    }
                    let low = self.pull_hex_code()?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(self.problem(
                            None,
                            format!("{:04x}", low),
                            "Invalid low surrogate in \\uXXXX escape pair",
                            false,
                        ));
                    }
                    char::from_u32(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))
                } else {
                    char::from_u32(code)
                };

                match decoded {
                    Some(c) => s.push(c),
                    None => {
                        return Err(self.problem(
                            None,
                            format!("{:04x}", code),
                            "Malformed \\uXXXX escape in string",
                            false,
                        ))
                    }
                }
            }
            other => {
                return Err(self.problem(
                    None,
                    other,
                    format!(
                        "backslash followed by '{}', this is not a valid escape sequence \
                         (quoted strings use JSON escaping, so use double-backslash \\\\ \
                         for literal backslash)",
                        other
                    ),
                    false,
                ))
            }
        }
        Ok(())
    }

    /// We are after the opening triple quote and need to consume the closing
    /// triple. The content is raw: no escapes. A run of more than three
    /// closing quotes leaves the extras inside the string.
    fn pull_triple_quoted_string(&mut self) -> Result<String, Token> {
        let mut s = String::new();
        let mut consecutive_quotes = 0;

        loop {
            let c = self.next_char_raw();
            match c {
                Some('"') => {
                    consecutive_quotes += 1;
                    s.push('"');
                }
                _ if consecutive_quotes >= 3 => {
                    // the last three quotes end the string, the others stay
                    s.truncate(s.len() - 3);
                    if let Some(c) = c {
                        self.put_back(c);
                    }
                    break;
                }
                Some(c) => {
                    consecutive_quotes = 0;
                    if c == '\n' {
                        self.line_number += 1;
                        self.line_origin = self.origin.with_line(self.line_number);
                    }
                    s.push(c);
                }
                None => {
                    return Err(self.problem(
                        None,
                        "",
                        "End of input but triple-quoted string was still open",
                        false,
                    ))
                }
            }
        }

        Ok(s)
    }

    /// The open quote has already been consumed.
    fn pull_quoted_string(&mut self) -> Result<Token, Token> {
        let mut s = String::new();

        loop {
            let c = match self.next_char_raw() {
                Some(c) => c,
                None => {
                    return Err(self.problem(
                        None,
                        "",
                        "End of input but string quote was still open",
                        false,
                    ))
                }
            };

            match c {
                '\\' => self.pull_escape_sequence(&mut s)?,
                '"' => break,
                c if is_iso_control(c) => {
                    return Err(self.problem(
                        None,
                        c,
                        format!(
                            "JSON does not allow unescaped {} in quoted strings, \
                             use a backslash escape",
                            describe_char(c)
                        ),
                        false,
                    ))
                }
                c => s.push(c),
            }
        }

        // an empty string immediately followed by another quote switches to
        // triple-quoted mode
        if s.is_empty() {
            if let Some(third) = self.next_char_raw() {
                if third == '"' {
                    s = self.pull_triple_quoted_string()?;
                } else {
                    self.put_back(third);
                }
            }
        }

        Ok(Token::Value(self.line_origin.clone(), Literal::Str(s)))
    }

    /// The initial `+` has already been consumed.
    fn pull_plus_equals(&mut self) -> Result<Token, Token> {
        match self.next_char_raw() {
            Some('=') => Ok(Token::PlusEquals),
            other => {
                let what = other.map(describe_char).unwrap_or_default();
                Err(self.problem(
                    None,
                    what.clone(),
                    format!("'+' not followed by =, '{}' not allowed after '+'", what),
                    true,
                ))
            }
        }
    }

    /// The initial `$` has already been consumed. The inner token run is
    /// re-tokenized with the same rules; even nested substitutions get
    /// through here, the parser validates them.
    fn pull_substitution(&mut self) -> Result<Token, Token> {
        let origin = self.line_origin.clone();

        match self.next_char_raw() {
            Some('{') => {}
            other => {
                let what = other.map(describe_char).unwrap_or_default();
                return Err(self.problem(
                    None,
                    what.clone(),
                    format!("'$' not followed by {{, '{}' not allowed after '$'", what),
                    true,
                ));
            }
        }

        let optional = match self.next_char_raw() {
            Some('?') => true,
            Some(c) => {
                self.put_back(c);
                false
            }
            None => false,
        };

        let mut saver = WhitespaceSaver::default();
        let mut expression = vec![];

        loop {
            let token = self.pull_next_token(&mut saver)?;
            match token {
                Token::CloseCurly => break,
                Token::End => {
                    return Err(self.problem(
                        Some(origin),
                        "",
                        "Substitution ${ was not closed with a }",
                        false,
                    ))
                }
                token => {
                    if let Some(whitespace) = saver.check(&token, &origin, self.line_number) {
                        expression.push(whitespace);
                    }
                    expression.push(token);
                }
            }
        }

        Ok(Token::Substitution {
            origin,
            optional,
            expression,
        })
    }

    fn pull_next_token(&mut self, saver: &mut WhitespaceSaver) -> Result<Token, Token> {
        let c = match self.next_char_after_whitespace(saver) {
            Some(c) => c,
            None => return Ok(Token::End),
        };

        if c == '\n' {
            // newline tokens have the just-ended line number
            let line = Token::Newline(self.line_origin.clone());
            self.line_number += 1;
            self.line_origin = self.origin.with_line(self.line_number);
            return Ok(line);
        }

        if self.start_of_comment(c) {
            return Ok(self.pull_comment(c));
        }

        match c {
            '"' => self.pull_quoted_string(),
            '$' => self.pull_substitution(),
            ':' => Ok(Token::Colon),
            ',' => Ok(Token::Comma),
            '=' => Ok(Token::Equals),
            '{' => Ok(Token::OpenCurly),
            '}' => Ok(Token::CloseCurly),
            '[' => Ok(Token::OpenSquare),
            ']' => Ok(Token::CloseSquare),
            '+' => self.pull_plus_equals(),
            c if FIRST_NUMBER_CHARS.contains(c) => self.pull_number(c),
            c if NOT_IN_UNQUOTED_TEXT.contains(&c) => Err(self.problem(
                None,
                c,
                format!("Reserved character '{}' is not allowed outside quotes", c),
                true,
            )),
            c => {
                self.put_back(c);
                Ok(self.pull_unquoted_text())
            }
        }
    }

    fn queue_next_token(&mut self) -> Result<(), Token> {
        let mut saver = std::mem::take(&mut self.saver);
        let pulled = self.pull_next_token(&mut saver);

        let result = match pulled {
            Ok(token) => {
                let base_origin = self.origin.clone();
                if let Some(whitespace) = saver.check(&token, &base_origin, self.line_number) {
                    self.tokens.push_back(whitespace);
                }
                self.tokens.push_back(token);
                Ok(())
            }
            Err(problem) => Err(problem),
        };

        self.saver = saver;
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokens::DebugTokenExt;
    use pretty_assertions::assert_eq;

    fn dedent(text: &str) -> String {
        let mut text = textwrap::dedent(text).trim().to_string();
        text.push('\n');
        text
    }

    fn scan(input: &str) -> Vec<Token> {
        let origin = Origin::new("test");
        tokenize(&origin, input, true).collect()
    }

    fn scan_json(input: &str) -> Vec<Token> {
        let origin = Origin::new("test");
        tokenize(&origin, input, false).collect()
    }

    #[test]
    fn smoke_test() {
        let tokens = scan(&dedent(
            r#"
            // header comment
            foo = 10
            bar : "hello"
            baz {
                enabled = true
            }
            "#,
        ));

        assert_eq!(
            dedent(
                r#"
                Start           -    start of file
                Comment         1    comment
                Newline         1    newline
                UnquotedText    2    'foo'
                Value           2    '10'
                Newline         2    newline
                UnquotedText    3    'bar'
                Colon           -    ':'
                Value           3    'hello'
                Newline         3    newline
                UnquotedText    4    'baz'
                OpenCurly       -    '{'
                Newline         4    newline
                UnquotedText    5    'enabled'
                Equals          -    '='
                Value           5    'true'
                Newline         5    newline
                CloseCurly      -    '}'
                Newline         6    newline
                End             -    end of file
                "#
            ),
            tokens.human_readable_string(),
        );
    }

    #[test]
    fn whitespace_between_simple_values_is_preserved() {
        let tokens = scan("a = foo  bar\n");

        // "foo" and "bar" are both simple values, so the two spaces between
        // them come through as an unquoted-text token; the whitespace around
        // '=' does not
        assert_eq!(
            dedent(
                r#"
                Start           -    start of file
                UnquotedText    1    'a'
                Equals          -    '='
                UnquotedText    1    'foo'
                UnquotedText    1    '  '
                UnquotedText    1    'bar'
                Newline         1    newline
                End             -    end of file
                "#
            ),
            tokens.human_readable_string(),
        );
    }

    #[test]
    fn boolean_and_null_literals() {
        let tokens = scan("true false null truefoo");

        let values: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Value(_, literal) => Some(literal.clone()),
                _ => None,
            })
            .collect();

        // "truefoo" still starts a "true" literal; the leftover text becomes
        // its own unquoted token
        assert_eq!(
            vec![
                Literal::Bool(true),
                Literal::Bool(false),
                Literal::Null,
                Literal::Bool(true),
            ],
            values,
        );
        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::UnquotedText(_, s) if s == "foo")));
    }

    #[test]
    fn numbers() {
        let tokens = scan("a = 42\nb = -7\nc = 3.14\nd = 1e6\n");

        let values: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Value(_, literal) => Some(literal.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(
            vec![
                Literal::Long(42, "42".to_string()),
                Literal::Long(-7, "-7".to_string()),
                Literal::Double(3.14, "3.14".to_string()),
                Literal::Double(1e6, "1e6".to_string()),
            ],
            values,
        );
    }

    #[test]
    fn number_that_is_not_a_number_becomes_unquoted_text() {
        let tokens = scan("v = 1.2.3\n");

        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::UnquotedText(_, s) if s == "1.2.3")));
    }

    #[test]
    fn quoted_string_escapes() {
        let tokens = scan(r#"s = "a\nb\t\"c\"A""#);

        let strings: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Value(_, Literal::Str(s)) => Some(s.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(vec!["a\nb\t\"c\"A".to_string()], strings);
    }

    #[test]
    fn triple_quoted_string() {
        // four closing quotes: the first stays in the string, the final
        // three terminate it
        let tokens = scan("s = \"\"\"a\n\"b\"\"\"\"\n");

        let strings: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Value(_, Literal::Str(s)) => Some(s.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(vec!["a\n\"b\"".to_string()], strings);
    }

    #[test]
    fn empty_quoted_string_is_not_triple_quoted() {
        let tokens = scan("s = \"\"\n");

        let strings: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Value(_, Literal::Str(s)) => Some(s.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(vec![String::new()], strings);
    }

    #[test]
    fn substitution_tokens() {
        let tokens = scan("a = ${foo.bar}\nb = ${?opt}\n");

        let subs: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Substitution {
                    optional,
                    expression,
                    ..
                } => Some((*optional, expression.len())),
                _ => None,
            })
            .collect();

        assert_eq!(vec![(false, 1), (true, 1)], subs);
    }

    #[test]
    fn unclosed_substitution_is_a_problem() {
        let tokens = scan("a = ${foo\n");

        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::Problem { message, .. }
                if message.contains("was not closed"))));
    }

    #[test]
    fn plus_equals_token() {
        let tokens = scan("xs += 1\n");
        assert!(tokens.iter().any(|t| matches!(t, Token::PlusEquals)));
    }

    #[test]
    fn lone_plus_is_a_problem() {
        let tokens = scan("a = 1 + 2\n");

        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::Problem { suggest_quotes, .. } if *suggest_quotes)));
    }

    #[test]
    fn reserved_character_is_a_problem() {
        let tokens = scan("a = ?what\n");

        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::Problem { message, .. }
                if message.contains("Reserved character '?'"))));
    }

    #[test]
    fn comments_disabled_in_json_mode() {
        let tokens = scan_json("{\"a\": 1}\n");
        assert!(!tokens.iter().any(|t| matches!(t, Token::Comment(..))));

        // '#' is reserved, so without comment support it surfaces as a
        // problem token instead
        let tokens = scan_json("{\"a\": 1} # trailing\n");
        assert!(tokens.iter().any(|t| matches!(t, Token::Problem { .. })));
    }

    #[test]
    fn hash_and_double_slash_comments() {
        let tokens = scan("# one\n// two\na = 1\n");

        let comments: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Comment(_, text) => Some(text.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(vec![" one".to_string(), " two".to_string()], comments);
    }

    #[test]
    fn stream_is_start_to_end_exactly_once() {
        let mut tokens = tokenize(&Origin::new("test"), "a = 1", true);

        assert_eq!(Some(Token::Start), tokens.next());
        let rest: Vec<_> = tokens.by_ref().collect();
        assert!(matches!(rest.last(), Some(Token::End)));
        assert_eq!(None, tokens.next());
    }
}
