use std::fmt;

use crate::origin::Origin;

/// A scalar literal recognized directly by the tokenizer.
///
/// These are not full config values; the parser converts them. Keeping them
/// here keeps the lexer independent of the value tree. Numbers carry their
/// original text so a rendered config can reproduce the input spelling.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Long(i64, String),
    Double(f64, String),
    Str(String),
}

impl Literal {
    /// The text this literal had in the input, used when a literal lands in
    /// a path expression and has to be re-read as key text.
    pub fn original_text(&self) -> String {
        match self {
            Literal::Null => "null".to_string(),
            Literal::Bool(true) => "true".to_string(),
            Literal::Bool(false) => "false".to_string(),
            Literal::Long(_, text) => text.clone(),
            Literal::Double(_, text) => text.clone(),
            Literal::Str(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Start,
    End,
    Comma,
    Equals,
    Colon,
    OpenCurly,
    CloseCurly,
    OpenSquare,
    CloseSquare,
    PlusEquals,
    Newline(Origin),
    Value(Origin, Literal),
    UnquotedText(Origin, String),
    Substitution {
        origin: Origin,
        optional: bool,
        expression: Vec<Token>,
    },
    Problem {
        origin: Origin,
        what: String,
        message: String,
        suggest_quotes: bool,
    },
    Comment(Origin, String),
}

impl Token {
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            Token::Newline(origin)
            | Token::Value(origin, _)
            | Token::UnquotedText(origin, _)
            | Token::Comment(origin, _) => Some(origin),
            Token::Substitution { origin, .. } | Token::Problem { origin, .. } => Some(origin),
            _ => None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.origin().and_then(Origin::line)
    }

    /// A "simple value" can participate in value concatenation; whitespace
    /// between two of these is preserved as an unquoted-text token.
    pub fn is_simple_value(&self) -> bool {
        matches!(
            self,
            Token::Value(..) | Token::UnquotedText(..) | Token::Substitution { .. }
        )
    }

    pub fn is_newline(&self) -> bool {
        matches!(self, Token::Newline(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Start => write!(f, "start of file"),
            Token::End => write!(f, "end of file"),
            Token::Comma => write!(f, "','"),
            Token::Equals => write!(f, "'='"),
            Token::Colon => write!(f, "':'"),
            Token::OpenCurly => write!(f, "'{{'"),
            Token::CloseCurly => write!(f, "'}}'"),
            Token::OpenSquare => write!(f, "'['"),
            Token::CloseSquare => write!(f, "']'"),
            Token::PlusEquals => write!(f, "'+='"),
            Token::Newline(_) => write!(f, "newline"),
            Token::Value(_, literal) => write!(f, "'{}'", literal.original_text()),
            Token::UnquotedText(_, text) => write!(f, "'{}'", text),
            Token::Substitution {
                optional,
                expression,
                ..
            } => {
                write!(f, "'${{")?;
                if *optional {
                    write!(f, "?")?;
                }
                for token in expression {
                    write!(f, "{}", token)?;
                }
                write!(f, "}}'")
            }
            Token::Problem { what, message, .. } => write!(f, "'{}' ({})", what, message),
            Token::Comment(..) => write!(f, "comment"),
        }
    }
}

pub trait DebugTokenExt {
    fn human_readable_string(&self) -> String;
}

impl DebugTokenExt for Token {
    /// Format the token into a nice, human readable string for
    /// troubleshooting purposes
    fn human_readable_string(&self) -> String {
        let kind = match self {
            Token::Start => "Start",
            Token::End => "End",
            Token::Comma => "Comma",
            Token::Equals => "Equals",
            Token::Colon => "Colon",
            Token::OpenCurly => "OpenCurly",
            Token::CloseCurly => "CloseCurly",
            Token::OpenSquare => "OpenSquare",
            Token::CloseSquare => "CloseSquare",
            Token::PlusEquals => "PlusEquals",
            Token::Newline(_) => "Newline",
            Token::Value(..) => "Value",
            Token::UnquotedText(..) => "UnquotedText",
            Token::Substitution { .. } => "Substitution",
            Token::Problem { .. } => "Problem",
            Token::Comment(..) => "Comment",
        };

        let line = match self.line() {
            Some(line) => line.to_string(),
            None => "-".to_string(),
        };

        format!("{:<15} {:<4} {}\n", kind, line, self)
    }
}

impl DebugTokenExt for Vec<Token> {
    /// Format the tokens into a nice, human readable string for
    /// troubleshooting purposes
    fn human_readable_string(&self) -> String {
        let mut output = String::new();

        for token in self {
            output.push_str(&token.human_readable_string());
        }

        output
    }
}
