use thiserror::Error;

use hocon_lexing::Origin;

/// One problem found during validation; an aggregate of these travels in
/// [`ConfigError::ValidationFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProblem {
    pub path: String,
    pub origin: Origin,
    pub problem: String,
}

/// Every failure the library reports. Failures that happen at a known spot
/// in the input carry an [`Origin`] and render it as
/// `"{description}: {line}: {message}"`.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Malformed input text.
    #[error("{}", at_origin(.origin, .message))]
    Parse { origin: Origin, message: String },

    /// A substitution did not resolve to a value; raised by strict
    /// resolution, a parse-category error.
    #[error("{}", unresolved_message(.origin, .detail))]
    UnresolvedSubstitution { origin: Origin, detail: String },

    /// An includer or reader failure.
    #[error("{}", at_origin_opt(.origin, .message))]
    Io {
        origin: Option<Origin>,
        message: String,
    },

    /// The path was never set to anything, not even null.
    #[error("No configuration setting found for key '{path}'")]
    Missing { path: String },

    /// The path is set to null where a non-null value was expected.
    #[error("{}", null_message(.origin, .path, .expected))]
    Null {
        origin: Origin,
        path: String,
        expected: String,
    },

    /// A typed accessor found a different value type.
    #[error("{}", wrong_type_message(.origin, .path, .expected, .actual))]
    WrongType {
        origin: Origin,
        path: String,
        expected: String,
        actual: String,
    },

    /// Malformed path expression. Try putting double quotes around path
    /// elements that contain "special" characters.
    #[error("Invalid path '{path}': {message}")]
    BadPath { path: String, message: String },

    /// The value cannot be coerced by a typed accessor.
    #[error("{}", bad_value_message(.origin, .path, .message))]
    BadValue {
        origin: Origin,
        path: String,
        message: String,
    },

    /// An accessor was called on a tree that still contains substitutions;
    /// call `resolve()` first. Always a bug in the calling code.
    #[error("{message}")]
    NotResolved { message: String },

    /// Validation found problems; the message lists all of them.
    #[error("{}", render_problems(.problems))]
    ValidationFailed { problems: Vec<ValidationProblem> },

    /// An invariant of the library was violated, or the runtime environment
    /// is broken. Never meant to be caught.
    #[error("bug in library or broken environment: {message}")]
    BugOrBroken { message: String },
}

impl ConfigError {
    pub(crate) fn bug(message: impl Into<String>) -> ConfigError {
        ConfigError::BugOrBroken {
            message: message.into(),
        }
    }

    /// The origin of the failure, when the failure relates to a spot in
    /// some input. Never assume this returns `Some`.
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            ConfigError::Parse { origin, .. }
            | ConfigError::UnresolvedSubstitution { origin, .. }
            | ConfigError::Null { origin, .. }
            | ConfigError::WrongType { origin, .. }
            | ConfigError::BadValue { origin, .. } => Some(origin),
            ConfigError::Io { origin, .. } => origin.as_ref(),
            _ => None,
        }
    }
}

fn at_origin(origin: &Origin, message: &str) -> String {
    format!("{}: {}", origin, message)
}

fn at_origin_opt(origin: &Option<Origin>, message: &str) -> String {
    match origin {
        Some(origin) => at_origin(origin, message),
        None => message.to_string(),
    }
}

fn unresolved_message(origin: &Origin, detail: &str) -> String {
    at_origin(
        origin,
        &format!("Could not resolve substitution to a value: ${{{}}}", detail),
    )
}

fn null_message(origin: &Origin, path: &str, expected: &str) -> String {
    at_origin(
        origin,
        &format!(
            "Configuration key '{}' is set to null but expected {}",
            path, expected
        ),
    )
}

fn wrong_type_message(origin: &Origin, path: &str, expected: &str, actual: &str) -> String {
    at_origin(
        origin,
        &format!("{} has type {} rather than {}", path, actual, expected),
    )
}

fn bad_value_message(origin: &Origin, path: &str, message: &str) -> String {
    at_origin(origin, &format!("Invalid value at '{}': {}", path, message))
}

fn render_problems(problems: &[ValidationProblem]) -> String {
    let rendered: Vec<String> = problems
        .iter()
        .map(|p| format!("{}: {}: {}", p.origin.description(), p.path, p.problem))
        .collect();
    rendered.join(", ")
}
