use std::fmt;
use std::sync::Arc;

use crate::include::Includer;

/// The syntax of an input: JSON, HOCON (".conf"), or a properties-style
/// flat key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// Pedantically strict JSON: no comments, no unexpected commas, no
    /// duplicate keys in the same object.
    Json,
    /// The JSON-superset HOCON format.
    Conf,
    /// A flat `path = string` key file.
    Properties,
}

impl Syntax {
    /// The syntax conventionally associated with a file extension.
    pub fn from_extension(extension: &str) -> Option<Syntax> {
        match extension {
            "json" => Some(Syntax::Json),
            "conf" => Some(Syntax::Conf),
            "properties" => Some(Syntax::Properties),
            _ => None,
        }
    }
}

/// A set of options related to parsing. Immutable: the setters return a new
/// value.
#[derive(Clone)]
pub struct ParseOptions {
    syntax: Option<Syntax>,
    origin_description: Option<String>,
    allow_missing: bool,
    includer: Option<Arc<dyn Includer>>,
}

impl ParseOptions {
    pub fn defaults() -> ParseOptions {
        ParseOptions {
            syntax: None,
            origin_description: None,
            allow_missing: true,
            includer: None,
        }
    }

    /// Sets the file format; `None` means guess from any available filename
    /// extension and fall back to [`Syntax::Conf`].
    pub fn with_syntax(self, syntax: Option<Syntax>) -> ParseOptions {
        ParseOptions { syntax, ..self }
    }

    /// Sets a description for the thing being parsed, used as the basis for
    /// the origin of the parsed values. `None` lets the library come up
    /// with something, usually the filename.
    pub fn with_origin_description(self, origin_description: Option<String>) -> ParseOptions {
        ParseOptions {
            origin_description,
            ..self
        }
    }

    /// When true, a missing source parses as an empty object instead of
    /// raising an IO error.
    pub fn with_allow_missing(self, allow_missing: bool) -> ParseOptions {
        ParseOptions {
            allow_missing,
            ..self
        }
    }

    /// Sets an includer which customizes how `include` statements are
    /// handled.
    pub fn with_includer(self, includer: Option<Arc<dyn Includer>>) -> ParseOptions {
        ParseOptions { includer, ..self }
    }

    /// Chains the given includer in front of any existing one.
    pub fn prepend_includer(self, includer: Arc<dyn Includer>) -> ParseOptions {
        let chained = match &self.includer {
            Some(existing) => crate::include::with_fallback(includer, existing.clone()),
            None => includer,
        };
        self.with_includer(Some(chained))
    }

    /// Chains the given includer behind any existing one.
    pub fn append_includer(self, includer: Arc<dyn Includer>) -> ParseOptions {
        let chained = match &self.includer {
            Some(existing) => crate::include::with_fallback(existing.clone(), includer),
            None => includer,
        };
        self.with_includer(Some(chained))
    }

    pub fn syntax(&self) -> Option<Syntax> {
        self.syntax
    }

    pub fn origin_description(&self) -> Option<&str> {
        self.origin_description.as_deref()
    }

    pub fn allow_missing(&self) -> bool {
        self.allow_missing
    }

    pub fn includer(&self) -> Option<Arc<dyn Includer>> {
        self.includer.clone()
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("syntax", &self.syntax)
            .field("origin_description", &self.origin_description)
            .field("allow_missing", &self.allow_missing)
            .field("includer", &self.includer.as_ref().map(|_| "..."))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_allow_missing() {
        let options = ParseOptions::defaults();
        assert!(options.allow_missing());
        assert_eq!(None, options.syntax());
        assert_eq!(None, options.origin_description());
        assert!(options.includer().is_none());
    }

    #[test]
    fn setters_return_copies() {
        let defaults = ParseOptions::defaults();
        let json = defaults.clone().with_syntax(Some(Syntax::Json));

        assert_eq!(None, defaults.syntax());
        assert_eq!(Some(Syntax::Json), json.syntax());
    }

    #[test]
    fn extension_detection() {
        assert_eq!(Some(Syntax::Conf), Syntax::from_extension("conf"));
        assert_eq!(Some(Syntax::Json), Syntax::from_extension("json"));
        assert_eq!(Some(Syntax::Properties), Syntax::from_extension("properties"));
        assert_eq!(None, Syntax::from_extension("yaml"));
    }
}
