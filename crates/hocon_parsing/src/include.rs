use std::path::PathBuf;
use std::sync::Arc;

use hocon_lexing::Origin;

use crate::error::ConfigError;
use crate::options::ParseOptions;
use crate::value::ConfigObject;

/// Everything an includer gets to know about the spot where an `include`
/// statement appeared.
#[derive(Debug, Clone)]
pub struct IncludeContext {
    origin: Origin,
    relative_dir: Option<PathBuf>,
    options: ParseOptions,
}

impl IncludeContext {
    pub fn new(
        origin: Origin,
        relative_dir: Option<PathBuf>,
        options: ParseOptions,
    ) -> IncludeContext {
        IncludeContext {
            origin,
            relative_dir,
            options,
        }
    }

    /// Where the include statement itself is.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// The directory of the file doing the including, when the input came
    /// from a file at all.
    pub fn relative_dir(&self) -> Option<&std::path::Path> {
        self.relative_dir.as_deref()
    }

    /// Parse options to use for the included source: the including file's
    /// options minus its forced syntax and origin description.
    pub fn parse_options(&self) -> ParseOptions {
        self.options
            .clone()
            .with_syntax(None)
            .with_origin_description(None)
    }
}

/// Customizes how `include` statements are materialized into objects.
/// Implement this and set it on [`ParseOptions`]; the library's default
/// file-loading includer is provided as a fallback in the chain, so an
/// implementation only has to handle what it wants to override.
///
/// `Send + Sync` because independent parses may run on any thread.
pub trait Includer: Send + Sync {
    /// Handles a heuristic include with no scheme: `include "what"`. The
    /// returned object typically still has unresolved substitutions.
    /// Returning an empty object is fine; there is no "missing" result.
    fn include(&self, context: &IncludeContext, what: &str) -> Result<ConfigObject, ConfigError>;

    /// Handles `include file("what")`.
    fn include_file(
        &self,
        context: &IncludeContext,
        what: &str,
    ) -> Result<ConfigObject, ConfigError> {
        Err(ConfigError::Io {
            origin: Some(context.origin.clone()),
            message: format!("include file(\"{}\") is not supported by this includer", what),
        })
    }

    /// Handles `include url("what")`.
    fn include_url(
        &self,
        context: &IncludeContext,
        what: &str,
    ) -> Result<ConfigObject, ConfigError> {
        Err(ConfigError::Io {
            origin: Some(context.origin.clone()),
            message: format!("include url(\"{}\") is not supported by this includer", what),
        })
    }

    /// Handles `include classpath("what")`.
    fn include_classpath(
        &self,
        context: &IncludeContext,
        what: &str,
    ) -> Result<ConfigObject, ConfigError> {
        Err(ConfigError::Io {
            origin: Some(context.origin.clone()),
            message: format!(
                "include classpath(\"{}\") is not supported by this includer",
                what
            ),
        })
    }

    /// The next includer in a fallback chain, if this is a chain link.
    /// Lets [`with_fallback`] avoid chaining the same fallback twice.
    fn fallback(&self) -> Option<Arc<dyn Includer>> {
        None
    }
}

/// Chains two includers: `first` is consulted and `fallback` handles
/// whatever it reports as an IO failure. Returns `first` unchanged when the
/// fallback is already chained, so repeated chaining of the default
/// includer stays cheap.
pub fn with_fallback(first: Arc<dyn Includer>, fallback: Arc<dyn Includer>) -> Arc<dyn Includer> {
    if Arc::ptr_eq(&first, &fallback) {
        return first;
    }
    if let Some(existing) = first.fallback() {
        if Arc::ptr_eq(&existing, &fallback) {
            return first;
        }
    }
    Arc::new(ChainedIncluder { first, fallback })
}

struct ChainedIncluder {
    first: Arc<dyn Includer>,
    fallback: Arc<dyn Includer>,
}

impl ChainedIncluder {
    fn or_fallback<F>(
        &self,
        first_result: Result<ConfigObject, ConfigError>,
        try_fallback: F,
    ) -> Result<ConfigObject, ConfigError>
    where
        F: FnOnce(&Arc<dyn Includer>) -> Result<ConfigObject, ConfigError>,
    {
        match first_result {
            Err(ConfigError::Io { .. }) => try_fallback(&self.fallback),
            other => other,
        }
    }
}

impl Includer for ChainedIncluder {
    fn include(&self, context: &IncludeContext, what: &str) -> Result<ConfigObject, ConfigError> {
        self.or_fallback(self.first.include(context, what), |f| {
            f.include(context, what)
        })
    }

    fn include_file(
        &self,
        context: &IncludeContext,
        what: &str,
    ) -> Result<ConfigObject, ConfigError> {
        self.or_fallback(self.first.include_file(context, what), |f| {
            f.include_file(context, what)
        })
    }

    fn include_url(
        &self,
        context: &IncludeContext,
        what: &str,
    ) -> Result<ConfigObject, ConfigError> {
        self.or_fallback(self.first.include_url(context, what), |f| {
            f.include_url(context, what)
        })
    }

    fn include_classpath(
        &self,
        context: &IncludeContext,
        what: &str,
    ) -> Result<ConfigObject, ConfigError> {
        self.or_fallback(self.first.include_classpath(context, what), |f| {
            f.include_classpath(context, what)
        })
    }

    fn fallback(&self) -> Option<Arc<dyn Includer>> {
        Some(self.fallback.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Fixed(ConfigObject);

    impl Includer for Fixed {
        fn include(&self, _: &IncludeContext, _: &str) -> Result<ConfigObject, ConfigError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl Includer for Failing {
        fn include(&self, context: &IncludeContext, what: &str) -> Result<ConfigObject, ConfigError> {
            Err(ConfigError::Io {
                origin: Some(context.origin().clone()),
                message: format!("no such resource: {}", what),
            })
        }
    }

    fn context() -> IncludeContext {
        IncludeContext::new(Origin::new("test"), None, ParseOptions::defaults())
    }

    #[test]
    fn chain_falls_back_on_io_error() {
        let object = ConfigObject::empty(Origin::new("fixed"));
        let chain = with_fallback(Arc::new(Failing), Arc::new(Fixed(object.clone())));

        let included = chain.include(&context(), "anything").unwrap();
        assert_eq!(object, included);
    }

    #[test]
    fn chaining_the_same_fallback_twice_is_a_no_op() {
        let fallback: Arc<dyn Includer> = Arc::new(Failing);
        let first: Arc<dyn Includer> = Arc::new(Fixed(ConfigObject::empty(Origin::new("x"))));

        let chained = with_fallback(first, fallback.clone());
        let rechained = with_fallback(chained.clone(), fallback.clone());

        assert!(Arc::ptr_eq(&chained, &rechained));

        let self_chained = with_fallback(fallback.clone(), fallback.clone());
        assert!(Arc::ptr_eq(&fallback, &self_chained));
    }
}
