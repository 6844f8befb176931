use std::path::{Path as FsPath, PathBuf};

use hocon_parsing::{ConfigError, ConfigObject, IncludeContext, Includer, Syntax};

/// The built-in includer: loads included names from the filesystem,
/// relative to the including file (or the working directory for string
/// input). Names without a known extension try `.conf`, `.json` and
/// `.properties` and merge whatever exists; missing sources include as an
/// empty object. `url()` and `classpath()` need a custom includer and
/// report IO errors here.
pub struct DefaultIncluder;

impl DefaultIncluder {
    fn resolve_relative(&self, context: &IncludeContext, what: &str) -> PathBuf {
        let path = FsPath::new(what);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match context.relative_dir() {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    fn load(&self, context: &IncludeContext, what: &str) -> Result<ConfigObject, ConfigError> {
        let target = self.resolve_relative(context, what);
        // includes never require their target to exist
        let options = context.parse_options().with_allow_missing(true);

        let known_extension = target
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(Syntax::from_extension);

        let config = if known_extension.is_some() {
            crate::factory::parse_file(&target, &options)?
        } else {
            crate::factory::parse_file_any_syntax(&target, &options)?
        };
        Ok(config.root().clone())
    }
}

impl Includer for DefaultIncluder {
    fn include(&self, context: &IncludeContext, what: &str) -> Result<ConfigObject, ConfigError> {
        self.load(context, what)
    }

    fn include_file(
        &self,
        context: &IncludeContext,
        what: &str,
    ) -> Result<ConfigObject, ConfigError> {
        self.load(context, what)
    }

    // include_url and include_classpath keep the trait's default IO error;
    // there is no HTTP client or classpath here
}

#[cfg(test)]
mod test {
    use super::*;
    use hocon_parsing::ParseOptions;
    use hocon_lexing::Origin;

    fn context(dir: Option<&FsPath>) -> IncludeContext {
        IncludeContext::new(
            Origin::new("test"),
            dir.map(|d| d.to_path_buf()),
            ParseOptions::defaults(),
        )
    }

    #[test]
    fn relative_names_join_the_including_directory() {
        let includer = DefaultIncluder;
        let resolved =
            includer.resolve_relative(&context(Some(FsPath::new("/etc/app"))), "extra.conf");
        assert_eq!(FsPath::new("/etc/app/extra.conf"), resolved);
    }

    #[test]
    fn absolute_names_are_kept() {
        let includer = DefaultIncluder;
        let resolved =
            includer.resolve_relative(&context(Some(FsPath::new("/etc/app"))), "/opt/x.conf");
        assert_eq!(FsPath::new("/opt/x.conf"), resolved);
    }

    #[test]
    fn no_directory_falls_back_to_the_name_itself() {
        let includer = DefaultIncluder;
        let resolved = includer.resolve_relative(&context(None), "extra.conf");
        assert_eq!(FsPath::new("extra.conf"), resolved);
    }
}
