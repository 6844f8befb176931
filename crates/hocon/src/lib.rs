//
// Public facade for the HOCON configuration library.
//
// A `Config` wraps a tree of immutable config values parsed from HOCON,
// JSON or properties input. Reads go through dotted path expressions;
// `resolve()` replaces `${path}` substitutions; `with_fallback` layers
// configs over each other.
//
//     let config = hocon::parse_str("a.b = 1", &ParseOptions::defaults())?
//         .resolve(&ResolveOptions::defaults())?;
//     let n = config.get_int("a.b")?;
//

mod factory;
mod includer;

pub use crate::factory::{
    empty, empty_with_description, parse_file, parse_file_any_syntax, parse_path_map,
    parse_properties_str, parse_str, system_environment,
};
pub use crate::includer::DefaultIncluder;

pub use hocon_formatting::{render, RenderOptions};
pub use hocon_lexing::Origin;
pub use hocon_parsing::{
    ConfigError, ConfigList, ConfigObject, ConfigValue, IncludeContext, Includer, ParseOptions,
    Path, ResolveOptions, ResolveStatus, Syntax, ValidationProblem, ValueType,
};

/// An immutable configuration tree with path-based accessors. Every
/// "mutating" operation returns a new `Config`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: ConfigObject,
}

impl Config {
    pub fn from_root(root: ConfigObject) -> Config {
        Config { root }
    }

    /// The underlying root object, keyed by plain strings rather than
    /// paths.
    pub fn root(&self) -> &ConfigObject {
        &self.root
    }

    pub fn origin(&self) -> &Origin {
        self.root.origin()
    }

    pub fn is_resolved(&self) -> bool {
        self.root.resolve_status() == ResolveStatus::Resolved
    }

    /// Resolves every `${path}` substitution, returning a new config.
    /// Idempotent. Environment variables are consulted for missing paths
    /// unless the options turn that off.
    pub fn resolve(&self, options: &ResolveOptions) -> Result<Config, ConfigError> {
        let root = hocon_parsing::resolve(&self.root, options, factory::env_snapshot())?;
        Ok(Config { root })
    }

    /// The raw value at `path`. Fails with *Missing* when the path is
    /// absent and *NotResolved* when unresolved substitutions are in the
    /// way; an explicit `null` is returned as a null value.
    pub fn get_value(&self, path: &str) -> Result<ConfigValue, ConfigError> {
        let path = Path::parse(path)?;
        self.find(&path, None)
    }

    pub fn has_path(&self, path: &str) -> Result<bool, ConfigError> {
        let path = Path::parse(path)?;
        match self.find(&path, None) {
            Ok(_) => Ok(true),
            Err(ConfigError::Missing { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn get_is_null(&self, path: &str) -> Result<bool, ConfigError> {
        Ok(matches!(self.get_value(path)?, ConfigValue::Null(_)))
    }

    pub fn get_bool(&self, path: &str) -> Result<bool, ConfigError> {
        let parsed = Path::parse(path)?;
        match self.find(&parsed, Some(ValueType::Boolean))? {
            ConfigValue::Boolean(_, b) => Ok(b),
            other => Err(unexpected_kind(&other)),
        }
    }

    /// A 64-bit integer; whole doubles are accepted, fractional ones are a
    /// *WrongType* and out-of-range ones a *BadValue*.
    pub fn get_int(&self, path: &str) -> Result<i64, ConfigError> {
        let parsed = Path::parse(path)?;
        match self.find(&parsed, Some(ValueType::Number))? {
            ConfigValue::Number(origin, number) => {
                if !number.is_whole() {
                    return Err(ConfigError::WrongType {
                        origin,
                        path: parsed.render(),
                        expected: "64-bit integer".to_string(),
                        actual: format!("double {}", number.original_text()),
                    });
                }
                number.as_i64().ok_or_else(|| ConfigError::BadValue {
                    origin,
                    path: parsed.render(),
                    message: format!(
                        "{} cannot be represented as a 64-bit integer",
                        number.original_text()
                    ),
                })
            }
            other => Err(unexpected_kind(&other)),
        }
    }

    pub fn get_double(&self, path: &str) -> Result<f64, ConfigError> {
        let parsed = Path::parse(path)?;
        match self.find(&parsed, Some(ValueType::Number))? {
            ConfigValue::Number(_, number) => Ok(number.as_f64()),
            other => Err(unexpected_kind(&other)),
        }
    }

    pub fn get_string(&self, path: &str) -> Result<String, ConfigError> {
        let parsed = Path::parse(path)?;
        match self.find(&parsed, Some(ValueType::String))? {
            ConfigValue::String(_, s) => Ok(s),
            other => Err(unexpected_kind(&other)),
        }
    }

    pub fn get_list(&self, path: &str) -> Result<Vec<ConfigValue>, ConfigError> {
        let parsed = Path::parse(path)?;
        match self.find(&parsed, Some(ValueType::List))? {
            ConfigValue::List(list) => Ok(list.elements().to_vec()),
            other => Err(unexpected_kind(&other)),
        }
    }

    pub fn get_object(&self, path: &str) -> Result<ConfigObject, ConfigError> {
        let parsed = Path::parse(path)?;
        match self.find(&parsed, Some(ValueType::Object))? {
            ConfigValue::Object(object) => Ok(object),
            other => Err(unexpected_kind(&other)),
        }
    }

    pub fn get_config(&self, path: &str) -> Result<Config, ConfigError> {
        Ok(Config::from_root(self.get_object(path)?))
    }

    /// Merges this config over the given fallback: keys present here win,
    /// objects merge recursively.
    pub fn with_fallback(&self, other: &Config) -> Config {
        let merged = ConfigValue::Object(self.root.clone())
            .with_fallback(&ConfigValue::Object(other.root.clone()));
        match merged {
            ConfigValue::Object(root) => Config { root },
            _ => unreachable!("merging two objects always yields an object"),
        }
    }

    /// Keeps only the given path, or nothing when it's absent.
    pub fn with_only_path(&self, path: &str) -> Result<Config, ConfigError> {
        let path = Path::parse(path)?;
        Ok(Config {
            root: self.root.with_only_path(&path),
        })
    }

    /// Removes the given path; absent paths are a no-op.
    pub fn without_path(&self, path: &str) -> Result<Config, ConfigError> {
        let path = Path::parse(path)?;
        Ok(Config {
            root: self.root.without_path(&path),
        })
    }

    /// Sets `path` to `value`, replacing non-object ancestors as needed.
    pub fn with_value(&self, path: &str, value: &ConfigValue) -> Result<Config, ConfigError> {
        let path = Path::parse(path)?;
        Ok(Config {
            root: self.root.with_value(&path, value),
        })
    }

    pub fn render(&self, options: &RenderOptions) -> String {
        render(&ConfigValue::Object(self.root.clone()), options)
    }

    /// Walks the path one key at a time, reporting the most specific error
    /// it can: *Missing* for absent keys, *NotResolved* when a deferred
    /// node is in the way, *Null*/*WrongType* when a typed expectation is
    /// not met at the leaf.
    fn find(&self, path: &Path, expected: Option<ValueType>) -> Result<ConfigValue, ConfigError> {
        let keys = path.keys();
        let mut current = &self.root;

        for (i, key) in keys.iter().enumerate() {
            let child = match current.get(key) {
                Some(child) => child,
                None => {
                    return Err(ConfigError::Missing {
                        path: path.render(),
                    })
                }
            };

            if i + 1 == keys.len() {
                return check_leaf(child, path, expected);
            }

            match child {
                ConfigValue::Object(object) => current = object,
                child if child.value_type().is_none() => {
                    return Err(not_resolved(path));
                }
                _ => {
                    return Err(ConfigError::Missing {
                        path: path.render(),
                    })
                }
            }
        }

        unreachable!("paths are never empty")
    }
}

fn check_leaf(
    value: &ConfigValue,
    path: &Path,
    expected: Option<ValueType>,
) -> Result<ConfigValue, ConfigError> {
    let actual = match value.value_type() {
        Some(actual) => actual,
        None => return Err(not_resolved(path)),
    };

    if let Some(expected) = expected {
        if actual == ValueType::Null {
            return Err(ConfigError::Null {
                origin: value.origin().clone(),
                path: path.render(),
                expected: expected.name().to_string(),
            });
        }
        if actual != expected {
            return Err(ConfigError::WrongType {
                origin: value.origin().clone(),
                path: path.render(),
                expected: expected.name().to_string(),
                actual: actual.name().to_string(),
            });
        }
    }

    Ok(value.clone())
}

fn not_resolved(path: &Path) -> ConfigError {
    ConfigError::NotResolved {
        message: format!(
            "substitutions have not been resolved; call resolve() before reading path '{}'",
            path.render()
        ),
    }
}

fn unexpected_kind(value: &ConfigValue) -> ConfigError {
    ConfigError::BugOrBroken {
        message: format!(
            "find() returned a value of an unexpected kind: {}",
            value.type_description()
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Config {
        parse_str(input, &ParseOptions::defaults()).expect("failed to parse")
    }

    fn parse_resolved(input: &str) -> Config {
        parse(input)
            .resolve(&ResolveOptions::no_system())
            .expect("failed to resolve")
    }

    #[test]
    fn dotted_keys_expand() {
        let config = parse("a.b.c = 1");
        assert_eq!(1, config.get_int("a.b.c").unwrap());
    }

    #[test]
    fn fallback_merge() {
        let base = parse("a = { x = 1, y = 2 }");
        let fallback = parse("a = { y = 9, z = 3 }\nw = 4");

        let merged = base.with_fallback(&fallback);
        assert_eq!(1, merged.get_int("a.x").unwrap());
        assert_eq!(2, merged.get_int("a.y").unwrap());
        assert_eq!(3, merged.get_int("a.z").unwrap());
        assert_eq!(4, merged.get_int("w").unwrap());
    }

    #[test]
    fn merge_identity_with_empty() {
        let config = parse("a = 1");
        assert_eq!(config, empty().with_fallback(&config));
        assert_eq!(config, config.with_fallback(&empty()));
    }

    #[test]
    fn merge_is_associative() {
        let a = parse("k = 1\nonly-a = 1");
        let b = parse("k = 2\nonly-b = 2");
        let c = parse("k = 3\nonly-c = 3");

        let left = a.with_fallback(&b).with_fallback(&c);
        let right = a.with_fallback(&b.with_fallback(&c));
        assert_eq!(left, right);
    }

    #[test]
    fn self_reference_append() {
        let config = parse_resolved("path = \"/bin\"\npath = ${path}\":/usr/bin\"");
        assert_eq!("/bin:/usr/bin", config.get_string("path").unwrap());
    }

    #[test]
    fn triple_quoted_string() {
        let config = parse("s = \"\"\"a\n\"b\"\"\"\"");
        assert_eq!("a\n\"b\"", config.get_string("s").unwrap());
    }

    #[test]
    fn plus_equals_appends() {
        let config = parse_resolved("xs = [1]\nxs += 2\nxs += 3");
        let xs = config.get_list("xs").unwrap();
        assert_eq!(3, xs.len());
    }

    #[test]
    fn optional_missing_substitution_leaves_no_key() {
        let config = parse_resolved("host = ${?HOST}\nport = 80");
        assert_eq!(80, config.get_int("port").unwrap());
        assert!(!config.has_path("host").unwrap());
    }

    #[test]
    fn missing_substitution_is_an_unresolved_error() {
        let result = parse("host = ${HOST}").resolve(&ResolveOptions::no_system());
        assert!(matches!(
            result,
            Err(ConfigError::UnresolvedSubstitution { .. })
        ));
    }

    #[test]
    fn resolve_is_idempotent() {
        let once = parse_resolved("a = 1\nb = ${a}");
        let twice = once.resolve(&ResolveOptions::no_system()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn typed_accessors() {
        let config = parse(
            r#"
            yes = true
            count = 3
            ratio = 0.5
            big = 1e3
            name = "joe"
            xs = [1, 2]
            sub { a = 1 }
            nothing = null
            "#,
        );

        assert!(config.get_bool("yes").unwrap());
        assert_eq!(3, config.get_int("count").unwrap());
        assert_eq!(0.5, config.get_double("ratio").unwrap());
        assert_eq!(1000, config.get_int("big").unwrap());
        assert_eq!(3.0, config.get_double("count").unwrap());
        assert_eq!("joe", config.get_string("name").unwrap());
        assert_eq!(2, config.get_list("xs").unwrap().len());
        assert_eq!(1, config.get_config("sub").unwrap().get_int("a").unwrap());
        assert!(config.get_is_null("nothing").unwrap());
    }

    #[test]
    fn missing_path_error() {
        let config = parse("a = 1");
        assert!(matches!(
            config.get_int("nope"),
            Err(ConfigError::Missing { .. })
        ));
        assert!(matches!(
            config.get_int("a.deeper"),
            Err(ConfigError::Missing { .. })
        ));
        assert!(!config.has_path("nope").unwrap());
    }

    #[test]
    fn wrong_type_error() {
        let config = parse("a = \"text\"\nfrac = 1.5");
        match config.get_int("a") {
            Err(ConfigError::WrongType {
                path,
                expected,
                actual,
                ..
            }) => {
                assert_eq!("a", path);
                assert_eq!("number", expected);
                assert_eq!("string", actual);
            }
            other => panic!("expected wrong type error, got {:?}", other),
        }

        assert!(matches!(
            config.get_int("frac"),
            Err(ConfigError::WrongType { .. })
        ));
    }

    #[test]
    fn null_where_value_expected() {
        let config = parse("a = null");
        assert!(matches!(
            config.get_int("a"),
            Err(ConfigError::Null { .. })
        ));
        // raw reads return the null value itself
        assert!(matches!(
            config.get_value("a").unwrap(),
            ConfigValue::Null(_)
        ));
    }

    #[test]
    fn reading_an_unresolved_path_is_not_resolved() {
        let config = parse("a = ${b}\nb = 1");
        assert!(matches!(
            config.get_int("a"),
            Err(ConfigError::NotResolved { .. })
        ));
    }

    #[test]
    fn bad_path_is_reported() {
        let config = parse("a = 1");
        assert!(matches!(
            config.get_int("a..b"),
            Err(ConfigError::BadPath { .. })
        ));
    }

    #[test]
    fn with_only_path_preserves_the_value() {
        let config = parse_resolved("a { b = 42, c = 7 }\nd = 1");
        let only = config.with_only_path("a.b").unwrap();

        assert_eq!(
            config.get_value("a.b").unwrap(),
            only.get_value("a.b").unwrap(),
        );
        assert!(!only.has_path("a.c").unwrap());
        assert!(!only.has_path("d").unwrap());
    }

    #[test]
    fn without_path_removes_the_value() {
        let config = parse_resolved("a { b = 42, c = 7 }");
        let removed = config.without_path("a.b").unwrap();

        assert!(!removed.has_path("a.b").unwrap());
        assert_eq!(7, removed.get_int("a.c").unwrap());
    }

    #[test]
    fn with_value_sets_a_path() {
        let config = parse("a = 1");
        let origin = Origin::new("test");
        let updated = config
            .with_value("b.c", &ConfigValue::String(origin, "x".to_string()))
            .unwrap();

        assert_eq!("x", updated.get_string("b.c").unwrap());
        assert_eq!(1, updated.get_int("a").unwrap());
    }

    #[test]
    fn render_round_trips_through_parsing() {
        let config = parse_resolved(
            r#"
            server {
                host = "localhost"
                port = 8080
                tags = [a, b]
            }
            debug = false
            "#,
        );

        let as_json = config.render(&RenderOptions::concise());
        let reparsed = parse_str(
            &as_json,
            &ParseOptions::defaults().with_syntax(Some(Syntax::Json)),
        )
        .unwrap();
        assert_eq!(config, reparsed);

        let as_conf = config.render(&RenderOptions::conf());
        assert_eq!(config, parse(&as_conf));
    }

    #[test]
    fn empty_config_is_a_singleton_sentinel() {
        assert!(empty().root().is_empty());
        assert_eq!("empty config", empty().origin().description());
    }
}
