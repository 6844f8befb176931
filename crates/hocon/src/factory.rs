// Entry points for building Config instances from strings, files and
// path maps.

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use indexmap::IndexMap;
use lazy_static::lazy_static;

use hocon_lexing::Origin;
use hocon_parsing::{
    with_fallback, ConfigError, ConfigObject, ConfigValue, Includer, ParseOptions, Syntax,
};

use crate::includer::DefaultIncluder;
use crate::Config;

lazy_static! {
    /// The system environment, captured once per process.
    static ref ENV_SNAPSHOT: HashMap<String, String> = std::env::vars().collect();

    static ref EMPTY: Config =
        Config::from_root(ConfigObject::empty(Origin::new("empty config")));

    static ref DEFAULT_INCLUDER: Arc<dyn Includer> = Arc::new(DefaultIncluder);
}

pub(crate) fn env_snapshot() -> &'static HashMap<String, String> {
    &ENV_SNAPSHOT
}

/// An empty configuration.
pub fn empty() -> Config {
    EMPTY.clone()
}

/// An empty configuration with a description for its origin, which makes
/// error messages after merging more useful.
pub fn empty_with_description(description: &str) -> Config {
    Config::from_root(ConfigObject::empty(Origin::new(description)))
}

/// The process environment as a config, with each variable name as a
/// single key (not a path). Environment variables are consulted as
/// substitution fallbacks whether or not this object is merged in; this
/// is just a nicer way to read them directly.
pub fn system_environment() -> Config {
    let origin = Origin::new("env variables");
    let mut names: Vec<&String> = ENV_SNAPSHOT.keys().collect();
    names.sort();

    let mut fields = IndexMap::new();
    for name in names {
        fields.insert(
            name.clone(),
            ConfigValue::String(origin.clone(), ENV_SNAPSHOT[name].clone()),
        );
    }
    Config::from_root(ConfigObject::new(origin, fields))
}

/// Parses config text; the syntax comes from the options, defaulting to
/// HOCON. Heuristic includes resolve relative to the working directory.
pub fn parse_str(input: &str, options: &ParseOptions) -> Result<Config, ConfigError> {
    let options = options
        .clone()
        .with_includer(Some(effective_includer(options)));
    root_to_config(hocon_parsing::parse_str(input, &options)?)
}

/// Parses properties-style text into a config.
pub fn parse_properties_str(input: &str, options: &ParseOptions) -> Result<Config, ConfigError> {
    parse_str(
        input,
        &options.clone().with_syntax(Some(Syntax::Properties)),
    )
}

/// Parses one file, guessing the syntax from its extension unless the
/// options force one. With `allow_missing` (the default) a missing file
/// parses as an empty config.
pub fn parse_file(file: &FsPath, options: &ParseOptions) -> Result<Config, ConfigError> {
    let syntax = options.syntax().or_else(|| {
        file.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Syntax::from_extension)
    });
    let description = match options.origin_description() {
        Some(description) => description.to_string(),
        None => file.display().to_string(),
    };

    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && options.allow_missing() => {
            return Ok(empty_with_description(&format!(
                "{} (not found)",
                file.display()
            )));
        }
        Err(e) => {
            return Err(ConfigError::Io {
                origin: Some(Origin::new(file.display().to_string())),
                message: e.to_string(),
            });
        }
    };

    let options = options
        .clone()
        .with_syntax(Some(syntax.unwrap_or(Syntax::Conf)))
        .with_origin_description(Some(description));
    let options = options
        .clone()
        .with_includer(Some(effective_includer(&options)));

    root_to_config(hocon_parsing::parse_str_with_source(
        &text,
        &options,
        file.parent(),
    )?)
}

/// Parses a file with a flexible extension. A basename that already ends
/// in a known extension parses as that file; otherwise every existing
/// variant is parsed and merged, `.conf` falling back to `.json` falling
/// back to `.properties`.
pub fn parse_file_any_syntax(basename: &FsPath, options: &ParseOptions) -> Result<Config, ConfigError> {
    let known_extension = basename
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(Syntax::from_extension);
    if known_extension.is_some() {
        return parse_file(basename, options);
    }

    let mut merged: Option<Config> = None;
    for extension in ["conf", "json", "properties"] {
        let candidate = basename.with_extension(extension);
        if !candidate.exists() {
            continue;
        }
        let parsed = parse_file(&candidate, options)?;
        merged = Some(match merged {
            Some(config) => config.with_fallback(&parsed),
            None => parsed,
        });
    }

    match merged {
        Some(config) => Ok(config),
        None if options.allow_missing() => Ok(empty_with_description(&format!(
            "{} (not found)",
            basename.display()
        ))),
        None => Err(ConfigError::Io {
            origin: Some(Origin::new(basename.display().to_string())),
            message: "No config files found with extensions .conf, .json or .properties"
                .to_string(),
        }),
    }
}

/// Builds a config from `(path expression, string)` pairs, the contract
/// the properties format reduces to. A path bound to both a scalar and an
/// object keeps the object and silently drops the scalar.
pub fn parse_path_map(
    pairs: impl IntoIterator<Item = (String, String)>,
    description: Option<&str>,
) -> Result<Config, ConfigError> {
    let origin = Origin::new(description.unwrap_or("path map"));
    Ok(Config::from_root(hocon_parsing::from_path_map(
        pairs, &origin,
    )?))
}

/// The includer from the options with the default file includer chained
/// behind it, so custom includers only handle what they want to.
fn effective_includer(options: &ParseOptions) -> Arc<dyn Includer> {
    match options.includer() {
        Some(includer) => with_fallback(includer, DEFAULT_INCLUDER.clone()),
        None => DEFAULT_INCLUDER.clone(),
    }
}

fn root_to_config(value: ConfigValue) -> Result<Config, ConfigError> {
    match value {
        ConfigValue::Object(root) => Ok(Config::from_root(root)),
        other => Err(ConfigError::WrongType {
            origin: other.origin().clone(),
            path: "<root>".to_string(),
            expected: "object at the document root".to_string(),
            actual: other.type_description().to_string(),
        }),
    }
}
