// Properties-style input: a flat map from path expressions to strings.

use hocon_lexing::Origin;

use crate::error::ConfigError;
use crate::path::Path;
use crate::value::{ConfigObject, ConfigValue};

/// Parses properties-style text: one `path = value` (or `path: value`) per
/// line, `#` and `!` comment lines, values taken verbatim as strings.
pub fn parse_properties_str(input: &str, origin: &Origin) -> Result<ConfigObject, ConfigError> {
    let mut pairs = vec![];

    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let (key, value) = match line.find(|c: char| c == '=' || c == ':') {
            Some(at) => (&line[..at], &line[at + 1..]),
            None => {
                return Err(ConfigError::Parse {
                    origin: origin.with_line(index + 1),
                    message: format!("No '=' or ':' separator on properties line: {}", line),
                })
            }
        };

        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }

    from_path_map(pairs, origin)
}

/// Builds a tree from `(path expression, string)` pairs.
///
/// A key whose prefix path is also bound to a scalar replaces that scalar
/// with an object, and a scalar never replaces an existing object: with
/// both `a=foo` and `a.b=bar`, the `a=foo` binding is silently lost. This
/// is deliberately lossy rather than an error.
pub fn from_path_map(
    pairs: impl IntoIterator<Item = (String, String)>,
    origin: &Origin,
) -> Result<ConfigObject, ConfigError> {
    let mut root = ConfigObject::empty(origin.clone());

    for (key, value) in pairs {
        let path = Path::parse(&key)?;
        let value = ConfigValue::String(origin.clone(), value);
        root = insert_preferring_objects(&root, &path, value, origin);
    }

    Ok(root)
}

fn insert_preferring_objects(
    object: &ConfigObject,
    path: &Path,
    value: ConfigValue,
    origin: &Origin,
) -> ConfigObject {
    let key = path.first();

    match path.remainder() {
        None => match object.get(key) {
            // the object wins over the scalar
            Some(ConfigValue::Object(_)) => object.clone(),
            _ => object.with_key_value(key, value),
        },
        Some(rest) => {
            let child = match object.get(key) {
                Some(ConfigValue::Object(child)) => child.clone(),
                // a scalar in the way is dropped in favor of the object
                _ => ConfigObject::empty(origin.clone()),
            };
            let updated = insert_preferring_objects(&child, &rest, value, origin);
            object.with_key_value(key, ConfigValue::Object(updated))
        }
    }
}
