//
// Parses HOCON, JSON and properties-style token streams into a tree of
// config values, and resolves ${path} substitutions against it:
//
// - path: path expressions ("a.b.c") and the path parser
// - value: the value tree (six leaf kinds plus deferred nodes) and the
//   withFallback merge algebra
// - parse_value: the recursive-descent token parser
// - resolve: the substitution resolver, with memoization and cycle
//   detection
// - include: the Includer capability consumed by `include` statements
//

mod error;
mod include;
mod options;
mod parse_value;
mod path;
mod properties;
mod resolve;
mod util;
mod value;

use std::path::Path as FsPath;

use hocon_lexing::{tokenize, Origin};

pub use crate::error::{ConfigError, ValidationProblem};
pub use crate::include::{with_fallback, IncludeContext, Includer};
pub use crate::options::{ParseOptions, Syntax};
pub use crate::path::{Path, PathBuilder};
pub use crate::properties::{from_path_map, parse_properties_str};
pub use crate::resolve::{resolve, ResolveOptions};
pub use crate::util::{render_json_string, render_string_unquoted_if_possible};
pub use crate::value::{
    ConcatPiece, ConfigConcat, ConfigDelayedMerge, ConfigList, ConfigObject, ConfigReference,
    ConfigValue, Number, RefPiece, ResolveStatus, ValueType,
};

/// Parses the input text into one root value, typically an object. The
/// syntax comes from the options, defaulting to HOCON.
pub fn parse_str(input: &str, options: &ParseOptions) -> Result<ConfigValue, ConfigError> {
    parse_str_with_source(input, options, None)
}

/// As [`parse_str`], with the directory that relative includes should be
/// resolved against, for input that came from a file.
pub fn parse_str_with_source(
    input: &str,
    options: &ParseOptions,
    relative_dir: Option<&FsPath>,
) -> Result<ConfigValue, ConfigError> {
    let description = options.origin_description().unwrap_or("String");
    let origin = Origin::new(description);
    let syntax = options.syntax().unwrap_or(Syntax::Conf);

    if syntax == Syntax::Properties {
        let object = properties::parse_properties_str(input, &origin)?;
        return Ok(ConfigValue::Object(object));
    }

    let tokens = tokenize(&origin, input, syntax != Syntax::Json);
    parse_value::parse_tokens(
        tokens,
        &origin,
        syntax,
        options,
        relative_dir.map(|dir| dir.to_path_buf()),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dedent(text: &str) -> String {
        let mut text = textwrap::dedent(text).trim().to_string();
        text.push('\n');
        text
    }

    fn parse(input: &str) -> ConfigValue {
        parse_str(&dedent(input), &ParseOptions::defaults())
            .expect("failed to parse config")
    }

    fn parse_json(input: &str) -> Result<ConfigValue, ConfigError> {
        parse_str(
            &dedent(input),
            &ParseOptions::defaults().with_syntax(Some(Syntax::Json)),
        )
    }

    fn peek(value: &ConfigValue, path: &str) -> ConfigValue {
        match value {
            ConfigValue::Object(object) => object
                .peek_path(&Path::parse(path).unwrap())
                .unwrap_or_else(|| panic!("no value at {}", path)),
            other => panic!("root was not an object: {:?}", other),
        }
    }

    fn i64_at(value: &ConfigValue, path: &str) -> i64 {
        match peek(value, path) {
            ConfigValue::Number(_, n) => n.as_i64().unwrap(),
            other => panic!("expected number at {}, got {:?}", path, other),
        }
    }

    fn string_at(value: &ConfigValue, path: &str) -> String {
        match peek(value, path) {
            ConfigValue::String(_, s) => s,
            other => panic!("expected string at {}, got {:?}", path, other),
        }
    }

    macro_rules! test_parse_error {
        ($test_name:ident, $parse:expr, $message_fragment:expr) => {
            #[test]
            fn $test_name() {
                match $parse {
                    Err(ConfigError::Parse { message, .. }) => {
                        assert!(
                            message.contains($message_fragment),
                            "error message {:?} did not contain {:?}",
                            message,
                            $message_fragment,
                        );
                    }
                    other => panic!("expected a parse error, got {:?}", other),
                }
            }
        };
    }

    #[test]
    fn parses_a_braced_object() {
        let root = parse(
            r#"
            {
                a = 1
                b = "two"
            }
            "#,
        );
        assert_eq!(1, i64_at(&root, "a"));
        assert_eq!("two", string_at(&root, "b"));
    }

    #[test]
    fn parses_a_bare_root_object() {
        let root = parse("a = 1\nb = 2");
        assert_eq!(1, i64_at(&root, "a"));
        assert_eq!(2, i64_at(&root, "b"));
    }

    #[test]
    fn parses_an_empty_document() {
        let root = parse_str("", &ParseOptions::defaults()).unwrap();
        match root {
            ConfigValue::Object(object) => assert!(object.is_empty()),
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn dotted_keys_expand_into_nested_objects() {
        let root = parse("a.b.c = 1");
        assert_eq!(1, i64_at(&root, "a.b.c"));
    }

    #[test]
    fn dotted_keys_merge_with_sibling_paths() {
        let root = parse("a.b = 1\na.c = 2");
        assert_eq!(1, i64_at(&root, "a.b"));
        assert_eq!(2, i64_at(&root, "a.c"));
    }

    #[test]
    fn duplicate_keys_merge_with_later_winning() {
        let root = parse(
            r#"
            a = { x = 1, y = 2 }
            a = { y = 9, z = 3 }
            "#,
        );
        assert_eq!(1, i64_at(&root, "a.x"));
        assert_eq!(9, i64_at(&root, "a.y"));
        assert_eq!(3, i64_at(&root, "a.z"));
    }

    #[test]
    fn duplicate_scalar_keys_take_the_last() {
        let root = parse("a = 1\na = 2");
        assert_eq!(2, i64_at(&root, "a"));
    }

    #[test]
    fn comma_and_newline_separators_both_work() {
        let root = parse("a = 1, b = 2\nc = 3");
        assert_eq!(1, i64_at(&root, "a"));
        assert_eq!(2, i64_at(&root, "b"));
        assert_eq!(3, i64_at(&root, "c"));
    }

    #[test]
    fn no_separator_needed_before_open_brace() {
        let root = parse("a { b = 1 }");
        assert_eq!(1, i64_at(&root, "a.b"));
    }

    #[test]
    fn arrays() {
        let root = parse("xs = [1, 2, 3]\nys = [\n  \"a\"\n  \"b\"\n]");
        match peek(&root, "xs") {
            ConfigValue::List(list) => assert_eq!(3, list.len()),
            other => panic!("expected list, got {:?}", other),
        }
        match peek(&root, "ys") {
            ConfigValue::List(list) => assert_eq!(2, list.len()),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn value_concatenation_makes_a_string() {
        let root = parse("who = John Doe\nmixed = 1 foo true");
        assert_eq!("John Doe", string_at(&root, "who"));
        assert_eq!("1 foo true", string_at(&root, "mixed"));
    }

    #[test]
    fn quoted_and_unquoted_pieces_concatenate() {
        let root = parse(r#"greeting = "hello "world"#);
        assert_eq!("hello world", string_at(&root, "greeting"));
    }

    #[test]
    fn object_concatenation_merges_inline() {
        let root = parse("a = { x = 1 } { y = 2 } { x = 9 }");
        assert_eq!(9, i64_at(&root, "a.x"));
        assert_eq!(2, i64_at(&root, "a.y"));
    }

    #[test]
    fn list_concatenation_appends_inline() {
        let root = parse("xs = [1, 2] [3]");
        match peek(&root, "xs") {
            ConfigValue::List(list) => assert_eq!(3, list.len()),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn substitution_becomes_a_reference_node() {
        let root = parse("a = ${foo.bar}");
        match peek(&root, "a") {
            ConfigValue::Reference(reference) => {
                assert_eq!("foo.bar", reference.expression_string());
            }
            other => panic!("expected reference, got {:?}", other),
        }
    }

    #[test]
    fn plus_equals_desugars_to_a_self_reference() {
        let root = parse("xs += 2");
        match peek(&root, "xs") {
            ConfigValue::Concat(concat) => {
                assert_eq!(2, concat.pieces().len());
                match &concat.pieces()[0] {
                    ConcatPiece::Value(ConfigValue::Reference(reference)) => {
                        assert_eq!("?xs", reference.expression_string());
                    }
                    other => panic!("expected a reference piece, got {:?}", other),
                }
            }
            other => panic!("expected concatenation, got {:?}", other),
        }
    }

    #[test]
    fn plus_equals_uses_the_full_nested_path() {
        let root = parse("outer { xs += 2 }");
        match peek(&root, "outer.xs") {
            ConfigValue::Concat(concat) => match &concat.pieces()[0] {
                ConcatPiece::Value(ConfigValue::Reference(reference)) => {
                    assert_eq!("?outer.xs", reference.expression_string());
                }
                other => panic!("expected a reference piece, got {:?}", other),
            },
            other => panic!("expected concatenation, got {:?}", other),
        }
    }

    #[test]
    fn comments_attach_to_the_following_value() {
        let root = parse(
            r#"
            # describes a
            a = 1
            b = 2 # trailing comment, dropped
            // describes c
            c = 3
            "#,
        );

        assert_eq!(
            &[" describes a".to_string()],
            peek(&root, "a").origin().comments(),
        );
        assert_eq!(
            &[" describes c".to_string()],
            peek(&root, "c").origin().comments(),
        );
        assert!(peek(&root, "b").origin().comments().is_empty());
    }

    #[test]
    fn keys_with_quoted_segments() {
        let root = parse(r#""a.b" = 1"#);
        match &root {
            ConfigValue::Object(object) => {
                assert!(object.contains_key("a.b"));
                assert!(!object.contains_key("a"));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn json_documents_parse() {
        let root = parse_json(r#"{"a": {"b": [1, 2]}, "c": null}"#).unwrap();
        match peek(&root, "a.b") {
            ConfigValue::List(list) => assert_eq!(2, list.len()),
            other => panic!("expected list, got {:?}", other),
        }
        assert!(matches!(peek(&root, "c"), ConfigValue::Null(_)));
    }

    #[test]
    fn json_array_root() {
        let root = parse_json("[1, 2, 3]").unwrap();
        match root {
            ConfigValue::List(list) => assert_eq!(3, list.len()),
            other => panic!("expected list, got {:?}", other),
        }
    }

    test_parse_error!(
        json_rejects_bare_root,
        parse_json("a: 1"),
        "object or array at root"
    );

    test_parse_error!(
        json_rejects_duplicate_keys,
        parse_json(r#"{"a": 1, "a": 2}"#),
        "duplicate"
    );

    test_parse_error!(
        json_rejects_trailing_commas,
        parse_json(r#"{"a": 1,}"#),
        "trailing commas"
    );

    test_parse_error!(
        json_rejects_unquoted_keys,
        parse_json("{a: 1}"),
        "quoted strings"
    );

    test_parse_error!(
        json_rejects_equals,
        parse_json(r#"{"a" = 1}"#),
        "JSON requires ':'"
    );

    test_parse_error!(
        json_rejects_substitutions,
        parse_json(r#"{"a": ${b}}"#),
        "not allowed in JSON"
    );

    test_parse_error!(
        json_rejects_comments,
        parse_json("{\"a\": 1} # no\n"),
        "Reserved character"
    );

    test_parse_error!(
        unbalanced_close_brace,
        parse_str("}\n", &ParseOptions::defaults()),
        "unbalanced close brace"
    );

    test_parse_error!(
        unclosed_object,
        parse_str("a = { b = 1\n", &ParseOptions::defaults()),
        "got end of file"
    );

    test_parse_error!(
        missing_value,
        parse_str("a =\n", &ParseOptions::defaults()),
        "Expecting a value"
    );

    test_parse_error!(
        missing_separator_between_fields,
        parse_str("a = 1 b = 2", &ParseOptions::defaults()),
        "Expecting a comma"
    );

    test_parse_error!(
        scalar_object_concatenation_rejected,
        parse_str("a = foo { b = 1 }\n", &ParseOptions::defaults()),
        "Cannot concatenate"
    );

    test_parse_error!(
        reserved_character_reported_with_quoting_hint,
        parse_str("a = hello?\n", &ParseOptions::defaults()),
        "try enclosing"
    );

    test_parse_error!(
        include_requires_an_argument,
        parse_str("include 42\n", &ParseOptions::defaults()),
        "include keyword is not followed"
    );

    #[test]
    fn properties_syntax_goes_through_the_flat_parser() {
        let root = parse_str(
            "a.b = hello\n",
            &ParseOptions::defaults().with_syntax(Some(Syntax::Properties)),
        )
        .unwrap();
        assert_eq!("hello", string_at(&root, "a.b"));
    }

    mod includes {
        use super::*;
        use crate::value::ConfigObject;
        use pretty_assertions::assert_eq;
        use std::sync::Arc;

        /// Includer that serves a fixed piece of config text for any name.
        struct InMemory(&'static str);

        impl Includer for InMemory {
            fn include(
                &self,
                context: &IncludeContext,
                _what: &str,
            ) -> Result<ConfigObject, ConfigError> {
                let parsed = parse_str(self.0, &context.parse_options())?;
                match parsed {
                    ConfigValue::Object(object) => Ok(object),
                    _ => Err(ConfigError::bug("test include was not an object")),
                }
            }
        }

        fn options_with(includer: impl Includer + 'static) -> ParseOptions {
            ParseOptions::defaults().with_includer(Some(Arc::new(includer)))
        }

        #[test]
        fn include_merges_into_the_enclosing_object() {
            let root = parse_str(
                "a = 1\ninclude \"more\"\n",
                &options_with(InMemory("b = 2")),
            )
            .unwrap();
            assert_eq!(1, i64_at(&root, "a"));
            assert_eq!(2, i64_at(&root, "b"));
        }

        #[test]
        fn include_loses_to_later_keys_and_beats_earlier_ones() {
            let root = parse_str(
                "b = 1\ninclude \"more\"\nc = 3\n",
                &options_with(InMemory("b = 2\nc = 2")),
            )
            .unwrap();
            assert_eq!(2, i64_at(&root, "b"));
            assert_eq!(3, i64_at(&root, "c"));
        }

        #[test]
        fn include_inside_an_object_relativizes_substitutions() {
            let root = parse_str(
                "outer { include \"more\" }\n",
                &options_with(InMemory("x = ${y}\ny = 1")),
            )
            .unwrap();

            match peek(&root, "outer.x") {
                ConfigValue::Reference(reference) => {
                    assert_eq!("outer.y", reference.expression_string());
                }
                other => panic!("expected reference, got {:?}", other),
            }
        }

        #[test]
        fn include_file_form_dispatches_to_the_hook() {
            struct FileOnly;

            impl Includer for FileOnly {
                fn include(
                    &self,
                    _context: &IncludeContext,
                    _what: &str,
                ) -> Result<ConfigObject, ConfigError> {
                    Err(ConfigError::bug("heuristic include should not be called"))
                }

                fn include_file(
                    &self,
                    context: &IncludeContext,
                    what: &str,
                ) -> Result<ConfigObject, ConfigError> {
                    assert_eq!("some.conf", what);
                    match parse_str("f = 1", &context.parse_options())? {
                        ConfigValue::Object(object) => Ok(object),
                        _ => unreachable!(),
                    }
                }
            }

            let root = parse_str(
                "include file(\"some.conf\")\n",
                &options_with(FileOnly),
            )
            .unwrap();
            assert_eq!(1, i64_at(&root, "f"));
        }

        test_parse_error!(
            include_without_an_includer_is_an_error,
            parse_str("include \"more\"\n", &ParseOptions::defaults()),
            "no includer"
        );
    }
}
