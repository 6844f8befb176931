//
// Renders config value trees back to text: a compact JSON-compatible mode
// sufficient for round-tripping JSON inputs, and a formatted mode with
// optional comments and origin annotations.
//

use hocon_parsing::{
    render_json_string, render_string_unquoted_if_possible, ConcatPiece, ConfigValue, RefPiece,
};

/// How to render a value tree. Immutable: the setters return a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    json: bool,
    formatted: bool,
    comments: bool,
    origin_comments: bool,
}

impl RenderOptions {
    /// Formatted, JSON-compatible output.
    pub fn defaults() -> RenderOptions {
        RenderOptions {
            json: true,
            formatted: true,
            comments: false,
            origin_comments: false,
        }
    }

    /// Compact single-line JSON.
    pub fn concise() -> RenderOptions {
        RenderOptions {
            json: true,
            formatted: false,
            comments: false,
            origin_comments: false,
        }
    }

    /// Human-oriented HOCON: unquoted keys where possible, no braces around
    /// the root, comments preserved.
    pub fn conf() -> RenderOptions {
        RenderOptions {
            json: false,
            formatted: true,
            comments: true,
            origin_comments: false,
        }
    }

    pub fn with_json(self, json: bool) -> RenderOptions {
        RenderOptions { json, ..self }
    }

    pub fn with_formatted(self, formatted: bool) -> RenderOptions {
        RenderOptions { formatted, ..self }
    }

    /// Emit comments attached to values. Only honored outside JSON mode;
    /// strict JSON has no comment syntax.
    pub fn with_comments(self, comments: bool) -> RenderOptions {
        RenderOptions { comments, ..self }
    }

    /// Emit a comment with each value's origin description. Renders before
    /// any user comments.
    pub fn with_origin_comments(self, origin_comments: bool) -> RenderOptions {
        RenderOptions {
            origin_comments,
            ..self
        }
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn formatted(&self) -> bool {
        self.formatted
    }

    pub fn comments(&self) -> bool {
        self.comments
    }

    pub fn origin_comments(&self) -> bool {
        self.origin_comments
    }
}

/// Renders the value to a string. For resolved trees rendered in a JSON
/// mode the output is strict JSON; unresolved trees render their deferred
/// nodes in HOCON syntax (`${path}`, repeated keys) and only reparse as
/// HOCON.
pub fn render(value: &ConfigValue, options: &RenderOptions) -> String {
    let mut out = String::new();
    render_value(&mut out, value, 0, true, None, options);
    if options.formatted {
        out.push('\n');
    }
    out
}

fn indent(out: &mut String, levels: usize, options: &RenderOptions) {
    if options.formatted {
        for _ in 0..levels {
            out.push_str("    ");
        }
    }
}

fn render_key(out: &mut String, key: &str, value: &ConfigValue, options: &RenderOptions) {
    if options.json {
        out.push_str(&render_json_string(key));
        out.push_str(if options.formatted { " : " } else { ":" });
    } else {
        out.push_str(&render_string_unquoted_if_possible(key));
        // the separator can be left out before an object
        if matches!(value, ConfigValue::Object(_)) {
            if options.formatted {
                out.push(' ');
            }
        } else {
            out.push_str(if options.formatted { " = " } else { "=" });
        }
    }
}

fn render_value(
    out: &mut String,
    value: &ConfigValue,
    indent_level: usize,
    at_root: bool,
    at_key: Option<&str>,
    options: &RenderOptions,
) {
    if let Some(key) = at_key {
        render_key(out, key, value, options);
    }

    match value {
        ConfigValue::Null(_) => out.push_str("null"),
        ConfigValue::Boolean(_, true) => out.push_str("true"),
        ConfigValue::Boolean(_, false) => out.push_str("false"),
        ConfigValue::Number(_, number) => out.push_str(number.original_text()),
        ConfigValue::String(_, s) => out.push_str(&render_json_string(s)),
        ConfigValue::List(list) => render_list(out, list.elements(), indent_level, options),
        ConfigValue::Object(object) => render_object(out, object, indent_level, at_root, options),
        ConfigValue::Reference(reference) => render_reference(out, reference),
        ConfigValue::Concat(concat) => {
            for piece in concat.pieces() {
                match piece {
                    ConcatPiece::Value(v) => {
                        render_value(out, v, indent_level, false, None, options)
                    }
                    ConcatPiece::Whitespace(ws) => out.push_str(ws),
                }
            }
        }
        ConfigValue::DelayedMerge(merge) | ConfigValue::DelayedMergeObject(merge) => {
            // keyless delayed merges don't come up in practice (merge
            // stacks live under object keys, which render_object handles);
            // show the winning element rather than nothing
            if let Some(first) = merge.stack().first() {
                render_value(out, first, indent_level, at_root, None, options);
            }
        }
    }
}

fn render_reference(out: &mut String, reference: &hocon_parsing::ConfigReference) {
    for piece in reference.pieces() {
        match piece {
            RefPiece::Text(text) => out.push_str(&render_json_string(text)),
            RefPiece::Expr { path, optional } => {
                out.push_str("${");
                if *optional {
                    out.push('?');
                }
                out.push_str(&path.render());
                out.push('}');
            }
        }
    }
}

fn render_list(
    out: &mut String,
    elements: &[ConfigValue],
    indent_level: usize,
    options: &RenderOptions,
) {
    if elements.is_empty() {
        out.push_str("[]");
        return;
    }

    out.push('[');
    if options.formatted {
        out.push('\n');
    }

    for (i, element) in elements.iter().enumerate() {
        indent(out, indent_level + 1, options);
        render_value(out, element, indent_level + 1, false, None, options);
        if i + 1 < elements.len() {
            out.push(',');
        }
        if options.formatted {
            out.push('\n');
        }
    }

    indent(out, indent_level, options);
    out.push(']');
}

fn render_object(
    out: &mut String,
    object: &hocon_parsing::ConfigObject,
    indent_level: usize,
    at_root: bool,
    options: &RenderOptions,
) {
    if object.is_empty() {
        out.push_str("{}");
        return;
    }

    // in HOCON mode the braces around the root are left off
    let outer_braces = options.json || !at_root;
    let inner_indent = if outer_braces {
        indent_level + 1
    } else {
        indent_level
    };

    if outer_braces {
        out.push('{');
        if options.formatted {
            out.push('\n');
        }
    }

    let mut keys: Vec<&String> = object.keys().collect();
    keys.sort();

    let mut entries: Vec<(&str, &ConfigValue)> = vec![];
    for key in keys {
        let child = object.get(key).expect("key came from the object");
        match child {
            // a merge stack renders as the key repeated once per stack
            // element, lowest priority first, so a HOCON reparse folds
            // them back together with the same precedence
            ConfigValue::DelayedMerge(merge) | ConfigValue::DelayedMergeObject(merge) => {
                for element in merge.stack().iter().rev() {
                    entries.push((key.as_str(), element));
                }
            }
            child => entries.push((key.as_str(), child)),
        }
    }

    for (i, (key, child)) in entries.iter().enumerate() {
        if !options.json {
            if options.origin_comments {
                indent(out, inner_indent, options);
                out.push_str("# ");
                out.push_str(child.origin().description());
                out.push('\n');
            }
            if options.comments {
                for comment in child.origin().comments() {
                    indent(out, inner_indent, options);
                    out.push('#');
                    if !comment.starts_with(' ') {
                        out.push(' ');
                    }
                    out.push_str(comment);
                    out.push('\n');
                }
            }
        }

        indent(out, inner_indent, options);
        render_value(out, child, inner_indent, false, Some(key), options);

        if i + 1 < entries.len() {
            if options.json || !options.formatted {
                out.push(',');
            }
        }
        if options.formatted {
            out.push('\n');
        }
    }

    if outer_braces {
        if options.formatted {
            // chop the line break after the last field, then put it back
            // with the closing indent
            indent(out, indent_level, options);
        }
        out.push('}');
    } else if options.formatted {
        // the root has a trailing newline added by render()
        out.pop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hocon_parsing::{parse_str, ParseOptions, Syntax};
    use pretty_assertions::assert_eq;

    fn dedent(text: &str) -> String {
        let mut text = textwrap::dedent(text).trim().to_string();
        text.push('\n');
        text
    }

    fn parse(input: &str) -> ConfigValue {
        parse_str(input, &ParseOptions::defaults()).expect("failed to parse")
    }

    fn parse_json(input: &str) -> ConfigValue {
        parse_str(
            input,
            &ParseOptions::defaults().with_syntax(Some(Syntax::Json)),
        )
        .expect("failed to parse")
    }

    #[test]
    fn concise_render_is_strict_json() {
        let tree = parse_json(r#"{"b": {"y": 2}, "a": [1, 2.5, true, null, "s"]}"#);
        let rendered = render(&tree, &RenderOptions::concise());

        // keys render sorted
        assert_eq!(r#"{"a":[1,2.5,true,null,"s"],"b":{"y":2}}"#, rendered);

        // and the output parses back to the same tree
        assert_eq!(tree, parse_json(&rendered));
    }

    #[test]
    fn numbers_keep_their_original_spelling() {
        let tree = parse("a = 1e6\nb = 0.5\nc = 10");
        let rendered = render(&tree, &RenderOptions::concise());
        assert_eq!(r#"{"a":1e6,"b":0.5,"c":10}"#, rendered);
    }

    #[test]
    fn strings_are_escaped() {
        let tree = parse(r#"s = "a\nb""#);
        assert_eq!(r#"{"s":"a\nb"}"#, render(&tree, &RenderOptions::concise()));
    }

    #[test]
    fn formatted_json_render() {
        let tree = parse_json(r#"{"a": 1, "b": [1, 2]}"#);
        assert_eq!(
            dedent(
                r#"
                {
                    "a" : 1,
                    "b" : [
                        1,
                        2
                    ]
                }
                "#
            ),
            render(&tree, &RenderOptions::defaults()),
        );
    }

    #[test]
    fn conf_render_unquotes_keys_and_drops_root_braces() {
        let tree = parse("a = 1\n\"b.c\" = 2");
        assert_eq!(
            dedent(
                r#"
                a = 1
                "b.c" = 2
                "#
            ),
            render(&tree, &RenderOptions::conf().with_comments(false)),
        );
    }

    #[test]
    fn conf_render_round_trips() {
        let tree = parse("a { b = 1, c = [1, 2] }\nd = hello there");
        let rendered = render(&tree, &RenderOptions::conf());
        assert_eq!(tree, parse(&rendered));
    }

    #[test]
    fn unresolved_substitution_renders_as_hocon() {
        let tree = parse("a = ${x.y}\nb = ${?opt}");
        let rendered = render(&tree, &RenderOptions::conf().with_comments(false));
        assert_eq!(
            dedent(
                r#"
                a = ${x.y}
                b = ${?opt}
                "#
            ),
            rendered,
        );
        assert_eq!(tree, parse(&rendered));
    }

    #[test]
    fn reference_with_text_context_round_trips() {
        let tree = parse("path = ${path}\":/usr/bin\"");
        let rendered = render(&tree, &RenderOptions::conf().with_comments(false));
        assert_eq!(tree, parse(&rendered));
    }

    #[test]
    fn delayed_merge_renders_as_repeated_keys() {
        let tree = parse("a = 1\na = ${x}");
        let rendered = render(&tree, &RenderOptions::conf().with_comments(false));
        assert_eq!(
            dedent(
                r#"
                a = 1
                a = ${x}
                "#
            ),
            rendered,
        );
        assert_eq!(tree, parse(&rendered));
    }

    #[test]
    fn comments_render_with_origin_comment_first() {
        let tree = parse("# what a is for\na = 1");
        let rendered = render(
            &tree,
            &RenderOptions::conf().with_origin_comments(true),
        );

        assert_eq!(
            dedent(
                r#"
                # String
                # what a is for
                a = 1
                "#
            ),
            rendered,
        );
    }

    #[test]
    fn comments_are_suppressed_in_json_mode() {
        let tree = parse("# note\na = 1");
        assert_eq!(
            r#"{"a":1}"#,
            render(&tree, &RenderOptions::concise().with_comments(true)),
        );
    }

    #[test]
    fn empty_containers() {
        let tree = parse("a = {}\nb = []");
        assert_eq!(
            r#"{"a":{},"b":[]}"#,
            render(&tree, &RenderOptions::concise()),
        );
    }
}
