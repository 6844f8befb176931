// Contains the token-stream parser: tokens in, one root value out.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use hocon_lexing::{is_whitespace, Literal, Origin, Token};

use crate::error::ConfigError;
use crate::include::{IncludeContext, Includer};
use crate::options::{ParseOptions, Syntax};
use crate::path::{self, Path, PathBuilder};
use crate::value::{
    concatenate, ConcatPiece, ConfigList, ConfigObject, ConfigReference, ConfigValue, Number,
};

/// What separated two elements of an object or array.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Separator {
    Comma,
    Newline,
    None,
}

/// Parses a document from a token stream. The tokenizer has already dealt
/// with characters; this layer is a small recursive descent over tokens
/// with one token of lookahead (a putback stack).
pub(crate) struct DocumentParser<I: Iterator<Item = Token>> {
    tokens: I,
    putback: Vec<Token>,
    syntax: Syntax,
    base_origin: Origin,
    options: ParseOptions,
    relative_dir: Option<PathBuf>,
    /// Full key paths of the objects we are nested in, for `+=` expansion
    /// and include relativization.
    path_stack: Vec<Path>,
    pending_comments: Vec<String>,
    current_line: usize,
}

pub(crate) fn parse_tokens<I: Iterator<Item = Token>>(
    tokens: I,
    base_origin: &Origin,
    syntax: Syntax,
    options: &ParseOptions,
    relative_dir: Option<PathBuf>,
) -> Result<ConfigValue, ConfigError> {
    let mut parser = DocumentParser {
        tokens,
        putback: vec![],
        syntax,
        base_origin: base_origin.clone(),
        options: options.clone(),
        relative_dir,
        path_stack: vec![],
        pending_comments: vec![],
        current_line: 1,
    };
    parser.parse_root()
}

impl<I: Iterator<Item = Token>> DocumentParser<I> {
    fn line_origin(&self) -> Origin {
        self.base_origin.with_line(self.current_line)
    }

    fn parse_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Parse {
            origin: self.line_origin(),
            message: message.into(),
        }
    }

    fn putback(&mut self, token: Token) {
        self.putback.push(token);
    }

    /// Next token, converting deferred tokenizer problems into parse
    /// errors and keeping track of the current line.
    fn pop_token_raw(&mut self) -> Result<Token, ConfigError> {
        let token = match self.putback.pop() {
            Some(token) => token,
            None => self.tokens.next().unwrap_or(Token::End),
        };

        match &token {
            Token::Problem {
                origin,
                what,
                message,
                suggest_quotes,
            } => {
                let message = if *suggest_quotes {
                    format!(
                        "{} (if you intended '{}' to be part of a key or string value, \
                         try enclosing the key or value in double quotes)",
                        message, what
                    )
                } else {
                    message.clone()
                };
                return Err(ConfigError::Parse {
                    origin: origin.clone(),
                    message,
                });
            }
            Token::Newline(origin) => {
                if let Some(line) = origin.line() {
                    self.current_line = line + 1;
                }
            }
            token => {
                if let Some(line) = token.line() {
                    self.current_line = line;
                }
            }
        }

        Ok(token)
    }

    /// Next non-comment token; comment text is buffered for attachment to
    /// the next value.
    fn pop_token(&mut self) -> Result<Token, ConfigError> {
        loop {
            match self.pop_token_raw()? {
                Token::Comment(_, text) => self.pending_comments.push(text),
                token => return Ok(token),
            }
        }
    }

    fn skip_newlines(&mut self) -> Result<(), ConfigError> {
        loop {
            match self.pop_token()? {
                Token::Newline(_) => continue,
                token => {
                    self.putback(token);
                    return Ok(());
                }
            }
        }
    }

    fn attach_comments(&mut self, value: ConfigValue) -> ConfigValue {
        if self.pending_comments.is_empty() {
            return value;
        }
        let comments = std::mem::take(&mut self.pending_comments);
        let origin = value.origin().with_comments(comments);
        value.with_origin(origin)
    }

    fn parse_root(&mut self) -> Result<ConfigValue, ConfigError> {
        match self.pop_token()? {
            Token::Start => {}
            token => {
                return Err(ConfigError::bug(format!(
                    "token stream did not begin with START: {}",
                    token
                )))
            }
        }

        self.skip_newlines()?;
        let token = self.pop_token()?;

        let result = match token {
            Token::OpenCurly => ConfigValue::Object(self.parse_object(true)?),
            Token::OpenSquare => self.parse_array()?,
            Token::End if self.syntax != Syntax::Json => {
                ConfigValue::Object(ConfigObject::empty(self.base_origin.clone()))
            }
            token => {
                if self.syntax == Syntax::Json {
                    return Err(self.parse_error(format!(
                        "Document must have an object or array at root, unexpected token: {}",
                        token
                    )));
                }
                // CONF allows a bare top-level object without braces
                self.putback(token);
                ConfigValue::Object(self.parse_object(false)?)
            }
        };

        self.skip_newlines()?;
        match self.pop_token()? {
            Token::End => {}
            token => {
                return Err(self.parse_error(format!(
                    "Document has trailing tokens after the root value: {}",
                    token
                )))
            }
        }

        // the root's origin is the source itself
        Ok(result.with_origin(self.base_origin.clone()))
    }

    fn parse_object(&mut self, had_open_curly: bool) -> Result<ConfigObject, ConfigError> {
        let object_origin = self.line_origin();
        let mut fields: IndexMap<String, ConfigValue> = IndexMap::new();

        loop {
            self.skip_newlines()?;
            let token = self.pop_token()?;
            match token {
                Token::CloseCurly => {
                    if !had_open_curly {
                        return Err(
                            self.parse_error("unbalanced close brace '}' with no open brace")
                        );
                    }
                    break;
                }
                Token::End => {
                    if had_open_curly {
                        return Err(self.parse_error(
                            "Expecting a close brace '}' or a field, got end of file",
                        ));
                    }
                    break;
                }
                token => {
                    self.putback(token);
                    self.parse_field(&mut fields)?;
                }
            }

            let separator = self.check_element_separator()?;
            let token = self.pop_token()?;
            match token {
                Token::CloseCurly => {
                    if !had_open_curly {
                        return Err(
                            self.parse_error("unbalanced close brace '}' with no open brace")
                        );
                    }
                    if separator == Separator::Comma && self.syntax == Syntax::Json {
                        return Err(self.parse_error(
                            "expecting a field name after a comma, got '}' \
                             (trailing commas are invalid in JSON)",
                        ));
                    }
                    break;
                }
                Token::End => {
                    if had_open_curly {
                        return Err(self.parse_error(
                            "Expecting a close brace '}' or a field, got end of file",
                        ));
                    }
                    break;
                }
                token => {
                    let effective = match separator {
                        Separator::Comma => true,
                        Separator::Newline => self.syntax != Syntax::Json,
                        Separator::None => false,
                    };
                    if !effective {
                        return Err(self.parse_error(format!(
                            "Expecting a comma, a newline, or a close brace '}}', got: {}",
                            token
                        )));
                    }
                    self.putback(token);
                }
            }
        }

        Ok(ConfigObject::new(object_origin, fields))
    }

    /// Consumes commas and newlines after an element, reporting what was
    /// found. Comments on the same line as the finished element are
    /// dropped; comments on later lines belong to the next element.
    fn check_element_separator(&mut self) -> Result<Separator, ConfigError> {
        let mut saw_newline = false;
        loop {
            match self.pop_token_raw()? {
                Token::Comment(_, text) => {
                    if saw_newline {
                        self.pending_comments.push(text);
                    }
                }
                Token::Newline(_) => saw_newline = true,
                Token::Comma => return Ok(Separator::Comma),
                token => {
                    self.putback(token);
                    return Ok(if saw_newline {
                        Separator::Newline
                    } else {
                        Separator::None
                    });
                }
            }
        }
    }

    fn parse_field(
        &mut self,
        fields: &mut IndexMap<String, ConfigValue>,
    ) -> Result<(), ConfigError> {
        if self.syntax != Syntax::Json {
            let token = self.pop_token()?;
            if matches!(&token, Token::UnquotedText(_, text) if text == "include") {
                return self.parse_include(fields);
            }
            self.putback(token);
        }

        let key_path = self.parse_key()?;

        let separator = self.pop_token()?;
        let value = match separator {
            Token::Equals | Token::PlusEquals if self.syntax == Syntax::Json => {
                return Err(self.parse_error(format!(
                    "JSON requires ':' between a field name and its value, got {}",
                    separator
                )));
            }
            Token::Colon | Token::Equals => self.parse_value_for_key(&key_path)?,
            Token::PlusEquals => {
                let value = self.parse_value_for_key(&key_path)?;
                self.desugar_plus_equals(&key_path, value)?
            }
            Token::OpenCurly => {
                if self.syntax == Syntax::Json {
                    return Err(self.parse_error(
                        "JSON requires ':' between a field name and its value, got '{'",
                    ));
                }
                // the separator may be omitted before an open brace
                self.path_stack.push(key_path.clone());
                let object = self.parse_object(true);
                self.path_stack.pop();
                ConfigValue::Object(object?)
            }
            token => {
                return Err(self.parse_error(format!(
                    "Key '{}' may not be followed by token: {}",
                    key_path.render(),
                    token
                )))
            }
        };

        let value = self.attach_comments(value);
        self.insert_field(fields, &key_path, value)
    }

    fn parse_value_for_key(&mut self, key_path: &Path) -> Result<ConfigValue, ConfigError> {
        self.path_stack.push(key_path.clone());
        let value = self.parse_value_concat();
        self.path_stack.pop();
        value
    }

    fn parse_key(&mut self) -> Result<Path, ConfigError> {
        let mut tokens = vec![];
        loop {
            let token = self.pop_token()?;
            match token {
                Token::Value(..) | Token::UnquotedText(..) => tokens.push(token),
                token => {
                    self.putback(token);
                    break;
                }
            }
        }

        if tokens.is_empty() {
            let token = self.pop_token()?;
            return Err(self.parse_error(format!("expecting a field name, got: {}", token)));
        }

        if self.syntax == Syntax::Json
            && !(tokens.len() == 1 && matches!(&tokens[0], Token::Value(_, Literal::Str(_))))
        {
            return Err(self.parse_error("JSON requires field names to be quoted strings"));
        }

        let original: String = tokens
            .iter()
            .map(|t| match t {
                Token::Value(_, literal) => literal.original_text(),
                Token::UnquotedText(_, text) => text.clone(),
                _ => String::new(),
            })
            .collect();

        path::from_path_tokens(&tokens, &original).map_err(|e| match e {
            ConfigError::BadPath { path, message } => {
                self.parse_error(format!("invalid key '{}': {}", path, message))
            }
            other => other,
        })
    }

    fn parse_value_concat(&mut self) -> Result<ConfigValue, ConfigError> {
        self.skip_newlines_json_only()?;
        let mut pieces: Vec<ConcatPiece> = vec![];

        loop {
            // raw pop: a comment ends the value, and it belongs to the
            // element separator logic, not to this value
            let token = self.pop_token_raw()?;
            if matches!(token, Token::Comment(..)) {
                self.putback(token);
                break;
            }
            match token {
                Token::Value(origin, literal) => {
                    pieces.push(ConcatPiece::Value(literal_to_value(origin, literal)));
                }
                Token::UnquotedText(origin, text) => {
                    if !pieces.is_empty() && text.chars().all(is_whitespace) {
                        pieces.push(ConcatPiece::Whitespace(text));
                    } else {
                        pieces.push(ConcatPiece::Value(ConfigValue::String(origin, text)));
                    }
                }
                Token::Substitution {
                    origin,
                    optional,
                    expression,
                } => {
                    if self.syntax == Syntax::Json {
                        return Err(
                            self.parse_error("Substitutions (${} syntax) are not allowed in JSON")
                        );
                    }
                    let path = self.substitution_path(&expression)?;
                    pieces.push(ConcatPiece::Value(ConfigValue::Reference(
                        ConfigReference::single(origin, path, optional),
                    )));
                }
                Token::OpenCurly => {
                    let object = self.parse_object(true)?;
                    pieces.push(ConcatPiece::Value(ConfigValue::Object(object)));
                }
                Token::OpenSquare => {
                    pieces.push(ConcatPiece::Value(self.parse_array()?));
                }
                token => {
                    self.putback(token);
                    break;
                }
            }

            if self.syntax == Syntax::Json {
                break;
            }
        }

        if pieces.is_empty() {
            let token = self.pop_token()?;
            return Err(self.parse_error(format!("Expecting a value but got wrong token: {}", token)));
        }

        concatenate(pieces)
    }

    /// JSON treats newlines as plain whitespace, so a value may start on
    /// the next line; CONF newlines terminate values and must stay put.
    fn skip_newlines_json_only(&mut self) -> Result<(), ConfigError> {
        if self.syntax == Syntax::Json {
            self.skip_newlines()?;
        }
        Ok(())
    }

    fn substitution_path(&self, expression: &[Token]) -> Result<Path, ConfigError> {
        let original: String = expression.iter().map(|t| t.to_string()).collect();
        path::from_path_tokens(expression, &original).map_err(|e| match e {
            ConfigError::BadPath { path, message } => self.parse_error(format!(
                "invalid path expression '{}' in substitution: {}",
                path, message
            )),
            other => other,
        })
    }

    fn parse_array(&mut self) -> Result<ConfigValue, ConfigError> {
        let origin = self.line_origin();
        let mut elements = vec![];

        self.skip_newlines()?;
        let token = self.pop_token()?;
        if matches!(token, Token::CloseSquare) {
            return Ok(ConfigValue::List(ConfigList::new(origin, elements)));
        }
        self.putback(token);

        loop {
            let value = self.parse_value_concat()?;
            let value = self.attach_comments(value);
            elements.push(value);

            let separator = self.check_element_separator()?;
            let token = self.pop_token()?;
            match token {
                Token::CloseSquare => {
                    if separator == Separator::Comma && self.syntax == Syntax::Json {
                        return Err(self.parse_error(
                            "expecting a value after a comma, got ']' \
                             (trailing commas are invalid in JSON)",
                        ));
                    }
                    break;
                }
                Token::End => {
                    return Err(
                        self.parse_error("Expecting a close bracket ']' or a comma, got end of file")
                    )
                }
                token => {
                    let effective = match separator {
                        Separator::Comma => true,
                        Separator::Newline => self.syntax != Syntax::Json,
                        Separator::None => false,
                    };
                    if !effective {
                        return Err(self.parse_error(format!(
                            "Expecting a comma or a close bracket ']' in list, got: {}",
                            token
                        )));
                    }
                    self.putback(token);
                    self.skip_newlines()?;
                }
            }
        }

        Ok(ConfigValue::List(ConfigList::new(origin, elements)))
    }

    /// `a += b` expands to `a = ${?a} [b]`, a self-referential optional
    /// append. The substitution uses the full path of `a` from the root
    /// since substitutions resolve globally.
    fn desugar_plus_equals(
        &mut self,
        key_path: &Path,
        value: ConfigValue,
    ) -> Result<ConfigValue, ConfigError> {
        let full_path = match self.full_current_path() {
            Some(prefix) => key_path.prepend(&prefix),
            None => key_path.clone(),
        };

        let origin = value.origin().clone();
        let reference = ConfigValue::Reference(ConfigReference::single(
            origin.clone(),
            full_path,
            true,
        ));
        let list = ConfigValue::List(ConfigList::new(origin, vec![value]));

        concatenate(vec![
            ConcatPiece::Value(reference),
            ConcatPiece::Value(list),
        ])
    }

    /// The concatenation of the enclosing field paths. `None` at root.
    fn full_current_path(&self) -> Option<Path> {
        let mut builder = PathBuilder::default();
        for p in &self.path_stack {
            builder.append_path(p);
        }
        builder.result()
    }

    fn insert_field(
        &mut self,
        fields: &mut IndexMap<String, ConfigValue>,
        path: &Path,
        value: ConfigValue,
    ) -> Result<(), ConfigError> {
        let key = path.first().to_string();

        // a dotted key expands into nested single-key objects
        let value = match path.remainder() {
            Some(rest) => {
                let origin = value.origin().clone();
                ConfigValue::Object(value.at_path_with_origin(&origin, &rest))
            }
            None => value,
        };

        match fields.get(&key) {
            Some(existing) => {
                if self.syntax == Syntax::Json {
                    return Err(self.parse_error(format!(
                        "JSON does not allow duplicate fields: '{}' was already seen",
                        key
                    )));
                }
                // later occurrences win, falling back to earlier ones
                let merged = value.with_fallback(existing);
                fields.insert(key, merged);
            }
            None => {
                fields.insert(key, value);
            }
        }
        Ok(())
    }

    /// The `include` keyword itself has been consumed.
    fn parse_include(
        &mut self,
        fields: &mut IndexMap<String, ConfigValue>,
    ) -> Result<(), ConfigError> {
        let token = self.pop_skipping_whitespace_text()?;

        let included = match token {
            Token::Value(_, Literal::Str(what)) => {
                self.call_includer(|includer, context| includer.include(context, &what))?
            }
            Token::UnquotedText(_, ref text)
                if text == "file(" || text == "url(" || text == "classpath(" =>
            {
                let scheme = text.trim_end_matches('(').to_string();

                let what = match self.pop_skipping_whitespace_text()? {
                    Token::Value(_, Literal::Str(what)) => what,
                    token => {
                        return Err(self.parse_error(format!(
                            "expecting include parameter to be a quoted string, got: {}",
                            token
                        )))
                    }
                };

                match self.pop_skipping_whitespace_text()? {
                    Token::UnquotedText(_, close) if close == ")" => {}
                    token => {
                        return Err(self.parse_error(format!(
                            "expecting a close parentheses ')' here, not: {}",
                            token
                        )))
                    }
                }

                match scheme.as_str() {
                    "file" => {
                        self.call_includer(|includer, context| includer.include_file(context, &what))?
                    }
                    "url" => {
                        self.call_includer(|includer, context| includer.include_url(context, &what))?
                    }
                    _ => self.call_includer(|includer, context| {
                        includer.include_classpath(context, &what)
                    })?,
                }
            }
            token => {
                return Err(self.parse_error(format!(
                    "include keyword is not followed by a quoted string or \
                     file()/url()/classpath(), but by: {}",
                    token
                )))
            }
        };

        // relativize substitution paths in the included object to the spot
        // it's included into
        let included = match self.full_current_path() {
            Some(prefix) => match ConfigValue::Object(included).relativized(&prefix) {
                ConfigValue::Object(object) => object,
                _ => return Err(ConfigError::bug("relativized object changed kind")),
            },
            None => included,
        };

        for (key, value) in included.iter() {
            let merged = match fields.get(key) {
                Some(existing) => value.with_fallback(existing),
                None => value.clone(),
            };
            fields.insert(key.clone(), merged);
        }
        Ok(())
    }

    /// Next token, skipping the whitespace runs the tokenizer preserves
    /// between simple values.
    fn pop_skipping_whitespace_text(&mut self) -> Result<Token, ConfigError> {
        loop {
            let token = self.pop_token()?;
            match &token {
                Token::UnquotedText(_, text) if text.chars().all(is_whitespace) => continue,
                _ => return Ok(token),
            }
        }
    }

    fn call_includer<F>(&self, call: F) -> Result<ConfigObject, ConfigError>
    where
        F: FnOnce(&Arc<dyn Includer>, &IncludeContext) -> Result<ConfigObject, ConfigError>,
    {
        let includer = self.options.includer().ok_or_else(|| {
            self.parse_error("include statement found, but no includer was provided in the parse options")
        })?;
        let context = IncludeContext::new(
            self.line_origin(),
            self.relative_dir.clone(),
            self.options.clone(),
        );
        call(&includer, &context)
    }
}

fn literal_to_value(origin: Origin, literal: Literal) -> ConfigValue {
    match literal {
        Literal::Null => ConfigValue::Null(origin),
        Literal::Bool(b) => ConfigValue::Boolean(origin, b),
        Literal::Long(v, text) => ConfigValue::Number(origin, Number::long(v, text)),
        Literal::Double(v, text) => ConfigValue::Number(origin, Number::double(v, text)),
        Literal::Str(s) => ConfigValue::String(origin, s),
    }
}
