//
// Tokenizer for HOCON and JSON character streams.
//
// Breaks an input string into a lazy sequence of tokens, starting with START
// and ending with END:
//
// - Punctuation: comma, colon, equals, plus-equals, braces and brackets
// - Value: a boolean, null, number or quoted string literal
// - UnquotedText: any run of characters that isn't reserved syntax, including
//   the whitespace runs between two simple values (which the parser may later
//   fold into a value concatenation)
// - Substitution: a ${...} or ${?...} expression
// - Comment: a #... or //... line comment (CONF syntax only)
// - Problem: a deferred lexer error; the tokenizer never fails out of the
//   iterator, the parser turns these into parse errors
//

mod origin;
mod tokenizer;
mod tokens;

pub use crate::origin::Origin;
pub use crate::tokenizer::{is_whitespace, tokenize, Tokenizer};
pub use crate::tokens::{DebugTokenExt, Literal, Token};
