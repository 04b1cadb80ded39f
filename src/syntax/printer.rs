//! Turns tokens back into query text.

use super::result::ParseResult;
use super::token::Token;

/// Reconstructs the query a [`ParseResult`] was parsed from.
pub fn unparse(result: &ParseResult) -> String {
    unparse_tokens(&result.tokens)
}

pub fn unparse_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    write_tokens(tokens, &mut out);
    out
}

fn write_tokens(tokens: &[Token], out: &mut String) {
    for token in tokens {
        match token {
            Token::ParenGroup(group) => {
                out.push('(');
                write_tokens(&group.children, out);
                out.push(')');
            }
            other => out.push_str(other.text()),
        }
    }
}
