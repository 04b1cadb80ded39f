//! Last-resort tokenization.
//!
//! The grammar is written to accept any input, but if pest ever reports an
//! error the query must still produce a token sequence that covers it. This
//! splits the input into whitespace and non-whitespace runs.

use tracing::warn;

use super::token::{FreeText, Spaces, Span, Token};

pub fn tokenize_fallback(input: &str) -> Vec<Token> {
    warn!("query grammar rejected input, falling back to free text: {input:?}");

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (pos, c) in input.char_indices() {
        let is_space = c.is_whitespace();
        match in_space {
            Some(current) if current != is_space => {
                tokens.push(run(input, start, pos, current));
                start = pos;
                in_space = Some(is_space);
            }
            None => in_space = Some(is_space),
            Some(_) => {}
        }
    }

    if let Some(current) = in_space {
        tokens.push(run(input, start, input.len(), current));
    }
    tokens
}

fn run(input: &str, start: usize, end: usize, is_space: bool) -> Token {
    let span = Span::new(start, end);
    let text = span.slice(input).to_string();
    if is_space {
        Token::Spaces(Spaces { text, span })
    } else {
        Token::FreeText(FreeText {
            value: text.clone(),
            text,
            span,
        })
    }
}
