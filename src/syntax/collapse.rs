//! Merges free text and whitespace into single editable units.
//!
//! The editing surface shows one input per run of free text, so typing a
//! space inside it must not split it into new tokens. Every maximal run of
//! adjacent [`Token::FreeText`] and [`Token::Spaces`] becomes one `FreeText`
//! whose span covers the whole run.

use super::token::{FreeText, ParenGroup, Span, Token};

pub fn collapse(tokens: &[Token]) -> Vec<Token> {
    let mut collapsed = Vec::with_capacity(tokens.len());
    let mut run: Option<FreeText> = None;

    for token in tokens {
        match token {
            Token::FreeText(FreeText { value, text, span }) => extend_run(&mut run, value, text, *span),
            Token::Spaces(spaces) => extend_run(&mut run, &spaces.text, &spaces.text, spaces.span),
            Token::ParenGroup(group) => {
                flush(&mut run, &mut collapsed);
                collapsed.push(Token::ParenGroup(ParenGroup {
                    children: collapse(&group.children),
                    text: group.text.clone(),
                    span: group.span,
                }));
            }
            Token::Filter(_)
            | Token::AggregateFilter(_)
            | Token::Paren(_)
            | Token::LogicBoolean(_) => {
                flush(&mut run, &mut collapsed);
                collapsed.push(token.clone());
            }
        }
    }

    flush(&mut run, &mut collapsed);
    collapsed
}

fn extend_run(run: &mut Option<FreeText>, value: &str, text: &str, span: Span) {
    match run {
        Some(current) => {
            current.value.push_str(value);
            current.text.push_str(text);
            current.span = current.span.join(span);
        }
        None => {
            *run = Some(FreeText {
                value: value.to_string(),
                text: text.to_string(),
                span,
            })
        }
    }
}

fn flush(run: &mut Option<FreeText>, out: &mut Vec<Token>) {
    if let Some(text) = run.take() {
        out.push(Token::FreeText(text));
    }
}
