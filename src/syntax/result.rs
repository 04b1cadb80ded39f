use serde::Serialize;

use super::token::Token;
use crate::identity::{TokenKey, assign_keys};

/// Immutable result of parsing one query string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub source: String,
    pub tokens: Vec<Token>,
}

impl ParseResult {
    pub fn new(source: impl Into<String>, tokens: Vec<Token>) -> Self {
        Self {
            source: source.into(),
            tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Every token in depth-first order (a group precedes its children),
    /// paired with its key.
    pub fn keyed(&self) -> Vec<(TokenKey, &Token)> {
        assign_keys(&self.tokens)
    }

    pub fn find(&self, key: &TokenKey) -> Option<&Token> {
        self.keyed()
            .into_iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, token)| token)
    }

    /// Filters and aggregate filters, including those nested in groups.
    pub fn filters(&self) -> impl Iterator<Item = &Token> {
        walk(&self.tokens)
            .into_iter()
            .filter(|token| token.key().is_some())
    }

    pub fn invalid_tokens(&self) -> impl Iterator<Item = &Token> {
        walk(&self.tokens)
            .into_iter()
            .filter(|token| token.invalid().is_some())
    }
}

/// Depth-first traversal; a group is yielded before its children.
pub fn walk(tokens: &[Token]) -> Vec<&Token> {
    let mut out = Vec::new();
    fn visit<'a>(tokens: &'a [Token], out: &mut Vec<&'a Token>) {
        for token in tokens {
            out.push(token);
            visit(token.children(), out);
        }
    }
    visit(tokens, &mut out);
    out
}
