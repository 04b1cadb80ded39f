//! Token identity.
//!
//! A token's key is its type plus its ordinal among tokens of the same type,
//! counted depth-first over the whole parse. Editing the value of one filter
//! re-parses the query but leaves every other token with the key it had, so
//! focus and selection survive the edit. Inserting or removing a token of the
//! same type earlier in the query does shift later keys; that is the accepted
//! limit of positional identity.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::ptr;
use std::str::FromStr;
use thiserror::Error;

use crate::syntax::result::walk;
use crate::syntax::token::{Token, TokenType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKey {
    pub token_type: TokenType,
    pub index: usize,
}

impl TokenKey {
    pub fn new(token_type: TokenType, index: usize) -> Self {
        Self { token_type, index }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.token_type, self.index)
    }
}

impl Serialize for TokenKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenKeyError {
    #[error("token key '{0}' is not of the form type:index")]
    Malformed(String),
    #[error("unknown token type '{0}'")]
    UnknownType(String),
    #[error("invalid token index '{0}'")]
    BadIndex(String),
}

impl FromStr for TokenKey {
    type Err = TokenKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, index) = s
            .split_once(':')
            .ok_or_else(|| TokenKeyError::Malformed(s.to_string()))?;
        let token_type =
            TokenType::from_name(ty).ok_or_else(|| TokenKeyError::UnknownType(ty.to_string()))?;
        let index = index
            .parse()
            .map_err(|_| TokenKeyError::BadIndex(index.to_string()))?;
        Ok(TokenKey { token_type, index })
    }
}

/// Keys for every token in `tokens`, depth-first.
pub fn assign_keys(tokens: &[Token]) -> Vec<(TokenKey, &Token)> {
    let mut counters: HashMap<TokenType, usize> = HashMap::new();
    walk(tokens)
        .into_iter()
        .map(|token| {
            let counter = counters.entry(token.token_type()).or_insert(0);
            let key = TokenKey::new(token.token_type(), *counter);
            *counter += 1;
            (key, token)
        })
        .collect()
}

/// Key of `token`, which must be one of the tokens reachable from `tokens`
/// (compared by address, not by value).
pub fn assign_key(token: &Token, tokens: &[Token]) -> Option<TokenKey> {
    assign_keys(tokens)
        .into_iter()
        .find(|(_, candidate)| ptr::eq(*candidate, token))
        .map(|(key, _)| key)
}
