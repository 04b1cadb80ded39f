//! Query parsing: grammar, token model, collapsing and printing.

pub mod collapse;
pub mod fallback;
pub mod grammar;
pub mod printer;
pub mod result;
pub mod token;
pub mod value;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, trace};

use crate::operators::Operator;
use crate::registry::FieldRegistry;
use crate::types::FilterTypeConfig;
use crate::validate::{Validator, valid_operators, valid_operators_or_default};

pub use collapse::collapse;
pub use grammar::QueryGrammar;
pub use printer::{unparse, unparse_tokens};
pub use result::ParseResult;
pub use token::Token;

/// Switches that change how a query is tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Emit single `Paren` tokens instead of nesting children in a `ParenGroup`.
    pub flatten_paren_groups: bool,
    /// Recognize bare `AND`/`OR` as boolean connectives.
    pub allow_boolean: bool,
    /// Mark filters whose key is missing from the registry. Ignored without one.
    pub validate_keys: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            flatten_paren_groups: false,
            allow_boolean: true,
            validate_keys: true,
        }
    }
}

/// Parser configured with options, an optional field registry and the
/// operator table.
///
/// Parsing is total: every input produces a [`ParseResult`] whose tokens
/// reproduce it exactly.
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    options: ParseOptions,
    registry: Option<FieldRegistry>,
    types: FilterTypeConfig,
}

impl QueryParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: FieldRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_type_config(mut self, types: FilterTypeConfig) -> Self {
        self.types = types;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn registry(&self) -> Option<&FieldRegistry> {
        self.registry.as_ref()
    }

    pub fn types(&self) -> &FilterTypeConfig {
        &self.types
    }

    /// Validated tokens before collapsing; free text and whitespace are
    /// still separate tokens.
    pub fn tokenize(&self, input: &str) -> ParseResult {
        trace!("tokenizing query: {input:?}");
        let raw = QueryGrammar::tokenize(input, &self.options).unwrap_or_else(|err| {
            debug!("grammar error: {err}");
            fallback::tokenize_fallback(input)
        });
        let validator = Validator::new(self.registry.as_ref(), &self.types, &self.options);
        ParseResult::new(input, validator.annotate(raw))
    }

    /// Canonical parse: validated and collapsed.
    pub fn parse(&self, input: &str) -> ParseResult {
        let raw = self.tokenize(input);
        let tokens = collapse(&raw.tokens);
        debug!("parsed {} tokens from {:?}", tokens.len(), input);
        ParseResult::new(raw.source, tokens)
    }

    pub fn valid_operators(&self, token: &Token) -> BTreeSet<Operator> {
        valid_operators(token, &self.types)
    }

    pub fn valid_operators_or_default(&self, token: &Token) -> BTreeSet<Operator> {
        valid_operators_or_default(token, &self.types)
    }
}

/// Parses `input` with default options, no registry and the default operator table.
pub fn parse(input: &str) -> ParseResult {
    QueryParser::new().parse(input)
}

/// Like [`parse`] but without collapsing free text.
pub fn tokenize(input: &str) -> ParseResult {
    QueryParser::new().tokenize(input)
}
