//! # searchql - Search Query Parser and Editor
//!
//! A library for parsing the textual search language used to filter records
//! (`is:unresolved assignee:me duration:>500ms`) into a typed, span-preserving
//! token model, validating filters against declared field types, and editing
//! one token at a time without disturbing the rest of the query.
//!
//! ## Quick Start
//!
//! ```rust
//! use searchql::{parse, unparse, Token};
//!
//! let query = "is:unresolved assignee:me";
//! let result = parse(query);
//!
//! assert_eq!(result.tokens.len(), 3);
//! assert!(matches!(result.tokens[0], Token::Filter(_)));
//! assert_eq!(unparse(&result), query);
//! ```
//!
//! ## Query Syntax
//!
//! - **Filters**: `key:value`, `key:>value`, `key:>=value`, `key:<value`, `key:<=value`
//! - **Negation**: `!status:resolved` (reads as `status is not resolved`)
//! - **Quoted values**: `message:"connection reset"` (`\"` escapes a quote)
//! - **Lists**: `browser:[chrome, "fire fox"]`
//! - **Aggregates**: `p95(transaction.duration):>1s`, `count():>10`
//! - **Grouping**: `(a:1 OR b:2)`, with `AND`/`OR` as connectives
//! - **Free text**: anything else
//!
//! Parsing never fails. Malformed pieces are kept as tokens carrying an
//! [`InvalidInfo`], and `unparse(parse(s)) == s` for every string.
//!
//! ## Field Registry
//!
//! ```rust
//! use searchql::{FieldDefinition, FieldRegistry, FilterType, InvalidReason, QueryParser};
//!
//! let registry = FieldRegistry::new()
//!     .with_field("duration", FieldDefinition::new(FilterType::Duration));
//! let parser = QueryParser::new().with_registry(registry);
//!
//! let result = parser.parse("duration:>2s asignee:me");
//! let invalid: Vec<_> = result.invalid_tokens().collect();
//! assert_eq!(invalid.len(), 1);
//! assert_eq!(invalid[0].invalid().map(|i| i.reason), Some(InvalidReason::UnknownKey));
//! ```
//!
//! ## Editing
//!
//! ```rust
//! use searchql::{EditMachine, QueryParser, TokenPart, unparse};
//!
//! let parser = QueryParser::new();
//! let query = parser.parse("a:1 b:2");
//!
//! let t = EditMachine::new().begin_edit(&parser, &query, "filter:1".parse()?, TokenPart::Value);
//! let t = t.machine.update_buffer("3");
//! let t = t.machine.commit(&parser);
//!
//! assert_eq!(unparse(&t.result.unwrap()), "a:1 b:3");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`syntax`]: Pest grammar, token model, collapsing and printing
//! - [`validate`]: operator and value checks against [`FilterTypeConfig`]
//! - [`identity`]: positional token keys
//! - [`edit`]: the edit state machine
//! - [`config`]: registry and options loaded from JSON, TOML or YAML

pub mod config;
pub mod cursor;
pub mod edit;
pub mod identity;
pub mod operators;
pub mod registry;
pub mod syntax;
pub mod types;
pub mod validate;

pub use config::{ConfigError, ConfigFormat, ConfigLoader, SearchConfig};
pub use cursor::{word_at_cursor, word_span_at_cursor};
pub use edit::{ActiveEdit, EditMachine, EditSession, EditState, Transition};
pub use identity::{TokenKey, TokenKeyError, assign_key, assign_keys};
pub use operators::{OPERATORS, Operator, OperatorDef, get_all_operator_symbols, parse_operator};
pub use registry::{FieldDefinition, FieldRegistry, FunctionDefinition};
pub use syntax::token::{
    AggregateFilterToken, FilterToken, FreeText, InvalidInfo, InvalidReason, Span, Token,
    TokenPart, TokenType,
};
pub use syntax::value::Value;
pub use syntax::{
    ParseOptions, ParseResult, QueryParser, collapse, parse, tokenize, unparse, unparse_tokens,
};
pub use types::{FilterType, FilterTypeConfig, TypeRule};
pub use validate::{valid_operators, valid_operators_or_default};
