//! Token model produced by the query parser.
//!
//! Every token keeps its literal text and the byte span it was read from, so
//! the token sequence of a [`ParseResult`](super::ParseResult) always
//! reproduces the source string exactly.

use serde::Serialize;
use std::fmt;

use super::value::Value;
use crate::operators::Operator;
use crate::types::FilterType;

/// Half-open byte range `[start, end)` into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty_at(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both.
    pub fn join(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

impl From<pest::Span<'_>> for Span {
    fn from(span: pest::Span<'_>) -> Self {
        Span::new(span.start(), span.end())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Why a filter could not be fully validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    UnknownKey,
    UnterminatedQuote,
    MalformedList,
    MissingValue,
    InvalidOperator,
    InvalidValue,
    UnknownFunction,
    NotAggregatable,
}

impl InvalidReason {
    pub fn as_str(self) -> &'static str {
        match self {
            InvalidReason::UnknownKey => "unknown_key",
            InvalidReason::UnterminatedQuote => "unterminated_quote",
            InvalidReason::MalformedList => "malformed_list",
            InvalidReason::MissingValue => "missing_value",
            InvalidReason::InvalidOperator => "invalid_operator",
            InvalidReason::InvalidValue => "invalid_value",
            InvalidReason::UnknownFunction => "unknown_function",
            InvalidReason::NotAggregatable => "not_aggregatable",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failure attached to a filter. The filter itself is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidInfo {
    pub reason: InvalidReason,
    /// Types the parser believes were intended.
    pub expected_types: Vec<FilterType>,
    /// Operators that would have been accepted, for operator mismatches.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub valid_operators: Vec<Operator>,
}

impl InvalidInfo {
    pub fn new(reason: InvalidReason) -> Self {
        Self {
            reason,
            expected_types: Vec::new(),
            valid_operators: Vec::new(),
        }
    }

    pub fn expecting(mut self, types: impl IntoIterator<Item = FilterType>) -> Self {
        self.expected_types.extend(types);
        self
    }

    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        self.valid_operators.extend(operators);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeText {
    /// Decoded text (quoted runs are unescaped).
    pub value: String,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spaces {
    pub text: String,
    pub span: Span,
}

/// Plain field key of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldKey {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateArg {
    pub value: String,
    pub text: String,
    pub span: Span,
}

/// Function-call key of an aggregate filter, e.g. `p95(transaction.duration)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateKey {
    pub name: String,
    pub name_span: Span,
    pub args: Vec<AggregateArg>,
    /// Everything between the parentheses.
    pub args_span: Span,
    pub span: Span,
}

/// Either kind of filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Field(&'a FieldKey),
    Aggregate(&'a AggregateKey),
}

impl Key<'_> {
    pub fn name(&self) -> &str {
        match self {
            Key::Field(key) => &key.name,
            Key::Aggregate(key) => &key.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterToken {
    pub negated: bool,
    pub key: FieldKey,
    pub operator: Operator,
    pub operator_span: Span,
    pub value: Value,
    pub value_span: Span,
    /// Declared type of the field, or the type inferred from the value.
    pub field_type: Option<FilterType>,
    pub invalid: Option<InvalidInfo>,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFilterToken {
    pub key: AggregateKey,
    pub operator: Operator,
    pub operator_span: Span,
    pub value: Value,
    pub value_span: Span,
    pub field_type: Option<FilterType>,
    pub invalid: Option<InvalidInfo>,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParenGroup {
    pub children: Vec<Token>,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParenSide {
    Open,
    Close,
}

/// A single parenthesis, produced when groups are flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paren {
    pub side: ParenSide,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BooleanOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicBoolean {
    pub op: BooleanOp,
    pub text: String,
    pub span: Span,
}

/// One token of a parsed query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Token {
    FreeText(FreeText),
    Spaces(Spaces),
    Filter(FilterToken),
    AggregateFilter(AggregateFilterToken),
    ParenGroup(ParenGroup),
    Paren(Paren),
    LogicBoolean(LogicBoolean),
}

/// Discriminant of [`Token`], used to build token keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenType {
    FreeText,
    Spaces,
    Filter,
    AggregateFilter,
    ParenGroup,
    Paren,
    LogicBoolean,
}

impl TokenType {
    pub const ALL: [TokenType; 7] = [
        TokenType::FreeText,
        TokenType::Spaces,
        TokenType::Filter,
        TokenType::AggregateFilter,
        TokenType::ParenGroup,
        TokenType::Paren,
        TokenType::LogicBoolean,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TokenType::FreeText => "freeText",
            TokenType::Spaces => "spaces",
            TokenType::Filter => "filter",
            TokenType::AggregateFilter => "aggregateFilter",
            TokenType::ParenGroup => "parenGroup",
            TokenType::Paren => "paren",
            TokenType::LogicBoolean => "logicBoolean",
        }
    }

    pub fn from_name(name: &str) -> Option<TokenType> {
        TokenType::ALL.into_iter().find(|ty| ty.name() == name)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Editable part of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenPart {
    Key,
    Operator,
    Value,
    AggregateArgs,
    FreeText,
}

impl TokenPart {
    pub fn name(self) -> &'static str {
        match self {
            TokenPart::Key => "key",
            TokenPart::Operator => "operator",
            TokenPart::Value => "value",
            TokenPart::AggregateArgs => "args",
            TokenPart::FreeText => "text",
        }
    }
}

impl fmt::Display for TokenPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TokenPart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key" => Ok(TokenPart::Key),
            "operator" | "op" => Ok(TokenPart::Operator),
            "value" => Ok(TokenPart::Value),
            "args" | "aggregate-args" => Ok(TokenPart::AggregateArgs),
            "text" | "free-text" => Ok(TokenPart::FreeText),
            other => Err(format!(
                "unknown token part '{other}' (expected key, operator, value, args or text)"
            )),
        }
    }
}

impl Token {
    pub fn token_type(&self) -> TokenType {
        match self {
            Token::FreeText(_) => TokenType::FreeText,
            Token::Spaces(_) => TokenType::Spaces,
            Token::Filter(_) => TokenType::Filter,
            Token::AggregateFilter(_) => TokenType::AggregateFilter,
            Token::ParenGroup(_) => TokenType::ParenGroup,
            Token::Paren(_) => TokenType::Paren,
            Token::LogicBoolean(_) => TokenType::LogicBoolean,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Token::FreeText(t) => t.span,
            Token::Spaces(t) => t.span,
            Token::Filter(t) => t.span,
            Token::AggregateFilter(t) => t.span,
            Token::ParenGroup(t) => t.span,
            Token::Paren(t) => t.span,
            Token::LogicBoolean(t) => t.span,
        }
    }

    /// Literal source text of the token.
    pub fn text(&self) -> &str {
        match self {
            Token::FreeText(t) => &t.text,
            Token::Spaces(t) => &t.text,
            Token::Filter(t) => &t.text,
            Token::AggregateFilter(t) => &t.text,
            Token::ParenGroup(t) => &t.text,
            Token::Paren(t) => &t.text,
            Token::LogicBoolean(t) => &t.text,
        }
    }

    pub fn key(&self) -> Option<Key<'_>> {
        match self {
            Token::Filter(f) => Some(Key::Field(&f.key)),
            Token::AggregateFilter(a) => Some(Key::Aggregate(&a.key)),
            Token::FreeText(_)
            | Token::Spaces(_)
            | Token::ParenGroup(_)
            | Token::Paren(_)
            | Token::LogicBoolean(_) => None,
        }
    }

    pub fn invalid(&self) -> Option<&InvalidInfo> {
        match self {
            Token::Filter(f) => f.invalid.as_ref(),
            Token::AggregateFilter(a) => a.invalid.as_ref(),
            Token::FreeText(_)
            | Token::Spaces(_)
            | Token::ParenGroup(_)
            | Token::Paren(_)
            | Token::LogicBoolean(_) => None,
        }
    }

    pub fn children(&self) -> &[Token] {
        match self {
            Token::ParenGroup(group) => &group.children,
            Token::FreeText(_)
            | Token::Spaces(_)
            | Token::Filter(_)
            | Token::AggregateFilter(_)
            | Token::Paren(_)
            | Token::LogicBoolean(_) => &[],
        }
    }

    /// Span of one editable part, or `None` when the token has no such part.
    pub fn part_span(&self, part: TokenPart) -> Option<Span> {
        match (self, part) {
            (Token::Filter(f), TokenPart::Key) => Some(f.key.span),
            (Token::Filter(f), TokenPart::Operator) => Some(f.operator_span),
            (Token::Filter(f), TokenPart::Value) => Some(f.value_span),
            (Token::AggregateFilter(a), TokenPart::Key) => Some(a.key.name_span),
            (Token::AggregateFilter(a), TokenPart::AggregateArgs) => Some(a.key.args_span),
            (Token::AggregateFilter(a), TokenPart::Operator) => Some(a.operator_span),
            (Token::AggregateFilter(a), TokenPart::Value) => Some(a.value_span),
            (Token::FreeText(t), TokenPart::FreeText) => Some(t.span),
            (Token::Spaces(t), TokenPart::FreeText) => Some(t.span),
            _ => None,
        }
    }
}
