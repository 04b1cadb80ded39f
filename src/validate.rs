//! Operator and type validation.
//!
//! Runs over the raw token sequence after the grammar, resolving every
//! filter's type (declared in the registry, or inferred from the value),
//! reading its value as that type, and checking the operator against the
//! [`FilterTypeConfig`]. Problems are recorded on the token as
//! [`InvalidInfo`]; nothing is ever dropped.

use std::collections::BTreeSet;
use tracing::{debug, trace};

use crate::operators::Operator;
use crate::registry::FieldRegistry;
use crate::syntax::ParseOptions;
use crate::syntax::token::{
    AggregateFilterToken, FilterToken, InvalidInfo, InvalidReason, ParenGroup, Token,
};
use crate::syntax::value::{Value, coerce, infer};
use crate::types::{FilterType, FilterTypeConfig};

/// Type assumed for an aggregate when nothing else declares one.
const DEFAULT_AGGREGATE_TYPE: FilterType = FilterType::Number;

pub struct Validator<'a> {
    registry: Option<&'a FieldRegistry>,
    types: &'a FilterTypeConfig,
    options: &'a ParseOptions,
}

impl<'a> Validator<'a> {
    pub fn new(
        registry: Option<&'a FieldRegistry>,
        types: &'a FilterTypeConfig,
        options: &'a ParseOptions,
    ) -> Self {
        Self {
            registry,
            types,
            options,
        }
    }

    /// Annotates every filter in `tokens`, descending into groups.
    pub fn annotate(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter().map(|token| self.annotate_token(token)).collect()
    }

    fn annotate_token(&self, token: Token) -> Token {
        match token {
            Token::Filter(filter) => Token::Filter(self.check_filter(filter)),
            Token::AggregateFilter(agg) => Token::AggregateFilter(self.check_aggregate(agg)),
            Token::ParenGroup(group) => Token::ParenGroup(ParenGroup {
                children: self.annotate(group.children),
                text: group.text,
                span: group.span,
            }),
            other @ (Token::FreeText(_)
            | Token::Spaces(_)
            | Token::Paren(_)
            | Token::LogicBoolean(_)) => other,
        }
    }

    fn check_filter(&self, mut filter: FilterToken) -> FilterToken {
        let syntax_error = filter.invalid.take();
        let declared = self
            .registry
            .and_then(|registry| registry.field(&filter.key.name))
            .map(|def| def.field_type);

        if declared.is_none() && self.registry.is_some() && self.options.validate_keys {
            trace!("unknown key '{}'", filter.key.name);
            filter.field_type = None;
            filter.invalid =
                Some(syntax_error.unwrap_or_else(|| InvalidInfo::new(InvalidReason::UnknownKey)));
            return filter;
        }

        let outcome = self.check_value(&filter.value, filter.operator, declared, syntax_error);
        filter.value = outcome.value;
        filter.field_type = outcome.field_type;
        filter.invalid = outcome.invalid;

        if let Some(invalid) = &filter.invalid {
            debug!("filter '{}' is invalid: {}", filter.text, invalid.reason);
        }
        filter
    }

    fn check_aggregate(&self, mut agg: AggregateFilterToken) -> AggregateFilterToken {
        let syntax_error = agg.invalid.take();

        let Some(registry) = self.registry else {
            let outcome = self.check_value(&agg.value, agg.operator, None, syntax_error);
            agg.value = outcome.value;
            agg.field_type = outcome.field_type;
            agg.invalid = outcome.invalid;
            return agg;
        };

        let function = agg.key.name.as_str();
        let argument = agg.key.args.first().map(|arg| arg.value.as_str());
        let field = argument.and_then(|name| registry.field(name));

        let declared = registry
            .function(function)
            .and_then(|def| def.return_type)
            .or_else(|| field.map(|def| def.field_type))
            .unwrap_or(DEFAULT_AGGREGATE_TYPE);

        let aggregate_error = if !registry.is_known_function(function) {
            Some(InvalidReason::UnknownFunction)
        } else {
            match (argument, field) {
                (Some(_), Some(def)) if !def.allows_function(function) => {
                    Some(InvalidReason::NotAggregatable)
                }
                (Some(_), None) if self.options.validate_keys => Some(InvalidReason::UnknownKey),
                _ => None,
            }
        };

        if let Some(reason) = aggregate_error {
            debug!("aggregate '{}' is invalid: {}", agg.text, reason);
            agg.field_type = match reason {
                InvalidReason::UnknownFunction => None,
                _ => Some(declared),
            };
            agg.invalid = Some(syntax_error.unwrap_or_else(|| InvalidInfo::new(reason)));
            return agg;
        }

        let outcome = self.check_value(&agg.value, agg.operator, Some(declared), syntax_error);
        agg.value = outcome.value;
        agg.field_type = outcome.field_type;
        agg.invalid = outcome.invalid;
        agg
    }

    /// Types the value and checks the operator. Syntax errors found by the
    /// grammar win over anything detected here.
    fn check_value(
        &self,
        value: &Value,
        operator: Operator,
        declared: Option<FilterType>,
        syntax_error: Option<InvalidInfo>,
    ) -> CheckOutcome {
        let Some(ty) = declared else {
            let value = infer(value);
            let inferred = value.value_type();
            if let Some(invalid) = syntax_error {
                return CheckOutcome {
                    value,
                    field_type: None,
                    invalid: Some(invalid),
                };
            }
            let invalid = self.check_operator(operator, inferred, &value);
            return CheckOutcome {
                value,
                field_type: Some(inferred),
                invalid,
            };
        };

        let typed = self.coerce_to(value, ty);
        if let Some(invalid) = syntax_error {
            return CheckOutcome {
                value: typed.unwrap_or_else(|| value.clone()),
                field_type: Some(ty),
                invalid: Some(invalid.expecting([ty])),
            };
        }

        let Some(typed) = typed else {
            return CheckOutcome {
                value: value.clone(),
                field_type: Some(ty),
                invalid: Some(InvalidInfo::new(InvalidReason::InvalidValue).expecting([ty])),
            };
        };

        let invalid = self.check_operator(operator, ty, &typed);
        CheckOutcome {
            value: typed,
            field_type: Some(ty),
            invalid,
        }
    }

    /// Reads `value` as `ty`, then as each type interchangeable with it.
    fn coerce_to(&self, value: &Value, ty: FilterType) -> Option<Value> {
        coerce(value, ty).or_else(|| {
            self.types
                .expand(&[ty])
                .into_iter()
                .filter(|candidate| *candidate != ty)
                .find_map(|candidate| coerce(value, candidate))
        })
    }

    fn check_operator(&self, operator: Operator, ty: FilterType, value: &Value) -> Option<InvalidInfo> {
        let allowed: BTreeSet<Operator> = if value.is_list() {
            self.types
                .operators_for(&[ty])
                .intersection(&self.types.operators_for(&[FilterType::List]))
                .copied()
                .collect()
        } else {
            self.types.operators_for(&[ty])
        };

        if allowed.contains(&operator) {
            return None;
        }
        trace!("operator '{}' not valid for {}", operator, ty);
        Some(
            InvalidInfo::new(InvalidReason::InvalidOperator)
                .expecting([ty])
                .with_operators(allowed),
        )
    }
}

struct CheckOutcome {
    value: Value,
    field_type: Option<FilterType>,
    invalid: Option<InvalidInfo>,
}

/// Operators a filter token may use.
///
/// Candidates are the token's resolved type, or failing that the types its
/// [`InvalidInfo`] expected; interchangeable types are folded in. Tokens
/// that are not filters, or whose type cannot be resolved, get an empty set.
pub fn valid_operators(token: &Token, types: &FilterTypeConfig) -> BTreeSet<Operator> {
    let (field_type, invalid) = match token {
        Token::Filter(f) => (f.field_type, f.invalid.as_ref()),
        Token::AggregateFilter(a) => (a.field_type, a.invalid.as_ref()),
        Token::FreeText(_)
        | Token::Spaces(_)
        | Token::ParenGroup(_)
        | Token::Paren(_)
        | Token::LogicBoolean(_) => return BTreeSet::new(),
    };

    let candidates: Vec<FilterType> = match (field_type, invalid) {
        (Some(ty), _) => vec![ty],
        (None, Some(info)) => info.expected_types.clone(),
        (None, None) => Vec::new(),
    };
    types.operators_for(&candidates)
}

/// Like [`valid_operators`], but an unresolvable filter gets `is`/`is not`.
pub fn valid_operators_or_default(token: &Token, types: &FilterTypeConfig) -> BTreeSet<Operator> {
    let operators = valid_operators(token, types);
    if operators.is_empty() && token.key().is_some() {
        return BTreeSet::from([Operator::Default, Operator::NotEqual]);
    }
    operators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDefinition, FunctionDefinition};
    use crate::syntax::QueryParser;

    fn registry() -> FieldRegistry {
        FieldRegistry::new()
            .with_field("status", FieldDefinition::new(FilterType::Text))
            .with_field("count", FieldDefinition::new(FilterType::Number))
            .with_field("age", FieldDefinition::new(FilterType::Date))
            .with_field(
                "transaction.duration",
                FieldDefinition::new(FilterType::Duration).aggregatable(["p95", "avg"]),
            )
            .with_field("release", FieldDefinition::new(FilterType::Text))
            .with_field(
                "user",
                FieldDefinition::new(FilterType::Text).aggregatable(Vec::<String>::new()),
            )
            .with_function("count_unique", FunctionDefinition::returning(FilterType::Number))
    }

    fn first(parser: &QueryParser, input: &str) -> Token {
        parser.parse(input).tokens.into_iter().next().unwrap()
    }

    fn reason(token: &Token) -> Option<InvalidReason> {
        token.invalid().map(|info| info.reason)
    }

    #[test]
    fn test_inferred_types_without_registry() {
        let parser = QueryParser::new();
        match first(&parser, "duration:>500ms") {
            Token::Filter(f) => {
                assert_eq!(f.field_type, Some(FilterType::Duration));
                assert!(matches!(f.value, Value::Duration(_)));
                assert!(f.invalid.is_none());
            }
            other => panic!("Expected filter, got {other:?}"),
        }
        let token = first(&parser, "is:unresolved");
        assert_eq!(reason(&token), None);
    }

    #[test]
    fn test_operator_rejected_for_text() {
        let parser = QueryParser::new();
        let token = first(&parser, "is:>unresolved");
        let info = token.invalid().unwrap();
        assert_eq!(info.reason, InvalidReason::InvalidOperator);
        assert_eq!(info.valid_operators, vec![Operator::Default, Operator::NotEqual]);
    }

    #[test]
    fn test_unknown_key_with_registry() {
        let parser = QueryParser::new().with_registry(registry());
        let token = first(&parser, "asigne:me");
        assert_eq!(reason(&token), Some(InvalidReason::UnknownKey));
        assert!(valid_operators(&token, parser.types()).is_empty());
        assert_eq!(
            valid_operators_or_default(&token, parser.types()),
            BTreeSet::from([Operator::Default, Operator::NotEqual])
        );

        let parser = QueryParser::new()
            .with_registry(registry())
            .with_options(ParseOptions {
                validate_keys: false,
                ..ParseOptions::default()
            });
        assert_eq!(reason(&first(&parser, "asigne:me")), None);
    }

    #[test]
    fn test_declared_type_coerces_value() {
        let parser = QueryParser::new().with_registry(registry());
        match first(&parser, "count:>=10") {
            Token::Filter(f) => {
                assert_eq!(f.field_type, Some(FilterType::Number));
                assert!(matches!(f.value, Value::Number(ref n) if n.value == 10.0));
                assert!(f.invalid.is_none());
            }
            other => panic!("Expected filter, got {other:?}"),
        }

        // quoted numbers still read as numbers on a number field
        assert_eq!(reason(&first(&parser, "count:\"10\"")), None);
        // text that merely looks numeric stays text on a text field
        match first(&parser, "release:10") {
            Token::Filter(f) => assert!(matches!(f.value, Value::Text(_))),
            other => panic!("Expected filter, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_value_reports_expected_type() {
        let parser = QueryParser::new().with_registry(registry());
        let token = first(&parser, "count:lots");
        let info = token.invalid().unwrap();
        assert_eq!(info.reason, InvalidReason::InvalidValue);
        assert_eq!(info.expected_types, vec![FilterType::Number]);

        assert_eq!(
            reason(&first(&parser, "age:yesterday")),
            Some(InvalidReason::InvalidValue)
        );
    }

    #[test]
    fn test_interchangeable_value() {
        let parser = QueryParser::new().with_registry(registry());
        match first(&parser, "count:>2s") {
            Token::Filter(f) => {
                assert_eq!(f.field_type, Some(FilterType::Number));
                assert!(matches!(f.value, Value::Duration(_)));
                assert!(f.invalid.is_none());
            }
            other => panic!("Expected filter, got {other:?}"),
        }
    }

    #[test]
    fn test_date_rejects_not_equal() {
        let parser = QueryParser::new().with_registry(registry());
        let token = first(&parser, "!age:2024-01-01");
        assert_eq!(reason(&token), Some(InvalidReason::InvalidOperator));
        assert_eq!(reason(&first(&parser, "age:>-7d")), None);
    }

    #[test]
    fn test_list_value_limits_operators() {
        let parser = QueryParser::new().with_registry(registry());
        assert_eq!(reason(&first(&parser, "count:[1,2]")), None);
        let token = first(&parser, "count:>[1,2]");
        let info = token.invalid().unwrap();
        assert_eq!(info.reason, InvalidReason::InvalidOperator);
        assert_eq!(info.valid_operators, vec![Operator::Default, Operator::NotEqual]);
    }

    #[test]
    fn test_syntax_error_keeps_expected_type() {
        let parser = QueryParser::new().with_registry(registry());
        let token = first(&parser, "count:");
        let info = token.invalid().unwrap();
        assert_eq!(info.reason, InvalidReason::MissingValue);
        assert_eq!(info.expected_types, vec![FilterType::Number]);
        assert!(valid_operators(&token, parser.types()).contains(&Operator::GreaterThan));
    }

    #[test]
    fn test_aggregates_with_registry() {
        let parser = QueryParser::new().with_registry(registry());

        match first(&parser, "p95(transaction.duration):>1s") {
            Token::AggregateFilter(a) => {
                assert_eq!(a.field_type, Some(FilterType::Duration));
                assert!(a.invalid.is_none());
            }
            other => panic!("Expected aggregate, got {other:?}"),
        }

        assert_eq!(
            reason(&first(&parser, "median(transaction.duration):>1s")),
            Some(InvalidReason::UnknownFunction)
        );
        assert_eq!(
            reason(&first(&parser, "p95(status):>1")),
            Some(InvalidReason::NotAggregatable)
        );
        assert_eq!(
            reason(&first(&parser, "avg(nothing):>1")),
            Some(InvalidReason::UnknownKey)
        );

        match first(&parser, "count_unique(user):>100") {
            Token::AggregateFilter(a) => {
                assert_eq!(a.field_type, Some(FilterType::Number));
                assert!(a.invalid.is_none());
            }
            other => panic!("Expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_function_has_no_type() {
        let parser = QueryParser::new().with_registry(registry());
        let token = first(&parser, "median(transaction.duration):>1s");
        match &token {
            Token::AggregateFilter(a) => assert_eq!(a.field_type, None),
            other => panic!("Expected aggregate, got {other:?}"),
        }
        assert!(valid_operators(&token, parser.types()).is_empty());
        assert_eq!(
            valid_operators_or_default(&token, parser.types()),
            BTreeSet::from([Operator::Default, Operator::NotEqual])
        );
    }

    #[test]
    fn test_non_filters_have_no_operators() {
        let parser = QueryParser::new();
        let token = first(&parser, "hello");
        assert!(valid_operators(&token, parser.types()).is_empty());
        assert!(valid_operators_or_default(&token, parser.types()).is_empty());
    }

    #[test]
    fn test_groups_are_validated() {
        let parser = QueryParser::new().with_registry(registry());
        let token = first(&parser, "(nope:1)");
        assert_eq!(reason(&token.children()[0]), Some(InvalidReason::UnknownKey));
    }
}
