//! Query grammar parser using Pest
//!
//! Converts the pest parse tree into the raw token sequence. This layer only
//! records what the text looks like: syntax problems (unterminated quotes,
//! unclosed lists, missing values) are attached here, while typing values and
//! checking keys against a registry is left to [`crate::validate`].

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use tracing::trace;

use super::ParseOptions;
use super::token::{
    AggregateArg, AggregateFilterToken, AggregateKey, BooleanOp, FieldKey, FilterToken, FreeText,
    InvalidInfo, InvalidReason, LogicBoolean, Paren, ParenGroup, ParenSide, Spaces, Span, Token,
};
use super::value::{ListValue, TextValue, Value, decode_quoted};
use crate::operators::parse_operator;

/// Query grammar parser.
///
/// The grammar accepts every input; malformed pieces surface as free text or
/// as filters carrying [`InvalidInfo`], never as a parse error.
#[derive(Parser)]
#[grammar = "pest/query.pest"]
pub struct QueryGrammar;

impl QueryGrammar {
    /// Produce the raw (uncollapsed, unvalidated) token sequence.
    pub fn tokenize(
        input: &str,
        options: &ParseOptions,
    ) -> Result<Vec<Token>, Box<pest::error::Error<Rule>>> {
        let mut pairs = Self::parse(Rule::query, input)?;
        let Some(query) = pairs.next() else {
            return Ok(Vec::new());
        };

        let mut tokens = Vec::new();
        for pair in query.into_inner() {
            match pair.as_rule() {
                Rule::EOI => break,
                _ => Self::push_token(pair, options, &mut tokens),
            }
        }

        trace!("grammar produced {} raw tokens", tokens.len());
        Ok(tokens)
    }

    fn push_token(pair: Pair<Rule>, options: &ParseOptions, tokens: &mut Vec<Token>) {
        let span = Span::from(pair.as_span());
        let text = pair.as_str().to_string();

        match pair.as_rule() {
            Rule::spaces => tokens.push(Token::Spaces(Spaces { text, span })),
            Rule::paren_group => Self::push_group(pair, options, tokens),
            Rule::logic_boolean => {
                if options.allow_boolean {
                    let op = if text.eq_ignore_ascii_case("and") {
                        BooleanOp::And
                    } else {
                        BooleanOp::Or
                    };
                    tokens.push(Token::LogicBoolean(LogicBoolean { op, text, span }));
                } else {
                    tokens.push(free_text(text, span));
                }
            }
            Rule::filter => tokens.push(Token::Filter(Self::parse_filter(pair))),
            Rule::aggregate_filter => {
                tokens.push(Token::AggregateFilter(Self::parse_aggregate_filter(pair)))
            }
            Rule::free_text => {
                let value = match pair.into_inner().next() {
                    Some(inner) if inner.as_rule() == Rule::quoted_value => {
                        decode_quoted(inner.as_str()).0
                    }
                    _ => text.clone(),
                };
                tokens.push(Token::FreeText(FreeText { value, text, span }));
            }
            Rule::stray_paren | Rule::stray_open_paren => tokens.push(free_text(text, span)),
            other => {
                trace!("unexpected rule {:?} at {}, keeping as free text", other, span);
                tokens.push(free_text(text, span));
            }
        }
    }

    fn push_group(pair: Pair<Rule>, options: &ParseOptions, tokens: &mut Vec<Token>) {
        let span = Span::from(pair.as_span());
        let text = pair.as_str().to_string();

        let mut children = Vec::new();
        for inner in pair.into_inner() {
            Self::push_token(inner, options, &mut children);
        }

        if options.flatten_paren_groups {
            tokens.push(Token::Paren(Paren {
                side: ParenSide::Open,
                text: "(".to_string(),
                span: Span::new(span.start, span.start + 1),
            }));
            tokens.extend(children);
            tokens.push(Token::Paren(Paren {
                side: ParenSide::Close,
                text: ")".to_string(),
                span: Span::new(span.end - 1, span.end),
            }));
        } else {
            tokens.push(Token::ParenGroup(ParenGroup {
                children,
                text,
                span,
            }));
        }
    }

    fn parse_filter(pair: Pair<Rule>) -> FilterToken {
        let span = Span::from(pair.as_span());
        let text = pair.as_str().to_string();

        let mut negated = false;
        let mut key = FieldKey {
            name: String::new(),
            span: Span::empty_at(span.start),
        };
        let mut operator_pair = None;
        let mut value_pair = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::negation => negated = true,
                Rule::key => {
                    key = FieldKey {
                        name: inner.as_str().to_string(),
                        span: Span::from(inner.as_span()),
                    }
                }
                Rule::operator => operator_pair = Some(inner),
                _ => value_pair = Some(inner),
            }
        }

        let (operator, operator_span) = match operator_pair {
            Some(op) => (parse_operator(op.as_str()), Span::from(op.as_span())),
            None => (parse_operator(":"), Span::empty_at(key.span.end)),
        };
        let operator = if negated { operator.negate() } else { operator };

        let (value, value_span, invalid) = Self::parse_value(value_pair, operator_span.end);

        FilterToken {
            negated,
            key,
            operator,
            operator_span,
            value,
            value_span,
            field_type: None,
            invalid,
            text,
            span,
        }
    }

    fn parse_aggregate_filter(pair: Pair<Rule>) -> AggregateFilterToken {
        let span = Span::from(pair.as_span());
        let text = pair.as_str().to_string();

        let mut key = None;
        let mut operator_pair = None;
        let mut value_pair = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::aggregate_key => key = Some(Self::parse_aggregate_key(inner)),
                Rule::operator => operator_pair = Some(inner),
                _ => value_pair = Some(inner),
            }
        }

        let key = key.unwrap_or_else(|| AggregateKey {
            name: String::new(),
            name_span: Span::empty_at(span.start),
            args: Vec::new(),
            args_span: Span::empty_at(span.start),
            span: Span::empty_at(span.start),
        });
        let (operator, operator_span) = match operator_pair {
            Some(op) => (parse_operator(op.as_str()), Span::from(op.as_span())),
            None => (parse_operator(":"), Span::empty_at(key.span.end)),
        };

        let (value, value_span, invalid) = Self::parse_value(value_pair, operator_span.end);

        AggregateFilterToken {
            key,
            operator,
            operator_span,
            value,
            value_span,
            field_type: None,
            invalid,
            text,
            span,
        }
    }

    fn parse_aggregate_key(pair: Pair<Rule>) -> AggregateKey {
        let span = Span::from(pair.as_span());
        let mut name = String::new();
        let mut name_span = Span::empty_at(span.start);
        let mut args = Vec::new();
        let mut args_span = Span::empty_at(span.start);

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::function_name => {
                    name = inner.as_str().to_string();
                    name_span = Span::from(inner.as_span());
                }
                Rule::aggregate_args => {
                    args_span = Span::from(inner.as_span());
                    args = inner
                        .into_inner()
                        .map(|arg| AggregateArg {
                            value: decode_quoted(arg.as_str()).0,
                            text: arg.as_str().to_string(),
                            span: Span::from(arg.as_span()),
                        })
                        .collect();
                }
                _ => {}
            }
        }

        AggregateKey {
            name,
            name_span,
            args,
            args_span,
            span,
        }
    }

    /// Reads the value pair of a filter. A missing value yields an empty text
    /// value positioned right after the operator.
    fn parse_value(pair: Option<Pair<Rule>>, fallback_pos: usize) -> (Value, Span, Option<InvalidInfo>) {
        let Some(pair) = pair else {
            return (
                Value::empty(),
                Span::empty_at(fallback_pos),
                Some(InvalidInfo::new(InvalidReason::MissingValue)),
            );
        };

        let span = Span::from(pair.as_span());
        let text = pair.as_str();

        match pair.as_rule() {
            Rule::quoted_value => {
                let (value, terminated) = TextValue::quoted(text);
                let invalid =
                    (!terminated).then(|| InvalidInfo::new(InvalidReason::UnterminatedQuote));
                (Value::Text(value), span, invalid)
            }
            Rule::list_value => {
                let mut items = Vec::new();
                let mut terminated = false;
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::quoted_value => items.push(Value::Text(TextValue::quoted(inner.as_str()).0)),
                        Rule::list_word => items.push(Value::Text(TextValue::bare(inner.as_str()))),
                        Rule::list_close => terminated = true,
                        _ => {}
                    }
                }
                let invalid = (!terminated).then(|| InvalidInfo::new(InvalidReason::MalformedList));
                let list = ListValue {
                    items,
                    text: text.to_string(),
                    terminated,
                };
                (Value::List(list), span, invalid)
            }
            _ => {
                // a bracket that did not close before the term ended
                let invalid = text
                    .starts_with('[')
                    .then(|| InvalidInfo::new(InvalidReason::MalformedList));
                (Value::Text(TextValue::bare(text)), span, invalid)
            }
        }
    }
}

fn free_text(text: String, span: Span) -> Token {
    Token::FreeText(FreeText {
        value: text.clone(),
        text,
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::Operator;

    fn raw(input: &str) -> Vec<Token> {
        QueryGrammar::tokenize(input, &ParseOptions::default()).unwrap()
    }

    fn only_filter(input: &str) -> FilterToken {
        let tokens = raw(input);
        assert_eq!(tokens.len(), 1, "expected a single token for {input}: {tokens:?}");
        match tokens.into_iter().next() {
            Some(Token::Filter(filter)) => filter,
            other => panic!("Expected filter for {input}, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_filter() {
        let filter = only_filter("is:unresolved");
        assert!(!filter.negated);
        assert_eq!(filter.key.name, "is");
        assert_eq!(filter.key.span, Span::new(0, 2));
        assert_eq!(filter.operator, Operator::Default);
        assert_eq!(filter.operator_span, Span::new(2, 3));
        assert_eq!(filter.value.text(), "unresolved");
        assert_eq!(filter.value_span, Span::new(3, 13));
        assert!(filter.invalid.is_none());
    }

    #[test]
    fn test_operator_literals() {
        let cases = vec![
            ("n:5", Operator::Default),
            ("n:>5", Operator::GreaterThan),
            ("n:>=5", Operator::GreaterThanOrEqual),
            ("n:<5", Operator::LessThan),
            ("n:<=5", Operator::LessThanOrEqual),
        ];
        for (input, expected) in cases {
            let filter = only_filter(input);
            assert_eq!(filter.operator, expected, "operator for {input}");
            assert_eq!(filter.value.text(), "5");
        }
    }

    #[test]
    fn test_negated_filter() {
        let filter = only_filter("!status:resolved");
        assert!(filter.negated);
        assert_eq!(filter.operator, Operator::NotEqual);
        assert_eq!(filter.key.name, "status");
        assert_eq!(filter.key.span, Span::new(1, 7));
    }

    #[test]
    fn test_quoted_value() {
        let filter = only_filter(r#"message:"hello \"there\" world""#);
        assert!(filter.value.is_quoted());
        assert_eq!(filter.value.raw(), "hello \"there\" world");
        assert!(filter.invalid.is_none());
    }

    #[test]
    fn test_unterminated_quote_consumes_rest() {
        let filter = only_filter("key:\"unterminated value a:1");
        assert_eq!(filter.value.raw(), "unterminated value a:1");
        assert_eq!(
            filter.invalid.map(|i| i.reason),
            Some(InvalidReason::UnterminatedQuote)
        );
    }

    #[test]
    fn test_list_value() {
        let filter = only_filter(r#"browser:[chrome, "fire fox",safari]"#);
        match &filter.value {
            Value::List(list) => {
                assert!(list.terminated);
                let items: Vec<&str> = list.items.iter().map(Value::raw).collect();
                assert_eq!(items, vec!["chrome", "fire fox", "safari"]);
            }
            other => panic!("Expected list, got {other:?}"),
        }
        assert!(filter.invalid.is_none());
    }

    #[test]
    fn test_unclosed_list() {
        let filter = only_filter("browser:[chrome,safari");
        assert!(filter.value.is_list());
        assert_eq!(
            filter.invalid.map(|i| i.reason),
            Some(InvalidReason::MalformedList)
        );

        let tokens = raw("browser:[chrome other:1");
        match &tokens[0] {
            Token::Filter(filter) => {
                assert_eq!(filter.value.text(), "[chrome");
                assert_eq!(
                    filter.invalid.as_ref().map(|i| i.reason),
                    Some(InvalidReason::MalformedList)
                );
            }
            other => panic!("Expected filter, got {other:?}"),
        }
        assert!(matches!(tokens[2], Token::Filter(_)));
    }

    #[test]
    fn test_missing_value() {
        let filter = only_filter("assignee:");
        assert_eq!(filter.value.text(), "");
        assert_eq!(filter.value_span, Span::new(9, 9));
        assert_eq!(
            filter.invalid.map(|i| i.reason),
            Some(InvalidReason::MissingValue)
        );
    }

    #[test]
    fn test_aggregate_filter() {
        let tokens = raw("p95(transaction.duration):>1s");
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            Token::AggregateFilter(agg) => {
                assert_eq!(agg.key.name, "p95");
                assert_eq!(agg.key.args.len(), 1);
                assert_eq!(agg.key.args[0].value, "transaction.duration");
                assert_eq!(agg.key.args_span, Span::new(4, 24));
                assert_eq!(agg.operator, Operator::GreaterThan);
                assert_eq!(agg.value.text(), "1s");
            }
            other => panic!("Expected aggregate filter, got {other:?}"),
        }
    }

    #[test]
    fn test_aggregate_with_several_args() {
        let tokens = raw("count_if(duration, greater, 300):>5");
        match &tokens[0] {
            Token::AggregateFilter(agg) => {
                let args: Vec<&str> = agg.key.args.iter().map(|a| a.text.as_str()).collect();
                assert_eq!(args, vec!["duration", "greater", "300"]);
            }
            other => panic!("Expected aggregate filter, got {other:?}"),
        }

        let tokens = raw("count():5");
        match &tokens[0] {
            Token::AggregateFilter(agg) => {
                assert!(agg.key.args.is_empty());
                assert!(agg.key.args_span.is_empty());
            }
            other => panic!("Expected aggregate filter, got {other:?}"),
        }
    }

    #[test]
    fn test_free_text_and_spaces() {
        let tokens = raw("foo  bar");
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0], Token::FreeText(t) if t.value == "foo"));
        assert!(matches!(&tokens[1], Token::Spaces(s) if s.text == "  "));
        assert!(matches!(&tokens[2], Token::FreeText(t) if t.value == "bar"));
    }

    #[test]
    fn test_quoted_free_text_is_decoded() {
        let tokens = raw(r#""two words""#);
        match &tokens[0] {
            Token::FreeText(t) => {
                assert_eq!(t.value, "two words");
                assert_eq!(t.text, r#""two words""#);
            }
            other => panic!("Expected free text, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_key_is_still_a_filter() {
        let filter = only_filter("asigne:me");
        assert_eq!(filter.key.name, "asigne");
    }

    #[test]
    fn test_paren_group() {
        let tokens = raw("(a:1 OR b:2) c");
        assert_eq!(tokens.len(), 3);
        match &tokens[0] {
            Token::ParenGroup(group) => {
                assert_eq!(group.text, "(a:1 OR b:2)");
                assert_eq!(group.children.len(), 5);
                assert!(matches!(group.children[2], Token::LogicBoolean(ref b) if b.op == BooleanOp::Or));
            }
            other => panic!("Expected group, got {other:?}"),
        }
    }

    #[test]
    fn test_flattened_parens() {
        let options = ParseOptions {
            flatten_paren_groups: true,
            ..ParseOptions::default()
        };
        let tokens = QueryGrammar::tokenize("(a:1)", &options).unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0], Token::Paren(p) if p.side == ParenSide::Open && p.span == Span::new(0, 1)));
        assert!(matches!(&tokens[1], Token::Filter(_)));
        assert!(matches!(&tokens[2], Token::Paren(p) if p.side == ParenSide::Close && p.span == Span::new(4, 5)));
    }

    #[test]
    fn test_unbalanced_parens_become_free_text() {
        let tokens = raw("(a:1");
        assert!(matches!(&tokens[0], Token::FreeText(t) if t.text == "("));
        assert!(matches!(&tokens[1], Token::Filter(_)));

        let tokens = raw("a:1)");
        assert!(matches!(&tokens[0], Token::Filter(_)));
        assert!(matches!(&tokens[1], Token::FreeText(t) if t.text == ")"));
    }

    #[test]
    fn test_boolean_words() {
        let tokens = raw("a:1 and b:2");
        assert!(matches!(&tokens[2], Token::LogicBoolean(b) if b.op == BooleanOp::And));

        // words that merely start with a connective stay free text
        let tokens = raw("order android");
        assert!(tokens.iter().all(|t| !matches!(t, Token::LogicBoolean(_))));

        let options = ParseOptions {
            allow_boolean: false,
            ..ParseOptions::default()
        };
        let tokens = QueryGrammar::tokenize("a:1 OR b:2", &options).unwrap();
        assert!(matches!(&tokens[2], Token::FreeText(t) if t.text == "OR"));
    }

    #[test]
    fn test_empty_input() {
        assert!(raw("").is_empty());
    }
}
