//! String surgery used by edit commits.

use crate::operators::Operator;
use crate::syntax::token::{Span, Token};

/// Replaces `span` of `source` with `replacement`.
pub fn splice(source: &str, span: Span, replacement: &str) -> String {
    let mut out = String::with_capacity(source.len() - span.len() + replacement.len());
    out.push_str(&source[..span.start]);
    out.push_str(replacement);
    out.push_str(&source[span.end..]);
    out
}

/// Removes `span` together with one neighbouring whitespace character,
/// preferring the one after it. When neither side is whitespace a single
/// space is left between the neighbours so they stay separate terms.
pub fn remove_with_separator(source: &str, span: Span) -> String {
    let before = source[..span.start].chars().next_back();
    let after = source[span.end..].chars().next();

    if let Some(c) = after.filter(|c| c.is_whitespace()) {
        return splice(source, Span::new(span.start, span.end + c.len_utf8()), "");
    }
    if let Some(c) = before.filter(|c| c.is_whitespace()) {
        return splice(source, Span::new(span.start - c.len_utf8(), span.end), "");
    }

    match (before, after) {
        (Some(b), Some(a)) if b != '(' && a != ')' => splice(source, span, " "),
        _ => splice(source, span, ""),
    }
}

/// Rewrites the operator of a filter token. Plain filters spell `is not` as a
/// leading `!`, so that prefix is added or dropped as needed. Aggregates have
/// no negated form and return `None` for it.
pub fn rewrite_operator(source: &str, token: &Token, operator: Operator) -> Option<String> {
    match token {
        Token::Filter(filter) => {
            let mut out = String::with_capacity(source.len() + 1);
            out.push_str(&source[..filter.span.start]);
            if operator == Operator::NotEqual {
                out.push('!');
            }
            out.push_str(filter.key.span.slice(source));
            out.push_str(operator.symbol());
            out.push_str(&source[filter.operator_span.end..]);
            Some(out)
        }
        Token::AggregateFilter(agg) if operator != Operator::NotEqual => {
            Some(splice(source, agg.operator_span, operator.symbol()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    #[test]
    fn test_splice() {
        assert_eq!(splice("a:1 b:2", Span::new(6, 7), "3"), "a:1 b:3");
        assert_eq!(splice("a:", Span::empty_at(2), "x"), "a:x");
    }

    #[test]
    fn test_remove_with_separator() {
        assert_eq!(remove_with_separator("a:1 b:2 c:3", Span::new(4, 7)), "a:1 c:3");
        assert_eq!(remove_with_separator("a:1 b:2", Span::new(4, 7)), "a:1");
        assert_eq!(remove_with_separator("a:1", Span::new(0, 3)), "");
        assert_eq!(remove_with_separator("(a:1)", Span::new(1, 4)), "()");
        assert_eq!(remove_with_separator("a:1 foo b:2", Span::new(3, 8)), "a:1 b:2");
        assert_eq!(remove_with_separator("x:1 foo(b:2)", Span::new(3, 7)), "x:1 (b:2)");
    }

    #[test]
    fn test_rewrite_operator() {
        let source = "!status:resolved x";
        let result = parse(source);
        assert_eq!(
            rewrite_operator(source, &result.tokens[0], Operator::Default).as_deref(),
            Some("status:resolved x")
        );

        let source = "n:5";
        let result = parse(source);
        assert_eq!(
            rewrite_operator(source, &result.tokens[0], Operator::GreaterThanOrEqual).as_deref(),
            Some("n:>=5")
        );
        assert_eq!(
            rewrite_operator(source, &result.tokens[0], Operator::NotEqual).as_deref(),
            Some("!n:5")
        );

        let source = "count():>5";
        let result = parse(source);
        assert_eq!(
            rewrite_operator(source, &result.tokens[0], Operator::LessThan).as_deref(),
            Some("count():<5")
        );
        assert_eq!(rewrite_operator(source, &result.tokens[0], Operator::NotEqual), None);
    }
}
