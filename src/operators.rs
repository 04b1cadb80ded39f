//! Centralized operator definitions for the search query language.
//!
//! This module is the single source of truth for the filter operators: their
//! literal syntax inside a query (`:`, `:>`, `:>=`, `:<`, `:<=`) and the labels
//! shown to users ("is", "is not", ">", ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied by a filter.
///
/// `NotEqual` has no literal of its own: it is spelled as a negated filter
/// with the default operator (`!status:resolved`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Operator {
    #[serde(rename = "is")]
    Default,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "is not")]
    NotEqual,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Default,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::NotEqual,
    ];

    /// The literal written in a query for this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Default | Operator::NotEqual => ":",
            Operator::GreaterThan => ":>",
            Operator::GreaterThanOrEqual => ":>=",
            Operator::LessThan => ":<",
            Operator::LessThanOrEqual => ":<=",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Operator::Default => "is",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::NotEqual => "is not",
        }
    }

    pub fn is_comparison(self) -> bool {
        !matches!(self, Operator::Default | Operator::NotEqual)
    }

    /// Folds a leading `!` into the operator.
    pub fn negate(self) -> Operator {
        match self {
            Operator::Default => Operator::NotEqual,
            other => other,
        }
    }

    pub fn from_label(label: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.label() == label)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Operator definition with its literal and enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorDef {
    /// The literal used in the query text
    pub symbol: &'static str,
    /// The corresponding enum variant
    pub op: Operator,
}

/// All operator literals, longest first so prefixes never shadow a longer match.
pub const OPERATORS: &[OperatorDef] = &[
    OperatorDef {
        symbol: ":>=",
        op: Operator::GreaterThanOrEqual,
    },
    OperatorDef {
        symbol: ":<=",
        op: Operator::LessThanOrEqual,
    },
    OperatorDef {
        symbol: ":>",
        op: Operator::GreaterThan,
    },
    OperatorDef {
        symbol: ":<",
        op: Operator::LessThan,
    },
    OperatorDef {
        symbol: ":",
        op: Operator::Default,
    },
];

/// Parse an operator from its literal.
///
/// Returns `Operator::Default` for anything that is not a known literal.
pub fn parse_operator(symbol: &str) -> Operator {
    OPERATORS
        .iter()
        .find(|def| def.symbol == symbol)
        .map(|def| def.op)
        .unwrap_or(Operator::Default)
}

/// Get all operator literals for use in documentation or suggestions.
pub fn get_all_operator_symbols() -> Vec<&'static str> {
    OPERATORS.iter().map(|def| def.symbol).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operator() {
        assert_eq!(parse_operator(":"), Operator::Default);
        assert_eq!(parse_operator(":>"), Operator::GreaterThan);
        assert_eq!(parse_operator(":>="), Operator::GreaterThanOrEqual);
        assert_eq!(parse_operator(":<"), Operator::LessThan);
        assert_eq!(parse_operator(":<="), Operator::LessThanOrEqual);

        // Test fallback
        assert_eq!(parse_operator("=="), Operator::Default);
    }

    #[test]
    fn test_symbols_round_trip() {
        for def in OPERATORS {
            assert_eq!(def.op.symbol(), def.symbol);
            assert_eq!(parse_operator(def.op.symbol()), def.op);
        }
        assert_eq!(Operator::NotEqual.symbol(), ":");
    }

    #[test]
    fn test_negate() {
        assert_eq!(Operator::Default.negate(), Operator::NotEqual);
        assert_eq!(Operator::GreaterThan.negate(), Operator::GreaterThan);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Operator::Default.to_string(), "is");
        assert_eq!(Operator::NotEqual.to_string(), "is not");
        for op in Operator::ALL {
            assert_eq!(Operator::from_label(op.label()), Some(op));
        }
        assert_eq!(Operator::from_label("contains"), None);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Operator::GreaterThanOrEqual).unwrap();
        assert_eq!(json, "\">=\"");
        let op: Operator = serde_json::from_str("\"is not\"").unwrap();
        assert_eq!(op, Operator::NotEqual);
    }

    #[test]
    fn test_get_operator_symbols() {
        let symbols = get_all_operator_symbols();
        assert_eq!(symbols.len(), OPERATORS.len());
        assert_eq!(symbols[0], ":>=");
        assert!(symbols.contains(&":"));
    }
}
