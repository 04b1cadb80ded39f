//! Semantic filter types and the operator table that goes with them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::operators::Operator;

/// Declared type of a field, or the type a filter value was read as.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Text,
    Number,
    Duration,
    Date,
    Boolean,
    List,
}

impl FilterType {
    pub const ALL: [FilterType; 6] = [
        FilterType::Text,
        FilterType::Number,
        FilterType::Duration,
        FilterType::Date,
        FilterType::Boolean,
        FilterType::List,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterType::Text => "text",
            FilterType::Number => "number",
            FilterType::Duration => "duration",
            FilterType::Date => "date",
            FilterType::Boolean => "boolean",
            FilterType::List => "list",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown filter type '{s}'"))
    }
}

/// Operators accepted by one filter type, and the types it can stand in for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRule {
    pub operators: BTreeSet<Operator>,
    #[serde(default)]
    pub interchangeable: BTreeSet<FilterType>,
}

impl TypeRule {
    pub fn new(operators: impl IntoIterator<Item = Operator>) -> Self {
        Self {
            operators: operators.into_iter().collect(),
            interchangeable: BTreeSet::new(),
        }
    }

    pub fn interchangeable_with(mut self, types: impl IntoIterator<Item = FilterType>) -> Self {
        self.interchangeable.extend(types);
        self
    }
}

/// Immutable table of [`TypeRule`]s, injected wherever operators are checked.
///
/// `Default` yields the standard table; tests and configuration files can
/// build or override their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterTypeConfig {
    rules: BTreeMap<FilterType, TypeRule>,
}

impl FilterTypeConfig {
    pub fn new(rules: BTreeMap<FilterType, TypeRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Returns a copy with `rule` installed for `ty`.
    pub fn with_rule(mut self, ty: FilterType, rule: TypeRule) -> Self {
        self.rules.insert(ty, rule);
        self
    }

    pub fn rule(&self, ty: FilterType) -> Option<&TypeRule> {
        self.rules.get(&ty)
    }

    pub fn types(&self) -> impl Iterator<Item = FilterType> + '_ {
        self.rules.keys().copied()
    }

    /// Candidate types plus every type declared interchangeable with one of them.
    pub fn expand(&self, candidates: &[FilterType]) -> BTreeSet<FilterType> {
        let mut expanded: BTreeSet<FilterType> = candidates.iter().copied().collect();
        for ty in candidates {
            if let Some(rule) = self.rules.get(ty) {
                expanded.extend(rule.interchangeable.iter().copied());
            }
        }
        expanded
    }

    /// Union of the operator sets of `candidates` and their interchangeable types.
    pub fn operators_for(&self, candidates: &[FilterType]) -> BTreeSet<Operator> {
        self.expand(candidates)
            .into_iter()
            .filter_map(|ty| self.rules.get(&ty))
            .flat_map(|rule| rule.operators.iter().copied())
            .collect()
    }
}

impl Default for FilterTypeConfig {
    fn default() -> Self {
        let equality = [Operator::Default, Operator::NotEqual];
        let comparison = [
            Operator::Default,
            Operator::GreaterThan,
            Operator::GreaterThanOrEqual,
            Operator::LessThan,
            Operator::LessThanOrEqual,
            Operator::NotEqual,
        ];

        Self::empty()
            .with_rule(FilterType::Text, TypeRule::new(equality))
            .with_rule(
                FilterType::Number,
                TypeRule::new(comparison).interchangeable_with([FilterType::Duration]),
            )
            .with_rule(
                FilterType::Duration,
                TypeRule::new(comparison).interchangeable_with([FilterType::Number]),
            )
            .with_rule(
                FilterType::Date,
                TypeRule::new([
                    Operator::Default,
                    Operator::GreaterThan,
                    Operator::GreaterThanOrEqual,
                    Operator::LessThan,
                    Operator::LessThanOrEqual,
                ]),
            )
            .with_rule(FilterType::Boolean, TypeRule::new(equality))
            .with_rule(FilterType::List, TypeRule::new(equality))
    }
}
