//! Field registry: the caller-supplied description of searchable fields.
//!
//! The registry maps a field key to its declared [`FilterType`], whether it may
//! be aggregated, and which aggregate functions apply to it. It is consumed by
//! the parser, never fetched by it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::FilterType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FilterType,
    #[serde(default)]
    pub aggregatable: bool,
    /// Functions that may aggregate this field. Empty means any known function.
    #[serde(default)]
    pub aggregate_functions: Vec<String>,
}

impl FieldDefinition {
    pub fn new(field_type: FilterType) -> Self {
        Self {
            field_type,
            aggregatable: false,
            aggregate_functions: Vec::new(),
        }
    }

    pub fn aggregatable<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregatable = true;
        self.aggregate_functions = functions.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows_function(&self, name: &str) -> bool {
        self.aggregatable
            && (self.aggregate_functions.is_empty()
                || self.aggregate_functions.iter().any(|f| f == name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Type of the aggregate's result; `None` means the type of its field argument.
    #[serde(default)]
    pub return_type: Option<FilterType>,
}

impl FunctionDefinition {
    pub fn returning(ty: FilterType) -> Self {
        Self {
            return_type: Some(ty),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRegistry {
    #[serde(default)]
    fields: BTreeMap<String, FieldDefinition>,
    #[serde(default)]
    functions: BTreeMap<String, FunctionDefinition>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        fields: BTreeMap<String, FieldDefinition>,
        functions: BTreeMap<String, FunctionDefinition>,
    ) -> Self {
        Self { fields, functions }
    }

    pub fn with_field(mut self, key: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(key.into(), definition);
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, definition: FunctionDefinition) -> Self {
        self.functions.insert(name.into(), definition);
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.get(key)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// A function is known when it is declared, or when some field lists it
    /// among its aggregate functions.
    pub fn is_known_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
            || self
                .fields
                .values()
                .any(|def| def.aggregate_functions.iter().any(|f| f == name))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.functions.is_empty()
    }
}
