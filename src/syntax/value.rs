//! Typed filter values.
//!
//! The grammar only knows whether a value was bare, quoted or a bracket list.
//! Turning that text into a number, duration, date or boolean happens here,
//! either against a field's declared type ([`coerce`]) or by looking at the
//! value's shape when no type is known ([`infer`]).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;

use crate::types::FilterType;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)([kKmMbB])?$").expect("number pattern is valid")
});

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(ms|s|min|m|hr|h|day|d|wk|w)$").expect("duration pattern is valid")
});

static RELATIVE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-])(\d+)(s|m|h|d|w)$").expect("relative date pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl DurationUnit {
    pub fn from_suffix(suffix: &str) -> Option<DurationUnit> {
        match suffix {
            "ms" => Some(DurationUnit::Millisecond),
            "s" => Some(DurationUnit::Second),
            "m" | "min" => Some(DurationUnit::Minute),
            "h" | "hr" => Some(DurationUnit::Hour),
            "d" | "day" => Some(DurationUnit::Day),
            "w" | "wk" => Some(DurationUnit::Week),
            _ => None,
        }
    }

    pub fn millis(self) -> f64 {
        match self {
            DurationUnit::Millisecond => 1.0,
            DurationUnit::Second => 1_000.0,
            DurationUnit::Minute => 60_000.0,
            DurationUnit::Hour => 3_600_000.0,
            DurationUnit::Day => 86_400_000.0,
            DurationUnit::Week => 604_800_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextValue {
    pub value: String,
    pub text: String,
    pub quoted: bool,
}

impl TextValue {
    pub fn bare(text: &str) -> Self {
        Self {
            value: text.to_string(),
            text: text.to_string(),
            quoted: false,
        }
    }

    /// Decodes a double-quoted literal. The second element is `false` when
    /// the closing quote is missing.
    pub fn quoted(text: &str) -> (Self, bool) {
        let (value, terminated) = decode_quoted(text);
        (
            Self {
                value,
                text: text.to_string(),
                quoted: true,
            },
            terminated,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberValue {
    pub value: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationValue {
    pub millis: f64,
    pub amount: f64,
    pub unit: DurationUnit,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "form", rename_all = "camelCase")]
pub enum DateSpec {
    Absolute { timestamp: NaiveDateTime },
    /// Offset from now; negative values point into the past.
    Relative { millis: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateValue {
    pub value: DateSpec,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanValue {
    pub value: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListValue {
    pub items: Vec<Value>,
    pub text: String,
    pub terminated: bool,
}

/// Value of a filter: decoded content plus the literal it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Value {
    Text(TextValue),
    Number(NumberValue),
    Duration(DurationValue),
    Date(DateValue),
    Boolean(BooleanValue),
    List(ListValue),
}

impl Value {
    pub fn empty() -> Self {
        Value::Text(TextValue::bare(""))
    }

    /// Literal text as written in the query.
    pub fn text(&self) -> &str {
        match self {
            Value::Text(v) => &v.text,
            Value::Number(v) => &v.text,
            Value::Duration(v) => &v.text,
            Value::Date(v) => &v.text,
            Value::Boolean(v) => &v.text,
            Value::List(v) => &v.text,
        }
    }

    /// Decoded scalar content; literal text for typed values.
    pub fn raw(&self) -> &str {
        match self {
            Value::Text(v) => &v.value,
            other => other.text(),
        }
    }

    pub fn value_type(&self) -> FilterType {
        match self {
            Value::Text(_) => FilterType::Text,
            Value::Number(_) => FilterType::Number,
            Value::Duration(_) => FilterType::Duration,
            Value::Date(_) => FilterType::Date,
            Value::Boolean(_) => FilterType::Boolean,
            Value::List(_) => FilterType::List,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, Value::Text(TextValue { quoted: true, .. }))
    }
}

/// Decodes a double-quoted literal: `\"` becomes `"`, every other character
/// (including other backslash sequences) is kept as written.
pub fn decode_quoted(text: &str) -> (String, bool) {
    let Some(body) = text.strip_prefix('"') else {
        return (text.to_string(), true);
    };

    let mut value = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('"') => value.push('"'),
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => value.push('\\'),
            },
            '"' => return (value, true),
            other => value.push(other),
        }
    }
    (value, false)
}

/// Quotes `value` when it would not survive as a bare word.
pub fn quote_if_needed(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.is_empty()
        || value.starts_with('"')
        || value.starts_with('[')
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')');

    if !needs_quotes {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("\"{}\"", value.replace('"', "\\\"")))
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let caps = NUMBER_RE.captures(raw)?;
    let base: f64 = caps.get(1)?.as_str().parse().ok()?;
    let scale = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        None => 1.0,
        Some(suffix) => match suffix.as_str() {
            "k" => 1e3,
            "m" => 1e6,
            "b" => 1e9,
            _ => return None,
        },
    };
    Some(base * scale)
}

pub fn parse_duration(raw: &str) -> Option<(f64, DurationUnit)> {
    let caps = DURATION_RE.captures(raw)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = DurationUnit::from_suffix(caps.get(2)?.as_str())?;
    Some((amount, unit))
}

pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Absolute ISO-8601 dates (`2024-01-31`, `2024-01-31T10:00:00Z`, ...) and
/// relative offsets (`-14d`, `+1h`).
pub fn parse_date(raw: &str) -> Option<DateSpec> {
    if let Some(caps) = RELATIVE_DATE_RE.captures(raw) {
        let amount: i64 = caps.get(2)?.as_str().parse().ok()?;
        let unit = DurationUnit::from_suffix(caps.get(3)?.as_str())?;
        let millis = amount.checked_mul(unit.millis() as i64)?;
        let millis = if &caps[1] == "-" { -millis } else { millis };
        return Some(DateSpec::Relative { millis });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(DateSpec::Absolute {
            timestamp: dt.naive_utc(),
        });
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(DateSpec::Absolute { timestamp });
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|timestamp| DateSpec::Absolute { timestamp })
}

/// Reads `value` as `ty`. Returns `None` when the text does not fit the type.
///
/// List values are coerced item by item; a `list` field holds text items.
pub fn coerce(value: &Value, ty: FilterType) -> Option<Value> {
    if let Value::List(list) = value {
        let item_type = match ty {
            FilterType::List => FilterType::Text,
            other => other,
        };
        let items = list
            .items
            .iter()
            .map(|item| coerce(item, item_type))
            .collect::<Option<Vec<_>>>()?;
        return Some(Value::List(ListValue {
            items,
            text: list.text.clone(),
            terminated: list.terminated,
        }));
    }

    let raw = value.raw();
    let text = value.text().to_string();
    match ty {
        FilterType::Text | FilterType::List => Some(match value {
            Value::Text(v) => Value::Text(v.clone()),
            other => Value::Text(TextValue {
                value: other.raw().to_string(),
                text,
                quoted: false,
            }),
        }),
        FilterType::Number => parse_number(raw).map(|n| Value::Number(NumberValue { value: n, text })),
        FilterType::Duration => {
            if let Some((amount, unit)) = parse_duration(raw) {
                return Some(Value::Duration(DurationValue {
                    millis: amount * unit.millis(),
                    amount,
                    unit,
                    text,
                }));
            }
            // a bare number on a duration field is read as milliseconds
            parse_number(raw).map(|millis| {
                Value::Duration(DurationValue {
                    millis,
                    amount: millis,
                    unit: DurationUnit::Millisecond,
                    text,
                })
            })
        }
        FilterType::Date => parse_date(raw).map(|spec| Value::Date(DateValue { value: spec, text })),
        FilterType::Boolean => {
            parse_boolean(raw).map(|b| Value::Boolean(BooleanValue { value: b, text }))
        }
    }
}

/// Types a value by its shape. Quoted values always stay text.
pub fn infer(value: &Value) -> Value {
    match value {
        Value::List(list) => Value::List(ListValue {
            items: list.items.iter().map(infer).collect(),
            text: list.text.clone(),
            terminated: list.terminated,
        }),
        Value::Text(text) if !text.quoted && !text.value.is_empty() => {
            [FilterType::Duration, FilterType::Number, FilterType::Date]
                .into_iter()
                .find_map(|ty| coerce(value, ty))
                .unwrap_or_else(|| value.clone())
        }
        other => other.clone(),
    }
}
