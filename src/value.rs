// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Native field values.
//!
//! [`FieldValue`] is what callers put into comparisons and what the
//! [`ValueFormatter`](crate::formatter::ValueFormatter) coerces toward a field's
//! declared [`EdmType`](crate::schema::EdmType).

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// A native value compared against, or stored into, an index field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
    StringList(Vec<String>),
    /// Entity reference by id; formatted as the wrapped scalar
    Id(Box<FieldValue>),
    /// Entity reference by unique id; formatted as the wrapped scalar
    UniqueId(Box<FieldValue>),
}

impl FieldValue {
    /// Wrap a value as an entity id reference.
    pub fn id(inner: impl Into<FieldValue>) -> Self {
        Self::Id(Box::new(inner.into()))
    }

    /// Wrap a value as an entity unique id reference.
    pub fn unique_id(inner: impl Into<FieldValue>) -> Self {
        Self::UniqueId(Box::new(inner.into()))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Runtime type name, used in conversion error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::DateTime(_) => "datetime",
            Self::Guid(_) => "guid",
            Self::StringList(_) => "string-list",
            Self::Id(_) => "id",
            Self::UniqueId(_) => "unique-id",
        }
    }

    /// Convert to the JSON representation stored in a document.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Guid(g) => Value::String(g.simple().to_string()),
            Self::StringList(list) => Value::Array(list.iter().cloned().map(Value::String).collect()),
            Self::Id(inner) | Self::UniqueId(inner) => inner.to_json(),
        }
    }

    /// Best-effort conversion from a JSON document value.
    ///
    /// Arrays become a string list only when every element is a string;
    /// other arrays and objects keep their JSON text.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Double(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => {
                let strings: Option<Vec<String>> =
                    items.iter().map(|v| v.as_str().map(str::to_string)).collect();
                match strings {
                    Some(list) => Self::StringList(list),
                    None => Self::String(value.to_string()),
                }
            }
            Value::Object(_) => Self::String(value.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Double(d) => write!(f, "{}", d),
            Self::String(s) => write!(f, "{}", s),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Guid(g) => write!(f, "{}", g),
            Self::StringList(list) => write!(f, "{}", list.join("|")),
            Self::Id(inner) | Self::UniqueId(inner) => write!(f, "{}", inner),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        Self::Guid(v)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}
