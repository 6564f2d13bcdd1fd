// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Value formatting for index storage and filter comparisons.
//!
//! Coerces a [`FieldValue`] toward the declared type of the remote field it is
//! compared against or stored into.
//!
//! ```text
//! null                     → null
//! field not in schema      → value unchanged (computed fields are schema-less)
//! Id(x) / UniqueId(x)      → format(x)
//! otherwise                → convert, then check the result is a string,
//!                            the declared type, or a string collection
//! ```

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::sync::Arc;

use crate::error::{Result, SearchError};
use crate::schema::{EdmType, SchemaAccessor};
use crate::value::FieldValue;

/// Value formatter seam used by the query mapper and the commit pipeline.
pub trait ValueFormatter: Send + Sync {
    fn format_value_for_index_storage(&self, value: &FieldValue, field_name: &str) -> Result<FieldValue>;
}

/// Formatter driven by the remote index schema.
pub struct CloudIndexFieldStorageValueFormatter {
    schema: Arc<dyn SchemaAccessor>,
}

impl CloudIndexFieldStorageValueFormatter {
    pub fn new(schema: Arc<dyn SchemaAccessor>) -> Self {
        Self { schema }
    }

    fn unsupported(value: &FieldValue, field: &str, target: EdmType, reason: impl Into<String>) -> SearchError {
        SearchError::UnsupportedConversion {
            field: field.to_string(),
            value: value.to_string(),
            value_type: value.type_name(),
            target,
            reason: reason.into(),
        }
    }
}

impl ValueFormatter for CloudIndexFieldStorageValueFormatter {
    fn format_value_for_index_storage(&self, value: &FieldValue, field_name: &str) -> Result<FieldValue> {
        if field_name.is_empty() {
            return Err(SearchError::InvalidArgument("field name must not be empty".into()));
        }
        if value.is_null() {
            return Ok(FieldValue::Null);
        }

        let Some(field) = self.schema.field_by_cloud_name(field_name) else {
            return Ok(value.clone());
        };

        let converted = match value {
            FieldValue::Id(inner) | FieldValue::UniqueId(inner) => {
                return self.format_value_for_index_storage(inner, field_name);
            }
            other => convert_to_type(other, field.edm_type)
                .map_err(|reason| Self::unsupported(value, field_name, field.edm_type, reason))?,
        };

        if !is_assignable(&converted, field.edm_type) {
            return Err(Self::unsupported(
                value,
                field_name,
                field.edm_type,
                format!("converted value has type '{}'", converted.type_name()),
            ));
        }

        Ok(converted)
    }
}

fn is_assignable(value: &FieldValue, target: EdmType) -> bool {
    match (value, target) {
        (FieldValue::Null, _) | (FieldValue::String(_), _) => true,
        (FieldValue::Bool(_), EdmType::Boolean) => true,
        (FieldValue::Int(_), EdmType::Int32 | EdmType::Int64) => true,
        (FieldValue::Double(_), EdmType::Double) => true,
        (FieldValue::DateTime(_), EdmType::DateTimeOffset) => true,
        (FieldValue::StringList(_), EdmType::StringCollection) => true,
        _ => false,
    }
}

fn convert_to_type(value: &FieldValue, target: EdmType) -> std::result::Result<FieldValue, String> {
    match target {
        EdmType::String => to_string_value(value).map(FieldValue::String),
        EdmType::Int32 => to_integer(value).and_then(|i| {
            i32::try_from(i)
                .map(|_| FieldValue::Int(i))
                .map_err(|_| format!("{} is outside the 32-bit range", i))
        }),
        EdmType::Int64 => to_integer(value).map(FieldValue::Int),
        EdmType::Double => match value {
            FieldValue::Int(i) => Ok(FieldValue::Double(*i as f64)),
            FieldValue::Double(d) => Ok(FieldValue::Double(*d)),
            FieldValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Double)
                .map_err(|e| e.to_string()),
            other => Err(format!("no conversion from {}", other.type_name())),
        },
        EdmType::Boolean => match value {
            FieldValue::Bool(b) => Ok(FieldValue::Bool(*b)),
            FieldValue::Int(0) => Ok(FieldValue::Bool(false)),
            FieldValue::Int(1) => Ok(FieldValue::Bool(true)),
            FieldValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(format!("'{}' is not a boolean", s)),
            },
            other => Err(format!("no conversion from {}", other.type_name())),
        },
        EdmType::DateTimeOffset => match value {
            FieldValue::DateTime(dt) => Ok(FieldValue::DateTime(*dt)),
            FieldValue::String(s) => parse_date_time(s).map(FieldValue::DateTime),
            other => Err(format!("no conversion from {}", other.type_name())),
        },
        EdmType::GeographyPoint => match value {
            FieldValue::String(s) => Ok(FieldValue::String(s.clone())),
            other => Err(format!("no conversion from {}", other.type_name())),
        },
        EdmType::StringCollection => match value {
            FieldValue::StringList(list) => Ok(FieldValue::StringList(list.clone())),
            other => to_string_value(other).map(|s| FieldValue::StringList(vec![s])),
        },
    }
}

fn to_string_value(value: &FieldValue) -> std::result::Result<String, String> {
    match value {
        FieldValue::String(s) => Ok(s.clone()),
        FieldValue::Guid(g) => Ok(g.simple().to_string()),
        FieldValue::Bool(b) => Ok(b.to_string()),
        FieldValue::Int(i) => Ok(i.to_string()),
        FieldValue::Double(d) => Ok(d.to_string()),
        FieldValue::DateTime(dt) => Ok(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        other => Err(format!("no scalar conversion from {}", other.type_name())),
    }
}

fn to_integer(value: &FieldValue) -> std::result::Result<i64, String> {
    match value {
        FieldValue::Int(i) => Ok(*i),
        FieldValue::Double(d) if d.fract() == 0.0 && d.is_finite() => Ok(*d as i64),
        FieldValue::String(s) => s.trim().parse::<i64>().map_err(|e| e.to_string()),
        other => Err(format!("no integer conversion from {}", other.type_name())),
    }
}

/// RFC 3339, or the compact `yyyyMMddTHHmmss[Z]` form used in stored item fields.
fn parse_date_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y%m%dT%H%M%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("'{}' is not a date: {}", s, e))
}
