//! Declared front-matter field types and value coercion.

use crate::error::{GalleriaError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Property types a host may declare for a front-matter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Checkbox,
    List,
    Date,
    DateTime,
}

impl FieldType {
    /// Coerce `value` into this type's YAML representation.
    pub fn coerce(self, name: &str, value: Value) -> Result<Value> {
        let invalid = |value: &Value| GalleriaError::Validation {
            field: name.to_string(),
            message: format!("cannot store {:?} as {:?}", value, self),
        };

        match (self, value) {
            (FieldType::Text, Value::String(s)) => Ok(Value::String(s)),
            (FieldType::Text, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (FieldType::Text, Value::Bool(b)) => Ok(Value::String(b.to_string())),

            (FieldType::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (FieldType::Number, Value::String(s)) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Ok(Value::Number(i.into()))
                } else if let Ok(f) = trimmed.parse::<f64>() {
                    Ok(Value::Number(f.into()))
                } else {
                    Err(invalid(&Value::String(s)))
                }
            }

            (FieldType::Checkbox, Value::Bool(b)) => Ok(Value::Bool(b)),
            (FieldType::Checkbox, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Ok(Value::Bool(true)),
                "false" | "no" => Ok(Value::Bool(false)),
                _ => Err(invalid(&Value::String(s))),
            },

            (FieldType::List, Value::Sequence(items)) => Ok(Value::Sequence(items)),
            (FieldType::List, Value::String(s)) => Ok(Value::Sequence(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )),
            (FieldType::List, Value::Null) => Ok(Value::Sequence(Vec::new())),
            (FieldType::List, scalar @ (Value::Number(_) | Value::Bool(_))) => {
                Ok(Value::Sequence(vec![scalar]))
            }

            (FieldType::Date, Value::String(s)) => parse_date(&s)
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| invalid(&Value::String(s))),

            (FieldType::DateTime, Value::String(s)) => parse_datetime(&s)
                .map(|dt| Value::String(format_timestamp(dt)))
                .ok_or_else(|| invalid(&Value::String(s))),
            (FieldType::DateTime, Value::Number(n)) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(|dt| Value::String(format_timestamp(dt)))
                .ok_or_else(|| invalid(&Value::Number(n))),

            (_, other) => Err(invalid(&other)),
        }
    }
}

/// Canonical timestamp form written into front matter.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a front-matter timestamp: RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS`
/// (taken as UTC), or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_datetime(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    parse_date(s).and_then(|date| date.and_hms_opt(0, 0, 0)).map(|n| n.and_utc())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
