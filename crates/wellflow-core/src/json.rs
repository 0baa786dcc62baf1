//! Row <-> JSON object conversion used by the bronze and silver tiers.

use std::io;

use chrono::{DateTime, NaiveDate};
use polars::prelude::*;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Number, Value};

use crate::error::Result;

/// Writes `{"a": 1, "b": [1, 2]}` instead of serde_json's compact form.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

pub fn to_spaced_string(value: &Value) -> Result<String> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn any_value_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Bool(v),
        AnyValue::String(v) => Value::String(v.to_string()),
        AnyValue::StringOwned(v) => Value::String(v.to_string()),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => float_to_json(f64::from(v)),
        AnyValue::Float64(v) => float_to_json(v),
        AnyValue::Date(days) => date_from_epoch_days(days)
            .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        AnyValue::Datetime(v, unit, _) => datetime_to_rfc3339(v, unit)
            .map(Value::String)
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

pub(crate) fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::Duration::days(i64::from(days)))
}

pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    date.signed_duration_since(epoch).num_days() as i32
}

fn datetime_to_rfc3339(value: i64, unit: TimeUnit) -> Option<String> {
    let dt = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    }?;
    Some(dt.to_rfc3339())
}

/// Builds the JSON object for one row, keeping column order.
pub fn row_to_json(df: &DataFrame, idx: usize) -> Result<Map<String, Value>> {
    let mut object = Map::with_capacity(df.width());
    for column in df.get_columns() {
        let value = column.get(idx)?;
        object.insert(column.name().to_string(), any_value_to_json(value));
    }
    Ok(object)
}

/// Flattens nested objects into dotted keys: `{"a": {"b": 1}}` -> `{"a.b": 1}`.
pub fn flatten_object(object: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::with_capacity(object.len());
    flatten_into(None, object, &mut flat);
    flat
}

fn flatten_into(prefix: Option<&str>, object: Map<String, Value>, out: &mut Map<String, Value>) {
    for (key, value) in object {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };
        match value {
            Value::Object(nested) => flatten_into(Some(&name), nested, out),
            other => {
                out.insert(name, other);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Empty,
    Bool,
    Int,
    Float,
    Text,
}

impl Inferred {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Inferred::Empty,
            Value::Bool(_) => Inferred::Bool,
            Value::Number(n) if n.is_i64() => Inferred::Int,
            Value::Number(_) => Inferred::Float,
            _ => Inferred::Text,
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Inferred::Empty, b) => b,
            (a, Inferred::Empty) => a,
            (Inferred::Int, Inferred::Float) | (Inferred::Float, Inferred::Int) => Inferred::Float,
            _ => Inferred::Text,
        }
    }
}

/// Turns parsed row objects into typed columns. Keys are ordered by first
/// appearance; a key absent from a row is null in that row.
pub fn objects_to_columns(rows: &[Map<String, Value>]) -> Vec<Column> {
    let mut keys: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key.as_str());
            }
        }
    }

    keys.into_iter()
        .map(|key| {
            let values: Vec<Option<&Value>> = rows
                .iter()
                .map(|row| row.get(key).filter(|v| !v.is_null()))
                .collect();
            let inferred = values
                .iter()
                .flatten()
                .fold(Inferred::Empty, |acc, v| acc.merge(Inferred::of(v)));
            build_series(key, inferred, &values).into()
        })
        .collect()
}

fn build_series(name: &str, inferred: Inferred, values: &[Option<&Value>]) -> Series {
    match inferred {
        Inferred::Bool => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| v.and_then(Value::as_bool))
                .collect::<Vec<Option<bool>>>(),
        ),
        Inferred::Int => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| v.and_then(Value::as_i64))
                .collect::<Vec<Option<i64>>>(),
        ),
        Inferred::Float => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| v.and_then(Value::as_f64))
                .collect::<Vec<Option<f64>>>(),
        ),
        Inferred::Text | Inferred::Empty => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| {
                    v.map(|value| match value {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                })
                .collect::<Vec<Option<String>>>(),
        ),
    }
}
