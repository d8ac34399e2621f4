use chrono::{DateTime, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Number, Value as JsonValue};

/// One result row, keyed by column name.
pub type Record = Map<String, JsonValue>;

/// Converts a driver value into something a JSON encoder accepts.
///
/// Dispatch order matters: NULL markers first, then decimals, then
/// temporal values, then everything natively representable; whatever is
/// left is stringified. Decimal conversion goes through f64 and can lose
/// precision.
pub fn normalize_value(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,

        Value::Decimal(d) => match d.to_f64().and_then(Number::from_f64) {
            Some(n) => JsonValue::Number(n),
            None => JsonValue::String(d.to_string()),
        },

        Value::Timestamp(unit, raw) => JsonValue::String(format_timestamp(unit, raw)),
        Value::Date32(days) => JsonValue::String(format_date(days)),
        Value::Time64(unit, raw) => JsonValue::String(format_time(unit, raw)),

        Value::Boolean(v) => JsonValue::Bool(v),
        Value::TinyInt(v) => JsonValue::Number(v.into()),
        Value::SmallInt(v) => JsonValue::Number(v.into()),
        Value::Int(v) => JsonValue::Number(v.into()),
        Value::BigInt(v) => JsonValue::Number(v.into()),
        Value::UTinyInt(v) => JsonValue::Number(v.into()),
        Value::USmallInt(v) => JsonValue::Number(v.into()),
        Value::UInt(v) => JsonValue::Number(v.into()),
        Value::UBigInt(v) => JsonValue::Number(v.into()),
        // 128-bit values only fit a JSON number when they fit in i64
        Value::HugeInt(v) => match i64::try_from(v) {
            Ok(v) => JsonValue::Number(v.into()),
            Err(_) => JsonValue::String(v.to_string()),
        },
        // NaN and infinities have no JSON number representation
        Value::Float(v) => Number::from_f64(f64::from(v))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Double(v) => Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),

        Value::Text(s) => JsonValue::String(s),
        Value::Enum(s) => JsonValue::String(s),

        Value::List(items) => JsonValue::Array(items.into_iter().map(normalize_value).collect()),
        Value::Struct(fields) => {
            let mut map = Map::new();
            for (name, field) in fields.iter() {
                map.insert(name.clone(), normalize_value(field.clone()));
            }
            JsonValue::Object(map)
        }

        Value::Blob(bytes) => JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Interval {
            months,
            days,
            nanos,
        } => JsonValue::String(format!("{} months {} days {} nanos", months, days, nanos)),

        other => JsonValue::String(format!("{:?}", other)),
    }
}

fn to_micros(unit: TimeUnit, raw: i64) -> i64 {
    match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    }
}

fn format_timestamp(unit: TimeUnit, raw: i64) -> String {
    match DateTime::from_timestamp_micros(to_micros(unit, raw)) {
        Some(dt) => dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        None => raw.to_string(),
    }
}

fn format_date(days: i32) -> String {
    match DateTime::from_timestamp(i64::from(days) * 86_400, 0) {
        Some(dt) => dt.date_naive().format("%Y-%m-%d").to_string(),
        None => days.to_string(),
    }
}

fn format_time(unit: TimeUnit, raw: i64) -> String {
    let micros = to_micros(unit, raw);
    let secs = (micros / 1_000_000) as u32;
    let nanos = ((micros % 1_000_000) * 1_000) as u32;
    match NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos) {
        Some(t) => t.format("%H:%M:%S%.6f").to_string(),
        None => raw.to_string(),
    }
}
