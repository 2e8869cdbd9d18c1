use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::StockAnalysisRecord;

/// How numeric input fields decide between a value and null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericPolicy {
    /// Falsy input (including a literal `0`) is stored as null.
    #[default]
    Truthy,
    /// Same as `Truthy` except that a numeric `0` is kept.
    Nullish,
}

impl FromStr for NumericPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "truthy" => Ok(NumericPolicy::Truthy),
            "nullish" => Ok(NumericPolicy::Nullish),
            _ => Err(()),
        }
    }
}

/// Build a storable record from an inbound JSON payload.
///
/// Only `symbol` is required. Every other field falls back to null, and a
/// missing timestamp becomes the current instant.
pub fn normalize(
    payload: &Value,
    policy: NumericPolicy,
) -> Result<StockAnalysisRecord, AppError> {
    let fields = payload.as_object().ok_or_else(|| {
        AppError::Validation("payload must be a JSON object with a symbol".into())
    })?;

    let symbol = match fields.get("symbol") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => return Err(AppError::Validation("missing symbol".into())),
    };

    Ok(StockAnalysisRecord {
        symbol,
        last_analysis_timestamp: timestamp(fields)?,
        price: number(field(fields, &["price"]), policy),
        volume: number(field(fields, &["volume"]), policy),
        pe_ratio: number(field(fields, &["pe_ratio", "peRatio"]), policy),
        dividend_yield: number(field(fields, &["dividend_yield", "dividendYield"]), policy),
        one_year_target: number(field(fields, &["one_year_target", "oneYearTarget"]), policy),
        news_summaries_json: passthrough(field(
            fields,
            &["news_summaries_json", "newsSummariesJson"],
        )),
    })
}

// First non-null value among the accepted spellings of a field.
fn field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|value| !value.is_null())
}

fn number(value: Option<&Value>, policy: NumericPolicy) -> Option<f64> {
    let value = value?;
    if policy == NumericPolicy::Truthy && !is_truthy(value) {
        return None;
    }

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(true) => Some(1.0),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

// JSON truthiness: null, false, 0 and "" are falsy; everything else is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn timestamp(fields: &Map<String, Value>) -> Result<DateTime<Utc>, AppError> {
    let supplied = field(
        fields,
        &["timestamp", "last_analysis_timestamp", "lastAnalysisTimestamp"],
    );

    match supplied {
        Some(Value::String(s)) if !s.trim().is_empty() => DateTime::parse_from_rfc3339(s.trim())
            .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(6))
            .map_err(|e| AppError::Validation(format!("invalid timestamp {:?}: {}", s, e))),
        Some(Value::String(_)) | None => Ok(Utc::now().trunc_subsecs(6)),
        Some(other) => Err(AppError::Validation(format!(
            "invalid timestamp {}: expected an ISO-8601 string",
            other
        ))),
    }
}

fn passthrough(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
