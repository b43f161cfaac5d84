//! Coercions shared by the request schemas. Browser forms send numbers both as
//! JSON numbers and as strings, and leave untouched text inputs as `""`.

use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// Trimmed text, or `None` when absent or blank.
pub fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A JSON number or numeric string as a finite `f64`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::validation(format!("Invalid {what} ID")))
}

/// One coordinate of a location: required, numeric, and within `[-limit, limit]`.
pub fn coordinate(value: Option<&Value>, axis: &str, limit: f64) -> Result<f64, ApiError> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::validation("Location coordinates are required"))?;
    let number = coerce_number(value)
        .ok_or_else(|| ApiError::validation(format!("{axis} must be a number")))?;
    if number.abs() > limit {
        return Err(ApiError::validation(format!(
            "{axis} must be between -{limit} and {limit}"
        )));
    }
    Ok(number)
}

pub fn latitude(value: Option<&Value>) -> Result<f64, ApiError> {
    coordinate(value, "Latitude", 90.0)
}

pub fn longitude(value: Option<&Value>) -> Result<f64, ApiError> {
    coordinate(value, "Longitude", 180.0)
}
