//! Parsing of user-entered value text.
//!
//! - `match`: bool → integer → float → text; surrounding double quotes
//!   force text (`"42"` stays the string `42`)
//! - `range` / `values_count`: `gte..lte`, either side may be blank
//! - `geo_radius`: a JSON object

use quarry_core::{Error, Result};
use serde_json::Number;

use crate::types::{Bounds, Scalar};

/// Parse a `match` value, auto-detecting its type.
pub fn parse_scalar(text: &str) -> Scalar {
    let s = text.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        return Scalar::Text(s[1..s.len() - 1].to_string());
    }
    if s == "true" {
        return Scalar::Bool(true);
    }
    if s == "false" {
        return Scalar::Bool(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Scalar::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() {
            return Scalar::Float(f);
        }
    }
    Scalar::Text(s.to_string())
}

/// Parse one numeric bound, keeping integers integral.
pub fn parse_number(text: &str) -> Result<Number> {
    let s = text.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Number::from(i));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| Error::validation(format!("Not a number: '{s}'")))
}

/// Parse `gte..lte` bounds.
pub fn parse_bounds(text: &str) -> Result<Bounds> {
    let (lo, hi) = text.split_once("..").ok_or_else(|| {
        Error::validation(format!(
            "Expected bounds as 'min..max' (either side optional), got '{}'",
            text.trim()
        ))
    })?;
    if hi.trim_start().starts_with('.') {
        return Err(Error::validation(format!(
            "Ambiguous bounds '{}': use exactly two dots between min and max",
            text.trim()
        )));
    }

    let side = |s: &str| -> Result<Option<Number>> {
        if s.trim().is_empty() {
            Ok(None)
        } else {
            parse_number(s).map(Some)
        }
    };

    Ok(Bounds {
        gte: side(lo)?,
        lte: side(hi)?,
    })
}

/// Parse a `geo_radius` value; it must be a JSON object.
pub fn parse_geo(text: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| Error::validation(format!("geo_radius value must be JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::validation("geo_radius value must be a JSON object"));
    }
    Ok(value)
}
