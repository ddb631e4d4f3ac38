//! Filter rows and their operator-specific values.
//!
//! A row's value is a tagged union keyed by operator, so switching a row to
//! another operator always replaces the payload with that operator's empty
//! shape instead of carrying stale fields across.

use std::fmt;
use std::str::FromStr;

use quarry_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Number;

// ============================================================================
// Category
// ============================================================================

/// Boolean category a filter row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Every condition must hold.
    Must,
    /// No condition may hold.
    MustNot,
    /// At least one condition should hold.
    Should,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 3] = [Self::Must, Self::MustNot, Self::Should];

    /// Wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Must => "must",
            Self::MustNot => "must_not",
            Self::Should => "should",
        }
    }

    /// Heading used when listing the category's rows.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Must => "Must Filters",
            Self::MustNot => "Must Not Filters",
            Self::Should => "Should Filters",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Must => 0,
            Self::MustNot => 1,
            Self::Should => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "must" => Ok(Self::Must),
            "must_not" | "mustnot" => Ok(Self::MustNot),
            "should" => Ok(Self::Should),
            other => Err(Error::validation(format!(
                "Unknown filter category: '{other}'. Expected must, must_not or should"
            ))),
        }
    }
}

// ============================================================================
// Operator
// ============================================================================

/// Field-level condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Exact match against a scalar.
    Match,
    /// Numeric range on the field value.
    Range,
    /// Range on the number of values stored under the field.
    ValuesCount,
    /// Geographic radius; the value is passed through untouched.
    GeoRadius,
}

impl Operator {
    /// All operators.
    pub const ALL: [Operator; 4] = [
        Self::Match,
        Self::Range,
        Self::ValuesCount,
        Self::GeoRadius,
    ];

    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Range => "range",
            Self::ValuesCount => "values_count",
            Self::GeoRadius => "geo_radius",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "match" => Ok(Self::Match),
            "range" => Ok(Self::Range),
            "values_count" => Ok(Self::ValuesCount),
            "geo_radius" => Ok(Self::GeoRadius),
            other => Err(Error::validation(format!(
                "Unknown operator: '{other}'. Expected match, range, values_count or geo_radius"
            ))),
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// Scalar compared by a `match` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Keyword / text value.
    Text(String),
}

impl Default for Scalar {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Inclusive lower/upper bounds used by `range` and `values_count`.
///
/// Unset bounds are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Number>,

    /// Upper bound (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Number>,
}

impl Bounds {
    /// Bounds with both ends set.
    pub fn between(gte: impl Into<Number>, lte: impl Into<Number>) -> Self {
        Self {
            gte: Some(gte.into()),
            lte: Some(lte.into()),
        }
    }

    /// True when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }

    /// True when both bounds are set and `gte > lte`.
    pub fn is_inverted(&self) -> bool {
        match (
            self.gte.as_ref().and_then(Number::as_f64),
            self.lte.as_ref().and_then(Number::as_f64),
        ) {
            (Some(lo), Some(hi)) => lo > hi,
            _ => false,
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |n: &Option<Number>| n.as_ref().map(Number::to_string).unwrap_or_default();
        write!(f, "{}..{}", side(&self.gte), side(&self.lte))
    }
}

/// Operator-specific value of a filter row.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// `match` value.
    Match(Scalar),
    /// `range` bounds.
    Range(Bounds),
    /// `values_count` bounds.
    ValuesCount(Bounds),
    /// Opaque `geo_radius` object.
    GeoRadius(serde_json::Value),
}

impl FilterValue {
    /// The empty value shape for `operator`.
    pub fn empty(operator: Operator) -> Self {
        match operator {
            Operator::Match => Self::Match(Scalar::default()),
            Operator::Range => Self::Range(Bounds::default()),
            Operator::ValuesCount => Self::ValuesCount(Bounds::default()),
            Operator::GeoRadius => Self::GeoRadius(serde_json::Value::Null),
        }
    }

    /// The operator this value belongs to.
    pub fn operator(&self) -> Operator {
        match self {
            Self::Match(_) => Operator::Match,
            Self::Range(_) => Operator::Range,
            Self::ValuesCount(_) => Operator::ValuesCount,
            Self::GeoRadius(_) => Operator::GeoRadius,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match(s) => write!(f, "{s}"),
            Self::Range(b) | Self::ValuesCount(b) => write!(f, "{b}"),
            Self::GeoRadius(v) => write!(f, "{v}"),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Stable identifier of a filter row.
///
/// Unlike positions, ids survive removals of other rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub(crate) u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One editable filter row.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRow {
    /// Stable identifier.
    pub id: RowId,
    /// Payload field the condition applies to.
    pub key: String,
    /// Operator-specific value.
    pub value: FilterValue,
}

impl FilterRow {
    /// The row's operator.
    pub fn operator(&self) -> Operator {
        self.value.operator()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_parsing() {
        assert_eq!("must".parse::<Category>().unwrap(), Category::Must);
        assert_eq!("must-not".parse::<Category>().unwrap(), Category::MustNot);
        assert_eq!("MUST_NOT".parse::<Category>().unwrap(), Category::MustNot);
        assert_eq!("should".parse::<Category>().unwrap(), Category::Should);
        assert!("any".parse::<Category>().unwrap_err().is_validation());
    }

    #[test]
    fn test_operator_parsing() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
        assert!("contains".parse::<Operator>().unwrap_err().is_validation());
    }

    #[test]
    fn test_empty_shapes() {
        assert_eq!(
            FilterValue::empty(Operator::Match),
            FilterValue::Match(Scalar::Text(String::new()))
        );
        assert_eq!(
            FilterValue::empty(Operator::Range),
            FilterValue::Range(Bounds::default())
        );
        assert_eq!(
            FilterValue::empty(Operator::GeoRadius),
            FilterValue::GeoRadius(serde_json::Value::Null)
        );
        for op in Operator::ALL {
            assert_eq!(FilterValue::empty(op).operator(), op);
        }
    }

    #[test]
    fn test_scalar_serializes_untagged() {
        assert_eq!(serde_json::to_value(Scalar::from("red")).unwrap(), json!("red"));
        assert_eq!(serde_json::to_value(Scalar::Integer(3)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(Scalar::Bool(true)).unwrap(), json!(true));
    }

    #[test]
    fn test_bounds_skip_unset() {
        let b = Bounds {
            gte: Some(5.into()),
            lte: None,
        };
        assert_eq!(serde_json::to_value(&b).unwrap(), json!({"gte": 5}));
        assert_eq!(
            serde_json::to_value(Bounds::between(10, 100)).unwrap(),
            json!({"gte": 10, "lte": 100})
        );
    }

    #[test]
    fn test_bounds_inverted() {
        assert!(Bounds::between(100, 10).is_inverted());
        assert!(!Bounds::between(10, 10).is_inverted());
        assert!(!Bounds::default().is_inverted());
        assert!(Bounds::default().is_unbounded());
        let floats = Bounds {
            gte: Number::from_f64(2.5),
            lte: Number::from_f64(1.0),
        };
        assert!(floats.is_inverted());
    }

    #[test]
    fn test_display() {
        assert_eq!(Bounds::between(1, 9).to_string(), "1..9");
        assert_eq!(FilterValue::Match("red".into()).to_string(), "\"red\"");
        assert_eq!(RowId(4).to_string(), "#4");
    }
}
