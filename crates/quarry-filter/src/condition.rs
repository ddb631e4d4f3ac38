//! Structured conditions and the compiled three-way filter.
//!
//! The serialized form is exactly what Qdrant accepts in a search
//! request's `filter` field:
//!
//! ```json
//! {
//!   "must": [{"key": "category", "match": {"value": "electronics"}}],
//!   "must_not": [],
//!   "should": [{"key": "price", "range": {"gte": 10, "lte": 100}}]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Bounds, Category, FilterRow, FilterValue, Operator, Scalar};

/// A single field-level condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Payload field.
    pub key: String,

    /// Operator-specific clause, flattened next to `key`.
    #[serde(flatten)]
    pub clause: Clause,
}

/// Operator-specific part of a [`Condition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// `{"match": {"value": ...}}`
    Match {
        /// Value to match.
        value: Scalar,
    },
    /// `{"range": {"gte": .., "lte": ..}}`
    Range(Bounds),
    /// `{"values_count": {"gte": .., "lte": ..}}`
    ValuesCount(Bounds),
    /// `{"geo_radius": ...}`
    GeoRadius(serde_json::Value),
}

impl Clause {
    /// The operator this clause was rendered from.
    pub fn operator(&self) -> Operator {
        match self {
            Self::Match { .. } => Operator::Match,
            Self::Range(_) => Operator::Range,
            Self::ValuesCount(_) => Operator::ValuesCount,
            Self::GeoRadius(_) => Operator::GeoRadius,
        }
    }
}

impl Condition {
    /// Render a row through the operator dispatch table.
    pub fn from_row(row: &FilterRow) -> Self {
        let clause = match &row.value {
            FilterValue::Match(value) => Clause::Match {
                value: value.clone(),
            },
            FilterValue::Range(bounds) => Clause::Range(bounds.clone()),
            FilterValue::ValuesCount(bounds) => Clause::ValuesCount(bounds.clone()),
            FilterValue::GeoRadius(value) => Clause::GeoRadius(value.clone()),
        };
        Self {
            key: row.key.clone(),
            clause,
        }
    }
}

/// The compiled must / must_not / should filter.
///
/// Derived from the current rows on demand; never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledFilter {
    /// Conditions that must all hold.
    #[serde(default)]
    pub must: Vec<Condition>,

    /// Conditions that must not hold.
    #[serde(default)]
    pub must_not: Vec<Condition>,

    /// Conditions of which at least one should hold.
    #[serde(default)]
    pub should: Vec<Condition>,
}

impl CompiledFilter {
    /// Conditions of one category.
    pub fn conditions(&self, category: Category) -> &[Condition] {
        match category {
            Category::Must => &self.must,
            Category::MustNot => &self.must_not,
            Category::Should => &self.should,
        }
    }

    pub(crate) fn conditions_mut(&mut self, category: Category) -> &mut Vec<Condition> {
        match category {
            Category::Must => &mut self.must,
            Category::MustNot => &mut self.must_not,
            Category::Should => &mut self.should,
        }
    }

    /// Total number of conditions.
    pub fn len(&self) -> usize {
        self.must.len() + self.must_not.len() + self.should.len()
    }

    /// True when no category holds a condition.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The filter as JSON, or `None` when empty so requests can omit it.
    pub fn to_request_value(&self) -> Option<serde_json::Value> {
        if self.is_empty() {
            None
        } else {
            serde_json::to_value(self).ok()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RowId;
    use serde_json::json;

    fn row(key: &str, value: FilterValue) -> FilterRow {
        FilterRow {
            id: RowId(0),
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn test_match_condition_shape() {
        let c = Condition::from_row(&row("color", FilterValue::Match("red".into())));
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            json!({"key": "color", "match": {"value": "red"}})
        );
    }

    #[test]
    fn test_range_condition_shape() {
        let c = Condition::from_row(&row("price", FilterValue::Range(Bounds::between(10, 100))));
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            json!({"key": "price", "range": {"gte": 10, "lte": 100}})
        );
    }

    #[test]
    fn test_values_count_condition_shape() {
        let c = Condition::from_row(&row(
            "tags",
            FilterValue::ValuesCount(Bounds::between(1, 3)),
        ));
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            json!({"key": "tags", "values_count": {"gte": 1, "lte": 3}})
        );
    }

    #[test]
    fn test_geo_radius_passes_through() {
        let geo = json!({"center": {"lon": 13.4, "lat": 52.5}, "radius": 1000.0});
        let c = Condition::from_row(&row("location", FilterValue::GeoRadius(geo.clone())));
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            json!({"key": "location", "geo_radius": geo})
        );
        assert_eq!(c.clause.operator(), Operator::GeoRadius);
    }

    #[test]
    fn test_condition_deserializes() {
        let c: Condition =
            serde_json::from_value(json!({"key": "color", "match": {"value": "red"}})).unwrap();
        assert_eq!(c.key, "color");
        assert_eq!(
            c.clause,
            Clause::Match {
                value: Scalar::Text("red".into())
            }
        );
    }

    #[test]
    fn test_empty_filter_serializes_all_categories() {
        let filter = CompiledFilter::default();
        assert!(filter.is_empty());
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"must": [], "must_not": [], "should": []})
        );
        assert!(filter.to_request_value().is_none());
    }
}
