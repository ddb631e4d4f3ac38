//! The filter clause builder.
//!
//! [`FilterBuilder`] owns the editable rows of the three boolean categories
//! together with the metadata keys discovered from the target collection.
//! Rows are addressed by category and display position, or by their stable
//! [`RowId`].

use quarry_core::{Error, Result};

use crate::condition::{CompiledFilter, Condition};
use crate::parse;
use crate::types::{Bounds, Category, FilterRow, FilterValue, Operator, RowId, Scalar};

/// Editable must / must_not / should filter rows.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    metadata_keys: Vec<String>,
    rows: [Vec<FilterRow>; 3],
    next_id: u64,
}

impl FilterBuilder {
    /// Create a builder for a collection with the given payload keys.
    pub fn new(metadata_keys: Vec<String>) -> Self {
        Self {
            metadata_keys,
            ..Default::default()
        }
    }

    /// The known payload keys.
    pub fn metadata_keys(&self) -> &[String] {
        &self.metadata_keys
    }

    /// Replace the known payload keys, e.g. after switching collection.
    ///
    /// Existing rows are kept; rows whose key is no longer known fail
    /// [`validate`](Self::validate).
    pub fn set_metadata_keys(&mut self, keys: Vec<String>) {
        self.metadata_keys = keys;
    }

    /// Rows of one category, in display order.
    pub fn rows(&self, category: Category) -> &[FilterRow] {
        &self.rows[category.index()]
    }

    /// Number of rows in one category.
    pub fn len(&self, category: Category) -> usize {
        self.rows(category).len()
    }

    /// True when no category holds a row.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Remove every row.
    pub fn clear(&mut self) {
        for rows in &mut self.rows {
            rows.clear();
        }
    }

    /// Look up a row anywhere by id.
    pub fn find(&self, id: RowId) -> Option<(Category, usize, &FilterRow)> {
        Category::ALL.into_iter().find_map(|category| {
            self.rows(category)
                .iter()
                .position(|r| r.id == id)
                .map(|i| (category, i, &self.rows(category)[i]))
        })
    }

    // ------------------------------------------------------------------------
    // Row lifecycle
    // ------------------------------------------------------------------------

    /// Append a row to `category`.
    ///
    /// The new row uses the first known key, the `match` operator and an
    /// empty value. Fails when no metadata keys are known.
    pub fn add_row(&mut self, category: Category) -> Result<RowId> {
        let key = self.metadata_keys.first().cloned().ok_or_else(|| {
            Error::validation("Cannot add a filter row: the collection has no known payload keys")
        })?;

        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows[category.index()].push(FilterRow {
            id,
            key,
            value: FilterValue::empty(Operator::Match),
        });
        log::debug!("added {category} filter row {id}");
        Ok(id)
    }

    /// Remove the row at `index`; out-of-range indices are ignored.
    pub fn remove_row(&mut self, category: Category, index: usize) -> Option<FilterRow> {
        let rows = &mut self.rows[category.index()];
        if index < rows.len() {
            let row = rows.remove(index);
            log::debug!("removed {category} filter row {}", row.id);
            Some(row)
        } else {
            None
        }
    }

    /// Remove a row by id, wherever it lives.
    pub fn remove_row_by_id(&mut self, id: RowId) -> Option<FilterRow> {
        let (category, index, _) = self.find(id)?;
        self.remove_row(category, index)
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    fn row_mut(&mut self, category: Category, index: usize) -> Result<&mut FilterRow> {
        let rows = &mut self.rows[category.index()];
        let len = rows.len();
        rows.get_mut(index).ok_or_else(|| {
            Error::validation(format!(
                "No {category} filter row at index {index} ({len} row(s))"
            ))
        })
    }

    /// Point a row at another payload key.
    pub fn set_key(&mut self, category: Category, index: usize, key: &str) -> Result<()> {
        if !self.metadata_keys.iter().any(|k| k == key) {
            return Err(Error::validation(format!(
                "Unknown payload key '{key}'. Known keys: {}",
                self.metadata_keys.join(", ")
            )));
        }
        self.row_mut(category, index)?.key = key.to_string();
        Ok(())
    }

    /// Change a row's operator.
    ///
    /// Switching to a different operator resets the value to that
    /// operator's empty shape; setting the same operator keeps the value.
    pub fn set_operator(&mut self, category: Category, index: usize, operator: Operator) -> Result<()> {
        let row = self.row_mut(category, index)?;
        if row.operator() != operator {
            row.value = FilterValue::empty(operator);
        }
        Ok(())
    }

    /// Set the scalar of a `match` row.
    pub fn set_match_value(
        &mut self,
        category: Category,
        index: usize,
        value: impl Into<Scalar>,
    ) -> Result<()> {
        let row = self.row_mut(category, index)?;
        match &mut row.value {
            FilterValue::Match(v) => {
                *v = value.into();
                Ok(())
            }
            other => Err(shape_mismatch(Operator::Match, other.operator())),
        }
    }

    /// Set the bounds of a `range` or `values_count` row.
    pub fn set_bounds(&mut self, category: Category, index: usize, bounds: Bounds) -> Result<()> {
        let row = self.row_mut(category, index)?;
        match &mut row.value {
            FilterValue::Range(b) | FilterValue::ValuesCount(b) => {
                *b = bounds;
                Ok(())
            }
            other => Err(shape_mismatch(Operator::Range, other.operator())),
        }
    }

    /// Set the opaque object of a `geo_radius` row.
    pub fn set_geo_value(
        &mut self,
        category: Category,
        index: usize,
        value: serde_json::Value,
    ) -> Result<()> {
        let row = self.row_mut(category, index)?;
        match &mut row.value {
            FilterValue::GeoRadius(v) => {
                *v = value;
                Ok(())
            }
            other => Err(shape_mismatch(Operator::GeoRadius, other.operator())),
        }
    }

    /// Parse user text for the row's current operator and store it.
    pub fn set_value_text(&mut self, category: Category, index: usize, text: &str) -> Result<()> {
        let operator = self.row_mut(category, index)?.operator();
        match operator {
            Operator::Match => self.set_match_value(category, index, parse::parse_scalar(text)),
            Operator::Range | Operator::ValuesCount => {
                self.set_bounds(category, index, parse::parse_bounds(text)?)
            }
            Operator::GeoRadius => self.set_geo_value(category, index, parse::parse_geo(text)?),
        }
    }

    // ------------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------------

    /// Render one row into its structured condition.
    pub fn render_row(&self, category: Category, index: usize) -> Option<Condition> {
        self.rows(category).get(index).map(Condition::from_row)
    }

    /// Compile every row of every category.
    pub fn compile(&self) -> CompiledFilter {
        let mut filter = CompiledFilter::default();
        for category in Category::ALL {
            let conditions = filter.conditions_mut(category);
            for index in 0..self.len(category) {
                if let Some(condition) = self.render_row(category, index) {
                    conditions.push(condition);
                }
            }
        }
        filter
    }

    /// Check every row against the known keys and bound rules.
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            for (index, row) in self.rows(category).iter().enumerate() {
                if !self.metadata_keys.iter().any(|k| *k == row.key) {
                    return Err(Error::validation(format!(
                        "{category} row {index}: unknown payload key '{}'",
                        row.key
                    )));
                }
                match &row.value {
                    FilterValue::Range(b) | FilterValue::ValuesCount(b) => {
                        if b.is_unbounded() {
                            return Err(Error::validation(format!(
                                "{category} row {index}: {} on '{}' needs at least one bound",
                                row.operator(),
                                row.key
                            )));
                        }
                        if b.is_inverted() {
                            return Err(Error::validation(format!(
                                "{category} row {index}: {} on '{}' has gte greater than lte ({b})",
                                row.operator(),
                                row.key
                            )));
                        }
                    }
                    FilterValue::GeoRadius(v) if !v.is_object() => {
                        return Err(Error::validation(format!(
                            "{category} row {index}: geo_radius on '{}' needs a JSON object",
                            row.key
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Validate, then compile.
    pub fn compile_checked(&self) -> Result<CompiledFilter> {
        self.validate()?;
        Ok(self.compile())
    }
}

fn shape_mismatch(expected: Operator, actual: Operator) -> Error {
    Error::validation(format!(
        "Row uses the {actual} operator; a {expected} value does not apply"
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> FilterBuilder {
        FilterBuilder::new(vec!["category".into(), "price".into()])
    }

    #[test]
    fn test_add_row_defaults() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        let row = &b.rows(Category::Must)[0];
        assert_eq!(row.key, "category");
        assert_eq!(row.operator(), Operator::Match);
        assert_eq!(row.value, FilterValue::Match(Scalar::Text(String::new())));
    }

    #[test]
    fn test_add_row_without_keys_is_rejected() {
        let mut b = FilterBuilder::new(Vec::new());
        let err = b.add_row(Category::Should).unwrap_err();
        assert!(err.is_validation());
        assert!(b.is_empty());
    }

    #[test]
    fn test_single_match_row_round_trip() {
        let mut b = FilterBuilder::new(vec!["color".into()]);
        b.add_row(Category::Must).unwrap();
        b.set_match_value(Category::Must, 0, "red").unwrap();

        let filter = b.compile();
        assert_eq!(filter.must.len(), 1);
        assert!(filter.must_not.is_empty());
        assert!(filter.should.is_empty());
        assert_eq!(
            serde_json::to_value(&filter.must[0]).unwrap(),
            json!({"key": "color", "match": {"value": "red"}})
        );
    }

    #[test]
    fn test_electronics_price_scenario() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        b.set_key(Category::Must, 0, "category").unwrap();
        b.set_value_text(Category::Must, 0, "electronics").unwrap();

        b.add_row(Category::Must).unwrap();
        b.set_key(Category::Must, 1, "price").unwrap();
        b.set_operator(Category::Must, 1, Operator::Range).unwrap();
        b.set_bounds(Category::Must, 1, Bounds::between(10, 100)).unwrap();

        let filter = b.compile_checked().unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "must": [
                    {"key": "category", "match": {"value": "electronics"}},
                    {"key": "price", "range": {"gte": 10, "lte": 100}}
                ],
                "must_not": [],
                "should": []
            })
        );
    }

    #[test]
    fn test_empty_builder_compiles_to_empty_filter() {
        let b = builder();
        assert_eq!(
            serde_json::to_value(b.compile()).unwrap(),
            json!({"must": [], "must_not": [], "should": []})
        );
        assert!(b.compile().to_request_value().is_none());
    }

    #[test]
    fn test_operator_change_resets_value() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        b.set_match_value(Category::Must, 0, "stale").unwrap();
        b.set_operator(Category::Must, 0, Operator::Range).unwrap();

        assert_eq!(b.rows(Category::Must)[0].value, FilterValue::Range(Bounds::default()));
        let rendered = serde_json::to_value(b.render_row(Category::Must, 0).unwrap()).unwrap();
        assert_eq!(rendered, json!({"key": "category", "range": {}}));
        assert!(!rendered.to_string().contains("stale"));
    }

    #[test]
    fn test_same_operator_keeps_value() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        b.set_operator(Category::Must, 0, Operator::ValuesCount).unwrap();
        b.set_bounds(Category::Must, 0, Bounds::between(1, 2)).unwrap();
        b.set_operator(Category::Must, 0, Operator::ValuesCount).unwrap();
        assert_eq!(
            b.rows(Category::Must)[0].value,
            FilterValue::ValuesCount(Bounds::between(1, 2))
        );
    }

    #[test]
    fn test_value_shape_mismatch() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        let err = b
            .set_bounds(Category::Must, 0, Bounds::between(1, 2))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(b.set_geo_value(Category::Must, 0, json!({})).is_err());
    }

    #[test]
    fn test_remove_row_out_of_bounds_is_noop() {
        let mut b = builder();
        b.add_row(Category::Should).unwrap();
        assert!(b.remove_row(Category::Should, 5).is_none());
        assert!(b.remove_row(Category::Must, 0).is_none());
        assert_eq!(b.len(Category::Should), 1);
    }

    #[test]
    fn test_removed_rows_never_compile() {
        let mut b = builder();
        for i in 0..4 {
            b.add_row(Category::MustNot).unwrap();
            b.set_match_value(Category::MustNot, i, format!("v{i}")).unwrap();
        }
        b.remove_row(Category::MustNot, 1);
        b.remove_row(Category::MustNot, 2);

        let filter = b.compile();
        let values: Vec<_> = filter
            .must_not
            .iter()
            .map(|c| serde_json::to_value(c).unwrap()["match"]["value"].clone())
            .collect();
        assert_eq!(values, vec![json!("v0"), json!("v2")]);
        assert_eq!(filter.must_not.len(), b.len(Category::MustNot));
    }

    #[test]
    fn test_add_remove_sequence_counts() {
        let mut b = builder();
        let ops: [(bool, Category); 9] = [
            (true, Category::Must),
            (true, Category::Should),
            (true, Category::Must),
            (false, Category::Must),
            (true, Category::MustNot),
            (false, Category::Should),
            (false, Category::Should),
            (true, Category::Should),
            (true, Category::Must),
        ];
        for (add, category) in ops {
            if add {
                b.add_row(category).unwrap();
            } else {
                b.remove_row(category, 0);
            }
        }
        let filter = b.compile();
        for category in Category::ALL {
            assert_eq!(filter.conditions(category).len(), b.len(category));
        }
        assert_eq!(filter.len(), 4);
    }

    #[test]
    fn test_row_ids_are_stable() {
        let mut b = builder();
        let first = b.add_row(Category::Must).unwrap();
        let second = b.add_row(Category::Must).unwrap();
        let third = b.add_row(Category::Should).unwrap();

        b.remove_row_by_id(first).unwrap();
        let (category, index, row) = b.find(second).unwrap();
        assert_eq!((category, index), (Category::Must, 0));
        assert_eq!(row.id, second);
        assert_eq!(b.find(third).unwrap().0, Category::Should);
        assert!(b.find(first).is_none());
        assert!(b.remove_row_by_id(first).is_none());
    }

    #[test]
    fn test_set_key_rejects_unknown() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        assert!(b.set_key(Category::Must, 0, "colour").unwrap_err().is_validation());
        assert!(b.set_key(Category::Must, 3, "price").is_err());
    }

    #[test]
    fn test_validate_unknown_key_after_collection_switch() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        b.set_metadata_keys(vec!["title".into()]);
        let err = b.compile_checked().unwrap_err();
        assert!(err.to_string().contains("unknown payload key 'category'"));
    }

    #[test]
    fn test_validate_inverted_range() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        b.set_operator(Category::Must, 0, Operator::Range).unwrap();
        b.set_value_text(Category::Must, 0, "100..10").unwrap();
        let err = b.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("gte greater than lte"));
    }

    #[test]
    fn test_validate_unbounded_range() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        b.set_operator(Category::Must, 0, Operator::ValuesCount).unwrap();
        assert!(b.validate().unwrap_err().to_string().contains("at least one bound"));
        b.set_value_text(Category::Must, 0, "2..").unwrap();
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_geo_radius_row() {
        let mut b = FilterBuilder::new(vec!["location".into()]);
        b.add_row(Category::Should).unwrap();
        b.set_operator(Category::Should, 0, Operator::GeoRadius).unwrap();
        assert!(b.validate().is_err());

        b.set_value_text(
            Category::Should,
            0,
            r#"{"center": {"lon": 13.4, "lat": 52.5}, "radius": 500}"#,
        )
        .unwrap();
        let filter = b.compile_checked().unwrap();
        assert_eq!(
            serde_json::to_value(&filter.should[0]).unwrap(),
            json!({"key": "location", "geo_radius": {"center": {"lon": 13.4, "lat": 52.5}, "radius": 500}})
        );
    }

    #[test]
    fn test_render_row_missing() {
        let b = builder();
        assert!(b.render_row(Category::Must, 0).is_none());
    }

    #[test]
    fn test_clear() {
        let mut b = builder();
        b.add_row(Category::Must).unwrap();
        b.add_row(Category::Should).unwrap();
        b.clear();
        assert!(b.is_empty());
        assert!(b.compile().is_empty());
    }
}
