//! Boolean filter clause builder for Qdrant searches.
//!
//! Lets a user assemble must / must_not / should conditions row by row
//! without writing the filter language by hand, then compiles them into the
//! structured filter Qdrant expects.
//!
//! # Operator dispatch
//!
//! | operator | structured form |
//! |---|---|
//! | `match` | `{key, match: {value}}` |
//! | `range` | `{key, range: {gte, lte}}` |
//! | `values_count` | `{key, values_count: {gte, lte}}` |
//! | `geo_radius` | `{key, geo_radius: value}` |
//!
//! # Example
//!
//! ```
//! use quarry_filter::{Bounds, Category, FilterBuilder, Operator};
//!
//! let mut filters = FilterBuilder::new(vec!["category".into(), "price".into()]);
//! filters.add_row(Category::Must)?;
//! filters.set_match_value(Category::Must, 0, "electronics")?;
//!
//! filters.add_row(Category::Must)?;
//! filters.set_key(Category::Must, 1, "price")?;
//! filters.set_operator(Category::Must, 1, Operator::Range)?;
//! filters.set_bounds(Category::Must, 1, Bounds::between(10, 100))?;
//!
//! let compiled = filters.compile_checked()?;
//! assert_eq!(compiled.must.len(), 2);
//! # Ok::<(), quarry_core::Error>(())
//! ```

pub mod builder;
pub mod condition;
pub mod parse;
pub mod types;

pub use builder::FilterBuilder;
pub use condition::{Clause, CompiledFilter, Condition};
pub use types::{Bounds, Category, FilterRow, FilterValue, Operator, RowId, Scalar};
