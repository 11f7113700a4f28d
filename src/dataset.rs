//! Dataset declaration, building, and aggregation.
//!
//! # Examples
//!
//! ```rust
//! use fixture::dataset::{DataSet, DataSetDef};
//!
//! let flowers = DataSetDef::builder("FlowerData")
//!     .row("violets", |r| r.set("color", "blue"))
//!     .build();
//! let dataset = DataSet::new(&flowers).unwrap();
//! assert_eq!(dataset.keys(), &["violets"]);
//! ```

pub use fixture_dataset::*;
