//! Declarative datasets for test fixtures.
//!
//! A dataset is a named, ordered set of rows. Rows are declared on a
//! [`DataSetDef`] and may reference column values of rows in other
//! definitions; building a [`DataSet`] substitutes those references with their
//! values and records the referenced definitions as dependencies, so a loader
//! can insert them first.
//!
//! # Features
//!
//! - `json` - JSON data-literal documents (enabled by default)
//! - `yaml` - YAML data-literal documents
//! - `full` - All features enabled
//!
//! # Quick Start
//!
//! ```
//! use fixture_dataset::prelude::*;
//! use serde_json::json;
//!
//! let category = DataSetDef::builder("CategoryData")
//!     .storage("Category")
//!     .row("cars", |r| r.set("name", "cars"))
//!     .row("free_stuff", |r| r.set("name", "get free stuff"))
//!     .build();
//! let cars = category.row_ref("cars")?.value("name")?;
//! let product = DataSetDef::builder("ProductData")
//!     .storage("Product")
//!     .row("truck", |r| r.set("name", "truck").set("category", cars))
//!     .build();
//!
//! let dataset = DataSet::new(&product)?;
//! assert_eq!(dataset.attr("truck")?.attr("category")?, &json!("cars"));
//! assert_eq!(dataset.refs().dataset("CategoryData").map(|d| d.len()), Some(2));
//! # Ok::<(), DataSetError>(())
//! ```
//!
//! # Architecture
//!
//! - [`DataSetDef`] - Declared rows plus [`Meta`] configuration
//! - [`Ref`] / [`RefValue`] - References into another definition's rows
//! - [`DataSet`] - Built rows and the reference aggregate
//! - [`SuperSet`] / [`MergedSuperSet`] - Deduplicated collections of datasets
//! - [`DataSetRegistry`] - Definitions by name
//! - [`literal`] - Datasets declared in JSON or YAML documents

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod container;
pub mod dataset;
pub mod definition;
pub mod error;
pub mod literal;
pub mod prelude;
pub mod reference;
pub mod registry;
pub mod row;
pub mod superset;

// Re-export commonly used types at crate root
pub use container::{CONTAINER_RESERVED, DataContainer};
pub use dataset::{BuildContext, BuildState, DATASET_RESERVED, DataSet, DataSetId};
pub use definition::{DataProvider, DataSetDef, DataSetDefBuilder, DefId, META_SCOPE, Meta, RowDecl, RowFactory};
pub use error::{DataSetError, DataSetResult};
pub use reference::{ColumnValue, Ref, RefValue};
pub use registry::{DataSetRegistry, ObjRegistry};
pub use row::{DataRow, ROW_RESERVED, RowData};
pub use superset::{Aggregate, AggregateKind, DataSetContainer, MergedSuperSet, SuperSet};
