//! Convenience re-exports for common usage.
//!
//! ```
//! use fixture_dataset::prelude::*;
//!
//! let flowers = DataSetDef::builder("FlowerData")
//!     .row("violets", |r| r.set("color", "blue"))
//!     .build();
//! let superset = SuperSet::from_defs(&[flowers])?;
//! assert_eq!(superset.len(), 1);
//! # Ok::<(), DataSetError>(())
//! ```

// Error types
pub use crate::error::{DataSetError, DataSetResult};

// Declaration and build types
pub use crate::dataset::{BuildContext, DataSet};
pub use crate::definition::{DataSetDef, Meta, RowDecl};
pub use crate::reference::{Ref, RefValue};
pub use crate::row::DataRow;

// Aggregates and registries
pub use crate::registry::DataSetRegistry;
pub use crate::superset::{Aggregate, AggregateKind, MergedSuperSet, SuperSet};

// Data-literal documents
pub use crate::literal::{DataSetDocument, DocumentFormat, DocumentParser};
