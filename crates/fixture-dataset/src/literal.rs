//! Datasets declared as data instead of code.
//!
//! A document lists dataset specs in order. Column values are plain JSON, or a
//! symbolic reference to a dataset declared earlier in the same registry:
//!
//! ```json
//! {"datasets": [
//!   {"name": "CategoryData", "meta": {"storage": "Category"},
//!    "rows": {"cars": {"name": "cars"}}},
//!   {"name": "ProductData",
//!    "rows": {"truck": {"name": "truck",
//!                       "category": {"$ref": "CategoryData.cars.name"}}}}
//! ]}
//! ```
//!
//! `{"$ref": "Dataset.row.column"}` resolves to that column's value and makes
//! `Dataset` a dependency. `{"$ref": "Dataset.row"}` is a bare reference, kept
//! as metadata only.
//!
//! Parsing and resolution are separate passes: [`DocumentParser`] produces a
//! [`DataSetDocument`], and [`DataSetDocument::resolve`] turns each spec into a
//! [`DataSetDef`](crate::DataSetDef) in document order.

mod document;
mod parser;
mod resolve;

pub use document::{DataSetDocument, DataSetSpec, DocumentFormat, MetaSpec};
pub use parser::DocumentParser;
pub use resolve::{REF_KEY, SymbolicRef};
