//! # fixture
//!
//! Declarative test fixtures: datasets of rows that reference each other,
//! loaded into storage in dependency order and torn down in reverse.
//!
//! ## Feature Flags
//!
//! - `loadable` (default) - Storage-medium contract, loader, and record export
//! - `yaml` - YAML data-literal documents, options, and record export
//! - `full` - All features enabled
//!
//! ## Quick Example
//!
//! ```rust
//! use fixture::prelude::*;
//!
//! # tokio_test::block_on(async {
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
//! let env = MediumMap::new()
//!     .with_medium(MemoryMedium::new("Category"))
//!     .with_medium(MemoryMedium::new("Product"));
//! let mut data = LoadableFixture::new(env).data(&[product])?;
//!
//! data.setup().await?;
//! assert_eq!(data.row("truck")?.attr("category")?, "cars");
//! data.teardown().await?;
//! # Ok::<(), LoadError>(())
//! # }).unwrap();
//! ```
//!
//! ## Crates
//!
//! - [`dataset`] - Definitions, references, built datasets, and aggregates
//! - [`loadable`] - Storage media, environments, and the loader

#![warn(missing_docs)]

pub mod dataset;
#[cfg(feature = "loadable")]
pub mod loadable;

pub use fixture_dataset::{
	Aggregate, AggregateKind, DataRow, DataSet, DataSetDef, DataSetError, DataSetRegistry,
	DataSetResult, MergedSuperSet, Ref, RefValue, SuperSet,
};

#[cfg(feature = "loadable")]
pub use fixture_loadable::{
	Env, FixtureData, LoadError, LoadOptions, LoadResult, LoadableFixture, MediumMap,
	MediumRegistry, MemoryMedium, NameStyle, StorageMedium, register_medium,
};

/// Prelude module for convenient imports.
pub mod prelude {
	pub use fixture_dataset::prelude::*;

	#[cfg(feature = "loadable")]
	pub use fixture_loadable::prelude::*;

	// External
	#[cfg(feature = "loadable")]
	pub use async_trait::async_trait;
}
