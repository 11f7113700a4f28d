//! Loading declarative datasets into storage and tearing them down again.
//!
//! A [`StorageMedium`] persists the rows of one storage target. An [`Env`]
//! finds the medium for a dataset by name, and a [`LoadableFixture`] walks an
//! aggregate so that every dataset is saved after the datasets it references
//! and cleared before them.
//!
//! # Features
//!
//! - `json` - JSON record export and options (enabled by default)
//! - `yaml` - YAML record export and options
//! - `full` - All features enabled
//!
//! # Quick Start
//!
//! ```
//! use fixture_dataset::DataSetDef;
//! use fixture_loadable::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let category = DataSetDef::builder("CategoryData")
//!     .row("cars", |r| r.set("name", "cars"))
//!     .build();
//! let cars = category.row_ref("cars")?.value("name")?;
//! let product = DataSetDef::builder("ProductData")
//!     .row("truck", |r| r.set("name", "truck").set("category", cars))
//!     .build();
//!
//! let journal = Journal::new();
//! let env = MediumMap::new()
//!     .with_medium(MemoryMedium::with_journal("Category", journal.clone()))
//!     .with_medium(MemoryMedium::with_journal("Product", journal.clone()));
//! let loader = LoadableFixture::new(env)
//!     .with_options(LoadOptions::new().with_style(NameStyle::named_data()));
//!
//! let mut data = loader.data(&[product])?;
//! data.setup().await?;
//! assert_eq!(data.row("truck")?.attr("category")?, "cars");
//! data.teardown().await?;
//!
//! assert_eq!(journal.labels().first().map(String::as_str), Some("visit:Category"));
//! assert_eq!(journal.labels().last().map(String::as_str), Some("clear:Category.cars"));
//! # Ok::<(), LoadError>(())
//! # }).unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`StorageMedium`] - Save and clear rows of one storage target
//! - [`Env`] / [`MediumRegistry`] / [`MediumMap`] - Medium lookup by name
//! - [`NameStyle`] - Dataset name to storage name translation
//! - [`LoadableFixture`] / [`FixtureData`] - Dependency-ordered load and unload
//! - [`MemoryMedium`] - In-memory medium recording a [`Journal`]
//! - [`records`] - Export as `{"model", "pk", "fields"}` records

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod env;
pub mod error;
pub mod loader;
pub mod medium;
pub mod memory;
pub mod prelude;
pub mod records;
pub mod style;

// Re-export commonly used types at crate root
pub use env::{AppModelEnv, Env, MediumMap, MediumRegistry, register_medium, register_medium_as};
pub use error::{LoadError, LoadResult};
pub use loader::{FixtureData, LoadOptions, LoadableFixture, load_order};
pub use medium::{StorageMedium, StoredObject};
pub use memory::{Journal, MediumEvent, MemoryMedium};
pub use records::{FixtureRecord, RecordSerializer, to_records};
pub use style::NameStyle;
