//! The storage medium contract.
//!
//! A storage medium knows how to persist one row of one storage target and
//! how to remove it again. The loader never interprets what a medium returns
//! from [`save`](StorageMedium::save); it hands the same handle back to
//! [`clear`](StorageMedium::clear) when unloading.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use fixture_dataset::DataRow;
use serde_json::Value;

use crate::error::LoadResult;
use crate::loader::LoadableFixture;

/// Backend that stores and removes rows.
///
/// # Example
///
/// ```ignore
/// struct ProductTable { pool: PgPool }
///
/// #[async_trait]
/// impl StorageMedium for ProductTable {
///     fn name(&self) -> &str { "Product" }
///
///     async fn save(&self, row_key: &str, row: &DataRow) -> LoadResult<Value> {
///         let id = insert_product(&self.pool, row).await?;
///         Ok(json!(id))
///     }
///
///     async fn clear(&self, handle: &Value) -> LoadResult<()> {
///         delete_product(&self.pool, handle).await
///     }
/// }
/// ```
#[async_trait]
pub trait StorageMedium: Send + Sync {
	/// Name of the storage target this medium writes to.
	fn name(&self) -> &str;

	/// Persists one row and returns a handle identifying what was stored.
	async fn save(&self, row_key: &str, row: &DataRow) -> LoadResult<Value>;

	/// Removes what an earlier [`save`](Self::save) stored.
	async fn clear(&self, handle: &Value) -> LoadResult<()>;

	/// Called once per dataset before its rows are saved.
	fn visit_loader(&self, _loader: &LoadableFixture) {}
}

/// One saved row, remembered so it can be cleared on unload.
#[derive(Clone)]
pub struct StoredObject {
	dataset: String,
	row_key: String,
	handle: Value,
	medium: Arc<dyn StorageMedium>,
}

impl StoredObject {
	pub(crate) fn new(
		dataset: impl Into<String>,
		row_key: impl Into<String>,
		handle: Value,
		medium: Arc<dyn StorageMedium>,
	) -> Self {
		Self {
			dataset: dataset.into(),
			row_key: row_key.into(),
			handle,
			medium,
		}
	}

	/// Name of the dataset the row came from.
	pub fn dataset(&self) -> &str {
		&self.dataset
	}

	/// Row key within the dataset.
	pub fn row_key(&self) -> &str {
		&self.row_key
	}

	/// Handle returned by the medium.
	pub fn handle(&self) -> &Value {
		&self.handle
	}

	/// Storage target the row was saved to.
	pub fn storage(&self) -> &str {
		self.medium.name()
	}

	pub(crate) async fn clear(&self) -> LoadResult<()> {
		self.medium.clear(&self.handle).await
	}
}

impl fmt::Debug for StoredObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StoredObject")
			.field("dataset", &self.dataset)
			.field("row_key", &self.row_key)
			.field("handle", &self.handle)
			.field("storage", &self.medium.name())
			.finish()
	}
}
