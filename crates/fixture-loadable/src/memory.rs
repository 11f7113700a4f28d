//! In-memory storage medium.
//!
//! [`MemoryMedium`] keeps saved rows in a map and appends every save, clear,
//! and loader visit to a [`Journal`]. Several media can share one journal, which
//! makes the global order of operations across storage targets observable.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use fixture_dataset::DataRow;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::{LoadError, LoadResult};
use crate::loader::LoadableFixture;
use crate::medium::StorageMedium;

/// One recorded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum MediumEvent {
	/// The loader visited the medium before saving a dataset.
	Visited {
		/// Storage name.
		storage: String,
	},
	/// A row was saved.
	Saved {
		/// Storage name.
		storage: String,
		/// Row key.
		key: String,
		/// Saved columns as a JSON object.
		columns: Value,
	},
	/// A saved row was cleared.
	Cleared {
		/// Storage name.
		storage: String,
		/// Row key.
		key: String,
	},
}

impl MediumEvent {
	/// Short `op:storage.key` form, handy in assertions.
	pub fn label(&self) -> String {
		match self {
			Self::Visited { storage } => format!("visit:{}", storage),
			Self::Saved { storage, key, .. } => format!("save:{}.{}", storage, key),
			Self::Cleared { storage, key } => format!("clear:{}.{}", storage, key),
		}
	}
}

/// Shared, append-only log of medium events.
#[derive(Debug, Clone, Default)]
pub struct Journal {
	events: Arc<Mutex<Vec<MediumEvent>>>,
}

impl Journal {
	/// Creates an empty journal.
	pub fn new() -> Self {
		Self::default()
	}

	fn record(&self, event: MediumEvent) {
		self.events.lock().push(event);
	}

	/// Snapshot of all events so far.
	pub fn events(&self) -> Vec<MediumEvent> {
		self.events.lock().clone()
	}

	/// Labels of all events so far.
	pub fn labels(&self) -> Vec<String> {
		self.events.lock().iter().map(MediumEvent::label).collect()
	}

	/// Removes all events.
	pub fn clear(&self) {
		self.events.lock().clear();
	}

	/// Number of recorded events.
	pub fn len(&self) -> usize {
		self.events.lock().len()
	}

	/// Returns true if nothing was recorded.
	pub fn is_empty(&self) -> bool {
		self.events.lock().is_empty()
	}
}

/// A storage medium that keeps rows in memory.
///
/// Clones share the same rows and journal.
#[derive(Debug, Clone)]
pub struct MemoryMedium {
	name: String,
	journal: Journal,
	rows: Arc<Mutex<BTreeMap<u64, (String, Value)>>>,
	next_id: Arc<AtomicU64>,
	fail_on: Arc<Mutex<Option<String>>>,
}

impl MemoryMedium {
	/// Creates a medium with its own journal.
	pub fn new(name: impl Into<String>) -> Self {
		Self::with_journal(name, Journal::new())
	}

	/// Creates a medium writing to a shared journal.
	pub fn with_journal(name: impl Into<String>, journal: Journal) -> Self {
		Self {
			name: name.into(),
			journal,
			rows: Arc::new(Mutex::new(BTreeMap::new())),
			next_id: Arc::new(AtomicU64::new(1)),
			fail_on: Arc::new(Mutex::new(None)),
		}
	}

	/// Makes saving the row with `row_key` fail.
	pub fn failing_on(self, row_key: impl Into<String>) -> Self {
		*self.fail_on.lock() = Some(row_key.into());
		self
	}

	/// Lets every save succeed again, for this medium and its clones.
	pub fn stop_failing(&self) {
		self.fail_on.lock().take();
	}

	/// Journal this medium writes to.
	pub fn journal(&self) -> &Journal {
		&self.journal
	}

	/// Currently stored rows as `(key, columns)`, in save order.
	pub fn rows(&self) -> Vec<(String, Value)> {
		self.rows.lock().values().cloned().collect()
	}

	/// Number of currently stored rows.
	pub fn len(&self) -> usize {
		self.rows.lock().len()
	}

	/// Returns true if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.rows.lock().is_empty()
	}
}

#[async_trait]
impl StorageMedium for MemoryMedium {
	fn name(&self) -> &str {
		&self.name
	}

	async fn save(&self, row_key: &str, row: &DataRow) -> LoadResult<Value> {
		if self.fail_on.lock().as_deref() == Some(row_key) {
			return Err(LoadError::storage(&self.name, format!("refused to save '{}'", row_key)));
		}
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let columns = row.to_json();
		self.rows
			.lock()
			.insert(id, (row_key.to_string(), columns.clone()));
		self.journal.record(MediumEvent::Saved {
			storage: self.name.clone(),
			key: row_key.to_string(),
			columns,
		});
		Ok(json!({"id": id, "key": row_key}))
	}

	async fn clear(&self, handle: &Value) -> LoadResult<()> {
		let id = handle
			.get("id")
			.and_then(Value::as_u64)
			.ok_or_else(|| LoadError::storage(&self.name, format!("invalid handle {}", handle)))?;
		let (key, _) = self
			.rows
			.lock()
			.remove(&id)
			.ok_or_else(|| LoadError::storage(&self.name, format!("nothing stored under id {}", id)))?;
		self.journal.record(MediumEvent::Cleared {
			storage: self.name.clone(),
			key,
		});
		Ok(())
	}

	fn visit_loader(&self, _loader: &LoadableFixture) {
		self.journal.record(MediumEvent::Visited {
			storage: self.name.clone(),
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_save_and_clear() {
		let medium = MemoryMedium::new("Category");
		let row = DataRow::new([("name", json!("cars"))]);

		let handle = medium.save("cars", &row).await.unwrap();
		assert_eq!(medium.rows(), vec![("cars".to_string(), json!({"name": "cars"}))]);

		medium.clear(&handle).await.unwrap();
		assert!(medium.is_empty());
		assert_eq!(medium.journal().labels(), vec!["save:Category.cars", "clear:Category.cars"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_clear_twice_is_an_error() {
		let medium = MemoryMedium::new("Category");
		let handle = medium
			.save("cars", &DataRow::new([("name", json!("cars"))]))
			.await
			.unwrap();
		medium.clear(&handle).await.unwrap();
		let result = medium.clear(&handle).await;
		assert!(matches!(result, Err(LoadError::Storage { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_failing_row() {
		let medium = MemoryMedium::new("Category").failing_on("cars");
		let result = medium.save("cars", &DataRow::new([("name", json!("cars"))])).await;
		assert!(matches!(result, Err(LoadError::Storage { .. })));
		assert!(medium.journal().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_stop_failing_applies_to_clones() {
		let medium = MemoryMedium::new("Category").failing_on("cars");
		let shared = medium.clone();
		medium.stop_failing();

		let row = DataRow::new([("name", json!("cars"))]);
		assert!(shared.save("cars", &row).await.is_ok());
		assert_eq!(medium.len(), 1);
	}

	#[rstest]
	fn test_shared_journal() {
		let journal = Journal::new();
		let first = MemoryMedium::with_journal("A", journal.clone());
		let second = MemoryMedium::with_journal("B", journal.clone());
		tokio_test::block_on(async {
			first.save("x", &DataRow::new([("v", json!(1))])).await.unwrap();
			second.save("y", &DataRow::new([("v", json!(2))])).await.unwrap();
		});
		assert_eq!(journal.labels(), vec!["save:A.x", "save:B.y"]);
	}
}
