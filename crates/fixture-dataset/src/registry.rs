//! Registries: identity tracking of dataset instances and named definitions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::dataset::{DataSet, DataSetId};
use crate::definition::DataSetDef;
use crate::error::{DataSetError, DataSetResult};

/// Set of dataset instances keyed by identity, never by value.
///
/// Two datasets built from the same definition with the same rows are still
/// distinct entries.
#[derive(Debug, Clone, Default)]
pub struct ObjRegistry {
	ids: HashSet<DataSetId>,
}

impl ObjRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a dataset. Returns false if that instance was already registered.
	pub fn register(&mut self, dataset: &DataSet) -> bool {
		self.ids.insert(dataset.id())
	}

	/// Returns true if that instance is registered.
	pub fn contains(&self, dataset: &DataSet) -> bool {
		self.ids.contains(&dataset.id())
	}

	/// Number of registered instances.
	pub fn len(&self) -> usize {
		self.ids.len()
	}

	/// Returns true if nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}
}

/// Named dataset definitions, used to resolve symbolic references.
///
/// # Example
///
/// ```
/// use fixture_dataset::{DataSetDef, DataSetRegistry};
///
/// let mut registry = DataSetRegistry::new();
/// registry.register(DataSetDef::builder("CategoryData").row("cars", |r| r.set("name", "cars")).build())?;
///
/// let category = registry.get("CategoryData")?;
/// assert_eq!(category.row_ref("cars")?.value("name")?.value(), "cars");
/// # Ok::<(), fixture_dataset::DataSetError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataSetRegistry {
	defs: HashMap<String, Arc<DataSetDef>>,
	order: Vec<String>,
}

impl DataSetRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a definition under its name.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::Redeclaration`] if the name is taken.
	pub fn register(&mut self, def: Arc<DataSetDef>) -> DataSetResult<Arc<DataSetDef>> {
		let name = def.name().to_string();
		if self.defs.contains_key(&name) {
			return Err(DataSetError::Redeclaration {
				dataset: "DataSetRegistry".to_string(),
				key: name,
			});
		}
		tracing::debug!(dataset = %name, "registered dataset definition");
		self.order.push(name.clone());
		self.defs.insert(name, Arc::clone(&def));
		Ok(def)
	}

	/// Looks up a definition by name.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::UnknownDataSet`] if nothing is registered under `name`.
	pub fn get(&self, name: &str) -> DataSetResult<&Arc<DataSetDef>> {
		self.defs
			.get(name)
			.ok_or_else(|| DataSetError::UnknownDataSet(name.to_string()))
	}

	/// Returns true if a definition is registered under `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.defs.contains_key(name)
	}

	/// Registered names in registration order.
	pub fn names(&self) -> &[String] {
		&self.order
	}

	/// Registered definitions in registration order.
	pub fn defs(&self) -> impl Iterator<Item = &Arc<DataSetDef>> {
		self.order.iter().filter_map(|name| self.defs.get(name))
	}

	/// Number of registered definitions.
	pub fn len(&self) -> usize {
		self.order.len()
	}

	/// Returns true if nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn flowers() -> Arc<DataSetDef> {
		DataSetDef::builder("FlowerData")
			.row("violets", |r| r.set("color", "blue"))
			.build()
	}

	#[rstest]
	fn test_obj_registry_uses_identity() {
		let def = flowers();
		let first = DataSet::new(&def).unwrap();
		let second = DataSet::new(&def).unwrap();

		let mut registry = ObjRegistry::new();
		assert!(registry.register(&first));
		assert!(!registry.register(&first));
		assert!(registry.register(&second));
		assert_eq!(registry.len(), 2);
	}

	#[rstest]
	fn test_register_and_get() {
		let mut registry = DataSetRegistry::new();
		registry.register(flowers()).unwrap();

		assert!(registry.contains("FlowerData"));
		assert_eq!(registry.get("FlowerData").unwrap().name(), "FlowerData");
		assert_eq!(registry.names(), &["FlowerData".to_string()]);
	}

	#[rstest]
	fn test_register_duplicate_name() {
		let mut registry = DataSetRegistry::new();
		registry.register(flowers()).unwrap();
		let result = registry.register(flowers());
		assert!(matches!(result, Err(DataSetError::Redeclaration { .. })));
	}

	#[rstest]
	fn test_get_unknown() {
		let registry = DataSetRegistry::new();
		assert!(matches!(
			registry.get("Nope"),
			Err(DataSetError::UnknownDataSet(_))
		));
	}
}
