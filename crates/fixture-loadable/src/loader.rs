//! Loading datasets into storage media and unloading them again.
//!
//! Datasets are loaded after everything they reference, and each dataset
//! instance is loaded at most once per [`LoadableFixture`] even when several
//! datasets share it. Unloading clears every stored row in exact reverse order
//! of insertion.

use std::collections::HashMap;
use std::sync::Arc;

use fixture_dataset::{Aggregate, AggregateKind, DataRow, DataSet, DataSetDef, DataSetId, ObjRegistry};
use serde::{Deserialize, Serialize};

use crate::env::Env;
use crate::error::{LoadError, LoadResult};
use crate::medium::{StorageMedium, StoredObject};
use crate::style::NameStyle;

/// Loader configuration.
///
/// Every field has a default, so a partial JSON or YAML object is enough:
///
/// ```
/// use fixture_loadable::{LoadOptions, NameStyle};
/// use fixture_dataset::AggregateKind;
///
/// let options = LoadOptions::from_json(r#"{"style": {"style": "trimmed", "suffix": "Data"}}"#)?;
/// assert_eq!(options.dataclass, AggregateKind::Merged);
/// assert_eq!(options.style, NameStyle::named_data());
/// assert!(options.unload_on_error);
/// # Ok::<(), fixture_loadable::LoadError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
	/// Aggregate built by [`LoadableFixture::data`].
	pub dataclass: AggregateKind,

	/// Storage naming for datasets without `Meta.storage`.
	pub style: NameStyle,

	/// Clear whatever was stored when a load fails part way.
	pub unload_on_error: bool,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self {
			dataclass: AggregateKind::Merged,
			style: NameStyle::Original,
			unload_on_error: true,
		}
	}
}

impl LoadOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the aggregate kind.
	pub fn with_dataclass(mut self, dataclass: AggregateKind) -> Self {
		self.dataclass = dataclass;
		self
	}

	/// Sets the naming style.
	pub fn with_style(mut self, style: NameStyle) -> Self {
		self.style = style;
		self
	}

	/// Sets whether a failed load unloads what it stored.
	pub fn with_unload_on_error(mut self, unload: bool) -> Self {
		self.unload_on_error = unload;
		self
	}

	/// Parses options from JSON.
	pub fn from_json(content: &str) -> LoadResult<Self> {
		Ok(serde_json::from_str(content)?)
	}

	/// Parses options from YAML.
	#[cfg(feature = "yaml")]
	pub fn from_yaml(content: &str) -> LoadResult<Self> {
		serde_yaml::from_str(content).map_err(|e| LoadError::Serialization(e.to_string()))
	}
}

/// Datasets of `aggregate` in load order: every dataset after the datasets it
/// references, each instance once.
pub fn load_order(aggregate: &Aggregate) -> Vec<Arc<DataSet>> {
	let mut seen = ObjRegistry::new();
	let mut order = Vec::new();
	for dataset in aggregate.iter() {
		visit(dataset, &mut seen, &mut order);
	}
	order
}

fn visit(dataset: &Arc<DataSet>, seen: &mut ObjRegistry, order: &mut Vec<Arc<DataSet>>) {
	if !seen.register(dataset) {
		return;
	}
	for referenced in dataset.refs().iter() {
		visit(referenced, seen, order);
	}
	order.push(Arc::clone(dataset));
}

/// What a loader has stored so far.
#[derive(Debug, Default)]
struct LoadState {
	/// Datasets whose rows are all stored.
	loaded: ObjRegistry,
	/// Rows already stored for datasets whose load failed partway.
	partial: HashMap<DataSetId, usize>,
	stored: Vec<StoredObject>,
}

/// Loads datasets through media found in an [`Env`].
///
/// ```
/// use fixture_dataset::{Aggregate, AggregateKind, DataSetDef};
/// use fixture_loadable::{LoadableFixture, MediumMap, MemoryMedium};
///
/// # tokio_test::block_on(async {
/// let flowers = DataSetDef::builder("FlowerData")
///     .storage("Flower")
///     .row("violets", |r| r.set("color", "blue"))
///     .build();
/// let medium = MemoryMedium::new("Flower");
/// let mut loader = LoadableFixture::new(MediumMap::new().with_medium(medium.clone()));
///
/// let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[flowers])?;
/// loader.load(&aggregate).await?;
/// assert_eq!(medium.len(), 1);
///
/// loader.unload().await?;
/// assert!(medium.is_empty());
/// # Ok::<(), fixture_loadable::LoadError>(())
/// # }).unwrap();
/// ```
pub struct LoadableFixture {
	env: Arc<dyn Env>,
	options: LoadOptions,
	state: LoadState,
}

impl LoadableFixture {
	/// Creates a loader with default options.
	pub fn new<E: Env + 'static>(env: E) -> Self {
		Self::with_env(Arc::new(env))
	}

	/// Creates a loader from a shared environment.
	pub fn with_env(env: Arc<dyn Env>) -> Self {
		Self {
			env,
			options: LoadOptions::default(),
			state: LoadState::default(),
		}
	}

	/// Sets the options.
	pub fn with_options(mut self, options: LoadOptions) -> Self {
		self.options = options;
		self
	}

	/// Configured options.
	pub fn options(&self) -> &LoadOptions {
		&self.options
	}

	/// Environment used to look up media.
	pub fn env(&self) -> &Arc<dyn Env> {
		&self.env
	}

	/// Storage name for `dataset`: `Meta.storage` or the styled dataset name.
	pub fn storage_name(&self, dataset: &DataSet) -> String {
		match dataset.storage() {
			Some(storage) => storage.to_string(),
			None => self.options.style.storable_name(dataset.name()),
		}
	}

	/// Medium for `dataset`, looked up by `Meta.storage_medium` or storage name.
	pub fn medium_for(&self, dataset: &DataSet) -> LoadResult<Arc<dyn StorageMedium>> {
		let name = match dataset.storage_medium() {
			Some(medium) => medium.to_string(),
			None => self.storage_name(dataset),
		};
		self.env.get(&name)
	}

	/// Returns true if that dataset instance has been loaded.
	pub fn is_loaded(&self, dataset: &DataSet) -> bool {
		self.state.loaded.contains(dataset)
	}

	/// Stored rows in insertion order.
	pub fn stored(&self) -> &[StoredObject] {
		&self.state.stored
	}

	/// Loads every dataset of `aggregate`, references first.
	///
	/// Dataset instances this loader already holds are skipped. A dataset whose
	/// load failed partway is not held; the next load resumes it from the
	/// first row that was not stored.
	///
	/// # Errors
	///
	/// Returns [`LoadError::Lookup`] if a medium cannot be found and any error
	/// a medium raises. With `unload_on_error` set, everything stored so far is
	/// cleared before the error is returned.
	pub async fn load(&mut self, aggregate: &Aggregate) -> LoadResult<()> {
		for dataset in load_order(aggregate) {
			if self.state.loaded.contains(&dataset) {
				tracing::trace!(dataset = %dataset.name(), "already loaded");
				continue;
			}
			if let Err(error) = self.load_dataset(&dataset).await {
				if self.options.unload_on_error {
					tracing::warn!(
						dataset = %dataset.name(),
						error = %error,
						"load failed, unloading stored rows"
					);
					if let Err(unload_error) = self.unload().await {
						tracing::error!(error = %unload_error, "unload after failed load also failed");
					}
				}
				return Err(error);
			}
		}
		Ok(())
	}

	async fn load_dataset(&mut self, dataset: &Arc<DataSet>) -> LoadResult<()> {
		let medium = self.medium_for(dataset)?;
		medium.visit_loader(self);

		let done = self.state.partial.remove(&dataset.id()).unwrap_or(0);
		if done > 0 {
			tracing::debug!(dataset = %dataset.name(), rows = done, "resuming partial load");
		}
		let rows: Vec<(String, Arc<DataRow>)> = dataset
			.iter()
			.skip(done)
			.map(|(key, row)| (key.to_string(), Arc::clone(row)))
			.collect();
		for (saved, (key, row)) in rows.into_iter().enumerate() {
			let handle = match medium.save(&key, &row).await {
				Ok(handle) => handle,
				Err(error) => {
					if done + saved > 0 {
						self.state.partial.insert(dataset.id(), done + saved);
					}
					return Err(error);
				}
			};
			self.state.stored.push(StoredObject::new(
				dataset.name(),
				key,
				handle,
				Arc::clone(&medium),
			));
		}
		self.state.loaded.register(dataset);
		tracing::debug!(
			dataset = %dataset.name(),
			storage = %medium.name(),
			rows = dataset.len(),
			"loaded dataset"
		);
		Ok(())
	}

	/// Clears every stored row, most recent first.
	///
	/// # Errors
	///
	/// Returns the first error a medium raises. Rows not yet cleared stay
	/// recorded, so a later call resumes where this one stopped.
	pub async fn unload(&mut self) -> LoadResult<()> {
		let total = self.state.stored.len();
		while let Some(object) = self.state.stored.last().cloned() {
			object.clear().await?;
			self.state.stored.pop();
		}
		self.state.loaded = ObjRegistry::new();
		self.state.partial.clear();
		tracing::debug!(rows = total, "unloaded");
		Ok(())
	}

	/// Builds `defs` into the configured aggregate and returns a handle that
	/// loads it on [`setup`](FixtureData::setup).
	pub fn data(&self, defs: &[Arc<DataSetDef>]) -> LoadResult<FixtureData> {
		let aggregate = Aggregate::from_defs(self.options.dataclass, defs)?;
		Ok(FixtureData {
			aggregate,
			loader: self.fresh(),
			loaded: false,
		})
	}

	fn fresh(&self) -> Self {
		Self {
			env: Arc::clone(&self.env),
			options: self.options.clone(),
			state: LoadState::default(),
		}
	}
}

impl std::fmt::Debug for LoadableFixture {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LoadableFixture")
			.field("options", &self.options)
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}

/// Datasets ready to be loaded, plus the loader that will load them.
#[derive(Debug)]
pub struct FixtureData {
	aggregate: Aggregate,
	loader: LoadableFixture,
	loaded: bool,
}

impl FixtureData {
	/// Loads the datasets.
	pub async fn setup(&mut self) -> LoadResult<()> {
		self.loader.load(&self.aggregate).await?;
		self.loaded = true;
		Ok(())
	}

	/// Unloads the datasets.
	///
	/// # Errors
	///
	/// Returns [`LoadError::NotLoaded`] if [`setup`](Self::setup) did not succeed.
	pub async fn teardown(&mut self) -> LoadResult<()> {
		if !self.loaded {
			return Err(LoadError::NotLoaded(
				"teardown called before a successful setup".to_string(),
			));
		}
		self.loader.unload().await?;
		self.loaded = false;
		Ok(())
	}

	/// Returns true between a successful setup and teardown.
	pub fn is_loaded(&self) -> bool {
		self.loaded
	}

	/// The aggregate being loaded.
	pub fn aggregate(&self) -> &Aggregate {
		&self.aggregate
	}

	/// Looks up a dataset by name.
	pub fn dataset(&self, name: &str) -> Option<&Arc<DataSet>> {
		self.aggregate.dataset(name)
	}

	/// Looks up a row by key.
	pub fn row(&self, key: &str) -> LoadResult<&DataRow> {
		Ok(self.aggregate.row(key)?)
	}

	/// Stored rows in insertion order.
	pub fn stored(&self) -> &[StoredObject] {
		self.loader.stored()
	}
}

impl Drop for FixtureData {
	fn drop(&mut self) {
		if self.loaded {
			tracing::warn!(
				rows = self.loader.stored().len(),
				"fixture data dropped without teardown"
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::env::MediumMap;
	use crate::memory::{Journal, MemoryMedium};
	use rstest::{fixture, rstest};

	#[fixture]
	fn category() -> Arc<DataSetDef> {
		DataSetDef::builder("CategoryData")
			.storage("Category")
			.row("cars", |r| r.set("name", "cars"))
			.row("free_stuff", |r| r.set("name", "get free stuff"))
			.build()
	}

	#[fixture]
	fn product(category: Arc<DataSetDef>) -> Arc<DataSetDef> {
		let cars = category.row_ref("cars").unwrap().value("name").unwrap();
		DataSetDef::builder("ProductData")
			.storage("Product")
			.row("truck", |r| r.set("name", "truck").set("category", cars))
			.build()
	}

	fn shop(journal: &Journal) -> MediumMap {
		MediumMap::new()
			.with_medium(MemoryMedium::with_journal("Category", journal.clone()))
			.with_medium(MemoryMedium::with_journal("Product", journal.clone()))
	}

	#[rstest]
	fn test_load_order_puts_references_first(category: Arc<DataSetDef>, product: Arc<DataSetDef>) {
		let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[product, category]).unwrap();
		let names: Vec<String> = load_order(&aggregate)
			.iter()
			.map(|d| d.name().to_string())
			.collect();
		assert_eq!(names, vec!["CategoryData", "ProductData"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_then_unload_in_reverse(product: Arc<DataSetDef>) {
		let journal = Journal::new();
		let mut loader = LoadableFixture::new(shop(&journal));
		let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[product]).unwrap();

		loader.load(&aggregate).await.unwrap();
		loader.unload().await.unwrap();

		assert_eq!(
			journal.labels(),
			vec![
				"visit:Category",
				"save:Category.cars",
				"save:Category.free_stuff",
				"visit:Product",
				"save:Product.truck",
				"clear:Product.truck",
				"clear:Category.free_stuff",
				"clear:Category.cars",
			]
		);
		assert!(loader.stored().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_shared_reference_loads_once(category: Arc<DataSetDef>, product: Arc<DataSetDef>) {
		let free = category.row_ref("free_stuff").unwrap().value("name").unwrap();
		let offer = DataSetDef::builder("OfferData")
			.storage("Product")
			.row("giveaway", |r| r.set("category", free))
			.build();

		let journal = Journal::new();
		let mut loader = LoadableFixture::new(shop(&journal));
		let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[product, offer]).unwrap();
		loader.load(&aggregate).await.unwrap();

		let category_saves = journal
			.labels()
			.into_iter()
			.filter(|label| label.starts_with("save:Category"))
			.count();
		assert_eq!(category_saves, 2);
		assert_eq!(loader.stored().len(), 4);
	}

	#[rstest]
	#[tokio::test]
	async fn test_second_load_of_same_aggregate_is_skipped(product: Arc<DataSetDef>) {
		let journal = Journal::new();
		let mut loader = LoadableFixture::new(shop(&journal));
		let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[product]).unwrap();

		loader.load(&aggregate).await.unwrap();
		loader.load(&aggregate).await.unwrap();
		assert_eq!(loader.stored().len(), 3);
	}

	#[rstest]
	#[tokio::test]
	async fn test_failure_unloads_stored_rows(product: Arc<DataSetDef>) {
		let journal = Journal::new();
		let env = MediumMap::new()
			.with_medium(MemoryMedium::with_journal("Category", journal.clone()))
			.with_medium(MemoryMedium::with_journal("Product", journal.clone()).failing_on("truck"));
		let mut loader = LoadableFixture::new(env);
		let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[product]).unwrap();

		let result = loader.load(&aggregate).await;
		assert!(matches!(result, Err(LoadError::Storage { .. })));
		assert!(loader.stored().is_empty());
		assert!(journal.labels().ends_with(&[
			"clear:Category.free_stuff".to_string(),
			"clear:Category.cars".to_string(),
		]));

		let dataset = aggregate.dataset("CategoryData").unwrap();
		assert!(!loader.is_loaded(dataset));
	}

	#[rstest]
	#[tokio::test]
	async fn test_failure_without_unload_keeps_rows(product: Arc<DataSetDef>) {
		let env = MediumMap::new()
			.with_medium(MemoryMedium::new("Category"))
			.with_medium(MemoryMedium::new("Product").failing_on("truck"));
		let mut loader = LoadableFixture::new(env)
			.with_options(LoadOptions::new().with_unload_on_error(false));
		let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[product]).unwrap();

		assert!(loader.load(&aggregate).await.is_err());
		assert_eq!(loader.stored().len(), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_retry_after_partial_failure_resumes(product: Arc<DataSetDef>) {
		let journal = Journal::new();
		let category_medium = MemoryMedium::with_journal("Category", journal.clone()).failing_on("free_stuff");
		let env = MediumMap::new()
			.with_medium(category_medium.clone())
			.with_medium(MemoryMedium::with_journal("Product", journal.clone()));
		let mut loader = LoadableFixture::new(env)
			.with_options(LoadOptions::new().with_unload_on_error(false));
		let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[product]).unwrap();
		let category = Arc::clone(aggregate.dataset("CategoryData").unwrap());

		let result = loader.load(&aggregate).await;
		assert!(matches!(result, Err(LoadError::Storage { .. })));
		assert!(!loader.is_loaded(&category));
		assert_eq!(journal.labels(), vec!["visit:Category", "save:Category.cars"]);

		// the failing dataset is not skipped, and dependents wait for it
		assert!(loader.load(&aggregate).await.is_err());
		assert!(!journal.labels().iter().any(|label| label.starts_with("save:Product")));

		category_medium.stop_failing();
		journal.clear();
		loader.load(&aggregate).await.unwrap();
		assert_eq!(
			journal.labels(),
			vec![
				"visit:Category",
				"save:Category.free_stuff",
				"visit:Product",
				"save:Product.truck",
			]
		);
		assert!(loader.is_loaded(&category));
		assert_eq!(loader.stored().len(), 3);
		assert_eq!(category_medium.len(), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_medium_is_a_lookup_error(category: Arc<DataSetDef>) {
		let mut loader = LoadableFixture::new(MediumMap::new());
		let aggregate = Aggregate::from_defs(AggregateKind::SuperSet, &[category]).unwrap();
		let result = loader.load(&aggregate).await;
		assert!(matches!(result, Err(LoadError::Lookup(_))));
	}

	#[rstest]
	fn test_storage_name_falls_back_to_style() {
		let def = DataSetDef::builder("OfferItemData")
			.row("first", |r| r.set("v", 1))
			.build();
		let dataset = DataSet::new(&def).unwrap();
		let loader = LoadableFixture::new(MediumMap::new()).with_options(
			LoadOptions::new().with_style(NameStyle::named_data().chain(NameStyle::CamelAndUnders)),
		);
		assert_eq!(loader.storage_name(&dataset), "offer_item");
	}

	#[rstest]
	fn test_storage_medium_overrides_storage_name() {
		let def = DataSetDef::builder("FlowerData")
			.storage("Flower")
			.storage_medium("garden")
			.row("violets", |r| r.set("color", "blue"))
			.build();
		let dataset = DataSet::new(&def).unwrap();
		let loader = LoadableFixture::new(MediumMap::new().with_medium(MemoryMedium::new("garden")));
		assert_eq!(loader.medium_for(&dataset).unwrap().name(), "garden");
	}

	#[rstest]
	#[tokio::test]
	async fn test_fixture_data_setup_and_teardown(product: Arc<DataSetDef>) {
		let journal = Journal::new();
		let loader = LoadableFixture::new(shop(&journal));
		let mut data = loader.data(&[product]).unwrap();

		assert!(matches!(data.teardown().await, Err(LoadError::NotLoaded(_))));

		data.setup().await.unwrap();
		assert!(data.is_loaded());
		assert_eq!(data.aggregate().kind(), AggregateKind::Merged);
		assert_eq!(
			data.row("cars").unwrap().get_item("name").unwrap(),
			&serde_json::json!("cars")
		);
		assert_eq!(data.stored().len(), 3);

		data.teardown().await.unwrap();
		assert!(!data.is_loaded());
		assert!(data.stored().is_empty());
	}

	#[rstest]
	fn test_options_defaults_from_empty_json() {
		let options = LoadOptions::from_json("{}").unwrap();
		assert_eq!(options, LoadOptions::default());
	}
}
