//! Built datasets and the build algorithm.
//!
//! Building walks a definition's row declarations in order, substitutes every
//! [`RefValue`](crate::RefValue) with its resolved value, and records the
//! referenced definition as a dependency. Once rows are in place the
//! dataset's reference aggregate ([`DataSet::refs`]) holds one instance per
//! referenced definition.
//!
//! Building is a one-way latch: `Unbuilt -> Building -> Built`. A built
//! dataset never re-scans its declarations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::container::{DataContainer, Iter};
use crate::definition::{DataSetDef, DefId, Meta};
use crate::error::{DataSetError, DataSetResult};
use crate::reference::ColumnValue;
use crate::row::{DataRow, ROW_RESERVED, RowData};
use crate::superset::{Aggregate, AggregateKind};

/// Names a dataset keeps for its own bookkeeping; row keys may not use them.
pub const DATASET_RESERVED: &[&str] = &["meta", "Meta", "ref", "get", "data"];

static NEXT_DATASET_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a dataset instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataSetId(u64);

impl DataSetId {
	fn next() -> Self {
		Self(NEXT_DATASET_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// Build progress of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
	/// Created, declarations not scanned yet.
	Unbuilt,
	/// Declarations are being scanned.
	Building,
	/// Rows are materialized; terminal.
	Built,
}

/// A built set of rows, usually loaded into a single storage target.
///
/// ```
/// use fixture_dataset::{DataSet, DataSetDef};
///
/// let flowers = DataSetDef::builder("FlowerData")
///     .row("violets", |r| r.set("color", "blue"))
///     .row("roses", |r| r.set("color", "red"))
///     .build();
///
/// let dataset = DataSet::new(&flowers)?;
/// assert_eq!(dataset.attr("violets")?.attr("color")?, "blue");
/// assert_eq!(dataset.row("roses")?.get_item("color")?, "red");
/// # Ok::<(), fixture_dataset::DataSetError>(())
/// ```
#[derive(Debug)]
pub struct DataSet {
	id: DataSetId,
	def: Arc<DataSetDef>,
	rows: DataContainer<Arc<DataRow>>,
	references: Vec<Arc<DataSetDef>>,
	refs: Aggregate,
	state: BuildState,
}

impl DataSet {
	/// Builds a dataset and every dataset it references.
	///
	/// # Errors
	///
	/// Fails if this dataset or any dataset it references cannot be built.
	pub fn new(def: &Arc<DataSetDef>) -> DataSetResult<Arc<Self>> {
		Self::with_default_refclass(def, None)
	}

	/// Builds a dataset, using `default_refclass` for every reference
	/// aggregate whose definition does not choose one.
	pub fn with_default_refclass(
		def: &Arc<DataSetDef>,
		default_refclass: Option<AggregateKind>,
	) -> DataSetResult<Arc<Self>> {
		BuildContext::new(default_refclass).instance(def)
	}

	/// Creates an unbuilt dataset. Call [`build`](Self::build) to materialize rows.
	pub fn unbuilt(def: &Arc<DataSetDef>) -> Self {
		let refclass = def.meta().refclass.unwrap_or_default();
		Self {
			id: DataSetId::next(),
			def: Arc::clone(def),
			rows: DataContainer::new(def.name(), DATASET_RESERVED),
			references: Vec::new(),
			refs: Aggregate::empty(refclass),
			state: BuildState::Unbuilt,
		}
	}

	/// Materializes rows and references. Does nothing once built.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::EmptyDataSet`] when no rows qualify,
	/// [`DataSetError::Redeclaration`] when a row key or column collides with a
	/// reserved name or an earlier row, and any error raised while building
	/// referenced datasets.
	pub fn build(&mut self, ctx: &mut BuildContext) -> DataSetResult<()> {
		if self.state == BuildState::Built {
			tracing::trace!(dataset = %self.name(), "already built");
			return Ok(());
		}
		self.state = BuildState::Building;
		tracing::debug!(dataset = %self.name(), "building dataset");

		let def = Arc::clone(&self.def);
		let refclass = def
			.meta()
			.refclass
			.or(ctx.default_refclass())
			.unwrap_or_default();
		self.refs = Aggregate::empty(refclass);

		for reference in &def.meta().references {
			self.note_reference(reference);
		}
		// declared references are available to the data provider
		if !self.references.is_empty() {
			self.populate_refs(ctx)?;
		}

		for (key, data) in self.scan()? {
			self.store_row(&def, key, data)?;
		}

		self.populate_refs(ctx)?;
		self.state = BuildState::Built;
		tracing::debug!(
			dataset = %self.name(),
			rows = self.rows.len(),
			references = self.references.len(),
			"built dataset"
		);
		Ok(())
	}

	/// Produces `(key, row data)` pairs from the provider or the declarations.
	fn scan(&mut self) -> DataSetResult<Vec<(String, RowData)>> {
		let def = Arc::clone(&self.def);
		let rows = match def.provider() {
			Some(provider) => provider(&self.refs)?,
			None => {
				let mut rows = Vec::new();
				for decl in def.rows() {
					let mut row = RowData::new();
					for (column, value) in decl.columns() {
						if column.starts_with('_') {
							continue;
						}
						match value {
							ColumnValue::Ref(_) => continue,
							ColumnValue::RefValue(ref_value) => {
								self.note_reference(ref_value.dataset());
								row.push((column.clone(), ref_value.value().clone()));
							}
							ColumnValue::Value(value) => row.push((column.clone(), value.clone())),
						}
					}
					rows.push((decl.name().to_string(), row));
				}
				rows
			}
		};
		if rows.is_empty() {
			return Err(DataSetError::EmptyDataSet(def.name().to_string()));
		}
		Ok(rows)
	}

	fn store_row(&mut self, def: &DataSetDef, key: String, data: RowData) -> DataSetResult<()> {
		if self.rows.contains(&key) || self.rows.is_reserved(&key) {
			return Err(DataSetError::Redeclaration {
				dataset: def.name().to_string(),
				key,
			});
		}
		let mut row = DataRow::new(data);
		if let Some(factory) = &def.meta().row {
			row = factory(row);
		}
		// checked after the factory, which may add columns of its own
		if let Some(column) = row
			.columns()
			.iter()
			.find(|column| ROW_RESERVED.contains(&column.as_str()))
		{
			return Err(DataSetError::Redeclaration {
				dataset: format!("{}.{}", def.name(), key),
				key: column.clone(),
			});
		}
		self.rows.set_data(key, Arc::new(row));
		Ok(())
	}

	fn note_reference(&mut self, reference: &Arc<DataSetDef>) {
		if self.references.iter().any(|known| known.id() == reference.id()) {
			return;
		}
		tracing::trace!(
			dataset = %self.name(),
			reference = %reference.name(),
			"discovered reference"
		);
		self.references.push(Arc::clone(reference));
	}

	/// Adds an instance of every recorded reference not yet in `refs`.
	fn populate_refs(&mut self, ctx: &mut BuildContext) -> DataSetResult<()> {
		let pending: Vec<_> = self
			.references
			.iter()
			.filter(|reference| !self.refs.contains_def(reference.id()))
			.cloned()
			.collect();
		for reference in pending {
			let instance = ctx.instance(&reference)?;
			self.refs.add(&instance)?;
		}
		Ok(())
	}

	/// Identity of this instance.
	pub fn id(&self) -> DataSetId {
		self.id
	}

	/// Definition name.
	pub fn name(&self) -> &str {
		self.def.name()
	}

	/// Definition this dataset was built from.
	pub fn def(&self) -> &Arc<DataSetDef> {
		&self.def
	}

	/// Configuration, carried through unmodified.
	pub fn meta(&self) -> &Meta {
		self.def.meta()
	}

	/// Storage target name, if configured.
	pub fn storage(&self) -> Option<&str> {
		self.meta().storage.as_deref()
	}

	/// Storage medium name, if configured.
	pub fn storage_medium(&self) -> Option<&str> {
		self.meta().storage_medium.as_deref()
	}

	/// Build progress.
	pub fn state(&self) -> BuildState {
		self.state
	}

	/// Returns true once rows are materialized.
	pub fn is_built(&self) -> bool {
		self.state == BuildState::Built
	}

	/// Definitions this dataset depends on, in discovery order.
	pub fn references(&self) -> &[Arc<DataSetDef>] {
		&self.references
	}

	/// One instance per referenced definition.
	pub fn refs(&self) -> &Aggregate {
		&self.refs
	}

	/// Aggregate kind of [`refs`](Self::refs).
	pub fn refclass(&self) -> AggregateKind {
		self.refs.kind()
	}

	/// Returns true if a row is stored under `key`.
	pub fn contains(&self, key: &str) -> bool {
		self.rows.contains(key)
	}

	/// Indexed row lookup.
	pub fn row(&self, key: &str) -> DataSetResult<&DataRow> {
		self.rows.get_item(key).map(Arc::as_ref)
	}

	/// Attribute-style row lookup.
	pub fn attr(&self, key: &str) -> DataSetResult<&DataRow> {
		self.rows.attr(key).map(Arc::as_ref)
	}

	/// Row lookup returning `None` when absent.
	pub fn get(&self, key: &str) -> Option<&Arc<DataRow>> {
		self.rows.get(key)
	}

	/// Row keys in declaration order.
	pub fn keys(&self) -> &[String] {
		self.rows.keys()
	}

	/// Number of rows.
	pub fn len(&self) -> usize {
		self.rows.len()
	}

	/// Returns true if no rows are materialized.
	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Iterates `(key, row)` pairs in declaration order.
	pub fn iter(&self) -> Iter<'_, Arc<DataRow>> {
		self.rows.iter()
	}
}

impl<'a> IntoIterator for &'a DataSet {
	type Item = (&'a str, &'a Arc<DataRow>);
	type IntoIter = Iter<'a, Arc<DataRow>>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Shared state for one round of building.
///
/// Holds one instance per definition so that a dataset reached through
/// several references is the same instance everywhere it appears.
#[derive(Debug, Default)]
pub struct BuildContext {
	default_refclass: Option<AggregateKind>,
	instances: HashMap<DefId, Arc<DataSet>>,
	in_progress: HashSet<DefId>,
}

impl BuildContext {
	/// Creates a context.
	pub fn new(default_refclass: Option<AggregateKind>) -> Self {
		Self {
			default_refclass,
			instances: HashMap::new(),
			in_progress: HashSet::new(),
		}
	}

	/// Aggregate kind used where a definition does not choose one.
	pub fn default_refclass(&self) -> Option<AggregateKind> {
		self.default_refclass
	}

	/// Returns the instance for `def`, building it on first request.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::InvalidReference`] if `def` is reached again
	/// while it is still being built, and any build error.
	pub fn instance(&mut self, def: &Arc<DataSetDef>) -> DataSetResult<Arc<DataSet>> {
		if let Some(instance) = self.instances.get(&def.id()) {
			return Ok(Arc::clone(instance));
		}
		if !self.in_progress.insert(def.id()) {
			return Err(DataSetError::InvalidReference {
				reference: def.name().to_string(),
				message: "circular reference".to_string(),
			});
		}
		let mut dataset = DataSet::unbuilt(def);
		let result = dataset.build(self);
		self.in_progress.remove(&def.id());
		result?;

		let dataset = Arc::new(dataset);
		self.instances.insert(def.id(), Arc::clone(&dataset));
		Ok(dataset)
	}

	/// Number of instances built so far.
	pub fn len(&self) -> usize {
		self.instances.len()
	}

	/// Returns true if nothing has been built.
	pub fn is_empty(&self) -> bool {
		self.instances.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn category() -> Arc<DataSetDef> {
		DataSetDef::builder("CategoryData")
			.row("cars", |r| r.set("name", "cars"))
			.row("free_stuff", |r| r.set("name", "get free stuff"))
			.build()
	}

	#[fixture]
	fn product(category: Arc<DataSetDef>) -> Arc<DataSetDef> {
		let cars = category.row_ref("cars").unwrap();
		DataSetDef::builder("ProductData")
			.row("truck", |r| {
				r.set("name", "truck")
					.set("category", cars.value("name").unwrap())
			})
			.build()
	}

	#[rstest]
	fn test_rows_in_declaration_order() {
		let def = DataSetDef::builder("FlowerData")
			.row("violets", |r| r.set("color", "blue"))
			.row("roses", |r| r.set("color", "red"))
			.row("daisies", |r| r.set("color", "white"))
			.build();
		let dataset = DataSet::new(&def).unwrap();
		assert_eq!(dataset.keys(), &["violets", "roses", "daisies"]);
		assert!(dataset.is_built());
	}

	#[rstest]
	fn test_reference_resolves_to_scalar(product: Arc<DataSetDef>) {
		let dataset = DataSet::new(&product).unwrap();
		let truck = dataset.attr("truck").unwrap();
		assert_eq!(truck.attr("category").unwrap(), &json!("cars"));
		assert_eq!(truck.columns(), &["name", "category"]);
	}

	#[rstest]
	fn test_reference_builds_one_instance(product: Arc<DataSetDef>) {
		let mut ctx = BuildContext::new(None);
		let dataset = ctx.instance(&product).unwrap();
		assert_eq!(ctx.len(), 2);

		assert_eq!(dataset.references().len(), 1);
		let category = dataset.refs().dataset("CategoryData").unwrap();
		assert_eq!(category.keys(), &["cars", "free_stuff"]);
		assert_eq!(
			category.row("free_stuff").unwrap().get_item("name").unwrap(),
			&json!("get free stuff")
		);
	}

	#[rstest]
	fn test_build_is_a_latch(category: Arc<DataSetDef>) {
		let mut ctx = BuildContext::new(None);
		let mut dataset = DataSet::unbuilt(&category);
		assert_eq!(dataset.state(), BuildState::Unbuilt);

		dataset.build(&mut ctx).unwrap();
		let first: Vec<_> = dataset.iter().map(|(k, r)| (k.to_string(), r.to_json())).collect();

		dataset.build(&mut ctx).unwrap();
		let second: Vec<_> = dataset.iter().map(|(k, r)| (k.to_string(), r.to_json())).collect();

		assert_eq!(dataset.state(), BuildState::Built);
		assert_eq!(first, second);
	}

	#[rstest]
	fn test_empty_dataset_is_an_error() {
		let def = DataSetDef::builder("NothingData").build();
		let result = DataSet::new(&def);
		assert!(matches!(result, Err(DataSetError::EmptyDataSet(ref name)) if name == "NothingData"));
	}

	#[rstest]
	fn test_only_private_rows_is_empty() {
		let def = DataSetDef::builder("HiddenData")
			.row("_secret", |r| r.set("v", 1))
			.row("Meta", |r| r.set("storage", "x"))
			.build();
		assert!(matches!(DataSet::new(&def), Err(DataSetError::EmptyDataSet(_))));
	}

	#[rstest]
	#[case("ref")]
	#[case("data")]
	#[case("meta")]
	fn test_reserved_row_key_is_a_redeclaration(#[case] key: &str) {
		let def = DataSetDef::builder("OddData")
			.row(key, |r| r.set("v", 1))
			.build();
		let result = DataSet::new(&def);
		assert!(matches!(result, Err(DataSetError::Redeclaration { key: ref k, .. }) if k == key));
	}

	#[rstest]
	fn test_reserved_column_is_a_redeclaration() {
		let def = DataSetDef::builder("OddData")
			.row("thing", |r| r.set("items", 3))
			.build();
		let result = DataSet::new(&def);
		assert!(matches!(
			result,
			Err(DataSetError::Redeclaration { ref dataset, ref key })
				if dataset == "OddData.thing" && key == "items"
		));
	}

	#[rstest]
	#[case("items")]
	#[case("ref")]
	#[case("meta")]
	fn test_reserved_column_from_row_factory_is_a_redeclaration(#[case] column: &'static str) {
		let def = DataSetDef::builder("OddData")
			.row_factory(move |mut row| {
				row.set(column, json!(1));
				row
			})
			.row("thing", |r| r.set("v", 1))
			.build();
		let result = DataSet::new(&def);
		assert!(matches!(
			result,
			Err(DataSetError::Redeclaration { ref dataset, ref key })
				if dataset == "OddData.thing" && key == column
		));
	}

	#[rstest]
	fn test_provider_duplicate_key_is_a_redeclaration() {
		let def = DataSetDef::builder("ProvidedData")
			.data(|_| {
				Ok(vec![
					("a".to_string(), vec![("v".to_string(), json!(1))]),
					("a".to_string(), vec![("v".to_string(), json!(2))]),
				])
			})
			.build();
		assert!(matches!(
			DataSet::new(&def),
			Err(DataSetError::Redeclaration { .. })
		));
	}

	#[rstest]
	fn test_bare_ref_and_private_columns_are_skipped(category: Arc<DataSetDef>) {
		let def = DataSetDef::builder("ProductData")
			.row("truck", |r| {
				r.set("name", "truck")
					.set_ref("kind", category.row_ref("cars").unwrap())
					.set("_note", "internal")
			})
			.build();
		let dataset = DataSet::new(&def).unwrap();
		assert_eq!(dataset.row("truck").unwrap().columns(), &["name"]);
		assert!(dataset.references().is_empty());
		assert!(dataset.refs().is_empty());
	}

	#[rstest]
	fn test_declared_references_feed_the_provider(category: Arc<DataSetDef>) {
		let def = DataSetDef::builder("ProductData")
			.references([Arc::clone(&category)])
			.data(|refs| {
				let cars = refs
					.dataset("CategoryData")
					.ok_or_else(|| DataSetError::UnknownDataSet("CategoryData".to_string()))?
					.row("cars")?
					.get_item("name")?
					.clone();
				Ok(vec![(
					"truck".to_string(),
					vec![("name".to_string(), json!("truck")), ("category".to_string(), cars)],
				)])
			})
			.build();
		let dataset = DataSet::new(&def).unwrap();
		assert_eq!(dataset.row("truck").unwrap().get_item("category").unwrap(), &json!("cars"));
		assert_eq!(dataset.refs().len(), 1);
	}

	#[rstest]
	fn test_declared_and_discovered_references_converge(category: Arc<DataSetDef>) {
		let color = DataSetDef::builder("ColorData")
			.row("red", |r| r.set("hex", "#f00"))
			.build();
		let red = color.row_ref("red").unwrap().value("hex").unwrap();
		let cars = category.row_ref("cars").unwrap().value("name").unwrap();

		let upfront = DataSetDef::builder("ProductData")
			.references([Arc::clone(&category)])
			.row("truck", |r| r.set("category", cars.clone()).set("color", red.clone()))
			.build();
		let discovered = DataSetDef::builder("ProductData")
			.row("truck", |r| r.set("category", cars).set("color", red))
			.build();

		let upfront = DataSet::new(&upfront).unwrap();
		let discovered = DataSet::new(&discovered).unwrap();

		fn names(dataset: &DataSet) -> Vec<String> {
			dataset.refs().iter().map(|d| d.name().to_string()).collect()
		}
		assert_eq!(names(&upfront), vec!["CategoryData", "ColorData"]);
		assert_eq!(names(&upfront), names(&discovered));
	}

	#[rstest]
	fn test_row_factory_applies_to_every_row() {
		let def = DataSetDef::builder("FlowerData")
			.row_factory(|mut row| {
				row.set("kind", json!("flower"));
				row
			})
			.row("violets", |r| r.set("color", "blue"))
			.row("roses", |r| r.set("color", "red"))
			.build();
		let dataset = DataSet::new(&def).unwrap();
		for (_, row) in &*dataset {
			assert_eq!(row.get_item("kind").unwrap(), &json!("flower"));
		}
	}

	#[rstest]
	fn test_default_refclass_propagates(product: Arc<DataSetDef>) {
		let dataset = DataSet::with_default_refclass(&product, Some(AggregateKind::Merged)).unwrap();
		assert_eq!(dataset.refclass(), AggregateKind::Merged);
		let category = dataset.refs().dataset("CategoryData").unwrap();
		assert_eq!(category.refclass(), AggregateKind::Merged);
	}

	#[rstest]
	fn test_meta_refclass_wins_over_default(category: Arc<DataSetDef>) {
		let cars = category.row_ref("cars").unwrap().value("name").unwrap();
		let def = DataSetDef::builder("ProductData")
			.refclass(AggregateKind::SuperSet)
			.row("truck", |r| r.set("category", cars))
			.build();
		let dataset = DataSet::with_default_refclass(&def, Some(AggregateKind::Merged)).unwrap();
		assert_eq!(dataset.refclass(), AggregateKind::SuperSet);
	}

	#[rstest]
	fn test_missing_row_lookup(category: Arc<DataSetDef>) {
		let dataset = DataSet::new(&category).unwrap();
		assert!(matches!(dataset.row("boats"), Err(DataSetError::MissingKey { .. })));
		assert!(matches!(dataset.attr("boats"), Err(DataSetError::MissingAttribute { .. })));
		assert!(dataset.get("boats").is_none());
	}
}
