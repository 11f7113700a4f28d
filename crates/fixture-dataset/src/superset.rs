//! Aggregates: deduplicated, ordered collections of datasets.
//!
//! An aggregate is built from top-level datasets and pulls in everything they
//! reference, transitively. Referenced datasets stay reachable by key but are
//! left out of iteration; a loader reaches them through each dataset's
//! [`refs`](crate::DataSet::refs) instead.
//!
//! Registration is by instance identity. Adding the same instance twice,
//! directly or through two reference paths, is a silent no-op.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::container::{CONTAINER_RESERVED, DataContainer, Iter};
use crate::dataset::{BuildContext, DataSet};
use crate::definition::{DataSetDef, DefId};
use crate::error::{DataSetError, DataSetResult};
use crate::registry::ObjRegistry;
use crate::row::DataRow;

/// Which aggregate to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AggregateKind {
	/// Datasets keyed by name.
	#[default]
	SuperSet,
	/// Datasets keyed by name, plus all their rows in one shared namespace.
	#[serde(rename = "MergedSuperSet", alias = "Merged")]
	Merged,
}

impl fmt::Display for AggregateKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::SuperSet => write!(f, "SuperSet"),
			Self::Merged => write!(f, "MergedSuperSet"),
		}
	}
}

/// Bookkeeping shared by both aggregates: which instances are registered,
/// under which keys, and which of them are iterated.
///
/// The keyed container is the only name-to-dataset map; every lookup reads it.
#[derive(Debug, Clone)]
pub struct DataSetContainer {
	data: DataContainer<Arc<DataSet>>,
	order: Vec<Arc<DataSet>>,
	registry: ObjRegistry,
}

impl DataSetContainer {
	/// Creates an empty container whose lookup errors name `label`.
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			data: DataContainer::new(label, CONTAINER_RESERVED),
			order: Vec::new(),
			registry: ObjRegistry::new(),
		}
	}

	/// Key a dataset is registered under.
	pub fn dataset_to_key(dataset: &DataSet) -> String {
		dataset.name().to_string()
	}

	/// Registers `dataset`. Returns false if that instance was already registered.
	///
	/// Reference-only datasets are reachable by key but not iterated.
	fn set_dataset(&mut self, dataset: &Arc<DataSet>, key: String, is_ref: bool) -> bool {
		if self.registry.contains(dataset) {
			tracing::trace!(dataset = %key, "instance already registered, skipping");
			return false;
		}
		if let Some(previous) = self.data.get(&key) {
			tracing::warn!(
				key = %key,
				previous = ?previous.id(),
				current = ?dataset.id(),
				"a distinct dataset instance now shadows this key"
			);
		}
		if !is_ref {
			self.order.push(Arc::clone(dataset));
		}
		self.data.set_data(key, Arc::clone(dataset));
		self.registry.register(dataset);
		true
	}

	/// Iterates top-level datasets in the order first added.
	pub fn iter(&self) -> std::slice::Iter<'_, Arc<DataSet>> {
		self.order.iter()
	}

	/// Looks up a dataset, top-level or reference-only, by key.
	pub fn get(&self, key: &str) -> Option<&Arc<DataSet>> {
		self.data.get(key)
	}

	/// Indexed dataset lookup.
	pub fn get_item(&self, key: &str) -> DataSetResult<&Arc<DataSet>> {
		self.data.get_item(key)
	}

	/// Attribute-style dataset lookup.
	pub fn attr(&self, key: &str) -> DataSetResult<&Arc<DataSet>> {
		self.data.attr(key)
	}

	/// Returns true if a dataset is registered under `key`.
	pub fn contains_key(&self, key: &str) -> bool {
		self.data.contains(key)
	}

	/// Returns true if that instance is registered.
	pub fn contains_instance(&self, dataset: &DataSet) -> bool {
		self.registry.contains(dataset)
	}

	/// Returns true if an instance of the definition is registered.
	pub fn contains_def(&self, id: DefId) -> bool {
		self.data.iter().any(|(_, dataset)| dataset.def().id() == id)
	}

	/// Every lookup key, top-level and reference-only, in registration order.
	pub fn keys(&self) -> &[String] {
		self.data.keys()
	}

	/// Iterates `(key, dataset)` pairs for every lookup key.
	pub fn entries(&self) -> Iter<'_, Arc<DataSet>> {
		self.data.iter()
	}

	/// Number of top-level datasets.
	pub fn len(&self) -> usize {
		self.order.len()
	}

	/// Returns true if no top-level dataset is registered.
	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}
}

impl Default for DataSetContainer {
	fn default() -> Self {
		Self::new("DataSetContainer")
	}
}

/// A set of datasets, each reachable by key or attribute.
///
/// ```
/// use fixture_dataset::{DataSetDef, SuperSet};
///
/// let category = DataSetDef::builder("CategoryData")
///     .row("cars", |r| r.set("name", "cars"))
///     .build();
/// let cars = category.row_ref("cars")?.value("name")?;
/// let product = DataSetDef::builder("ProductData")
///     .row("truck", |r| r.set("category", cars))
///     .build();
///
/// let superset = SuperSet::from_defs(&[product])?;
/// let names: Vec<_> = superset.iter().map(|d| d.name()).collect();
/// assert_eq!(names, vec!["ProductData"]);
/// assert!(superset.attr("CategoryData").is_ok());
/// # Ok::<(), fixture_dataset::DataSetError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SuperSet {
	datasets: DataSetContainer,
}

impl SuperSet {
	/// Creates an empty set.
	pub fn new() -> Self {
		Self {
			datasets: DataSetContainer::new("SuperSet"),
		}
	}

	/// Creates a set from built datasets.
	pub fn from_datasets<I>(datasets: I) -> Self
	where
		I: IntoIterator<Item = Arc<DataSet>>,
	{
		let mut superset = Self::new();
		for dataset in datasets {
			superset.add(&dataset);
		}
		superset
	}

	/// Builds every definition in one [`BuildContext`] and collects the results.
	pub fn from_defs(defs: &[Arc<DataSetDef>]) -> DataSetResult<Self> {
		let mut ctx = BuildContext::new(None);
		let mut superset = Self::new();
		for def in defs {
			let dataset = ctx.instance(def)?;
			superset.add(&dataset);
		}
		Ok(superset)
	}

	/// Adds a top-level dataset and, as reference-only entries, everything it references.
	pub fn add(&mut self, dataset: &Arc<DataSet>) {
		self.store(dataset, false);
	}

	fn store(&mut self, dataset: &Arc<DataSet>, is_ref: bool) {
		let key = DataSetContainer::dataset_to_key(dataset);
		if !self.datasets.set_dataset(dataset, key.clone(), is_ref) {
			return;
		}
		tracing::trace!(dataset = %key, is_ref, "added dataset to SuperSet");
		for referenced in dataset.refs().iter() {
			self.store(referenced, true);
		}
	}

	/// Dataset bookkeeping.
	pub fn datasets(&self) -> &DataSetContainer {
		&self.datasets
	}

	/// Iterates top-level datasets in the order first added.
	pub fn iter(&self) -> std::slice::Iter<'_, Arc<DataSet>> {
		self.datasets.iter()
	}

	/// Indexed dataset lookup.
	pub fn get_item(&self, key: &str) -> DataSetResult<&Arc<DataSet>> {
		self.datasets.get_item(key)
	}

	/// Attribute-style dataset lookup.
	pub fn attr(&self, key: &str) -> DataSetResult<&Arc<DataSet>> {
		self.datasets.attr(key)
	}

	/// Dataset lookup returning `None` when absent.
	pub fn get(&self, key: &str) -> Option<&Arc<DataSet>> {
		self.datasets.get(key)
	}

	/// Returns true if a dataset is registered under `key`.
	pub fn contains(&self, key: &str) -> bool {
		self.datasets.contains_key(key)
	}

	/// Every lookup key in registration order.
	pub fn keys(&self) -> &[String] {
		self.datasets.keys()
	}

	/// Iterates `(key, dataset)` pairs for every lookup key.
	pub fn entries(&self) -> Iter<'_, Arc<DataSet>> {
		self.datasets.entries()
	}

	/// Number of top-level datasets.
	pub fn len(&self) -> usize {
		self.datasets.len()
	}

	/// Returns true if no top-level dataset is registered.
	pub fn is_empty(&self) -> bool {
		self.datasets.is_empty()
	}
}

impl Default for SuperSet {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> IntoIterator for &'a SuperSet {
	type Item = &'a Arc<DataSet>;
	type IntoIter = std::slice::Iter<'a, Arc<DataSet>>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// A set of datasets whose rows share one key/attribute namespace.
///
/// Two datasets contributing the same row key is an error.
#[derive(Debug, Clone)]
pub struct MergedSuperSet {
	rows: DataContainer<Arc<DataRow>>,
	keys_to_datasets: HashMap<String, Arc<DataSet>>,
	datasets: DataSetContainer,
}

impl MergedSuperSet {
	/// Creates an empty merged set.
	pub fn new() -> Self {
		Self {
			rows: DataContainer::new("MergedSuperSet", CONTAINER_RESERVED),
			keys_to_datasets: HashMap::new(),
			datasets: DataSetContainer::new("MergedSuperSet"),
		}
	}

	/// Creates a merged set from built datasets.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::KeyCollision`] if two datasets share a row key.
	pub fn from_datasets<I>(datasets: I) -> DataSetResult<Self>
	where
		I: IntoIterator<Item = Arc<DataSet>>,
	{
		let mut merged = Self::new();
		for dataset in datasets {
			merged.add(&dataset)?;
		}
		Ok(merged)
	}

	/// Builds every definition in one [`BuildContext`] whose reference
	/// aggregates default to merged sets, then collects the results.
	pub fn from_defs(defs: &[Arc<DataSetDef>]) -> DataSetResult<Self> {
		let mut ctx = BuildContext::new(Some(AggregateKind::Merged));
		let mut merged = Self::new();
		for def in defs {
			let dataset = ctx.instance(def)?;
			merged.add(&dataset)?;
		}
		Ok(merged)
	}

	/// Adds a top-level dataset and, as reference-only entries, everything it
	/// references, folding every row into the shared namespace.
	///
	/// Row keys are checked before anything is registered, so a failed add
	/// leaves the set unchanged.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::KeyCollision`] naming both datasets when a row
	/// key is already taken.
	pub fn add(&mut self, dataset: &Arc<DataSet>) -> DataSetResult<()> {
		let mut seen = ObjRegistry::new();
		let mut pending = Vec::new();
		self.collect_new(dataset, false, &mut seen, &mut pending);
		self.check_collisions(&pending)?;

		for (dataset, is_ref) in pending {
			let key = DataSetContainer::dataset_to_key(&dataset);
			self.datasets.set_dataset(&dataset, key.clone(), is_ref);
			for (row_key, row) in dataset.iter() {
				self.rows.set_data(row_key, Arc::clone(row));
				self.keys_to_datasets
					.insert(row_key.to_string(), Arc::clone(&dataset));
			}
			tracing::trace!(dataset = %key, is_ref, rows = dataset.len(), "merged dataset");
		}
		Ok(())
	}

	/// Instances `add` would register, in registration order.
	fn collect_new(
		&self,
		dataset: &Arc<DataSet>,
		is_ref: bool,
		seen: &mut ObjRegistry,
		pending: &mut Vec<(Arc<DataSet>, bool)>,
	) {
		if self.datasets.contains_instance(dataset) || !seen.register(dataset) {
			return;
		}
		pending.push((Arc::clone(dataset), is_ref));
		for referenced in dataset.refs().iter() {
			self.collect_new(referenced, true, seen, pending);
		}
	}

	fn check_collisions(&self, pending: &[(Arc<DataSet>, bool)]) -> DataSetResult<()> {
		let mut staged: HashMap<&str, &str> = HashMap::new();
		for (dataset, _) in pending {
			for (row_key, _) in dataset.iter() {
				let existing = self
					.keys_to_datasets
					.get(row_key)
					.map(|existing| existing.name())
					.or_else(|| staged.get(row_key).copied());
				if let Some(existing) = existing {
					return Err(DataSetError::KeyCollision {
						key: row_key.to_string(),
						dataset: dataset.name().to_string(),
						existing: existing.to_string(),
					});
				}
				staged.insert(row_key, dataset.name());
			}
		}
		Ok(())
	}

	/// Dataset bookkeeping.
	pub fn datasets(&self) -> &DataSetContainer {
		&self.datasets
	}

	/// Iterates top-level datasets in the order first added.
	pub fn iter(&self) -> std::slice::Iter<'_, Arc<DataSet>> {
		self.datasets.iter()
	}

	/// Looks up a dataset, top-level or reference-only, by key.
	pub fn dataset(&self, key: &str) -> Option<&Arc<DataSet>> {
		self.datasets.get(key)
	}

	/// Indexed row lookup in the shared namespace.
	pub fn get_item(&self, key: &str) -> DataSetResult<&DataRow> {
		self.rows.get_item(key).map(Arc::as_ref)
	}

	/// Attribute-style row lookup in the shared namespace.
	pub fn attr(&self, key: &str) -> DataSetResult<&DataRow> {
		self.rows.attr(key).map(Arc::as_ref)
	}

	/// Row lookup returning `None` when absent.
	pub fn get(&self, key: &str) -> Option<&Arc<DataRow>> {
		self.rows.get(key)
	}

	/// Returns true if a row is stored under `key`.
	pub fn contains(&self, key: &str) -> bool {
		self.rows.contains(key)
	}

	/// Dataset that contributed the row stored under `key`.
	pub fn dataset_for(&self, key: &str) -> Option<&Arc<DataSet>> {
		self.keys_to_datasets.get(key)
	}

	/// Row keys in the order they were merged.
	pub fn keys(&self) -> &[String] {
		self.rows.keys()
	}

	/// Iterates `(key, row)` pairs of the shared namespace.
	pub fn rows(&self) -> Iter<'_, Arc<DataRow>> {
		self.rows.iter()
	}

	/// Number of top-level datasets.
	pub fn len(&self) -> usize {
		self.datasets.len()
	}

	/// Returns true if no top-level dataset is registered.
	pub fn is_empty(&self) -> bool {
		self.datasets.is_empty()
	}
}

impl Default for MergedSuperSet {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> IntoIterator for &'a MergedSuperSet {
	type Item = &'a Arc<DataSet>;
	type IntoIter = std::slice::Iter<'a, Arc<DataSet>>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Either aggregate, chosen at runtime by [`AggregateKind`].
#[derive(Debug, Clone)]
pub enum Aggregate {
	/// See [`SuperSet`].
	SuperSet(SuperSet),
	/// See [`MergedSuperSet`].
	Merged(MergedSuperSet),
}

impl Aggregate {
	/// Creates an empty aggregate of the given kind.
	pub fn empty(kind: AggregateKind) -> Self {
		match kind {
			AggregateKind::SuperSet => Self::SuperSet(SuperSet::new()),
			AggregateKind::Merged => Self::Merged(MergedSuperSet::new()),
		}
	}

	/// Creates an aggregate from built datasets.
	pub fn from_datasets<I>(kind: AggregateKind, datasets: I) -> DataSetResult<Self>
	where
		I: IntoIterator<Item = Arc<DataSet>>,
	{
		let mut aggregate = Self::empty(kind);
		for dataset in datasets {
			aggregate.add(&dataset)?;
		}
		Ok(aggregate)
	}

	/// Builds every definition and collects the results.
	pub fn from_defs(kind: AggregateKind, defs: &[Arc<DataSetDef>]) -> DataSetResult<Self> {
		match kind {
			AggregateKind::SuperSet => SuperSet::from_defs(defs).map(Self::SuperSet),
			AggregateKind::Merged => MergedSuperSet::from_defs(defs).map(Self::Merged),
		}
	}

	/// Kind of this aggregate.
	pub fn kind(&self) -> AggregateKind {
		match self {
			Self::SuperSet(_) => AggregateKind::SuperSet,
			Self::Merged(_) => AggregateKind::Merged,
		}
	}

	/// Adds a top-level dataset and everything it references.
	pub fn add(&mut self, dataset: &Arc<DataSet>) -> DataSetResult<()> {
		match self {
			Self::SuperSet(superset) => {
				superset.add(dataset);
				Ok(())
			}
			Self::Merged(merged) => merged.add(dataset),
		}
	}

	/// Dataset bookkeeping.
	pub fn datasets(&self) -> &DataSetContainer {
		match self {
			Self::SuperSet(superset) => superset.datasets(),
			Self::Merged(merged) => merged.datasets(),
		}
	}

	/// Iterates top-level datasets in the order first added.
	pub fn iter(&self) -> std::slice::Iter<'_, Arc<DataSet>> {
		self.datasets().iter()
	}

	/// Looks up a dataset, top-level or reference-only, by key.
	pub fn dataset(&self, key: &str) -> Option<&Arc<DataSet>> {
		self.datasets().get(key)
	}

	/// Finds a row by key.
	///
	/// A merged set answers from its shared namespace. A plain set searches its
	/// datasets in registration order.
	pub fn row(&self, key: &str) -> DataSetResult<&DataRow> {
		match self {
			Self::Merged(merged) => merged.get_item(key),
			Self::SuperSet(superset) => superset
				.entries()
				.find_map(|(_, dataset)| dataset.get(key))
				.map(Arc::as_ref)
				.ok_or_else(|| DataSetError::MissingKey {
					container: "SuperSet".to_string(),
					key: key.to_string(),
				}),
		}
	}

	/// Returns true if an instance of the definition is registered.
	pub fn contains_def(&self, id: DefId) -> bool {
		self.datasets().contains_def(id)
	}

	/// Returns the inner [`SuperSet`], if that is the kind.
	pub fn as_superset(&self) -> Option<&SuperSet> {
		match self {
			Self::SuperSet(superset) => Some(superset),
			Self::Merged(_) => None,
		}
	}

	/// Returns the inner [`MergedSuperSet`], if that is the kind.
	pub fn as_merged(&self) -> Option<&MergedSuperSet> {
		match self {
			Self::Merged(merged) => Some(merged),
			Self::SuperSet(_) => None,
		}
	}

	/// Number of top-level datasets.
	pub fn len(&self) -> usize {
		self.datasets().len()
	}

	/// Returns true if no top-level dataset is registered.
	pub fn is_empty(&self) -> bool {
		self.datasets().is_empty()
	}
}

impl From<SuperSet> for Aggregate {
	fn from(superset: SuperSet) -> Self {
		Self::SuperSet(superset)
	}
}

impl From<MergedSuperSet> for Aggregate {
	fn from(merged: MergedSuperSet) -> Self {
		Self::Merged(merged)
	}
}

impl<'a> IntoIterator for &'a Aggregate {
	type Item = &'a Arc<DataSet>;
	type IntoIter = std::slice::Iter<'a, Arc<DataSet>>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
