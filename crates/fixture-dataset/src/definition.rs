//! Dataset definitions: the declared shape of a dataset before it is built.
//!
//! A [`DataSetDef`] plays the part of a dataset "class": an immutable,
//! ordered list of row declarations plus [`Meta`] configuration. Definitions
//! are shared as `Arc<DataSetDef>` so that references ([`Ref`]) can point at
//! them and so that building can identify them by [`DefId`].
//!
//! ```
//! use fixture_dataset::DataSetDef;
//!
//! let category = DataSetDef::builder("CategoryData")
//!     .row("cars", |r| r.set("name", "cars"))
//!     .row("free_stuff", |r| r.set("name", "get free stuff"))
//!     .build();
//!
//! let cars_name = category.row_ref("cars")?.value("name")?;
//! let product = DataSetDef::builder("ProductData")
//!     .row("truck", |r| r.set("name", "truck").set("category", cars_name))
//!     .build();
//! assert_eq!(product.meta().references.len(), 0);
//! # Ok::<(), fixture_dataset::DataSetError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::error::{DataSetError, DataSetResult};
use crate::reference::{ColumnValue, Ref};
use crate::row::{DataRow, RowData};
use crate::superset::{Aggregate, AggregateKind};

/// Name of the configuration scope, which never counts as a row declaration.
pub const META_SCOPE: &str = "Meta";

static NEXT_DEF_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a dataset definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(u64);

impl DefId {
	fn next() -> Self {
		Self(NEXT_DEF_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// Hook that adjusts each row after it is assembled and before it is stored.
pub type RowFactory = Arc<dyn Fn(DataRow) -> DataRow + Send + Sync>;

/// Explicit data provider replacing row declarations.
///
/// It receives the dataset's reference aggregate, which is already populated
/// when references were declared up front.
pub type DataProvider = Arc<dyn Fn(&Aggregate) -> DataSetResult<Vec<(String, RowData)>> + Send + Sync>;

/// Per-dataset configuration.
///
/// `storage`, `storage_medium` and `options` are opaque here and carried
/// through unmodified for whatever loader interprets them.
#[derive(Clone, Default)]
pub struct Meta {
	/// Storage target name, e.g. the table or model the rows map to.
	pub storage: Option<String>,
	/// Name of a specific storage medium to use.
	pub storage_medium: Option<String>,
	/// Aggregate kind used for this dataset's references.
	pub refclass: Option<AggregateKind>,
	/// References declared up front.
	pub references: Vec<Arc<DataSetDef>>,
	/// Row hook; rows are stored unchanged when absent.
	pub row: Option<RowFactory>,
	/// Free-form loader options.
	pub options: BTreeMap<String, Value>,
}

impl fmt::Debug for Meta {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Meta")
			.field("storage", &self.storage)
			.field("storage_medium", &self.storage_medium)
			.field("refclass", &self.refclass)
			.field(
				"references",
				&self.references.iter().map(|d| d.name()).collect::<Vec<_>>(),
			)
			.field("row", &self.row.as_ref().map(|_| "<row factory>"))
			.field("options", &self.options)
			.finish()
	}
}

/// One declared row: a name plus ordered column declarations.
#[derive(Debug, Clone)]
pub struct RowDecl {
	name: String,
	columns: Vec<(String, ColumnValue)>,
}

impl RowDecl {
	/// Creates an empty row declaration.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			columns: Vec::new(),
		}
	}

	/// Declares a column. Re-declaring a column replaces its value in place.
	pub fn set(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
		let column = column.into();
		let value = value.into();
		match self.columns.iter_mut().find(|(name, _)| *name == column) {
			Some(slot) => slot.1 = value,
			None => self.columns.push((column, value)),
		}
		self
	}

	/// Declares a bare reference, kept as metadata and skipped when rows are built.
	pub fn set_ref(self, column: impl Into<String>, reference: Ref) -> Self {
		self.set(column, ColumnValue::Ref(reference))
	}

	/// Row name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Declared columns in order.
	pub fn columns(&self) -> &[(String, ColumnValue)] {
		&self.columns
	}

	/// Looks up a declared column.
	pub fn column(&self, name: &str) -> Option<&ColumnValue> {
		self.columns
			.iter()
			.find(|(column, _)| column == name)
			.map(|(_, value)| value)
	}

	/// Returns true if the declaration qualifies as a row.
	pub fn is_row(&self) -> bool {
		!self.name.starts_with('_') && self.name != META_SCOPE
	}
}

/// Declared shape of a dataset.
pub struct DataSetDef {
	id: DefId,
	name: String,
	rows: Vec<RowDecl>,
	meta: Meta,
	provider: Option<DataProvider>,
}

impl DataSetDef {
	/// Starts a new definition.
	pub fn builder(name: impl Into<String>) -> DataSetDefBuilder {
		DataSetDefBuilder::new(name)
	}

	/// Identity of this definition.
	pub fn id(&self) -> DefId {
		self.id
	}

	/// Definition name, also the key datasets are registered under.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// All row declarations, including ones that do not qualify as rows.
	pub fn declarations(&self) -> &[RowDecl] {
		&self.rows
	}

	/// Row declarations that qualify as rows, in declaration order.
	pub fn rows(&self) -> impl Iterator<Item = &RowDecl> {
		self.rows.iter().filter(|decl| decl.is_row())
	}

	/// Looks up a qualifying row declaration by name.
	pub fn row(&self, name: &str) -> Option<&RowDecl> {
		self.rows().find(|decl| decl.name() == name)
	}

	/// Configuration.
	pub fn meta(&self) -> &Meta {
		&self.meta
	}

	/// Explicit data provider, if any.
	pub fn provider(&self) -> Option<&DataProvider> {
		self.provider.as_ref()
	}

	/// Returns a reference bound to the named row declaration.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::MissingAttribute`] if no such row is declared.
	pub fn row_ref(self: &Arc<Self>, row: &str) -> DataSetResult<Ref> {
		if self.row(row).is_none() {
			return Err(DataSetError::MissingAttribute {
				container: self.name.clone(),
				name: row.to_string(),
			});
		}
		Ok(Ref::new(Arc::clone(self), row))
	}
}

impl fmt::Debug for DataSetDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DataSetDef")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("rows", &self.rows)
			.field("meta", &self.meta)
			.field("provider", &self.provider.as_ref().map(|_| "<data provider>"))
			.finish()
	}
}

/// Builder for [`DataSetDef`].
pub struct DataSetDefBuilder {
	name: String,
	rows: Vec<RowDecl>,
	meta: Meta,
	provider: Option<DataProvider>,
}

impl DataSetDefBuilder {
	fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			rows: Vec::new(),
			meta: Meta::default(),
			provider: None,
		}
	}

	/// Declares a row. Re-declaring a row name replaces the earlier declaration in place.
	pub fn row<F>(self, name: impl Into<String>, declare: F) -> Self
	where
		F: FnOnce(RowDecl) -> RowDecl,
	{
		let declaration = declare(RowDecl::new(name));
		self.declaration(declaration)
	}

	/// Adds a prepared row declaration.
	pub fn declaration(mut self, declaration: RowDecl) -> Self {
		match self
			.rows
			.iter_mut()
			.find(|existing| existing.name() == declaration.name())
		{
			Some(slot) => *slot = declaration,
			None => self.rows.push(declaration),
		}
		self
	}

	/// Replaces the whole configuration.
	pub fn meta(mut self, meta: Meta) -> Self {
		self.meta = meta;
		self
	}

	/// Sets the storage target name.
	pub fn storage(mut self, storage: impl Into<String>) -> Self {
		self.meta.storage = Some(storage.into());
		self
	}

	/// Sets the storage medium name.
	pub fn storage_medium(mut self, medium: impl Into<String>) -> Self {
		self.meta.storage_medium = Some(medium.into());
		self
	}

	/// Sets the aggregate kind used for this dataset's references.
	pub fn refclass(mut self, kind: AggregateKind) -> Self {
		self.meta.refclass = Some(kind);
		self
	}

	/// Declares references up front.
	pub fn references<I>(mut self, references: I) -> Self
	where
		I: IntoIterator<Item = Arc<DataSetDef>>,
	{
		self.meta.references.extend(references);
		self
	}

	/// Sets the row hook.
	pub fn row_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(DataRow) -> DataRow + Send + Sync + 'static,
	{
		self.meta.row = Some(Arc::new(factory));
		self
	}

	/// Sets a free-form option.
	pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.meta.options.insert(key.into(), value.into());
		self
	}

	/// Supplies rows through a provider instead of declarations.
	pub fn data<F>(mut self, provider: F) -> Self
	where
		F: Fn(&Aggregate) -> DataSetResult<Vec<(String, RowData)>> + Send + Sync + 'static,
	{
		self.provider = Some(Arc::new(provider));
		self
	}

	/// Finishes the definition.
	pub fn build(self) -> Arc<DataSetDef> {
		Arc::new(DataSetDef {
			id: DefId::next(),
			name: self.name,
			rows: self.rows,
			meta: self.meta,
			provider: self.provider,
		})
	}
}
