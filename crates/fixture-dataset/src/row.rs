//! Rows: one named record of column to value data.

use serde_json::{Map, Value};

use crate::container::{DataContainer, Iter};
use crate::error::DataSetResult;

/// Names a row keeps for its own bookkeeping; columns may not use them.
pub const ROW_RESERVED: &[&str] = &["meta", "Meta", "ref", "get", "items", "iteritems"];

/// Ordered column data as produced by a build, before it is wrapped in a row.
pub type RowData = Vec<(String, Value)>;

/// A key/attribute accessible record.
///
/// ```
/// use fixture_dataset::DataRow;
/// use serde_json::json;
///
/// let row = DataRow::new([("color", json!("blue"))]);
/// assert_eq!(row.attr("color").unwrap(), &json!("blue"));
/// assert_eq!(row.get_item("color").unwrap(), &json!("blue"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
	columns: DataContainer<Value>,
}

impl DataRow {
	/// Creates a row from `(column, value)` pairs in order.
	pub fn new<K, I>(columns: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, Value)>,
	{
		Self {
			columns: DataContainer::from_pairs("DataRow", ROW_RESERVED, columns),
		}
	}

	/// Returns true if the column exists.
	pub fn contains(&self, column: &str) -> bool {
		self.columns.contains(column)
	}

	/// Indexed lookup of a column.
	pub fn get_item(&self, column: &str) -> DataSetResult<&Value> {
		self.columns.get_item(column)
	}

	/// Attribute-style lookup of a column.
	pub fn attr(&self, column: &str) -> DataSetResult<&Value> {
		self.columns.attr(column)
	}

	/// Column lookup returning `None` when absent.
	pub fn get(&self, column: &str) -> Option<&Value> {
		self.columns.get(column)
	}

	/// Column lookup falling back to `default`.
	pub fn get_or<'a>(&'a self, column: &str, default: &'a Value) -> &'a Value {
		self.columns.get_or(column, default)
	}

	/// Column names in declaration order.
	pub fn columns(&self) -> &[String] {
		self.columns.keys()
	}

	/// Iterates `(column, value)` pairs in declaration order.
	pub fn items(&self) -> Iter<'_, Value> {
		self.columns.iter()
	}

	/// Number of columns.
	pub fn len(&self) -> usize {
		self.columns.len()
	}

	/// Returns true if the row has no columns.
	pub fn is_empty(&self) -> bool {
		self.columns.is_empty()
	}

	/// Sets a column value. Used by row factories to adjust a row before it is stored.
	pub fn set(&mut self, column: impl Into<String>, value: Value) {
		self.columns.set_data(column, value);
	}

	/// Converts the row into a JSON object with columns in declaration order.
	pub fn to_json(&self) -> Value {
		let mut object = Map::new();
		for (column, value) in self.items() {
			object.insert(column.to_string(), value.clone());
		}
		Value::Object(object)
	}
}

impl From<RowData> for DataRow {
	fn from(data: RowData) -> Self {
		Self::new(data)
	}
}

impl<'a> IntoIterator for &'a DataRow {
	type Item = (&'a str, &'a Value);
	type IntoIter = Iter<'a, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.items()
	}
}
