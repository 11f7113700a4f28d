//! References from one dataset's row declarations to another's.
//!
//! A [`Ref`] binds a dataset definition to one of its row declarations.
//! Calling [`Ref::value`] looks the attribute up immediately and returns a
//! [`RefValue`] that carries the resolved value and remembers which
//! definition it came from, so the dataset holding it can record the
//! dependency when it is built.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::definition::DataSetDef;
use crate::error::{DataSetError, DataSetResult};

/// Value of a column in a row declaration.
#[derive(Debug, Clone)]
pub enum ColumnValue {
	/// Plain scalar or structured value.
	Value(Value),
	/// Bare reference. Metadata only: it is skipped when rows are built.
	Ref(Ref),
	/// Resolved reference to another dataset's row attribute.
	RefValue(RefValue),
}

impl ColumnValue {
	/// Returns the value this column contributes to a row, if any.
	pub fn resolved(&self) -> Option<&Value> {
		match self {
			Self::Value(value) => Some(value),
			Self::RefValue(ref_value) => Some(ref_value.value()),
			Self::Ref(_) => None,
		}
	}
}

impl From<Value> for ColumnValue {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

impl From<Ref> for ColumnValue {
	fn from(reference: Ref) -> Self {
		Self::Ref(reference)
	}
}

impl From<RefValue> for ColumnValue {
	fn from(ref_value: RefValue) -> Self {
		Self::RefValue(ref_value)
	}
}

macro_rules! column_value_from {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for ColumnValue {
				fn from(value: $ty) -> Self {
					Self::Value(Value::from(value))
				}
			}
		)*
	};
}

column_value_from!(&str, String, bool, i32, i64, u32, u64, f64);

/// A reference to a row declaration in a dataset definition.
#[derive(Clone)]
pub struct Ref {
	dataset: Arc<DataSetDef>,
	row: String,
}

impl Ref {
	pub(crate) fn new(dataset: Arc<DataSetDef>, row: impl Into<String>) -> Self {
		Self {
			dataset,
			row: row.into(),
		}
	}

	/// Definition the referenced row belongs to.
	pub fn dataset(&self) -> &Arc<DataSetDef> {
		&self.dataset
	}

	/// Name of the referenced row declaration.
	pub fn row(&self) -> &str {
		&self.row
	}

	/// Looks up `attr` on the referenced row declaration.
	///
	/// The lookup is immediate. An attribute that is itself a resolved
	/// reference yields that reference's value.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::MissingAttribute`] if the row does not declare
	/// `attr`, and [`DataSetError::InvalidReference`] if `attr` holds a bare
	/// reference rather than a value.
	pub fn value(&self, attr: &str) -> DataSetResult<RefValue> {
		let value = self.get_value(attr)?;
		Ok(RefValue {
			reference: self.clone(),
			attr: attr.to_string(),
			value,
		})
	}

	fn get_value(&self, attr: &str) -> DataSetResult<Value> {
		let declaration = self.dataset.row(&self.row).ok_or_else(|| DataSetError::MissingAttribute {
			container: self.dataset.name().to_string(),
			name: self.row.clone(),
		})?;
		let column = declaration
			.column(attr)
			.ok_or_else(|| DataSetError::MissingAttribute {
				container: format!("{}.{}", self.dataset.name(), self.row),
				name: attr.to_string(),
			})?;
		column.resolved().cloned().ok_or_else(|| DataSetError::InvalidReference {
			reference: format!("{}.{}.{}", self.dataset.name(), self.row, attr),
			message: "attribute is a bare reference, not a value".to_string(),
		})
	}
}

impl fmt::Debug for Ref {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<Ref to {}.{}>", self.dataset.name(), self.row)
	}
}

/// A reference resolved to one attribute of the referenced row.
#[derive(Clone)]
pub struct RefValue {
	reference: Ref,
	attr: String,
	value: Value,
}

impl RefValue {
	/// The reference this value was resolved through.
	pub fn reference(&self) -> &Ref {
		&self.reference
	}

	/// Definition that must be treated as a dependency.
	pub fn dataset(&self) -> &Arc<DataSetDef> {
		self.reference.dataset()
	}

	/// Attribute name that was looked up.
	pub fn attr(&self) -> &str {
		&self.attr
	}

	/// Resolved value.
	pub fn value(&self) -> &Value {
		&self.value
	}
}

impl fmt::Debug for RefValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"<RefValue {}.{}.{} = {}>",
			self.reference.dataset.name(),
			self.reference.row,
			self.attr,
			self.value
		)
	}
}
