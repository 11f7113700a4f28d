//! Second pass: turning dataset specs into definitions.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use super::{DataSetDocument, DataSetSpec};
use crate::definition::{DataSetDef, RowDecl};
use crate::error::{DataSetError, DataSetResult};
use crate::reference::ColumnValue;
use crate::registry::DataSetRegistry;

/// Key marking a column value as a symbolic reference.
pub const REF_KEY: &str = "$ref";

/// A parsed `Dataset.row[.column]` reference expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicRef {
	/// Referenced dataset name.
	pub dataset: String,
	/// Referenced row name.
	pub row: String,
	/// Referenced column; `None` for a bare reference.
	pub column: Option<String>,
}

impl SymbolicRef {
	/// Recognizes `{"$ref": "..."}`. Any other value is not a reference.
	pub fn from_value(value: &Value) -> Option<DataSetResult<Self>> {
		let object = value.as_object()?;
		if object.len() != 1 {
			return None;
		}
		let target = object.get(REF_KEY)?;
		Some(match target.as_str() {
			Some(expression) => expression.parse(),
			None => Err(DataSetError::InvalidReference {
				reference: target.to_string(),
				message: "reference must be a string".to_string(),
			}),
		})
	}

	/// Resolves against registered definitions.
	pub fn resolve(&self, registry: &DataSetRegistry) -> DataSetResult<ColumnValue> {
		let def = registry.get(&self.dataset)?;
		let reference = def.row_ref(&self.row)?;
		match &self.column {
			Some(column) => Ok(ColumnValue::RefValue(reference.value(column)?)),
			None => Ok(ColumnValue::Ref(reference)),
		}
	}
}

impl FromStr for SymbolicRef {
	type Err = DataSetError;

	fn from_str(expression: &str) -> Result<Self, Self::Err> {
		let parts: Vec<&str> = expression.split('.').collect();
		if parts.iter().any(|part| part.is_empty()) {
			return Err(DataSetError::InvalidReference {
				reference: expression.to_string(),
				message: "empty path segment".to_string(),
			});
		}
		match parts.as_slice() {
			[dataset, row] => Ok(Self {
				dataset: dataset.to_string(),
				row: row.to_string(),
				column: None,
			}),
			[dataset, row, column] => Ok(Self {
				dataset: dataset.to_string(),
				row: row.to_string(),
				column: Some(column.to_string()),
			}),
			_ => Err(DataSetError::InvalidReference {
				reference: expression.to_string(),
				message: "expected 'Dataset.row' or 'Dataset.row.column'".to_string(),
			}),
		}
	}
}

impl DataSetSpec {
	/// Builds a definition, resolving references against `registry`.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::UnknownDataSet`] for a reference to a dataset
	/// that is not registered yet, and any error from resolving a reference.
	pub fn to_def(&self, registry: &DataSetRegistry) -> DataSetResult<Arc<DataSetDef>> {
		let mut builder = DataSetDef::builder(&self.name);
		let meta = &self.meta;
		if let Some(storage) = &meta.storage {
			builder = builder.storage(storage);
		}
		if let Some(medium) = &meta.storage_medium {
			builder = builder.storage_medium(medium);
		}
		if let Some(kind) = meta.refclass {
			builder = builder.refclass(kind);
		}
		let mut references = Vec::with_capacity(meta.references.len());
		for name in &meta.references {
			references.push(Arc::clone(registry.get(name)?));
		}
		builder = builder.references(references);
		for (key, value) in &meta.options {
			builder = builder.option(key, value.clone());
		}

		for (row, columns) in &self.rows {
			let columns = columns.as_object().ok_or_else(|| {
				DataSetError::Parse(format!("Row '{}.{}' must be an object of columns", self.name, row))
			})?;
			let mut decl = RowDecl::new(row);
			for (column, value) in columns {
				let value = match SymbolicRef::from_value(value) {
					Some(symbolic) => symbolic?.resolve(registry)?,
					None => ColumnValue::Value(value.clone()),
				};
				decl = decl.set(column, value);
			}
			builder = builder.declaration(decl);
		}
		Ok(builder.build())
	}
}

impl DataSetDocument {
	/// Resolves every spec in order and registers the result.
	///
	/// Returns the new definitions in document order.
	pub fn resolve(&self, registry: &mut DataSetRegistry) -> DataSetResult<Vec<Arc<DataSetDef>>> {
		let mut defs = Vec::with_capacity(self.datasets.len());
		for spec in &self.datasets {
			let def = spec.to_def(registry)?;
			defs.push(registry.register(def)?);
		}
		Ok(defs)
	}
}
