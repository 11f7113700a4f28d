//! Export of datasets as model records.
//!
//! Each row becomes one `{"model", "pk", "fields"}` record, where `model` is
//! the dataset's storage name and `pk` is the row key. Records come out in
//! load order, so a record file can be replayed top to bottom.

use std::path::Path;

use fixture_dataset::Aggregate;
use fixture_dataset::literal::DocumentFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LoadError, LoadResult};
use crate::loader::load_order;
use crate::style::NameStyle;

/// One exported row.
///
/// ```json
/// {
///   "model": "Product",
///   "pk": "truck",
///   "fields": {"name": "truck", "category": "cars"}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureRecord {
	/// Storage name of the dataset the row belongs to.
	pub model: String,

	/// Row key.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pk: Option<Value>,

	/// Column values as a JSON object.
	pub fields: Value,
}

impl FixtureRecord {
	/// Creates a record with a primary key.
	pub fn with_pk(model: impl Into<String>, pk: Value, fields: Value) -> Self {
		Self {
			model: model.into(),
			pk: Some(pk),
			fields,
		}
	}
}

/// Converts every row of `aggregate` into a record, references first.
///
/// Storage names come from `Meta.storage`, falling back to `style`.
pub fn to_records(aggregate: &Aggregate, style: &NameStyle) -> Vec<FixtureRecord> {
	let mut records = Vec::new();
	for dataset in load_order(aggregate) {
		let model = match dataset.storage() {
			Some(storage) => storage.to_string(),
			None => style.storable_name(dataset.name()),
		};
		for (key, row) in dataset.iter() {
			records.push(FixtureRecord::with_pk(
				model.clone(),
				Value::String(key.to_string()),
				row.to_json(),
			));
		}
	}
	tracing::debug!(records = records.len(), "exported records");
	records
}

/// Writes records as JSON or YAML.
#[derive(Debug, Clone)]
pub struct RecordSerializer {
	format: DocumentFormat,
	indent: usize,
}

impl RecordSerializer {
	/// Creates a serializer writing pretty JSON.
	pub fn new() -> Self {
		Self {
			format: DocumentFormat::Json,
			indent: 2,
		}
	}

	/// Sets the output format.
	pub fn with_format(mut self, format: DocumentFormat) -> Self {
		self.format = format;
		self
	}

	/// Sets the indentation; zero writes compact JSON.
	pub fn with_indent(mut self, indent: usize) -> Self {
		self.indent = indent;
		self
	}

	/// Serializes records to a string.
	pub fn serialize(&self, records: &[FixtureRecord]) -> LoadResult<String> {
		match self.format {
			DocumentFormat::Json => self.serialize_json(records),
			DocumentFormat::Yaml => self.serialize_yaml(records),
		}
	}

	fn serialize_json(&self, records: &[FixtureRecord]) -> LoadResult<String> {
		if self.indent > 0 {
			serde_json::to_string_pretty(records).map_err(|e| LoadError::Serialization(e.to_string()))
		} else {
			serde_json::to_string(records).map_err(|e| LoadError::Serialization(e.to_string()))
		}
	}

	#[cfg(feature = "yaml")]
	fn serialize_yaml(&self, records: &[FixtureRecord]) -> LoadResult<String> {
		serde_yaml::to_string(records).map_err(|e| LoadError::Serialization(e.to_string()))
	}

	#[cfg(not(feature = "yaml"))]
	fn serialize_yaml(&self, _records: &[FixtureRecord]) -> LoadResult<String> {
		Err(LoadError::UnsupportedExtension(
			"YAML support requires the 'yaml' feature".to_string(),
		))
	}

	/// Writes serialized records to a file.
	pub fn write_to_file(&self, records: &[FixtureRecord], path: &Path) -> LoadResult<()> {
		let content = self.serialize(records)?;
		std::fs::write(path, content)?;
		Ok(())
	}

	/// Configured output format.
	pub fn format(&self) -> DocumentFormat {
		self.format
	}

	/// Configured indentation.
	pub fn indent(&self) -> usize {
		self.indent
	}
}

impl Default for RecordSerializer {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fixture_dataset::{AggregateKind, DataSetDef};
	use rstest::{fixture, rstest};
	use serde_json::json;
	use tempfile::tempdir;

	#[fixture]
	fn aggregate() -> Aggregate {
		let category = DataSetDef::builder("CategoryData")
			.row("cars", |r| r.set("name", "cars"))
			.build();
		let cars = category.row_ref("cars").unwrap().value("name").unwrap();
		let product = DataSetDef::builder("ProductData")
			.storage("Product")
			.row("truck", |r| r.set("name", "truck").set("category", cars))
			.build();
		Aggregate::from_defs(AggregateKind::SuperSet, &[product]).unwrap()
	}

	#[rstest]
	fn test_records_in_load_order(aggregate: Aggregate) {
		let records = to_records(&aggregate, &NameStyle::named_data());
		assert_eq!(
			records,
			vec![
				FixtureRecord::with_pk("Category", json!("cars"), json!({"name": "cars"})),
				FixtureRecord::with_pk(
					"Product",
					json!("truck"),
					json!({"name": "truck", "category": "cars"})
				),
			]
		);
	}

	#[rstest]
	fn test_serialize_json_pretty(aggregate: Aggregate) {
		let records = to_records(&aggregate, &NameStyle::Original);
		let output = RecordSerializer::new().serialize(&records).unwrap();
		assert!(output.contains("\"model\": \"CategoryData\""));
		assert!(output.contains('\n'));
	}

	#[rstest]
	fn test_serialize_json_compact(aggregate: Aggregate) {
		let records = to_records(&aggregate, &NameStyle::Original);
		let output = RecordSerializer::new().with_indent(0).serialize(&records).unwrap();
		assert!(!output.contains('\n'));
		// column order survives serialization
		assert!(output.contains(r#""fields":{"name":"truck","category":"cars"}"#));
	}

	#[rstest]
	fn test_write_to_file(aggregate: Aggregate) {
		let dir = tempdir().unwrap();
		let path = dir.path().join("records.json");
		let records = to_records(&aggregate, &NameStyle::Original);

		RecordSerializer::new().write_to_file(&records, &path).unwrap();

		let content = std::fs::read_to_string(&path).unwrap();
		let parsed: Vec<FixtureRecord> = serde_json::from_str(&content).unwrap();
		assert_eq!(parsed, records);
	}

	#[cfg(not(feature = "yaml"))]
	#[rstest]
	fn test_yaml_requires_feature() {
		let result = RecordSerializer::new()
			.with_format(DocumentFormat::Yaml)
			.serialize(&[]);
		assert!(matches!(result, Err(LoadError::UnsupportedExtension(_))));
	}

	#[cfg(feature = "yaml")]
	#[rstest]
	fn test_serialize_yaml(aggregate: Aggregate) {
		let records = to_records(&aggregate, &NameStyle::Original);
		let output = RecordSerializer::new()
			.with_format(DocumentFormat::Yaml)
			.serialize(&records)
			.unwrap();
		assert!(output.contains("model: CategoryData"));
	}
}
