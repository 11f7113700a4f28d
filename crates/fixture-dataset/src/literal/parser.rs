//! Parsing of data-literal documents in JSON and YAML.

use std::path::Path;

use serde_json::Value;

use super::{DataSetDocument, DataSetSpec, DocumentFormat};
use crate::error::{DataSetError, DataSetResult};

/// Parser for data-literal documents.
///
/// Accepts three layouts: `{"datasets": [...]}`, a bare array of dataset
/// specs, or a single dataset spec object.
#[derive(Debug, Default)]
pub struct DocumentParser;

impl DocumentParser {
	/// Creates a new parser.
	pub fn new() -> Self {
		Self
	}

	/// Parses a document file, detecting the format from its extension.
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - The file extension is not recognized
	/// - The file cannot be read
	/// - The content is not a valid document
	pub fn parse_file(&self, path: &Path) -> DataSetResult<DataSetDocument> {
		let format = DocumentFormat::from_path(path).ok_or_else(|| {
			DataSetError::UnsupportedExtension(
				path.extension()
					.and_then(|e| e.to_str())
					.unwrap_or("(none)")
					.to_string(),
			)
		})?;

		let content = std::fs::read_to_string(path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				DataSetError::FileNotFound(path.display().to_string())
			} else {
				DataSetError::Io(e)
			}
		})?;

		let document = self.parse_string(&content, format)?;
		tracing::debug!(
			path = %path.display(),
			datasets = document.len(),
			"parsed dataset document"
		);
		Ok(document.with_source(path.display().to_string()))
	}

	/// Parses a document from a string.
	pub fn parse_string(&self, content: &str, format: DocumentFormat) -> DataSetResult<DataSetDocument> {
		let value = match format {
			DocumentFormat::Json => serde_json::from_str(content)?,
			DocumentFormat::Yaml => self.parse_yaml(content)?,
		};
		let datasets = self.parse_value(value)?;
		Ok(DataSetDocument::new(datasets, format))
	}

	/// Parses several files into one document, keeping file order.
	pub fn parse_files(&self, paths: &[&Path]) -> DataSetResult<DataSetDocument> {
		let format = paths
			.first()
			.and_then(|p| DocumentFormat::from_path(p))
			.unwrap_or_default();

		let mut datasets = Vec::new();
		for path in paths {
			datasets.extend(self.parse_file(path)?.datasets);
		}
		Ok(DataSetDocument::new(datasets, format))
	}

	#[cfg(feature = "yaml")]
	fn parse_yaml(&self, content: &str) -> DataSetResult<Value> {
		Ok(serde_yaml::from_str(content)?)
	}

	#[cfg(not(feature = "yaml"))]
	fn parse_yaml(&self, _content: &str) -> DataSetResult<Value> {
		Err(DataSetError::UnsupportedExtension(
			"YAML support requires the 'yaml' feature".to_string(),
		))
	}

	fn parse_value(&self, value: Value) -> DataSetResult<Vec<DataSetSpec>> {
		let items = match value {
			Value::Object(mut object) if object.contains_key("datasets") => {
				match object.remove("datasets") {
					Some(Value::Array(items)) => items,
					_ => {
						return Err(DataSetError::Parse(
							"'datasets' must be an array".to_string(),
						));
					}
				}
			}
			Value::Object(object) => vec![Value::Object(object)],
			Value::Array(items) => items,
			_ => {
				return Err(DataSetError::Parse(
					"Expected a document object, an array, or a dataset object".to_string(),
				));
			}
		};

		let mut datasets = Vec::with_capacity(items.len());
		for (idx, item) in items.into_iter().enumerate() {
			let spec: DataSetSpec = serde_json::from_value(item).map_err(|e| {
				DataSetError::Parse(format!("Invalid dataset at index {}: {}", idx, e))
			})?;
			self.validate_spec(&spec)?;
			datasets.push(spec);
		}
		Ok(datasets)
	}

	/// Validates names and row shapes. Emptiness is left to the build.
	fn validate_spec(&self, spec: &DataSetSpec) -> DataSetResult<()> {
		if spec.name.is_empty() || spec.name.starts_with('_') {
			return Err(DataSetError::Parse(format!(
				"Dataset name '{}' must be non-empty and must not start with '_'",
				spec.name
			)));
		}
		for (row, columns) in &spec.rows {
			if !columns.is_object() {
				return Err(DataSetError::Parse(format!(
					"Row '{}.{}' must be an object of columns",
					spec.name, row
				)));
			}
		}
		Ok(())
	}
}
