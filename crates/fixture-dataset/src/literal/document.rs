//! Document shapes and formats.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::superset::AggregateKind;

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DocumentFormat {
	/// JSON (default).
	#[default]
	Json,

	/// YAML (requires the `yaml` feature).
	Yaml,
}

impl DocumentFormat {
	/// Determines the format from a file extension.
	///
	/// ```
	/// # use fixture_dataset::literal::DocumentFormat;
	/// assert_eq!(DocumentFormat::from_extension("json"), Some(DocumentFormat::Json));
	/// assert_eq!(DocumentFormat::from_extension("yml"), Some(DocumentFormat::Yaml));
	/// assert_eq!(DocumentFormat::from_extension("toml"), None);
	/// ```
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_lowercase().as_str() {
			"json" => Some(Self::Json),
			"yaml" | "yml" => Some(Self::Yaml),
			_ => None,
		}
	}

	/// Determines the format from a file path.
	pub fn from_path(path: &Path) -> Option<Self> {
		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(Self::from_extension)
	}

	/// Default file extension for this format.
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Json => "json",
			Self::Yaml => "yaml",
		}
	}
}

impl std::fmt::Display for DocumentFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Json => write!(f, "JSON"),
			Self::Yaml => write!(f, "YAML"),
		}
	}
}

/// Configuration of one declared dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaSpec {
	/// Storage target name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub storage: Option<String>,

	/// Storage medium name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub storage_medium: Option<String>,

	/// Aggregate kind for the dataset's references.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refclass: Option<AggregateKind>,

	/// Names of datasets referenced up front.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub references: Vec<String>,

	/// Any other key, carried through as a free-form option.
	#[serde(flatten)]
	pub options: BTreeMap<String, Value>,
}

/// One declared dataset: a name, configuration, and rows in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSetSpec {
	/// Dataset name.
	pub name: String,

	/// Configuration.
	#[serde(default)]
	pub meta: MetaSpec,

	/// Rows keyed by row name; each row maps column names to values.
	pub rows: Map<String, Value>,
}

impl DataSetSpec {
	/// Creates a spec with no rows.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			meta: MetaSpec::default(),
			rows: Map::new(),
		}
	}

	/// Number of declared rows.
	pub fn len(&self) -> usize {
		self.rows.len()
	}

	/// Returns true if no rows are declared.
	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}
}

/// Parsed document holding dataset specs in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSetDocument {
	/// Dataset specs.
	pub datasets: Vec<DataSetSpec>,

	/// Format the document was parsed from.
	#[serde(skip)]
	pub format: DocumentFormat,

	/// Source file path, if parsed from a file.
	#[serde(skip)]
	pub source: Option<String>,
}

impl DataSetDocument {
	/// Creates a document from specs.
	pub fn new(datasets: Vec<DataSetSpec>, format: DocumentFormat) -> Self {
		Self {
			datasets,
			format,
			source: None,
		}
	}

	/// Sets the source file path.
	pub fn with_source(mut self, source: impl Into<String>) -> Self {
		self.source = Some(source.into());
		self
	}

	/// Number of dataset specs.
	pub fn len(&self) -> usize {
		self.datasets.len()
	}

	/// Returns true if there are no dataset specs.
	pub fn is_empty(&self) -> bool {
		self.datasets.is_empty()
	}

	/// Iterates dataset specs in order.
	pub fn iter(&self) -> std::slice::Iter<'_, DataSetSpec> {
		self.datasets.iter()
	}
}

impl<'a> IntoIterator for &'a DataSetDocument {
	type Item = &'a DataSetSpec;
	type IntoIter = std::slice::Iter<'a, DataSetSpec>;

	fn into_iter(self) -> Self::IntoIter {
		self.datasets.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use std::path::PathBuf;

	#[rstest]
	#[case("data.json", Some(DocumentFormat::Json))]
	#[case("data.JSON", Some(DocumentFormat::Json))]
	#[case("data.yaml", Some(DocumentFormat::Yaml))]
	#[case("data.yml", Some(DocumentFormat::Yaml))]
	#[case("data.xml", None)]
	#[case("no_extension", None)]
	fn test_format_from_path(#[case] path: &str, #[case] expected: Option<DocumentFormat>) {
		assert_eq!(DocumentFormat::from_path(&PathBuf::from(path)), expected);
	}

	#[rstest]
	fn test_meta_spec_collects_unknown_keys_as_options() {
		let meta: MetaSpec = serde_json::from_value(json!({
			"storage": "Category",
			"refclass": "MergedSuperSet",
			"references": ["ColorData"],
			"schema": "shop"
		}))
		.unwrap();

		assert_eq!(meta.storage.as_deref(), Some("Category"));
		assert_eq!(meta.refclass, Some(AggregateKind::Merged));
		assert_eq!(meta.references, vec!["ColorData".to_string()]);
		assert_eq!(meta.options.get("schema"), Some(&json!("shop")));
		assert!(!meta.options.contains_key("storage"));
	}

	#[rstest]
	fn test_spec_rows_keep_document_order() {
		let spec: DataSetSpec = serde_json::from_str(
			r#"{"name": "FlowerData", "rows": {"violets": {"color": "blue"}, "roses": {"color": "red"}, "daisies": {"color": "white"}}}"#,
		)
		.unwrap();
		let rows: Vec<&str> = spec.rows.keys().map(String::as_str).collect();
		assert_eq!(rows, vec!["violets", "roses", "daisies"]);
		assert_eq!(spec.meta, MetaSpec::default());
	}
}
