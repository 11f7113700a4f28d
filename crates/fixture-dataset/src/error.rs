//! Error types for dataset construction.
//!
//! Every error is raised synchronously while a dataset or an aggregate is being
//! built. Nothing here is recoverable in place: a malformed fixture fails before
//! any loader touches a backing store.

use thiserror::Error;

/// Errors that can occur while declaring, building, or aggregating datasets.
#[derive(Debug, Error)]
pub enum DataSetError {
	/// A dataset produced no rows.
	#[error("cannot create an empty DataSet: {0}")]
	EmptyDataSet(String),

	/// Two datasets contributed the same row key to a merged namespace.
	#[error("cannot add key '{key}' for {dataset} because it was already added by {existing}")]
	KeyCollision {
		/// Row key both datasets declare.
		key: String,
		/// Dataset being added.
		dataset: String,
		/// Dataset that registered the key first.
		existing: String,
	},

	/// A dataset tried to set a key that is already one of its attributes.
	#[error("{dataset} cannot redeclare key '{key}' (this is already an attribute)")]
	Redeclaration {
		/// Dataset (or `dataset.row`) doing the redeclaration.
		dataset: String,
		/// Offending key.
		key: String,
	},

	/// Indexed lookup of an undeclared key.
	#[error("{container} has no key '{key}'")]
	MissingKey {
		/// Container the lookup ran against.
		container: String,
		/// Key that was requested.
		key: String,
	},

	/// Attribute lookup of an undeclared name.
	#[error("{container} has no attribute '{name}'")]
	MissingAttribute {
		/// Container the lookup ran against.
		container: String,
		/// Attribute that was requested.
		name: String,
	},

	/// Attribute lookup of a name reserved for internal bookkeeping.
	#[error("'{0}' is reserved for internal bookkeeping and never resolves to data")]
	ReservedAttribute(String),

	/// A dataset name could not be resolved against the registry.
	#[error("Unknown dataset: {0}")]
	UnknownDataSet(String),

	/// A reference expression is malformed or points at something that is not a value.
	#[error("Invalid reference '{reference}': {message}")]
	InvalidReference {
		/// Reference as written.
		reference: String,
		/// What is wrong with it.
		message: String,
	},

	/// Error parsing a data-literal document.
	#[error("Parse error: {0}")]
	Parse(String),

	/// Unsupported document file extension.
	#[error("Unsupported file extension: {0}")]
	UnsupportedExtension(String),

	/// Document file not found.
	#[error("Document file not found: {0}")]
	FileNotFound(String),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// YAML serialization/deserialization error (when yaml feature is enabled).
	#[cfg(feature = "yaml")]
	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for dataset operations.
pub type DataSetResult<T> = Result<T, DataSetError>;
