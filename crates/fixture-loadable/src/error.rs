//! Error types for loading and unloading datasets.

use fixture_dataset::DataSetError;
use thiserror::Error;

/// Errors that can occur while loading, unloading, or exporting datasets.
#[derive(Debug, Error)]
pub enum LoadError {
	/// A dataset could not be built or aggregated.
	#[error(transparent)]
	DataSet(#[from] DataSetError),

	/// No storage medium is known under the given name.
	#[error("Storage medium lookup failed: {0}")]
	Lookup(String),

	/// A storage medium rejected a save or clear.
	#[error("Storage error in {storage}: {message}")]
	Storage {
		/// Storage target the operation ran against.
		storage: String,
		/// What went wrong.
		message: String,
	},

	/// Teardown was requested for data that was never set up.
	#[error("Nothing loaded: {0}")]
	NotLoaded(String),

	/// Error serializing records.
	#[error("Serialization error: {0}")]
	Serialization(String),

	/// Unsupported output format.
	#[error("Unsupported file extension: {0}")]
	UnsupportedExtension(String),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl LoadError {
	/// Shorthand for a [`LoadError::Storage`].
	pub fn storage(storage: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Storage {
			storage: storage.into(),
			message: message.into(),
		}
	}
}

/// Result type alias for load operations.
pub type LoadResult<T> = Result<T, LoadError>;
