//! Convenience re-exports for common usage.

// Error types
pub use crate::error::{LoadError, LoadResult};

// Medium contract and lookup
pub use crate::env::{Env, MediumMap, MediumRegistry, register_medium};
pub use crate::medium::{StorageMedium, StoredObject};

// Loading
pub use crate::loader::{FixtureData, LoadOptions, LoadableFixture};
pub use crate::style::NameStyle;

// In-memory medium
pub use crate::memory::{Journal, MemoryMedium};

// Record export
pub use crate::records::{FixtureRecord, RecordSerializer, to_records};
