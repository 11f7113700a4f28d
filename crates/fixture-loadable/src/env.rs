//! Environments: where the loader finds a storage medium by name.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::{LoadError, LoadResult};
use crate::medium::StorageMedium;

/// Separator between app label and model name in `app__Model` names.
pub const APP_MODEL_SPLIT: &str = "__";

/// Resolves storage names to media.
pub trait Env: Send + Sync {
	/// Returns the medium registered under `name`.
	///
	/// # Errors
	///
	/// Returns [`LoadError::Lookup`] if nothing matches.
	fn get(&self, name: &str) -> LoadResult<Arc<dyn StorageMedium>>;
}

/// Global registry for storage media.
static MEDIUM_REGISTRY: Lazy<RwLock<HashMap<String, Arc<dyn StorageMedium>>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a storage medium in the global registry under its own name.
///
/// ```
/// use fixture_loadable::{Env, MediumRegistry, MemoryMedium, register_medium};
///
/// register_medium(MemoryMedium::new("DocRegisteredProduct"));
/// assert!(MediumRegistry::new().get("DocRegisteredProduct").is_ok());
/// ```
pub fn register_medium<M: StorageMedium + 'static>(medium: M) {
	let name = medium.name().to_string();
	register_medium_as(name, Arc::new(medium));
}

/// Registers a shared storage medium in the global registry under `name`.
pub fn register_medium_as(name: impl Into<String>, medium: Arc<dyn StorageMedium>) {
	let name = name.into();
	tracing::debug!(medium = %name, "registered storage medium");
	MEDIUM_REGISTRY.write().insert(name, medium);
}

/// Handle to the global medium registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct MediumRegistry;

impl MediumRegistry {
	/// Creates a new registry handle.
	pub fn new() -> Self {
		Self
	}

	/// Checks if a medium is registered under `name`.
	pub fn has_medium(&self, name: &str) -> bool {
		MEDIUM_REGISTRY.read().contains_key(name)
	}

	/// Returns all registered names.
	pub fn names(&self) -> Vec<String> {
		MEDIUM_REGISTRY.read().keys().cloned().collect()
	}

	/// Removes the medium registered under `name`.
	pub fn unregister(&self, name: &str) -> Option<Arc<dyn StorageMedium>> {
		MEDIUM_REGISTRY.write().remove(name)
	}

	/// Clears all registered media.
	///
	/// This is primarily useful for testing.
	pub fn clear(&self) {
		MEDIUM_REGISTRY.write().clear();
	}

	/// Returns the number of registered media.
	pub fn len(&self) -> usize {
		MEDIUM_REGISTRY.read().len()
	}

	/// Returns true if no media are registered.
	pub fn is_empty(&self) -> bool {
		MEDIUM_REGISTRY.read().is_empty()
	}
}

impl Env for MediumRegistry {
	fn get(&self, name: &str) -> LoadResult<Arc<dyn StorageMedium>> {
		MEDIUM_REGISTRY
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| LoadError::Lookup(format!("no storage medium registered as '{}'", name)))
	}
}

/// An environment owned by the caller rather than shared globally.
#[derive(Default, Clone)]
pub struct MediumMap {
	media: HashMap<String, Arc<dyn StorageMedium>>,
}

impl MediumMap {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a medium under its own name.
	pub fn with_medium<M: StorageMedium + 'static>(self, medium: M) -> Self {
		let name = medium.name().to_string();
		self.with_shared(name, Arc::new(medium))
	}

	/// Adds a shared medium under `name`.
	pub fn with_shared(mut self, name: impl Into<String>, medium: Arc<dyn StorageMedium>) -> Self {
		self.insert(name, medium);
		self
	}

	/// Adds a shared medium under `name`.
	pub fn insert(&mut self, name: impl Into<String>, medium: Arc<dyn StorageMedium>) {
		self.media.insert(name.into(), medium);
	}

	/// Returns true if a medium is mapped under `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.media.contains_key(name)
	}

	/// Number of mapped media.
	pub fn len(&self) -> usize {
		self.media.len()
	}

	/// Returns true if nothing is mapped.
	pub fn is_empty(&self) -> bool {
		self.media.is_empty()
	}
}

impl std::fmt::Debug for MediumMap {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut names: Vec<_> = self.media.keys().collect();
		names.sort();
		f.debug_struct("MediumMap").field("media", &names).finish()
	}
}

impl Env for MediumMap {
	fn get(&self, name: &str) -> LoadResult<Arc<dyn StorageMedium>> {
		self.media
			.get(name)
			.cloned()
			.ok_or_else(|| LoadError::Lookup(format!("no storage medium mapped as '{}'", name)))
	}
}

/// Splits an `app__Model` storage name into app label and model name.
///
/// ```
/// use fixture_loadable::env::split_app_model;
///
/// assert_eq!(split_app_model("shop__Product").unwrap(), ("shop", "Product"));
/// assert!(split_app_model("Product").is_err());
/// ```
pub fn split_app_model(name: &str) -> LoadResult<(&str, &str)> {
	let parts: Vec<&str> = name.split(APP_MODEL_SPLIT).collect();
	match parts.as_slice() {
		[app, model] if !app.is_empty() && !model.is_empty() => Ok((*app, *model)),
		_ => Err(LoadError::Lookup(format!(
			"name must be splittable by {}, got {}",
			APP_MODEL_SPLIT, name
		))),
	}
}

/// Environment addressing media as `app__Model`.
///
/// Media are registered under an app label and model name; storage names are
/// split on [`APP_MODEL_SPLIT`] before lookup.
#[derive(Debug, Default, Clone)]
pub struct AppModelEnv {
	models: MediumMap,
}

impl AppModelEnv {
	/// Creates an empty environment.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a medium for `app.model`.
	pub fn with_model<M: StorageMedium + 'static>(mut self, app: &str, model: &str, medium: M) -> Self {
		self.models.insert(format!("{}.{}", app, model), Arc::new(medium));
		self
	}
}

impl Env for AppModelEnv {
	fn get(&self, name: &str) -> LoadResult<Arc<dyn StorageMedium>> {
		let (app, model) = split_app_model(name)?;
		self.models.get(&format!("{}.{}", app, model))
	}
}
