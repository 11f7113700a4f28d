//! Key and attribute accessible storage shared by rows, datasets, and aggregates.

use std::collections::HashMap;

use crate::error::{DataSetError, DataSetResult};

/// Names every container keeps for its own bookkeeping.
pub const CONTAINER_RESERVED: &[&str] = &["meta", "Meta", "ref", "get"];

/// Ordered mapping accessible by key or by attribute name.
///
/// Indexed lookup ([`get_item`](Self::get_item)) reaches every stored key.
/// Attribute lookup ([`attr`](Self::attr)) behaves the same except for the
/// container's reserved names, which never resolve to data.
#[derive(Debug, Clone, PartialEq)]
pub struct DataContainer<V> {
	label: String,
	reserved: &'static [&'static str],
	data: HashMap<String, V>,
	keys: Vec<String>,
}

impl<V> DataContainer<V> {
	/// Creates an empty container.
	///
	/// `label` names the container in error messages.
	pub fn new(label: impl Into<String>, reserved: &'static [&'static str]) -> Self {
		Self {
			label: label.into(),
			reserved,
			data: HashMap::new(),
			keys: Vec::new(),
		}
	}

	/// Creates a container from key/value pairs, keeping their order.
	pub fn from_pairs<K, I>(label: impl Into<String>, reserved: &'static [&'static str], pairs: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, V)>,
	{
		let mut container = Self::new(label, reserved);
		for (key, value) in pairs {
			container.set_data(key, value);
		}
		container
	}

	/// Creates a container from a mapping plus an explicit key order.
	///
	/// Every listed key must exist in `data`. Keys present in `data` but not
	/// listed are appended in sorted order.
	pub fn with_keys(
		label: impl Into<String>,
		reserved: &'static [&'static str],
		mut data: HashMap<String, V>,
		keys: Vec<String>,
	) -> DataSetResult<Self> {
		let mut container = Self::new(label, reserved);
		for key in keys {
			let value = data.remove(&key).ok_or_else(|| DataSetError::MissingKey {
				container: container.label.clone(),
				key: key.clone(),
			})?;
			container.set_data(key, value);
		}
		let mut rest: Vec<_> = data.into_iter().collect();
		rest.sort_by(|a, b| a.0.cmp(&b.0));
		for (key, value) in rest {
			container.set_data(key, value);
		}
		Ok(container)
	}

	/// Returns the label used in error messages.
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Returns the reserved attribute names of this container.
	pub fn reserved(&self) -> &'static [&'static str] {
		self.reserved
	}

	/// Returns true if `name` is one of the reserved attribute names.
	pub fn is_reserved(&self, name: &str) -> bool {
		self.reserved.contains(&name)
	}

	/// Returns true if `key` is stored.
	pub fn contains(&self, key: &str) -> bool {
		self.data.contains_key(key)
	}

	/// Indexed lookup.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::MissingKey`] if the key is not stored.
	pub fn get_item(&self, key: &str) -> DataSetResult<&V> {
		self.data.get(key).ok_or_else(|| DataSetError::MissingKey {
			container: self.label.clone(),
			key: key.to_string(),
		})
	}

	/// Attribute-style lookup.
	///
	/// # Errors
	///
	/// Returns [`DataSetError::ReservedAttribute`] for reserved names and
	/// [`DataSetError::MissingAttribute`] if the name is not stored.
	pub fn attr(&self, name: &str) -> DataSetResult<&V> {
		if name.starts_with('_') || self.is_reserved(name) {
			return Err(DataSetError::ReservedAttribute(name.to_string()));
		}
		self.data.get(name).ok_or_else(|| DataSetError::MissingAttribute {
			container: self.label.clone(),
			name: name.to_string(),
		})
	}

	/// Lookup that returns `None` instead of failing.
	pub fn get(&self, key: &str) -> Option<&V> {
		self.data.get(key)
	}

	/// Lookup that falls back to `default`.
	pub fn get_or<'a>(&'a self, key: &str, default: &'a V) -> &'a V {
		self.data.get(key).unwrap_or(default)
	}

	/// Keys in insertion order.
	pub fn keys(&self) -> &[String] {
		&self.keys
	}

	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Returns true if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Iterates `(key, value)` pairs in insertion order.
	pub fn iter(&self) -> Iter<'_, V> {
		Iter {
			keys: self.keys.iter(),
			data: &self.data,
		}
	}

	/// Sets a value, tracking the key for ordering only the first time it is seen.
	pub(crate) fn set_data(&mut self, key: impl Into<String>, value: V) {
		let key = key.into();
		if !self.data.contains_key(&key) {
			self.keys.push(key.clone());
		}
		self.data.insert(key, value);
	}
}

impl<'a, V> IntoIterator for &'a DataContainer<V> {
	type Item = (&'a str, &'a V);
	type IntoIter = Iter<'a, V>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Iterator over a container's `(key, value)` pairs in insertion order.
#[derive(Debug, Clone)]
pub struct Iter<'a, V> {
	keys: std::slice::Iter<'a, String>,
	data: &'a HashMap<String, V>,
}

impl<'a, V> Iterator for Iter<'a, V> {
	type Item = (&'a str, &'a V);

	fn next(&mut self) -> Option<Self::Item> {
		for key in self.keys.by_ref() {
			if let Some(value) = self.data.get(key) {
				return Some((key.as_str(), value));
			}
		}
		None
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(0, Some(self.keys.len()))
	}
}
