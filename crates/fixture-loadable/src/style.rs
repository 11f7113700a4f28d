//! Naming styles: how a dataset name maps to a storage name.
//!
//! A style is only consulted when a dataset's `Meta.storage` is not set.

use serde::{Deserialize, Serialize};

/// Translation from dataset names to storage names.
///
/// ```
/// use fixture_loadable::NameStyle;
///
/// let style = NameStyle::named_data().chain(NameStyle::CamelAndUnders);
/// assert_eq!(style.storable_name("ProductCategoryData"), "product_category");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum NameStyle {
	/// Storage name equals the dataset name.
	#[default]
	Original,

	/// Strips a prefix and/or suffix when present.
	Trimmed {
		/// Prefix to strip.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		prefix: Option<String>,
		/// Suffix to strip.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		suffix: Option<String>,
	},

	/// `CamelCase` becomes `camel_case`.
	CamelAndUnders,

	/// Applies each style in turn to the previous result.
	Chained {
		/// Styles in application order.
		styles: Vec<NameStyle>,
	},
}

impl NameStyle {
	/// Trims a trailing `Data`, so `ProductData` is stored as `Product`.
	pub fn named_data() -> Self {
		Self::trimmed(None, Some("Data"))
	}

	/// Creates a [`NameStyle::Trimmed`].
	pub fn trimmed(prefix: Option<&str>, suffix: Option<&str>) -> Self {
		Self::Trimmed {
			prefix: prefix.map(str::to_string),
			suffix: suffix.map(str::to_string),
		}
	}

	/// Applies `next` after this style.
	pub fn chain(self, next: NameStyle) -> Self {
		let mut styles = match self {
			Self::Chained { styles } => styles,
			other => vec![other],
		};
		styles.push(next);
		Self::Chained { styles }
	}

	/// Storage name guessed for `dataset_name`.
	pub fn storable_name(&self, dataset_name: &str) -> String {
		match self {
			Self::Original => dataset_name.to_string(),
			Self::Trimmed { prefix, suffix } => {
				let mut name = dataset_name;
				if let Some(prefix) = prefix {
					name = name.strip_prefix(prefix.as_str()).unwrap_or(name);
				}
				if let Some(suffix) = suffix {
					name = name.strip_suffix(suffix.as_str()).unwrap_or(name);
				}
				name.to_string()
			}
			Self::CamelAndUnders => camel_to_under(dataset_name),
			Self::Chained { styles } => styles
				.iter()
				.fold(dataset_name.to_string(), |name, style| style.storable_name(&name)),
		}
	}
}

fn camel_to_under(name: &str) -> String {
	let mut out = String::with_capacity(name.len() + 4);
	for (idx, ch) in name.chars().enumerate() {
		if ch.is_uppercase() {
			if idx > 0 && !out.ends_with('_') {
				out.push('_');
			}
			out.extend(ch.to_lowercase());
		} else {
			out.push(ch);
		}
	}
	out
}
