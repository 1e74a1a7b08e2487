//! Declarative registry setup.
//!
//! ```toml
//! seed_builtins = true
//! builtins = ["string"]
//! strict_tagged = true
//!
//! [typestr]
//! point = "Point"
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::builtins;
use crate::core::{BehaviorError, BehaviorSource, DispatchKey, Handler, OperandPattern, Operation};
use crate::registry::{BehaviorRegistry, BehaviorSnapshot};
use crate::resolve::Resolver;

#[cfg(test)]
mod tests;

/// Registry configuration, usually read from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorConfig {
	/// Seed built-in groups before applying the rest of the config.
	pub seed_builtins: bool,
	/// Built-in groups to seed; `None` seeds every group.
	pub builtins: Option<Vec<String>>,
	/// See [`Resolver::strict_tagged`].
	pub strict_tagged: bool,
	/// Display-name overrides, tag to label.
	pub typestr: BTreeMap<String, String>,
}

impl Default for BehaviorConfig {
	fn default() -> Self {
		Self {
			seed_builtins: true,
			builtins: None,
			strict_tagged: true,
			typestr: BTreeMap::new(),
		}
	}
}

impl BehaviorConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, BehaviorError> {
		Ok(toml::from_str(input)?)
	}

	/// Applies this config to an existing registry in one batch per concern.
	pub fn apply(&self, registry: &BehaviorRegistry) -> Result<usize, BehaviorError> {
		let mut published = 0;
		if self.seed_builtins {
			published += builtins::seed(registry, self.builtins.as_deref())?;
		}

		let mut labels = Vec::with_capacity(self.typestr.len());
		for (tag, label) in &self.typestr {
			let key = DispatchKey::new(Operation::TypeStr, [OperandPattern::exact(tag)?])?;
			labels.push((key, Handler::label(label.as_str())));
		}
		published += registry.register_batch(BehaviorSource::Config, labels)?;

		tracing::info!(
			domain = "behavior",
			registry = registry.label(),
			published,
			strict_tagged = self.strict_tagged,
			"applied behavior config",
		);
		Ok(published)
	}
}

impl BehaviorRegistry {
	/// Builds a registry from `config`.
	pub fn from_config(label: &'static str, config: &BehaviorConfig) -> Result<Self, BehaviorError> {
		let registry = Self::new(label);
		config.apply(&registry)?;
		Ok(registry)
	}
}

impl Resolver {
	/// A resolver over `snap` honouring the config's strictness.
	pub fn with_config(snap: BehaviorSnapshot, config: &BehaviorConfig) -> Self {
		Self::new(snap).strict_tagged(config.strict_tagged)
	}
}
