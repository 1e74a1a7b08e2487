//! Built-in behavior groups.
//!
//! Each group submits a [`BuiltinGroup`] through `inventory`; [`seed`] publishes
//! the selected groups into a registry, one batch per group.

use crate::core::{BehaviorError, BehaviorSource, Handler};
use crate::registry::BehaviorRegistry;

pub mod categorical;
pub mod string;

#[cfg(test)]
mod tests;

/// A named set of built-in entries keyed by their textual form.
pub struct BuiltinGroup {
	pub name: &'static str,
	pub entries: fn() -> Vec<(&'static str, Handler)>,
}

inventory::collect!(BuiltinGroup);

/// Names of every linked built-in group, sorted.
pub fn groups() -> Vec<&'static str> {
	let mut names: Vec<_> = inventory::iter::<BuiltinGroup>.into_iter().map(|group| group.name).collect();
	names.sort_unstable();
	names
}

/// Seeds `registry` with the groups named in `only`, or with every group.
///
/// Unknown names in `only` are logged and skipped. Returns the number of entries published.
pub fn seed(registry: &BehaviorRegistry, only: Option<&[String]>) -> Result<usize, BehaviorError> {
	if let Some(only) = only {
		let known = groups();
		for name in only.iter().filter(|name| !known.contains(&name.as_str())) {
			tracing::warn!(domain = "behavior", group = %name, "unknown builtin behavior group; skipping");
		}
	}

	let mut selected: Vec<&BuiltinGroup> = inventory::iter::<BuiltinGroup>
		.into_iter()
		.filter(|group| only.is_none_or(|only| only.iter().any(|name| name == group.name)))
		.collect();
	selected.sort_by_key(|group| group.name);

	let mut total = 0;
	for group in selected {
		total += registry.register_batch(BehaviorSource::Builtin(group.name), (group.entries)())?;
	}
	tracing::debug!(domain = "behavior", registry = registry.label(), entries = total, "seeded builtin behaviors");
	Ok(total)
}
