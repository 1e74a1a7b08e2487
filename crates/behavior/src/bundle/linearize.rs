//! Leftmost-first (C3) linearization of bundle bases.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::Bundle;
use crate::core::BehaviorError;

/// Returns the ancestors of a bundle named `name` with `bases`, in resolution order.
///
/// Bundles are identified by name; two distinct bundles sharing a name in one
/// hierarchy are rejected rather than silently merged.
pub(super) fn linearize(name: &str, bases: &[Arc<Bundle>]) -> Result<Vec<Arc<Bundle>>, BehaviorError> {
	let mut seen: FxHashMap<&str, &Arc<Bundle>> = FxHashMap::default();
	for bundle in bases.iter().flat_map(|base| std::iter::once(base).chain(base.lineage.iter())) {
		if bundle.name() == name {
			return Err(BehaviorError::conflict(name, "bases", format!("{name:?} cannot inherit from itself")));
		}
		match seen.get(bundle.name()) {
			Some(existing) if !Arc::ptr_eq(existing, bundle) => {
				return Err(BehaviorError::conflict(name, "bases", format!("two distinct bundles are named {:?}", bundle.name())));
			}
			Some(_) => {}
			None => {
				seen.insert(bundle.name(), bundle);
			}
		}
	}

	let mut seqs: Vec<VecDeque<&Arc<Bundle>>> = bases
		.iter()
		.map(|base| std::iter::once(base).chain(base.lineage.iter()).collect())
		.collect();
	seqs.push(bases.iter().collect());

	let mut out = Vec::new();
	loop {
		seqs.retain(|seq| !seq.is_empty());
		if seqs.is_empty() {
			return Ok(out);
		}

		let head = seqs
			.iter()
			.map(|seq| seq[0])
			.find(|candidate| !seqs.iter().any(|seq| seq.iter().skip(1).any(|b| Arc::ptr_eq(b, candidate))));
		let Some(head) = head else {
			let pending: Vec<&str> = seqs.iter().map(|seq| seq[0].name()).collect();
			return Err(BehaviorError::conflict(
				name,
				"bases",
				format!("no consistent resolution order; ambiguous between {pending:?}"),
			));
		};

		for seq in &mut seqs {
			if Arc::ptr_eq(seq[0], head) {
				seq.pop_front();
			}
		}
		out.push(head.clone());
	}
}
