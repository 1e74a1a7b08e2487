//! Behavior registry with atomic publication.
//!
//! # Role
//!
//! This module owns the writable entrypoint: registration, removal and
//! snapshot/restore. Readers load the current table without locking; writers
//! build a new table and publish it with a compare-and-swap loop.
//!
//! # Invariants
//!
//! - Concurrent registrations are linearizable; none is lost (see `tests::concurrent_registrations_are_not_lost`).
//! - Invalid keys are rejected before publication and never enter a table.
//! - Generations strictly increase across every publication, restores included.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::builtins;
use crate::core::{BehaviorError, BehaviorSource, DispatchKey, Handler, IntoKey, Operand, Operation};
use crate::resolve::{Dispatch, Resolution, Resolver};

mod global;
mod snapshot;


pub use global::{IsolationGuard, global, isolate};
pub(crate) use snapshot::{Edit, Table};
pub use snapshot::{BehaviorSnapshot, Entry};

/// Process-wide mapping from dispatch keys to handlers.
pub struct BehaviorRegistry {
	label: &'static str,
	snap: ArcSwap<Table>,
}

impl BehaviorRegistry {
	/// Creates an empty registry.
	pub fn new(label: &'static str) -> Self {
		Self {
			label,
			snap: ArcSwap::from_pointee(Table::empty()),
		}
	}

	/// Creates a registry seeded with every built-in group.
	pub fn with_builtins(label: &'static str) -> Result<Self, BehaviorError> {
		let registry = Self::new(label);
		builtins::seed(&registry, None)?;
		Ok(registry)
	}

	pub fn label(&self) -> &'static str {
		self.label
	}

	/// Registers `handler` under `key`, overwriting any entry with the same normalized key.
	///
	/// Returns the handler that was replaced, if any.
	pub fn register(&self, key: impl IntoKey, handler: impl Into<Handler>) -> Result<Option<Handler>, BehaviorError> {
		self.register_from(BehaviorSource::Runtime, key, handler)
	}

	/// Like [`register`](Self::register) with an explicit source.
	pub fn register_from(&self, source: BehaviorSource, key: impl IntoKey, handler: impl Into<Handler>) -> Result<Option<Handler>, BehaviorError> {
		let key = key.into_key()?;
		let handler = handler.into();
		check_handler(&key, &handler)?;

		let entry = Entry { handler, source };
		let (replaced, generation) = self.publish(|edit| edit.insert(key.clone(), entry.clone()));

		tracing::debug!(
			domain = "behavior",
			registry = self.label,
			key = %key,
			source = %entry.source,
			replaced = replaced.is_some(),
			generation,
			"registered behavior",
		);
		Ok(replaced.map(|old| old.handler))
	}

	/// Validates every entry, then publishes all of them in one swap.
	///
	/// Any invalid key rejects the whole batch. Later duplicates within the
	/// batch win. Returns the number of entries published.
	pub fn register_batch<K>(&self, source: BehaviorSource, entries: impl IntoIterator<Item = (K, Handler)>) -> Result<usize, BehaviorError>
	where
		K: IntoKey,
	{
		self.replace_batch(source, entries, |_| Vec::new())
	}

	/// Like [`register_batch`](Self::register_batch), but first removes the keys
	/// `retire` selects from the table being edited.
	///
	/// `retire` runs against the same table the batch is applied to, so the
	/// removal and the insertion land in one publication.
	pub(crate) fn replace_batch<K>(
		&self,
		source: BehaviorSource,
		entries: impl IntoIterator<Item = (K, Handler)>,
		retire: impl Fn(&Edit) -> Vec<DispatchKey>,
	) -> Result<usize, BehaviorError>
	where
		K: IntoKey,
	{
		let mut staged = Vec::new();
		for (key, handler) in entries {
			let key = key.into_key()?;
			check_handler(&key, &handler)?;
			staged.push((
				key,
				Entry {
					handler,
					source: source.clone(),
				},
			));
		}

		let ((retired, replaced), generation) = self.publish(|edit| {
			let stale = retire(edit);
			let retired = stale.iter().filter(|key| edit.remove(key).is_some()).count();
			let mut replaced = 0usize;
			for (key, entry) in &staged {
				if edit.insert(key.clone(), entry.clone()).is_some() {
					replaced += 1;
				}
			}
			(retired, replaced)
		});

		if !staged.is_empty() || retired > 0 {
			tracing::debug!(
				domain = "behavior",
				registry = self.label,
				source = %source,
				count = staged.len(),
				replaced,
				retired,
				generation,
				"registered behavior batch",
			);
		}
		Ok(staged.len())
	}

	/// Returns the handler stored for exactly `key`.
	pub fn lookup_exact(&self, key: &DispatchKey) -> Option<Handler> {
		self.snap.load().entries.get(key).map(|entry| entry.handler.clone())
	}

	/// Deletes `key` if present; an absent key is a no-op.
	pub fn remove(&self, key: &DispatchKey) -> Option<Handler> {
		let (removed, generation) = self.publish(|edit| edit.remove(key));
		if removed.is_some() {
			tracing::debug!(domain = "behavior", registry = self.label, key = %key, generation, "removed behavior");
		}
		removed.map(|entry| entry.handler)
	}

	/// Captures the entire mapping.
	pub fn snapshot(&self) -> BehaviorSnapshot {
		BehaviorSnapshot {
			table: self.snap.load_full(),
		}
	}

	/// Replaces the entire mapping with `snapshot`'s contents.
	pub fn restore(&self, snapshot: &BehaviorSnapshot) {
		loop {
			let old = self.snap.load_full();
			let next = Arc::new(snapshot.table.republish(old.generation + 1));
			let generation = next.generation;
			let prev = self.snap.compare_and_swap(&old, next);
			if Arc::ptr_eq(&prev, &old) {
				tracing::debug!(
					domain = "behavior",
					registry = self.label,
					from = snapshot.generation(),
					generation,
					len = snapshot.len(),
					"restored behavior snapshot",
				);
				return;
			}
		}
	}

	pub fn generation(&self) -> u64 {
		self.snap.load().generation
	}

	pub fn len(&self) -> usize {
		self.snap.load().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns a resolver pinned to the current contents.
	pub fn resolver(&self) -> Resolver {
		Resolver::new(self.snapshot())
	}

	/// Returns a resolver that consults `local` first, then this registry.
	pub fn resolver_under(&self, local: &BehaviorSnapshot) -> Resolver {
		self.resolver().overlay(local.clone())
	}

	/// Resolves against the current contents; see [`Resolver::resolve`].
	pub fn resolve(&self, op: &Operation, operands: &[Operand]) -> Option<Resolution> {
		self.resolver().resolve(op, operands)
	}

	/// See [`Resolver::require`].
	pub fn require(&self, op: &Operation, operands: &[Operand]) -> Result<Dispatch, BehaviorError> {
		self.resolver().require(op, operands)
	}

	/// Display-name override for `tag`.
	pub fn type_str(&self, tag: &str) -> Option<Arc<str>> {
		self.resolver().type_str(tag)
	}

	/// Applies `apply` to a copy of the current table and publishes it.
	///
	/// `apply` runs again on the fresh table whenever another writer wins the
	/// race, so it must only touch the edit. Returns the last result and the
	/// generation that is current afterwards.
	fn publish<R>(&self, mut apply: impl FnMut(&mut Edit) -> R) -> (R, u64) {
		loop {
			let old = self.snap.load_full();
			let mut edit = Edit::new(&old);
			let out = apply(&mut edit);
			if !edit.changed() {
				return (out, old.generation);
			}

			let next = Arc::new(edit.finish(old.generation + 1));
			let generation = next.generation;
			let prev = self.snap.compare_and_swap(&old, next);
			if Arc::ptr_eq(&prev, &old) {
				return (out, generation);
			}
		}
	}
}

impl std::fmt::Debug for BehaviorRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let table = self.snap.load();
		f.debug_struct("BehaviorRegistry")
			.field("label", &self.label)
			.field("generation", &table.generation)
			.field("len", &table.entries.len())
			.finish()
	}
}

/// Labels belong to the display-name key and nowhere else.
fn check_handler(key: &DispatchKey, handler: &Handler) -> Result<(), BehaviorError> {
	let is_typestr = matches!(key.operation(), Operation::TypeStr);
	let is_label = matches!(handler, Handler::Label(_));
	if is_typestr != is_label {
		let reason = if is_typestr {
			format!("{} requires a label handler, got a {}", Operation::TypeStr, handler.kind_name())
		} else {
			format!("label handlers are only valid for {}", Operation::TypeStr)
		};
		return Err(BehaviorError::invalid_key(key.to_string(), reason));
	}
	Ok(())
}
