//! Immutable registry tables and the pinned snapshot handle.
//!
//! # Role
//!
//! This module holds the read-side view types and the copy-on-write edit used
//! by writers. It contains no publication logic.
//!
//! # Invariants
//!
//! - `by_shape` lists exactly the keys of `entries`, bucketed by operation and arity.
//! - A published [`Table`] is never mutated; writers clone into an [`Edit`].

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{BehaviorSource, DispatchKey, Handler, Operation};

/// Bucket identity for candidate scans: operation plus arity.
pub(crate) type Shape = (Operation, usize);

/// A stored handler and where it came from.
#[derive(Debug, Clone)]
pub struct Entry {
	pub handler: Handler,
	pub source: BehaviorSource,
}

pub(crate) struct Table {
	pub(crate) entries: Arc<FxHashMap<DispatchKey, Entry>>,
	pub(crate) by_shape: Arc<FxHashMap<Shape, Arc<[DispatchKey]>>>,
	pub(crate) generation: u64,
}

impl Table {
	pub(crate) fn empty() -> Self {
		Self {
			entries: Arc::default(),
			by_shape: Arc::default(),
			generation: 0,
		}
	}

	/// Shares this table's contents under a new generation.
	pub(crate) fn republish(&self, generation: u64) -> Self {
		Self {
			entries: self.entries.clone(),
			by_shape: self.by_shape.clone(),
			generation,
		}
	}
}

/// Registry contents pinned at one generation.
///
/// Holding a snapshot keeps its tables alive across later publications.
#[derive(Clone)]
pub struct BehaviorSnapshot {
	pub(crate) table: Arc<Table>,
}

impl BehaviorSnapshot {
	pub fn generation(&self) -> u64 {
		self.table.generation
	}

	pub fn len(&self) -> usize {
		self.table.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.table.entries.is_empty()
	}

	pub fn get(&self, key: &DispatchKey) -> Option<&Handler> {
		self.entry(key).map(|entry| &entry.handler)
	}

	pub fn entry(&self, key: &DispatchKey) -> Option<&Entry> {
		self.table.entries.get(key)
	}

	/// All keys, sorted by their rendered form.
	pub fn keys(&self) -> Vec<&DispatchKey> {
		let mut keys: Vec<_> = self.table.entries.keys().collect();
		keys.sort_by_cached_key(|key| key.to_string());
		keys
	}

	/// Keys registered for `op` with exactly `arity` operands.
	pub(crate) fn candidates(&self, op: &Operation, arity: usize) -> &[DispatchKey] {
		self.table.by_shape.get(&(op.clone(), arity)).map_or(&[][..], |bucket| &bucket[..])
	}
}

impl fmt::Debug for BehaviorSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BehaviorSnapshot")
			.field("generation", &self.table.generation)
			.field("len", &self.table.entries.len())
			.finish()
	}
}

/// Copy-on-write edit of a published table.
pub(crate) struct Edit {
	entries: FxHashMap<DispatchKey, Entry>,
	by_shape: FxHashMap<Shape, Arc<[DispatchKey]>>,
	dirty: FxHashSet<Shape>,
	changed: bool,
}

impl Edit {
	pub(crate) fn new(base: &Table) -> Self {
		Self {
			entries: (*base.entries).clone(),
			by_shape: (*base.by_shape).clone(),
			dirty: FxHashSet::default(),
			changed: false,
		}
	}

	pub(crate) fn entry(&self, key: &DispatchKey) -> Option<&Entry> {
		self.entries.get(key)
	}

	pub(crate) fn insert(&mut self, key: DispatchKey, entry: Entry) -> Option<Entry> {
		let shape = key.shape();
		let replaced = self.entries.insert(key, entry);
		if replaced.is_none() {
			self.dirty.insert(shape);
		}
		self.changed = true;
		replaced
	}

	pub(crate) fn remove(&mut self, key: &DispatchKey) -> Option<Entry> {
		let removed = self.entries.remove(key);
		if removed.is_some() {
			self.dirty.insert(key.shape());
			self.changed = true;
		}
		removed
	}

	pub(crate) fn changed(&self) -> bool {
		self.changed
	}

	pub(crate) fn finish(mut self, generation: u64) -> Table {
		for shape in self.dirty.drain() {
			let bucket: Vec<DispatchKey> = self
				.entries
				.keys()
				.filter(|key| key.operation() == &shape.0 && key.arity() == shape.1)
				.cloned()
				.collect();
			if bucket.is_empty() {
				self.by_shape.remove(&shape);
			} else {
				self.by_shape.insert(shape, Arc::from(bucket));
			}
		}
		Table {
			entries: Arc::new(self.entries),
			by_shape: Arc::new(self.by_shape),
			generation,
		}
	}
}
