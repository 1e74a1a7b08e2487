//! Precedence-ordered dispatch resolution.
//!
//! The [`Resolver`] answers "which handler applies to this operation on these
//! operands" against one pinned [`BehaviorSnapshot`].
//!
//! # Resolution Order
//!
//! Each operand position ranks the patterns that match it:
//!
//! 1. Exact tag (operand is the tagged node, depth 1)
//! 2. One-level tag (operand is a list of tagged nodes, depth 2)
//! 3. Any-depth tag (tagged leaves at depth >= 1)
//! 4. Category placeholder, most specific first
//!
//! Among the keys registered for the operation and arity, the key with the
//! lexicographically smallest rank vector wins, position 0 first. When nothing
//! matches an element-wise operator, the generic `__ufunc__` hook is consulted
//! greedily: the first tagged operand, in argument order, whose tag has a hook
//! decides the handler, even when a later operand has a more specific hook.

use std::slice;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::bundle::Bundle;
use crate::core::{BehaviorError, DispatchKey, Handler, Operand, OperandTag, Operation};
use crate::registry::BehaviorSnapshot;


/// A matched handler, pinned at the generation it was resolved from.
#[derive(Debug, Clone)]
pub struct Resolution {
	handler: Handler,
	key: DispatchKey,
	position: Option<usize>,
	generation: u64,
}

impl Resolution {
	pub fn handler(&self) -> &Handler {
		&self.handler
	}

	pub fn into_handler(self) -> Handler {
		self.handler
	}

	/// The registry key that matched.
	pub fn key(&self) -> &DispatchKey {
		&self.key
	}

	/// Operand position that selected a generic hook; `None` for positional matches.
	pub fn position(&self) -> Option<usize> {
		self.position
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}
}

/// Outcome of [`Resolver::require`].
#[derive(Debug, Clone)]
pub enum Dispatch {
	Handler(Resolution),
	/// No override applies; the caller runs its default behavior.
	Fallback,
}

impl Dispatch {
	pub fn resolution(&self) -> Option<&Resolution> {
		match self {
			Self::Handler(resolution) => Some(resolution),
			Self::Fallback => None,
		}
	}
}

/// Stateless resolver over one or more pinned snapshots.
///
/// Layers are ordered most local first. For a given key the leftmost layer
/// holding it supplies the handler; candidate keys from every layer are ranked
/// together, so a local `*tag` entry never hides a global exact one.
#[derive(Debug, Clone)]
pub struct Resolver {
	layers: SmallVec<[BehaviorSnapshot; 2]>,
	strict_tagged: bool,
}

impl Resolver {
	pub fn new(snap: BehaviorSnapshot) -> Self {
		Self::layered([snap])
	}

	/// A resolver over `layers`, most local first.
	pub fn layered(layers: impl IntoIterator<Item = BehaviorSnapshot>) -> Self {
		Self {
			layers: layers.into_iter().collect(),
			strict_tagged: true,
		}
	}

	/// Puts `local` in front of the existing layers.
	pub fn overlay(mut self, local: BehaviorSnapshot) -> Self {
		self.layers.insert(0, local);
		self
	}

	/// Whether [`require`](Self::require) fails when every operand is tagged and nothing matches.
	pub fn strict_tagged(mut self, strict: bool) -> Self {
		self.strict_tagged = strict;
		self
	}

	/// The pinned layers, most local first.
	pub fn layers(&self) -> &[BehaviorSnapshot] {
		&self.layers
	}

	/// Finds the most specific handler for `op` on `operands`, or `None`.
	pub fn resolve(&self, op: &Operation, operands: &[Operand]) -> Option<Resolution> {
		let found = match self.best(op, operands) {
			Some(key) => self.hit(key, None),
			None if op.is_ufunc() => self.generic_hook(operands),
			None => None,
		};
		tracing::trace!(
			domain = "behavior",
			op = %op,
			arity = operands.len(),
			layers = self.layers.len(),
			matched = ?found.as_ref().map(Resolution::key),
			"resolve",
		);
		found
	}

	/// Like [`resolve`](Self::resolve), but distinguishes a safe fallback from an
	/// unsupported operation.
	///
	/// With no match, the caller may fall back to untyped behavior unless the
	/// operation is an element-wise operator and every operand carries a tag:
	/// that case is refused with [`BehaviorError::UnsupportedOperation`].
	/// Member, reducer and hook lookups always fall back.
	pub fn require(&self, op: &Operation, operands: &[Operand]) -> Result<Dispatch, BehaviorError> {
		if let Some(resolution) = self.resolve(op, operands) {
			return Ok(Dispatch::Handler(resolution));
		}
		if self.strict_tagged && op.is_ufunc() && !operands.is_empty() && operands.iter().all(Operand::is_tagged) {
			return Err(BehaviorError::UnsupportedOperation {
				operation: op.to_string(),
				tags: operands.iter().map(OperandTag::from).collect(),
			});
		}
		Ok(Dispatch::Fallback)
	}

	/// Display-name override registered under `__typestr__(tag)`.
	pub fn type_str(&self, tag: &str) -> Option<Arc<str>> {
		let operand = Operand::tagged(tag, 1);
		match self.resolve(&Operation::TypeStr, slice::from_ref(&operand))?.into_handler() {
			Handler::Label(text) => Some(text),
			_ => None,
		}
	}

	/// Custom broadcast hook for `operand`.
	pub fn broadcast_hook(&self, operand: &Operand) -> Option<Resolution> {
		self.resolve(&Operation::Broadcast, slice::from_ref(operand))
	}

	/// Class replacing `operand`'s representation: the record class at depth 1,
	/// or an array class registered for deeper nesting.
	pub fn node_class(&self, operand: &Operand) -> Option<Arc<Bundle>> {
		match self.resolve(&Operation::Class, slice::from_ref(operand))?.into_handler() {
			Handler::Class(bundle) => Some(bundle),
			_ => None,
		}
	}

	/// Property or method `name` on a tagged operand.
	pub fn member(&self, name: &str, operand: &Operand) -> Option<Resolution> {
		self.resolve(&Operation::member(name), slice::from_ref(operand))
	}

	/// Reducer override applied to records tagged `tag`.
	pub fn record_reducer(&self, reducer: &str, tag: &str) -> Option<Resolution> {
		let operand = Operand::tagged(tag, 1);
		self.resolve(&Operation::reducer(reducer), slice::from_ref(&operand))
	}

	fn candidates<'s>(&'s self, op: &Operation, arity: usize) -> impl Iterator<Item = &'s DispatchKey> {
		self.layers.iter().flat_map(move |snap| snap.candidates(op, arity))
	}

	fn best(&self, op: &Operation, operands: &[Operand]) -> Option<&DispatchKey> {
		self.candidates(op, operands.len())
			.filter_map(|key| key.rank(operands).map(|rank| (rank, key)))
			.min_by(|a, b| a.0.cmp(&b.0))
			.map(|(_, key)| key)
	}

	/// Greedy left-to-right scan over `__ufunc__(tag)` hooks.
	fn generic_hook(&self, operands: &[Operand]) -> Option<Resolution> {
		let hooks: Vec<&DispatchKey> = self.candidates(&Operation::AnyUfunc, 1).collect();
		if hooks.is_empty() {
			return None;
		}
		operands.iter().enumerate().filter(|(_, operand)| operand.is_tagged()).find_map(|(position, operand)| {
			hooks
				.iter()
				.filter_map(|key| key.rank(slice::from_ref(operand)).map(|rank| (rank, *key)))
				.min_by(|a, b| a.0.cmp(&b.0))
				.and_then(|(_, key)| self.hit(key, Some(position)))
		})
	}

	/// Looks `key` up in the leftmost layer that holds it.
	fn hit(&self, key: &DispatchKey, position: Option<usize>) -> Option<Resolution> {
		self.layers.iter().find_map(|snap| {
			snap.get(key).map(|handler| Resolution {
				handler: handler.clone(),
				key: key.clone(),
				position,
				generation: snap.generation(),
			})
		})
	}
}
