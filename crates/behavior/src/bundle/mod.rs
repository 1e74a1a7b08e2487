//! Mixin bundles.
//!
//! A bundle is a named set of declarations (members and operator bindings)
//! written relative to its own tag. Composition happens once, when the bundle
//! is defined: bases are linearized leftmost-first, inherited declarations are
//! flattened, and the result is published into a [`BehaviorRegistry`] as
//! ordinary keys. Dispatch never walks an inheritance chain.
//!
//! # Invariants
//!
//! - The bundle's own declarations shadow inherited ones with the same slot.
//! - Between bases, the first in linearization order wins.
//! - A sealed declaration is never shadowed; attempting it fails composition.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::core::{BehaviorError, BehaviorSource, DepthMarker, DispatchKey, Handler, OperandPattern, Operation, TypeTag};
use crate::registry::{BehaviorRegistry, Edit};

mod linearize;

#[cfg(test)]
mod tests;

/// Kind of a plain bundle member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
	Method,
	Property,
}

/// Operand pattern written relative to the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BundlePattern {
	/// The bundle's own tag, at the given depth.
	This(DepthMarker),
	Other(OperandPattern),
}

impl BundlePattern {
	/// The bundle's own tag at any depth.
	pub const fn this() -> Self {
		Self::This(DepthMarker::AnyDepth)
	}

	fn instantiate(&self, tag: &TypeTag) -> OperandPattern {
		match self {
			Self::This(depth) => OperandPattern::Tag {
				tag: tag.clone(),
				depth: *depth,
			},
			Self::Other(pattern) => pattern.clone(),
		}
	}
}

impl From<OperandPattern> for BundlePattern {
	fn from(pattern: OperandPattern) -> Self {
		Self::Other(pattern)
	}
}

impl fmt::Display for BundlePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::This(depth) => write!(f, "{}Self", depth.prefix()),
			Self::Other(pattern) => write!(f, "{pattern}"),
		}
	}
}

/// Target of [`BundleDef::bind_method`]: an operation, or a member name.
#[derive(Debug, Clone)]
pub enum Binding {
	Op(Operation),
	Name(Arc<str>),
}

impl Binding {
	fn into_operation(self) -> Operation {
		match self {
			Self::Op(op) => op,
			Self::Name(name) => Operation::Member(name),
		}
	}
}

impl From<Operation> for Binding {
	fn from(op: Operation) -> Self {
		Self::Op(op)
	}
}

impl From<&str> for Binding {
	fn from(name: &str) -> Self {
		Self::Name(Arc::from(name))
	}
}

/// A key shape relative to the bundle tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Slot {
	op: Operation,
	operands: SmallVec<[BundlePattern; 2]>,
}

impl Slot {
	fn member(name: &str) -> Self {
		Self {
			op: Operation::member(name),
			operands: SmallVec::from_iter([BundlePattern::this()]),
		}
	}

	fn instantiate(&self, tag: &TypeTag) -> Result<DispatchKey, BehaviorError> {
		DispatchKey::new(self.op.clone(), self.operands.iter().map(|pattern| pattern.instantiate(tag)))
	}

	fn is_member(&self, name: &str) -> bool {
		matches!(&self.op, Operation::Member(member) if &**member == name) && matches!(self.operands.as_slice(), [BundlePattern::This(_)])
	}
}

impl fmt::Display for Slot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}(", self.op)?;
		for (i, pattern) in self.operands.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{pattern}")?;
		}
		f.write_str(")")
	}
}

#[derive(Debug, Clone)]
pub(crate) struct Declaration {
	slot: Slot,
	handler: Handler,
	member: Option<MemberKind>,
	sealed: bool,
	origin: Arc<str>,
}

/// Builder for a [`Bundle`].
#[derive(Debug)]
pub struct BundleDef {
	name: Arc<str>,
	bases: Vec<Arc<Bundle>>,
	own: Vec<Declaration>,
}

/// Starts a bundle named `name` inheriting from `bases`, leftmost first.
pub fn define_bundle(name: &str, bases: &[Arc<Bundle>]) -> BundleDef {
	bases.iter().fold(BundleDef::new(name), |def, base| def.extends(base))
}

impl BundleDef {
	pub fn new(name: &str) -> Self {
		Self {
			name: Arc::from(name),
			bases: Vec::new(),
			own: Vec::new(),
		}
	}

	/// Appends a base; earlier bases take precedence over later ones.
	pub fn extends(mut self, base: &Arc<Bundle>) -> Self {
		self.bases.push(base.clone());
		self
	}

	pub fn method(self, name: &str, handler: impl Into<Handler>) -> Self {
		self.declare(Slot::member(name), handler.into(), Some(MemberKind::Method), false)
	}

	pub fn property(self, name: &str, handler: impl Into<Handler>) -> Self {
		self.declare(Slot::member(name), handler.into(), Some(MemberKind::Property), false)
	}

	/// A method derived bundles may not shadow.
	pub fn sealed_method(self, name: &str, handler: impl Into<Handler>) -> Self {
		self.declare(Slot::member(name), handler.into(), Some(MemberKind::Method), true)
	}

	/// A property derived bundles may not shadow.
	pub fn sealed_property(self, name: &str, handler: impl Into<Handler>) -> Self {
		self.declare(Slot::member(name), handler.into(), Some(MemberKind::Property), true)
	}

	/// Binds `handler` to `(op, Self, match_tags...)`.
	///
	/// A [`Binding::Name`] binds member access instead of an operator.
	pub fn bind_method(self, binding: impl Into<Binding>, match_tags: impl IntoIterator<Item = BundlePattern>, handler: impl Into<Handler>) -> Self {
		let operands = std::iter::once(BundlePattern::this()).chain(match_tags).collect();
		let slot = Slot {
			op: binding.into().into_operation(),
			operands,
		};
		self.declare(slot, handler.into(), None, false)
	}

	/// Binds both `(op, Self, other)` and `(op, other, Self)`.
	pub fn bind_transposed(self, op: Operation, other: BundlePattern, handler: impl Into<Handler>) -> Self {
		let handler = handler.into();
		let swapped = Slot {
			op: op.clone(),
			operands: SmallVec::from_iter([other.clone(), BundlePattern::this()]),
		};
		self.bind_method(op, [other], handler.clone()).declare(swapped, handler, None, false)
	}

	fn declare(mut self, slot: Slot, handler: Handler, member: Option<MemberKind>, sealed: bool) -> Self {
		let decl = Declaration {
			slot,
			handler,
			member,
			sealed,
			origin: self.name.clone(),
		};
		match self.own.iter().position(|existing| existing.slot == decl.slot) {
			Some(index) => self.own[index] = decl,
			None => self.own.push(decl),
		}
		self
	}

	/// Linearizes the bases and flattens inherited declarations.
	pub fn compose(self) -> Result<Arc<Bundle>, BehaviorError> {
		let tag = TypeTag::new(&self.name)?;
		let lineage = linearize::linearize(&self.name, &self.bases)?;

		// A winner from `origin` legitimately overrides declarations of its own ancestors.
		let descends = |origin: &str, ancestor: &str| {
			origin == &*self.name || lineage.iter().find(|base| base.name() == origin).is_some_and(|base| base.is_a(ancestor))
		};

		let mut resolved: Vec<Declaration> = Vec::new();
		let mut winners: FxHashMap<&Slot, &Declaration> = FxHashMap::default();
		let layers = std::iter::once(self.own.as_slice()).chain(lineage.iter().map(|base| base.own.as_slice()));
		for decl in layers.flatten() {
			let Some(winner) = winners.get(&decl.slot) else {
				winners.insert(&decl.slot, decl);
				resolved.push(decl.clone());
				continue;
			};
			let reason = if decl.sealed {
				format!("sealed declaration from {:?} would be shadowed by {:?}", decl.origin, winner.origin)
			} else if winner.sealed && !descends(&winner.origin, &decl.origin) {
				format!("sealed declaration from {:?} is ambiguous with {:?}", winner.origin, decl.origin)
			} else {
				continue;
			};
			return Err(BehaviorError::conflict(&self.name, decl.slot.to_string(), reason));
		}

		tracing::debug!(
			domain = "behavior",
			bundle = %self.name,
			mro = ?lineage.iter().map(|base| base.name()).collect::<Vec<_>>(),
			declarations = resolved.len(),
			"composed bundle",
		);

		Ok(Arc::new(Bundle {
			name: self.name,
			tag,
			bases: self.bases,
			lineage,
			own: self.own,
			resolved,
		}))
	}

	/// Composes the bundle and attaches it to `registry` under its own name.
	pub fn define(self, registry: &BehaviorRegistry) -> Result<Arc<Bundle>, BehaviorError> {
		let bundle = self.compose()?;
		Bundle::attach(&bundle, registry)?;
		Ok(bundle)
	}
}

/// A composed bundle; doubles as the node class registered for its tag.
pub struct Bundle {
	name: Arc<str>,
	tag: TypeTag,
	bases: Vec<Arc<Bundle>>,
	/// Linearized ancestors, excluding the bundle itself.
	lineage: Vec<Arc<Bundle>>,
	own: Vec<Declaration>,
	resolved: Vec<Declaration>,
}

impl Bundle {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn tag(&self) -> &TypeTag {
		&self.tag
	}

	pub fn bases(&self) -> &[Arc<Bundle>] {
		&self.bases
	}

	/// Method resolution order, starting with this bundle.
	pub fn mro(&self) -> Vec<&str> {
		std::iter::once(self.name()).chain(self.lineage.iter().map(|base| base.name())).collect()
	}

	/// True if `name` is this bundle or one of its ancestors.
	pub fn is_a(&self, name: &str) -> bool {
		self.mro().contains(&name)
	}

	/// Handler for member `name`, own or inherited.
	pub fn member(&self, name: &str) -> Option<&Handler> {
		self.resolved.iter().find(|decl| decl.slot.is_member(name)).map(|decl| &decl.handler)
	}

	/// Plain members, own first, then inherited in resolution order.
	pub fn members(&self) -> impl Iterator<Item = (&str, MemberKind)> + '_ {
		self.resolved
			.iter()
			.filter_map(|decl| Some((decl.slot.op.name()?, decl.member?)))
	}

	/// Keys this bundle publishes when attached under `tag`.
	pub fn keys_for(&self, tag: &TypeTag) -> Result<Vec<DispatchKey>, BehaviorError> {
		let mut keys = self.resolved.iter().map(|decl| decl.slot.instantiate(tag)).collect::<Result<Vec<_>, _>>()?;
		keys.push(class_key(tag, DepthMarker::Exact)?);
		keys.push(class_key(tag, DepthMarker::AnyDepth)?);
		Ok(keys)
	}

	/// Publishes the flattened declarations under the bundle's own tag.
	pub fn attach(this: &Arc<Self>, registry: &BehaviorRegistry) -> Result<usize, BehaviorError> {
		Self::attach_as(this, registry, this.tag.as_str())
	}

	/// Publishes the flattened declarations under `tag`, in one batch.
	///
	/// Also registers the bundle as the record class (`__class__(tag)`) and the
	/// array class (`__class__(*tag)`). If another bundle is already the record
	/// class for `tag`, the keys it published there are retired in the same
	/// swap, except those since overwritten from another source.
	pub fn attach_as(this: &Arc<Self>, registry: &BehaviorRegistry, tag: &str) -> Result<usize, BehaviorError> {
		let tag = TypeTag::new(tag)?;
		let keys = this.keys_for(&tag)?;
		let record_class = class_key(&tag, DepthMarker::Exact)?;
		let class = Handler::Class(this.clone());
		let handlers = this.resolved.iter().map(|decl| decl.handler.clone()).chain([class.clone(), class]);

		let retire = |edit: &Edit| {
			let prior = edit
				.entry(&record_class)
				.and_then(|entry| entry.handler.as_class())
				.filter(|prior| !Arc::ptr_eq(prior, this));
			let Some(prior) = prior else {
				return Vec::new();
			};
			let owner = BehaviorSource::Bundle(prior.name.clone());
			prior
				.keys_for(&tag)
				.unwrap_or_default()
				.into_iter()
				.filter(|key| edit.entry(key).is_some_and(|entry| entry.source == owner))
				.collect()
		};
		registry.replace_batch(BehaviorSource::Bundle(this.name.clone()), keys.into_iter().zip(handlers), retire)
	}
}

fn class_key(tag: &TypeTag, depth: DepthMarker) -> Result<DispatchKey, BehaviorError> {
	DispatchKey::new(Operation::Class, [OperandPattern::Tag { tag: tag.clone(), depth }])
}

impl fmt::Debug for Bundle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Bundle")
			.field("name", &self.name)
			.field("mro", &self.mro())
			.field("declarations", &self.resolved.len())
			.finish()
	}
}
