//! Runtime operand descriptors handed over by the array front end.

use std::fmt;
use std::sync::Arc;

/// Primitive classification of an operand's leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
	Bool,
	Int,
	UInt,
	Float,
	Complex,
	DateTime,
	TimeDelta,
	Record,
	Other,
}

/// One operand of a dispatch request, already reduced to tag, depth and kind.
///
/// Depth counts the nesting of the tagged node: `1` is the tagged node itself,
/// `2` a list of them, and so on. Depth `0` is a scalar and never matches a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
	tag: Option<Arc<str>>,
	depth: usize,
	kind: PrimitiveKind,
}

impl Operand {
	/// An untagged scalar.
	pub fn plain(kind: PrimitiveKind) -> Self {
		Self::untagged(kind, 0)
	}

	/// An untagged array nested `depth` levels deep.
	pub fn untagged(kind: PrimitiveKind, depth: usize) -> Self {
		Self { tag: None, depth, kind }
	}

	/// A node whose leaves carry `tag`, observed at `depth`.
	pub fn tagged(tag: impl Into<Arc<str>>, depth: usize) -> Self {
		let tag: Arc<str> = tag.into();
		Self {
			tag: (!tag.is_empty()).then_some(tag),
			depth,
			kind: PrimitiveKind::Record,
		}
	}

	pub fn with_kind(mut self, kind: PrimitiveKind) -> Self {
		self.kind = kind;
		self
	}

	pub fn tag(&self) -> Option<&str> {
		self.tag.as_deref()
	}

	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn kind(&self) -> PrimitiveKind {
		self.kind
	}

	/// True when the operand carries a tag at a depth where tag patterns can apply.
	pub fn is_tagged(&self) -> bool {
		self.tag.is_some() && self.depth >= 1
	}
}

/// Diagnostic rendering of an operand's tag, used in [`BehaviorError::UnsupportedOperation`].
///
/// [`BehaviorError::UnsupportedOperation`]: super::BehaviorError::UnsupportedOperation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandTag {
	pub tag: Option<Arc<str>>,
	pub depth: usize,
}

impl From<&Operand> for OperandTag {
	fn from(operand: &Operand) -> Self {
		Self {
			tag: operand.tag.clone(),
			depth: operand.depth,
		}
	}
}

impl fmt::Display for OperandTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.tag {
			Some(tag) => write!(f, "{tag}@{}", self.depth),
			None => write!(f, "<untagged>@{}", self.depth),
		}
	}
}
