//! Dispatch keys and their textual grammar.
//!
//! A key is an [`Operation`] followed by one [`OperandPattern`] per operand
//! position. Keys render and parse as `op(pattern, ...)`:
//!
//! | Form            | Meaning                                   |
//! |-----------------|-------------------------------------------|
//! | `point`         | tag `point` on a single-level node        |
//! | `.point`        | one-level container of `point` leaves     |
//! | `*point`        | `point` leaves at any depth >= 1          |
//! | `#real`         | any operand whose primitive kind is real  |
//!
//! Operations are plain operator names (`equal`), `.name` for member access,
//! `reduce:name` for reducers, and the reserved `__ufunc__`, `__typestr__`,
//! `__broadcast__` and `__class__` identifiers.
//!
//! # Invariants
//!
//! - A constructed [`DispatchKey`] is always normalized; two keys that render
//!   identically compare equal.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use smallvec::SmallVec;

use super::error::BehaviorError;
use super::operand::{Operand, PrimitiveKind};

#[cfg(test)]
mod tests;

/// Per-position rank vector; lower is more specific.
pub(crate) type RankVec = SmallVec<[u8; 4]>;

fn check_name(what: &str, name: &str) -> Result<(), String> {
	let Some(first) = name.chars().next() else {
		return Err(format!("empty {what}"));
	};
	if matches!(first, '.' | '*' | '#') {
		return Err(format!("{what} {name:?} carries more than one marker"));
	}
	if !(first.is_alphanumeric() || first == '_') {
		return Err(format!("unrecognized marker {first:?} on {what} {name:?}"));
	}
	if let Some(bad) = name.chars().find(|c| c.is_whitespace() || matches!(c, '(' | ')' | ',')) {
		return Err(format!("{what} {name:?} contains {bad:?}"));
	}
	Ok(())
}

/// Replaces the key text of an [`BehaviorError::InvalidKey`] with the full key being parsed.
fn rekey(err: BehaviorError, whole: &str) -> BehaviorError {
	match err {
		BehaviorError::InvalidKey { reason, .. } => BehaviorError::invalid_key(whole, reason),
		other => other,
	}
}

/// A validated type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(Arc<str>);

impl TypeTag {
	pub fn new(tag: &str) -> Result<Self, BehaviorError> {
		check_name("type tag", tag).map_err(|reason| BehaviorError::invalid_key(tag, reason))?;
		Ok(Self(Arc::from(tag)))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for TypeTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// How deeply nested a tagged node may be for a pattern to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepthMarker {
	/// The operand is the tagged node itself (observed depth 1).
	Exact,
	/// The operand is a one-level container of tagged leaves (observed depth 2).
	OneLevel,
	/// Tagged leaves at any observed depth >= 1.
	AnyDepth,
}

impl DepthMarker {
	pub const fn prefix(self) -> &'static str {
		match self {
			Self::Exact => "",
			Self::OneLevel => ".",
			Self::AnyDepth => "*",
		}
	}

	/// Returns true if an operand observed at `depth` satisfies this marker.
	pub const fn admits(self, depth: usize) -> bool {
		match self {
			Self::Exact => depth == 1,
			Self::OneLevel => depth == 2,
			Self::AnyDepth => depth >= 1,
		}
	}

	pub(crate) const fn rank(self) -> u8 {
		match self {
			Self::Exact => 0,
			Self::OneLevel => 1,
			Self::AnyDepth => 2,
		}
	}

	fn split(raw: &str) -> (Self, &str) {
		if let Some(rest) = raw.strip_prefix('*') {
			(Self::AnyDepth, rest)
		} else if let Some(rest) = raw.strip_prefix('.') {
			(Self::OneLevel, rest)
		} else {
			(Self::Exact, raw)
		}
	}
}

/// Generic placeholder matched on an operand's primitive kind instead of its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
	Bool,
	Integer,
	Real,
	Number,
	Any,
}

impl Category {
	/// Parses a category name, accepting the usual spellings (`int`, `float`, `numbers.Real`).
	pub fn parse(name: &str) -> Option<Self> {
		let lower = name.trim().to_ascii_lowercase();
		let bare = lower.strip_prefix("numbers.").unwrap_or(&lower);
		match bare {
			"bool" | "boolean" => Some(Self::Bool),
			"int" | "integer" | "integral" => Some(Self::Integer),
			"real" | "float" => Some(Self::Real),
			"number" | "complex" => Some(Self::Number),
			"any" => Some(Self::Any),
			_ => None,
		}
	}

	pub const fn name(self) -> &'static str {
		match self {
			Self::Bool => "bool",
			Self::Integer => "integer",
			Self::Real => "real",
			Self::Number => "number",
			Self::Any => "any",
		}
	}

	pub const fn admits(self, kind: PrimitiveKind) -> bool {
		use PrimitiveKind as K;
		match self {
			Self::Bool => matches!(kind, K::Bool),
			Self::Integer => matches!(kind, K::Bool | K::Int | K::UInt),
			Self::Real => matches!(kind, K::Bool | K::Int | K::UInt | K::Float),
			Self::Number => matches!(kind, K::Bool | K::Int | K::UInt | K::Float | K::Complex),
			Self::Any => true,
		}
	}

	/// Categories always rank below every tag pattern; each admits a superset of the one before.
	pub(crate) const fn rank(self) -> u8 {
		match self {
			Self::Bool => 3,
			Self::Integer => 4,
			Self::Real => 5,
			Self::Number => 6,
			Self::Any => 7,
		}
	}
}

/// What a single operand position of a key matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperandPattern {
	Tag { tag: TypeTag, depth: DepthMarker },
	Category(Category),
}

impl OperandPattern {
	pub fn tag(tag: &str, depth: DepthMarker) -> Result<Self, BehaviorError> {
		Ok(Self::Tag {
			tag: TypeTag::new(tag)?,
			depth,
		})
	}

	pub fn exact(tag: &str) -> Result<Self, BehaviorError> {
		Self::tag(tag, DepthMarker::Exact)
	}

	pub fn one_level(tag: &str) -> Result<Self, BehaviorError> {
		Self::tag(tag, DepthMarker::OneLevel)
	}

	pub fn any_depth(tag: &str) -> Result<Self, BehaviorError> {
		Self::tag(tag, DepthMarker::AnyDepth)
	}

	pub fn parse(raw: &str) -> Result<Self, BehaviorError> {
		let raw = raw.trim();
		if let Some(name) = raw.strip_prefix('#') {
			return Category::parse(name)
				.map(Self::Category)
				.ok_or_else(|| BehaviorError::invalid_key(raw, format!("unknown category {name:?}")));
		}
		let (depth, tag) = DepthMarker::split(raw);
		Self::tag(tag, depth).map_err(|e| rekey(e, raw))
	}

	pub fn type_tag(&self) -> Option<&TypeTag> {
		match self {
			Self::Tag { tag, .. } => Some(tag),
			Self::Category(_) => None,
		}
	}

	/// Ranks this pattern against a runtime operand, or `None` if it does not match.
	pub(crate) fn rank(&self, operand: &Operand) -> Option<u8> {
		match self {
			Self::Tag { tag, depth } => (operand.tag() == Some(tag.as_str()) && depth.admits(operand.depth())).then_some(depth.rank()),
			Self::Category(category) => category.admits(operand.kind()).then_some(category.rank()),
		}
	}
}

impl fmt::Display for OperandPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Tag { tag, depth } => write!(f, "{}{tag}", depth.prefix()),
			Self::Category(category) => write!(f, "#{}", category.name()),
		}
	}
}

impl FromStr for OperandPattern {
	type Err = BehaviorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// Identifies what is being dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
	/// An element-wise operator such as `add` or `equal`.
	Ufunc(Arc<str>),
	/// Any element-wise operator; consulted greedily by operand position.
	AnyUfunc,
	/// Property or method access on a tagged record.
	Member(Arc<str>),
	/// A reduction applied to tagged records.
	Reducer(Arc<str>),
	/// Display type-name override; handlers must be labels.
	TypeStr,
	/// Custom broadcast hook.
	Broadcast,
	/// Node class replacing a tagged node's representation.
	Class,
}

impl Operation {
	pub fn ufunc(name: &str) -> Self {
		Self::Ufunc(Arc::from(name))
	}

	pub fn member(name: &str) -> Self {
		Self::Member(Arc::from(name))
	}

	pub fn reducer(name: &str) -> Self {
		Self::Reducer(Arc::from(name))
	}

	pub fn parse(raw: &str) -> Result<Self, BehaviorError> {
		let raw = raw.trim();
		let op = match raw {
			"__ufunc__" => Self::AnyUfunc,
			"__typestr__" => Self::TypeStr,
			"__broadcast__" => Self::Broadcast,
			"__class__" => Self::Class,
			_ => {
				if let Some(name) = raw.strip_prefix('.') {
					Self::member(name)
				} else if let Some(name) = raw.strip_prefix("reduce:") {
					Self::reducer(name)
				} else {
					Self::ufunc(raw)
				}
			}
		};
		op.validate().map_err(|reason| BehaviorError::invalid_key(raw, reason))?;
		Ok(op)
	}

	pub fn is_ufunc(&self) -> bool {
		matches!(self, Self::Ufunc(_))
	}

	/// Returns the user-facing name for named operations.
	pub fn name(&self) -> Option<&str> {
		match self {
			Self::Ufunc(name) | Self::Member(name) | Self::Reducer(name) => Some(name),
			_ => None,
		}
	}

	fn validate(&self) -> Result<(), String> {
		match self {
			Self::Ufunc(name) => {
				check_name("operation", name)?;
				if name.contains(':') || (name.len() > 4 && name.starts_with("__") && name.ends_with("__")) {
					return Err(format!("operation {name:?} collides with a reserved identifier"));
				}
				Ok(())
			}
			Self::Member(name) => check_name("member", name),
			Self::Reducer(name) => check_name("reducer", name),
			Self::AnyUfunc | Self::TypeStr | Self::Broadcast | Self::Class => Ok(()),
		}
	}

	fn check_operands(&self, operands: &[OperandPattern]) -> Result<(), String> {
		let leading_tag = matches!(operands.first(), Some(OperandPattern::Tag { .. }));
		match self {
			Self::Ufunc(_) if operands.is_empty() => Err("operator keys need at least one operand".into()),
			Self::Ufunc(_) => Ok(()),
			Self::Member(_) if !leading_tag => Err("member keys start with a tagged operand".into()),
			Self::Member(_) => Ok(()),
			Self::TypeStr => match operands {
				[OperandPattern::Tag {
					depth: DepthMarker::Exact, ..
				}] => Ok(()),
				_ => Err(format!("{self} takes exactly one exact tag")),
			},
			Self::AnyUfunc | Self::Reducer(_) | Self::Broadcast | Self::Class => {
				if operands.len() == 1 && leading_tag {
					Ok(())
				} else {
					Err(format!("{self} takes exactly one tagged operand"))
				}
			}
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ufunc(name) => f.write_str(name),
			Self::AnyUfunc => f.write_str("__ufunc__"),
			Self::Member(name) => write!(f, ".{name}"),
			Self::Reducer(name) => write!(f, "reduce:{name}"),
			Self::TypeStr => f.write_str("__typestr__"),
			Self::Broadcast => f.write_str("__broadcast__"),
			Self::Class => f.write_str("__class__"),
		}
	}
}

impl FromStr for Operation {
	type Err = BehaviorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// A normalized dispatch key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchKey {
	op: Operation,
	operands: SmallVec<[OperandPattern; 2]>,
}

impl DispatchKey {
	pub fn new(op: Operation, operands: impl IntoIterator<Item = OperandPattern>) -> Result<Self, BehaviorError> {
		let key = Self {
			op,
			operands: operands.into_iter().collect(),
		};
		key.op
			.validate()
			.and_then(|()| key.op.check_operands(&key.operands))
			.map_err(|reason| BehaviorError::invalid_key(key.to_string(), reason))?;
		Ok(key)
	}

	pub fn builder(op: Operation) -> KeyBuilder {
		KeyBuilder {
			op,
			pending: SmallVec::new(),
		}
	}

	/// Parses and normalizes the textual form `op(pattern, ...)`.
	pub fn parse(raw: &str) -> Result<Self, BehaviorError> {
		let trimmed = raw.trim();
		let Some(open) = trimmed.find('(') else {
			return Err(BehaviorError::invalid_key(raw, "missing '('"));
		};
		let Some(inner) = trimmed[open + 1..].strip_suffix(')') else {
			return Err(BehaviorError::invalid_key(raw, "missing closing ')'"));
		};
		let op = Operation::parse(&trimmed[..open]).map_err(|e| rekey(e, raw))?;
		let operands = if inner.trim().is_empty() {
			SmallVec::<[OperandPattern; 2]>::new()
		} else {
			inner
				.split(',')
				.map(OperandPattern::parse)
				.collect::<Result<_, _>>()
				.map_err(|e| rekey(e, raw))?
		};
		Self::new(op, operands).map_err(|e| rekey(e, raw))
	}

	pub fn operation(&self) -> &Operation {
		&self.op
	}

	pub fn operands(&self) -> &[OperandPattern] {
		&self.operands
	}

	pub fn arity(&self) -> usize {
		self.operands.len()
	}

	pub(crate) fn shape(&self) -> (Operation, usize) {
		(self.op.clone(), self.operands.len())
	}

	/// Ranks every position against `operands`; `None` if any position fails to match.
	pub(crate) fn rank(&self, operands: &[Operand]) -> Option<RankVec> {
		if operands.len() != self.operands.len() {
			return None;
		}
		self.operands.iter().zip(operands).map(|(pattern, operand)| pattern.rank(operand)).collect()
	}
}

impl fmt::Display for DispatchKey {
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

impl FromStr for DispatchKey {
	type Err = BehaviorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

#[derive(Debug, Clone)]
enum Pending {
	Tag(DepthMarker, String),
	Ready(OperandPattern),
}

/// Incremental key construction; validation is deferred to [`KeyBuilder::build`].
#[derive(Debug, Clone)]
pub struct KeyBuilder {
	op: Operation,
	pending: SmallVec<[Pending; 2]>,
}

impl KeyBuilder {
	pub fn tag(self, tag: impl Into<String>) -> Self {
		self.push_tag(DepthMarker::Exact, tag.into())
	}

	pub fn one_level(self, tag: impl Into<String>) -> Self {
		self.push_tag(DepthMarker::OneLevel, tag.into())
	}

	pub fn any_depth(self, tag: impl Into<String>) -> Self {
		self.push_tag(DepthMarker::AnyDepth, tag.into())
	}

	pub fn category(mut self, category: Category) -> Self {
		self.pending.push(Pending::Ready(OperandPattern::Category(category)));
		self
	}

	pub fn pattern(mut self, pattern: OperandPattern) -> Self {
		self.pending.push(Pending::Ready(pattern));
		self
	}

	fn push_tag(mut self, depth: DepthMarker, tag: String) -> Self {
		self.pending.push(Pending::Tag(depth, tag));
		self
	}

	pub fn build(self) -> Result<DispatchKey, BehaviorError> {
		let operands = self
			.pending
			.into_iter()
			.map(|pending| match pending {
				Pending::Tag(depth, tag) => OperandPattern::tag(&tag, depth),
				Pending::Ready(pattern) => Ok(pattern),
			})
			.collect::<Result<SmallVec<[OperandPattern; 2]>, _>>()?;
		DispatchKey::new(self.op, operands)
	}
}

/// Anything that normalizes into a [`DispatchKey`].
pub trait IntoKey {
	fn into_key(self) -> Result<DispatchKey, BehaviorError>;
}

impl IntoKey for DispatchKey {
	fn into_key(self) -> Result<DispatchKey, BehaviorError> {
		Ok(self)
	}
}

impl IntoKey for &DispatchKey {
	fn into_key(self) -> Result<DispatchKey, BehaviorError> {
		Ok(self.clone())
	}
}

impl IntoKey for &str {
	fn into_key(self) -> Result<DispatchKey, BehaviorError> {
		DispatchKey::parse(self)
	}
}

impl IntoKey for String {
	fn into_key(self) -> Result<DispatchKey, BehaviorError> {
		DispatchKey::parse(&self)
	}
}

impl IntoKey for KeyBuilder {
	fn into_key(self) -> Result<DispatchKey, BehaviorError> {
		self.build()
	}
}
