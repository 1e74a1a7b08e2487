use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::bundle::Bundle;

/// Type-erased function value stored opaquely by the registry.
///
/// The registry never calls handlers; the caller downcasts to the signature it
/// expects for the operation it is dispatching.
#[derive(Clone)]
pub struct Callable {
	name: Arc<str>,
	func: Arc<dyn Any + Send + Sync>,
}

impl Callable {
	pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
	where
		F: Any + Send + Sync,
	{
		Self {
			name: name.into(),
			func: Arc::new(func),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn downcast<F: Any>(&self) -> Option<&F> {
		self.func.downcast_ref::<F>()
	}

	/// True if both values share the same underlying function allocation.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.func, &other.func)
	}
}

impl fmt::Debug for Callable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Callable").field(&self.name).finish()
	}
}

/// Value bound to a dispatch key.
#[derive(Clone, Debug)]
pub enum Handler {
	Callable(Callable),
	/// A composed class replacing a node's representation.
	Class(Arc<Bundle>),
	/// Plain text; only valid for the display-name key.
	Label(Arc<str>),
}

impl Handler {
	pub fn callable<F>(name: impl Into<Arc<str>>, func: F) -> Self
	where
		F: Any + Send + Sync,
	{
		Self::Callable(Callable::new(name, func))
	}

	pub fn label(text: impl Into<Arc<str>>) -> Self {
		Self::Label(text.into())
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Callable(callable) => callable.name(),
			Self::Class(bundle) => bundle.name(),
			Self::Label(text) => text,
		}
	}

	pub fn as_callable(&self) -> Option<&Callable> {
		match self {
			Self::Callable(callable) => Some(callable),
			_ => None,
		}
	}

	pub fn as_class(&self) -> Option<&Arc<Bundle>> {
		match self {
			Self::Class(bundle) => Some(bundle),
			_ => None,
		}
	}

	pub fn as_label(&self) -> Option<&str> {
		match self {
			Self::Label(text) => Some(text),
			_ => None,
		}
	}

	/// Identity comparison: same function allocation, same class, or equal label.
	pub fn same(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Callable(a), Self::Callable(b)) => a.ptr_eq(b),
			(Self::Class(a), Self::Class(b)) => Arc::ptr_eq(a, b),
			(Self::Label(a), Self::Label(b)) => a == b,
			_ => false,
		}
	}

	pub(crate) fn kind_name(&self) -> &'static str {
		match self {
			Self::Callable(_) => "callable",
			Self::Class(_) => "class",
			Self::Label(_) => "label",
		}
	}
}

impl From<Callable> for Handler {
	fn from(callable: Callable) -> Self {
		Self::Callable(callable)
	}
}

impl From<Arc<Bundle>> for Handler {
	fn from(bundle: Arc<Bundle>) -> Self {
		Self::Class(bundle)
	}
}

/// Where a registry entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BehaviorSource {
	/// Seeded from a built-in group.
	Builtin(&'static str),
	/// Declarative configuration.
	Config,
	/// Flattened from a bundle definition.
	Bundle(Arc<str>),
	/// Registered directly at runtime.
	Runtime,
}

impl fmt::Display for BehaviorSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Builtin(group) => write!(f, "builtin:{group}"),
			Self::Config => f.write_str("config"),
			Self::Bundle(name) => write!(f, "bundle:{name}"),
			Self::Runtime => f.write_str("runtime"),
		}
	}
}
