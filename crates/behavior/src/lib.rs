//! Tag-keyed behavior dispatch for jagged arrays.
//!
//! Array and record nodes carry an optional type tag (`"point"`, `"string"`)
//! and a nesting depth. This crate maps dispatch keys built from an
//! [`Operation`] and per-operand [`OperandPattern`]s to user-supplied
//! [`Handler`]s, and resolves runtime requests against them.
//!
//! # Modules
//!
//! - [`core`] - keys, operands, handlers and errors
//! - [`registry`] - the snapshot-published [`BehaviorRegistry`] and the process-wide instance
//! - [`resolve`] - precedence-ordered [`Resolver`]
//! - [`bundle`] - mixin bundles flattened into the registry at definition time
//! - [`builtins`] - string and categorical behaviors seeded at startup
//! - [`config`] - declarative registry setup
//!
//! # Example
//!
//! ```
//! use jagged_behavior::{BehaviorRegistry, Handler, Operand, Operation};
//!
//! fn point_equal(_: &[f64], _: &[f64]) -> bool {
//! 	true
//! }
//!
//! let registry = BehaviorRegistry::new("example");
//! registry
//! 	.register("equal(point, point)", Handler::callable("point_equal", point_equal as fn(&[f64], &[f64]) -> bool))
//! 	.unwrap();
//!
//! let hit = registry
//! 	.resolve(&Operation::ufunc("equal"), &[Operand::tagged("point", 1), Operand::tagged("point", 1)])
//! 	.unwrap();
//! assert_eq!(hit.handler().name(), "point_equal");
//! ```

pub mod builtins;
pub mod bundle;
pub mod config;
pub mod core;
pub mod registry;
pub mod resolve;

pub use bundle::{Binding, Bundle, BundleDef, BundlePattern, MemberKind, define_bundle};
pub use config::BehaviorConfig;
pub use crate::core::{
	BehaviorError, BehaviorSource, Callable, Category, DepthMarker, DispatchKey, Handler, IntoKey, KeyBuilder, Operand, OperandPattern,
	OperandTag, Operation, PrimitiveKind, TypeTag,
};
pub use registry::{BehaviorRegistry, BehaviorSnapshot, IsolationGuard, global, isolate};
pub use resolve::{Dispatch, Resolution, Resolver};
