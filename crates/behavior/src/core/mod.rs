//! Shared dispatch vocabulary.

pub mod error;
pub mod handler;
pub mod key;
pub mod operand;

pub use error::BehaviorError;
pub use handler::{BehaviorSource, Callable, Handler};
pub use key::{Category, DepthMarker, DispatchKey, IntoKey, KeyBuilder, OperandPattern, Operation, TypeTag};
pub use operand::{Operand, OperandTag, PrimitiveKind};
