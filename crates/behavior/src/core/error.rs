use super::operand::OperandTag;

/// Errors raised by registration, resolution and bundle composition.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
	/// A key was rejected during normalization; it never reaches the registry.
	#[error("invalid dispatch key {key:?}: {reason}")]
	InvalidKey { key: String, reason: String },

	/// Every operand is tagged and nothing handles the operation.
	#[error("unsupported operation {} on operands [{}]", .operation, render_tags(.tags))]
	UnsupportedOperation { operation: String, tags: Vec<OperandTag> },

	/// A bundle could not be linearized or would shadow a sealed member.
	#[error("cannot compose bundle {bundle:?}: {key}: {reason}")]
	CompositionConflict { bundle: String, key: String, reason: String },

	#[error("invalid behavior config: {0}")]
	Config(#[from] toml::de::Error),
}

impl BehaviorError {
	pub(crate) fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidKey {
			key: key.into(),
			reason: reason.into(),
		}
	}

	pub(crate) fn conflict(bundle: &str, key: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::CompositionConflict {
			bundle: bundle.to_string(),
			key: key.into(),
			reason: reason.into(),
		}
	}
}

fn render_tags(tags: &[OperandTag]) -> String {
	tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
