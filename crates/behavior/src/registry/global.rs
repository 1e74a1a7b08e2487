//! Process-wide registry instance and test isolation.

use std::sync::OnceLock;

use parking_lot::{Mutex, MutexGuard, const_mutex};

use super::{BehaviorRegistry, BehaviorSnapshot};
use crate::builtins;

static GLOBAL: OnceLock<BehaviorRegistry> = OnceLock::new();
static ISOLATION: Mutex<()> = const_mutex(());

/// Returns the process-wide registry, seeding built-ins on first access.
pub fn global() -> &'static BehaviorRegistry {
	GLOBAL.get_or_init(|| {
		let registry = BehaviorRegistry::new("global");
		if let Err(e) = builtins::seed(&registry, None) {
			tracing::error!(domain = "behavior", "builtin behavior seeding failed: {e}");
		}
		registry
	})
}

/// Serializes access to the global registry and rolls it back on drop.
///
/// Tests that mutate [`global`] hold one of these for their whole body, so
/// parallel test threads never observe each other's registrations.
pub fn isolate() -> IsolationGuard {
	let lock = ISOLATION.lock();
	let registry = global();
	IsolationGuard {
		registry,
		saved: registry.snapshot(),
		_lock: lock,
	}
}

#[must_use = "the global registry is restored when the guard drops"]
pub struct IsolationGuard {
	registry: &'static BehaviorRegistry,
	saved: BehaviorSnapshot,
	_lock: MutexGuard<'static, ()>,
}

impl IsolationGuard {
	pub fn registry(&self) -> &'static BehaviorRegistry {
		self.registry
	}
}

impl Drop for IsolationGuard {
	fn drop(&mut self) {
		self.registry.restore(&self.saved);
	}
}
