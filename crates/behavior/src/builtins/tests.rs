use super::categorical::{CategoricalCompare, CategoricalView};
use super::string::{BroadcastHook, BroadcastRule, StrCompare};
use super::*;
use crate::core::{Operand, Operation};

fn seeded() -> BehaviorRegistry {
	BehaviorRegistry::with_builtins("builtins-test").unwrap()
}

#[test]
fn groups_are_collected() {
	assert_eq!(groups(), vec!["categorical", "string"]);
}

#[test]
fn string_display_names() {
	let registry = seeded();
	assert_eq!(registry.type_str("string").as_deref(), Some("string"));
	assert_eq!(registry.type_str("bytestring").as_deref(), Some("bytes"));
	assert_eq!(registry.type_str("char").as_deref(), Some("char"));
	assert_eq!(registry.type_str("categorical").as_deref(), Some("categorical"));
	assert_eq!(registry.type_str("point"), None);
}

#[test]
fn string_equality_dispatches_to_builtin() {
	let registry = seeded();
	let operands = [Operand::tagged("string", 1), Operand::tagged("string", 1)];
	let hit = registry.resolve(&Operation::ufunc("equal"), &operands).unwrap();
	assert_eq!(hit.handler().name(), "string.equal");

	let compare = hit.handler().as_callable().unwrap().downcast::<StrCompare>().unwrap();
	assert_eq!(compare(&["a", "bc", "d"], &["a", "bd", "d"]), vec![true, false, true]);
}

#[test]
fn strings_broadcast_atomically() {
	let registry = seeded();
	let operand = Operand::tagged("string", 2);
	let hit = registry.resolver().broadcast_hook(&operand).unwrap();
	let hook = hit.handler().as_callable().unwrap().downcast::<BroadcastHook>().unwrap();
	assert_eq!(hook(&operand), BroadcastRule::Atomic);
}

#[test]
fn categorical_compares_by_value() {
	let registry = seeded();
	let operands = [Operand::tagged("categorical", 2), Operand::tagged("categorical", 1)];
	let hit = registry.resolve(&Operation::ufunc("equal"), &operands).unwrap();
	let compare = hit.handler().as_callable().unwrap().downcast::<CategoricalCompare>().unwrap();

	let left = CategoricalView::new(&[0, 1, -1], &["red", "blue"]);
	let right = CategoricalView::new(&[1, 1, -1], &["blue", "red"]);
	assert_eq!(compare(left, right), vec![true, false, false]);
}

#[test]
fn allowlist_limits_seeding() {
	let registry = BehaviorRegistry::new("allowlist");
	let only = vec!["categorical".to_string(), "missing".to_string()];
	let seeded = seed(&registry, Some(only.as_slice())).unwrap();

	assert_eq!(seeded, 3);
	assert_eq!(registry.type_str("string"), None);
	assert_eq!(registry.type_str("categorical").as_deref(), Some("categorical"));
}

#[test]
fn seeded_entries_record_their_group() {
	let registry = seeded();
	let key = crate::core::DispatchKey::parse("__typestr__(string)").unwrap();
	let snapshot = registry.snapshot();
	assert_eq!(snapshot.entry(&key).unwrap().source, BehaviorSource::Builtin("string"));
}
