use super::*;
use crate::core::{Category, Operand};

type Distance = fn(&[f64], &[f64]) -> f64;

fn distance(a: &[f64], b: &[f64]) -> f64 {
	a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

fn marker(name: &str) -> Handler {
	Handler::callable(name.to_string(), ())
}

fn point(registry: &BehaviorRegistry) -> Arc<Bundle> {
	BundleDef::new("point")
		.method("distance", Handler::callable("point.distance", distance as Distance))
		.property("magnitude", marker("point.magnitude"))
		.bind_method(Operation::ufunc("equal"), [BundlePattern::this()], marker("point.equal"))
		.define(registry)
		.unwrap()
}

#[test]
fn derived_bundle_inherits_members() {
	let registry = BehaviorRegistry::new("bundles");
	let base = point(&registry);
	let weighted = define_bundle("weighted_point", &[base.clone()])
		.property("weight", marker("weighted_point.weight"))
		.define(&registry)
		.unwrap();

	assert_eq!(weighted.mro(), vec!["weighted_point", "point"]);
	assert!(weighted.is_a("point"));
	assert!(!base.is_a("weighted_point"));

	let operand = Operand::tagged("weighted_point", 1);
	let hit = registry.resolver().member("distance", &operand).unwrap();
	let f = hit.handler().as_callable().unwrap().downcast::<Distance>().unwrap();
	assert_eq!(f(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
	assert_eq!(hit.key().to_string(), ".distance(*weighted_point)");

	let names: Vec<_> = weighted.members().map(|(name, _)| name).collect();
	assert_eq!(names, vec!["weight", "distance", "magnitude"]);
}

#[test]
fn inherited_operator_is_rebound_to_derived_tag() {
	let registry = BehaviorRegistry::new("bundles");
	let base = point(&registry);
	define_bundle("weighted_point", &[base]).define(&registry).unwrap();

	let operands = [Operand::tagged("weighted_point", 2), Operand::tagged("weighted_point", 1)];
	let hit = registry.resolve(&Operation::ufunc("equal"), &operands).unwrap();
	assert_eq!(hit.handler().name(), "point.equal");

	let mixed = [Operand::tagged("weighted_point", 1), Operand::tagged("point", 1)];
	assert!(registry.resolve(&Operation::ufunc("equal"), &mixed).is_none());
}

#[test]
fn own_declaration_overrides_inherited() {
	let registry = BehaviorRegistry::new("bundles");
	let base = point(&registry);
	let derived = define_bundle("weighted_point", &[base])
		.method("distance", marker("weighted_point.distance"))
		.define(&registry)
		.unwrap();

	assert_eq!(derived.member("distance").unwrap().name(), "weighted_point.distance");
	let hit = registry.resolver().member("distance", &Operand::tagged("point", 1)).unwrap();
	assert_eq!(hit.handler().name(), "point.distance");
}

#[test]
fn leftmost_base_wins() {
	let left = BundleDef::new("left").method("describe", marker("left.describe")).compose().unwrap();
	let right = BundleDef::new("right").method("describe", marker("right.describe")).compose().unwrap();
	let both = define_bundle("both", &[left, right]).compose().unwrap();

	assert_eq!(both.member("describe").unwrap().name(), "left.describe");
	assert_eq!(both.mro(), vec!["both", "left", "right"]);
}

#[test]
fn diamond_linearizes_once() {
	let root = BundleDef::new("root").method("describe", marker("root.describe")).compose().unwrap();
	let b = define_bundle("b", &[root.clone()]).compose().unwrap();
	let c = define_bundle("c", &[root.clone()]).method("describe", marker("c.describe")).compose().unwrap();
	let d = define_bundle("d", &[b, c]).compose().unwrap();

	assert_eq!(d.mro(), vec!["d", "b", "c", "root"]);
	assert_eq!(d.member("describe").unwrap().name(), "c.describe");
}

#[test]
fn sealed_member_cannot_be_shadowed() {
	let base = BundleDef::new("base").sealed_property("id", marker("base.id")).compose().unwrap();
	let err = define_bundle("derived", &[base.clone()]).property("id", marker("derived.id")).compose().unwrap_err();
	assert!(matches!(err, BehaviorError::CompositionConflict { .. }));

	let unrelated = BundleDef::new("other").property("id", marker("other.id")).compose().unwrap();
	let err = define_bundle("mixed", &[base.clone(), unrelated]).compose().unwrap_err();
	assert!(matches!(err, BehaviorError::CompositionConflict { .. }));

	let ok = define_bundle("plain", &[base]).compose().unwrap();
	assert_eq!(ok.member("id").unwrap().name(), "base.id");
}

#[test]
fn sealed_override_is_inherited_cleanly() {
	let root = BundleDef::new("root").property("id", marker("root.id")).compose().unwrap();
	let mid = define_bundle("mid", &[root]).sealed_property("id", marker("mid.id")).compose().unwrap();
	let leaf = define_bundle("leaf", &[mid]).compose().unwrap();
	assert_eq!(leaf.member("id").unwrap().name(), "mid.id");
}

#[test]
fn inconsistent_hierarchy_is_rejected() {
	let a = BundleDef::new("a").compose().unwrap();
	let b = define_bundle("b", &[a.clone()]).compose().unwrap();
	let err = define_bundle("c", &[a, b]).compose().unwrap_err();
	assert!(matches!(err, BehaviorError::CompositionConflict { .. }));
}

#[test]
fn distinct_bundles_sharing_a_name_are_rejected() {
	let first = BundleDef::new("shape").compose().unwrap();
	let second = BundleDef::new("shape").compose().unwrap();
	let err = define_bundle("both", &[first, second]).compose().unwrap_err();
	assert!(matches!(err, BehaviorError::CompositionConflict { .. }));
}

#[test]
fn define_registers_record_and_array_classes() {
	let registry = BehaviorRegistry::new("bundles");
	let base = point(&registry);
	let resolver = registry.resolver();

	let record = resolver.node_class(&Operand::tagged("point", 1)).unwrap();
	let array = resolver.node_class(&Operand::tagged("point", 3)).unwrap();
	assert!(Arc::ptr_eq(&record, &base));
	assert!(Arc::ptr_eq(&array, &base));
	assert!(resolver.node_class(&Operand::tagged("vector", 1)).is_none());
}

#[test]
fn attach_as_reuses_bundle_under_another_tag() {
	let registry = BehaviorRegistry::new("bundles");
	let base = point(&registry);
	let published = Bundle::attach_as(&base, &registry, "point3d").unwrap();

	assert_eq!(published, 5);
	let class = registry.resolver().node_class(&Operand::tagged("point3d", 1)).unwrap();
	assert_eq!(class.name(), "point");
	assert!(registry.resolver().member("magnitude", &Operand::tagged("point3d", 2)).is_some());
}

#[test]
fn transposed_binding_declares_both_orders() {
	let registry = BehaviorRegistry::new("bundles");
	BundleDef::new("vector")
		.bind_transposed(Operation::ufunc("multiply"), OperandPattern::Category(Category::Real).into(), marker("vector.scale"))
		.define(&registry)
		.unwrap();

	let vector = Operand::tagged("vector", 1);
	let scalar = Operand::plain(crate::core::PrimitiveKind::Float);
	let multiply = Operation::ufunc("multiply");
	assert!(registry.resolve(&multiply, &[vector.clone(), scalar.clone()]).is_some());
	assert!(registry.resolve(&multiply, &[scalar, vector]).is_some());
}

#[test]
fn redefinition_retires_dropped_members() {
	let registry = BehaviorRegistry::new("bundles");
	BundleDef::new("point")
		.method("norm", marker("old.norm"))
		.method("distance", marker("old.distance"))
		.define(&registry)
		.unwrap();
	let replacement = BundleDef::new("point").method("distance", marker("new.distance")).define(&registry).unwrap();

	let resolver = registry.resolver();
	let operand = Operand::tagged("point", 1);
	let class = resolver.node_class(&operand).unwrap();
	assert!(Arc::ptr_eq(&class, &replacement));
	assert!(class.member("norm").is_none());
	assert!(resolver.member("norm", &operand).is_none());
	assert_eq!(resolver.member("distance", &operand).unwrap().handler().name(), "new.distance");
	assert_eq!(registry.len(), 3);
}

#[test]
fn redefinition_keeps_runtime_overrides() {
	let registry = BehaviorRegistry::new("bundles");
	BundleDef::new("point").method("norm", marker("old.norm")).define(&registry).unwrap();
	registry.register(".norm(*point)", marker("runtime.norm")).unwrap();
	BundleDef::new("point").method("distance", marker("new.distance")).define(&registry).unwrap();

	let hit = registry.resolver().member("norm", &Operand::tagged("point", 1)).unwrap();
	assert_eq!(hit.handler().name(), "runtime.norm");
}

#[test]
fn redefinition_is_a_single_publication() {
	let registry = BehaviorRegistry::new("bundles");
	BundleDef::new("point").method("norm", marker("old.norm")).define(&registry).unwrap();
	let before = registry.generation();
	BundleDef::new("point").method("distance", marker("new.distance")).define(&registry).unwrap();
	assert_eq!(registry.generation(), before + 1);
}
