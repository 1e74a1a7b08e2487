use super::*;

#[test]
fn parse_normalizes_whitespace() {
	let key = DispatchKey::parse("  equal( point ,*point )").unwrap();
	assert_eq!(key.to_string(), "equal(point, *point)");
	assert_eq!(key, DispatchKey::parse("equal(point, *point)").unwrap());
	assert_eq!(key.arity(), 2);
}

#[test]
fn parse_every_marker() {
	let key = DispatchKey::parse("add(point, .point, *point, #real)").unwrap();
	assert_eq!(key.operands(), &[
		OperandPattern::exact("point").unwrap(),
		OperandPattern::one_level("point").unwrap(),
		OperandPattern::any_depth("point").unwrap(),
		OperandPattern::Category(Category::Real),
	]);
}

#[test]
fn reserved_operations_round_trip_through_display() {
	for raw in ["__ufunc__(point)", "__typestr__(point)", "__broadcast__(*string)", "__class__(*point)", ".norm(*point)", "reduce:sum(point)"] {
		let key = DispatchKey::parse(raw).unwrap();
		assert_eq!(key.to_string(), raw);
	}
}

#[test]
fn builder_matches_parser() {
	let built = DispatchKey::builder(Operation::ufunc("multiply"))
		.any_depth("vector")
		.category(Category::Number)
		.build()
		.unwrap();
	assert_eq!(built, DispatchKey::parse("multiply(*vector, #number)").unwrap());
}

#[test]
fn category_aliases() {
	assert_eq!(Category::parse("numbers.Real"), Some(Category::Real));
	assert_eq!(Category::parse("int"), Some(Category::Integer));
	assert_eq!(Category::parse("complex"), Some(Category::Number));
	assert_eq!(Category::parse("string"), None);
	assert_eq!(DispatchKey::parse("add(#float)").unwrap().to_string(), "add(#real)");
}

#[test]
fn invalid_keys_are_rejected() {
	let cases = [
		"equal",
		"equal(point",
		"equal()",
		"equal(**point)",
		"equal(.*point)",
		"equal(#widget)",
		"equal(@point)",
		"equal(point,)",
		"__typestr__(*point)",
		"__typestr__(point, point)",
		"__class__(#real)",
		".norm(#real)",
		"__custom__(point)",
		"reduce:(point)",
		"my op(point)",
	];
	for raw in cases {
		match DispatchKey::parse(raw) {
			Err(BehaviorError::InvalidKey { key, .. }) => assert_eq!(key, raw, "error should carry the full key"),
			other => panic!("{raw:?} should be rejected, got {other:?}"),
		}
	}
}

#[test]
fn depth_markers_admit_expected_depths() {
	assert!(DepthMarker::Exact.admits(1));
	assert!(!DepthMarker::Exact.admits(2));
	assert!(DepthMarker::OneLevel.admits(2));
	assert!(!DepthMarker::OneLevel.admits(3));
	assert!(DepthMarker::AnyDepth.admits(5));
	assert!(!DepthMarker::AnyDepth.admits(0));
}

#[test]
fn ranks_prefer_tags_over_categories() {
	let operand = Operand::tagged("point", 1).with_kind(PrimitiveKind::Float);
	let exact = OperandPattern::exact("point").unwrap().rank(&operand);
	let any = OperandPattern::any_depth("point").unwrap().rank(&operand);
	let real = OperandPattern::Category(Category::Real).rank(&operand);
	let everything = OperandPattern::Category(Category::Any).rank(&operand);

	assert!(exact < any);
	assert!(any < real);
	assert!(real < everything);
	assert_eq!(OperandPattern::one_level("point").unwrap().rank(&operand), None);
}

#[test]
fn scalar_never_matches_a_tag() {
	let scalar = Operand::plain(PrimitiveKind::Int);
	assert_eq!(OperandPattern::any_depth("point").unwrap().rank(&scalar), None);
	assert_eq!(OperandPattern::Category(Category::Integer).rank(&scalar), Some(4));
}

#[test]
fn categories_nest_like_the_number_tower() {
	let bool_scalar = Operand::plain(PrimitiveKind::Bool);
	let ranks: Vec<_> = [Category::Bool, Category::Integer, Category::Real, Category::Number, Category::Any]
		.into_iter()
		.map(|category| OperandPattern::Category(category).rank(&bool_scalar))
		.collect();
	assert!(ranks.iter().all(Option::is_some), "bool is admitted by every category: {ranks:?}");
	assert!(ranks.windows(2).all(|pair| pair[0] < pair[1]), "ranks strictly increase: {ranks:?}");

	assert!(Category::Integer.admits(PrimitiveKind::UInt));
	assert!(!Category::Integer.admits(PrimitiveKind::Float));
	assert!(!Category::Bool.admits(PrimitiveKind::Int));
}
