use super::*;
use crate::core::Operand;
use crate::resolve::Dispatch;

#[test]
fn empty_input_uses_defaults() {
	let config = BehaviorConfig::from_toml_str("").unwrap();
	assert_eq!(config, BehaviorConfig::default());
	assert!(config.seed_builtins);
	assert!(config.strict_tagged);
}

#[test]
fn full_config_builds_registry() {
	let config = BehaviorConfig::from_toml_str(
		r#"
seed_builtins = true
builtins = ["string"]
strict_tagged = false

[typestr]
point = "Point"
"#,
	)
	.unwrap();

	let registry = BehaviorRegistry::from_config("config-test", &config).unwrap();
	assert_eq!(registry.type_str("point").as_deref(), Some("Point"));
	assert_eq!(registry.type_str("string").as_deref(), Some("string"));
	assert_eq!(registry.type_str("categorical"), None);

	let key = DispatchKey::parse("__typestr__(point)").unwrap();
	assert_eq!(registry.snapshot().entry(&key).unwrap().source, BehaviorSource::Config);
}

#[test]
fn lenient_resolver_falls_back_on_tagged_operands() {
	let config = BehaviorConfig {
		seed_builtins: false,
		strict_tagged: false,
		..BehaviorConfig::default()
	};
	let registry = BehaviorRegistry::from_config("lenient", &config).unwrap();
	assert!(registry.is_empty());

	let resolver = Resolver::with_config(registry.snapshot(), &config);
	let operands = [Operand::tagged("point", 1), Operand::tagged("point", 1)];
	assert!(matches!(resolver.require(&Operation::ufunc("add"), &operands), Ok(Dispatch::Fallback)));
}

#[test]
fn unknown_fields_are_rejected() {
	let err = BehaviorConfig::from_toml_str("seed = true").unwrap_err();
	assert!(matches!(err, BehaviorError::Config(_)));
}

#[test]
fn invalid_typestr_tag_is_rejected() {
	let config = BehaviorConfig {
		seed_builtins: false,
		typestr: BTreeMap::from([("not a tag".to_string(), "X".to_string())]),
		..BehaviorConfig::default()
	};
	let err = BehaviorRegistry::from_config("bad", &config).unwrap_err();
	assert!(matches!(err, BehaviorError::InvalidKey { .. }));
}
