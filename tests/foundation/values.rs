//! Integration tests for field values and symbolic ids

use arbor_foundation::{ClassId, EntitySource, FieldKind, SymbolicEntityId, Value, intern};

#[test]
fn symbolic_ids_compare_by_class_and_parts() {
    let module = intern::class_id("values.Module");
    let library = intern::class_id("values.Library");

    assert_eq!(
        SymbolicEntityId::named(module, "core"),
        SymbolicEntityId::named(module, "core")
    );
    assert_ne!(
        SymbolicEntityId::named(module, "core"),
        SymbolicEntityId::named(library, "core")
    );
    assert_eq!(
        SymbolicEntityId::named(module, "core").to_string(),
        "values.Module(core)"
    );
}

#[test]
fn soft_links_are_found_inside_lists() {
    let module = intern::class_id("values.Dependency");
    let a = SymbolicEntityId::named(module, "a");
    let b = SymbolicEntityId::named(module, "b");
    let value = Value::from(vec![a.clone(), b.clone()]);

    let mut seen = Vec::new();
    value.for_each_symbolic(&mut |id| seen.push(id.clone()));
    assert_eq!(seen, vec![a.clone(), b.clone()]);

    let renamed = SymbolicEntityId::named(module, "renamed");
    let rewritten = value.replace_symbolic(&a, &renamed).unwrap();
    assert_eq!(rewritten, Value::from(vec![renamed, b]));
}

#[test]
fn field_kinds_validate_values() {
    let links = FieldKind::list(FieldKind::Symbolic(Some(ClassId::from_raw(7))));
    let good = Value::from(vec![SymbolicEntityId::named(ClassId::from_raw(7), "x")]);
    let bad = Value::from(vec![SymbolicEntityId::named(ClassId::from_raw(8), "x")]);
    assert!(links.accepts(&good));
    assert!(!links.accepts(&bad));

    let optional = FieldKind::optional(FieldKind::Int);
    assert!(optional.accepts(&Value::Null));
    assert_eq!(optional.default_value(), Some(Value::Null));
    assert_eq!(FieldKind::String.default_value(), None);
    assert!(FieldKind::Float.accepts(&Value::Int(3)));
}

#[test]
fn sources_compare_by_kind_and_tag() {
    let a = EntitySource::config_file("a.iml");
    assert_eq!(a, EntitySource::config_file("a.iml"));
    assert_ne!(a, EntitySource::synthetic("a.iml"));
    assert_eq!(a.config_path(), Some("a.iml"));
    assert!(EntitySource::dummy_parent("x").is_dummy_parent());
}
