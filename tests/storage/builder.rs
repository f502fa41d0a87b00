//! Building and cascading removal

use arbor_foundation::{EntitySource, ErrorKind, Value};
use arbor_storage::{EntityStorage, NewEntity};

use crate::model::{file, model};

#[test]
fn add_entity_tree_and_read_back() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let module = builder
        .add_entity(
            m.module("core", &src)
                .with_child(m.module_roots, m.content_root("file://core/src", &src))
                .with_child(m.module_roots, m.content_root("file://core/test", &src))
                .with_child(m.module_facets, m.facet("spring", &src)),
        )
        .unwrap();

    let view = builder.entity(module.id()).unwrap();
    assert_eq!(view.str_field("name"), Some("core"));
    assert_eq!(view.source(), &src);
    let urls: Vec<_> = view
        .children(m.module_roots)
        .iter()
        .filter_map(|root| root.str_field("url"))
        .collect();
    assert_eq!(urls, vec!["file://core/src", "file://core/test"]);

    let root = view.children(m.module_roots)[0].handle();
    assert_eq!(builder.parent_of(root.id(), m.module_roots).unwrap().handle(), module);
    assert_eq!(builder.resolve(&m.module_id("core")).unwrap().handle(), module);
    assert_eq!(builder.collect_changes().added_count(), 4);
    builder.assert_consistency().unwrap();
}

#[test]
fn mandatory_child_needs_a_parent() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let err = builder.add_entity(m.content_root("file://orphan", &src)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MandatoryParentMissing { .. }));
    assert!(!builder.has_changes());

    // Detachable children are fine on their own
    builder.add_entity(m.facet("web", &src)).unwrap();
    assert_eq!(builder.entity_count(m.facet), 1);
}

#[test]
fn unknown_and_mistyped_fields_are_rejected() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();

    let err = builder
        .add_entity(m.module("core", &src).with_field("colour", "blue"))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownField { .. }));

    let err = builder
        .add_entity(NewEntity::new(m.module, src.clone()).with_field("name", 7_i64))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::FieldTypeMismatch { .. }));
    assert_eq!(builder.entity_count(m.module), 0);
}

#[test]
fn removing_parent_cascades_to_mandatory_children_only() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();

    let p1 = builder
        .add_entity(m.module("p1", &src).with_child(m.module_roots, m.content_root("file://c1", &src)))
        .unwrap();
    let c1 = builder.children_of(p1.id(), m.module_roots)[0].handle();
    assert!(builder.remove_entity(p1));
    assert!(builder.entity(c1.id()).is_none());
    assert_eq!(builder.entity_count(m.content_root), 0);

    let p2 = builder
        .add_entity(m.module("p2", &src).with_child(m.module_facets, m.facet("c2", &src)))
        .unwrap();
    let c2 = builder.children_of(p2.id(), m.module_facets)[0].handle();
    builder
        .modify_entity(p2, |e| e.set_children(m.module_facets, &[]))
        .unwrap();
    let survivor = builder.entity(c2.id()).unwrap();
    assert_eq!(survivor.str_field("name"), Some("c2"));
    assert!(survivor.parent(m.module_facets).is_none());
    builder.assert_consistency().unwrap();
}

#[test]
fn reparenting_moves_detachable_child() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let a = builder
        .add_entity(m.module("a", &src).with_child(m.module_facets, m.facet("web", &src)))
        .unwrap();
    let b = builder.add_entity(m.module("b", &src)).unwrap();
    let facet = builder.children_of(a.id(), m.module_facets)[0].handle();

    builder
        .modify_entity(facet, |e| e.set_parent(m.module_facets, Some(b)))
        .unwrap();

    assert!(builder.children_of(a.id(), m.module_facets).is_empty());
    assert_eq!(builder.children_of(b.id(), m.module_facets)[0].handle(), facet);
    builder.assert_consistency().unwrap();
}

#[test]
fn soft_links_follow_renames() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let junit = builder.add_entity(m.library("junit", &src)).unwrap();
    builder
        .add_entity(
            m.module("app", &src)
                .with_field("dependencies", vec![m.library_id("junit"), m.module_id("core")]),
        )
        .unwrap();

    let referrers = builder.referrers(&m.library_id("junit"), m.module);
    assert_eq!(referrers.len(), 1);
    assert_eq!(referrers[0].str_field("name"), Some("app"));

    builder
        .modify_entity(junit, |e| e.set("name", "junit5"))
        .unwrap();

    assert!(builder.referrers(&m.library_id("junit"), m.module).is_empty());
    let app = builder.resolve(&m.module_id("app")).unwrap();
    let Some(Value::List(dependencies)) = app.field("dependencies") else {
        panic!("dependencies should be a list");
    };
    assert_eq!(dependencies[0], Value::from(m.library_id("junit5")));
    builder.assert_consistency().unwrap();
}

#[test]
fn change_source_moves_entity_between_files() {
    let m = model();
    let mut builder = m.builder();
    let module = builder.add_entity(m.module("core", &file("a.iml"))).unwrap();
    builder.change_source(module, file("b.iml")).unwrap();

    let from_a = |s: &EntitySource| s.config_path() == Some("a.iml");
    let from_b = |s: &EntitySource| s.config_path() == Some("b.iml");
    assert_eq!(builder.entities_by_source(&from_a).count(), 0);
    let in_b: Vec<_> = builder
        .entities_by_source(&from_b)
        .map(|e| e.handle())
        .collect();
    assert_eq!(in_b, vec![module]);
}

#[test]
fn modification_count_tracks_writes() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    assert_eq!(builder.modification_count(), 0);
    let module = builder.add_entity(m.module("core", &src)).unwrap();
    builder
        .modify_entity(module, |e| e.set("output", "out/core"))
        .unwrap();
    assert!(builder.modification_count() >= 2);

    let before = builder.modification_count();
    assert!(builder.remove_entity(module));
    assert!(builder.modification_count() > before);
}
