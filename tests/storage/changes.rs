//! Change stream collected from builder sessions

use arbor_storage::{EntityChange, EntityStorage};

use crate::model::{file, model};

#[test]
fn ordered_changes_put_removals_first() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let old = builder.add_entity(m.module("old", &src)).unwrap();
    let kept = builder.add_entity(m.module("kept", &src)).unwrap();
    builder.reset_changes();

    builder.add_entity(m.module("new", &src)).unwrap();
    builder.modify_entity(kept, |e| e.set("output", "out")).unwrap();
    builder.remove_entity(old);

    let changes = builder.collect_changes();
    assert_eq!(changes.len(), 3);
    let ordered = changes.ordered_changes();
    assert!(ordered[0].is_removed());
    assert!(ordered[1].is_replaced());
    assert!(ordered[2].is_added());
    assert_eq!(ordered[0].entity(), old);
    assert_eq!(ordered[1].entity(), kept);
    assert_eq!(changes.changes_of(m.module).len(), 3);
    assert!(changes.changes_of(m.facet).is_empty());
}

#[test]
fn add_then_remove_leaves_nothing() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let module = builder
        .add_entity(m.module("tmp", &src).with_child(m.module_roots, m.content_root("file://tmp", &src)))
        .unwrap();
    builder.remove_entity(module);

    assert!(!builder.has_changes());
    assert!(builder.collect_changes().is_empty());
}

#[test]
fn add_then_modify_is_one_add_with_final_data() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let module = builder.add_entity(m.module("draft", &src)).unwrap();
    builder.modify_entity(module, |e| e.set("name", "final")).unwrap();

    let changes = builder.collect_changes();
    assert_eq!(changes.len(), 1);
    match &changes.changes_of(m.module)[0] {
        EntityChange::Added(added) => {
            assert_eq!(added.fields()[0].as_str(), Some("final"));
        }
        other => panic!("expected an add, got {other:?}"),
    }
}

#[test]
fn modify_then_remove_reports_original_data() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let module = builder.add_entity(m.module("core", &src)).unwrap();
    builder.reset_changes();

    builder.modify_entity(module, |e| e.set("name", "renamed")).unwrap();
    builder.remove_entity(module);

    let changes = builder.collect_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes.removed_count(), 1);
    match &changes.changes_of(m.module)[0] {
        EntityChange::Removed(removed) => {
            assert_eq!(removed.fields()[0].as_str(), Some("core"));
            assert_eq!(removed.source(), &src);
        }
        other => panic!("expected a removal, got {other:?}"),
    }
}

#[test]
fn repeated_replacements_keep_first_old_state() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let module = builder.add_entity(m.module("v1", &src)).unwrap();
    builder.reset_changes();

    builder.modify_entity(module, |e| e.set("name", "v2")).unwrap();
    builder.modify_entity(module, |e| e.set("name", "v3")).unwrap();

    let changes = builder.collect_changes();
    assert_eq!(changes.replaced_count(), 1);
    let change = &changes.changes_of(m.module)[0];
    assert_eq!(change.old_data().unwrap().fields()[0].as_str(), Some("v1"));
    assert_eq!(change.new_data().unwrap().fields()[0].as_str(), Some("v3"));
}

#[test]
fn no_op_modification_is_not_a_change() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let module = builder.add_entity(m.module("core", &src)).unwrap();
    builder.reset_changes();

    builder.modify_entity(module, |e| e.set("name", "core")).unwrap();
    assert!(!builder.has_changes());

    // Changing and changing back also cancels out
    builder.modify_entity(module, |e| e.set("output", "out")).unwrap();
    builder.modify_entity(module, |e| e.set("output", arbor_foundation::Value::Null)).unwrap();
    assert!(builder.collect_changes().is_empty());
}

#[test]
fn detaching_a_child_replaces_it() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let module = builder
        .add_entity(m.module("core", &src).with_child(m.module_facets, m.facet("web", &src)))
        .unwrap();
    let facet = builder.children_of(module.id(), m.module_facets)[0].handle();
    builder.reset_changes();

    builder.remove_entity(module);

    let changes = builder.collect_changes();
    assert_eq!(changes.removed_count(), 1);
    let replaced: Vec<_> = changes.changes_of(m.facet).iter().map(EntityChange::entity).collect();
    assert_eq!(replaced, vec![facet]);
}

#[test]
fn changes_remember_base_version() {
    let m = model();
    let src = file("core.iml");
    let mut seed = m.builder();
    seed.add_entity(m.module("core", &src)).unwrap();
    let snapshot = seed.to_snapshot();

    let mut builder = snapshot.to_builder();
    builder.add_entity(m.module("util", &src)).unwrap();
    assert_eq!(builder.collect_changes().base(), Some(snapshot.version()));
    assert_eq!(seed.collect_changes().base(), None);
}

#[test]
fn reloading_an_unchanged_module_keeps_the_same_entities() {
    let m = model();
    let src = file("core.iml");
    let mut seed = m.builder();
    seed.add_entity(
        m.module("core", &src)
            .with_child(m.module_roots, m.content_root("file://core/src", &src))
            .with_child(m.module_roots, m.content_root("file://core/test", &src)),
    )
    .unwrap();
    let snapshot = seed.to_snapshot();

    // Drop the module and load it again as it was
    let mut builder = snapshot.to_builder();
    let core = builder.resolve(&m.module_id("core")).unwrap().handle();
    builder.remove_entity(core);
    builder
        .add_entity(
            m.module("core", &src)
                .with_child(m.module_roots, m.content_root("file://core/test", &src))
                .with_child(m.module_roots, m.content_root("file://core/src", &src)),
        )
        .unwrap();
    assert!(builder.has_changes());
    assert!(builder.has_same_entities());

    // A changed root is a real change
    let mut edited = snapshot.to_builder();
    let core = edited.resolve(&m.module_id("core")).unwrap().handle();
    edited.remove_entity(core);
    edited
        .add_entity(
            m.module("core", &src)
                .with_child(m.module_roots, m.content_root("file://core/src", &src)),
        )
        .unwrap();
    assert!(!edited.has_same_entities());
}
