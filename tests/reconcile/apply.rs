//! Replaying one builder's changes onto another

use std::sync::Arc;

use proptest::prelude::*;

use arbor_foundation::ErrorKind;
use arbor_storage::{EntityStorage, MutableEntityStorage, StoreConfig, SymbolicIdConflict};

use crate::model::{Model, file, model};

/// Module names with their sorted content root urls.
fn layout(m: &Model, storage: &impl EntityStorage) -> Vec<(String, Vec<String>)> {
    let mut layout: Vec<_> = storage
        .entities(m.module)
        .map(|module| {
            let mut roots: Vec<_> = module
                .children(m.module_roots)
                .iter()
                .filter_map(|r| r.str_field("url").map(str::to_string))
                .collect();
            roots.sort();
            (module.str_field("name").unwrap_or_default().to_string(), roots)
        })
        .collect();
    layout.sort();
    layout
}

fn project(m: &Model) -> MutableEntityStorage {
    let src = file("project.iml");
    let mut builder = m.builder();
    for name in ["core", "util", "app"] {
        builder
            .add_entity(
                m.module(name, &src)
                    .with_child(m.module_roots, m.content_root(&format!("file://{name}"), &src)),
            )
            .unwrap();
    }
    builder
}

#[test]
fn background_changes_merge_into_live_builder() {
    let m = model();
    let src = file("project.iml");
    let snapshot = project(&m).to_snapshot();

    // A background task works on its own builder while the live one moves on
    let mut background = snapshot.to_builder();
    let util = background.resolve(&m.module_id("util")).unwrap().handle();
    background.remove_entity(util);
    background.add_entity(m.module("tools", &src)).unwrap();

    let mut live = snapshot.to_builder();
    let app = live.resolve(&m.module_id("app")).unwrap().handle();
    live.modify_entity(app, |e| e.set("output", "out/app")).unwrap();

    live.apply_changes_from(&background).unwrap();

    let names: Vec<_> = layout(&m, &live).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["app", "core", "tools"]);
    assert_eq!(live.entity_count(m.content_root), 2);
    assert_eq!(
        live.resolve(&m.module_id("app")).unwrap().str_field("output"),
        Some("out/app")
    );
    live.assert_consistency().unwrap();
}

#[test]
fn applied_changes_land_in_the_journal() {
    let m = model();
    let snapshot = project(&m).to_snapshot();
    let mut changes = snapshot.to_builder();
    let core = changes.resolve(&m.module_id("core")).unwrap().handle();
    changes.modify_entity(core, |e| e.set("name", "kernel")).unwrap();

    let mut target = snapshot.to_builder();
    target.apply_changes_from(&changes).unwrap();

    let journal = target.collect_changes();
    assert_eq!(journal.replaced_count(), 1);
    assert_eq!(journal.added_count(), 0);
    assert_eq!(journal.removed_count(), 0);
}

#[test]
fn changes_based_on_a_newer_snapshot_are_refused() {
    let m = model();
    let mut live = project(&m);
    let old = live.to_snapshot().to_builder();
    live.add_entity(m.module("newer", &file("project.iml"))).unwrap();
    let newer = live.to_snapshot().to_builder();

    let mut target = old;
    let err = target.apply_changes_from(&newer).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReconciliationPrecondition(_)));

    // The other direction is fine
    live.apply_changes_from(&target).unwrap();
    assert_eq!(live.entity_count(m.module), 4);
}

#[test]
fn strict_builders_check_consistency_after_applying() {
    let m = model();
    let src = file("project.iml");
    let mut target = MutableEntityStorage::create_with_config(
        Arc::clone(&m.registry),
        StoreConfig::strict(),
    );
    target.add_entity(m.module("core", &src)).unwrap();

    let mut scratch = m.builder();
    scratch
        .add_entity(
            m.module("util", &src)
                .with_child(m.module_roots, m.content_root("file://util", &src)),
        )
        .unwrap();
    target.apply_changes_from(&scratch).unwrap();
    assert_eq!(target.entity_count(m.content_root), 1);
}

#[test]
fn roots_added_under_a_module_removed_meanwhile_are_dropped() {
    let m = model();
    let src = file("project.iml");
    let snapshot = project(&m).to_snapshot();

    let mut background = snapshot.to_builder();
    let core = background.resolve(&m.module_id("core")).unwrap().handle();
    background
        .add_entity(m.content_root("file://core/gen", &src).with_parent(m.module_roots, core))
        .unwrap();
    background
        .add_entity(m.facet("web", &src).with_parent(m.module_facets, core))
        .unwrap();

    let mut live = snapshot.to_builder();
    let core = live.resolve(&m.module_id("core")).unwrap().handle();
    live.remove_entity(core);

    live.apply_changes_from(&background).unwrap();
    assert_eq!(
        layout(&m, &live),
        vec![
            ("app".to_string(), vec!["file://app".to_string()]),
            ("util".to_string(), vec!["file://util".to_string()]),
        ]
    );
    assert_eq!(live.entity_count(m.content_root), 2);
    assert_eq!(live.entity_count(m.facet), 1);
    live.assert_consistency().unwrap();
}

#[test]
fn conflicting_changes_are_applied_all_or_nothing() {
    let m = model();
    let src = file("project.iml");
    let config = StoreConfig::new().with_symbolic_id_conflict(SymbolicIdConflict::Reject);
    let mut target = MutableEntityStorage::create_with_config(Arc::clone(&m.registry), config);
    target.add_entity(m.module("base", &src)).unwrap();
    target.add_entity(m.module("dup", &src)).unwrap();
    target.reset_changes();

    let mut scratch = m.builder();
    scratch.add_entity(m.module("first", &src)).unwrap();
    scratch.add_entity(m.module("dup", &src)).unwrap();

    let err = target.apply_changes_from(&scratch).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SymbolicIdConflict(_)));
    assert_eq!(m.names(&target, m.module, "name"), vec!["base", "dup"]);
    assert!(!target.has_changes());
    target.assert_consistency().unwrap();
}

#[test]
fn the_same_changes_cannot_be_applied_twice() {
    let m = model();
    let src = file("project.iml");
    let mut target = project(&m);
    let mut scratch = m.builder();
    scratch.add_entity(m.facet("loose", &src)).unwrap();

    target.apply_changes_from(&scratch).unwrap();
    let err = target.apply_changes_from(&scratch).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReconciliationPrecondition(_)));
    assert_eq!(target.entity_count(m.facet), 1);
}

// =============================================================================
// Replay equivalence
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add { name: u8, roots: u8 },
    Remove { name: u8 },
    Rename { from: u8, to: u8 },
    AddRoot { name: u8, root: u8 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6, 0u8..3).prop_map(|(name, roots)| Op::Add { name, roots }),
        (0u8..6).prop_map(|name| Op::Remove { name }),
        (0u8..6, 0u8..6).prop_map(|(from, to)| Op::Rename { from, to }),
        (0u8..6, 0u8..4).prop_map(|(name, root)| Op::AddRoot { name, root }),
    ]
}

fn run(m: &Model, builder: &mut MutableEntityStorage, op: &Op) {
    let src = file("prop.iml");
    match *op {
        Op::Add { name, roots } => {
            let name = format!("m{name}");
            if builder.resolve(&m.module_id(&name)).is_some() {
                return;
            }
            let mut module = m.module(&name, &src);
            for i in 0..roots {
                module = module.with_child(
                    m.module_roots,
                    m.content_root(&format!("file://{name}/{i}"), &src),
                );
            }
            builder.add_entity(module).unwrap();
        }
        Op::Remove { name } => {
            if let Some(e) = builder.resolve(&m.module_id(&format!("m{name}"))) {
                let handle = e.handle();
                builder.remove_entity(handle);
            }
        }
        Op::Rename { from, to } => {
            let target = format!("m{to}");
            if builder.resolve(&m.module_id(&target)).is_some() {
                return;
            }
            if let Some(e) = builder.resolve(&m.module_id(&format!("m{from}"))) {
                let handle = e.handle();
                builder.modify_entity(handle, |e| e.set("name", target.as_str())).unwrap();
            }
        }
        Op::AddRoot { name, root } => {
            if let Some(e) = builder.resolve(&m.module_id(&format!("m{name}"))) {
                let parent = e.handle();
                builder
                    .add_entity(
                        m.content_root(&format!("file://extra/{root}"), &src)
                            .with_parent(m.module_roots, parent),
                    )
                    .unwrap();
            }
        }
    }
}

proptest! {
    #[test]
    fn applying_to_the_base_reproduces_the_source(
        seed in prop::collection::vec(op(), 0..12),
        edits in prop::collection::vec(op(), 0..20),
    ) {
        let m = model();
        let mut initial = m.builder();
        for op in &seed {
            run(&m, &mut initial, op);
        }
        let snapshot = initial.to_snapshot();

        let mut changes = snapshot.to_builder();
        for op in &edits {
            run(&m, &mut changes, op);
        }
        let mut target = snapshot.to_builder();
        target.apply_changes_from(&changes).unwrap();

        prop_assert_eq!(layout(&m, &target), layout(&m, &changes));
        prop_assert!(target.assert_consistency().is_ok());
    }
}
