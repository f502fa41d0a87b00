//! Freezing, thawing, and snapshot isolation

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use arbor_foundation::EntitySource;
use arbor_storage::{EntityStorage, ImmutableEntityStorage, MutableEntityStorage};

use crate::model::{Model, file, model};

#[test]
fn snapshot_does_not_see_later_writes() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let core = builder.add_entity(m.module("core", &src)).unwrap();
    let before = builder.to_snapshot();

    builder.add_entity(m.module("util", &src)).unwrap();
    builder.modify_entity(core, |e| e.set("output", "out")).unwrap();
    let after = builder.to_snapshot();

    assert_eq!(m.names(&before, m.module, "name"), vec!["core"]);
    assert_eq!(before.entity(core.id()).unwrap().field("output").unwrap().as_str(), None);
    assert_eq!(m.names(&after, m.module, "name"), vec!["core", "util"]);
    assert_eq!(after.entity(core.id()).unwrap().str_field("output"), Some("out"));
    assert!(before.version().precedes_or_equals(after.version()));
    assert!(!after.version().precedes_or_equals(before.version()));
}

#[test]
fn builders_from_one_snapshot_are_independent() {
    let m = model();
    let src = file("core.iml");
    let mut seed = m.builder();
    seed.add_entity(m.module("core", &src)).unwrap();
    let snapshot = seed.to_snapshot();

    let mut left = snapshot.to_builder();
    let mut right = snapshot.to_builder();
    left.add_entity(m.module("left", &src)).unwrap();
    let core = right.resolve(&m.module_id("core")).unwrap().handle();
    right.remove_entity(core);

    assert_eq!(m.names(&left, m.module, "name"), vec!["core", "left"]);
    assert!(m.names(&right, m.module, "name").is_empty());
    assert_eq!(m.names(&snapshot, m.module, "name"), vec!["core"]);
    assert_eq!(left.base_version(), Some(snapshot.version()));
    assert!(!left.collect_changes().is_empty());
}

#[test]
fn snapshots_are_shared_across_threads() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    for i in 0..32 {
        builder
            .add_entity(
                m.module(&format!("m{i}"), &src)
                    .with_child(m.module_roots, m.content_root(&format!("file://m{i}"), &src)),
            )
            .unwrap();
    }
    let snapshot = builder.to_snapshot();

    let counts: Vec<_> = (0..4)
        .map(|_| {
            let snapshot = snapshot.clone();
            let roots = m.module_roots;
            let module = m.module;
            thread::spawn(move || {
                snapshot
                    .entities(module)
                    .map(|e| e.children(roots).len())
                    .sum::<usize>()
            })
        })
        .map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(counts, vec![32; 4]);
}

#[test]
fn empty_snapshot_has_no_entities() {
    let m = model();
    let snapshot = ImmutableEntityStorage::empty(Arc::clone(&m.registry));
    assert_eq!(snapshot.entity_count(m.module), 0);
    assert!(snapshot.resolve(&m.module_id("core")).is_none());
    snapshot.assert_consistency().unwrap();
}

// =============================================================================
// Freeze round trip
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    AddModule { name: u8, roots: u8, facet: bool },
    AddFacet { name: u8 },
    Remove { name: u8 },
    Rename { from: u8, to: u8 },
    Freeze,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8, 0u8..3, any::<bool>())
            .prop_map(|(name, roots, facet)| Op::AddModule { name, roots, facet }),
        (0u8..8).prop_map(|name| Op::AddFacet { name }),
        (0u8..8).prop_map(|name| Op::Remove { name }),
        (0u8..8, 0u8..8).prop_map(|(from, to)| Op::Rename { from, to }),
        Just(Op::Freeze),
    ]
}

fn apply(m: &Model, builder: &mut MutableEntityStorage, op: &Op) {
    let src = file("prop.iml");
    match *op {
        Op::AddModule { name, roots, facet } => {
            let mut module = m.module(&format!("m{name}"), &src);
            for i in 0..roots {
                module = module.with_child(
                    m.module_roots,
                    m.content_root(&format!("file://m{name}/{i}"), &src),
                );
            }
            if facet {
                module = module.with_child(m.module_facets, m.facet(&format!("f{name}"), &src));
            }
            builder.add_entity(module).unwrap();
        }
        Op::AddFacet { name } => {
            builder.add_entity(m.facet(&format!("loose{name}"), &src)).unwrap();
        }
        Op::Remove { name } => {
            if let Some(e) = builder.resolve(&m.module_id(&format!("m{name}"))) {
                let handle = e.handle();
                assert!(builder.remove_entity(handle));
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
        Op::Freeze => {
            *builder = builder.to_snapshot().to_builder();
        }
    }
}

/// Everything a reader can observe, in a comparable form.
fn observe(m: &Model, storage: &impl EntityStorage) -> Vec<String> {
    let mut seen = Vec::new();
    for module in storage.entities(m.module) {
        let name = module.str_field("name").unwrap_or_default().to_string();
        let resolved = storage.resolve(&m.module_id(&name)).map(|e| e.id());
        let mut roots: Vec<_> = module
            .children(m.module_roots)
            .iter()
            .filter_map(|r| r.str_field("url").map(str::to_string))
            .collect();
        roots.sort();
        let mut facets: Vec<_> = module
            .children(m.module_facets)
            .iter()
            .filter_map(|f| f.str_field("name").map(str::to_string))
            .collect();
        facets.sort();
        seen.push(format!(
            "{:?} {name} resolves={} roots={roots:?} facets={facets:?}",
            module.id(),
            resolved == Some(module.id()),
        ));
    }
    for facet in storage.entities(m.facet) {
        let parent = facet.parent(m.module_facets).map(|p| p.id());
        seen.push(format!("{:?} facet parent={parent:?}", facet.id()));
    }
    let by_source = storage
        .entities_by_source(&|s: &EntitySource| s.config_path() == Some("prop.iml"))
        .count();
    seen.push(format!("by_source={by_source}"));
    seen.sort();
    seen
}

proptest! {
    #[test]
    fn freeze_round_trip_preserves_queries(ops in prop::collection::vec(op(), 0..40)) {
        let m = model();
        let mut builder = m.builder();
        for op in &ops {
            apply(&m, &mut builder, op);
        }

        let snapshot = builder.to_snapshot();
        let thawed = snapshot.to_builder();
        let expected = observe(&m, &builder);
        prop_assert_eq!(&observe(&m, &snapshot), &expected);
        prop_assert_eq!(&observe(&m, &thawed), &expected);
        prop_assert!(thawed.assert_consistency().is_ok());
    }
}
