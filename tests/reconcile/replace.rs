//! Replacing the entities of some sources with freshly loaded content

use proptest::prelude::*;

use arbor_foundation::EntitySource;
use arbor_storage::{EntityStorage, MutableEntityStorage};

use crate::model::{Model, file, model};

fn in_file(path: &'static str) -> impl Fn(&EntitySource) -> bool {
    move |source: &EntitySource| source.config_path() == Some(path)
}

/// Names and root urls of the modules from one file.
fn file_layout(m: &Model, storage: &impl EntityStorage, path: &str) -> Vec<(String, Vec<String>)> {
    let mut layout: Vec<_> = storage
        .entities(m.module)
        .filter(|module| module.source().config_path() == Some(path))
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

#[test]
fn reloading_one_file_leaves_the_others_alone() {
    let m = model();
    let (a, b) = (file("a.iml"), file("b.iml"));
    let mut local = m.builder();
    let core = local
        .add_entity(m.module("core", &a).with_child(m.module_roots, m.content_root("file://core", &a)))
        .unwrap();
    local
        .add_entity(m.module("util", &a).with_child(m.module_roots, m.content_root("file://util", &a)))
        .unwrap();
    let app = local.add_entity(m.module("app", &b)).unwrap();
    local.reset_changes();

    let mut reloaded = m.builder();
    reloaded
        .add_entity(
            m.module("core", &a)
                .with_field("output", "out/core")
                .with_child(m.module_roots, m.content_root("file://core", &a)),
        )
        .unwrap();
    reloaded.add_entity(m.module("tools", &a)).unwrap();
    reloaded.add_entity(m.module("ignored", &b)).unwrap();

    local.replace_by_source(&in_file("a.iml"), &reloaded).unwrap();

    assert_eq!(m.names(&local, m.module, "name"), vec!["app", "core", "tools"]);
    let kept = local.resolve(&m.module_id("core")).unwrap();
    assert_eq!(kept.handle(), core);
    assert_eq!(kept.str_field("output"), Some("out/core"));
    assert_eq!(local.resolve(&m.module_id("app")).unwrap().handle(), app);
    assert_eq!(local.entity_count(m.content_root), 1);

    let changes = local.collect_changes();
    assert_eq!(changes.changes_of(m.module).len(), 3);
    assert_eq!(changes.added_count(), 1);
    assert_eq!(changes.removed_count(), 2);
    assert_eq!(changes.replaced_count(), 1);
    local.assert_consistency().unwrap();
}

#[test]
fn second_identical_replace_changes_nothing() {
    let m = model();
    let a = file("a.iml");
    let mut local = m.builder();
    local.add_entity(m.module("old", &a)).unwrap();

    let mut reloaded = m.builder();
    reloaded
        .add_entity(
            m.module("core", &a)
                .with_child(m.module_roots, m.content_root("file://core/src", &a))
                .with_child(m.module_facets, m.facet("web", &a)),
        )
        .unwrap();

    local.replace_by_source(&in_file("a.iml"), &reloaded).unwrap();
    assert!(local.has_changes());
    local.reset_changes();
    let before = local.to_snapshot();

    local.replace_by_source(&in_file("a.iml"), &reloaded).unwrap();
    assert!(!local.has_changes());
    let core = before.resolve(&m.module_id("core")).unwrap().handle();
    assert_eq!(local.resolve(&m.module_id("core")).unwrap().handle(), core);
}

#[test]
fn children_from_other_files_follow_their_parent() {
    let m = model();
    let (a, b) = (file("a.iml"), file("b.iml"));
    let mut local = m.builder();
    let core = local.add_entity(m.module("core", &a)).unwrap();
    let facet = local
        .add_entity(m.facet("web", &b).with_parent(m.module_facets, core))
        .unwrap();
    let root = local
        .add_entity(m.content_root("file://generated", &b).with_parent(m.module_roots, core))
        .unwrap();

    // Parent survives the reload: children stay attached
    let mut same = m.builder();
    same.add_entity(m.module("core", &a)).unwrap();
    local.replace_by_source(&in_file("a.iml"), &same).unwrap();
    assert_eq!(local.parent_of(facet.id(), m.module_facets).unwrap().handle(), core);
    assert_eq!(local.parent_of(root.id(), m.module_roots).unwrap().handle(), core);

    // Parent disappears: detachable child stays, mandatory child goes
    let empty = m.builder();
    local.replace_by_source(&in_file("a.iml"), &empty).unwrap();
    assert!(local.entity(core.id()).is_none());
    assert!(local.entity(root.id()).is_none());
    let survivor = local.entity(facet.id()).unwrap();
    assert!(survivor.parent(m.module_facets).is_none());
    local.assert_consistency().unwrap();
}

#[test]
fn replaced_children_attach_to_unfiltered_parent_by_symbolic_id() {
    let m = model();
    let (a, b) = (file("a.iml"), file("b.iml"));
    let mut local = m.builder();
    let app = local.add_entity(m.module("app", &b)).unwrap();

    // Loaded separately: the parent is only a stand-in for the local one
    let mut reloaded = m.builder();
    reloaded
        .add_entity(
            m.module("app", &b).with_child(m.module_roots, m.content_root("file://app/gen", &a)),
        )
        .unwrap();

    local.replace_by_source(&in_file("a.iml"), &reloaded).unwrap();

    let roots = local.children_of(app.id(), m.module_roots);
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].str_field("url"), Some("file://app/gen"));
    assert_eq!(local.entity_count(m.module), 1);
    local.assert_consistency().unwrap();
}

#[test]
fn replacement_with_unresolvable_mandatory_parent_is_dropped() {
    let m = model();
    let (a, b) = (file("a.iml"), file("b.iml"));
    let mut local = m.builder();
    local.add_entity(m.module("core", &b)).unwrap();

    let mut reloaded = m.builder();
    reloaded
        .add_entity(
            m.module("elsewhere", &b)
                .with_child(m.module_roots, m.content_root("file://lost", &a)),
        )
        .unwrap();

    local.replace_by_source(&in_file("a.iml"), &reloaded).unwrap();
    assert_eq!(local.entity_count(m.content_root), 0);
    assert_eq!(m.names(&local, m.module, "name"), vec!["core"]);
    local.assert_consistency().unwrap();
}

#[test]
fn placeholder_modules_only_carry_their_children() {
    let m = model();
    let (a, b) = (file("a.iml"), file("b.iml"));
    let filter =
        |source: &EntitySource| source.is_dummy_parent() || source.config_path() == Some("b.iml");
    let mut local = m.builder();
    let core = local
        .add_entity(m.module("core", &a).with_field("output", "out/core"))
        .unwrap();

    // The loader of b.iml knows core only by name
    let mut reloaded = m.builder();
    let placeholder = reloaded
        .add_entity(
            m.module("core", &EntitySource::dummy_parent("b.iml"))
                .with_field("dependencies", vec![m.library_id("junit")]),
        )
        .unwrap();
    reloaded
        .add_entity(m.content_root("file://core/test", &b).with_parent(m.module_roots, placeholder))
        .unwrap();

    local.replace_by_source(&filter, &reloaded).unwrap();
    let view = local.entity(core.id()).unwrap();
    assert_eq!(view.source(), &a);
    assert_eq!(view.str_field("output"), Some("out/core"));
    assert!(local.referrers(&m.library_id("junit"), m.module).is_empty());
    let roots: Vec<_> = view
        .children(m.module_roots)
        .iter()
        .filter_map(|r| r.str_field("url").map(str::to_string))
        .collect();
    assert_eq!(roots, vec!["file://core/test"]);
    assert_eq!(local.entity_count(m.module), 1);
    local.assert_consistency().unwrap();

    // Once the real module is loaded it takes the placeholder's place
    let mut placeholder_only = m.builder();
    let held = placeholder_only
        .add_entity(
            m.module("core", &EntitySource::dummy_parent("b.iml"))
                .with_child(m.module_roots, m.content_root("file://core/test", &b)),
        )
        .unwrap();
    let mut real = m.builder();
    real.add_entity(m.module("core", &a)).unwrap();
    let real_or_placeholder =
        |source: &EntitySource| source.is_dummy_parent() || source.config_path() == Some("a.iml");
    placeholder_only.replace_by_source(&real_or_placeholder, &real).unwrap();
    let view = placeholder_only.entity(held.id()).unwrap();
    assert_eq!(view.source(), &a);
    assert_eq!(view.children(m.module_roots).len(), 1);
    placeholder_only.assert_consistency().unwrap();
}

// =============================================================================
// Idempotence
// =============================================================================

#[derive(Debug, Clone)]
struct ModuleSpec {
    in_a: bool,
    name: u8,
    roots: u8,
    foreign_facet: bool,
}

fn module_spec() -> impl Strategy<Value = ModuleSpec> {
    (any::<bool>(), 0u8..6, 0u8..3, any::<bool>()).prop_map(|(in_a, name, roots, foreign_facet)| {
        ModuleSpec {
            in_a,
            name,
            roots,
            foreign_facet,
        }
    })
}

fn build(m: &Model, specs: &[ModuleSpec]) -> MutableEntityStorage {
    let mut builder = m.builder();
    for spec in specs {
        let (path, other) = if spec.in_a { ("a.iml", "b.iml") } else { ("b.iml", "a.iml") };
        let src = file(path);
        let name = format!("{}{}", &path[..1], spec.name);
        if builder.resolve(&m.module_id(&name)).is_some() {
            continue;
        }
        let mut module = m.module(&name, &src);
        for i in 0..spec.roots {
            module = module.with_child(m.module_roots, m.content_root(&format!("file://{name}/{i}"), &src));
        }
        if spec.foreign_facet {
            module = module.with_child(m.module_facets, m.facet(&format!("{name}-facet"), &file(other)));
        }
        builder.add_entity(module).unwrap();
    }
    builder
}

proptest! {
    #[test]
    fn replace_by_source_is_idempotent(
        local_specs in prop::collection::vec(module_spec(), 0..10),
        incoming_specs in prop::collection::vec(module_spec(), 0..10),
    ) {
        let m = model();
        let mut local = build(&m, &local_specs);
        let incoming = build(&m, &incoming_specs);
        let untouched = file_layout(&m, &local, "b.iml");

        local.replace_by_source(&in_file("a.iml"), &incoming).unwrap();
        prop_assert_eq!(file_layout(&m, &local, "a.iml"), file_layout(&m, &incoming, "a.iml"));
        prop_assert_eq!(file_layout(&m, &local, "b.iml"), untouched);
        prop_assert!(local.assert_consistency().is_ok());

        local.reset_changes();
        local.replace_by_source(&in_file("a.iml"), &incoming).unwrap();
        prop_assert!(!local.has_changes());
    }
}
