//! External mappings and pointers

use arbor_foundation::ErrorKind;
use arbor_storage::{EntityPointer, EntityStorage};

use crate::model::{file, model};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Bridge {
    module_name: String,
}

fn bridge(name: &str) -> Bridge {
    Bridge {
        module_name: name.to_string(),
    }
}

#[test]
fn mapping_entries_are_collected_with_their_entities() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let core = builder.add_entity(m.module("core", &src)).unwrap();
    let util = builder.add_entity(m.module("util", &src)).unwrap();
    {
        let mut mapping = builder.mutable_external_mapping::<Bridge>("bridges").unwrap();
        mapping.add_mapping(core, bridge("core")).unwrap();
        mapping.add_mapping(util, bridge("util")).unwrap();
    }

    builder.remove_entity(core);

    let mapping = builder.external_mapping::<Bridge>("bridges").unwrap();
    assert_eq!(mapping.len(), 1);
    assert!(mapping.get_data_by_entity(core.id()).is_none());
    assert_eq!(mapping.get_data_by_entity(util.id()), Some(&bridge("util")));
}

#[test]
fn reverse_lookup_and_get_or_put() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let a = builder.add_entity(m.module("a", &src)).unwrap();
    let b = builder.add_entity(m.module("b", &src)).unwrap();

    let mut mapping = builder.mutable_external_mapping::<u32>("ordinals").unwrap();
    mapping.add_mapping(a, 7).unwrap();
    assert_eq!(mapping.get_or_put_data_by_entity(b, || 7).unwrap(), 7);
    assert_eq!(mapping.get_or_put_data_by_entity(b, || 9).unwrap(), 7);

    let mut holders = mapping.get_entities(&7).to_vec();
    holders.sort();
    let mut expected = vec![a.id(), b.id()];
    expected.sort();
    assert_eq!(holders, expected);

    assert_eq!(mapping.remove_mapping(a), Some(7));
    assert_eq!(mapping.get_entities(&7), &[b.id()]);
}

#[test]
fn mappings_are_isolated_between_snapshots() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let core = builder.add_entity(m.module("core", &src)).unwrap();
    builder
        .mutable_external_mapping::<Bridge>("bridges")
        .unwrap()
        .add_mapping(core, bridge("first"))
        .unwrap();
    let snapshot = builder.to_snapshot();

    let mut next = snapshot.to_builder();
    next.mutable_external_mapping::<Bridge>("bridges")
        .unwrap()
        .add_mapping(core, bridge("second"))
        .unwrap();

    let frozen = snapshot.external_mapping::<Bridge>("bridges").unwrap();
    assert_eq!(frozen.get_data_by_entity(core.id()), Some(&bridge("first")));
    let live = next.external_mapping::<Bridge>("bridges").unwrap();
    assert_eq!(live.get_data_by_entity(core.id()), Some(&bridge("second")));
}

#[test]
fn mapping_rejects_foreign_handles() {
    let m = model();
    let src = file("core.iml");
    let mut a = m.builder();
    let mut b = m.builder();
    let in_a = a.add_entity(m.module("core", &src)).unwrap();
    b.add_entity(m.module("core", &src)).unwrap();

    let err = b
        .mutable_external_mapping::<Bridge>("bridges")
        .unwrap()
        .add_mapping(in_a, bridge("core"))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ForeignEntity(_)));
}

#[test]
fn pointers_resolve_by_id_in_any_storage() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let core = builder.add_entity(m.module("core", &src)).unwrap();
    let pointer = builder.entity(core.id()).unwrap().create_pointer();
    let snapshot = builder.to_snapshot();

    assert!(pointer.is_pointer_to(core));
    assert_eq!(pointer.class(), m.module);
    assert_eq!(pointer.resolve(&snapshot).unwrap().str_field("name"), Some("core"));

    builder.remove_entity(core);
    assert!(pointer.resolve(&builder).is_none());
    assert_eq!(EntityPointer::new(core.id()), pointer);
}

#[test]
fn references_refuse_other_lineages() {
    let m = model();
    let src = file("core.iml");
    let mut builder = m.builder();
    let core = builder.add_entity(m.module("core", &src)).unwrap();
    let reference = builder.entity(core.id()).unwrap().create_reference();
    let snapshot = builder.to_snapshot();

    assert!(reference.is_reference_to(core));
    assert!(reference.resolve(&snapshot).is_some());
    assert!(reference.resolve(&snapshot.to_builder()).is_some());

    // A separate storage with an entity at the same id
    let mut other = m.builder();
    let twin = other.add_entity(m.module("core", &src)).unwrap();
    assert_eq!(twin.id(), core.id());
    assert!(reference.resolve(&other).is_none());
    assert!(!reference.is_reference_to(twin));
    let pointer = builder.entity(core.id()).unwrap().create_pointer();
    assert!(pointer.resolve(&other).is_some());
}
