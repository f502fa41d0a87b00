//! Integration tests for class and connection interning

use std::collections::HashSet;
use std::thread;

use arbor_foundation::{ConnectionId, ConnectionType, EntityId, Lineage, intern};

// =============================================================================
// Classes
// =============================================================================

#[test]
fn class_ids_are_stable_per_name() {
    let a = intern::class_id("identity.Module");
    let b = intern::class_id("identity.Module");
    let c = intern::class_id("identity.Library");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(intern::find_class_id("identity.Module"), Some(a));
    assert_eq!(intern::class_name(a).as_deref(), Some("identity.Module"));
    assert_eq!(intern::find_class_id("identity.NeverInterned"), None);
}

#[test]
fn class_interning_is_shared_across_threads() {
    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| intern::class_id("identity.Threaded")))
        .collect();
    let ids: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1);
}

// =============================================================================
// Connections
// =============================================================================

#[test]
fn equal_descriptions_give_the_same_connection() {
    let parent = intern::class_id("identity.Parent");
    let child = intern::class_id("identity.Child");

    let a = ConnectionId::create(parent, child, ConnectionType::OneToMany, false, true);
    let b = ConnectionId::create(parent, child, ConnectionType::OneToMany, false, true);
    assert_eq!(a, b);

    let nullable = ConnectionId::create(parent, child, ConnectionType::OneToMany, true, true);
    let one = ConnectionId::create(parent, child, ConnectionType::OneToOne, false, true);
    assert_ne!(a, nullable);
    assert_ne!(a, one);

    let set: HashSet<_> = [a, b, nullable, one].into_iter().collect();
    assert_eq!(set.len(), 3);
}

#[test]
fn connection_accessors_describe_the_edge() {
    let parent = intern::class_id("identity.Owner");
    let child = intern::class_id("identity.Owned");
    let connection = ConnectionId::create(parent, child, ConnectionType::OneToOne, true, false);

    assert_eq!(connection.parent_class(), parent);
    assert_eq!(connection.child_class(), child);
    assert_eq!(connection.connection_type(), ConnectionType::OneToOne);
    assert!(connection.can_remove_parent());
    assert!(!connection.can_remove_child());
    assert!(connection.debug_str().starts_with("identity.Owner -> identity.Owned"));
}

#[test]
fn connections_created_on_many_threads_agree() {
    let parent = intern::class_id("identity.ThreadParent");
    let child = intern::class_id("identity.ThreadChild");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(move || {
                ConnectionId::create(parent, child, ConnectionType::OneToMany, true, true)
            })
        })
        .collect();
    let ids: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1);
}

// =============================================================================
// Entity Ids and Lineages
// =============================================================================

#[test]
fn entity_ids_order_by_class_then_index() {
    let class = intern::class_id("identity.Ordered");
    let first = EntityId::new(class, 0);
    let second = EntityId::new(class, 1);
    assert!(first < second);
    assert_eq!(EntityId::from_key(class, second.key()), second);
}

#[test]
fn fresh_lineages_differ() {
    assert_ne!(Lineage::fresh(), Lineage::fresh());
}
