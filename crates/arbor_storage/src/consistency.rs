//! Full invariant check over a storage.
//!
//! Walks every entity and edge and collects all violations instead of
//! stopping at the first one, so a failing check reports the whole damage.

use std::collections::HashSet;

use arbor_foundation::{Error, Result};

use crate::refs::EdgeRead;
use crate::storage::StorageCore;

pub(crate) fn check<R: EdgeRead>(core: &StorageCore<R>) -> Result<()> {
    let mut problems = Vec::new();
    check_entities(core, &mut problems);
    check_edges(core, &mut problems);

    if problems.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = problems.len(), "consistency check failed");
        Err(Error::inconsistent(problems.join("; ")))
    }
}

fn check_entities<R: EdgeRead>(core: &StorageCore<R>, problems: &mut Vec<String>) {
    let registry = &core.registry;
    let indexes = &core.indexes;
    let mut live = 0;

    for class in core.barrel.classes() {
        let Some(schema) = registry.schema(class) else {
            problems.push(format!("entities of unregistered class {class:?}"));
            continue;
        };
        for id in core.barrel.ids(class) {
            live += 1;
            let Some(data) = core.barrel.get(id) else {
                continue;
            };
            if indexes.source_of(id) != Some(data.source()) {
                problems.push(format!("source index of {id:?} is stale"));
            }

            let symbolic = schema.symbolic_id_of(data.fields());
            if indexes.symbolic_of(id) != symbolic.as_ref() {
                problems.push(format!("symbolic index of {id:?} is stale"));
            }
            if let Some(symbolic) = &symbolic {
                if indexes.resolve(symbolic) != Some(id) {
                    problems.push(format!("{symbolic} does not resolve to {id:?}"));
                }
            }

            let expected: HashSet<_> = data.soft_links().into_iter().collect();
            let indexed: HashSet<_> = indexes.soft_links_of(id).into_iter().collect();
            if expected != indexed {
                problems.push(format!("soft link index of {id:?} is stale"));
            }

            for connection in registry.connections_as_child(class) {
                if !connection.can_remove_parent() && core.refs.parent_of(connection, id).is_none() {
                    problems.push(format!(
                        "{id:?} has no parent on {}",
                        connection.debug_str()
                    ));
                }
            }
        }
    }

    if indexes.len() != live {
        problems.push(format!(
            "source index holds {} entities, storage holds {live}",
            indexes.len()
        ));
    }
}

fn check_edges<R: EdgeRead>(core: &StorageCore<R>, problems: &mut Vec<String>) {
    let registry = &core.registry;
    for connection in core.refs.connections() {
        if !registry.has_connection(connection) {
            problems.push(format!("edges on undeclared {}", connection.debug_str()));
        }
        for (parent, child) in core.refs.edges(connection) {
            if !core.barrel.contains(parent) {
                problems.push(format!(
                    "{child:?} points to removed parent {parent:?} on {}",
                    connection.debug_str()
                ));
            }
            if !core.barrel.contains(child) {
                problems.push(format!(
                    "{parent:?} holds removed child {child:?} on {}",
                    connection.debug_str()
                ));
            }
            if !registry.is_a(parent.class, connection.parent_class())
                || !registry.is_a(child.class, connection.child_class())
            {
                problems.push(format!(
                    "{parent:?} -> {child:?} does not fit {}",
                    connection.debug_str()
                ));
            }
            if core.refs.parent_of(connection, child) != Some(parent)
                || !core.refs.children_of(connection, parent).contains(&child)
            {
                problems.push(format!(
                    "{parent:?} -> {child:?} is one-sided on {}",
                    connection.debug_str()
                ));
            }
        }
    }
}
