//! Integration tests for reconciling builders
//!
//! Tests for `apply_changes_from` and `replace_by_source`.

mod apply;
#[path = "../storage/model.rs"]
mod model;
mod replace;
