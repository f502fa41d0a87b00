//! Integration tests for Layer 1: Storage
//!
//! Tests for builders, snapshots, cascades, the change stream, external
//! mappings, and pointers.

mod builder;
mod changes;
mod mappings;
mod model;
mod snapshots;
