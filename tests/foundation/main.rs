//! Integration tests for Layer 0: Foundation
//!
//! Tests for packed containers, class and connection interning, and values.

mod identity;
mod values;
