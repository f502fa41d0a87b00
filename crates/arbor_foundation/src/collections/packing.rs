//! Sign-bit packing for the non-negative int containers.
//!
//! A stored slot is either a plain non-negative value or a packed one. Packed
//! slots are negative: `pack(v) = -v`, and since `-0 == 0` zero packs to
//! `i32::MIN`. The multimap uses packed slots both for spill offsets in its
//! link map and to mark the last element of each run.

/// Packs a non-negative value into a negative slot.
///
/// # Panics
///
/// Debug builds panic if `value` is negative.
#[must_use]
pub const fn pack(value: i32) -> i32 {
    debug_assert!(value >= 0, "only non-negative values can be packed");
    if value == 0 { i32::MIN } else { -value }
}

/// Inverse of [`pack`].
///
/// # Panics
///
/// Debug builds panic if `packed` is not negative.
#[must_use]
pub const fn unpack(packed: i32) -> i32 {
    debug_assert!(packed < 0, "only packed (negative) slots can be unpacked");
    if packed == i32::MIN { 0 } else { -packed }
}

/// Returns true if a slot holds a packed value.
#[must_use]
pub const fn is_packed(slot: i32) -> bool {
    slot < 0
}

/// Converts an unpacked offset into an index.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub(crate) const fn offset_of(packed: i32) -> usize {
    unpack(packed) as usize
}
