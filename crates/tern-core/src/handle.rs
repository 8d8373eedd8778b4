//! Handle and pointer newtypes.
//!
//! The bridge juggles three distinct integer address spaces. Mixing them is
//! the classic failure mode of this kind of glue, so each space gets its own
//! newtype and conversions are always explicit:
//!
//! - [`HeapHandle`] — a slot index in the host-side heap table.
//! - [`GuestPtr`] — a slot in the guest object store; never 0.
//! - [`MemPtr`] — a byte offset into guest linear memory.

use std::fmt;

/// Size in bytes of one handle word in linear memory.
pub const WORD: u32 = 4;

/// Index of a slot in the host heap table.
///
/// Handles below the table's reserved threshold refer to immutable
/// sentinel values and are never recycled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapHandle(pub u32);

impl fmt::Display for HeapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "heap:{}", self.0)
    }
}

impl From<u32> for HeapHandle {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Reference to an entity in the guest object store.
///
/// Slot 0 of the store is permanently reserved, so a `GuestPtr` of 0 is
/// never valid. Wrapper objects exploit this: a wrapper whose stored
/// pointer has been zeroed is destroyed, and every operation on it is
/// rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuestPtr(pub u32);

impl GuestPtr {
    /// Whether this pointer is the cleared sentinel.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for GuestPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guest:{}", self.0)
    }
}

impl From<u32> for GuestPtr {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Byte offset into guest linear memory.
///
/// Only meaningful together with a length; the marshalling layer bounds-checks
/// every `(ptr, len)` pair against the current memory size before use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemPtr(pub u32);

impl MemPtr {
    /// Offset this pointer by a byte count, saturating at `u32::MAX`.
    ///
    /// Saturation pushes a would-be overflow out of bounds, where the view
    /// layer rejects it, instead of wrapping back into valid memory.
    pub fn offset(self, bytes: u32) -> MemPtr {
        MemPtr(self.0.saturating_add(bytes))
    }
}

impl fmt::Display for MemPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mem:{:#x}", self.0)
    }
}

impl From<u32> for MemPtr {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_guest_ptr() {
        assert!(GuestPtr(0).is_null());
        assert!(!GuestPtr(1).is_null());
    }

    #[test]
    fn mem_ptr_offset_saturates() {
        let p = MemPtr(u32::MAX - 2);
        assert_eq!(p.offset(8), MemPtr(u32::MAX));
    }

    #[test]
    fn display_is_space_tagged() {
        assert_eq!(HeapHandle(7).to_string(), "heap:7");
        assert_eq!(GuestPtr(7).to_string(), "guest:7");
        assert_eq!(MemPtr(16).to_string(), "mem:0x10");
    }
}
