//! Growable linear memory.
//!
//! A single byte-addressable region owned by the guest. Growth reallocates
//! the backing buffer, so every grow bumps a generation counter; the host's
//! view cache compares `(generation, len)` before each access and rebuilds
//! stale views instead of reading through them.

use tern_core::{GuestTrap, MemPtr};

/// Growth granularity. Matches the 64 KiB page size of the memory model
/// this mirrors.
pub const PAGE: usize = 65_536;

/// The guest's single growable byte region.
pub struct LinearMemory {
    bytes: Vec<u8>,
    generation: u64,
}

impl LinearMemory {
    /// Create a memory with one page.
    pub fn new() -> Self {
        Self {
            bytes: vec![0; PAGE],
            generation: 0,
        }
    }

    /// Current size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the memory is empty (never true in practice; present for
    /// API completeness).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Identity counter for the backing buffer. Bumped on every grow.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Grow so that at least `min_len` bytes exist, in whole pages.
    ///
    /// No-op if the memory is already large enough. Linear memory never
    /// shrinks.
    pub fn grow_to(&mut self, min_len: usize) {
        if min_len <= self.bytes.len() {
            return;
        }
        let pages = min_len.div_ceil(PAGE);
        self.bytes.resize(pages * PAGE, 0);
        self.generation += 1;
    }

    /// Borrow `len` bytes starting at `ptr`.
    pub fn slice(&self, ptr: MemPtr, len: u32) -> Result<&[u8], GuestTrap> {
        let start = ptr.0 as usize;
        let end = start
            .checked_add(len as usize)
            .filter(|&e| e <= self.bytes.len())
            .ok_or(GuestTrap::OutOfBounds { ptr: ptr.0, len })?;
        Ok(&self.bytes[start..end])
    }

    /// Mutably borrow `len` bytes starting at `ptr`.
    pub fn slice_mut(&mut self, ptr: MemPtr, len: u32) -> Result<&mut [u8], GuestTrap> {
        let start = ptr.0 as usize;
        let end = start
            .checked_add(len as usize)
            .filter(|&e| e <= self.bytes.len())
            .ok_or(GuestTrap::OutOfBounds { ptr: ptr.0, len })?;
        Ok(&mut self.bytes[start..end])
    }

    /// Read a little-endian u32 at `ptr`.
    pub fn load_u32(&self, ptr: MemPtr) -> Result<u32, GuestTrap> {
        let b = self.slice(ptr, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Write a little-endian u32 at `ptr`.
    pub fn store_u32(&mut self, ptr: MemPtr, value: u32) -> Result<(), GuestTrap> {
        self.slice_mut(ptr, 4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write a little-endian i32 at `ptr`.
    pub fn store_i32(&mut self, ptr: MemPtr, value: i32) -> Result<(), GuestTrap> {
        self.slice_mut(ptr, 4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// The whole current buffer. Host-side views are built over this and
    /// must not be retained across calls that can grow memory.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The whole current buffer, mutably. Writing never grows the buffer;
    /// callers bound their writes the same way `slice_mut` does.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_page_at_generation_zero() {
        let mem = LinearMemory::new();
        assert_eq!(mem.len(), PAGE);
        assert_eq!(mem.generation(), 0);
    }

    #[test]
    fn grow_rounds_to_pages_and_bumps_generation() {
        let mut mem = LinearMemory::new();
        mem.grow_to(PAGE + 1);
        assert_eq!(mem.len(), 2 * PAGE);
        assert_eq!(mem.generation(), 1);

        // Already large enough: no identity change.
        mem.grow_to(10);
        assert_eq!(mem.generation(), 1);
    }

    #[test]
    fn grow_preserves_contents() {
        let mut mem = LinearMemory::new();
        mem.store_u32(MemPtr(16), 0xdead_beef).unwrap();
        mem.grow_to(3 * PAGE);
        assert_eq!(mem.load_u32(MemPtr(16)).unwrap(), 0xdead_beef);
    }

    #[test]
    fn out_of_bounds_access_traps() {
        let mut mem = LinearMemory::new();
        let end = mem.len() as u32;
        assert!(matches!(
            mem.slice(MemPtr(end - 2), 4),
            Err(GuestTrap::OutOfBounds { .. })
        ));
        assert!(mem.store_u32(MemPtr(end), 1).is_err());
        // Length overflow must not wrap around.
        assert!(mem.slice(MemPtr(u32::MAX), u32::MAX).is_err());
    }

    #[test]
    fn u32_round_trip_is_little_endian() {
        let mut mem = LinearMemory::new();
        mem.store_u32(MemPtr(8), 0x0102_0304).unwrap();
        assert_eq!(mem.slice(MemPtr(8), 4).unwrap(), &[4, 3, 2, 1]);
        assert_eq!(mem.load_u32(MemPtr(8)).unwrap(), 0x0102_0304);
    }
}
