//! Guest-side allocator over linear memory.
//!
//! First-fit free list with a bump high-water mark. Scratch regions for
//! marshalled arrays and strings are allocated here and returned promptly,
//! so the free list keeps steady-state memory flat; growth only happens
//! when live allocations genuinely exceed what memory has seen before.

use crate::memory::LinearMemory;
use smallvec::SmallVec;
use tern_core::{GuestTrap, MemPtr};

/// Allocation alignment in bytes. Handle arrays are read as 32-bit words,
/// so every block is word-aligned.
const ALIGN: u32 = 4;

/// Lowest address ever handed out. Keeps 0 unambiguous as "no pointer"
/// and leaves a small guard region at the bottom of memory.
const BASE: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FreeBlock {
    offset: u32,
    len: u32,
}

/// First-fit allocator managing guest linear memory.
pub struct GuestAllocator {
    /// Free blocks sorted by offset, adjacent blocks coalesced. Stays
    /// tiny in steady state since scratch is returned promptly.
    free: SmallVec<[FreeBlock; 8]>,
    /// First never-allocated byte.
    high_water: u32,
    /// Bytes currently allocated, for observability.
    live_bytes: u32,
}

impl GuestAllocator {
    /// Create an allocator with nothing allocated.
    pub fn new() -> Self {
        Self {
            free: SmallVec::new(),
            high_water: BASE,
            live_bytes: 0,
        }
    }

    /// Allocate `size` bytes, growing memory if needed.
    ///
    /// Zero-size requests succeed with a null pointer; the zero length
    /// makes the pointer unusable for access, and `dealloc` of a null
    /// pointer is a no-op.
    pub fn alloc(&mut self, mem: &mut LinearMemory, size: u32) -> Result<MemPtr, GuestTrap> {
        if size == 0 {
            return Ok(MemPtr(0));
        }
        let size = size
            .checked_next_multiple_of(ALIGN)
            .ok_or(GuestTrap::OutOfMemory { requested: size })?;

        if let Some(i) = self.free.iter().position(|b| b.len >= size) {
            let block = self.free[i];
            if block.len == size {
                self.free.remove(i);
            } else {
                self.free[i] = FreeBlock {
                    offset: block.offset + size,
                    len: block.len - size,
                };
            }
            self.live_bytes += size;
            return Ok(MemPtr(block.offset));
        }

        let offset = self.high_water;
        let end = offset
            .checked_add(size)
            .ok_or(GuestTrap::OutOfMemory { requested: size })?;
        mem.grow_to(end as usize);
        self.high_water = end;
        self.live_bytes += size;
        Ok(MemPtr(offset))
    }

    /// Return a block to the free list, coalescing with neighbours.
    ///
    /// `size` must be the size passed to the matching `alloc`.
    pub fn dealloc(&mut self, ptr: MemPtr, size: u32) {
        if size == 0 || ptr.0 == 0 {
            return;
        }
        let size = size.checked_next_multiple_of(ALIGN).unwrap_or(size);
        self.live_bytes = self.live_bytes.saturating_sub(size);

        let pos = self
            .free
            .partition_point(|b| b.offset < ptr.0);
        self.free.insert(pos, FreeBlock { offset: ptr.0, len: size });

        // Merge with the following block, then the preceding one.
        if pos + 1 < self.free.len() && self.free[pos].offset + self.free[pos].len == self.free[pos + 1].offset
        {
            self.free[pos].len += self.free[pos + 1].len;
            self.free.remove(pos + 1);
        }
        if pos > 0 && self.free[pos - 1].offset + self.free[pos - 1].len == self.free[pos].offset {
            self.free[pos - 1].len += self.free[pos].len;
            self.free.remove(pos);
        }
    }

    /// Bytes currently allocated.
    pub fn live_bytes(&self) -> u32 {
        self.live_bytes
    }

    /// First never-allocated byte; an upper bound on footprint.
    pub fn high_water(&self) -> u32 {
        self.high_water
    }
}

impl Default for GuestAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (GuestAllocator, LinearMemory) {
        (GuestAllocator::new(), LinearMemory::new())
    }

    #[test]
    fn alloc_is_word_aligned_and_nonzero() {
        let (mut a, mut mem) = fixture();
        let p = a.alloc(&mut mem, 10).unwrap();
        assert_ne!(p.0, 0);
        assert_eq!(p.0 % ALIGN, 0);
        assert_eq!(a.live_bytes(), 12);
    }

    #[test]
    fn zero_size_alloc_is_null_and_free() {
        let (mut a, mut mem) = fixture();
        let p = a.alloc(&mut mem, 0).unwrap();
        assert_eq!(p, MemPtr(0));
        a.dealloc(p, 0);
        assert_eq!(a.live_bytes(), 0);
    }

    #[test]
    fn freed_block_is_reused() {
        let (mut a, mut mem) = fixture();
        let p = a.alloc(&mut mem, 64).unwrap();
        a.dealloc(p, 64);
        let q = a.alloc(&mut mem, 64).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn adjacent_frees_coalesce() {
        let (mut a, mut mem) = fixture();
        let p = a.alloc(&mut mem, 32).unwrap();
        let q = a.alloc(&mut mem, 32).unwrap();
        a.dealloc(p, 32);
        a.dealloc(q, 32);
        // A single 64-byte block should satisfy this without bumping
        // the high-water mark.
        let hw = a.high_water();
        let r = a.alloc(&mut mem, 64).unwrap();
        assert_eq!(r, p);
        assert_eq!(a.high_water(), hw);
    }

    #[test]
    fn splits_larger_free_block() {
        let (mut a, mut mem) = fixture();
        let p = a.alloc(&mut mem, 64).unwrap();
        a.dealloc(p, 64);
        let q = a.alloc(&mut mem, 16).unwrap();
        let r = a.alloc(&mut mem, 48).unwrap();
        assert_eq!(q, p);
        assert_eq!(r.0, p.0 + 16);
    }

    #[test]
    fn grows_memory_past_first_page() {
        let (mut a, mut mem) = fixture();
        let before = mem.generation();
        let big = crate::memory::PAGE as u32 * 2;
        let p = a.alloc(&mut mem, big).unwrap();
        assert!(mem.len() >= (p.0 + big) as usize);
        assert!(mem.generation() > before);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn live_blocks_never_overlap(
                sizes in proptest::collection::vec(1u32..512, 1..40),
            ) {
                let (mut a, mut mem) = fixture();
                let mut blocks: Vec<(u32, u32)> = Vec::new();
                for size in sizes {
                    let p = a.alloc(&mut mem, size).unwrap();
                    let end = p.0 + size;
                    for &(o, e) in &blocks {
                        prop_assert!(end <= o || p.0 >= e);
                    }
                    blocks.push((p.0, end));
                }
            }

            #[test]
            fn full_release_drains_live_bytes(
                sizes in proptest::collection::vec(0u32..512, 1..40),
            ) {
                let (mut a, mut mem) = fixture();
                let held: Vec<(MemPtr, u32)> = sizes
                    .iter()
                    .map(|&s| (a.alloc(&mut mem, s).unwrap(), s))
                    .collect();
                for (p, s) in held {
                    a.dealloc(p, s);
                }
                prop_assert_eq!(a.live_bytes(), 0);
            }
        }
    }

    #[test]
    fn churn_keeps_footprint_flat() {
        let (mut a, mut mem) = fixture();
        let p = a.alloc(&mut mem, 160).unwrap();
        a.dealloc(p, 160);
        let hw = a.high_water();
        for _ in 0..1000 {
            let p = a.alloc(&mut mem, 160).unwrap();
            a.dealloc(p, 160);
        }
        assert_eq!(a.high_water(), hw);
        assert_eq!(a.live_bytes(), 0);
    }
}
