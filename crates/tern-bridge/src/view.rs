//! Typed views over guest linear memory, revalidated on growth.
//!
//! Guest memory can be reallocated by any boundary call that allocates, so
//! a raw address cached on the host side can go stale at every call. The
//! [`ViewCache`] gates each access behind the memory's `(generation, len)`
//! pair: when either changed since the last access, the cached identity is
//! replaced and a rebuild is counted. Views themselves are transient
//! borrows handed out per access, so a stale view cannot outlive the
//! buffer it was built over; the cache makes the rebuild rule observable
//! and keeps the accounting honest.
//!
//! Three view types are maintained: raw bytes, signed 32-bit words, and
//! unsigned 32-bit words. Word views are little-endian and reject
//! unaligned pointers.

use tern_core::handle::WORD;
use tern_core::{MarshalError, MemPtr};
use tern_guest::LinearMemory;

/// Identity-checked gateway to typed views over linear memory.
pub struct ViewCache {
    generation: u64,
    len: usize,
    rebuilds: u64,
}

impl ViewCache {
    /// A cache keyed to nothing; the first access always rebuilds.
    pub fn new() -> Self {
        Self {
            generation: u64::MAX,
            len: 0,
            rebuilds: 0,
        }
    }

    /// Byte view over the current buffer.
    pub fn bytes<'m>(&mut self, mem: &'m LinearMemory) -> ByteView<'m> {
        self.revalidate(mem);
        ByteView { bytes: mem.bytes() }
    }

    /// Mutable byte view over the current buffer.
    pub fn bytes_mut<'m>(&mut self, mem: &'m mut LinearMemory) -> ByteViewMut<'m> {
        self.revalidate(mem);
        ByteViewMut {
            bytes: mem.bytes_mut(),
        }
    }

    /// Signed 32-bit word view over the current buffer.
    pub fn i32s<'m>(&mut self, mem: &'m LinearMemory) -> I32View<'m> {
        self.revalidate(mem);
        I32View { bytes: mem.bytes() }
    }

    /// Unsigned 32-bit word view over the current buffer.
    pub fn u32s<'m>(&mut self, mem: &'m LinearMemory) -> U32View<'m> {
        self.revalidate(mem);
        U32View { bytes: mem.bytes() }
    }

    /// Mutable unsigned 32-bit word view over the current buffer.
    pub fn u32s_mut<'m>(&mut self, mem: &'m mut LinearMemory) -> U32ViewMut<'m> {
        self.revalidate(mem);
        U32ViewMut {
            bytes: mem.bytes_mut(),
        }
    }

    /// Times the cached identity went stale and was replaced.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    fn revalidate(&mut self, mem: &LinearMemory) {
        if self.generation != mem.generation() || self.len != mem.len() {
            self.generation = mem.generation();
            self.len = mem.len();
            self.rebuilds += 1;
        }
    }
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new()
    }
}

fn check_range(bytes: &[u8], ptr: MemPtr, len: u32) -> Result<usize, MarshalError> {
    let start = ptr.0 as usize;
    start
        .checked_add(len as usize)
        .filter(|&end| end <= bytes.len())
        .ok_or(MarshalError::OutOfBounds {
            ptr,
            len,
            memory_len: bytes.len(),
        })?;
    Ok(start)
}

fn check_word(bytes: &[u8], ptr: MemPtr) -> Result<usize, MarshalError> {
    if ptr.0 % WORD != 0 {
        return Err(MarshalError::Misaligned { ptr });
    }
    check_range(bytes, ptr, WORD)
}

/// Read-only byte overlay.
pub struct ByteView<'m> {
    bytes: &'m [u8],
}

impl ByteView<'_> {
    /// Borrow `len` bytes at `ptr`, without copying.
    pub fn read(&self, ptr: MemPtr, len: u32) -> Result<&[u8], MarshalError> {
        let start = check_range(self.bytes, ptr, len)?;
        Ok(&self.bytes[start..start + len as usize])
    }
}

/// Mutable byte overlay.
pub struct ByteViewMut<'m> {
    bytes: &'m mut [u8],
}

impl ByteViewMut<'_> {
    /// Copy `data` into memory at `ptr`.
    pub fn write(&mut self, ptr: MemPtr, data: &[u8]) -> Result<(), MarshalError> {
        let start = check_range(self.bytes, ptr, data.len() as u32)?;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// Read-only signed 32-bit word overlay. Used for return-area pairs, which
/// the guest writes as signed words.
pub struct I32View<'m> {
    bytes: &'m [u8],
}

impl I32View<'_> {
    /// Load the little-endian word at `ptr`.
    pub fn load(&self, ptr: MemPtr) -> Result<i32, MarshalError> {
        let start = check_word(self.bytes, ptr)?;
        let b = &self.bytes[start..start + WORD as usize];
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Read-only unsigned 32-bit word overlay. Used for handle arrays.
pub struct U32View<'m> {
    bytes: &'m [u8],
}

impl U32View<'_> {
    /// Load the little-endian word at `ptr`.
    pub fn load(&self, ptr: MemPtr) -> Result<u32, MarshalError> {
        let start = check_word(self.bytes, ptr)?;
        let b = &self.bytes[start..start + WORD as usize];
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Mutable unsigned 32-bit word overlay.
pub struct U32ViewMut<'m> {
    bytes: &'m mut [u8],
}

impl U32ViewMut<'_> {
    /// Store a little-endian word at `ptr`.
    pub fn store(&mut self, ptr: MemPtr, value: u32) -> Result<(), MarshalError> {
        let start = check_word(self.bytes, ptr)?;
        self.bytes[start..start + WORD as usize].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}
