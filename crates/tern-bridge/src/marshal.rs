//! Data conversion across the boundary.
//!
//! Strings and handle arrays travel through linear memory; this module
//! owns the encoding rules. String decoding is strict UTF-8 with no
//! replacement characters, handle arrays are positional 32-bit words, and
//! return-area pairs are read through the signed word view and normalized
//! to unsigned, since the guest has no signed/unsigned distinction for
//! these fields.

use crate::view::{ByteView, ViewCache};
use tern_core::handle::WORD;
use tern_core::{BridgeError, HeapHandle, MarshalError, MemPtr};
use tern_guest::{GuestModule, LinearMemory};

/// Decode `len` bytes at `ptr` as UTF-8.
///
/// Any invalid sequence fails the whole decode; no partial or lossy result
/// is ever produced.
pub fn decode_string(view: &ByteView<'_>, ptr: MemPtr, len: u32) -> Result<String, MarshalError> {
    let bytes = view.read(ptr, len)?.to_vec();
    String::from_utf8(bytes).map_err(|e| MarshalError::InvalidUtf8 {
        valid_up_to: e.utf8_error().valid_up_to(),
    })
}

/// Read a `(ptr, len)` pair from an 8-byte return area.
///
/// The guest writes the pair as signed words; both are normalized to the
/// unsigned range here.
pub fn read_ret_pair(
    cache: &mut ViewCache,
    mem: &LinearMemory,
    retptr: MemPtr,
) -> Result<(MemPtr, u32), MarshalError> {
    let view = cache.i32s(mem);
    let ptr = view.load(retptr)? as u32;
    let len = view.load(retptr.offset(WORD))? as u32;
    Ok((MemPtr(ptr), len))
}

/// Read `len` consecutive handle words starting at `ptr`.
///
/// Order is positional: word `i` becomes element `i` of the result.
pub fn read_handle_words(
    cache: &mut ViewCache,
    mem: &LinearMemory,
    ptr: MemPtr,
    len: u32,
) -> Result<Vec<HeapHandle>, MarshalError> {
    let view = cache.u32s(mem);
    let mut handles = Vec::with_capacity(len as usize);
    for i in 0..len {
        handles.push(HeapHandle(view.load(ptr.offset(i * WORD))?));
    }
    Ok(handles)
}

/// Write handles as consecutive words starting at `ptr`, preserving order.
pub fn write_handle_words(
    cache: &mut ViewCache,
    mem: &mut LinearMemory,
    ptr: MemPtr,
    handles: &[HeapHandle],
) -> Result<(), MarshalError> {
    let mut view = cache.u32s_mut(mem);
    for (i, handle) in handles.iter().enumerate() {
        view.store(ptr.offset(i as u32 * WORD), handle.0)?;
    }
    Ok(())
}

/// Copy host-owned bytes into freshly allocated guest memory.
///
/// Ownership of the region transfers to the guest side of the call this
/// feeds; the caller must not free it.
pub fn copy_bytes_in(
    module: &mut GuestModule,
    cache: &mut ViewCache,
    data: &[u8],
) -> Result<(MemPtr, u32), BridgeError> {
    let len = data.len() as u32;
    let ptr = module.alloc(len)?;
    if len > 0 {
        cache.bytes_mut(module.memory_mut()).write(ptr, data)?;
    }
    Ok((ptr, len))
}
