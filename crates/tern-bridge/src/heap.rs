//! The heap table: host values addressable from the guest by handle.
//!
//! The guest never receives a host reference, only a `HeapHandle` naming a
//! slot here. Slots below [`HeapTable::RESERVED`] hold immutable sentinel
//! values shared by every caller and are never recycled; the dynamic slots
//! above them cycle through a linked free list, so a released slot's next
//! occupant gets the same index but the releasing caller no longer holds a
//! claim on it.
//!
//! Use-after-release is a programmer error and is rejected: a released or
//! never-allocated handle fails with [`BridgeError::InvalidHandle`] instead
//! of reading whatever the slot holds now.

use tern_core::{BridgeError, HeapHandle, HostValue};

/// Handle of the shared "no value" sentinel.
pub const ABSENT: HeapHandle = HeapHandle(0);
/// Handle of the shared null sentinel.
pub const NULL: HeapHandle = HeapHandle(1);
/// Handle of the shared `true` sentinel.
pub const TRUE: HeapHandle = HeapHandle(2);
/// Handle of the shared `false` sentinel.
pub const FALSE: HeapHandle = HeapHandle(3);

enum Slot {
    /// Fixed shared constant; never released, never recycled.
    Sentinel(HostValue),
    /// A registered host value with exactly one logical owner.
    Live(HostValue),
    /// Released slot; links to the next free slot.
    Vacant { next: Option<u32> },
}

/// Growable registry of host values, addressed by `HeapHandle`.
pub struct HeapTable {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
}

impl HeapTable {
    /// Number of reserved sentinel slots at the bottom of the table.
    pub const RESERVED: u32 = 4;

    /// A table holding only the sentinels.
    pub fn new() -> Self {
        let slots = vec![
            Slot::Sentinel(HostValue::Absent),
            Slot::Sentinel(HostValue::Null),
            Slot::Sentinel(HostValue::Bool(true)),
            Slot::Sentinel(HostValue::Bool(false)),
        ];
        Self {
            slots,
            free_head: None,
            live: 0,
        }
    }

    /// Register a value, reusing a free slot before growing the table.
    pub fn add(&mut self, value: HostValue) -> HeapHandle {
        self.live += 1;
        match self.free_head {
            Some(index) => {
                self.free_head = match self.slots[index as usize] {
                    Slot::Vacant { next } => next,
                    // The free list only ever links vacant slots.
                    _ => unreachable!("free list head points at an occupied slot"),
                };
                self.slots[index as usize] = Slot::Live(value);
                HeapHandle(index)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot::Live(value));
                HeapHandle(index)
            }
        }
    }

    /// Read the value behind a handle without releasing it.
    pub fn get(&self, handle: HeapHandle) -> Result<&HostValue, BridgeError> {
        match self.slots.get(handle.0 as usize) {
            Some(Slot::Sentinel(v)) | Some(Slot::Live(v)) => Ok(v),
            _ => Err(BridgeError::InvalidHandle { handle: handle.0 }),
        }
    }

    /// Read the value and release the slot.
    ///
    /// Sentinel handles return a copy of their value and keep their slot;
    /// dynamic handles transfer ownership out and push the slot onto the
    /// free list.
    pub fn take(&mut self, handle: HeapHandle) -> Result<HostValue, BridgeError> {
        let index = handle.0 as usize;
        match self.slots.get(index) {
            Some(Slot::Sentinel(v)) => Ok(v.clone()),
            Some(Slot::Live(_)) => {
                let vacated = Slot::Vacant {
                    next: self.free_head,
                };
                let Slot::Live(value) = std::mem::replace(&mut self.slots[index], vacated) else {
                    unreachable!("slot kind changed between checks");
                };
                self.free_head = Some(handle.0);
                self.live -= 1;
                Ok(value)
            }
            _ => Err(BridgeError::InvalidHandle { handle: handle.0 }),
        }
    }

    /// Release a slot without returning its value.
    ///
    /// A no-op on sentinel handles.
    pub fn release(&mut self, handle: HeapHandle) -> Result<(), BridgeError> {
        self.take(handle).map(|_| ())
    }

    /// Register a second handle for the value behind `handle`.
    ///
    /// Both handles name the same underlying guest entity; releasing one
    /// leaves the other live.
    pub fn clone_handle(&mut self, handle: HeapHandle) -> Result<HeapHandle, BridgeError> {
        let value = self.get(handle)?.clone();
        Ok(self.add(value))
    }

    /// Number of live dynamic slots.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Total slots ever allocated, sentinels included.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for HeapTable {
    fn default() -> Self {
        Self::new()
    }
}
