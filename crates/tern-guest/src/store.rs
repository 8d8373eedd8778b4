//! Guest object store.
//!
//! A slab of guest entities addressed by [`GuestPtr`]. Slot 0 is reserved
//! so a zeroed pointer is always invalid, which is what lets host wrapper
//! objects use 0 as their "destroyed" sentinel. Staleness protection lives
//! on the host side (wrappers zero their pointer exactly once); the store
//! itself only rejects pointers that do not name a live entry.

use crate::sim::Simulation;
use crate::world::{Animal, Food};
use tern_core::{GuestPtr, GuestTrap, ObjectKind};

/// A guest entity reachable from the host by handle.
pub enum GuestObject {
    /// A whole simulation, owning its world and evolution state.
    Simulation(Simulation),
    /// A borrowed alias of a simulation's internal world.
    ///
    /// Releasing a `WorldRef` drops only the alias, never the world data,
    /// which lives inside the simulation it points at.
    WorldRef {
        /// The simulation whose world this aliases.
        sim: GuestPtr,
    },
    /// A detached animal: a snapshot read out of a world, or a staged
    /// entity waiting to be moved into one.
    Animal(Animal),
    /// A detached food pellet.
    Food(Food),
}

impl GuestObject {
    /// The entity kind, for trap messages.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Simulation(_) => ObjectKind::Simulation,
            Self::WorldRef { .. } => ObjectKind::World,
            Self::Animal(_) => ObjectKind::Animal,
            Self::Food(_) => ObjectKind::Food,
        }
    }
}

/// Slab of guest entities with free-list slot reuse.
pub struct ObjectStore {
    slots: Vec<Option<GuestObject>>,
    free: Vec<u32>,
}

impl ObjectStore {
    /// Create a store with slot 0 permanently reserved.
    pub fn new() -> Self {
        Self {
            slots: vec![None],
            free: Vec::new(),
        }
    }

    /// Insert an entity, returning its pointer.
    pub fn insert(&mut self, obj: GuestObject) -> GuestPtr {
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(obj);
            GuestPtr(idx)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Some(obj));
            GuestPtr(idx)
        }
    }

    /// Borrow the entity behind a pointer.
    pub fn get(&self, ptr: GuestPtr) -> Result<&GuestObject, GuestTrap> {
        self.slots
            .get(ptr.0 as usize)
            .and_then(|s| s.as_ref())
            .ok_or(GuestTrap::BadPointer { ptr: ptr.0 })
    }

    /// Mutably borrow the entity behind a pointer.
    pub fn get_mut(&mut self, ptr: GuestPtr) -> Result<&mut GuestObject, GuestTrap> {
        self.slots
            .get_mut(ptr.0 as usize)
            .and_then(|s| s.as_mut())
            .ok_or(GuestTrap::BadPointer { ptr: ptr.0 })
    }

    /// Remove and return the entity behind a pointer, freeing its slot.
    pub fn remove(&mut self, ptr: GuestPtr) -> Result<GuestObject, GuestTrap> {
        let slot = self
            .slots
            .get_mut(ptr.0 as usize)
            .ok_or(GuestTrap::BadPointer { ptr: ptr.0 })?;
        let obj = slot.take().ok_or(GuestTrap::BadPointer { ptr: ptr.0 })?;
        self.free.push(ptr.0);
        Ok(obj)
    }

    /// Number of live entities.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}
