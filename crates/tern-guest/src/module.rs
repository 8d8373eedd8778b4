//! The exported boundary surface.
//!
//! Every host-visible entry point lives here, taking handles in and
//! handing handles or `(ptr, len)` pairs out. Conversion happens at this
//! edge: entities never leave as references, bulk data always travels
//! through linear memory, and host services arrive as `&mut dyn
//! HostImports` per call.
//!
//! Multi-word results use an 8-byte return area supplied by the caller:
//! the pointer lands at `retptr`, the length at `retptr + 4`, both as
//! little-endian 32-bit words.

use crate::alloc::GuestAllocator;
use crate::evolve::PopulationEmpty;
use crate::memory::LinearMemory;
use crate::sim::Simulation;
use crate::store::{GuestObject, ObjectStore};
use crate::world::{Animal, Food};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tern_core::handle::WORD;
use tern_core::{GuestPtr, GuestTrap, HeapHandle, HostImports, HostValue, MemPtr, ObjectKind};

/// The compiled module: linear memory, allocator, object store, and the
/// simulation entities living behind them.
pub struct GuestModule {
    memory: LinearMemory,
    allocator: GuestAllocator,
    store: ObjectStore,
}

impl GuestModule {
    /// A fresh module instance with empty state.
    pub fn new() -> Self {
        Self {
            memory: LinearMemory::new(),
            allocator: GuestAllocator::new(),
            store: ObjectStore::new(),
        }
    }

    /// The module's linear memory. Host views are built over this.
    pub fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    /// Mutable linear memory, for host-side writes through the view layer.
    pub fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    /// Number of live entities in the object store.
    pub fn live_objects(&self) -> usize {
        self.store.live_count()
    }

    /// Bytes currently allocated out of linear memory.
    pub fn allocated_bytes(&self) -> u32 {
        self.allocator.live_bytes()
    }

    // ── allocator exports ────────────────────────────────────────────

    /// Allocate scratch space in linear memory.
    pub fn alloc(&mut self, size: u32) -> Result<MemPtr, GuestTrap> {
        self.allocator.alloc(&mut self.memory, size)
    }

    /// Release scratch space. `size` must match the original request.
    pub fn dealloc(&mut self, ptr: MemPtr, size: u32) {
        self.allocator.dealloc(ptr, size);
    }

    // ── constructors ─────────────────────────────────────────────────

    /// Create a simulation seeded from host entropy.
    pub fn simulation_new(&mut self, host: &mut dyn HostImports) -> Result<GuestPtr, GuestTrap> {
        let seed = seed_from_host(host)?;
        let sim = Simulation::random(seed);
        Ok(self.store.insert(GuestObject::Simulation(sim)))
    }

    /// Create a detached animal at the given position and heading.
    ///
    /// The brain is freshly random (seeded from host entropy) so the
    /// animal is viable once moved into a world.
    pub fn animal_new(
        &mut self,
        host: &mut dyn HostImports,
        x: f32,
        y: f32,
        rotation: f32,
    ) -> Result<GuestPtr, GuestTrap> {
        let seed = seed_from_host(host)?;
        let mut rng = ChaCha8Rng::from_seed(seed);
        let animal = Animal::placed(&mut rng, x, y, rotation);
        Ok(self.store.insert(GuestObject::Animal(animal)))
    }

    /// Create a detached food pellet.
    pub fn food_new(&mut self, x: f32, y: f32) -> Result<GuestPtr, GuestTrap> {
        Ok(self.store.insert(GuestObject::Food(Food::new(x, y))))
    }

    // ── releases ─────────────────────────────────────────────────────

    /// Release a simulation and everything it owns.
    pub fn simulation_drop(&mut self, ptr: GuestPtr) -> Result<(), GuestTrap> {
        self.drop_kind(ptr, ObjectKind::Simulation)
    }

    /// Release a world alias. The underlying world data stays with its
    /// simulation.
    pub fn world_drop(&mut self, ptr: GuestPtr) -> Result<(), GuestTrap> {
        self.drop_kind(ptr, ObjectKind::World)
    }

    /// Release a detached animal.
    pub fn animal_drop(&mut self, ptr: GuestPtr) -> Result<(), GuestTrap> {
        self.drop_kind(ptr, ObjectKind::Animal)
    }

    /// Release a detached food pellet.
    pub fn food_drop(&mut self, ptr: GuestPtr) -> Result<(), GuestTrap> {
        self.drop_kind(ptr, ObjectKind::Food)
    }

    // ── simulation operations ────────────────────────────────────────

    /// Hand out a borrowed alias of the simulation's world.
    ///
    /// Each call creates a fresh alias entry; all aliases observe the
    /// same underlying world.
    pub fn simulation_world(&mut self, sim: GuestPtr) -> Result<GuestPtr, GuestTrap> {
        self.sim_ref(sim)?;
        Ok(self.store.insert(GuestObject::WorldRef { sim }))
    }

    /// Advance the simulation one step.
    ///
    /// Traps with [`GuestTrap::PopulationEmpty`] when the step closes a
    /// generation and the world has no animals to breed from.
    pub fn simulation_step(&mut self, sim: GuestPtr) -> Result<(), GuestTrap> {
        self.sim_mut(sim)?.step()?;
        Ok(())
    }

    /// Repopulate from the fittest animal and respawn foods.
    pub fn simulation_choose_best(&mut self, sim: GuestPtr) -> Result<(), GuestTrap> {
        self.sim_mut(sim)?.choose_best();
        Ok(())
    }

    /// Run out the generation; the summary string lands in scratch memory
    /// described by the return area. The caller decodes and then frees
    /// both the scratch and the return area.
    ///
    /// Traps with [`GuestTrap::PopulationEmpty`] on an extinct world,
    /// before any stepping happens.
    pub fn simulation_train(&mut self, sim: GuestPtr, retptr: MemPtr) -> Result<(), GuestTrap> {
        let summary = self.sim_mut(sim)?.train()?;
        let bytes = summary.into_bytes();
        let len = bytes.len() as u32;
        let ptr = self.alloc(len)?;
        self.memory.slice_mut(ptr, len)?.copy_from_slice(&bytes);
        self.write_ret_pair(retptr, ptr, len)
    }

    // ── world collection marshalling ─────────────────────────────────

    /// Marshal the world's animals out as a handle array.
    ///
    /// Snapshots each animal into the store, registers it with the host,
    /// and writes the handles as consecutive words into freshly allocated
    /// scratch described by the return area. The caller owns the scratch.
    pub fn world_get_animals(
        &mut self,
        world: GuestPtr,
        retptr: MemPtr,
        host: &mut dyn HostImports,
    ) -> Result<(), GuestTrap> {
        let sim = self.world_sim(world)?;
        let snapshot = self.sim_ref(sim)?.world().animals.clone();
        let (ptr, len) = self.export_array(snapshot, GuestObject::Animal, HostValue::Animal, host)?;
        self.write_ret_pair(retptr, ptr, len)
    }

    /// Marshal the world's foods out as a handle array.
    pub fn world_get_foods(
        &mut self,
        world: GuestPtr,
        retptr: MemPtr,
        host: &mut dyn HostImports,
    ) -> Result<(), GuestTrap> {
        let sim = self.world_sim(world)?;
        let snapshot = self.sim_ref(sim)?.world().foods.clone();
        let (ptr, len) = self.export_array(snapshot, GuestObject::Food, HostValue::Food, host)?;
        self.write_ret_pair(retptr, ptr, len)
    }

    /// Replace the world's animals from a handle array.
    ///
    /// Reclaims each handle from the host table (ownership transfers in),
    /// moves the staged entities into the world in array order, and frees
    /// the scratch, whose ownership transferred with the call.
    pub fn world_set_animals(
        &mut self,
        world: GuestPtr,
        ptr: MemPtr,
        len: u32,
        host: &mut dyn HostImports,
    ) -> Result<(), GuestTrap> {
        let sim = self.world_sim(world)?;
        let mut incoming = Vec::with_capacity(len as usize);
        for i in 0..len {
            let gp = self.reclaim_entity(ptr, i, ObjectKind::Animal, host)?;
            match self.store.remove(gp)? {
                GuestObject::Animal(a) => incoming.push(a),
                _ => {
                    return Err(GuestTrap::WrongKind {
                        ptr: gp.0,
                        expected: ObjectKind::Animal,
                    })
                }
            }
        }
        self.sim_mut(sim)?.world_mut().animals = incoming;
        self.dealloc(ptr, len.saturating_mul(WORD));
        Ok(())
    }

    /// Replace the world's foods from a handle array.
    pub fn world_set_foods(
        &mut self,
        world: GuestPtr,
        ptr: MemPtr,
        len: u32,
        host: &mut dyn HostImports,
    ) -> Result<(), GuestTrap> {
        let sim = self.world_sim(world)?;
        let mut incoming = Vec::with_capacity(len as usize);
        for i in 0..len {
            let gp = self.reclaim_entity(ptr, i, ObjectKind::Food, host)?;
            match self.store.remove(gp)? {
                GuestObject::Food(f) => incoming.push(f),
                _ => {
                    return Err(GuestTrap::WrongKind {
                        ptr: gp.0,
                        expected: ObjectKind::Food,
                    })
                }
            }
        }
        self.sim_mut(sim)?.world_mut().foods = incoming;
        self.dealloc(ptr, len.saturating_mul(WORD));
        Ok(())
    }

    // ── property accessors ───────────────────────────────────────────

    /// Horizontal position of a detached animal.
    pub fn animal_get_x(&self, ptr: GuestPtr) -> Result<f32, GuestTrap> {
        Ok(self.animal_ref(ptr)?.x)
    }

    /// Vertical position of a detached animal.
    pub fn animal_get_y(&self, ptr: GuestPtr) -> Result<f32, GuestTrap> {
        Ok(self.animal_ref(ptr)?.y)
    }

    /// Heading of a detached animal, in radians.
    pub fn animal_get_rotation(&self, ptr: GuestPtr) -> Result<f32, GuestTrap> {
        Ok(self.animal_ref(ptr)?.rotation)
    }

    /// Set the horizontal position of a detached animal.
    pub fn animal_set_x(&mut self, ptr: GuestPtr, x: f32) -> Result<(), GuestTrap> {
        self.animal_mut(ptr)?.x = x;
        Ok(())
    }

    /// Set the vertical position of a detached animal.
    pub fn animal_set_y(&mut self, ptr: GuestPtr, y: f32) -> Result<(), GuestTrap> {
        self.animal_mut(ptr)?.y = y;
        Ok(())
    }

    /// Set the heading of a detached animal.
    pub fn animal_set_rotation(&mut self, ptr: GuestPtr, rotation: f32) -> Result<(), GuestTrap> {
        self.animal_mut(ptr)?.rotation = rotation;
        Ok(())
    }

    /// Horizontal position of a detached food pellet.
    pub fn food_get_x(&self, ptr: GuestPtr) -> Result<f32, GuestTrap> {
        Ok(self.food_ref(ptr)?.x)
    }

    /// Vertical position of a detached food pellet.
    pub fn food_get_y(&self, ptr: GuestPtr) -> Result<f32, GuestTrap> {
        Ok(self.food_ref(ptr)?.y)
    }

    /// Set the horizontal position of a detached food pellet.
    pub fn food_set_x(&mut self, ptr: GuestPtr, x: f32) -> Result<(), GuestTrap> {
        self.food_mut(ptr)?.x = x;
        Ok(())
    }

    /// Set the vertical position of a detached food pellet.
    pub fn food_set_y(&mut self, ptr: GuestPtr, y: f32) -> Result<(), GuestTrap> {
        self.food_mut(ptr)?.y = y;
        Ok(())
    }

    // ── internals ────────────────────────────────────────────────────

    /// Snapshot entities into the store and write their host handles as
    /// consecutive words into fresh scratch.
    fn export_array<T>(
        &mut self,
        snapshot: Vec<T>,
        wrap: impl Fn(T) -> GuestObject,
        value: impl Fn(GuestPtr) -> HostValue,
        host: &mut dyn HostImports,
    ) -> Result<(MemPtr, u32), GuestTrap> {
        let len = snapshot.len() as u32;
        let bytes = len
            .checked_mul(WORD)
            .ok_or(GuestTrap::OutOfMemory { requested: u32::MAX })?;
        let ptr = self.alloc(bytes)?;
        for (i, entity) in snapshot.into_iter().enumerate() {
            let gp = self.store.insert(wrap(entity));
            let handle = host.register(value(gp));
            self.memory
                .store_u32(ptr.offset(i as u32 * WORD), handle.0)?;
        }
        Ok((ptr, len))
    }

    /// Read the `i`-th handle word and reclaim the entity behind it.
    fn reclaim_entity(
        &mut self,
        ptr: MemPtr,
        i: u32,
        expected: ObjectKind,
        host: &mut dyn HostImports,
    ) -> Result<GuestPtr, GuestTrap> {
        let word = self.memory.load_u32(ptr.offset(i * WORD))?;
        let value = host
            .reclaim(HeapHandle(word))
            .map_err(|_| GuestTrap::ImportFailed)?;
        match value.guest_ptr() {
            Some(gp) if value.kind() == Some(expected) => Ok(gp),
            _ => Err(GuestTrap::WrongKind {
                ptr: value.guest_ptr().map_or(0, |g| g.0),
                expected,
            }),
        }
    }

    fn write_ret_pair(&mut self, retptr: MemPtr, ptr: MemPtr, len: u32) -> Result<(), GuestTrap> {
        self.memory.store_i32(retptr, ptr.0 as i32)?;
        self.memory.store_i32(retptr.offset(WORD), len as i32)?;
        Ok(())
    }

    fn drop_kind(&mut self, ptr: GuestPtr, expected: ObjectKind) -> Result<(), GuestTrap> {
        let kind = self.store.get(ptr)?.kind();
        if kind != expected {
            return Err(GuestTrap::WrongKind {
                ptr: ptr.0,
                expected,
            });
        }
        self.store.remove(ptr)?;
        Ok(())
    }

    fn sim_ref(&self, ptr: GuestPtr) -> Result<&Simulation, GuestTrap> {
        match self.store.get(ptr)? {
            GuestObject::Simulation(s) => Ok(s),
            _ => Err(GuestTrap::WrongKind {
                ptr: ptr.0,
                expected: ObjectKind::Simulation,
            }),
        }
    }

    fn sim_mut(&mut self, ptr: GuestPtr) -> Result<&mut Simulation, GuestTrap> {
        match self.store.get_mut(ptr)? {
            GuestObject::Simulation(s) => Ok(s),
            _ => Err(GuestTrap::WrongKind {
                ptr: ptr.0,
                expected: ObjectKind::Simulation,
            }),
        }
    }

    /// Resolve a world alias to the simulation owning the world data.
    fn world_sim(&self, world: GuestPtr) -> Result<GuestPtr, GuestTrap> {
        match self.store.get(world)? {
            GuestObject::WorldRef { sim } => Ok(*sim),
            _ => Err(GuestTrap::WrongKind {
                ptr: world.0,
                expected: ObjectKind::World,
            }),
        }
    }

    fn animal_ref(&self, ptr: GuestPtr) -> Result<&Animal, GuestTrap> {
        match self.store.get(ptr)? {
            GuestObject::Animal(a) => Ok(a),
            _ => Err(GuestTrap::WrongKind {
                ptr: ptr.0,
                expected: ObjectKind::Animal,
            }),
        }
    }

    fn animal_mut(&mut self, ptr: GuestPtr) -> Result<&mut Animal, GuestTrap> {
        match self.store.get_mut(ptr)? {
            GuestObject::Animal(a) => Ok(a),
            _ => Err(GuestTrap::WrongKind {
                ptr: ptr.0,
                expected: ObjectKind::Animal,
            }),
        }
    }

    fn food_ref(&self, ptr: GuestPtr) -> Result<&Food, GuestTrap> {
        match self.store.get(ptr)? {
            GuestObject::Food(f) => Ok(f),
            _ => Err(GuestTrap::WrongKind {
                ptr: ptr.0,
                expected: ObjectKind::Food,
            }),
        }
    }

    fn food_mut(&mut self, ptr: GuestPtr) -> Result<&mut Food, GuestTrap> {
        match self.store.get_mut(ptr)? {
            GuestObject::Food(f) => Ok(f),
            _ => Err(GuestTrap::WrongKind {
                ptr: ptr.0,
                expected: ObjectKind::Food,
            }),
        }
    }
}

impl Default for GuestModule {
    fn default() -> Self {
        Self::new()
    }
}

impl From<PopulationEmpty> for GuestTrap {
    fn from(_: PopulationEmpty) -> Self {
        GuestTrap::PopulationEmpty
    }
}

fn seed_from_host(host: &mut dyn HostImports) -> Result<[u8; 32], GuestTrap> {
    let mut seed = [0u8; 32];
    host.fill_random(&mut seed)
        .map_err(|_| GuestTrap::ImportFailed)?;
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use tern_core::ImportFault;

    /// Minimal host: deterministic entropy plus a naive value table.
    struct TestHost {
        rng: ChaCha8Rng,
        table: Vec<Option<HostValue>>,
        fail_random: bool,
    }

    impl TestHost {
        fn new(seed: u64) -> Self {
            Self {
                rng: ChaCha8Rng::seed_from_u64(seed),
                table: Vec::new(),
                fail_random: false,
            }
        }
    }

    impl HostImports for TestHost {
        fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), ImportFault> {
            if self.fail_random {
                return Err(ImportFault::new("entropy unavailable"));
            }
            self.rng.fill_bytes(buf);
            Ok(())
        }

        fn register(&mut self, value: HostValue) -> HeapHandle {
            self.table.push(Some(value));
            HeapHandle(self.table.len() as u32 - 1)
        }

        fn reclaim(&mut self, handle: HeapHandle) -> Result<HostValue, ImportFault> {
            self.table
                .get_mut(handle.0 as usize)
                .and_then(Option::take)
                .ok_or_else(|| ImportFault::new("unknown handle"))
        }
    }

    #[test]
    fn simulation_lifecycle() {
        let mut m = GuestModule::new();
        let mut host = TestHost::new(1);
        let sim = m.simulation_new(&mut host).unwrap();
        m.simulation_step(sim).unwrap();
        m.simulation_choose_best(sim).unwrap();
        m.simulation_drop(sim).unwrap();
        assert_eq!(m.live_objects(), 0);
    }

    #[test]
    fn failed_entropy_import_traps() {
        let mut m = GuestModule::new();
        let mut host = TestHost::new(2);
        host.fail_random = true;
        assert_eq!(
            m.simulation_new(&mut host),
            Err(GuestTrap::ImportFailed)
        );
    }

    #[test]
    fn world_alias_resolves_to_same_world() {
        let mut m = GuestModule::new();
        let mut host = TestHost::new(3);
        let sim = m.simulation_new(&mut host).unwrap();
        let w1 = m.simulation_world(sim).unwrap();
        let w2 = m.simulation_world(sim).unwrap();
        assert_ne!(w1, w2);
        assert_eq!(m.world_sim(w1).unwrap(), m.world_sim(w2).unwrap());

        // Dropping one alias leaves the other usable.
        m.world_drop(w1).unwrap();
        let retptr = m.alloc(8).unwrap();
        m.world_get_foods(w2, retptr, &mut host).unwrap();
    }

    #[test]
    fn get_animals_registers_one_handle_per_animal() {
        let mut m = GuestModule::new();
        let mut host = TestHost::new(4);
        let sim = m.simulation_new(&mut host).unwrap();
        let world = m.simulation_world(sim).unwrap();
        let retptr = m.alloc(8).unwrap();
        m.world_get_animals(world, retptr, &mut host).unwrap();

        let ptr = m.memory().load_u32(retptr).unwrap();
        let len = m.memory().load_u32(MemPtr(retptr.0 + WORD)).unwrap();
        assert_eq!(len as usize, crate::world::ANIMAL_COUNT);
        assert_eq!(host.table.len(), crate::world::ANIMAL_COUNT);

        // Every word resolves to a live animal entity.
        for i in 0..len {
            let word = m.memory().load_u32(MemPtr(ptr + i * WORD)).unwrap();
            let value = host.table[word as usize].clone().unwrap();
            let gp = value.guest_ptr().unwrap();
            assert!(m.animal_get_x(gp).is_ok());
        }
    }

    #[test]
    fn set_animals_replaces_collection_in_order() {
        let mut m = GuestModule::new();
        let mut host = TestHost::new(5);
        let sim = m.simulation_new(&mut host).unwrap();
        let world = m.simulation_world(sim).unwrap();

        let coords = [(0.1f32, 0.2f32, 0.3f32), (0.4, 0.5, 0.6), (0.7, 0.8, 0.9)];
        let ptr = m.alloc(3 * WORD).unwrap();
        for (i, (x, y, r)) in coords.iter().enumerate() {
            let gp = m.animal_new(&mut host, *x, *y, *r).unwrap();
            let h = host.register(HostValue::Animal(gp));
            m.memory_mut()
                .store_u32(MemPtr(ptr.0 + i as u32 * WORD), h.0)
                .unwrap();
        }
        m.world_set_animals(world, ptr, 3, &mut host).unwrap();

        let animals = &m.sim_ref(sim).unwrap().world().animals;
        assert_eq!(animals.len(), 3);
        for (a, (x, y, r)) in animals.iter().zip(coords) {
            assert_eq!((a.x, a.y, a.rotation), (x, y, r));
        }
    }

    #[test]
    fn train_writes_a_decodable_summary() {
        let mut m = GuestModule::new();
        let mut host = TestHost::new(6);
        let sim = m.simulation_new(&mut host).unwrap();
        let retptr = m.alloc(8).unwrap();
        m.simulation_train(sim, retptr).unwrap();

        let ptr = m.memory().load_u32(retptr).unwrap();
        let len = m.memory().load_u32(MemPtr(retptr.0 + WORD)).unwrap();
        let bytes = m.memory().slice(MemPtr(ptr), len).unwrap();
        let summary = std::str::from_utf8(bytes).unwrap();
        assert!(summary.starts_with("generation 1:"));
    }

    #[test]
    fn extinct_world_traps_instead_of_aborting() {
        let mut m = GuestModule::new();
        let mut host = TestHost::new(8);
        let sim = m.simulation_new(&mut host).unwrap();
        m.sim_mut(sim).unwrap().world_mut().animals.clear();

        let retptr = m.alloc(8).unwrap();
        assert_eq!(
            m.simulation_train(sim, retptr),
            Err(GuestTrap::PopulationEmpty)
        );
        // Mid-generation stepping stays legal on an empty world.
        m.simulation_step(sim).unwrap();
    }

    #[test]
    fn drop_rejects_kind_mismatch() {
        let mut m = GuestModule::new();
        let mut host = TestHost::new(7);
        let sim = m.simulation_new(&mut host).unwrap();
        assert!(matches!(
            m.animal_drop(sim),
            Err(GuestTrap::WrongKind { .. })
        ));
        // The mismatched drop must not have consumed the entity.
        m.simulation_step(sim).unwrap();
    }
}
