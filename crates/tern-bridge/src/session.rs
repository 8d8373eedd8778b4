//! The session: one guest instance and the machinery to talk to it.
//!
//! All boundary traffic funnels through [`Session::call`]: it drains the
//! reaper, hands the closure the guest module plus a [`BoundaryEnv`]
//! implementing the guest's host-import seam, and drains the fault channel
//! when the closure returns. A parked fault takes precedence over whatever
//! the guest reported, since the fault is the original cause.
//!
//! Execution is single-threaded and fully synchronous; a boundary call
//! runs to completion before the caller regains control. Sessions are
//! cheap to clone — clones share the same guest instance.

use crate::animal::Animal;
use crate::entropy::{EntropySource, SeededEntropy, ThreadEntropy};
use crate::fault::FaultChannel;
use crate::food::Food;
use crate::heap::HeapTable;
use crate::metrics::BridgeMetrics;
use crate::reaper::Reaper;
use crate::simulation::Simulation;
use crate::view::ViewCache;
use std::cell::RefCell;
use std::rc::Rc;
use tern_core::{BridgeError, HeapHandle, HostImports, HostValue, ImportFault};
use tern_guest::GuestModule;

struct SessionInner {
    module: GuestModule,
    heap: HeapTable,
    views: ViewCache,
    faults: FaultChannel,
    entropy: Box<dyn EntropySource>,
    metrics: BridgeMetrics,
}

/// Host-side services exposed to the guest for the duration of one
/// boundary call, plus the marshalling state the wrappers need.
pub(crate) struct BoundaryEnv<'a> {
    pub(crate) heap: &'a mut HeapTable,
    pub(crate) views: &'a mut ViewCache,
    faults: &'a mut FaultChannel,
    entropy: &'a mut dyn EntropySource,
    metrics: &'a mut BridgeMetrics,
}

impl BoundaryEnv<'_> {
    /// Register a host value, counting it.
    pub(crate) fn register_value(&mut self, value: HostValue) -> HeapHandle {
        self.metrics.handles_registered += 1;
        self.heap.add(value)
    }

    /// Take a host value out of the heap table, counting it.
    pub(crate) fn take_value(&mut self, handle: HeapHandle) -> Result<HostValue, BridgeError> {
        let value = self.heap.take(handle)?;
        self.metrics.handles_reclaimed += 1;
        Ok(value)
    }

    fn park(&mut self, fault: ImportFault) {
        self.metrics.faults_parked += 1;
        self.faults.park(fault);
    }
}

impl HostImports for BoundaryEnv<'_> {
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), ImportFault> {
        match self.entropy.fill(buf) {
            Ok(()) => Ok(()),
            Err(fault) => {
                self.park(fault.clone());
                Err(fault)
            }
        }
    }

    fn register(&mut self, value: HostValue) -> HeapHandle {
        self.register_value(value)
    }

    fn reclaim(&mut self, handle: HeapHandle) -> Result<HostValue, ImportFault> {
        match self.take_value(handle) {
            Ok(value) => Ok(value),
            Err(e) => {
                let fault = ImportFault::new(e.to_string());
                self.park(fault.clone());
                Err(fault)
            }
        }
    }
}

/// A live bridge session owning one guest instance.
#[derive(Clone)]
pub struct Session {
    inner: Rc<RefCell<SessionInner>>,
    // Kept outside `inner` so wrapper drops can schedule themselves even
    // while a boundary call holds the inner borrow.
    reaper: Rc<RefCell<Reaper>>,
}

impl Session {
    /// A session drawing entropy from the thread RNG.
    pub fn new() -> Self {
        Self::with_entropy(Box::new(ThreadEntropy))
    }

    /// A deterministic session: every run with the same seed and call
    /// sequence observes identical guest state.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_entropy(Box::new(SeededEntropy::new(seed)))
    }

    /// A session with a caller-supplied entropy source.
    pub fn with_entropy(entropy: Box<dyn EntropySource>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SessionInner {
                module: GuestModule::new(),
                heap: HeapTable::new(),
                views: ViewCache::new(),
                faults: FaultChannel::new(),
                entropy,
                metrics: BridgeMetrics::default(),
            })),
            reaper: Rc::new(RefCell::new(Reaper::new())),
        }
    }

    /// Construct a new simulation in the guest.
    pub fn simulation(&self) -> Result<Simulation, BridgeError> {
        let ptr = self.call(|module, env| Ok(module.simulation_new(&mut *env)?))?;
        Ok(Simulation::from_raw(self.clone(), ptr))
    }

    /// Construct a detached animal at the given position and heading.
    pub fn animal(&self, x: f64, y: f64, rotation: f64) -> Result<Animal, BridgeError> {
        let ptr = self.call(move |module, env| {
            Ok(module.animal_new(&mut *env, x as f32, y as f32, rotation as f32)?)
        })?;
        Ok(Animal::from_raw(self.clone(), ptr))
    }

    /// Construct a detached food pellet at the given position.
    pub fn food(&self, x: f64, y: f64) -> Result<Food, BridgeError> {
        let ptr = self.call(move |module, _| Ok(module.food_new(x as f32, y as f32)?))?;
        Ok(Food::from_raw(self.clone(), ptr))
    }

    /// Snapshot of the session's cumulative counters.
    pub fn metrics(&self) -> BridgeMetrics {
        let inner = self.inner.borrow();
        let mut m = inner.metrics;
        m.view_rebuilds = inner.views.rebuilds();
        m
    }

    /// Live dynamic slots in the heap table.
    pub fn live_handles(&self) -> usize {
        self.inner.borrow().heap.live_count()
    }

    /// Live entities in the guest object store.
    pub fn guest_live_objects(&self) -> usize {
        self.inner.borrow().module.live_objects()
    }

    /// Bytes currently allocated out of guest linear memory.
    pub fn guest_allocated_bytes(&self) -> u32 {
        self.inner.borrow().module.allocated_bytes()
    }

    /// Current guest linear memory size in bytes.
    pub fn guest_memory_len(&self) -> usize {
        self.inner.borrow().module.memory().len()
    }

    /// Wrappers dropped without destroy and not yet reaped.
    pub fn pending_reaps(&self) -> usize {
        self.reaper.borrow().scheduled()
    }

    pub(crate) fn reaper(&self) -> &Rc<RefCell<Reaper>> {
        &self.reaper
    }

    /// Run one boundary call.
    ///
    /// Drains the reaper first, then the closure, then the fault channel.
    pub(crate) fn call<T>(
        &self,
        f: impl FnOnce(&mut GuestModule, &mut BoundaryEnv<'_>) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        {
            let mut reaper = self.reaper.borrow_mut();
            inner.metrics.objects_reaped += reaper.drain(&mut inner.module);
        }
        inner.metrics.boundary_calls += 1;

        let result = {
            let mut env = BoundaryEnv {
                heap: &mut inner.heap,
                views: &mut inner.views,
                faults: &mut inner.faults,
                entropy: inner.entropy.as_mut(),
                metrics: &mut inner.metrics,
            };
            f(&mut inner.module, &mut env)
        };

        match inner.faults.take() {
            Some(fault) => Err(BridgeError::BoundaryFault(fault)),
            None => result,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
