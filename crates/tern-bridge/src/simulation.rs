//! The `Simulation` wrapper: the root object of a session's domain API.

use crate::marshal;
use crate::session::{BoundaryEnv, Session};
use crate::world::World;
use crate::wrapper::WrapperCore;
use tern_core::{BridgeError, GuestPtr, MemPtr, ObjectKind};
use tern_guest::GuestModule;

/// Host proxy for one guest simulation.
///
/// Created through [`Session::simulation`]. Holds exactly one guest
/// handle; all state lives guest-side.
pub struct Simulation {
    core: WrapperCore,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("destroyed", &self.core.is_destroyed())
            .finish()
    }
}

impl Simulation {
    pub(crate) fn from_raw(session: Session, ptr: GuestPtr) -> Self {
        Self {
            core: WrapperCore::new(session, ObjectKind::Simulation, ptr),
        }
    }

    /// Advance the simulation one discrete step.
    pub fn step(&self) -> Result<(), BridgeError> {
        let ptr = self.core.require()?;
        self.core
            .session()
            .call(move |module, _| Ok(module.simulation_step(ptr)?))
    }

    /// Repopulate from the fittest animal under the guest's internal
    /// fitness criterion.
    pub fn choose_best(&self) -> Result<(), BridgeError> {
        let ptr = self.core.require()?;
        self.core
            .session()
            .call(move |module, _| Ok(module.simulation_choose_best(ptr)?))
    }

    /// Run a full generation cycle and return the guest's summary line.
    ///
    /// The summary's content is guest-defined and treated as opaque here;
    /// only its transport (a pointer and length decoded as strict UTF-8,
    /// then freed) belongs to the bridge. Long-running: the call blocks
    /// until the generation boundary is crossed, with no cancellation.
    pub fn train(&self) -> Result<String, BridgeError> {
        let ptr = self.core.require()?;
        self.core.session().call(move |module, env| {
            let retptr = module.alloc(8)?;
            let summary = match module.simulation_train(ptr, retptr) {
                Ok(()) => decode_summary(module, env, retptr),
                Err(trap) => Err(trap.into()),
            };
            // The return area is freed on every path, trap or not.
            module.dealloc(retptr, 8);
            summary
        })
    }

    /// A wrapper for the simulation's world.
    ///
    /// The world is borrowed: destroying the returned wrapper releases
    /// the alias only, never the world data. Calling this twice yields
    /// two distinct wrappers observing the same underlying state.
    pub fn world(&self) -> Result<World, BridgeError> {
        let ptr = self.core.require()?;
        let world = self
            .core
            .session()
            .call(move |module, _| Ok(module.simulation_world(ptr)?))?;
        Ok(World::from_raw(self.core.session().clone(), world))
    }

    /// Whether this wrapper's handle has been cleared.
    pub fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }

    /// Release the guest simulation. Idempotent.
    pub fn destroy(&self) -> Result<(), BridgeError> {
        self.core.destroy()
    }
}

/// Decode the summary string described by `retptr` and free its
/// transport scratch, whether or not decoding succeeded.
fn decode_summary(
    module: &mut GuestModule,
    env: &mut BoundaryEnv<'_>,
    retptr: MemPtr,
) -> Result<String, BridgeError> {
    let (sptr, len) = marshal::read_ret_pair(env.views, module.memory(), retptr)?;
    let decoded = marshal::decode_string(&env.views.bytes(module.memory()), sptr, len);
    module.dealloc(sptr, len);
    Ok(decoded?)
}
