//! Tern: a host/guest boundary bridge around a handle-addressed evolution
//! simulation.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Tern sub-crates. For most users, adding `tern` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tern::prelude::*;
//!
//! // A deterministic session: same seed, same run.
//! let session = Session::with_seed(42);
//! let sim = session.simulation()?;
//!
//! // Step the simulation and inspect its world through the boundary.
//! sim.step()?;
//! let world = sim.world()?;
//! for animal in world.animals()? {
//!     let (x, y) = (animal.x()?, animal.y()?);
//!     assert!((0.0..1.0).contains(&x) && (0.0..1.0).contains(&y));
//!     animal.destroy()?;
//! }
//!
//! // Replace the population wholesale, host to guest.
//! world.set_animals(vec![
//!     session.animal(0.25, 0.50, 0.0)?,
//!     session.animal(0.75, 0.50, 1.5)?,
//! ])?;
//! assert_eq!(world.animals()?.len(), 2);
//! # Ok::<(), BridgeError>(())
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tern-core` | Handles, host values, the error taxonomy, the import seam |
//! | [`guest`] | `tern-guest` | The guest module: linear memory, allocator, simulation |
//! | [`bridge`] | `tern-bridge` | Session, heap table, views, marshalling, wrappers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Leaf types shared by both sides of the boundary (`tern-core`).
///
/// Handle newtypes, [`types::HostValue`], the [`types::BridgeError`]
/// taxonomy, and the [`types::HostImports`] seam.
pub use tern_core as types;

/// The guest side (`tern-guest`).
///
/// [`guest::GuestModule`] and the machinery behind it. Only needed when
/// driving the guest without a session, e.g. in harnesses.
pub use tern_guest as guest;

/// The host side (`tern-bridge`).
///
/// [`bridge::Session`] and the wrapper objects. This is the API most
/// users interact with.
pub use tern_bridge as bridge;

/// Common imports for typical Tern usage.
///
/// ```rust
/// use tern::prelude::*;
/// ```
pub mod prelude {
    pub use tern_bridge::{Animal, BridgeMetrics, Food, Session, Simulation, World};

    // Errors
    pub use tern_core::{BridgeError, GuestTrap, ImportFault, MarshalError};

    // Entropy control for deterministic sessions
    pub use tern_bridge::{EntropySource, SeededEntropy, ThreadEntropy};
}
