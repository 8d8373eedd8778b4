//! The host side of the Tern bridge.
//!
//! A [`Session`] owns one guest module instance plus everything the host
//! needs to talk to it safely: the heap table exposing host values to the
//! guest as handles, the view cache over guest linear memory, the
//! marshalling layer, the fault channel for host callback errors, and the
//! reaper that mops up wrapper objects dropped without an explicit
//! `destroy`.
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── GuestModule   (the guest instance, from tern-guest)
//! ├── HeapTable     (host values addressable by handle)
//! ├── ViewCache     (typed overlays over guest linear memory)
//! ├── FaultChannel  (parked host-callback errors)
//! └── Reaper        (deferred cleanup for dropped wrappers)
//! ```
//!
//! Callers hold wrapper objects ([`Simulation`], [`World`], [`Animal`],
//! [`Food`]); each stores one guest handle and routes every operation
//! through its session as a checked boundary call.
//!
//! # Example
//!
//! ```
//! use tern_bridge::Session;
//!
//! let session = Session::with_seed(42);
//! let sim = session.simulation()?;
//! sim.step()?;
//! let world = sim.world()?;
//! let animals = world.animals()?;
//! assert!(!animals.is_empty());
//! # Ok::<(), tern_core::BridgeError>(())
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod animal;
pub mod entropy;
pub mod fault;
pub mod food;
pub mod heap;
pub mod marshal;
pub mod metrics;
pub mod reaper;
pub mod session;
pub mod simulation;
pub mod view;
pub mod world;

mod wrapper;

pub use animal::Animal;
pub use entropy::{EntropySource, SeededEntropy, ThreadEntropy};
pub use fault::FaultChannel;
pub use food::Food;
pub use heap::HeapTable;
pub use metrics::BridgeMetrics;
pub use reaper::Reaper;
pub use session::Session;
pub use simulation::Simulation;
pub use view::ViewCache;
pub use world::World;
