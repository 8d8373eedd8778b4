//! The guest side of the Tern bridge.
//!
//! Models a compiled module running against an isolated, growable linear
//! memory it cannot share with the host. The host reaches in only through
//! [`GuestModule`]'s exported surface; the guest reaches out only through
//! the `HostImports` seam handed into each call.
//!
//! # Architecture
//!
//! ```text
//! GuestModule (exported boundary surface)
//! ├── LinearMemory  (growable byte region, generation-counted)
//! ├── GuestAllocator (free list + bump over LinearMemory)
//! ├── ObjectStore   (slab of guest entities, GuestPtr-addressed)
//! └── Simulation    (world, brains, genetic algorithm)
//! ```
//!
//! Bulk data (strings, handle arrays) crosses the boundary through linear
//! memory; entities cross as `GuestPtr` handles only.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod alloc;
pub mod brain;
pub mod evolve;
pub mod memory;
pub mod module;
pub mod sim;
pub mod store;
pub mod world;

pub use alloc::GuestAllocator;
pub use memory::LinearMemory;
pub use module::GuestModule;
pub use sim::Simulation;
pub use store::{GuestObject, ObjectStore};
pub use world::{Animal, Food, World};
