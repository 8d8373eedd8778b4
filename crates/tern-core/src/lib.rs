//! Core types for the Tern bridge.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! handle newtypes that keep the bridge's three address spaces apart, the
//! [`HostValue`] registry entry type, the error taxonomy, and the
//! [`HostImports`] seam through which guest code requests host services.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod handle;
pub mod imports;
pub mod value;

pub use error::{BridgeError, GuestTrap, ImportFault, MarshalError};
pub use handle::{GuestPtr, HeapHandle, MemPtr};
pub use imports::HostImports;
pub use value::{HostValue, ObjectKind};
