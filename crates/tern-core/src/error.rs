//! Error taxonomy for the bridge.
//!
//! Organized by where the failure originates: marshalling ([`MarshalError`]),
//! guest execution ([`GuestTrap`]), host callbacks ([`ImportFault`]), and the
//! top-level [`BridgeError`] every public bridge operation returns. Nothing
//! is retried; a failure is fatal to that call's chain.

use crate::handle::{MemPtr, WORD};
use crate::value::ObjectKind;
use std::error::Error;
use std::fmt;

/// Data conversion failed at the host/guest boundary.
///
/// Marshalling never produces a partial or lossy result: an invalid byte
/// sequence or a bad `(ptr, len)` pair fails the whole operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarshalError {
    /// A string decode hit an invalid UTF-8 sequence.
    InvalidUtf8 {
        /// Number of valid bytes before the offending sequence.
        valid_up_to: usize,
    },
    /// A `(ptr, len)` pair reaches past the end of linear memory.
    OutOfBounds {
        /// Start of the requested range.
        ptr: MemPtr,
        /// Length of the requested range in bytes.
        len: u32,
        /// Current linear memory size in bytes.
        memory_len: usize,
    },
    /// A 32-bit access was not aligned to a word boundary.
    Misaligned {
        /// The offending pointer.
        ptr: MemPtr,
    },
    /// A decoded heap slot held a different kind of value than the
    /// marshalled array promised.
    UnexpectedValue {
        /// The kind the decoder expected at this position.
        expected: ObjectKind,
    },
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8 { valid_up_to } => {
                write!(f, "invalid utf-8 after {valid_up_to} bytes")
            }
            Self::OutOfBounds {
                ptr,
                len,
                memory_len,
            } => write!(
                f,
                "range {ptr}+{len} exceeds linear memory of {memory_len} bytes"
            ),
            Self::Misaligned { ptr } => {
                write!(f, "{ptr} is not aligned to {WORD} bytes")
            }
            Self::UnexpectedValue { expected } => {
                write!(f, "heap slot does not hold the expected {expected} value")
            }
        }
    }
}

impl Error for MarshalError {}

/// The guest rejected or aborted a boundary call.
///
/// Traps are checked preconditions, not undefined behavior: a bad pointer or
/// a wrong entity kind is reported here instead of corrupting guest state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuestTrap {
    /// A guest pointer does not name a live store entry.
    BadPointer {
        /// The raw pointer value.
        ptr: u32,
    },
    /// A store entry exists but holds a different entity kind.
    WrongKind {
        /// The raw pointer value.
        ptr: u32,
        /// The kind the operation required.
        expected: ObjectKind,
    },
    /// A linear memory access fell outside the current buffer.
    OutOfBounds {
        /// Start of the access.
        ptr: u32,
        /// Length of the access in bytes.
        len: u32,
    },
    /// The guest allocator could not satisfy a request.
    OutOfMemory {
        /// Requested size in bytes.
        requested: u32,
    },
    /// A generation boundary was crossed with no animals to breed from.
    PopulationEmpty,
    /// A host service invoked by the guest reported failure.
    ///
    /// The corresponding [`ImportFault`] is waiting in the exception slot;
    /// the bridge surfaces it in preference to this trap.
    ImportFailed,
}

impl fmt::Display for GuestTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPointer { ptr } => write!(f, "guest pointer {ptr} is not live"),
            Self::WrongKind { ptr, expected } => {
                write!(f, "guest pointer {ptr} does not hold a {expected}")
            }
            Self::OutOfBounds { ptr, len } => {
                write!(f, "guest memory access {ptr:#x}+{len} out of bounds")
            }
            Self::OutOfMemory { requested } => {
                write!(f, "guest allocator cannot provide {requested} bytes")
            }
            Self::PopulationEmpty => {
                write!(f, "cannot evolve an empty population")
            }
            Self::ImportFailed => write!(f, "a host import reported failure"),
        }
    }
}

impl Error for GuestTrap {}

/// An error raised by a host callback while the guest was executing.
///
/// The guest's execution environment cannot unwind through a foreign stack,
/// so the fault parks in the exception slot until the triggering boundary
/// call returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportFault {
    /// Human-readable description of the failure.
    pub message: String,
}

impl ImportFault {
    /// Create a fault from anything stringy.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ImportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host import fault: {}", self.message)
    }
}

impl Error for ImportFault {}

/// Top-level error returned by every public bridge operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeError {
    /// Data conversion failed.
    Marshal(MarshalError),
    /// A host callback failed during the call; surfaced exactly once.
    BoundaryFault(ImportFault),
    /// The guest trapped.
    Guest(GuestTrap),
    /// An operation used a wrapper object that was already destroyed.
    UseAfterFree {
        /// Kind of the destroyed wrapper.
        kind: ObjectKind,
    },
    /// A heap table operation named a released or unknown handle.
    InvalidHandle {
        /// The raw handle value.
        handle: u32,
    },
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marshal(e) => write!(f, "marshal error: {e}"),
            Self::BoundaryFault(e) => write!(f, "boundary fault: {e}"),
            Self::Guest(e) => write!(f, "guest trap: {e}"),
            Self::UseAfterFree { kind } => {
                write!(f, "{kind} wrapper was already destroyed")
            }
            Self::InvalidHandle { handle } => {
                write!(f, "heap handle {handle} is released or unknown")
            }
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Marshal(e) => Some(e),
            Self::BoundaryFault(e) => Some(e),
            Self::Guest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MarshalError> for BridgeError {
    fn from(e: MarshalError) -> Self {
        Self::Marshal(e)
    }
}

impl From<GuestTrap> for BridgeError {
    fn from(e: GuestTrap) -> Self {
        Self::Guest(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_key_facts() {
        let e = MarshalError::OutOfBounds {
            ptr: MemPtr(32),
            len: 8,
            memory_len: 16,
        };
        let s = e.to_string();
        assert!(s.contains("0x20"));
        assert!(s.contains("16 bytes"));
    }

    #[test]
    fn bridge_error_source_chains() {
        let e = BridgeError::Guest(GuestTrap::BadPointer { ptr: 5 });
        assert!(e.source().is_some());
        let e = BridgeError::UseAfterFree {
            kind: ObjectKind::World,
        };
        assert!(e.source().is_none());
    }

    #[test]
    fn conversions_wrap() {
        let e: BridgeError = MarshalError::InvalidUtf8 { valid_up_to: 3 }.into();
        assert!(matches!(e, BridgeError::Marshal(_)));
        let e: BridgeError = GuestTrap::ImportFailed.into();
        assert!(matches!(e, BridgeError::Guest(_)));
    }
}
