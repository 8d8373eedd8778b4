//! The host services seam.
//!
//! Guest code never sees a host reference; everything it needs from the host
//! flows through this trait, passed into each boundary call. The bridge's
//! implementation backs `register`/`reclaim` with the heap table and records
//! failures in the exception slot before reporting them to the guest, which
//! then aborts the call with [`GuestTrap::ImportFailed`].
//!
//! [`GuestTrap::ImportFailed`]: crate::error::GuestTrap::ImportFailed

use crate::error::ImportFault;
use crate::handle::HeapHandle;
use crate::value::HostValue;

/// Services the guest may request from the host during a boundary call.
pub trait HostImports {
    /// Fill `buf` with cryptographically secure random bytes.
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<(), ImportFault>;

    /// Place a host value into the heap table, returning its handle.
    ///
    /// Used when the guest hands an entity to the host through a marshalled
    /// handle array.
    fn register(&mut self, value: HostValue) -> HeapHandle;

    /// Remove a value from the heap table, transferring ownership to the
    /// caller.
    ///
    /// Fails if the handle is released or unknown; the failure is also
    /// recorded in the exception slot so the bridge surfaces it after the
    /// triggering call returns.
    fn reclaim(&mut self, handle: HeapHandle) -> Result<HostValue, ImportFault>;
}
