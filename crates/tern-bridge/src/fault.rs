//! The fault channel: host callback errors parked during guest execution.
//!
//! The guest cannot unwind a host error through its own stack, so a host
//! callback that fails parks its fault here and reports plain failure to
//! the guest. The session drains the channel when the triggering boundary
//! call returns and raises the fault to the original caller, exactly once.
//!
//! The channel holds one fault. A second fault parked before the first is
//! drained would historically overwrite it and lose the original cause;
//! here the first fault wins and later ones are counted as suppressed, so
//! the error that actually started the failure is the one surfaced.

use tern_core::ImportFault;

/// Single-capacity store for a pending host-side fault.
pub struct FaultChannel {
    pending: Option<ImportFault>,
    suppressed: u64,
}

impl FaultChannel {
    /// An empty channel.
    pub fn new() -> Self {
        Self {
            pending: None,
            suppressed: 0,
        }
    }

    /// Park a fault. If one is already pending, the newcomer is dropped
    /// and counted; the original cause survives.
    pub fn park(&mut self, fault: ImportFault) {
        if self.pending.is_some() {
            self.suppressed += 1;
        } else {
            self.pending = Some(fault);
        }
    }

    /// Drain the pending fault, leaving the channel empty.
    pub fn take(&mut self) -> Option<ImportFault> {
        self.pending.take()
    }

    /// Whether a fault is waiting to be drained.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Faults dropped because the channel was already occupied.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

impl Default for FaultChannel {
    fn default() -> Self {
        Self::new()
    }
}
