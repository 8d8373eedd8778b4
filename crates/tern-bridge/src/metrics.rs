//! Session-level counters for the boundary machinery.
//!
//! [`BridgeMetrics`] captures cumulative counts since session creation.
//! Consumers read a snapshot via `Session::metrics()`; the session updates
//! the live copy as calls execute.

/// Cumulative counters for one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeMetrics {
    /// Boundary calls issued, successful or not.
    pub boundary_calls: u64,
    /// Host values registered in the heap table.
    pub handles_registered: u64,
    /// Heap table slots reclaimed by ownership transfer out.
    pub handles_reclaimed: u64,
    /// Wrapper objects released by the reaper rather than explicit destroy.
    pub objects_reaped: u64,
    /// Host callback faults parked in the fault channel.
    pub faults_parked: u64,
    /// View cache rebuilds caused by memory identity changes.
    pub view_rebuilds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = BridgeMetrics::default();
        assert_eq!(m.boundary_calls, 0);
        assert_eq!(m.handles_registered, 0);
        assert_eq!(m.handles_reclaimed, 0);
        assert_eq!(m.objects_reaped, 0);
        assert_eq!(m.faults_parked, 0);
        assert_eq!(m.view_rebuilds, 0);
    }
}
