//! Best-effort deferred cleanup for wrapper objects dropped without
//! `destroy`.
//!
//! Every wrapper registers its guest handle here at creation. A wrapper
//! dropped without explicit destruction schedules its token; the session
//! drains scheduled tokens at the next boundary call and releases the
//! guest objects behind them. There is no timing guarantee beyond that: a
//! wrapper dropped after the last boundary call is never reaped, which is
//! the documented cost of a safety net that only runs when the bridge is
//! already doing work.
//!
//! Explicit destroy unregisters first, then releases, so a token that was
//! scheduled and later destroyed cannot trigger a second release.

use indexmap::IndexMap;
use tern_core::{GuestPtr, ObjectKind};
use tern_guest::GuestModule;

/// Identity of one reaper registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReapToken(u64);

struct Registration {
    kind: ObjectKind,
    ptr: GuestPtr,
}

/// Registry of live wrappers plus the queue of dropped ones awaiting
/// release.
pub struct Reaper {
    registry: IndexMap<ReapToken, Registration>,
    ready: Vec<ReapToken>,
    next: u64,
}

impl Reaper {
    /// An empty reaper.
    pub fn new() -> Self {
        Self {
            registry: IndexMap::new(),
            ready: Vec::new(),
            next: 0,
        }
    }

    /// Register a wrapper's guest handle; returns its token.
    pub fn register(&mut self, kind: ObjectKind, ptr: GuestPtr) -> ReapToken {
        let token = ReapToken(self.next);
        self.next += 1;
        self.registry.insert(token, Registration { kind, ptr });
        token
    }

    /// Remove a registration. Called on explicit destroy, before the
    /// handle is released, so the reaper can never re-release it.
    pub fn unregister(&mut self, token: ReapToken) {
        self.registry.shift_remove(&token);
        self.ready.retain(|t| *t != token);
    }

    /// Mark a registration ready for release. Called from wrapper drops;
    /// the release itself happens at the next drain.
    pub fn schedule(&mut self, token: ReapToken) {
        if self.registry.contains_key(&token) {
            self.ready.push(token);
        }
    }

    /// Release everything scheduled. Returns the number of objects
    /// reclaimed. Guest-side release failures are swallowed: by the time a
    /// drain runs, failing loudly would fault an unrelated call.
    pub fn drain(&mut self, module: &mut GuestModule) -> u64 {
        let mut reaped = 0;
        for token in std::mem::take(&mut self.ready) {
            let Some(reg) = self.registry.shift_remove(&token) else {
                continue;
            };
            let released = match reg.kind {
                ObjectKind::Simulation => module.simulation_drop(reg.ptr),
                ObjectKind::World => module.world_drop(reg.ptr),
                ObjectKind::Animal => module.animal_drop(reg.ptr),
                ObjectKind::Food => module.food_drop(reg.ptr),
            };
            if released.is_ok() {
                reaped += 1;
            }
        }
        reaped
    }

    /// Number of live registrations.
    pub fn registered(&self) -> usize {
        self.registry.len()
    }

    /// Number of tokens scheduled and not yet drained.
    pub fn scheduled(&self) -> usize {
        self.ready.len()
    }
}

impl Default for Reaper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_with_food() -> (GuestModule, GuestPtr) {
        let mut module = GuestModule::new();
        let food = module.food_new(0.5, 0.5).unwrap();
        (module, food)
    }

    #[test]
    fn scheduled_registration_is_reaped_on_drain() {
        let (mut module, food) = module_with_food();
        let mut reaper = Reaper::new();
        let token = reaper.register(ObjectKind::Food, food);
        reaper.schedule(token);
        assert_eq!(reaper.drain(&mut module), 1);
        assert_eq!(module.live_objects(), 0);
        assert_eq!(reaper.registered(), 0);
    }

    #[test]
    fn unregistered_token_is_never_reaped() {
        let (mut module, food) = module_with_food();
        let mut reaper = Reaper::new();
        let token = reaper.register(ObjectKind::Food, food);
        reaper.schedule(token);
        reaper.unregister(token);
        assert_eq!(reaper.drain(&mut module), 0);
        assert_eq!(module.live_objects(), 1);
    }

    #[test]
    fn drain_without_schedule_releases_nothing() {
        let (mut module, food) = module_with_food();
        let mut reaper = Reaper::new();
        reaper.register(ObjectKind::Food, food);
        assert_eq!(reaper.drain(&mut module), 0);
        assert_eq!(module.live_objects(), 1);
        assert_eq!(reaper.registered(), 1);
    }

    #[test]
    fn double_schedule_releases_once() {
        let (mut module, food) = module_with_food();
        let mut reaper = Reaper::new();
        let token = reaper.register(ObjectKind::Food, food);
        reaper.schedule(token);
        reaper.schedule(token);
        assert_eq!(reaper.drain(&mut module), 1);
        assert_eq!(reaper.drain(&mut module), 0);
    }

    #[test]
    fn stale_guest_pointer_is_swallowed() {
        // The guest object vanished out from under the registration;
        // drain reports zero instead of failing.
        let (mut module, food) = module_with_food();
        let mut reaper = Reaper::new();
        let token = reaper.register(ObjectKind::Food, food);
        module.food_drop(food).unwrap();
        reaper.schedule(token);
        assert_eq!(reaper.drain(&mut module), 0);
    }
}
