//! Shared lifecycle plumbing for wrapper objects.
//!
//! A wrapper stores exactly one guest handle and a session. The handle is
//! cleared to zero exactly once, at the moment ownership leaves the
//! wrapper (explicit destroy, or transfer into a guest collection); every
//! later operation fails with `UseAfterFree`. A wrapper dropped while
//! still owning its handle schedules itself with the reaper instead.

use crate::session::Session;
use std::cell::Cell;
use tern_core::{BridgeError, GuestPtr, ObjectKind};

use crate::reaper::ReapToken;

pub(crate) struct WrapperCore {
    session: Session,
    kind: ObjectKind,
    ptr: Cell<u32>,
    token: ReapToken,
}

impl WrapperCore {
    pub(crate) fn new(session: Session, kind: ObjectKind, ptr: GuestPtr) -> Self {
        let token = session.reaper().borrow_mut().register(kind, ptr);
        Self {
            session,
            kind,
            ptr: Cell::new(ptr.0),
            token,
        }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.ptr.get() == 0
    }

    /// The live handle, or `UseAfterFree` if it was already cleared.
    pub(crate) fn require(&self) -> Result<GuestPtr, BridgeError> {
        match self.ptr.get() {
            0 => Err(BridgeError::UseAfterFree { kind: self.kind }),
            raw => Ok(GuestPtr(raw)),
        }
    }

    /// Transfer the handle out of this wrapper without releasing the
    /// guest object. Used when ownership moves into a guest collection.
    pub(crate) fn consume(&self) -> Result<GuestPtr, BridgeError> {
        let ptr = self.require()?;
        self.session.reaper().borrow_mut().unregister(self.token);
        self.ptr.set(0);
        Ok(ptr)
    }

    /// Explicitly release the guest object. Idempotent: a second call is
    /// a no-op, with no secondary deallocation.
    ///
    /// Unregisters from the reaper before releasing, so the safety net
    /// can never re-release this handle.
    pub(crate) fn destroy(&self) -> Result<(), BridgeError> {
        if self.ptr.get() == 0 {
            return Ok(());
        }
        let ptr = GuestPtr(self.ptr.get());
        self.session.reaper().borrow_mut().unregister(self.token);
        self.ptr.set(0);

        let kind = self.kind;
        self.session.call(move |module, _| {
            match kind {
                ObjectKind::Simulation => module.simulation_drop(ptr)?,
                ObjectKind::World => module.world_drop(ptr)?,
                ObjectKind::Animal => module.animal_drop(ptr)?,
                ObjectKind::Food => module.food_drop(ptr)?,
            }
            Ok(())
        })
    }
}

impl Drop for WrapperCore {
    fn drop(&mut self) {
        if self.ptr.get() == 0 {
            return;
        }
        // Best effort: if the reaper is unavailable the registration is
        // simply never scheduled and the guest object stays until the
        // session ends.
        if let Ok(mut reaper) = self.session.reaper().try_borrow_mut() {
            reaper.schedule(self.token);
        }
    }
}
