//! The `Food` wrapper.

use crate::session::Session;
use crate::wrapper::WrapperCore;
use tern_core::{BridgeError, GuestPtr, ObjectKind};

/// Host proxy for one guest food pellet.
pub struct Food {
    core: WrapperCore,
}

impl Food {
    pub(crate) fn from_raw(session: Session, ptr: GuestPtr) -> Self {
        Self {
            core: WrapperCore::new(session, ObjectKind::Food, ptr),
        }
    }

    pub(crate) fn require(&self) -> Result<GuestPtr, BridgeError> {
        self.core.require()
    }

    pub(crate) fn consume(&self) -> Result<GuestPtr, BridgeError> {
        self.core.consume()
    }

    /// Horizontal position.
    pub fn x(&self) -> Result<f64, BridgeError> {
        let ptr = self.core.require()?;
        self.core
            .session()
            .call(move |module, _| Ok(module.food_get_x(ptr)? as f64))
    }

    /// Vertical position.
    pub fn y(&self) -> Result<f64, BridgeError> {
        let ptr = self.core.require()?;
        self.core
            .session()
            .call(move |module, _| Ok(module.food_get_y(ptr)? as f64))
    }

    /// Set the horizontal position.
    pub fn set_x(&self, x: f64) -> Result<(), BridgeError> {
        let ptr = self.core.require()?;
        self.core
            .session()
            .call(move |module, _| Ok(module.food_set_x(ptr, x as f32)?))
    }

    /// Set the vertical position.
    pub fn set_y(&self, y: f64) -> Result<(), BridgeError> {
        let ptr = self.core.require()?;
        self.core
            .session()
            .call(move |module, _| Ok(module.food_set_y(ptr, y as f32)?))
    }

    /// Whether this wrapper's handle has been cleared, by destruction or
    /// by transfer into a world.
    pub fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }

    /// Release the guest food pellet. Idempotent.
    pub fn destroy(&self) -> Result<(), BridgeError> {
        self.core.destroy()
    }
}
