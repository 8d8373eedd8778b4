//! Host values and entity kinds.

use crate::handle::GuestPtr;
use std::fmt;

/// The four opaque guest entity kinds exposed through wrapper objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// An agent with position, rotation, and (guest-internal) brain state.
    Animal,
    /// A food pellet with a position.
    Food,
    /// A borrowed view of a simulation's world.
    World,
    /// A whole simulation: world plus evolution state.
    Simulation,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Animal => "animal",
            Self::Food => "food",
            Self::World => "world",
            Self::Simulation => "simulation",
        };
        write!(f, "{name}")
    }
}

/// A value stored in the host heap table.
///
/// The first four table slots hold the immutable sentinels (`Absent`,
/// `Null`, `Bool(true)`, `Bool(false)`); dynamic slots hold guest entity
/// references. Cloning a `HostValue` preserves identity: entity variants
/// carry a [`GuestPtr`], so a clone refers to the same guest entity, not
/// a copy of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostValue {
    /// The "no value" sentinel (slot 0).
    Absent,
    /// The explicit-null sentinel (slot 1).
    Null,
    /// The boolean sentinels (slots 2 and 3).
    Bool(bool),
    /// Reference to a guest animal entity.
    Animal(GuestPtr),
    /// Reference to a guest food entity.
    Food(GuestPtr),
    /// Reference to a guest world alias entity.
    World(GuestPtr),
    /// Reference to a guest simulation entity.
    Simulation(GuestPtr),
}

impl HostValue {
    /// The entity kind, if this value references a guest entity.
    pub fn kind(&self) -> Option<ObjectKind> {
        match self {
            Self::Animal(_) => Some(ObjectKind::Animal),
            Self::Food(_) => Some(ObjectKind::Food),
            Self::World(_) => Some(ObjectKind::World),
            Self::Simulation(_) => Some(ObjectKind::Simulation),
            _ => None,
        }
    }

    /// The guest pointer, if this value references a guest entity.
    pub fn guest_ptr(&self) -> Option<GuestPtr> {
        match self {
            Self::Animal(p) | Self::Food(p) | Self::World(p) | Self::Simulation(p) => Some(*p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_values_expose_kind_and_ptr() {
        let v = HostValue::Animal(GuestPtr(9));
        assert_eq!(v.kind(), Some(ObjectKind::Animal));
        assert_eq!(v.guest_ptr(), Some(GuestPtr(9)));
    }

    #[test]
    fn sentinels_have_no_kind() {
        assert_eq!(HostValue::Absent.kind(), None);
        assert_eq!(HostValue::Null.guest_ptr(), None);
        assert_eq!(HostValue::Bool(true).kind(), None);
    }

    #[test]
    fn clone_shares_identity() {
        let v = HostValue::World(GuestPtr(3));
        let w = v.clone();
        assert_eq!(v.guest_ptr(), w.guest_ptr());
    }
}
