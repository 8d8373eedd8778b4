//! The `World` wrapper: collection access over the boundary.
//!
//! Getters marshal the guest's collections out as fresh wrapper objects on
//! every access; nothing is cached host-side. Setters replace the guest
//! collection wholesale and consume the passed wrappers, whose handles
//! become invalid with the call.

use crate::animal::Animal;
use crate::food::Food;
use crate::marshal;
use crate::session::{BoundaryEnv, Session};
use crate::wrapper::WrapperCore;
use tern_core::handle::WORD;
use tern_core::{BridgeError, GuestPtr, HeapHandle, HostValue, MarshalError, MemPtr, ObjectKind};
use tern_guest::GuestModule;

/// Host proxy for a simulation's world.
///
/// Borrowed: the wrapper aliases state owned by its simulation, and
/// destroying it releases only the alias.
pub struct World {
    core: WrapperCore,
}

impl World {
    pub(crate) fn from_raw(session: Session, ptr: GuestPtr) -> Self {
        Self {
            core: WrapperCore::new(session, ObjectKind::World, ptr),
        }
    }

    /// Marshal the world's animals out, in order, as fresh wrappers.
    pub fn animals(&self) -> Result<Vec<Animal>, BridgeError> {
        let world = self.core.require()?;
        let ptrs = self.core.session().call(move |module, env| {
            let retptr = module.alloc(8)?;
            let words = match module.world_get_animals(world, retptr, &mut *env) {
                Ok(()) => collect_handles(module, env, retptr),
                Err(trap) => Err(trap.into()),
            };
            module.dealloc(retptr, 8);
            let words = words?;

            let mut out = Vec::with_capacity(words.len());
            for handle in words {
                match env.take_value(handle)? {
                    HostValue::Animal(gp) => out.push(gp),
                    _ => {
                        return Err(MarshalError::UnexpectedValue {
                            expected: ObjectKind::Animal,
                        }
                        .into())
                    }
                }
            }
            Ok(out)
        })?;
        Ok(ptrs
            .into_iter()
            .map(|gp| Animal::from_raw(self.core.session().clone(), gp))
            .collect())
    }

    /// Replace the world's animals, preserving order.
    ///
    /// Consumes the wrappers: ownership of every element transfers into
    /// the guest and the passed handles become invalid.
    pub fn set_animals(&self, animals: Vec<Animal>) -> Result<(), BridgeError> {
        let world = self.core.require()?;
        // Validate every element before consuming any: a dead element
        // fails the whole call with the rest still live and
        // reaper-backed, so nothing is stranded guest-side.
        let mut ptrs = Vec::with_capacity(animals.len());
        for animal in &animals {
            ptrs.push(animal.require()?);
        }
        self.core.session().call(move |module, env| {
            let len = ptrs.len() as u32;
            let scratch = module.alloc(len.saturating_mul(WORD))?;
            let handles: Vec<_> = ptrs
                .iter()
                .map(|&gp| env.register_value(HostValue::Animal(gp)))
                .collect();
            marshal::write_handle_words(env.views, module.memory_mut(), scratch, &handles)?;
            // The guest reclaims every handle and frees the scratch.
            Ok(module.world_set_animals(world, scratch, len, &mut *env)?)
        })?;
        // Ownership transferred; only now clear the wrappers.
        for animal in &animals {
            animal.consume()?;
        }
        Ok(())
    }

    /// Marshal the world's foods out, in order, as fresh wrappers.
    pub fn foods(&self) -> Result<Vec<Food>, BridgeError> {
        let world = self.core.require()?;
        let ptrs = self.core.session().call(move |module, env| {
            let retptr = module.alloc(8)?;
            let words = match module.world_get_foods(world, retptr, &mut *env) {
                Ok(()) => collect_handles(module, env, retptr),
                Err(trap) => Err(trap.into()),
            };
            module.dealloc(retptr, 8);
            let words = words?;

            let mut out = Vec::with_capacity(words.len());
            for handle in words {
                match env.take_value(handle)? {
                    HostValue::Food(gp) => out.push(gp),
                    _ => {
                        return Err(MarshalError::UnexpectedValue {
                            expected: ObjectKind::Food,
                        }
                        .into())
                    }
                }
            }
            Ok(out)
        })?;
        Ok(ptrs
            .into_iter()
            .map(|gp| Food::from_raw(self.core.session().clone(), gp))
            .collect())
    }

    /// Replace the world's foods, preserving order. Consumes the wrappers.
    pub fn set_foods(&self, foods: Vec<Food>) -> Result<(), BridgeError> {
        let world = self.core.require()?;
        // Same discipline as `set_animals`: validate, call, then consume.
        let mut ptrs = Vec::with_capacity(foods.len());
        for food in &foods {
            ptrs.push(food.require()?);
        }
        self.core.session().call(move |module, env| {
            let len = ptrs.len() as u32;
            let scratch = module.alloc(len.saturating_mul(WORD))?;
            let handles: Vec<_> = ptrs
                .iter()
                .map(|&gp| env.register_value(HostValue::Food(gp)))
                .collect();
            marshal::write_handle_words(env.views, module.memory_mut(), scratch, &handles)?;
            Ok(module.world_set_foods(world, scratch, len, &mut *env)?)
        })?;
        for food in &foods {
            food.consume()?;
        }
        Ok(())
    }

    /// Whether this wrapper's handle has been cleared.
    pub fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }

    /// Release this alias. The underlying world stays with its
    /// simulation. Idempotent.
    pub fn destroy(&self) -> Result<(), BridgeError> {
        self.core.destroy()
    }
}

/// Read the handle array described by `retptr` and free the array
/// scratch, whether or not the words could be read.
fn collect_handles(
    module: &mut GuestModule,
    env: &mut BoundaryEnv<'_>,
    retptr: MemPtr,
) -> Result<Vec<HeapHandle>, BridgeError> {
    let (ptr, len) = marshal::read_ret_pair(env.views, module.memory(), retptr)?;
    let words = marshal::read_handle_words(env.views, module.memory(), ptr, len);
    module.dealloc(ptr, len.saturating_mul(WORD));
    Ok(words?)
}
