//! World entities: animals, foods, and the collections holding them.
//!
//! Positions live on the unit torus; movement wraps at the edges. Field
//! widths are the guest's native f32 — the host widens to f64 at the
//! boundary.

use crate::brain::Brain;
use rand::Rng;
use std::f32::consts::PI;

/// Animals spawned into a fresh world.
pub const ANIMAL_COUNT: usize = 40;
/// Food pellets spawned into a fresh world.
pub const FOOD_COUNT: usize = 60;

/// Initial forward speed of a fresh animal, in world units per step.
const SPAWN_SPEED: f32 = 0.002;

/// A food pellet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Food {
    /// Horizontal position in `0.0..1.0`.
    pub x: f32,
    /// Vertical position in `0.0..1.0`.
    pub y: f32,
}

impl Food {
    /// A pellet at the given position.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// A pellet at a uniformly random position.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            x: rng.random(),
            y: rng.random(),
        }
    }
}

/// An agent: position, heading, speed, satiation, and a brain.
#[derive(Clone, Debug)]
pub struct Animal {
    /// Horizontal position in `0.0..1.0`.
    pub x: f32,
    /// Vertical position in `0.0..1.0`.
    pub y: f32,
    /// Heading in radians.
    pub rotation: f32,
    /// Current forward speed.
    pub speed: f32,
    /// Foods eaten this generation; the fitness signal.
    pub satiation: u32,
    /// Decision network.
    pub brain: Brain,
}

impl Animal {
    /// An animal at a random position with a random brain.
    pub fn random(rng: &mut impl Rng) -> Self {
        let brain = Brain::random(rng);
        Self::with_brain(rng, brain)
    }

    /// An animal at a random position with the given brain.
    pub fn with_brain(rng: &mut impl Rng, brain: Brain) -> Self {
        Self {
            x: rng.random(),
            y: rng.random(),
            rotation: rng.random_range(-PI..PI),
            speed: SPAWN_SPEED,
            satiation: 0,
            brain,
        }
    }

    /// A detached animal placed by the host.
    ///
    /// Speed and satiation start at spawn defaults; the brain is freshly
    /// random so the animal is viable once moved into a world.
    pub fn placed(rng: &mut impl Rng, x: f32, y: f32, rotation: f32) -> Self {
        Self {
            x,
            y,
            rotation,
            speed: SPAWN_SPEED,
            satiation: 0,
            brain: Brain::random(rng),
        }
    }
}

/// The world: ordered animal and food collections.
#[derive(Clone, Debug)]
pub struct World {
    /// All animals, in insertion order.
    pub animals: Vec<Animal>,
    /// All foods, in insertion order.
    pub foods: Vec<Food>,
}

impl World {
    /// A fresh world with random animals and foods.
    pub fn random(rng: &mut impl Rng) -> Self {
        let animals = (0..ANIMAL_COUNT).map(|_| Animal::random(rng)).collect();
        let foods = (0..FOOD_COUNT).map(|_| Food::random(rng)).collect();
        Self { animals, foods }
    }
}
