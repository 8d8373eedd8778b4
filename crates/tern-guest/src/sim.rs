//! The simulation: per-step physics and the generation cycle.
//!
//! Each step runs collisions, brains, then movement. After
//! [`GENERATION_LENGTH`] steps the population evolves and the world
//! resets its foods. All randomness flows from one ChaCha8 RNG seeded
//! with host entropy at construction, so a run is fully determined by
//! its seed.

use crate::brain::{self, Brain};
use crate::evolve::{self, PopulationEmpty, Statistics};
use crate::world::{Animal, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::FRAC_PI_2;

/// Steps per generation.
pub const GENERATION_LENGTH: u32 = 2500;

const SPEED_MIN: f32 = 0.001;
const SPEED_MAX: f32 = 0.005;
const SPEED_ACCEL: f32 = 0.2;
const ROTATION_ACCEL: f32 = FRAC_PI_2;
/// Distance at which an animal eats a food.
const FOOD_RADIUS: f32 = 0.01;

/// A running simulation: world plus evolution state.
pub struct Simulation {
    world: World,
    rng: ChaCha8Rng,
    age: u32,
    generation: u32,
}

impl Simulation {
    /// Create a simulation from 32 bytes of host entropy.
    pub fn random(seed: [u8; 32]) -> Self {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let world = World::random(&mut rng);
        Self {
            world,
            rng,
            age: 0,
            generation: 0,
        }
    }

    /// The current world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The current world, mutably. Used by the boundary surface when the
    /// host replaces a collection wholesale.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Completed generations.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Advance one step. Returns the outgoing generation's statistics
    /// when the step closed a generation.
    ///
    /// Fails only at a generation boundary with no animals alive; the
    /// world stays as it was and the next step retries the boundary.
    pub fn step(&mut self) -> Result<Option<Statistics>, PopulationEmpty> {
        self.process_collisions();
        self.process_brains();
        self.process_movement();

        self.age += 1;
        if self.age > GENERATION_LENGTH {
            Ok(Some(self.evolve()?))
        } else {
            Ok(None)
        }
    }

    /// Run out the current generation and return its summary line.
    ///
    /// Long-running and uninterruptible: control returns only once the
    /// generation boundary has been crossed.
    pub fn train(&mut self) -> Result<String, PopulationEmpty> {
        // An extinct world can never close a generation.
        if self.world.animals.is_empty() {
            return Err(PopulationEmpty);
        }
        loop {
            if let Some(stats) = self.step()? {
                return Ok(format!(
                    "generation {}: min={:.2} max={:.2} avg={:.2}",
                    self.generation, stats.min_fitness, stats.max_fitness, stats.avg_fitness
                ));
            }
        }
    }

    /// Repopulate the world with copies of the fittest animal's genome
    /// and respawn the foods. Selection state (the RNG stream) advances.
    pub fn choose_best(&mut self) {
        let Some(best) = self
            .world
            .animals
            .iter()
            .max_by_key(|a| a.satiation)
            .map(|a| a.brain.chromosome())
        else {
            return;
        };

        let count = self.world.animals.len();
        self.world.animals = (0..count)
            .map(|_| Animal::with_brain(&mut self.rng, Brain::from_chromosome(best.clone())))
            .collect();

        for food in &mut self.world.foods {
            *food = crate::world::Food::random(&mut self.rng);
        }
        self.age = 0;
    }

    fn process_collisions(&mut self) {
        for animal in &mut self.world.animals {
            for food in &mut self.world.foods {
                let dx = animal.x - food.x;
                let dy = animal.y - food.y;
                if (dx * dx + dy * dy).sqrt() <= FOOD_RADIUS {
                    animal.satiation += 1;
                    food.x = self.rng.random();
                    food.y = self.rng.random();
                }
            }
        }
    }

    fn process_brains(&mut self) {
        for animal in &mut self.world.animals {
            let vision = brain::process_vision(animal.x, animal.y, animal.rotation, &self.world.foods);
            let (speed_accel, rotation_accel) = animal.brain.propagate(vision);

            let speed_accel = speed_accel.clamp(-SPEED_ACCEL, SPEED_ACCEL);
            let rotation_accel = rotation_accel.clamp(-ROTATION_ACCEL, ROTATION_ACCEL);

            animal.speed = (animal.speed + speed_accel).clamp(SPEED_MIN, SPEED_MAX);
            animal.rotation += rotation_accel;
        }
    }

    fn process_movement(&mut self) {
        for animal in &mut self.world.animals {
            animal.x = (animal.x - animal.speed * animal.rotation.sin()).rem_euclid(1.0);
            animal.y = (animal.y + animal.speed * animal.rotation.cos()).rem_euclid(1.0);
        }
    }

    fn evolve(&mut self) -> Result<Statistics, PopulationEmpty> {
        let population: Vec<(Vec<f32>, f32)> = self
            .world
            .animals
            .iter()
            .map(|a| (a.brain.chromosome(), a.satiation as f32))
            .collect();

        let (children, stats) = evolve::evolve(&mut self.rng, &population)?;
        self.age = 0;
        self.generation += 1;

        self.world.animals = children
            .into_iter()
            .map(|genes| Animal::with_brain(&mut self.rng, Brain::from_chromosome(genes)))
            .collect();

        for food in &mut self.world.foods {
            *food = crate::world::Food::random(&mut self.rng);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ANIMAL_COUNT, FOOD_COUNT};

    fn sim(seed: u8) -> Simulation {
        Simulation::random([seed; 32])
    }

    #[test]
    fn step_moves_animals() {
        let mut s = sim(1);
        let before: Vec<(f32, f32)> = s.world().animals.iter().map(|a| (a.x, a.y)).collect();
        s.step().unwrap();
        let after: Vec<(f32, f32)> = s.world().animals.iter().map(|a| (a.x, a.y)).collect();
        assert_ne!(before, after);
        assert_eq!(after.len(), ANIMAL_COUNT);
    }

    #[test]
    fn positions_stay_on_the_torus() {
        let mut s = sim(2);
        for _ in 0..200 {
            s.step().unwrap();
        }
        for a in &s.world().animals {
            assert!((0.0..1.0).contains(&a.x), "x out of range: {}", a.x);
            assert!((0.0..1.0).contains(&a.y), "y out of range: {}", a.y);
        }
    }

    #[test]
    fn same_seed_same_run() {
        let mut a = sim(3);
        let mut b = sim(3);
        for _ in 0..50 {
            a.step().unwrap();
            b.step().unwrap();
        }
        let pa: Vec<f32> = a.world().animals.iter().map(|x| x.x).collect();
        let pb: Vec<f32> = b.world().animals.iter().map(|x| x.x).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn train_closes_a_generation() {
        let mut s = sim(4);
        let summary = s.train().unwrap();
        assert_eq!(s.generation(), 1);
        assert!(summary.contains("generation 1"));
        assert!(summary.contains("avg="));
        assert_eq!(s.world().animals.len(), ANIMAL_COUNT);
        assert_eq!(s.world().foods.len(), FOOD_COUNT);
    }

    #[test]
    fn an_extinct_world_cannot_close_a_generation() {
        let mut s = sim(6);
        s.world_mut().animals.clear();
        assert_eq!(s.train(), Err(PopulationEmpty));

        // Mid-generation steps are fine; only the boundary fails, and it
        // keeps failing until the host repopulates.
        for _ in 0..GENERATION_LENGTH {
            s.step().unwrap();
        }
        assert_eq!(s.step(), Err(PopulationEmpty));
        assert_eq!(s.step(), Err(PopulationEmpty));
        assert_eq!(s.generation(), 0);
    }

    #[test]
    fn choose_best_unifies_genomes() {
        let mut s = sim(5);
        s.world_mut().animals[7].satiation = 99;
        let best = s.world().animals[7].brain.chromosome();
        s.choose_best();
        assert_eq!(s.world().animals.len(), ANIMAL_COUNT);
        for a in s.world().animals.iter() {
            assert_eq!(a.brain.chromosome(), best);
        }
    }
}
