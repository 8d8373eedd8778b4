//! Vision and decision-making for animals.
//!
//! Each animal carries a fixed-topology feed-forward network: a 9-cell
//! retina of food proximity feeds one hidden layer, producing speed and
//! rotation acceleration. The flat weight vector doubles as the genome
//! the evolution pass selects, crosses, and mutates.

use crate::world::Food;
use rand::Rng;
use std::f32::consts::{FRAC_PI_4, PI, TAU};

/// Number of retina cells.
pub const VISION_CELLS: usize = 9;
/// How far an animal can see, in world units.
pub const FOV_RANGE: f32 = 0.25;
/// Field-of-view angle in radians.
pub const FOV_ANGLE: f32 = PI + FRAC_PI_4;

const HIDDEN: usize = 2 * VISION_CELLS;
const OUTPUTS: usize = 2;

/// Project visible foods onto the retina.
///
/// Each food inside the range and field of view adds `(range - dist) / range`
/// to the cell its bearing falls into; nearer food shines brighter.
pub fn process_vision(x: f32, y: f32, rotation: f32, foods: &[Food]) -> [f32; VISION_CELLS] {
    let mut cells = [0.0; VISION_CELLS];

    for food in foods {
        let dx = food.x - x;
        let dy = food.y - y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist >= FOV_RANGE {
            continue;
        }

        let angle = wrap_angle(dy.atan2(dx) - rotation);
        if angle.abs() > FOV_ANGLE / 2.0 {
            continue;
        }

        let cell = ((angle + FOV_ANGLE / 2.0) / FOV_ANGLE * VISION_CELLS as f32) as usize;
        let cell = cell.min(VISION_CELLS - 1);
        cells[cell] += (FOV_RANGE - dist) / FOV_RANGE;
    }

    cells
}

fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}

/// A fixed-topology feed-forward network.
///
/// Layout of the weight vector: per hidden neuron a bias then
/// [`VISION_CELLS`] weights, then per output neuron a bias then `HIDDEN`
/// weights.
#[derive(Clone, Debug, PartialEq)]
pub struct Brain {
    weights: Vec<f32>,
}

impl Brain {
    /// Length of the genome encoding one brain.
    pub const GENOME_LEN: usize = (VISION_CELLS + 1) * HIDDEN + (HIDDEN + 1) * OUTPUTS;

    /// A brain with weights drawn uniformly from `-1.0..=1.0`.
    pub fn random(rng: &mut impl Rng) -> Self {
        let weights = (0..Self::GENOME_LEN)
            .map(|_| rng.random_range(-1.0..=1.0))
            .collect();
        Self { weights }
    }

    /// Rebuild a brain from a genome.
    ///
    /// # Panics
    ///
    /// Panics if the genome length does not match [`Self::GENOME_LEN`];
    /// genomes only ever come from `chromosome()` output of same-topology
    /// brains, so a mismatch is a guest bug, not an input error.
    pub fn from_chromosome(genes: Vec<f32>) -> Self {
        assert_eq!(genes.len(), Self::GENOME_LEN);
        Self { weights: genes }
    }

    /// The genome encoding this brain.
    pub fn chromosome(&self) -> Vec<f32> {
        self.weights.clone()
    }

    /// Run the retina through the network.
    ///
    /// Returns `(speed_accel, rotation_accel)`, unclamped; the movement
    /// pass applies the physical limits.
    pub fn propagate(&self, vision: [f32; VISION_CELLS]) -> (f32, f32) {
        let mut hidden = [0.0f32; HIDDEN];
        let mut w = self.weights.iter().copied();

        for h in hidden.iter_mut() {
            let mut acc = w.next().unwrap_or(0.0);
            for v in vision {
                acc += v * w.next().unwrap_or(0.0);
            }
            *h = acc.max(0.0);
        }

        let mut out = [0.0f32; OUTPUTS];
        for o in out.iter_mut() {
            let mut acc = w.next().unwrap_or(0.0);
            for h in hidden {
                acc += h * w.next().unwrap_or(0.0);
            }
            *o = acc.max(0.0);
        }

        (out[0], out[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn genome_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let brain = Brain::random(&mut rng);
        let rebuilt = Brain::from_chromosome(brain.chromosome());
        assert_eq!(brain, rebuilt);
    }

    #[test]
    fn genome_length_matches_topology() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert_eq!(Brain::random(&mut rng).chromosome().len(), Brain::GENOME_LEN);
    }

    #[test]
    fn food_outside_range_is_invisible() {
        let foods = vec![Food::new(0.9, 0.9)];
        let cells = process_vision(0.1, 0.1, 0.0, &foods);
        assert!(cells.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn food_dead_ahead_lights_the_middle_cell() {
        // Animal at origin facing +x (rotation 0); food just ahead.
        let foods = vec![Food::new(0.1, 0.0)];
        let cells = process_vision(0.0, 0.0, 0.0, &foods);
        let lit: Vec<usize> = cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(lit, vec![VISION_CELLS / 2]);
    }

    #[test]
    fn nearer_food_shines_brighter() {
        let near = process_vision(0.0, 0.0, 0.0, &[Food::new(0.05, 0.0)]);
        let far = process_vision(0.0, 0.0, 0.0, &[Food::new(0.2, 0.0)]);
        assert!(near.iter().sum::<f32>() > far.iter().sum::<f32>());
    }

    #[test]
    fn propagate_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let brain = Brain::random(&mut rng);
        let vision = [0.5; VISION_CELLS];
        assert_eq!(brain.propagate(vision), brain.propagate(vision));
    }
}
