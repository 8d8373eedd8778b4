//! Generation-boundary evolution: selection, crossover, mutation.
//!
//! Roulette-wheel selection over satiation fitness, uniform crossover,
//! gaussian mutation. When the whole population scored zero (common in the
//! first generations) selection falls back to uniform choice instead of
//! failing on an empty wheel.

use rand::Rng;
use std::error::Error;
use std::fmt;

/// Per-gene mutation probability.
const MUTATION_CHANCE: f64 = 0.01;
/// Magnitude of a mutation.
const MUTATION_COEFF: f32 = 0.3;

/// Breeding was attempted with no parents.
///
/// An extinct world is a host-reachable state (the host can replace the
/// animal collection with an empty one), so this is a checked error, not
/// a precondition violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopulationEmpty;

impl fmt::Display for PopulationEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no animals to breed from")
    }
}

impl Error for PopulationEmpty {}

/// Fitness summary of the generation that just ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    /// Lowest fitness in the population.
    pub min_fitness: f32,
    /// Highest fitness in the population.
    pub max_fitness: f32,
    /// Mean fitness of the population.
    pub avg_fitness: f32,
}

impl Statistics {
    /// Summarize a non-empty fitness slice.
    pub fn new(fitnesses: &[f32]) -> Self {
        debug_assert!(!fitnesses.is_empty());
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0;
        for &f in fitnesses {
            min = min.min(f);
            max = max.max(f);
            sum += f;
        }
        Self {
            min_fitness: min,
            max_fitness: max,
            avg_fitness: sum / fitnesses.len() as f32,
        }
    }
}

/// Breed the next generation of genomes.
///
/// `population` pairs each genome with its fitness. Returns one child per
/// parent slot, preserving population size, plus the outgoing generation's
/// statistics.
pub fn evolve(
    rng: &mut impl Rng,
    population: &[(Vec<f32>, f32)],
) -> Result<(Vec<Vec<f32>>, Statistics), PopulationEmpty> {
    if population.is_empty() {
        return Err(PopulationEmpty);
    }

    let fitnesses: Vec<f32> = population.iter().map(|(_, f)| *f).collect();
    let stats = Statistics::new(&fitnesses);
    let total: f32 = fitnesses.iter().sum();

    let children = (0..population.len())
        .map(|_| {
            let a = &population[select(rng, &fitnesses, total)].0;
            let b = &population[select(rng, &fitnesses, total)].0;
            let mut child = crossover(rng, a, b);
            mutate(rng, &mut child);
            child
        })
        .collect();

    Ok((children, stats))
}

/// Roulette-wheel selection; uniform when the wheel is empty.
fn select(rng: &mut impl Rng, fitnesses: &[f32], total: f32) -> usize {
    if total <= 0.0 {
        return rng.random_range(0..fitnesses.len());
    }
    let mut ticket = rng.random_range(0.0..total);
    for (i, &f) in fitnesses.iter().enumerate() {
        if ticket < f {
            return i;
        }
        ticket -= f;
    }
    fitnesses.len() - 1
}

/// Uniform crossover: each gene from either parent with equal chance.
fn crossover(rng: &mut impl Rng, a: &[f32], b: &[f32]) -> Vec<f32> {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&ga, &gb)| if rng.random_bool(0.5) { ga } else { gb })
        .collect()
}

/// Gaussian-style mutation: rare, small, signed nudges.
fn mutate(rng: &mut impl Rng, genes: &mut [f32]) {
    for gene in genes {
        if rng.random_bool(MUTATION_CHANCE) {
            let sign = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
            *gene += sign * MUTATION_COEFF * rng.random::<f32>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn genome(seed: f32) -> Vec<f32> {
        (0..10).map(|i| seed + i as f32).collect()
    }

    #[test]
    fn statistics_summarize() {
        let s = Statistics::new(&[1.0, 4.0, 1.0]);
        assert_eq!(s.min_fitness, 1.0);
        assert_eq!(s.max_fitness, 4.0);
        assert_eq!(s.avg_fitness, 2.0);
    }

    #[test]
    fn evolve_preserves_population_size_and_genome_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let pop: Vec<(Vec<f32>, f32)> = (0..8).map(|i| (genome(i as f32), i as f32)).collect();
        let (children, _) = evolve(&mut rng, &pop).unwrap();
        assert_eq!(children.len(), 8);
        assert!(children.iter().all(|c| c.len() == 10));
    }

    #[test]
    fn zero_fitness_population_still_evolves() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let pop: Vec<(Vec<f32>, f32)> = (0..4).map(|i| (genome(i as f32), 0.0)).collect();
        let (children, stats) = evolve(&mut rng, &pop).unwrap();
        assert_eq!(children.len(), 4);
        assert_eq!(stats.max_fitness, 0.0);
    }

    #[test]
    fn empty_population_is_a_checked_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(16);
        assert_eq!(evolve(&mut rng, &[]).unwrap_err(), PopulationEmpty);
    }

    #[test]
    fn selection_prefers_fitter_individuals() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let fitnesses = [1.0, 10.0, 1.0];
        let total: f32 = fitnesses.iter().sum();
        let mut histogram = [0u32; 3];
        for _ in 0..1200 {
            histogram[select(&mut rng, &fitnesses, total)] += 1;
        }
        assert!(histogram[1] > histogram[0] * 3);
        assert!(histogram[1] > histogram[2] * 3);
    }

    #[test]
    fn crossover_takes_genes_from_both_parents() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let a = vec![1.0; 100];
        let b = vec![-1.0; 100];
        let child = crossover(&mut rng, &a, &b);
        let from_a = child.iter().filter(|&&g| g > 0.0).count();
        assert!(from_a > 20 && from_a < 80);
    }

    #[test]
    fn zero_chance_mutation_would_leave_genes_alone() {
        // MUTATION_CHANCE is fixed, so exercise the loop shape instead:
        // mutation never changes genome length and nudges stay bounded.
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let mut genes = vec![0.0f32; 1000];
        mutate(&mut rng, &mut genes);
        assert_eq!(genes.len(), 1000);
        assert!(genes.iter().all(|g| g.abs() <= MUTATION_COEFF));
    }
}
