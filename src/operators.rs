//! Genetic operators: tournament selection, single-point crossover and
//! per-gene reassignment mutation.

use crate::chromosome::Timetable;
use crate::context::RunContext;
use rand::Rng;

/// Tournament selection: sample `k` individuals with replacement and
/// return the fittest. Ties go to the one sampled first.
///
/// # Panics
/// Panics if `population` is empty.
pub fn tournament_select<'p, 'a, R: Rng>(
    population: &'p [Timetable<'a>],
    k: usize,
    rng: &mut R,
) -> &'p Timetable<'a> {
    assert!(!population.is_empty(), "cannot select from empty population");

    let n = population.len();
    let mut best = &population[rng.random_range(0..n)];
    for _ in 1..k.max(1) {
        let contender = &population[rng.random_range(0..n)];
        if contender.fitness > best.fitness {
            best = contender;
        }
    }
    best
}

/// Single-point crossover at a random cut in `[1, len - 1]`, so both
/// parents contribute at least one gene. With fewer than two genes there
/// is no valid cut and the child copies `parent1`.
pub fn crossover<'a, R: Rng>(
    parent1: &Timetable<'a>,
    parent2: &Timetable<'a>,
    rng: &mut R,
) -> Timetable<'a> {
    let len = parent1.len();
    if len < 2 {
        return Timetable::new(parent1.sessions.clone());
    }
    crossover_at(parent1, parent2, rng.random_range(1..len))
}

/// Child = `parent1[..cut]` followed by `parent2[cut..]`, unscored.
pub fn crossover_at<'a>(
    parent1: &Timetable<'a>,
    parent2: &Timetable<'a>,
    cut: usize,
) -> Timetable<'a> {
    debug_assert_eq!(parent1.len(), parent2.len());
    let mut sessions = Vec::with_capacity(parent1.len());
    sessions.extend_from_slice(&parent1.sessions[..cut]);
    sessions.extend_from_slice(&parent2.sessions[cut..]);
    Timetable::new(sessions)
}

/// Resamples day, time slot and room of each gene with probability `rate`.
///
/// Who teaches what to whom is never touched. Leaves the fitness stale;
/// callers rescore afterwards.
pub fn mutate<'a, R: Rng>(
    timetable: &mut Timetable<'a>,
    ctx: &RunContext<'a>,
    rate: f64,
    rng: &mut R,
) {
    for session in &mut timetable.sessions {
        if rng.random_bool(rate) {
            session.reassign(ctx, rng);
        }
    }
}
