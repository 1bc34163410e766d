//! Generational evolution loop.
//!
//! [`Evolution`] is a finite, non-restartable iterator: each call to `next`
//! runs one generation and yields its [`Progress`]. The loop stops once the
//! best timetable has neither clashes nor idle gaps, the generation budget
//! is spent, or the cancellation flag is raised. [`Evolution::finish`] then
//! hands back the best individual.

use crate::chromosome::{Timetable, random_timetable};
use crate::context::RunContext;
use crate::data::{Outcome, Progress};
use crate::fitness::evaluate;
use crate::operators::{crossover, mutate, tournament_select};
use log::{debug, trace};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A best fitness above this is treated as a perfect timetable. The next
/// lower reachable score is 1 / 1.1, so only float noise is absorbed.
pub const CONVERGENCE_THRESHOLD: f64 = 0.999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionState {
    Initializing,
    Evaluating,
    Converged,
    GenerationBudgetExhausted,
    Cancelled,
}

impl EvolutionState {
    fn outcome(self) -> Option<Outcome> {
        match self {
            EvolutionState::Converged => Some(Outcome::Converged),
            EvolutionState::GenerationBudgetExhausted => Some(Outcome::GenerationBudgetExhausted),
            EvolutionState::Cancelled => Some(Outcome::Cancelled),
            EvolutionState::Initializing | EvolutionState::Evaluating => None,
        }
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct EvolutionResult<'a> {
    pub best: Timetable<'a>,
    /// Number of generations that emitted progress.
    pub generations: usize,
    pub outcome: Outcome,
    /// Best fitness of every emitted generation, in order.
    pub fitness_history: Vec<f64>,
}

pub struct Evolution<'c, 'a, R: Rng> {
    ctx: &'c RunContext<'a>,
    rng: R,
    population: Vec<Timetable<'a>>,
    generation: usize,
    state: EvolutionState,
    cancel: Option<Arc<AtomicBool>>,
    fitness_history: Vec<f64>,
}

impl<'c, 'a, R: Rng> Evolution<'c, 'a, R> {
    /// Creates and scores the initial population.
    pub fn new(ctx: &'c RunContext<'a>, rng: R) -> Self {
        let params = ctx.params;
        let mut evolution = Self {
            ctx,
            rng,
            population: Vec::with_capacity(params.population_size),
            generation: 0,
            state: EvolutionState::Initializing,
            cancel: None,
            fitness_history: Vec::with_capacity(params.num_generations),
        };
        evolution.initialize();
        evolution
    }

    fn initialize(&mut self) {
        trace!(
            "{:?}: {} individuals of {} genes",
            self.state,
            self.ctx.params.population_size,
            self.ctx.chromosome_len()
        );
        while self.population.len() < self.ctx.params.population_size {
            let mut individual = random_timetable(self.ctx, &mut self.rng);
            individual.fitness = evaluate(&individual.sessions);
            self.population.push(individual);
        }
        self.transition(EvolutionState::Evaluating);
    }

    /// Stops the run at the next generation boundary once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> EvolutionState {
        self.state
    }

    pub fn population(&self) -> &[Timetable<'a>] {
        &self.population
    }

    /// Runs to termination, reporting every generation to `on_progress`.
    pub fn run(mut self, mut on_progress: impl FnMut(&Progress)) -> EvolutionResult<'a> {
        for progress in &mut self {
            on_progress(&progress);
        }
        self.finish()
    }

    /// Drives any remaining generations silently and returns the best individual.
    pub fn finish(mut self) -> EvolutionResult<'a> {
        while self.next().is_some() {}

        let outcome = self
            .state
            .outcome()
            .unwrap_or(Outcome::GenerationBudgetExhausted);
        let best = self
            .population
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
            .cloned()
            .unwrap_or_else(|| Timetable::new(Vec::new()));

        EvolutionResult {
            best,
            generations: self.generation,
            outcome,
            fitness_history: self.fitness_history,
        }
    }

    fn transition(&mut self, next: EvolutionState) {
        trace!("{:?} -> {:?} after generation {}", self.state, next, self.generation);
        self.state = next;
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Elites survive unchanged; the rest is bred and scored afresh.
    fn breed(&mut self) {
        let params = self.ctx.params;
        let mut next_gen: Vec<Timetable<'a>> = Vec::with_capacity(params.population_size);
        next_gen.extend_from_slice(&self.population[..params.elitism_size]);

        while next_gen.len() < params.population_size {
            let k = params.tournament_size;
            let parent1 = tournament_select(&self.population, k, &mut self.rng);
            let parent2 = tournament_select(&self.population, k, &mut self.rng);
            let mut child = crossover(parent1, parent2, &mut self.rng);
            mutate(&mut child, self.ctx, params.mutation_rate, &mut self.rng);
            child.fitness = evaluate(&child.sessions);
            next_gen.push(child);
        }

        self.population = next_gen;
    }
}

impl<R: Rng> Iterator for Evolution<'_, '_, R> {
    type Item = Progress;

    fn next(&mut self) -> Option<Progress> {
        if self.state != EvolutionState::Evaluating {
            return None;
        }
        let total_generations = self.ctx.params.num_generations;
        if self.generation >= total_generations {
            self.transition(EvolutionState::GenerationBudgetExhausted);
            return None;
        }
        if self.cancelled() {
            self.transition(EvolutionState::Cancelled);
            return None;
        }

        self.population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        self.generation += 1;
        let best_fitness = self.population[0].fitness;
        self.fitness_history.push(best_fitness);
        debug!(
            "Generation {}/{} | best fitness {:.4}",
            self.generation, total_generations, best_fitness
        );

        if best_fitness > CONVERGENCE_THRESHOLD {
            self.transition(EvolutionState::Converged);
        } else {
            self.breed();
        }

        Some(Progress {
            generation: self.generation,
            total_generations,
            best_fitness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::small_input;
    use crate::data::{Professor, Room, StudentGroup, Subject, TeachingLoad, TimetableInput};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Four groups, three professors, eight weekly sessions into a 3x4 week.
    fn busy_input() -> TimetableInput {
        let mut input = small_input();
        input.days = ["Mon", "Tue", "Wed"].map(String::from).to_vec();
        input.time_slots = ["1", "2", "3", "4"].map(String::from).to_vec();
        input.professors = (1..=3)
            .map(|i| Professor {
                prof_id: format!("P{i}"),
                name: String::new(),
                initials: String::new(),
            })
            .collect();
        input.rooms = (1..=2)
            .map(|i| Room {
                room_id: format!("R{i}"),
                room_name: String::new(),
            })
            .collect();
        input.subjects = vec![Subject {
            subject_id: "S".into(),
            subject_name: String::new(),
            weekly_hours: 2,
        }];
        input.student_groups = (1..=4)
            .map(|i| StudentGroup {
                group_id: format!("G{i}"),
                group_name: String::new(),
            })
            .collect();
        input.teaching_loads = (1..=4)
            .map(|i| TeachingLoad {
                group_id: format!("G{i}"),
                subject_id: "S".into(),
                prof_id: format!("P{}", (i % 3) + 1),
            })
            .collect();
        input.params.population_size = 30;
        input.params.num_generations = 40;
        input.params.elitism_size = 3;
        input
    }

    /// Eight sessions squeezed into a single (day, time slot): clashes are unavoidable.
    fn impossible_input() -> TimetableInput {
        let mut input = busy_input();
        input.days.truncate(1);
        input.time_slots.truncate(1);
        input
    }

    #[test]
    fn small_problem_converges_to_a_perfect_timetable() {
        let input = small_input();
        let ctx = RunContext::new(&input).unwrap();
        let mut events = Vec::new();

        let result = Evolution::new(&ctx, StdRng::seed_from_u64(42)).run(|p| events.push(*p));

        assert_eq!(result.outcome, Outcome::Converged);
        assert_eq!(result.best.fitness, 1.0);
        assert_eq!(evaluate(&result.best.sessions), 1.0);
        assert!(result.generations <= 50);
        assert_eq!(events.len(), result.generations);
        assert_eq!(events.last().unwrap().best_fitness, 1.0);
        assert!(events.iter().all(|p| p.total_generations == 50));
    }

    #[test]
    fn new_run_is_scored_and_ready_to_evaluate() {
        let input = busy_input();
        let ctx = RunContext::new(&input).unwrap();
        let evolution = Evolution::new(&ctx, StdRng::seed_from_u64(21));

        assert_eq!(evolution.state(), EvolutionState::Evaluating);
        assert_eq!(evolution.population().len(), 30);
        assert!(evolution.population().iter().all(|t| t.fitness > 0.0));
    }

    #[test]
    fn best_fitness_never_drops_between_generations() {
        let input = busy_input();
        let ctx = RunContext::new(&input).unwrap();
        let result = Evolution::new(&ctx, StdRng::seed_from_u64(3)).finish();

        assert!(!result.fitness_history.is_empty());
        for pair in result.fitness_history.windows(2) {
            assert!(pair[1] >= pair[0], "best fitness dropped: {pair:?}");
        }
    }

    #[test]
    fn every_individual_keeps_the_template_length() {
        let input = busy_input();
        let ctx = RunContext::new(&input).unwrap();
        let mut evolution = Evolution::new(&ctx, StdRng::seed_from_u64(17));

        for _ in 0..10 {
            if evolution.next().is_none() {
                break;
            }
            assert_eq!(evolution.population().len(), 30);
            assert!(evolution.population().iter().all(|t| t.len() == 8));
            assert!(
                evolution
                    .population()
                    .iter()
                    .all(|t| t.fitness > 0.0 && t.fitness <= 1.0)
            );
        }
    }

    #[test]
    fn same_seed_gives_same_trajectory() {
        let input = busy_input();
        let ctx = RunContext::new(&input).unwrap();

        let first = Evolution::new(&ctx, StdRng::seed_from_u64(99)).finish();
        let second = Evolution::new(&ctx, StdRng::seed_from_u64(99)).finish();

        assert_eq!(first.fitness_history, second.fitness_history);
        assert_eq!(first.generations, second.generations);
        assert_eq!(first.best.fitness, second.best.fitness);
    }

    #[test]
    fn exhausts_budget_when_perfection_is_impossible() {
        let mut input = impossible_input();
        input.params.num_generations = 5;
        let ctx = RunContext::new(&input).unwrap();

        let mut evolution = Evolution::new(&ctx, StdRng::seed_from_u64(1));
        let events: Vec<Progress> = evolution.by_ref().collect();
        assert_eq!(events.len(), 5);
        assert_eq!(evolution.state(), EvolutionState::GenerationBudgetExhausted);
        assert_eq!(evolution.next(), None);

        let result = evolution.finish();
        assert_eq!(result.outcome, Outcome::GenerationBudgetExhausted);
        assert_eq!(result.generations, 5);
        assert!(result.best.fitness < 1.0);
    }

    #[test]
    fn raised_flag_cancels_before_the_next_generation() {
        let input = impossible_input();
        let ctx = RunContext::new(&input).unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        let mut evolution =
            Evolution::new(&ctx, StdRng::seed_from_u64(5)).with_cancel(flag.clone());

        assert!(evolution.next().is_some());
        flag.store(true, Ordering::Relaxed);
        assert!(evolution.next().is_none());
        assert_eq!(evolution.state(), EvolutionState::Cancelled);

        let result = evolution.finish();
        assert_eq!(result.outcome, Outcome::Cancelled);
        assert_eq!(result.generations, 1);
        assert_eq!(result.best.len(), 8);
    }
}
