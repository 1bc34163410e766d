use crate::context::RunContext;
use crate::data::{Progress, ScheduledClass, TimetableInput, TimetableOutput};
use crate::engine::{Evolution, EvolutionResult};
use crate::error::TimetableError;
use crate::fitness::{assess, unmet_constraints};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

/// solves the timetabling problem with a genetic algorithm.
pub fn solve(input: &TimetableInput) -> Result<TimetableOutput, TimetableError> {
    solve_with_progress(input, None, |_| {})
}

/// Like [`solve`], reporting every generation to `on_progress` and stopping
/// early once `cancel` is raised.
///
/// Input errors are returned before the first progress event.
pub fn solve_with_progress(
    input: &TimetableInput,
    cancel: Option<Arc<AtomicBool>>,
    on_progress: impl FnMut(&Progress),
) -> Result<TimetableOutput, TimetableError> {
    let start_time = Instant::now();
    let ctx = RunContext::new(input)?;

    let params = ctx.params;
    let seed = params.seed.unwrap_or_else(rand::random);
    info!(
        "Evolving {} class sessions for {} groups over {} days x {} slots and {} rooms (population {}, {} generations, seed {})",
        ctx.chromosome_len(),
        ctx.groups.len(),
        ctx.days.len(),
        ctx.time_slots.len(),
        ctx.rooms.len(),
        params.population_size,
        params.num_generations,
        seed
    );

    let mut evolution = Evolution::new(&ctx, StdRng::seed_from_u64(seed));
    if let Some(flag) = cancel {
        evolution = evolution.with_cancel(flag);
    }
    let result = evolution.run(on_progress);

    let duration = start_time.elapsed();
    info!(
        "Search finished ({:?}) after {} generations in {:.2?} with fitness {:.4}",
        result.outcome, result.generations, duration, result.best.fitness
    );

    Ok(build_output(&ctx, result, seed))
}

fn build_output(ctx: &RunContext<'_>, result: EvolutionResult<'_>, seed: u64) -> TimetableOutput {
    let sessions = &result.best.sessions;
    let report = assess(sessions);
    let unmet = unmet_constraints(ctx, sessions);
    if !unmet.is_empty() {
        warn!("Best timetable still violates {} constraint(s)", unmet.len());
    }

    let mut placed: Vec<_> = sessions.iter().collect();
    placed.sort_by(|a, b| {
        (a.day, a.time_slot, &a.room.room_id).cmp(&(b.day, b.time_slot, &b.room.room_id))
    });
    let classes = placed
        .into_iter()
        .map(|s| ScheduledClass {
            day: ctx.days[s.day].clone(),
            time_slot: ctx.time_slots[s.time_slot].clone(),
            group_id: s.group.group_id.clone(),
            subject_id: s.subject.subject_id.clone(),
            prof_id: s.professor.prof_id.clone(),
            room_id: s.room.room_id.clone(),
        })
        .collect();

    TimetableOutput {
        classes,
        fitness: report.fitness,
        clashes: report.clashes,
        gaps: report.gaps,
        generations: result.generations,
        outcome: result.outcome,
        seed,
        unmet_constraints: unmet,
    }
}
