use crate::context::RunContext;
use crate::data::{Professor, Room, StudentGroup, Subject};
use rand::Rng;

/// One gene: a single weekly class session.
///
/// `group`, `subject` and `professor` come from the template and never
/// change; `day`, `time_slot` (indices into the run's domains) and `room`
/// are what the search evolves.
#[derive(Debug, Clone, Copy)]
pub struct ClassSession<'a> {
    pub group: &'a StudentGroup,
    pub subject: &'a Subject,
    pub professor: &'a Professor,
    pub room: &'a Room,
    pub day: usize,
    pub time_slot: usize,
}

impl<'a> ClassSession<'a> {
    /// Draws a fresh day, time slot and room.
    pub fn reassign<R: Rng>(&mut self, ctx: &RunContext<'a>, rng: &mut R) {
        self.day = rng.random_range(0..ctx.days.len());
        self.time_slot = rng.random_range(0..ctx.time_slots.len());
        self.room = &ctx.rooms[rng.random_range(0..ctx.rooms.len())];
    }
}

/// A candidate timetable: one session per template position.
#[derive(Debug, Clone)]
pub struct Timetable<'a> {
    pub sessions: Vec<ClassSession<'a>>,
    /// 0.0 until scored; stale after any change to `sessions`.
    pub fitness: f64,
}

impl<'a> Timetable<'a> {
    pub fn new(sessions: Vec<ClassSession<'a>>) -> Self {
        Self {
            sessions,
            fitness: 0.0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Builds an unscored individual with uniformly random placements.
pub fn random_timetable<'a, R: Rng>(ctx: &RunContext<'a>, rng: &mut R) -> Timetable<'a> {
    let sessions = ctx
        .template
        .iter()
        .map(|obligation| {
            let day = rng.random_range(0..ctx.days.len());
            let time_slot = rng.random_range(0..ctx.time_slots.len());
            let room = &ctx.rooms[rng.random_range(0..ctx.rooms.len())];
            ClassSession {
                group: obligation.group,
                subject: obligation.subject,
                professor: obligation.professor,
                room,
                day,
                time_slot,
            }
        })
        .collect();
    Timetable::new(sessions)
}
