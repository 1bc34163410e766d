use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type ProfessorId = String;
pub type RoomId = String;
pub type SubjectId = String;
pub type GroupId = String;

/// An instructor who can be assigned teaching loads.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Professor {
    pub prof_id: ProfessorId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub initials: String,
}

/// A physical room in the shared room pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: RoomId,
    #[serde(default)]
    pub room_name: String,
}

/// A subject and the number of sessions it needs every week.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub subject_id: SubjectId,
    #[serde(default)]
    pub subject_name: String,
    pub weekly_hours: u32,
}

/// A cohort of students that attends classes together.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGroup {
    pub group_id: GroupId,
    #[serde(default)]
    pub group_name: String,
}

/// Who teaches what to whom: one required weekly pairing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingLoad {
    pub group_id: GroupId,
    pub subject_id: SubjectId,
    pub prof_id: ProfessorId,
}

/// Genetic algorithm parameters. Every field falls back to its default when omitted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GaParams {
    pub population_size: usize,
    pub num_generations: usize,
    pub elitism_size: usize,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    /// Fixed seed for reproducible runs; a random one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            population_size: 100,
            num_generations: 250,
            elitism_size: 10,
            mutation_rate: 0.05,
            tournament_size: 5,
            seed: None,
        }
    }
}

/// The complete start command for one search run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableInput {
    pub days: Vec<String>,
    pub time_slots: Vec<String>,
    pub professors: Vec<Professor>,
    pub rooms: Vec<Room>,
    pub subjects: Vec<Subject>,
    pub student_groups: Vec<StudentGroup>,
    pub teaching_loads: Vec<TeachingLoad>,
    #[serde(default)]
    pub params: GaParams,
}

/// Per-generation progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// 1-based generation index.
    pub generation: usize,
    pub total_generations: usize,
    pub best_fitness: f64,
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Converged,
    GenerationBudgetExhausted,
    Cancelled,
}

/// One class placed in the final timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledClass {
    pub day: String,
    pub time_slot: String,
    pub group_id: GroupId,
    pub subject_id: SubjectId,
    pub prof_id: ProfessorId,
    pub room_id: RoomId,
}

/// Describes a constraint that the final timetable still violates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetConstraint {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

/// The final output of the solver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableOutput {
    pub classes: Vec<ScheduledClass>,
    pub fitness: f64,
    pub clashes: usize,
    /// Net idle slots; see [`crate::fitness::FitnessReport::gaps`].
    pub gaps: i64,
    pub generations: usize,
    pub outcome: Outcome,
    pub seed: u64,
    pub unmet_constraints: Vec<UnmetConstraint>,
}
