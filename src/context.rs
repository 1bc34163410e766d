//! Run-scoped view of the reference data.
//!
//! [`RunContext`] validates a [`TimetableInput`] once and exposes the
//! domains and id lookups every operator needs, so no operator touches
//! global state and several runs can proceed side by side.

use crate::data::{GaParams, Professor, Room, StudentGroup, Subject, TimetableInput};
use crate::error::TimetableError;
use crate::template::{Obligation, build_template};
use std::collections::{HashMap, HashSet};

pub const MAX_POPULATION_SIZE: usize = 10_000;
pub const MAX_GENERATIONS: usize = 1_000_000;
/// Upper bound on `population_size * chromosome_len`, the genes alive at once.
pub const MAX_POPULATION_GENES: usize = 10_000_000;

#[derive(Debug)]
pub struct RunContext<'a> {
    pub days: &'a [String],
    pub time_slots: &'a [String],
    pub rooms: &'a [Room],
    pub params: &'a GaParams,
    pub professors: HashMap<&'a str, &'a Professor>,
    pub subjects: HashMap<&'a str, &'a Subject>,
    pub groups: HashMap<&'a str, &'a StudentGroup>,
    /// One entry per required weekly session, fixed for the whole run.
    pub template: Vec<Obligation<'a>>,
}

impl<'a> RunContext<'a> {
    /// Validates the input and builds the gene sequence template.
    ///
    /// Every error is raised here, before a single individual exists.
    pub fn new(input: &'a TimetableInput) -> Result<Self, TimetableError> {
        check_domain("days", &input.days)?;
        check_domain("time slots", &input.time_slots)?;
        if input.rooms.is_empty() {
            return Err(TimetableError::EmptyDomain("rooms"));
        }
        check_params(&input.params)?;

        let professors = index_by("professor", &input.professors, |p| &p.prof_id)?;
        let subjects = index_by("subject", &input.subjects, |s| &s.subject_id)?;
        let groups = index_by("student group", &input.student_groups, |g| &g.group_id)?;
        // rooms are drawn by position, but duplicate ids would still confuse clash counting
        index_by("room", &input.rooms, |r| &r.room_id)?;

        let template = build_template(&input.teaching_loads, &subjects, &groups, &professors)?;
        if template.is_empty() {
            return Err(TimetableError::DegenerateConfig(
                "teaching loads expand to zero class sessions".to_string(),
            ));
        }
        let genes = template.len().checked_mul(input.params.population_size);
        if genes.is_none_or(|genes| genes > MAX_POPULATION_GENES) {
            return Err(TimetableError::DegenerateConfig(format!(
                "{} individuals of {} sessions exceed {MAX_POPULATION_GENES} genes",
                input.params.population_size,
                template.len()
            )));
        }

        Ok(Self {
            days: &input.days,
            time_slots: &input.time_slots,
            rooms: &input.rooms,
            params: &input.params,
            professors,
            subjects,
            groups,
            template,
        })
    }

    /// Number of genes in every chromosome of this run.
    pub fn chromosome_len(&self) -> usize {
        self.template.len()
    }
}

fn check_domain(kind: &'static str, values: &[String]) -> Result<(), TimetableError> {
    if values.is_empty() {
        return Err(TimetableError::EmptyDomain(kind));
    }
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(TimetableError::DuplicateDomainValue {
                kind,
                value: value.clone(),
            });
        }
    }
    Ok(())
}

fn check_params(params: &GaParams) -> Result<(), TimetableError> {
    let reason = if params.population_size < 2 {
        format!("population size must be at least 2, got {}", params.population_size)
    } else if params.population_size > MAX_POPULATION_SIZE {
        format!(
            "population size must be at most {MAX_POPULATION_SIZE}, got {}",
            params.population_size
        )
    } else if params.num_generations > MAX_GENERATIONS {
        format!(
            "number of generations must be at most {MAX_GENERATIONS}, got {}",
            params.num_generations
        )
    } else if params.elitism_size >= params.population_size {
        format!(
            "elitism size {} must be smaller than population size {}",
            params.elitism_size, params.population_size
        )
    } else if params.num_generations == 0 {
        "number of generations must be at least 1".to_string()
    } else if params.tournament_size == 0 {
        "tournament size must be at least 1".to_string()
    } else if !(0.0..=1.0).contains(&params.mutation_rate) {
        format!("mutation rate must lie in [0, 1], got {}", params.mutation_rate)
    } else {
        return Ok(());
    };
    Err(TimetableError::DegenerateConfig(reason))
}

fn index_by<'a, T>(
    kind: &'static str,
    items: &'a [T],
    id: impl Fn(&'a T) -> &'a String,
) -> Result<HashMap<&'a str, &'a T>, TimetableError> {
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        let key = id(item);
        if map.insert(key.as_str(), item).is_some() {
            return Err(TimetableError::DuplicateReference {
                kind,
                id: key.clone(),
            });
        }
    }
    Ok(map)
}
