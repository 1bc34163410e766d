//! Gene sequence builder.
//!
//! Expands teaching loads into the positional template shared by every
//! chromosome: position `i` always stands for the same teaching obligation,
//! which is what keeps single-point crossover structurally valid.

use crate::data::{Professor, StudentGroup, Subject, TeachingLoad};
use crate::error::TimetableError;
use std::collections::HashMap;

/// A teaching load resolved to the entities it references.
#[derive(Debug, Clone, Copy)]
pub struct Obligation<'a> {
    pub group: &'a StudentGroup,
    pub subject: &'a Subject,
    pub professor: &'a Professor,
}

/// Longest chromosome a run accepts.
pub const MAX_CHROMOSOME_LEN: usize = 100_000;

/// Appends `weekly_hours` copies of every load, in load order.
///
/// A load whose subject, group or professor is unknown is an error, and so
/// is a template longer than [`MAX_CHROMOSOME_LEN`]. The length is checked
/// before anything is allocated.
pub fn build_template<'a>(
    loads: &'a [TeachingLoad],
    subjects: &HashMap<&'a str, &'a Subject>,
    groups: &HashMap<&'a str, &'a StudentGroup>,
    professors: &HashMap<&'a str, &'a Professor>,
) -> Result<Vec<Obligation<'a>>, TimetableError> {
    let mut resolved = Vec::with_capacity(loads.len());
    let mut total: usize = 0;
    for load in loads {
        let subject = *subjects
            .get(load.subject_id.as_str())
            .ok_or_else(|| missing("subject", &load.subject_id))?;
        let group = *groups
            .get(load.group_id.as_str())
            .ok_or_else(|| missing("student group", &load.group_id))?;
        let professor = *professors
            .get(load.prof_id.as_str())
            .ok_or_else(|| missing("professor", &load.prof_id))?;

        let hours = subject.weekly_hours as usize;
        total = total
            .checked_add(hours)
            .filter(|len| *len <= MAX_CHROMOSOME_LEN)
            .ok_or_else(|| {
                TimetableError::DegenerateConfig(format!(
                    "teaching loads expand to more than {MAX_CHROMOSOME_LEN} class sessions"
                ))
            })?;
        resolved.push((Obligation { group, subject, professor }, hours));
    }

    let mut template = Vec::with_capacity(total);
    for (obligation, hours) in resolved {
        template.extend(std::iter::repeat_n(obligation, hours));
    }
    Ok(template)
}

fn missing(kind: &'static str, id: &str) -> TimetableError {
    TimetableError::MissingReference {
        kind,
        id: id.to_string(),
    }
}
