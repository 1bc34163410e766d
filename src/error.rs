use thiserror::Error;

/// Errors raised while validating a start command, before the search runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimetableError {
    /// A teaching load points at an id that is not in the reference data.
    #[error("{kind} '{id}' referenced by a teaching load was not found")]
    MissingReference { kind: &'static str, id: String },

    /// Two entities of the same kind share an id.
    #[error("duplicate {kind} id '{id}'")]
    DuplicateReference { kind: &'static str, id: String },

    /// Days, time slots or rooms are empty.
    #[error("no {0} configured; nothing to schedule into")]
    EmptyDomain(&'static str),

    /// A day or time-slot label appears more than once.
    #[error("{kind} '{value}' is listed more than once")]
    DuplicateDomainValue { kind: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    DegenerateConfig(String),
}
