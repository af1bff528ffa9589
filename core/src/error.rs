use crate::{
    person::HealthState,
    types::{Frame, PersonId},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid config '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Person {id} does not exist")]
    UnknownPerson { id: PersonId },

    #[error("Person {id} cannot be infected: current state is {state:?}")]
    AlreadyInfected { id: PersonId, state: HealthState },

    #[error("Person {id} has never been infected")]
    NotInfected { id: PersonId },

    #[error("Person {id}: illegal transition {from:?} -> {to:?}")]
    InvalidTransition {
        id: PersonId,
        from: HealthState,
        to: HealthState,
    },

    #[error("Hospital capacity exceeded: {hospitalized} hospitalized, capacity {capacity}")]
    CapacityExceeded { hospitalized: usize, capacity: usize },

    #[error("Person {id} has no transmission budget left")]
    BudgetExhausted { id: PersonId },

    #[error("Population size changed: expected {expected}, counted {actual}")]
    PopulationMismatch { expected: usize, actual: usize },

    #[error("Frame out of order: last stepped {last}, got {actual}")]
    FrameOutOfOrder { last: Frame, actual: Frame },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { field, reason: reason.into() }
    }
}
