//! The frame event log.
//!
//! RULE: Every state change a subsystem makes is also emitted as an event.
//! The engine persists them in emission order, so a run can be audited
//! frame by frame without reading the population table.

use crate::types::{Frame, PersonId, RunId};
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants may be appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    FrameStarted {
        frame: Frame,
    },
    FrameCompleted {
        frame: Frame,
    },
    RunInitialized {
        run_id: RunId,
        seed: u64,
        population: usize,
    },

    // ── Policy events ──────────────────────────────
    SocialDistancingEnforced {
        frame: Frame,
        persons: usize,
    },
    MaskMandateEnforced {
        frame: Frame,
        persons: usize,
    },

    // ── Virus events ───────────────────────────────
    PersonInfected {
        frame: Frame,
        person_id: PersonId,
        infected_by: PersonId,
    },
    PersonHospitalized {
        frame: Frame,
        person_id: PersonId,
    },
    PersonRecovered {
        frame: Frame,
        person_id: PersonId,
        was_hospitalized: bool,
    },
    PersonDied {
        frame: Frame,
        person_id: PersonId,
        was_hospitalized: bool,
    },
}

impl SimEvent {
    /// Stable string name, used for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::FrameStarted { .. }             => "frame_started",
            Self::FrameCompleted { .. }           => "frame_completed",
            Self::RunInitialized { .. }           => "run_initialized",
            Self::SocialDistancingEnforced { .. } => "social_distancing_enforced",
            Self::MaskMandateEnforced { .. }      => "mask_mandate_enforced",
            Self::PersonInfected { .. }           => "person_infected",
            Self::PersonHospitalized { .. }       => "person_hospitalized",
            Self::PersonRecovered { .. }          => "person_recovered",
            Self::PersonDied { .. }               => "person_died",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub frame: Frame,
    pub subsystem: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}
