//! The per-person record every subsystem agrees on.

use crate::types::{Frame, PersonId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy = 0,
    Infected = 1,
    Recovered = 2,
    Dead = 3,
}

impl HealthState {
    /// Recovered and Dead never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Recovered | Self::Dead)
    }

    /// Whether `self -> next` is a legal step of the health state machine.
    pub fn can_become(&self, next: HealthState) -> bool {
        matches!(
            (self, next),
            (Self::Healthy, Self::Infected)
                | (Self::Infected, Self::Recovered)
                | (Self::Infected, Self::Dead)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HospitalStatus {
    NotHospitalized = 0,
    Hospitalized = 1,
    ReleasedOrRecovered = 2,
    DiedHospitalized = 3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: PersonId,
    pub x: f64,
    pub y: f64,
    /// Direction of travel in radians.
    pub heading: f64,
    pub age: u32,
    pub susceptibility: f64,
    pub mortality_rate: f64,
    pub current_state: HealthState,
    /// `Some(self.id)` for seed infections.
    pub infected_by: Option<PersonId>,
    pub infected_at_frame: Option<Frame>,
    pub hospitalized: HospitalStatus,
    pub social_distance: bool,
    /// Remaining number of people this person may still infect.
    pub transmission_budget: u32,
    pub mask_wearing: bool,
}

impl Person {
    /// A healthy, never-infected person at `(x, y)`.
    /// The generator and tests fill in the remaining attributes.
    pub fn healthy(id: PersonId, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            heading: 0.0,
            age: 0,
            susceptibility: 1.0,
            mortality_rate: 0.0,
            current_state: HealthState::Healthy,
            infected_by: None,
            infected_at_frame: None,
            hospitalized: HospitalStatus::NotHospitalized,
            social_distance: false,
            transmission_budget: 0,
            mask_wearing: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_state != HealthState::Dead
    }

    pub fn is_hospitalized(&self) -> bool {
        self.hospitalized == HospitalStatus::Hospitalized
    }

    pub fn is_seed(&self) -> bool {
        self.infected_by == Some(self.id)
    }
}
