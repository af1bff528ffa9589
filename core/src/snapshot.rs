//! Snapshot serialization: full simulation state to JSON.
//!
//! A snapshot is taken every SNAPSHOT_INTERVAL frames.
//! It captures the complete population table and policy latches,
//! enough to inspect any past state without replaying from frame 0.

use crate::{
    clock::SimClock,
    person::Person,
    policy_subsystem::PolicyState,
    types::{Frame, RunId},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_INTERVAL: Frame = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub run_id:  RunId,
    pub frame:   Frame,
    pub clock:   SimClock,
    pub policy:  Option<PolicyState>,
    pub persons: Vec<Person>,
}
