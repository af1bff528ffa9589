//! Shared primitive types used across the entire simulation.

/// A simulation frame. One frame = one discrete tick of the animation clock.
pub type Frame = u64;

/// Stable index of a person in the population table, 0..size-1.
pub type PersonId = usize;

/// The canonical run identifier.
pub type RunId = String;

/// Generate a fresh run identifier for `seed`.
pub fn new_run_id(seed: u64) -> RunId {
    format!("run-{seed}-{}", uuid::Uuid::new_v4().simple())
}
