//! Subsystem trait.
//!
//! RULE: Every per-frame stage implements SimSubsystem.
//! The engine calls update() on each registered subsystem
//! in registration order, every frame.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    error::SimResult,
    event::SimEvent,
    population::Population,
    rng::SubsystemRng,
    types::Frame,
};
use std::any::Any;

/// The contract every subsystem must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per frame by the engine.
    ///
    /// - `frame`:      the frame being stepped
    /// - `population`: the table, borrowed for this call only
    /// - `rng`:        this subsystem's deterministic RNG for this frame
    ///
    /// Returns the events describing what changed.
    fn update(
        &mut self,
        frame: Frame,
        population: &mut Population,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;

    /// For downcasting in tests and tooling only.
    /// Production sim code never uses this.
    fn as_any(&self) -> &dyn Any;
}
