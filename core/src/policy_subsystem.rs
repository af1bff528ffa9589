use crate::{
    config::{activation_frame, SimConfig},
    error::SimResult,
    event::SimEvent,
    population::Population,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::Frame,
};
use serde::{Deserialize, Serialize};

/// One-way activation state of a single intervention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PolicyLatch {
    Disabled,
    Pending { at: Frame },
    Active { since: Frame },
}

impl PolicyLatch {
    pub fn from_setting(at: i64) -> Self {
        match activation_frame(at) {
            Some(at) => Self::Pending { at },
            None => Self::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Latch on the first frame at or past the threshold.
    /// Returns true only on the frame the latch closes.
    fn trip(&mut self, frame: Frame) -> bool {
        match *self {
            Self::Pending { at } if frame >= at => {
                *self = Self::Active { since: frame };
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyState {
    pub social_distancing: PolicyLatch,
    pub mask_mandate:      PolicyLatch,
}

pub struct PolicySubsystem {
    pub state: PolicyState,
    distancing_count: usize,
}

impl PolicySubsystem {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: PolicyState {
                social_distancing: PolicyLatch::from_setting(config.enforce_social_distancing_at),
                mask_mandate:      PolicyLatch::from_setting(config.enforce_mask_wearing_at),
            },
            distancing_count: config.social_distancing_count(),
        }
    }
}

impl SimSubsystem for PolicySubsystem {
    fn name(&self) -> &'static str { "policy" }

    fn update(
        &mut self,
        frame: Frame,
        population: &mut Population,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();

        if self.state.social_distancing.trip(frame) {
            let chosen = rng.choose_distinct(population.len(), self.distancing_count);
            let persons = population.enforce_social_distance(&chosen)?;
            log::info!("frame={frame} policy: social distancing enforced for {persons} persons");
            events.push(SimEvent::SocialDistancingEnforced { frame, persons });
        }

        if self.state.mask_mandate.trip(frame) {
            let persons = population.enforce_mask_wearing();
            log::info!("frame={frame} policy: mask mandate enforced for {persons} persons");
            events.push(SimEvent::MaskMandateEnforced { frame, persons });
        }

        Ok(events)
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}
