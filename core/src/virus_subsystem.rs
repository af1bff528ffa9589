//! Transmission and disease progression.
//!
//! Per frame:
//!   1. Snapshot the infected ids. People infected during this pass
//!      do not transmit until the next frame.
//!   2. Anyone whose recovery window has expired dies or becomes
//!      immune, and does not transmit this frame.
//!   3. Everyone else exposes the susceptible persons inside their
//!      exposure box, limited by their transmission budget.

use crate::{
    config::SimConfig,
    error::SimResult,
    event::SimEvent,
    person::{HealthState, Person},
    population::{ExposureBox, Outcome, Population},
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::{Frame, PersonId},
};

/// Extra death chance for infections never treated in hospital.
pub const UNTREATED_MORTALITY_PENALTY: f64 = 0.2;

/// Lower bound of the exposure draw.
const EXPOSURE_CHANCE_MIN: f64 = 0.0001;

/// Lower bound of the die-or-immune draw.
const OUTCOME_CHANCE_MIN: f64 = 0.001;

pub struct VirusSubsystem {
    /// Half-width of the exposure box: sqrt(infection_range).
    exposure_half_width: f64,
    recovery_time:       Frame,
    capacity:            usize,
    mask_effectiveness:  f64,
}

impl VirusSubsystem {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            exposure_half_width: config.infection_range.sqrt(),
            recovery_time:       config.recovery_time,
            capacity:            config.total_healthcare_capacity(),
            mask_effectiveness:  config.mask_factor(),
        }
    }

    pub fn total_healthcare_capacity(&self) -> usize {
        self.capacity
    }

    /// Apply one frame of disease progression and transmission.
    pub fn advance(
        &self,
        population: &mut Population,
        frame: Frame,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        let infectious = population.ids_in_state(HealthState::Infected);

        for infector in infectious {
            if population.time_infected(infector, frame)? >= self.recovery_time {
                events.push(self.resolve(population, infector, frame, rng)?);
                continue;
            }

            let (bounds, infector_masked) = {
                let p = population.get(infector)?;
                (ExposureBox::around(p.x, p.y, self.exposure_half_width), p.mask_wearing)
            };

            for candidate in population.find_susceptible_in_box(&bounds) {
                let chance = rng.uniform(EXPOSURE_CHANCE_MIN, 1.0);
                let threshold = self.exposure_threshold(population.get(candidate)?, infector_masked);
                if chance < threshold && population.get(infector)?.transmission_budget > 0 {
                    self.transmit(population, infector, candidate, frame, &mut events)?;
                }
            }
        }

        Ok(events)
    }

    /// Susceptibility scaled down once per mask between the two people.
    fn exposure_threshold(&self, candidate: &Person, infector_masked: bool) -> f64 {
        let masks = i32::from(infector_masked) + i32::from(candidate.mask_wearing);
        candidate.susceptibility * (1.0 - self.mask_effectiveness).powi(masks)
    }

    fn transmit(
        &self,
        population: &mut Population,
        infector: PersonId,
        target: PersonId,
        frame: Frame,
        events: &mut Vec<SimEvent>,
    ) -> SimResult<()> {
        population.set_infected(target, frame, infector)?;
        population.spend_transmission_budget(infector)?;
        events.push(SimEvent::PersonInfected { frame, person_id: target, infected_by: infector });

        if population.hospitalized_count() < self.capacity {
            population.admit_to_hospital(target, self.capacity)?;
            events.push(SimEvent::PersonHospitalized { frame, person_id: target });
        }
        Ok(())
    }

    fn resolve(
        &self,
        population: &mut Population,
        id: PersonId,
        frame: Frame,
        rng: &mut SubsystemRng,
    ) -> SimResult<SimEvent> {
        let (was_hospitalized, mortality_rate) = {
            let p = population.get(id)?;
            (p.is_hospitalized(), p.mortality_rate)
        };
        let outcome = die_or_immune(was_hospitalized, mortality_rate, rng);
        population.resolve_infection(id, outcome)?;

        Ok(match outcome {
            Outcome::Died => SimEvent::PersonDied { frame, person_id: id, was_hospitalized },
            Outcome::Recovered => SimEvent::PersonRecovered { frame, person_id: id, was_hospitalized },
        })
    }
}

/// Draw the end of an infection. Hospitalized people die at their
/// own mortality rate, everyone else at that rate plus the penalty.
pub fn die_or_immune(hospitalized: bool, mortality_rate: f64, rng: &mut SubsystemRng) -> Outcome {
    let chance = rng.uniform(OUTCOME_CHANCE_MIN, 1.0);
    outcome_for_chance(chance, hospitalized, mortality_rate)
}

fn outcome_for_chance(chance: f64, hospitalized: bool, mortality_rate: f64) -> Outcome {
    let threshold = if hospitalized {
        mortality_rate
    } else {
        mortality_rate + UNTREATED_MORTALITY_PENALTY
    };
    if chance < threshold { Outcome::Died } else { Outcome::Recovered }
}

impl SimSubsystem for VirusSubsystem {
    fn name(&self) -> &'static str { "virus" }

    fn update(
        &mut self,
        frame: Frame,
        population: &mut Population,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let events = self.advance(population, frame, rng)?;
        log::debug!(
            "frame={frame} virus: {} event(s), {} hospitalized",
            events.len(),
            population.hospitalized_count()
        );
        Ok(events)
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hospitalized_with_zero_mortality_always_recovers() {
        for chance in [0.001, 0.1, 0.5, 0.999] {
            assert_eq!(outcome_for_chance(chance, true, 0.0), Outcome::Recovered);
        }
    }

    #[test]
    fn untreated_cases_carry_the_penalty() {
        assert_eq!(outcome_for_chance(0.15, false, 0.0), Outcome::Died);
        assert_eq!(outcome_for_chance(0.15, true, 0.0), Outcome::Recovered);
        assert_eq!(outcome_for_chance(0.25, false, 0.1), Outcome::Died);
        assert_eq!(outcome_for_chance(0.35, false, 0.1), Outcome::Recovered);
    }

    #[test]
    fn untreated_death_rate_matches_threshold_statistically() {
        let mut rng = SubsystemRng::new(2024, 3);
        let trials = 20_000;
        let deaths = (0..trials)
            .filter(|_| die_or_immune(false, 0.0, &mut rng) == Outcome::Died)
            .count();
        let observed = deaths as f64 / trials as f64;
        // P(U[0.001, 1) < 0.2) = 0.199 / 0.999
        let expected = (0.2 - 0.001) / 0.999;
        assert!(
            (observed - expected).abs() < 0.015,
            "observed death rate {observed:.4}, expected ~{expected:.4}"
        );
    }
}
