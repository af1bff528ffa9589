//! The population table.
//!
//! RULE: Only population.rs mutates a Person's health fields.
//! Subsystems borrow the table for one call and go through the
//! methods below, which enforce the write-once and monotonic
//! state invariants instead of clamping.

use crate::{
    config::SimConfig,
    error::{SimError, SimResult},
    person::{HealthState, HospitalStatus, Person},
    rng::SubsystemRng,
    types::{Frame, PersonId},
};
use rand_distr::{Gamma, Poisson};

/// Axis-aligned exposure box. Membership is strict on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ExposureBox {
    /// Square of half-width `half_width` centred on `(x, y)`.
    pub fn around(x: f64, y: f64, half_width: f64) -> Self {
        Self {
            x_min: x - half_width,
            x_max: x + half_width,
            y_min: y - half_width,
            y_max: y + half_width,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x_min < x && x < self.x_max && self.y_min < y && y < self.y_max
    }
}

/// How an infection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Recovered,
    Died,
}

impl Outcome {
    pub fn state(&self) -> HealthState {
        match self {
            Self::Recovered => HealthState::Recovered,
            Self::Died => HealthState::Dead,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Population {
    persons: Vec<Person>,
}

impl Population {
    /// Wrap an existing table. Ids must equal row positions.
    pub fn from_persons(persons: Vec<Person>) -> SimResult<Self> {
        if let Some(p) = persons.iter().enumerate().find(|(i, p)| p.id != *i).map(|(_, p)| p) {
            return Err(SimError::UnknownPerson { id: p.id });
        }
        Ok(Self { persons })
    }

    /// Draw the initial population and infect the seeds at frame 0.
    pub fn generate(config: &SimConfig, rng: &mut SubsystemRng) -> SimResult<Self> {
        let budget_mean = Gamma::new(config.k_value, config.r_value / config.k_value)
            .map_err(|e| SimError::config("k_value", e.to_string()))?;
        let age_span = config.max_age - config.min_age;
        let area = config.area;

        let mut persons = Vec::with_capacity(config.total_population);
        for id in 0..config.total_population {
            let age = config.min_age + rng.next_u64_below(u64::from(age_span) + 1) as u32;
            let age_fraction = if age_span == 0 {
                0.0
            } else {
                f64::from(age - config.min_age) / f64::from(age_span)
            };

            let mut person = Person::healthy(
                id,
                rng.uniform(area.x_min, area.x_max),
                rng.uniform(area.y_min, area.y_max),
            );
            person.heading = rng.uniform(0.0, std::f64::consts::TAU);
            person.age = age;
            person.susceptibility = (0.4 + 0.6 * age_fraction) * rng.uniform(0.75, 1.0);
            person.mortality_rate = config.mortality_rate_for(age);
            person.transmission_budget = draw_transmission_budget(&budget_mean, rng);
            persons.push(person);
        }

        let mut population = Self { persons };
        let capacity = config.total_healthcare_capacity();
        for id in rng.choose_distinct(config.total_population, config.initial_infected) {
            population.set_infected(id, 0, id)?;
            if population.hospitalized_count() < capacity {
                population.admit_to_hospital(id, capacity)?;
            }
        }

        log::info!(
            "population: generated {} persons, {} seed infection(s), capacity {capacity}",
            population.len(),
            config.initial_infected
        );
        Ok(population)
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn get(&self, id: PersonId) -> SimResult<&Person> {
        self.persons.get(id).ok_or(SimError::UnknownPerson { id })
    }

    /// Direct row access for movement and for setting up test scenarios.
    /// Health fields should still go through the checked methods.
    pub fn get_mut(&mut self, id: PersonId) -> SimResult<&mut Person> {
        self.persons.get_mut(id).ok_or(SimError::UnknownPerson { id })
    }

    pub(crate) fn persons_mut(&mut self) -> &mut [Person] {
        &mut self.persons
    }

    // ── Filtered views ─────────────────────────────────────────

    pub fn in_state(&self, state: HealthState) -> Vec<Person> {
        self.persons
            .iter()
            .filter(|p| p.current_state == state)
            .cloned()
            .collect()
    }

    pub fn all_healthy(&self) -> Vec<Person> {
        self.in_state(HealthState::Healthy)
    }

    pub fn all_infected(&self) -> Vec<Person> {
        self.in_state(HealthState::Infected)
    }

    pub fn all_recovered(&self) -> Vec<Person> {
        self.in_state(HealthState::Recovered)
    }

    pub fn all_dead(&self) -> Vec<Person> {
        self.in_state(HealthState::Dead)
    }

    pub fn ids_in_state(&self, state: HealthState) -> Vec<PersonId> {
        self.persons
            .iter()
            .filter(|p| p.current_state == state)
            .map(|p| p.id)
            .collect()
    }

    pub fn count_by_state(&self, state: HealthState) -> usize {
        self.persons.iter().filter(|p| p.current_state == state).count()
    }

    pub fn hospitalized_count(&self) -> usize {
        self.persons.iter().filter(|p| p.is_hospitalized()).count()
    }

    pub fn positions(&self, state: HealthState) -> Vec<(f64, f64)> {
        self.persons
            .iter()
            .filter(|p| p.current_state == state)
            .map(|p| (p.x, p.y))
            .collect()
    }

    /// Healthy, non-distancing persons strictly inside `bounds`, in id order.
    pub fn find_susceptible_in_box(&self, bounds: &ExposureBox) -> Vec<PersonId> {
        self.persons
            .iter()
            .filter(|p| {
                p.current_state == HealthState::Healthy
                    && !p.social_distance
                    && bounds.contains(p.x, p.y)
            })
            .map(|p| p.id)
            .collect()
    }

    // ── Infection lifecycle ────────────────────────────────────

    /// Frames elapsed since `id` was infected.
    pub fn time_infected(&self, id: PersonId, current_frame: Frame) -> SimResult<Frame> {
        let at = self.get(id)?.infected_at_frame.ok_or(SimError::NotInfected { id })?;
        Ok(current_frame.saturating_sub(at))
    }

    /// Healthy -> Infected. Writes `infected_by` and `infected_at_frame` once.
    pub fn set_infected(&mut self, id: PersonId, frame: Frame, infected_by: PersonId) -> SimResult<()> {
        if infected_by >= self.persons.len() {
            return Err(SimError::UnknownPerson { id: infected_by });
        }
        let person = self.get_mut(id)?;
        if person.current_state != HealthState::Healthy
            || person.infected_by.is_some()
            || person.infected_at_frame.is_some()
        {
            return Err(SimError::AlreadyInfected { id, state: person.current_state });
        }
        person.current_state = HealthState::Infected;
        person.infected_by = Some(infected_by);
        person.infected_at_frame = Some(frame);
        Ok(())
    }

    /// Take one of `capacity` hospital beds for an infected person.
    pub fn admit_to_hospital(&mut self, id: PersonId, capacity: usize) -> SimResult<()> {
        let hospitalized = self.hospitalized_count();
        if hospitalized >= capacity {
            return Err(SimError::CapacityExceeded { hospitalized: hospitalized + 1, capacity });
        }
        let person = self.get_mut(id)?;
        if person.current_state != HealthState::Infected
            || person.hospitalized != HospitalStatus::NotHospitalized
        {
            return Err(SimError::InvalidTransition {
                id,
                from: person.current_state,
                to: HealthState::Infected,
            });
        }
        person.hospitalized = HospitalStatus::Hospitalized;
        Ok(())
    }

    /// Infected -> Recovered | Dead. A hospitalized person leaves
    /// their bed and is marked `DiedHospitalized` either way.
    pub fn resolve_infection(&mut self, id: PersonId, outcome: Outcome) -> SimResult<()> {
        let person = self.get_mut(id)?;
        let next = outcome.state();
        if !person.current_state.can_become(next) {
            return Err(SimError::InvalidTransition { id, from: person.current_state, to: next });
        }
        if person.hospitalized == HospitalStatus::Hospitalized {
            person.hospitalized = HospitalStatus::DiedHospitalized;
        }
        person.current_state = next;
        Ok(())
    }

    /// Record one successful transmission caused by `id`.
    pub fn spend_transmission_budget(&mut self, id: PersonId) -> SimResult<()> {
        let person = self.get_mut(id)?;
        person.transmission_budget = person
            .transmission_budget
            .checked_sub(1)
            .ok_or(SimError::BudgetExhausted { id })?;
        Ok(())
    }

    // ── Policy flags ───────────────────────────────────────────

    /// Flag `ids` as distancing. Returns how many were newly flagged.
    pub fn enforce_social_distance(&mut self, ids: &[PersonId]) -> SimResult<usize> {
        let mut flagged = 0;
        for &id in ids {
            let person = self.get_mut(id)?;
            if !person.social_distance {
                person.social_distance = true;
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    /// Put a mask on every living person. Returns how many.
    pub fn enforce_mask_wearing(&mut self) -> usize {
        let mut masked = 0;
        for person in self.persons.iter_mut().filter(|p| p.is_alive()) {
            person.mask_wearing = true;
            masked += 1;
        }
        masked
    }

    // ── Invariants ─────────────────────────────────────────────

    /// Conservation and the hospital capacity bound.
    pub fn check_invariants(&self, expected_size: usize, capacity: usize) -> SimResult<()> {
        let counted = [
            HealthState::Healthy,
            HealthState::Infected,
            HealthState::Recovered,
            HealthState::Dead,
        ]
        .iter()
        .map(|s| self.count_by_state(*s))
        .sum::<usize>();
        if counted != expected_size || self.persons.len() != expected_size {
            return Err(SimError::PopulationMismatch { expected: expected_size, actual: counted });
        }
        let hospitalized = self.hospitalized_count();
        if hospitalized > capacity {
            return Err(SimError::CapacityExceeded { hospitalized, capacity });
        }
        Ok(())
    }
}

/// NegativeBinomial(mean r, dispersion k) as a Gamma-Poisson mixture.
fn draw_transmission_budget(budget_mean: &Gamma<f64>, rng: &mut SubsystemRng) -> u32 {
    let lambda = rng.sample(budget_mean);
    if !(lambda > 0.0) {
        return 0;
    }
    match Poisson::new(lambda) {
        Ok(poisson) => rng.sample(&poisson).min(f64::from(u32::MAX)) as u32,
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: usize) -> Population {
        let persons = (0..n).map(|i| Person::healthy(i, i as f64, 0.0)).collect();
        Population::from_persons(persons).expect("contiguous ids")
    }

    #[test]
    fn exposure_box_is_strict() {
        let b = ExposureBox::around(0.0, 0.0, 1.0);
        assert!(b.contains(0.5, -0.5));
        assert!(!b.contains(1.0, 0.0), "edge points are outside");
        assert!(!b.contains(0.0, -1.0));
    }

    #[test]
    fn resolving_a_hospitalized_person_frees_the_bed() {
        let mut pop = row(3);
        pop.set_infected(1, 0, 1).unwrap();
        pop.admit_to_hospital(1, 1).unwrap();
        assert_eq!(pop.hospitalized_count(), 1);

        pop.resolve_infection(1, Outcome::Recovered).unwrap();
        let p = pop.get(1).unwrap();
        assert_eq!(p.current_state, HealthState::Recovered);
        assert_eq!(p.hospitalized, HospitalStatus::DiedHospitalized);
        assert_eq!(pop.hospitalized_count(), 0);
    }

    #[test]
    fn budget_never_goes_negative() {
        let mut pop = row(2);
        pop.get_mut(0).unwrap().transmission_budget = 1;
        pop.spend_transmission_budget(0).unwrap();
        assert!(matches!(
            pop.spend_transmission_budget(0),
            Err(SimError::BudgetExhausted { id: 0 })
        ));
        assert_eq!(pop.get(0).unwrap().transmission_budget, 0);
    }

    #[test]
    fn from_persons_rejects_gapped_ids() {
        let persons = vec![Person::healthy(0, 0.0, 0.0), Person::healthy(2, 0.0, 0.0)];
        assert!(Population::from_persons(persons).is_err());
    }
}
