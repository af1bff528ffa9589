//! Frame-level aggregates handed to the presentation layer.

use crate::{
    person::HealthState,
    population::Population,
    types::Frame,
};
use serde::{Deserialize, Serialize};

/// Load on the healthcare system, from the infected count vs. capacity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthcareStatus {
    Normal,
    Manageable,
    Worse,
    Extreme,
}

impl HealthcareStatus {
    /// Thresholds at 2/3×, 1× and 1.5× capacity, all strict.
    pub fn assess(currently_infected: usize, capacity: usize) -> Self {
        let infected = currently_infected as f64;
        let capacity = capacity as f64;
        if infected > capacity * 3.0 / 2.0 {
            Self::Extreme
        } else if infected > capacity {
            Self::Worse
        } else if infected > capacity * 2.0 / 3.0 {
            Self::Manageable
        } else {
            Self::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal     => "Normal",
            Self::Manageable => "Manageable",
            Self::Worse      => "Worse",
            Self::Extreme    => "Extreme",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameStats {
    pub frame:               Frame,
    pub healthy:             usize,
    pub infected:            usize,
    pub recovered:           usize,
    pub dead:                usize,
    pub hospitalized:        usize,
    /// Everyone who has ever been infected.
    pub cumulative_infected: usize,
    pub healthcare_status:   HealthcareStatus,
}

impl FrameStats {
    pub fn collect(frame: Frame, population: &Population, capacity: usize) -> Self {
        let healthy = population.count_by_state(HealthState::Healthy);
        let infected = population.count_by_state(HealthState::Infected);
        Self {
            frame,
            healthy,
            infected,
            recovered: population.count_by_state(HealthState::Recovered),
            dead: population.count_by_state(HealthState::Dead),
            hospitalized: population.hospitalized_count(),
            cumulative_infected: population.len() - healthy,
            healthcare_status: HealthcareStatus::assess(infected, capacity),
        }
    }

    pub fn total(&self) -> usize {
        self.healthy + self.infected + self.recovered + self.dead
    }

    pub fn time_series_point(&self) -> TimeSeriesPoint {
        TimeSeriesPoint {
            frame: self.frame,
            currently_infected: self.infected,
            cumulative_infected: self.cumulative_infected,
            dead: self.dead,
            recovered: self.recovered,
        }
    }
}

/// One row of the running line chart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSeriesPoint {
    pub frame:               Frame,
    pub currently_infected:  usize,
    pub cumulative_infected: usize,
    pub dead:                usize,
    pub recovered:           usize,
}

/// The four scatter views, as (x, y) lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PositionViews {
    pub healthy:   Vec<(f64, f64)>,
    pub infected:  Vec<(f64, f64)>,
    pub recovered: Vec<(f64, f64)>,
    pub dead:      Vec<(f64, f64)>,
}

impl PositionViews {
    pub fn collect(population: &Population) -> Self {
        Self {
            healthy:   population.positions(HealthState::Healthy),
            infected:  population.positions(HealthState::Infected),
            recovered: population.positions(HealthState::Recovered),
            dead:      population.positions(HealthState::Dead),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds_are_strict() {
        // capacity 30: thresholds at 20, 30, 45
        assert_eq!(HealthcareStatus::assess(20, 30), HealthcareStatus::Normal);
        assert_eq!(HealthcareStatus::assess(21, 30), HealthcareStatus::Manageable);
        assert_eq!(HealthcareStatus::assess(30, 30), HealthcareStatus::Manageable);
        assert_eq!(HealthcareStatus::assess(31, 30), HealthcareStatus::Worse);
        assert_eq!(HealthcareStatus::assess(45, 30), HealthcareStatus::Worse);
        assert_eq!(HealthcareStatus::assess(46, 30), HealthcareStatus::Extreme);
    }

    #[test]
    fn zero_capacity_is_extreme_as_soon_as_anyone_is_sick() {
        assert_eq!(HealthcareStatus::assess(0, 0), HealthcareStatus::Normal);
        assert_eq!(HealthcareStatus::assess(1, 0), HealthcareStatus::Extreme);
    }
}
