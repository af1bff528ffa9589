use crate::error::{SimError, SimResult};
use crate::types::Frame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rectangular area people move in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AreaBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl AreaBounds {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

impl Default for AreaBounds {
    fn default() -> Self {
        Self { x_min: 0.0, x_max: 1.0, y_min: 0.0, y_max: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // ── Virus ──────────────────────────────────────────
    /// Dispersion of the transmission-budget distribution.
    pub k_value: f64,
    /// Mean of the transmission-budget distribution.
    pub r_value: f64,
    /// Lower age bound of a bucket -> mortality rate.
    pub mortality_rate: BTreeMap<u32, f64>,
    /// Squared half-width of the exposure box.
    pub infection_range: f64,
    pub recovery_time: Frame,
    pub mask_effectiveness: BTreeMap<String, f64>,
    /// Key into `mask_effectiveness` for the mandated mask.
    pub mask_type: String,

    // ── People ─────────────────────────────────────────
    pub total_population: usize,
    pub initial_infected: usize,
    pub min_age: u32,
    pub max_age: u32,
    pub social_distancing_percent: f64,
    pub speed: f64,
    /// Max heading change per frame, radians.
    pub heading_jitter: f64,
    pub avoidance_radius: f64,
    /// 0 = ignore neighbours, 1 = turn fully away.
    pub avoidance_strength: f64,

    // ── Area ───────────────────────────────────────────
    pub area: AreaBounds,
    /// Hospital beds as a percentage of the population.
    pub healthcare_capacity_ratio: f64,
    /// Frame at which social distancing starts; <= 0 disables it.
    pub enforce_social_distancing_at: i64,
    /// Frame at which masks are mandated; <= 0 disables it.
    pub enforce_mask_wearing_at: i64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            k_value: 0.1,
            r_value: 2.5,
            mortality_rate: BTreeMap::from([
                (0, 0.002),
                (20, 0.004),
                (40, 0.01),
                (60, 0.05),
                (80, 0.15),
            ]),
            infection_range: 0.0004,
            recovery_time: 150,
            mask_effectiveness: BTreeMap::from([
                ("cloth".to_string(), 0.5),
                ("surgical".to_string(), 0.7),
                ("n95".to_string(), 0.95),
            ]),
            mask_type: "surgical".into(),
            total_population: 1000,
            initial_infected: 1,
            min_age: 1,
            max_age: 90,
            social_distancing_percent: 0.7,
            speed: 0.005,
            heading_jitter: std::f64::consts::PI / 8.0,
            avoidance_radius: 0.05,
            avoidance_strength: 0.5,
            area: AreaBounds::default(),
            healthcare_capacity_ratio: 20.0,
            enforce_social_distancing_at: 200,
            enforce_mask_wearing_at: 100,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Small population, both policies disabled.
    pub fn default_test() -> Self {
        Self {
            total_population: 100,
            infection_range: 0.001,
            recovery_time: 30,
            enforce_social_distancing_at: 0,
            enforce_mask_wearing_at: 0,
            ..Self::default()
        }
    }

    /// Reject bundles the engine cannot run.
    pub fn validate(&self) -> SimResult<()> {
        if self.total_population == 0 {
            return Err(SimError::config("total_population", "must be > 0"));
        }
        if self.initial_infected > self.total_population {
            return Err(SimError::config(
                "initial_infected",
                format!("{} exceeds population {}", self.initial_infected, self.total_population),
            ));
        }
        if !(self.k_value > 0.0) {
            return Err(SimError::config("k_value", "must be > 0"));
        }
        if !(self.r_value > 0.0) {
            return Err(SimError::config("r_value", "must be > 0"));
        }
        if self.min_age > self.max_age {
            return Err(SimError::config(
                "min_age",
                format!("{} is above max_age {}", self.min_age, self.max_age),
            ));
        }
        for (bucket, rate) in &self.mortality_rate {
            if !is_probability(*rate) {
                return Err(SimError::config(
                    "mortality_rate",
                    format!("bucket {bucket}: {rate} is outside [0, 1]"),
                ));
            }
        }
        if !is_probability(self.social_distancing_percent) {
            return Err(SimError::config("social_distancing_percent", "must be in [0, 1]"));
        }
        if !(self.infection_range > 0.0) {
            return Err(SimError::config("infection_range", "must be > 0"));
        }
        if self.recovery_time == 0 {
            return Err(SimError::config("recovery_time", "must be > 0"));
        }
        for (mask, eff) in &self.mask_effectiveness {
            if !is_probability(*eff) {
                return Err(SimError::config(
                    "mask_effectiveness",
                    format!("{mask}: {eff} is outside [0, 1]"),
                ));
            }
        }
        if self.enforce_mask_wearing_at > 0 && !self.mask_effectiveness.contains_key(&self.mask_type) {
            return Err(SimError::config(
                "mask_type",
                format!("'{}' has no mask_effectiveness entry", self.mask_type),
            ));
        }
        if !(self.speed > 0.0) {
            return Err(SimError::config("speed", "must be > 0"));
        }
        if !(self.heading_jitter >= 0.0) {
            return Err(SimError::config("heading_jitter", "must be >= 0"));
        }
        if !(self.avoidance_radius >= 0.0) {
            return Err(SimError::config("avoidance_radius", "must be >= 0"));
        }
        if !is_probability(self.avoidance_strength) {
            return Err(SimError::config("avoidance_strength", "must be in [0, 1]"));
        }
        if !(self.area.width() > 0.0) || !(self.area.height() > 0.0) {
            return Err(SimError::config(
                "area",
                format!("degenerate area {}x{}", self.area.width(), self.area.height()),
            ));
        }
        if !(0.0..=100.0).contains(&self.healthcare_capacity_ratio) {
            return Err(SimError::config("healthcare_capacity_ratio", "must be a percentage in [0, 100]"));
        }
        Ok(())
    }

    /// Number of hospital beds: population × ratio%, rounded down.
    pub fn total_healthcare_capacity(&self) -> usize {
        (self.total_population as f64 * self.healthcare_capacity_ratio / 100.0).floor() as usize
    }

    /// Rate of the highest bucket starting at or below `age`.
    pub fn mortality_rate_for(&self, age: u32) -> f64 {
        self.mortality_rate
            .range(..=age)
            .next_back()
            .map(|(_, rate)| *rate)
            .unwrap_or(0.0)
    }

    /// Effectiveness of the mandated mask, 0 when unknown.
    pub fn mask_factor(&self) -> f64 {
        self.mask_effectiveness.get(&self.mask_type).copied().unwrap_or(0.0)
    }

    /// Number of persons that comply once distancing is enforced.
    pub fn social_distancing_count(&self) -> usize {
        (self.social_distancing_percent * self.total_population as f64).round() as usize
    }
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

/// Convert an `enforce_*_at` setting to a frame; <= 0 means disabled.
pub fn activation_frame(at: i64) -> Option<Frame> {
    (at > 0).then_some(at as Frame)
}
