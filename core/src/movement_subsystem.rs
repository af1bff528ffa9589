use crate::{
    config::{AreaBounds, SimConfig},
    error::SimResult,
    event::SimEvent,
    population::Population,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::{Frame, PersonId},
};
use std::f64::consts::{PI, TAU};

/// Random-walk movement with wall reflection and distancing avoidance.
pub struct MovementSubsystem {
    area:               AreaBounds,
    speed:              f64,
    heading_jitter:     f64,
    avoidance_radius:   f64,
    avoidance_strength: f64,
}

impl MovementSubsystem {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            area:               config.area,
            speed:              config.speed,
            heading_jitter:     config.heading_jitter,
            avoidance_radius:   config.avoidance_radius,
            avoidance_strength: config.avoidance_strength,
        }
    }

    /// Move every living person one step. Dead persons stay put.
    pub fn advance(&self, population: &mut Population, rng: &mut SubsystemRng) {
        // Neighbour lookups see frame-start positions so the result
        // does not depend on update order.
        let living: Vec<(PersonId, f64, f64)> = population
            .persons()
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| (p.id, p.x, p.y))
            .collect();

        for person in population.persons_mut().iter_mut().filter(|p| p.is_alive()) {
            let mut heading = person.heading + rng.uniform(-self.heading_jitter, self.heading_jitter);

            if person.social_distance && self.avoidance_strength > 0.0 {
                if let Some((nx, ny)) = nearest_within(&living, person.id, person.x, person.y, self.avoidance_radius) {
                    let away = if nx == person.x && ny == person.y {
                        heading + PI
                    } else {
                        (person.y - ny).atan2(person.x - nx)
                    };
                    heading += self.avoidance_strength * wrap_angle(away - heading);
                }
            }

            let (x, y, heading) = self.reflect(
                person.x + self.speed * heading.cos(),
                person.y + self.speed * heading.sin(),
                heading,
            );
            person.x = x;
            person.y = y;
            person.heading = wrap_angle(heading);
        }
    }

    /// Mirror an out-of-bounds step back inside and bounce the heading.
    fn reflect(&self, mut x: f64, mut y: f64, mut heading: f64) -> (f64, f64, f64) {
        let a = &self.area;
        if x < a.x_min {
            x = 2.0 * a.x_min - x;
            heading = PI - heading;
        } else if x > a.x_max {
            x = 2.0 * a.x_max - x;
            heading = PI - heading;
        }
        if y < a.y_min {
            y = 2.0 * a.y_min - y;
            heading = -heading;
        } else if y > a.y_max {
            y = 2.0 * a.y_max - y;
            heading = -heading;
        }
        (x.clamp(a.x_min, a.x_max), y.clamp(a.y_min, a.y_max), heading)
    }
}

impl SimSubsystem for MovementSubsystem {
    fn name(&self) -> &'static str { "movement" }

    fn update(
        &mut self,
        _frame: Frame,
        population: &mut Population,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        self.advance(population, rng);
        Ok(vec![])
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

fn nearest_within(
    living: &[(PersonId, f64, f64)],
    me: PersonId,
    x: f64,
    y: f64,
    radius: f64,
) -> Option<(f64, f64)> {
    let radius_sq = radius * radius;
    living
        .iter()
        .filter(|(id, ..)| *id != me)
        .map(|&(_, nx, ny)| ((nx - x).powi(2) + (ny - y).powi(2), nx, ny))
        .filter(|(d2, ..)| *d2 <= radius_sq)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, nx, ny)| (nx, ny))
}

/// Normalise to (-π, π].
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI { PI } else { wrapped }
}
