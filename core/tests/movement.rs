//! Movement: bounds, dead persons, distancing avoidance.

use virussim_core::{
    config::SimConfig,
    engine::SimEngine,
    movement_subsystem::MovementSubsystem,
    person::{HealthState, Person},
    population::Population,
    rng::SubsystemRng,
};

fn distance(a: &Person, b: &Person) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

#[test]
fn fast_movers_stay_inside_the_area() {
    let config = SimConfig { speed: 0.3, ..SimConfig::default_test() };
    let area = config.area;
    let mut engine = SimEngine::build_test_with("move-bounds".into(), 21, config).unwrap();

    for frame in 0..200 {
        engine.step(frame).unwrap();
        for p in engine.population().persons() {
            assert!(area.contains(p.x, p.y), "frame {frame}: person {} at ({}, {})", p.id, p.x, p.y);
        }
    }
}

#[test]
fn dead_persons_do_not_move() {
    let config = SimConfig { speed: 0.05, ..SimConfig::default_test() };
    let mover = MovementSubsystem::new(&config);
    let persons = vec![Person::healthy(0, 0.3, 0.3), Person::healthy(1, 0.7, 0.7)];
    let mut pop = Population::from_persons(persons).unwrap();
    pop.get_mut(0).unwrap().current_state = HealthState::Dead;

    let mut rng = SubsystemRng::new(1, 2);
    for _ in 0..20 {
        mover.advance(&mut pop, &mut rng);
    }
    let dead = pop.get(0).unwrap();
    assert_eq!((dead.x, dead.y), (0.3, 0.3));
    let alive = pop.get(1).unwrap();
    assert_ne!((alive.x, alive.y), (0.7, 0.7));
}

#[test]
fn distancing_person_turns_away_from_nearest_neighbour() {
    let config = SimConfig {
        speed: 0.01,
        heading_jitter: 0.0,
        avoidance_radius: 0.05,
        avoidance_strength: 1.0,
        ..SimConfig::default_test()
    };
    let mover = MovementSubsystem::new(&config);
    let mut persons = vec![Person::healthy(0, 0.5, 0.5), Person::healthy(1, 0.52, 0.5)];
    persons[0].social_distance = true;
    let mut pop = Population::from_persons(persons).unwrap();
    let before = distance(pop.get(0).unwrap(), pop.get(1).unwrap());

    mover.advance(&mut pop, &mut SubsystemRng::new(3, 2));

    let a = pop.get(0).unwrap();
    assert!((a.x - 0.49).abs() < 1e-9, "compliant person should step left, is at {}", a.x);
    assert!(distance(a, pop.get(1).unwrap()) > before);
}

#[test]
fn non_compliant_persons_ignore_neighbours() {
    let config = SimConfig {
        speed: 0.01,
        heading_jitter: 0.0,
        avoidance_strength: 1.0,
        ..SimConfig::default_test()
    };
    let mover = MovementSubsystem::new(&config);
    let persons = vec![Person::healthy(0, 0.5, 0.5), Person::healthy(1, 0.52, 0.5)];
    let mut pop = Population::from_persons(persons).unwrap();

    mover.advance(&mut pop, &mut SubsystemRng::new(3, 2));

    assert!((pop.get(0).unwrap().x - 0.51).abs() < 1e-9);
    assert!((pop.get(1).unwrap().x - 0.53).abs() < 1e-9);
}
