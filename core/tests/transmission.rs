//! Virus model: transmission, budgets, resolution, hospital capacity.

use std::collections::BTreeMap;
use virussim_core::{
    config::SimConfig,
    engine::SimEngine,
    person::{HealthState, HospitalStatus, Person},
    population::Population,
    rng::SubsystemRng,
    virus_subsystem::VirusSubsystem,
};

/// Everyone stacked on the same spot, fully susceptible, no budget.
fn clustered(n: usize) -> Population {
    let persons = (0..n).map(|i| Person::healthy(i, 0.5, 0.5)).collect();
    Population::from_persons(persons).expect("population")
}

fn virus_config(population: usize) -> SimConfig {
    SimConfig {
        total_population: population,
        infection_range: 0.01, // half-width 0.1
        recovery_time: 100,
        healthcare_capacity_ratio: 0.0,
        ..SimConfig::default_test()
    }
}

fn infected_by(pop: &Population, infector: usize) -> usize {
    pop.persons()
        .iter()
        .filter(|p| p.infected_by == Some(infector) && p.id != infector)
        .count()
}

#[test]
fn transmission_budget_caps_secondary_cases() {
    const BUDGET: u32 = 3;
    let config = virus_config(20);
    let virus = VirusSubsystem::new(&config);
    let mut pop = clustered(20);
    pop.set_infected(0, 0, 0).unwrap();
    pop.get_mut(0).unwrap().transmission_budget = BUDGET;

    let mut rng = SubsystemRng::new(1, 3);
    virus.advance(&mut pop, 1, &mut rng).unwrap();
    assert_eq!(infected_by(&pop, 0), BUDGET as usize,
        "susceptibility 1.0 in range: every candidate is hit until the budget runs out");
    assert_eq!(pop.get(0).unwrap().transmission_budget, 0);

    // Later frames: plenty of eligible candidates left, but no budget.
    for frame in 2..10 {
        virus.advance(&mut pop, frame, &mut rng).unwrap();
    }
    assert_eq!(infected_by(&pop, 0), BUDGET as usize);
    assert_eq!(pop.count_by_state(HealthState::Infected), 1 + BUDGET as usize,
        "secondary cases have no budget of their own");
}

#[test]
fn exhausted_infector_does_not_stop_other_spreaders() {
    let config = virus_config(10);
    let virus = VirusSubsystem::new(&config);
    let mut pop = clustered(10);
    for id in 0..10 {
        pop.get_mut(id).unwrap().transmission_budget = 2;
    }
    pop.set_infected(0, 0, 0).unwrap();

    let mut rng = SubsystemRng::new(5, 3);
    for frame in 1..6 {
        virus.advance(&mut pop, frame, &mut rng).unwrap();
    }
    assert_eq!(infected_by(&pop, 0), 2);
    assert_eq!(pop.count_by_state(HealthState::Healthy), 0, "the chain should reach everyone");
    assert!(pop.persons().iter().all(|p| p.transmission_budget <= 2));
}

#[test]
fn newly_infected_do_not_transmit_in_the_same_frame() {
    let config = virus_config(3);
    let virus = VirusSubsystem::new(&config);
    let mut persons = vec![
        Person::healthy(0, 0.50, 0.5),
        Person::healthy(1, 0.55, 0.5),
        Person::healthy(2, 0.62, 0.5), // outside 0's box, inside 1's
    ];
    for p in &mut persons {
        p.transmission_budget = 5;
    }
    let mut pop = Population::from_persons(persons).unwrap();
    pop.set_infected(0, 0, 0).unwrap();

    let mut rng = SubsystemRng::new(9, 3);
    virus.advance(&mut pop, 1, &mut rng).unwrap();
    assert_eq!(pop.get(1).unwrap().current_state, HealthState::Infected);
    assert_eq!(pop.get(2).unwrap().current_state, HealthState::Healthy,
        "person 1 was infected this frame and must wait a frame to spread");

    virus.advance(&mut pop, 2, &mut rng).unwrap();
    assert_eq!(pop.get(2).unwrap().infected_by, Some(1));
    assert_eq!(pop.get(2).unwrap().infected_at_frame, Some(2));
}

#[test]
fn exposure_box_is_square_root_of_range() {
    // infection_range 0.01 -> half-width 0.1, not 0.01.
    let config = virus_config(3);
    let virus = VirusSubsystem::new(&config);
    let mut persons = vec![
        Person::healthy(0, 0.5, 0.5),
        Person::healthy(1, 0.59, 0.59),
        Person::healthy(2, 0.5, 0.61),
    ];
    persons[0].transmission_budget = 10;
    let mut pop = Population::from_persons(persons).unwrap();
    pop.set_infected(0, 0, 0).unwrap();

    virus.advance(&mut pop, 1, &mut SubsystemRng::new(2, 3)).unwrap();
    assert_eq!(pop.get(1).unwrap().current_state, HealthState::Infected, "corner of the box is in range");
    assert_eq!(pop.get(2).unwrap().current_state, HealthState::Healthy, "0.11 away is out of range");
}

#[test]
fn expired_infections_resolve_and_stop_spreading() {
    let config = SimConfig { recovery_time: 1, ..virus_config(5) };
    let virus = VirusSubsystem::new(&config);
    let mut pop = clustered(5);
    pop.set_infected(0, 0, 0).unwrap();
    pop.get_mut(0).unwrap().transmission_budget = 10;

    virus.advance(&mut pop, 1, &mut SubsystemRng::new(3, 3)).unwrap();
    let seed = pop.get(0).unwrap();
    assert!(seed.current_state.is_terminal(), "seed should resolve at recovery_time");
    assert_eq!(pop.count_by_state(HealthState::Healthy), 4,
        "a person resolving this frame does not transmit");
}

#[test]
fn social_distancers_are_never_exposed() {
    let config = virus_config(6);
    let virus = VirusSubsystem::new(&config);
    let mut pop = clustered(6);
    pop.set_infected(0, 0, 0).unwrap();
    pop.get_mut(0).unwrap().transmission_budget = 100;
    pop.enforce_social_distance(&[2, 4]).unwrap();

    let mut rng = SubsystemRng::new(4, 3);
    for frame in 1..20 {
        virus.advance(&mut pop, frame, &mut rng).unwrap();
    }
    assert_eq!(pop.get(2).unwrap().current_state, HealthState::Healthy);
    assert_eq!(pop.get(4).unwrap().current_state, HealthState::Healthy);
    assert_eq!(infected_by(&pop, 0), 3);
}

#[test]
fn perfect_masks_on_both_sides_block_transmission() {
    let config = SimConfig {
        mask_effectiveness: BTreeMap::from([("perfect".to_string(), 1.0)]),
        mask_type: "perfect".into(),
        ..virus_config(4)
    };
    let virus = VirusSubsystem::new(&config);
    let mut pop = clustered(4);
    pop.set_infected(0, 0, 0).unwrap();
    pop.get_mut(0).unwrap().transmission_budget = 10;
    pop.enforce_mask_wearing();

    let mut rng = SubsystemRng::new(8, 3);
    for frame in 1..10 {
        virus.advance(&mut pop, frame, &mut rng).unwrap();
    }
    assert_eq!(pop.count_by_state(HealthState::Healthy), 3);
}

#[test]
fn admissions_stop_at_capacity() {
    let config = SimConfig { healthcare_capacity_ratio: 30.0, ..virus_config(10) };
    let virus = VirusSubsystem::new(&config);
    assert_eq!(virus.total_healthcare_capacity(), 3);

    let mut pop = clustered(10);
    pop.set_infected(0, 0, 0).unwrap();
    pop.get_mut(0).unwrap().transmission_budget = 9;

    virus.advance(&mut pop, 1, &mut SubsystemRng::new(6, 3)).unwrap();
    assert_eq!(pop.count_by_state(HealthState::Infected), 10);
    assert_eq!(pop.hospitalized_count(), 3);
    let admitted: Vec<_> = pop.persons().iter().filter(|p| p.is_hospitalized()).map(|p| p.id).collect();
    assert_eq!(admitted, vec![1, 2, 3], "candidates are processed in id order");
}

// ── Scenario A: seed resolution at recovery_time ───────────────────

fn scenario_a_config(capacity_ratio: f64) -> SimConfig {
    SimConfig {
        total_population: 20,
        initial_infected: 1,
        recovery_time: 10,
        infection_range: 2.0,
        mortality_rate: BTreeMap::from([(0, 0.0)]),
        healthcare_capacity_ratio: capacity_ratio,
        ..SimConfig::default_test()
    }
}

fn seed_id(engine: &SimEngine) -> usize {
    engine.population().persons().iter().find(|p| p.is_seed()).expect("seed").id
}

#[test]
fn hospitalized_seed_with_zero_mortality_recovers_at_recovery_time() {
    let mut engine = SimEngine::build_test_with("scenario-a".into(), 31, scenario_a_config(10.0)).unwrap();
    let seed = seed_id(&engine);
    assert!(engine.population().get(seed).unwrap().is_hospitalized());

    engine.run_frames(10).unwrap(); // frames 0..=9
    assert_eq!(engine.population().get(seed).unwrap().current_state, HealthState::Infected);

    engine.step(10).unwrap();
    let p = engine.population().get(seed).unwrap();
    assert_eq!(p.current_state, HealthState::Recovered);
    assert_eq!(p.hospitalized, HospitalStatus::DiedHospitalized);
}

#[test]
fn untreated_seed_outcomes_match_expected_split() {
    const RUNS: u64 = 300;
    let mut deaths = 0;
    for seed in 0..RUNS {
        let mut engine =
            SimEngine::build_test_with(format!("scenario-a-stat-{seed}"), seed, scenario_a_config(0.0)).unwrap();
        let id = seed_id(&engine);
        engine.run_frames(11).unwrap(); // frames 0..=10
        match engine.population().get(id).unwrap().current_state {
            HealthState::Dead => deaths += 1,
            HealthState::Recovered => {}
            other => panic!("seed {id} should have resolved by frame 10, is {other:?}"),
        }
    }
    let observed = deaths as f64 / RUNS as f64;
    let expected = (0.2 - 0.001) / 0.999;
    assert!((observed - expected).abs() < 0.08,
        "untreated death rate {observed:.3}, expected ~{expected:.3}");
}

// ── Scenario C: no hospital capacity ───────────────────────────────

#[test]
fn zero_capacity_never_hospitalizes_anyone() {
    let config = SimConfig {
        total_population: 100,
        initial_infected: 3,
        recovery_time: 5,
        infection_range: 0.05,
        healthcare_capacity_ratio: 0.0,
        ..SimConfig::default_test()
    };
    let mut engine = SimEngine::build_test_with("scenario-c".into(), 77, config).unwrap();
    assert_eq!(engine.total_healthcare_capacity(), 0);

    for frame in 0..60 {
        engine.step(frame).unwrap();
        assert_eq!(engine.population().hospitalized_count(), 0, "frame {frame}");
    }
    assert!(engine
        .population()
        .persons()
        .iter()
        .all(|p| p.hospitalized == HospitalStatus::NotHospitalized));
    assert_eq!(engine.store.event_count_by_type(&engine.run_id, "person_hospitalized").unwrap(), 0);
    assert!(engine.population().count_by_state(HealthState::Dead)
        + engine.population().count_by_state(HealthState::Recovered) > 0,
        "some infections should have resolved through the untreated branch");
}
