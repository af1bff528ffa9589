//! The simulation engine: drives one frame at a time.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Policy subsystem    (social distancing, mask mandate latches)
//!   2. Movement subsystem  (positions, headings)
//!   3. Virus subsystem     (resolution, transmission, admissions)
//!   4. Engine bookkeeping  (invariants, aggregates, persistence)
//!
//! RULES:
//!   - Subsystems execute in registration order, every frame.
//!   - Only the engine owns the Population; subsystems borrow it per call.
//!   - All randomness flows through the RngBank.
//!   - All state changes are recorded in the event log.

use crate::{
    clock::SimClock,
    config::SimConfig,
    error::SimResult,
    event::{EventLogEntry, SimEvent},
    movement_subsystem::MovementSubsystem,
    policy_subsystem::{PolicyState, PolicySubsystem},
    population::Population,
    rng::{RngBank, SubsystemSlot},
    snapshot::{SimSnapshot, SNAPSHOT_INTERVAL},
    stats::{FrameStats, PositionViews, TimeSeriesPoint},
    store::SimStore,
    subsystem::SimSubsystem,
    trace::{self, TraceNode},
    types::{Frame, RunId},
    virus_subsystem::VirusSubsystem,
};

pub struct SimEngine {
    pub run_id:     RunId,
    pub clock:      SimClock,
    pub rng_bank:   RngBank,
    pub store:      SimStore,
    seed:           u64,
    config:         SimConfig,
    population:     Population,
    subsystems:     Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    history:        Vec<FrameStats>,
    last_events:    Vec<SimEvent>,
}

impl SimEngine {
    /// Validate the config and draw the initial population.
    /// No subsystems are registered; see build().
    pub fn new(run_id: RunId, seed: u64, config: SimConfig, store: SimStore) -> SimResult<Self> {
        config.validate()?;
        let rng_bank = RngBank::new(seed);
        let mut rng = rng_bank.for_subsystem_at_frame(SubsystemSlot::Population, 0);
        let population = Population::generate(&config, &mut rng)?;

        Ok(Self {
            clock:       SimClock::new(run_id.clone()),
            rng_bank,
            store,
            seed,
            config,
            population,
            subsystems:  Vec::new(),
            history:     Vec::new(),
            last_events: Vec::new(),
            run_id,
        })
    }

    /// Build a fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId, seed: u64, config: SimConfig, store: SimStore) -> SimResult<Self> {
        let mut engine = SimEngine::new(run_id, seed, config, store)?;

        // EXECUTION ORDER is fixed. Never reorder.
        let policy = PolicySubsystem::new(&engine.config);
        let movement = MovementSubsystem::new(&engine.config);
        let virus = VirusSubsystem::new(&engine.config);
        engine.register(SubsystemSlot::Policy, Box::new(policy));
        engine.register(SubsystemSlot::Movement, Box::new(movement));
        engine.register(SubsystemSlot::Virus, Box::new(virus));
        Ok(engine)
    }

    /// In-memory store, SimConfig::default_test().
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        Self::build_test_with(run_id, seed, SimConfig::default_test())
    }

    /// In-memory store with a caller-supplied config.
    pub fn build_test_with(run_id: RunId, seed: u64, config: SimConfig) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"), config.total_population)?;
        Self::build(run_id, seed, config, store)
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push((slot, subsystem));
    }

    /// Advance one frame. This is the core simulation step.
    /// Frames must strictly increase across calls; gaps are allowed.
    pub fn step(&mut self, frame: Frame) -> SimResult<FrameStats> {
        let first_frame = self.clock.last_frame.is_none();
        self.clock.observe(frame)?;

        if first_frame {
            let init_event = SimEvent::RunInitialized {
                run_id:     self.run_id.clone(),
                seed:       self.seed,
                population: self.population.len(),
            };
            self.persist_event(frame, "engine", &init_event)?;
        }

        let mut frame_events = vec![SimEvent::FrameStarted { frame }];

        for (slot, subsystem) in &mut self.subsystems {
            let mut rng = self.rng_bank.for_subsystem_at_frame(*slot, frame);
            let new_events = subsystem.update(frame, &mut self.population, &mut rng)?;

            for event in &new_events {
                let entry = EventLogEntry {
                    id:         None,
                    run_id:     self.run_id.clone(),
                    frame,
                    subsystem:  subsystem.name().to_string(),
                    event_type: event.type_name().to_string(),
                    payload:    serde_json::to_string(event)?,
                };
                self.store.append_event(&entry)?;
            }

            frame_events.extend(new_events);
        }

        let capacity = self.total_healthcare_capacity();
        self.population.check_invariants(self.config.total_population, capacity)?;

        let stats = FrameStats::collect(frame, &self.population, capacity);
        self.store.insert_frame_stats(&self.run_id, &stats)?;
        self.history.push(stats.clone());

        frame_events.push(SimEvent::FrameCompleted { frame });
        self.last_events = frame_events;

        if frame % SNAPSHOT_INTERVAL == 0 {
            self.take_snapshot(frame)?;
        }

        log::debug!(
            "frame={frame} engine: healthy={} infected={} recovered={} dead={} hospitalized={} status={}",
            stats.healthy,
            stats.infected,
            stats.recovered,
            stats.dead,
            stats.hospitalized,
            stats.healthcare_status.label()
        );
        Ok(stats)
    }

    /// Step the next n frames in a loop. Used for testing and fast-forward.
    pub fn run_frames(&mut self, n: u64) -> SimResult<()> {
        self.clock.resume();
        for _ in 0..n {
            let frame = self.clock.next_frame();
            self.step(frame)?;
        }
        self.clock.pause();
        Ok(())
    }

    // ── Read-only views for the presentation layer ─────────────

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Mutable table access for scenario setup and tooling.
    /// Production code goes through step().
    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn total_healthcare_capacity(&self) -> usize {
        self.config.total_healthcare_capacity()
    }

    /// Aggregates for the current table without stepping.
    pub fn current_stats(&self) -> FrameStats {
        let frame = self.clock.last_frame.unwrap_or(0);
        FrameStats::collect(frame, &self.population, self.total_healthcare_capacity())
    }

    /// Stats of every stepped frame, in order.
    pub fn history(&self) -> &[FrameStats] {
        &self.history
    }

    pub fn time_series(&self) -> Vec<TimeSeriesPoint> {
        self.history.iter().map(FrameStats::time_series_point).collect()
    }

    pub fn positions(&self) -> PositionViews {
        PositionViews::collect(&self.population)
    }

    pub fn transmission_tree(&self) -> Vec<TraceNode> {
        trace::transmission_tree(&self.population)
    }

    /// Events emitted while stepping the most recent frame.
    pub fn last_frame_events(&self) -> &[SimEvent] {
        &self.last_events
    }

    /// Query the PolicySubsystem's latch state.
    pub fn policy_state(&self) -> Option<&PolicyState> {
        self.subsystems.iter().find_map(|(_, sub)| {
            sub.as_any()
                .downcast_ref::<PolicySubsystem>()
                .map(|p| &p.state)
        })
    }

    /// Query events for a specific frame from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_frame(&self, frame: Frame) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_frame(&self.run_id, frame)
    }

    /// Persist the current transmission tree.
    pub fn save_transmission_tree(&self) -> SimResult<()> {
        self.store.save_transmission_tree(&self.run_id, &self.transmission_tree())
    }

    fn persist_event(&self, frame: Frame, subsystem: &str, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            frame,
            subsystem:  subsystem.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    fn take_snapshot(&self, frame: Frame) -> SimResult<()> {
        let snapshot = SimSnapshot {
            run_id:  self.run_id.clone(),
            frame,
            clock:   self.clock.clone(),
            policy:  self.policy_state().cloned(),
            persons: self.population.persons().to_vec(),
        };
        let json = serde_json::to_string(&snapshot)?;
        self.store.save_snapshot(&self.run_id, frame, &json)?;
        log::debug!("Snapshot saved at frame {frame}");
        Ok(())
    }
}
