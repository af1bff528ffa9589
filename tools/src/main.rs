//! sim-runner: headless runner for the VirusSim engine.
//!
//! Usage:
//!   sim-runner --seed 12345 --frames 1000 --db run.db --config data/config.json
//!   sim-runner --seed 12345 --ipc-mode
//!   sim-runner --frames 500 --trace-out trace.json

use anyhow::Result;
use virussim_core::{
    config::SimConfig,
    engine::SimEngine,
    policy_subsystem::PolicyState,
    stats::{FrameStats, PositionViews, TimeSeriesPoint},
    store::SimStore,
    trace::{self, TraceNode},
    types::{new_run_id, Frame},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Step { frame: Frame },
    Run { count: u64 },
    Trace,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    frame: Option<Frame>,
    population: usize,
    total_healthcare_capacity: usize,
    stats: FrameStats,
    healthcare_status: &'static str,
    policy: Option<PolicyState>,
    positions: PositionViews,
    time_series: Vec<TimeSeriesPoint>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let frames = parse_arg(&args, "--frames", 1000u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let config_path = string_arg(&args, "--config");
    let trace_out = string_arg(&args, "--trace-out");

    let config = match config_path {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if !ipc_mode {
        println!("VirusSim sim-runner");
        println!("  seed:       {seed}");
        println!("  frames:     {frames}");
        println!("  db:         {db}");
        println!("  config:     {}", config_path.unwrap_or("(defaults)"));
        println!("  population: {}", config.total_population);
        println!();
    }

    let store = if db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(db)?
    };
    store.migrate()?;

    let run_id = new_run_id(seed);
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"), config.total_population)?;

    let mut engine = SimEngine::build(run_id.clone(), seed, config, store)?;

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        engine.run_frames(frames)?;
        print_summary(&engine)?;
    }

    engine.save_transmission_tree()?;
    if let Some(path) = trace_out {
        let nodes = engine.transmission_tree();
        std::fs::write(path, serde_json::to_string_pretty(&nodes)?)?;
        log::info!("wrote {} trace node(s) to {path}", nodes.len());
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Unknown command: {}", buffer.trim());
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Step { frame } => {
                // A rejected frame is reported, not fatal: the caller drives the clock.
                if let Err(e) = engine.step(frame) {
                    let err_json = serde_json::json!({ "error": e.to_string() });
                    writeln!(stdout, "{}", err_json)?;
                } else {
                    writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
                }
            }
            IpcCommand::Run { count } => {
                engine.run_frames(count)?;
                writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
            }
            IpcCommand::GetState => {
                writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
            }
            IpcCommand::Trace => {
                let nodes: Vec<TraceNode> = engine.transmission_tree();
                writeln!(stdout, "{}", serde_json::to_string(&nodes)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn build_ui_state(engine: &SimEngine) -> UiState {
    let stats = engine.current_stats();
    UiState {
        frame: engine.clock.last_frame,
        population: engine.population().len(),
        total_healthcare_capacity: engine.total_healthcare_capacity(),
        healthcare_status: stats.healthcare_status.label(),
        stats,
        policy: engine.policy_state().cloned(),
        positions: engine.positions(),
        time_series: engine.time_series(),
    }
}

fn print_summary(engine: &SimEngine) -> Result<()> {
    let stats = engine.current_stats();
    let size = engine.population().len() as f64;
    let pct = |n: usize| n as f64 * 100.0 / size;
    let peak = engine
        .history()
        .iter()
        .max_by_key(|s| s.infected)
        .map(|s| (s.frame, s.infected))
        .unwrap_or((0, 0));

    println!("=== RUN SUMMARY ===");
    println!("  run_id:              {}", engine.run_id);
    println!("  final frame:         {}", engine.clock.last_frame.unwrap_or(0));
    println!("  healthy:             {} ({:.1}%)", stats.healthy, pct(stats.healthy));
    println!("  currently infected:  {}", stats.infected);
    println!("  recovered:           {} ({:.1}%)", stats.recovered, pct(stats.recovered));
    println!("  dead:                {} ({:.1}%)", stats.dead, pct(stats.dead));
    println!("  total infected:      {}", stats.cumulative_infected);
    println!("  peak infected:       {} at frame {}", peak.1, peak.0);
    println!("  hospital capacity:   {}", engine.total_healthcare_capacity());
    println!("  healthcare status:   {}", stats.healthcare_status.label());

    if let Some(policy) = engine.policy_state() {
        println!("  social distancing:   {:?}", policy.social_distancing);
        println!("  mask mandate:        {:?}", policy.mask_mandate);
    }

    println!();
    println!("=== TRANSMISSION TREE ===");
    let nodes = engine.transmission_tree();
    for (kind, count) in trace::state_breakdown(&nodes) {
        println!("  {kind:<20} {count}");
    }
    let spreaders = trace::secondary_cases(&nodes);
    if let Some((id, cases)) = spreaders.iter().max_by_key(|(_, c)| **c) {
        println!("  top spreader:        person {id} ({cases} direct cases)");
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
