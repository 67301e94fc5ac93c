//! # velocity_cu
//!
//! Runs the PI velocity control loop against the bundled simulation rig:
//! loads the TOML config, builds the shared parameter table, registers
//! the periodic timer, spawns the control thread, and shuts it down
//! cleanly on ctrl-c. The drained step-response capture is written as
//! JSON at exit.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use velocity_cu::config::load_config;
use velocity_cu::cycle::ControlLoop;
use velocity_cu::hal::sim::MotorSim;
use velocity_cu::hal::{CancelToken, SoftTimer};
use velocity_cu::params::{ParameterTable, TableDefaults, PARAMS};
use velocity_cu::persist::JsonFileSink;

/// PI velocity control loop for a DC motor
#[derive(Parser, Debug)]
#[command(name = "velocity_cu")]
#[command(version)]
#[command(about = "Real-time PI velocity control loop")]
struct Args {
    /// Path to the loop configuration TOML.
    #[arg(default_value = "config/velocity.toml")]
    config: PathBuf,

    /// Where to write the step-response capture at shutdown.
    #[arg(long, default_value = "capture.json")]
    capture: PathBuf,

    /// Simulated motor gain [counts per volt per tick].
    #[arg(long, default_value_t = 2.0)]
    sim_gain: f64,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("velocity_cu v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("velocity_cu shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    info!(
        "Config OK: period={}ms, Kp={}, Ki={}, range=[{}, {}]V",
        config.period_ms, config.kp, config.ki, config.v_min, config.v_max
    );

    let table = Arc::new(ParameterTable::new(TableDefaults {
        reference_rpm: config.reference_rpm,
        kp: config.kp,
        ki: config.ki,
        period_ms: config.period_ms,
    }));
    for p in PARAMS {
        info!(
            "  {:<14} {:>10.3}  [{}]",
            table.label(p),
            table.get(p),
            if table.is_editable(p) { "edit" } else { "show" }
        );
    }

    let rig = MotorSim::new(args.sim_gain);
    let timer = SoftTimer::register((config.period_ms * 1e3) as u32)?;
    let sink = JsonFileSink::new(&args.capture);

    let cu = ControlLoop::new(
        &config,
        Arc::clone(&table),
        timer,
        rig.encoder(),
        rig.dac(),
        Box::new(sink),
    )?;

    let cancel = CancelToken::new();
    let handle = cu.spawn(cancel.clone())?;
    info!("control loop spawned, ctrl-c to stop");

    ctrlc::set_handler(move || {
        info!("shutdown signal received");
        cancel.cancel();
    })?;

    let stats = handle.join()?;
    info!(
        "capture written to {} ({} ticks, max tick {}ns, {} overruns)",
        args.capture.display(),
        stats.tick_count,
        stats.max_tick_ns,
        stats.overruns
    );

    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
