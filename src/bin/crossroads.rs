//! crossroads binary.
//!
//! Runs the four-lane intersection for the configured window and logs every
//! lane entering and leaving. Ctrl-C ends the run early; lanes still finish
//! the crossing they are in.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin crossroads
//! cargo run --bin crossroads -- --duration-ms 500 --json
//! # fault injection: no locks, expect collisions and a failing exit
//! cargo run --bin crossroads -- --discipline unlocked --strict
//! ```

use anyhow::Context;

use crossroads::cli::{self, CliCommand, USAGE};
use crossroads::config::SimulationConfig;
use crossroads::simulation::Simulation;
use crossroads::telemetry;

fn main() -> anyhow::Result<()> {
    let options = match cli::parse_args(std::env::args().skip(1))? {
        CliCommand::Help => {
            println!("{USAGE}");
            return Ok(());
        }
        CliCommand::Version => {
            println!("crossroads {}", crossroads::VERSION);
            return Ok(());
        }
        CliCommand::Run(options) => options,
    };

    telemetry::init_tracing();

    let mut config = match &options.config_path {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    config.apply_env()?;
    options.apply(&mut config);

    let simulation = Simulation::new(config)?;
    let stop = simulation.stop_handle();
    ctrlc::set_handler(move || {
        if stop.stop() {
            tracing::warn!("interrupted; stopping after in-flight crossings");
        }
    })
    .context("failed to install Ctrl-C handler")?;

    let report = simulation.run().context("simulation failed")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for lane in &report.lanes {
            tracing::info!(
                lane = %lane.lane,
                crossings = lane.crossings,
                collisions = lane.collisions,
                "lane summary"
            );
        }
    }

    if simulation.config().strict {
        report.ensure_clean()?;
    }
    Ok(())
}
