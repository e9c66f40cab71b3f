// bin/simulation_main.rs

use std::path::Path;
use std::process::ExitCode;
use traffic_signal_network::control_system::update_loop::{shared, TickDriver};
use traffic_signal_network::monitoring::traffic_monitoring_system::{run_cli, TraceWriter};
use traffic_signal_network::{Result, SimulationConfig, TrafficStore};

async fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(Path::new(&path))?,
        None => SimulationConfig::default(),
    };

    let store = shared(TrafficStore::from_config(&config)?);
    let mut driver = TickDriver::new(store.clone(), config.tick_period());
    if let Some(path) = &config.trace_csv {
        driver = driver.with_observer(TraceWriter::create(path)?);
        log::info!("Writing tick trace to {}", path.display());
    }

    driver.start();
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = run_cli(store, stdin, tokio::io::stdout()).await;
    driver.stop().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
