use std::{error::Error, path::PathBuf, sync::Arc};

use structopt::StructOpt;
use tracing::{error, info, trace};

use occupancy_watch::{
    capture::CapturePipeline, config, processing::ProcessingSupervisor, store::MemoryStore,
};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "occupancy_watch",
    about = "Periodic camera occupancy detection with threshold alerts."
)]
struct CliArgs {
    #[structopt(
        parse(from_os_str),
        short = "c",
        long = "config",
        default_value = "config.toml",
        help = "Path to configuration file. See sample_config.toml for format.",
        env = "OCCUPANCY_WATCH_CONFIG"
    )]
    config: PathBuf,
}

fn init_logging(system: &config::ConfigSystem) -> Result<(), Box<dyn Error>> {
    let filter = tracing_subscriber::EnvFilter::new(&system.log_level);
    if system.json_logs {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::from_args();
    let cfg = config::load_config(&args.config)?;
    init_logging(&cfg.system)?;

    info!("Occupancy watch running");
    trace!("Config: {:?}", cfg);

    let store = Arc::new(MemoryStore::with_data(
        cfg.camera.iter().map(|c| c.to_camera()).collect(),
        cfg.alert.iter().map(|a| a.to_rule()).collect(),
    ));
    let pipeline = CapturePipeline::from_config(&cfg.processing);
    let supervisor = ProcessingSupervisor::new(store, pipeline, &cfg.processing);

    match supervisor.start_all_cameras().await {
        Ok(started) => info!(started, "Cameras scheduled"),
        Err(e) => error!(error = %e, "Continuous processing could not start"),
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    supervisor.stop_all_cameras().await;
    Ok(())
}
