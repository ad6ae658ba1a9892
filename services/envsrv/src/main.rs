//! Environmental sensor collector (`envsrv`)
//!
//! One process per physical sensor; readings go to the relay as UDP datagrams.

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use common::service_bootstrap::{self, ServiceInfo};
use common::ServiceArgs;
use envsrv::{CollectorArgs, CollectorConfig};

#[derive(Parser, Debug)]
#[command(name = "envsrv", version, about = "Environmental sensor collector")]
struct Args {
    #[command(flatten)]
    service: ServiceArgs,

    #[command(flatten)]
    collector: CollectorArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump raw sensor frames for manual inspection, then exit
    Probe {
        /// Number of acquisitions
        #[arg(long, default_value_t = 5)]
        count: u32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    service_bootstrap::load_development_env();
    let args = Args::parse();

    let service_info = ServiceInfo::new(
        "envsrv",
        "Environmental Sensor Collector - BH1750 / AHT10 over I2C",
        env!("CARGO_PKG_VERSION"),
    );
    service_bootstrap::init_logging(&service_info, &args.service)?;

    let config = CollectorConfig::from(args.collector);
    if !args.service.no_color {
        service_bootstrap::print_startup_banner(
            &service_info,
            &[
                ("Sensor", config.sensor.to_string()),
                ("Bus", config.bus_path.clone()),
                ("Relay", config.relay_endpoint()),
                ("Device ID", config.device_id()),
            ],
        );
    }

    if args.service.is_development() {
        debug!("Configuration: {:?}", config);
    }

    match args.command {
        Some(Command::Probe { count }) => envsrv::run_probe(&config, count).await?,
        None => envsrv::run_collector(&config).await?,
    }

    info!("envsrv exited cleanly");
    Ok(())
}
