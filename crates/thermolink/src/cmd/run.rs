use std::time::Duration;

use thermolink_acquire::{AcquireConfig, DataloggerConfig, Supervisor};
use thermolink_discover::auto_detect;
use thermolink_port::{DriverConfig, PortSettings};
use tracing::{info, warn};

use crate::cmd::RunArgs;
use crate::exit::{acquire_error, discover_error, io_error, CliResult, SUCCESS};
use crate::output::{self, OutputFormat};

pub async fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    if let Some(path) = &args.write_example {
        AcquireConfig::example()
            .save(path)
            .map_err(|err| acquire_error("writing example config", err))?;
        println!("wrote example config to {}", path.display());
        return Ok(SUCCESS);
    }

    let config = resolve_config(&args).await?;
    let supervisor = Supervisor::start(config, PortSettings::default(), DriverConfig::default())
        .await
        .map_err(|err| acquire_error("starting acquisition", err))?;
    info!(workers = supervisor.worker_count(), "acquisition running");

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    ticker.tick().await; // the immediate first tick
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|err| io_error("waiting for ctrl-c", err))?;
                info!("shutting down");
                break;
            }
            _ = ticker.tick() => {
                output::print_snapshot(&supervisor.snapshot(), format);
            }
        }
    }
    supervisor.shutdown().await;
    Ok(SUCCESS)
}

/// Load the config file when given and valid, otherwise fall back to
/// auto-detection.
async fn resolve_config(args: &RunArgs) -> CliResult<AcquireConfig> {
    if let Some(path) = &args.config {
        match AcquireConfig::load(path) {
            Ok(config) => return Ok(config),
            Err(err) => {
                warn!(path = %path.display(), %err, "config unusable, auto-detecting");
            }
        }
    }
    let budget = Duration::from_secs(args.budget);
    let found = auto_detect(budget)
        .await
        .map_err(|err| discover_error("auto-detecting dataloggers", err))?;

    let mut config = AcquireConfig::default();
    for (i, detected) in found.into_iter().enumerate() {
        let number = i + 1;
        info!(
            device = %detected.path.display(),
            channels = detected.channels.len(),
            "using auto-detected datalogger"
        );
        config.dataloggers.push(DataloggerConfig {
            id: format!("logger-{number}"),
            name: format!("Datalogger {number}"),
            device: detected.path,
            channels: Vec::new(),
            auto_detected: true,
        });
    }
    Ok(config)
}
