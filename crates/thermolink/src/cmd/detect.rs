use std::time::Duration;

use thermolink_discover::auto_detect;

use crate::cmd::DetectArgs;
use crate::exit::{discover_error, CliResult, SUCCESS};
use crate::output::{self, OutputFormat};

pub async fn run(args: DetectArgs, format: OutputFormat) -> CliResult<i32> {
    let found = auto_detect(Duration::from_secs(args.budget))
        .await
        .map_err(|err| discover_error("detecting dataloggers", err))?;
    output::print_detected(&found, format);
    Ok(SUCCESS)
}
