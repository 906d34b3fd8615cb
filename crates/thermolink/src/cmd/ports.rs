use thermolink_discover::score_port;
use thermolink_port::list_ports;

use crate::cmd::PortsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{self, OutputFormat, ScoredPort};

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let mut scored: Vec<ScoredPort> = list_ports()
        .iter()
        .map(|info| {
            let score = score_port(info);
            ScoredPort::new(info, score.score, score.rationale)
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
    output::print_ports(&scored, format);
    Ok(SUCCESS)
}
