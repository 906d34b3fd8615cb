use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use thermolink_acquire::ChannelSnapshot;
use thermolink_discover::Detected;
use thermolink_port::PortInfo;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_snapshot(rows: &[ChannelSnapshot], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "LOGGER", "CH", "NAME", "TYPE", "TEMP", "STATUS", "AGE", "SAMPLES",
                ]);
            for row in rows {
                table.add_row(vec![
                    row.logger_id.clone(),
                    row.channel_number.to_string(),
                    row.display_name.clone(),
                    row.thermocouple_type.clone(),
                    format!("{:.1} {}", row.temperature, row.unit),
                    status(row).to_string(),
                    age(row),
                    row.sample_count.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "{}/{} ({}) type={} temp={:.1}{} status={} age={} samples={}",
                    row.logger_id,
                    row.channel_number,
                    row.display_name,
                    row.thermocouple_type,
                    row.temperature,
                    row.unit,
                    status(row),
                    age(row),
                    row.sample_count
                );
            }
        }
    }
}

fn status(row: &ChannelSnapshot) -> &'static str {
    if row.connected {
        "connected"
    } else if row.age_secs.is_none() {
        "never"
    } else {
        "stale"
    }
}

fn age(row: &ChannelSnapshot) -> String {
    match row.age_secs {
        Some(secs) => format!("{secs}s"),
        None => "-".to_string(),
    }
}

#[derive(Serialize)]
struct DetectedOutput<'a> {
    path: String,
    score: i32,
    rationale: &'a str,
    channels: Vec<DetectedChannel>,
}

#[derive(Serialize)]
struct DetectedChannel {
    channel: u8,
    temperature: f64,
    unit: String,
}

pub fn print_detected(found: &[Detected], format: OutputFormat) {
    let rows: Vec<DetectedOutput<'_>> = found
        .iter()
        .map(|d| DetectedOutput {
            path: d.path.display().to_string(),
            score: d.score,
            rationale: &d.rationale,
            channels: d
                .channels
                .iter()
                .map(|c| DetectedChannel {
                    channel: c.code.number(),
                    temperature: c.temperature,
                    unit: c.unit.to_string(),
                })
                .collect(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "SCORE", "CHANNELS", "RATIONALE"]);
            for row in &rows {
                let channels = row
                    .channels
                    .iter()
                    .map(|c| format!("{}={:.1}{}", c.channel, c.temperature, c.unit))
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(vec![
                    row.path.clone(),
                    row.score.to_string(),
                    channels,
                    row.rationale.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "{} score={} channels={} ({})",
                    row.path,
                    row.score,
                    row.channels.len(),
                    row.rationale
                );
            }
        }
    }
}

#[derive(Serialize)]
pub struct ScoredPort {
    pub path: String,
    pub vendor_id: Option<String>,
    pub manufacturer: Option<String>,
    pub score: i32,
    pub rationale: String,
}

impl ScoredPort {
    pub fn new(info: &PortInfo, score: i32, rationale: String) -> Self {
        Self {
            path: info.path.display().to_string(),
            vendor_id: info.vendor_id.clone(),
            manufacturer: info.manufacturer.clone(),
            score,
            rationale,
        }
    }
}

pub fn print_ports(ports: &[ScoredPort], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ports),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "VENDOR", "MANUFACTURER", "SCORE", "RATIONALE"]);
            for port in ports {
                table.add_row(vec![
                    port.path.clone(),
                    port.vendor_id.clone().unwrap_or_else(|| "-".to_string()),
                    port.manufacturer
                        .clone()
                        .unwrap_or_else(|| "-".to_string()),
                    port.score.to_string(),
                    port.rationale.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                println!(
                    "{} vendor={} score={} ({})",
                    port.path,
                    port.vendor_id.as_deref().unwrap_or("-"),
                    port.score,
                    port.rationale
                );
            }
        }
    }
}
