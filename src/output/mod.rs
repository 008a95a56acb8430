//! Output formatting for snapshots

use crate::snapshot::{HostRecord, LivenessStatus, Snapshot};
use chrono::Local;
use colored::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            colored: true,
        }
    }
}

/// Main output manager
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Write one snapshot to stdout
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> io::Result<()> {
        let output = match self.config.format {
            OutputFormat::Text => render_text(snapshot, self.config.colored),
            OutputFormat::Json => render_json(snapshot)?,
        };

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(output.as_bytes())?;
        handle.flush()
    }
}

/// Timestamp header plus a liveness table and a responsive-ports table
pub fn render_text(snapshot: &Snapshot, colored: bool) -> String {
    let mut output = String::new();
    let updated = snapshot.taken_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");

    output.push_str(&paint(&format!("Updated: {}\n\n", updated), colored, |s| s.bold()));

    let host_width = column_width(snapshot.records.iter().map(|r| r.name.as_str()), "host");
    let ip_width = column_width(snapshot.records.iter().map(|r| r.address.as_str()), "ip_address");

    output.push_str(&paint("Host Ping Responses\n", colored, |s| s.bright_cyan().bold()));
    output.push_str(&format!(
        "{:<hw$}  {:<iw$}  {}\n",
        "host",
        "ip_address",
        "ping_response",
        hw = host_width,
        iw = ip_width
    ));
    for record in &snapshot.records {
        let status = match record.status {
            LivenessStatus::Online => paint("online", colored, |s| s.bright_green()),
            LivenessStatus::Offline => paint("offline", colored, |s| s.bright_red()),
        };
        output.push_str(&format!(
            "{:<hw$}  {:<iw$}  {}{}\n",
            record.name,
            record.address,
            status,
            error_note(record),
            hw = host_width,
            iw = ip_width
        ));
    }
    output.push('\n');

    output.push_str(&paint(
        &format!("Hosts Responding On Ports: {:?}\n", snapshot.ports),
        colored,
        |s| s.bright_cyan().bold(),
    ));
    output.push_str(&format!(
        "{:<hw$}  {:<iw$}  {}\n",
        "host",
        "ip_address",
        "responsive_ports",
        hw = host_width,
        iw = ip_width
    ));
    for record in &snapshot.records {
        let ports = record
            .responsive_ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!(
            "{:<hw$}  {:<iw$}  {}\n",
            record.name,
            record.address,
            ports,
            hw = host_width,
            iw = ip_width
        ));
    }

    output
}

/// Pretty-printed JSON
pub fn render_json(snapshot: &Snapshot) -> io::Result<String> {
    let mut json = serde_json::to_string_pretty(snapshot)?;
    json.push('\n');
    Ok(json)
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values.map(str::len).chain(std::iter::once(header.len())).max().unwrap_or(0)
}

fn error_note(record: &HostRecord) -> String {
    match &record.error {
        Some(reason) => format!(" ({})", reason),
        None => String::new(),
    }
}

fn paint(text: &str, colored: bool, style: impl Fn(&str) -> ColoredString) -> String {
    if colored {
        style(text).to_string()
    } else {
        text.to_string()
    }
}
