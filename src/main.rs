use anyhow::{anyhow, Context};
use clap::{Arg, ArgAction, Command};
use colored::*;

use hostwatch::{
    config::WatchConfig,
    engine::HostWatch,
    network::{protocol::NetworkUtils, LivenessMethod},
    output::{OutputConfig, OutputFormat, OutputManager},
    targets::HostEntry,
};

fn build_cli() -> Command {
    Command::new("hostwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Continuously reports which hosts are up and which TCP ports they answer on")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file (default: ~/.hostwatch.toml)"),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run a single round, print it and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format: text or json")
                .default_value("text"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("SECONDS")
                .help("Override the refresh interval")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("method")
                .short('m')
                .long("method")
                .value_name("METHOD")
                .help("Liveness method: auto, icmp or system"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue),
        )
}

/// Watch this machine's own outbound address under the configured name
fn add_local_host(config: &mut WatchConfig) {
    let name = match config.local_host_name.clone() {
        Some(name) => name,
        None => return,
    };

    match NetworkUtils::get_local_ip() {
        Ok(ip) => {
            let address = ip.to_string();
            if config.hosts.iter().any(|h| h.address == address) {
                log::debug!("Local address {} already configured", address);
            } else {
                config.hosts.push(HostEntry::new(address, name));
            }
        }
        Err(e) => log::warn!("Could not determine local address for '{}': {}", name, e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => WatchConfig::from_toml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => WatchConfig::load_default_config(),
    };

    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config.refresh_interval_secs = interval;
    }
    if let Some(method) = matches.get_one::<String>("method") {
        config.liveness_method = method.parse::<LivenessMethod>().map_err(|e| anyhow!(e))?;
    }

    let format = matches
        .get_one::<String>("format")
        .map(|f| f.parse::<OutputFormat>())
        .transpose()
        .map_err(|e| anyhow!(e))?
        .unwrap_or(OutputFormat::Text);
    let use_color = !matches.get_flag("no-color") && format == OutputFormat::Text;
    if !use_color {
        colored::control::set_override(false);
    }

    add_local_host(&mut config);

    let watch = HostWatch::new(config).await.context("failed to start hostwatch")?;
    let output = OutputManager::new(OutputConfig { format, colored: use_color });

    if matches.get_flag("once") {
        let snapshot = watch.refresh_once().await.context("refresh round failed")?;
        output.write_snapshot(&snapshot)?;
        return Ok(());
    }

    let token = watch.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "[~] Shutting down...".bright_blue());
            token.cancel();
        }
    });

    watch
        .run(move |snapshot| {
            if let Err(e) = output.write_snapshot(&snapshot) {
                log::error!("Failed to write snapshot: {}", e);
            }
        })
        .await;

    Ok(())
}
