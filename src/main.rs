use std::process;
use std::thread;
use clap::Parser;
use log::{error, info};
use crate::config::{load_config, Config};
use crate::logging::{setup_console_logger, setup_logger};
use crate::supervisor::{run_instance, Supervision, RESTART_DELAY};

mod classifier;
mod config;
mod errors;
mod logging;
mod manager_feishu;
mod manager_qweather;
mod models;
mod retry;
mod supervisor;
mod worker;

/// Pushes a daily weather digest and heavy rain alerts to a Feishu bot
#[derive(Debug, Parser)]
#[command(name = "weather-monitor", version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Send one test notification and exit
    #[arg(long)]
    test: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            if setup_console_logger().is_err() {
                eprintln!("Failed to set up console logging");
            }
            fatal_config(&cli.config, e);
        }
    };

    if let Err(e) = setup_logger(&config.general) {
        eprintln!("Failed to set up logging: {}", e);
        process::exit(1);
    }

    info!("weather-monitor version: {}", env!("CARGO_PKG_VERSION"));

    let mut next_config: Option<Config> = Some(config);
    loop {
        // Every restart starts over from a fresh configuration read
        let config = match next_config.take() {
            Some(c) => c,
            None => load_config(&cli.config).unwrap_or_else(|e| fatal_config(&cli.config, e)),
        };

        match run_instance(config, cli.test) {
            Supervision::Exit(code) => process::exit(code),
            Supervision::Restart => thread::sleep(RESTART_DELAY),
        }
    }
}

fn fatal_config(path: &str, e: impl std::fmt::Display) -> ! {
    error!("Fatal: unable to read or parse {}: {}", path, e);
    process::exit(1);
}
