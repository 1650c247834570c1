// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `cubewatch`: reports whether a Minecraft server is up and who is on it.

mod config;
mod error;
mod logging;
mod monitor;
mod presenter;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use serde::Serialize;
use status_probe::{Comparator, ProbeConfig, ProbeTarget, ProtocolVariant, StatusProber};
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, Overrides};
use crate::error::AppError;

#[derive(Parser, Debug)]
#[command(author, version, about = "Minecraft server status checker")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(long, value_name = "FILE", env = "CUBEWATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Server to check, as host or host:port
    #[arg(long, value_name = "ADDR", env = "JAVA_ADDRESS", global = true)]
    server: Option<String>,

    /// Server port
    #[arg(long, env = "PORT", global = true)]
    port: Option<u16>,

    /// Protocol edition: java, bedrock or legacy
    #[arg(long, env = "CUBEWATCH_EDITION", global = true)]
    edition: Option<ProtocolVariant>,

    /// Overall probe timeout in seconds
    #[arg(long, value_name = "SECS", env = "CUBEWATCH_TIMEOUT", global = true)]
    timeout: Option<u64>,

    /// Append log records to this file
    #[arg(long, value_name = "FILE", env = "CUBEWATCH_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check how many players are online
    Player,
    /// Check if the server is online
    Status,
    /// Check the server against a public test server to locate a failure
    Test,
    /// Print the server status periodically until interrupted
    Watch {
        /// Seconds between probes
        #[arg(long, value_name = "SECS", env = "CUBEWATCH_INTERVAL")]
        interval: Option<u64>,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            server: self.server.clone(),
            port: self.port,
            edition: self.edition,
            timeout_secs: self.timeout,
            log_file: self.log_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cubewatch: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply(cli.overrides());
    logging::init(config.log_file.as_deref())?;

    if cli.config.is_none() {
        if let Ok(path) = AppConfig::get_config_path() {
            debug!("Using configuration at {}", path.display());
        }
    }

    let primary = config.primary.target()?;
    let prober = StatusProber::new(ProbeConfig {
        connect_timeout: config.connect_timeout(),
        ..ProbeConfig::default()
    });
    let timeout = config.timeout();

    match cli.command {
        Command::Player => {
            let result = prober.probe(&primary, timeout).await;
            let message = if cli.json {
                to_json(&result)?
            } else {
                presenter::player_message(&result, &mut rand::rng())
            };
            report("player", &message);
        }
        Command::Status => {
            let result = prober.probe(&primary, timeout).await;
            let message = if cli.json {
                to_json(&result)?
            } else {
                presenter::status_message(&result, &mut rand::rng())
            };
            report("status", &message);
        }
        Command::Test => {
            let reference = config.reference.target()?;
            let verdict = Comparator::new(prober)
                .compare(&primary, &reference, timeout)
                .await;
            let message = if cli.json {
                to_json(&verdict)?
            } else {
                presenter::test_message(&verdict)
            };
            report("test", &message);
        }
        Command::Watch { interval } => {
            let period = interval.map_or_else(|| config.watch_interval(), |secs| {
                Duration::from_secs(secs.max(1))
            });
            watch(&prober, &primary, timeout, period, cli.json).await;
        }
    }

    Ok(())
}

async fn watch(
    prober: &StatusProber,
    target: &ProbeTarget,
    timeout: Duration,
    period: Duration,
    json: bool,
) {
    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    info!("Watching {target} every {}s", period.as_secs());
    let completed = monitor::watch(prober, target, timeout, period, cancel_token, |result| {
        if !json {
            println!("{}", presenter::status_line(result));
            return;
        }
        match serde_json::to_string(result) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Cannot encode result: {e}"),
        }
    })
    .await;
    info!("Stopped watching {target} after {completed} probe(s)");
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Print a command's answer and record it in the log.
fn report(command: &str, message: &str) {
    info!("/{command}: {message}");
    println!("{message}");
}
