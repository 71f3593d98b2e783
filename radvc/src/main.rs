// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Admin client for the Router Advertisement daemon: push a new
//! configuration, or show the per-interface status as a table, JSON, or
//! YAML.

use clap::{Parser, Subcommand, ValueEnum};
use radv::{Config, Status};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "radvc")]
#[command(version)]
#[command(about = "Admin client for the RA daemon", long_about = None)]
struct CmdArgs {
    /// Base URL of the daemon's admin API
    #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:8888")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Push a configuration file to the running daemon
    Reload {
        /// Configuration file (YAML)
        #[arg(short = 'f', long, value_name = "PATH")]
        config: PathBuf,
    },
    /// Show the per-interface status
    Status {
        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Yaml,
}

fn main() -> ExitCode {
    let args = CmdArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("radvc: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CmdArgs) -> Result<(), Box<dyn Error>> {
    let client = reqwest::blocking::Client::new();
    match &args.command {
        Command::Reload { config } => {
            let config = Config::from_yaml_file(config)?;
            let response = client
                .post(format!("{}/reload", args.server))
                .json(&config)
                .send()?;
            if response.status().is_success() {
                Ok(())
            } else {
                let code = response.status();
                let body = response.text().unwrap_or_default();
                Err(format!("reload failed with {code}: {body}").into())
            }
        }
        Command::Status { output } => {
            let status: Status = client
                .get(format!("{}/status", args.server))
                .send()?
                .error_for_status()?
                .json()?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
                OutputFormat::Yaml => print!("{}", serde_yml::to_string(&status)?),
                OutputFormat::Table => print!("{}", render_table(&status)),
            }
            Ok(())
        }
    }
}

fn render_table(status: &Status) -> String {
    let mut out = format!(
        "{:<16} {:<10} {:>12} {:>14} {:>12}  {}\n",
        "INTERFACE", "STATE", "TX-SOLICITED", "TX-UNSOLICITED", "LAST-UPDATE", "MESSAGE"
    );
    for interface in &status.interfaces {
        out.push_str(&format!(
            "{:<16} {:<10} {:>12} {:>14} {:>12}  {}\n",
            interface.name,
            interface.state.to_string(),
            interface.tx_solicited_ra,
            interface.tx_unsolicited_ra,
            interface.last_update,
            interface.message,
        ));
    }
    out
}
