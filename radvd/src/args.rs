// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "radvd")]
#[command(version)]
#[command(about = "IPv6 Router Advertisement daemon", long_about = None)]
pub struct CmdArgs {
    /// Configuration file (YAML)
    #[arg(short = 'f', long, value_name = "PATH")]
    pub config: PathBuf,

    /// Bind address and port for the admin HTTP API
    #[arg(
        long,
        value_name = "ADDRESS",
        default_value_t = SocketAddr::from(([127, 0, 0, 1], 8888)),
        help = "IP address and port to listen on for reload and status requests"
    )]
    pub listen: SocketAddr,
}
