//! Command-line interface for strictly_match.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use strictly_match::{ConfigOverrides, MatchId};

/// Strictly Match - two-player chess sessions over HTTP
#[derive(Parser, Debug)]
#[command(name = "strictly_match")]
#[command(about = "Chess match server and polling client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "strictly_match.toml", global = true)]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the authoritative match server
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Play a match from the terminal
    Play(PlayArgs),
}

/// Arguments of the `play` command.
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Match server URL
    #[arg(long)]
    pub server_url: Option<String>,

    /// Player id
    #[arg(long)]
    pub player_id: Option<String>,

    /// Display name
    #[arg(long)]
    pub player_name: Option<String>,

    /// Milliseconds between polls
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Join an existing match instead of creating one
    #[arg(long, conflicts_with = "automated")]
    pub join: Option<MatchId>,

    /// Play against the server's automated opponent
    #[arg(long)]
    pub automated: bool,
}

impl Command {
    /// Config values given on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        match self {
            Command::Serve { port, host } => ConfigOverrides {
                bind_host: host.clone(),
                bind_port: *port,
                ..ConfigOverrides::default()
            },
            Command::Play(args) => ConfigOverrides {
                server_url: args.server_url.clone(),
                player_id: args.player_id.clone(),
                player_name: args.player_name.clone(),
                poll_interval_ms: args.poll_interval_ms,
                ..ConfigOverrides::default()
            },
        }
    }
}
