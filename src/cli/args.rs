//! Command line argument parsing
//!
//! Subcommands map one to one onto session operations:
//! - `status`: resolve the current state, optionally requesting a stop
//! - `start` / `stop` / `reset`: drive the LRO to convergence
//! - `session-start` / `session-stop`: open or close the edge session
//! - `list`: list configured sessions
//! - `show-config`: show configuration discovery information

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lrc")]
#[command(author = "Live Recording Control Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Control live recording sessions on a content fabric node")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the current state of a session
    Status {
        /// Session name
        name: String,
        /// Also request a stop of a running recording
        #[arg(long = "stop")]
        request_stop: bool,
    },
    /// Start recording (no-op when already running)
    Start {
        /// Session name
        name: String,
    },
    /// Stop recording and wait for termination
    Stop {
        /// Session name
        name: String,
    },
    /// Stop any running recording, then start a new one
    Reset {
        /// Session name
        name: String,
    },
    /// Open a new edge session
    SessionStart {
        /// Session name
        name: String,
    },
    /// Stop recording and mark the edge session closed
    SessionStop {
        /// Session name
        name: String,
    },
    /// List configured sessions
    List {
        /// Also resolve the current state of every session
        #[arg(long = "status")]
        with_status: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
