//! Command-line interface
//!
//! Argument parsing, configuration discovery, and output rendering for the
//! `lrc` binary.

pub mod args;
pub mod config;
pub mod output;

pub use args::{Args, Commands};
pub use config::ConfigDiscovery;
pub use output::{outcome_json, render_outcome, render_value};
