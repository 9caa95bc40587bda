//! CLI Adapter
//!
//! Command-line interface for the farmer.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, FarmCmd, MintCmd, RecoverCmd, StatusCmd};

/// Parse the process arguments
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}
