//! CLI subsystem
//!
//! Thin argument-parsing and dispatch layer over the scaffold generator.
//! All engine behavior lives in the library; the binary only derives
//! paths, writes templates and reports what it did.

mod args;
mod commands;

pub use args::{Cli, Command};

use crate::scaffold::ScaffoldResult;

/// Parse arguments and run the requested command.
pub fn run() -> ScaffoldResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    commands::dispatch(Cli::parse_args())
}
