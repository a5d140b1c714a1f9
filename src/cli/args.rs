//! CLI argument definitions using clap
//!
//! Commands:
//! - mimicdb create-model <Name> [--dir <path>]
//! - mimicdb create-migration <name> [--dir <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mimicdb - an in-memory relational engine for deterministic tests
#[derive(Parser, Debug)]
#[command(name = "mimicdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scaffold a new model definition file
    CreateModel {
        /// Capitalized model name, e.g. Owner
        name: String,

        /// Directory model files live in
        #[arg(long, default_value = "src/models")]
        dir: PathBuf,
    },

    /// Scaffold a new timestamped migration file
    CreateMigration {
        /// Human-readable migration name, e.g. "add owners"
        name: String,

        /// Directory migration files live in
        #[arg(long, default_value = "src/migrations")]
        dir: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
