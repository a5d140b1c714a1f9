//! CLI command dispatch

use chrono::Utc;

use crate::scaffold::{ScaffoldResult, Scaffolder};

use super::args::{Cli, Command};

/// Execute the parsed command.
pub fn dispatch(cli: Cli) -> ScaffoldResult<()> {
    match cli.command {
        Command::CreateModel { name, dir } => {
            let scaffolder = Scaffolder::new(&dir, &dir);
            let path = scaffolder.create_model(&name)?;
            println!("Model created at \"{}\"", path.display());
        }
        Command::CreateMigration { name, dir } => {
            let scaffolder = Scaffolder::new(&dir, &dir);
            let path = scaffolder.create_migration(&name, Utc::now())?;
            println!("New migration created at \"{}\"", path.display());
        }
    }
    Ok(())
}
