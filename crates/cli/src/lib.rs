pub mod chat;
pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use smiles_core::config::{AppConfig, LoadOptions};
use std::process::ExitCode;

use crate::commands::booking::BookingCommand;

#[derive(Debug, Parser)]
#[command(
    name = "smiles",
    about = "Miles of Smiles operator CLI",
    long_about = "Prepare the booking database, inspect configuration, and invoke the booking tools.",
    after_help = "Examples:\n  smiles seed\n  smiles doctor --json\n  smiles booking list --name Jane --surname Doe"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Apply migrations and load the deterministic demo bookings")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, data-source bindings, resolution, and schema")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the agent tools with their descriptions")]
    Tools,
    /// Invoke a booking tool and print its JSON result
    #[command(subcommand)]
    Booking(BookingCommand),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        logging::init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => match commands::config::run() {
            Ok(output) => commands::CommandResult { exit_code: 0, output },
            Err(output) => commands::CommandResult { exit_code: 2, output },
        },
        Command::Doctor { json } => {
            let (output, passed) = commands::doctor::run(json);
            commands::CommandResult { exit_code: if passed { 0 } else { 1 }, output }
        }
        Command::Tools => commands::tools::run(),
        Command::Booking(command) => commands::booking::run(command),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
