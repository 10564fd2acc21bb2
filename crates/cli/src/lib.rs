pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "leadly",
    about = "Leadly operator CLI",
    long_about = "Operate leadly runtime readiness, migrations, and demo data.",
    after_help = "Examples:\n  leadly migrate\n  leadly seed\n  leadly doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load deterministic demo leads")]
    Seed,
    #[command(about = "Validate config and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run().await,
        Command::Seed => commands::seed::run().await,
        Command::Doctor { json } => commands::doctor::run(json).await,
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
