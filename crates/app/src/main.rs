use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod error;
mod settings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let settings = match settings::Settings::load(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tally={level},ledger={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match commands::run(cli.command, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("command failed: {err:?}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
