use std::process::ExitCode;

use clap::Parser;
use doralens::action::failure_command;
use doralens::cli::{failure_message, Cli};
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting DoraLens - DORA Metrics Tool");

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            println!("{}", failure_command(&failure_message(&err)));
            ExitCode::FAILURE
        }
    }
}
