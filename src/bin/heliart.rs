use std::process;

use clap::Parser;
use heliart::{
    cli::Cli,
    domain::Action,
    errors::HeliartError,
    subcommands, utils,
};

async fn run_heliart() -> Result<(), HeliartError> {
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose);
    let config = cli.into_config()?;

    match config.action {
        Action::Show { json, watch } => subcommands::show(&config, json, watch).await,
        Action::Locate { json } => subcommands::locate(&config, json).await,
        Action::Forget => subcommands::forget(&config),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run_heliart().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
