use std::{process::ExitCode, sync::Arc};

use cardwall::{App, CardRepository, Cli, Config, Result};
use clap::Parser;
use log::{debug, error, info};

pub fn initialize_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

fn resolve_config(cli: &Cli) -> Result<(Config, std::path::PathBuf)> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;

    if let Some(data_file) = &cli.data_file {
        config.data_file = data_file.clone();
    }
    if let Some(public_dir) = &cli.public_dir {
        config.public_dir = public_dir.clone();
    }

    Ok((config, config_path))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    let (config, config_path) = match resolve_config(&cli) {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    debug!(
        "Using data_file={}, public_dir={}",
        config.data_file.display(),
        config.public_dir.display()
    );

    let repository = Arc::new(CardRepository::from_config(&config));
    let app = App::new(repository, config, config_path, cli.verbose);

    match app.run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed ({}): {}", e.kind(), e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
