use std::process::ExitCode;

use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

use bcdecode::config::{Cli, Config};
use bcdecode::driver;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_cli(cli)?;
    driver::run(&config)?;
    Ok(())
}
