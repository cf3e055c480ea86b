use std::str::FromStr;

use clap::Parser;
use log::{debug, LevelFilter};
use miette::Result;
use tilegraph::cli::Cli;

fn main() -> Result<()> {
    miette::set_panic_hook();

    let cli = Cli::parse();

    let level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .init();
    debug!("parsed arguments: {:?}", cli);

    tilegraph::cli::run(cli)?;
    Ok(())
}
