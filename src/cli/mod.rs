pub mod completions;
pub mod dump;
pub mod list;
pub mod validate;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::output::Printer;

/// tilegraph - typed document graphs from tile-map editor files
#[derive(Parser, Debug)]
#[command(name = "tilegraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the projection of a document as JSON or YAML
    Dump(dump::DumpArgs),

    /// Build every document and report failures
    Validate(validate::ValidateArgs),

    /// List discovered documents with a short summary of each
    List(list::ListArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let printer = Printer::new();
    match cli.command {
        Commands::Dump(args) => dump::run(args, &printer),
        Commands::Validate(args) => validate::run(args, &printer),
        Commands::List(args) => list::run(args, &printer),
        Commands::Completions(args) => completions::run(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_is_global() {
        let cli = Cli::try_parse_from(["tilegraph", "dump", "level.tmx", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Dump(_)));
    }
}
