use clap::Parser;
use std::path::PathBuf;

mod commands;
mod execute;
mod output;

use commands::Commands;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Inspect and manage the warden permission cache", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON); overrides WARDEN_CONFIG
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Permission store fixture (JSON); an empty store when omitted
    #[arg(long, global = true, value_name = "PATH")]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    warden_utils::tracing::init().map_err(|e| eyre::eyre!("failed to initialize tracing: {e}"))?;

    let cli = Cli::parse();
    let warden = execute::build_warden(cli.config.as_deref(), cli.fixture.as_deref())?;
    execute::execute_command(cli.command, &warden).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_options_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "warden",
            "check",
            "u",
            "--permission",
            "report:export",
            "--fixture",
            "store.json",
        ])
        .unwrap();
        assert_eq!(cli.fixture, Some(PathBuf::from("store.json")));
        assert!(matches!(cli.command, Commands::Check { .. }));
    }
}
