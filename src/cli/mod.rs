pub mod host_path;
pub mod manifest;
pub mod report;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use manifest::{process_manifest_command, ManifestCommand};
use report::{process_report_command, ReportCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{args::HostOptions, start_daemon},
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Tabtally", version, long_about = None)]
#[command(about = "Measures time spent on browser tabs", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Display time spent per site, as saved by the host")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Print the native messaging manifest that registers the host with a browser")]
    Manifest {
        #[command(flatten)]
        command: ManifestCommand,
    },
    #[command(
        about = "Run the host directly in current console. Browsers normally start tabtally-host themselves"
    )]
    Serve {
        #[command(flatten)]
        options: HostOptions,
    },
}

impl Commands {
    fn dir(&self) -> Option<PathBuf> {
        match self {
            Commands::Report { command } => command.dir.clone(),
            Commands::Serve { options } => options.dir.clone(),
            Commands::Manifest { .. } => None,
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .commands
        .dir()
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Report { command } => process_report_command(command, app_dir).await,
        Commands::Manifest { command } => process_manifest_command(command),
        Commands::Serve { options } => start_daemon(app_dir, options.config()).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Args;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }
}
