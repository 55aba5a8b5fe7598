//! Entry point the browser launches through the native messaging manifest. Stdout belongs to the
//! protocol, so nothing here prints to it.

use anyhow::Result;
use clap::Parser;
use tabtally::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, HOST_PREFIX},
        runtime::single_thread_runtime,
    },
};
use tracing::info;

fn main() {
    if let Err(e) = run(DaemonArgs::parse()) {
        eprintln!("Native host error: {e:?}");
        std::process::exit(1);
    }
}

fn run(args: DaemonArgs) -> Result<()> {
    let app_dir = args
        .options
        .dir
        .clone()
        .map_or_else(create_application_default_path, ensure_dir)?;
    enable_logging(HOST_PREFIX, &app_dir, args.log, args.log_console)?;
    info!("Started by {:?}", args.caller);

    let config = args.options.config();
    single_thread_runtime()?.block_on(async move { start_daemon(app_dir, config).await })?;
    Ok(())
}
