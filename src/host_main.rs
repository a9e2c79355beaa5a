use std::env::args;

use anyhow::Result;
use clap::Parser;
use sitecost::{
    tracker::{args::HostArgs, start_host, HostConfig},
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, HOST_PREFIX},
    },
};
use tracing::error;

fn main() -> Result<()> {
    run(HostArgs::parse_from(args()))
}

fn run(args: HostArgs) -> Result<()> {
    let app_dir = resolve_application_path(args.dir)?;
    enable_logging(HOST_PREFIX, &app_dir, args.log, args.log_console)?;
    if !args.browser_args.is_empty() {
        tracing::debug!("Started by browser with {:?}", args.browser_args);
    }

    let config = HostConfig {
        idle_detection_interval_secs: args.idle_interval,
    };
    single_thread_runtime()?
        .block_on(start_host(app_dir, config))
        .inspect_err(|e| error!("Host stopped with an error {e:?}"))
}

/// The tracker handles one event at a time, so one thread is all it needs.
fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
