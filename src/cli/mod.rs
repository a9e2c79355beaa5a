pub mod commands;

use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{process_clear_command, process_report_command, process_wage_command};
use tracing::level_filters::LevelFilter;

use crate::{
    tracker::{start_host, HostConfig, DEFAULT_IDLE_DETECTION_INTERVAL_SECS},
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Sitecost", version, long_about = None)]
#[command(about = "Shows how much time, and money, goes to each website", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging to the console")]
    log: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Display time and cost per site")]
    Report {
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[arg(long, short, help = "Keep running and redraw whenever the data changes")]
        watch: bool,
        #[arg(
            long,
            default_value_t = 1000,
            help = "How often to check for changes in watch mode, in milliseconds"
        )]
        poll_ms: u64,
    },
    #[command(about = "Set the hourly wage used to price time")]
    Wage {
        #[arg(allow_hyphen_values = true, help = "Hourly wage, a whole non-negative number")]
        value: String,
    },
    #[command(about = "Delete all recorded sites and the switch count. The wage is kept")]
    Clear {
        #[arg(long, short, help = "Do not ask for confirmation")]
        yes: bool,
    },
    #[command(
        about = "Run the native messaging host in this console. Normally the browser starts sitecost-host itself"
    )]
    Serve {
        #[arg(long = "idle-interval", default_value_t = DEFAULT_IDLE_DETECTION_INTERVAL_SECS)]
        idle_interval: u32,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = resolve_application_path(args.dir)?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Report {
            format,
            watch,
            poll_ms,
        } => process_report_command(&app_dir, format, watch, poll_ms).await,
        Commands::Wage { value } => process_wage_command(&app_dir, &value).await,
        Commands::Clear { yes } => process_clear_command(&app_dir, yes).await,
        Commands::Serve { idle_interval } => {
            start_host(
                app_dir,
                HostConfig {
                    idle_detection_interval_secs: idle_interval,
                },
            )
            .await
        }
    }
}
