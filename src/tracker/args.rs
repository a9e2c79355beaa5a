use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::DEFAULT_IDLE_DETECTION_INTERVAL_SECS;

/// Arguments of the native messaging host. Browsers append their own arguments (the caller
/// origin, a window handle on Windows), so unknown trailing values are accepted.
#[derive(Parser, Debug)]
#[command(name = "sitecost-host", version, about = "Native messaging host that tracks time per site")]
pub struct HostArgs {
    #[arg(long, help = "Application directory holding the store and the logs")]
    pub dir: Option<PathBuf>,
    #[arg(
        long = "idle-interval",
        default_value_t = DEFAULT_IDLE_DETECTION_INTERVAL_SECS,
        help = "Seconds without input after which the browser reports idle"
    )]
    pub idle_interval: u32,
    /// Mirrors logs to stderr. For debugging only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub browser_args: Vec<String>,
}
