use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::config::TrackerConfig;

#[derive(Parser, Debug)]
#[command(name = "tabtally-host", version, about = "Native messaging host of the tabtally extension", long_about = None)]
pub struct DaemonArgs {
    #[command(flatten)]
    pub options: HostOptions,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    /// Browsers append the calling extension's origin (and on Windows a parent window handle).
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub caller: Vec<String>,
}

/// Options shared by `tabtally-host` and `tabtally serve`.
#[derive(clap::Args, Debug, Clone)]
pub struct HostOptions {
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
    #[arg(long = "tick-ms", default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..), help = "Reconciliation and push interval in milliseconds")]
    pub tick_ms: u64,
    #[arg(long = "persist-secs", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..), help = "Interval between saves of the tab table")]
    pub persist_secs: u64,
    #[arg(
        long = "idle-timeout-secs",
        help = "Stop counting the active tab after this many seconds without browser events"
    )]
    pub idle_timeout_secs: Option<u32>,
    #[arg(
        long = "prune-closed-after-secs",
        help = "Forget closed tabs this many seconds after they were closed"
    )]
    pub prune_closed_after_secs: Option<u32>,
}

impl HostOptions {
    pub fn config(&self) -> TrackerConfig {
        TrackerConfig {
            tick_interval: Duration::from_millis(self.tick_ms),
            persist_interval: Duration::from_secs(self.persist_secs),
            idle_timeout: self
                .idle_timeout_secs
                .map(|v| chrono::Duration::seconds(v.into())),
            prune_closed_after: self
                .prune_closed_after_secs
                .map(|v| chrono::Duration::seconds(v.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use crate::daemon::config::TrackerConfig;

    use super::DaemonArgs;

    #[test]
    fn test_defaults_match_config() {
        let args = DaemonArgs::parse_from(["tabtally-host"]);
        assert_eq!(args.options.config(), TrackerConfig::default());
    }

    #[test]
    fn test_browser_arguments_are_accepted() {
        let args = DaemonArgs::parse_from([
            "tabtally-host",
            "--idle-timeout-secs",
            "5",
            "chrome-extension://abcdefghijklmnop/",
            "--parent-window=0",
        ]);
        assert_eq!(args.caller.len(), 2);
        let config = args.options.config();
        assert_eq!(config.idle_timeout, Some(chrono::Duration::seconds(5)));
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(DaemonArgs::try_parse_from(["tabtally-host", "--tick-ms", "0"]).is_err());
    }
}
