//! Command-line and environment configuration.
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use mirror_core::{BackoffSchedule, StaticAssetSet, DEFAULT_STATIC_EXTENSIONS};
use mirror_engine::{
    BrowserSettings, FetchSettings, RenderSettings, RetrySettings, SchedulerSettings,
    SessionSettings, StealthSettings, DEFAULT_USER_AGENT,
};
use mirror_logging::LogDestination;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sitemirror",
    version,
    about = "Mirror a list of site paths to a local directory"
)]
pub struct Cli {
    /// Origin the listed paths are resolved against
    #[arg(long, env = "SITEMIRROR_BASE_URL")]
    pub base_url: Url,

    /// Newline-delimited list of relative paths
    #[arg(short, long, env = "SITEMIRROR_INPUT", default_value = "paths.txt")]
    pub input: PathBuf,

    /// Root of the mirrored tree
    #[arg(short, long, env = "SITEMIRROR_OUTPUT", default_value = "mirror")]
    pub output: PathBuf,

    #[arg(
        long,
        env = "SITEMIRROR_MAX_CONCURRENCY",
        default_value_t = 2,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub max_concurrency: u16,

    /// Retries after the first attempt
    #[arg(long, env = "SITEMIRROR_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, env = "SITEMIRROR_NAVIGATION_TIMEOUT_SECS", default_value_t = 60)]
    pub navigation_timeout_secs: u64,

    #[arg(long, env = "SITEMIRROR_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "SITEMIRROR_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    #[arg(long, env = "SITEMIRROR_BACKOFF_BASE_MS", default_value_t = 1_000)]
    pub backoff_base_ms: u64,

    #[arg(long, env = "SITEMIRROR_BACKOFF_CAP_MS", default_value_t = 60_000)]
    pub backoff_cap_ms: u64,

    /// Use the bare exponential delay
    #[arg(long, env = "SITEMIRROR_NO_JITTER")]
    pub no_jitter: bool,

    /// Upper bound of the random pause before each task
    #[arg(long, env = "SITEMIRROR_REQUEST_DELAY_MS", default_value_t = 0)]
    pub request_delay_ms: u64,

    /// Comma-separated extensions fetched directly before rendering
    #[arg(long, env = "SITEMIRROR_STATIC_EXTENSIONS", value_delimiter = ',')]
    pub static_extensions: Vec<String>,

    #[arg(long, env = "SITEMIRROR_CHROME")]
    pub chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, env = "SITEMIRROR_HEADED")]
    pub headed: bool,

    /// Skip the scroll-to-bottom during session bootstrap
    #[arg(long, env = "SITEMIRROR_NO_SCROLL")]
    pub no_scroll: bool,

    #[arg(long, env = "SITEMIRROR_SETTLE_MS", default_value_t = 2_000)]
    pub settle_ms: u64,

    #[arg(
        long,
        env = "SITEMIRROR_LOG_LEVEL",
        default_value = "info",
        value_parser = parse_level
    )]
    pub log_level: LevelFilter,

    /// Also write the log to this file
    #[arg(long, env = "SITEMIRROR_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log only to the log file
    #[arg(long, env = "SITEMIRROR_QUIET", requires = "log_file")]
    pub quiet: bool,

    /// Empty the output directory before the run
    #[arg(long, env = "SITEMIRROR_CLEAN")]
    pub clean: bool,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) if self.quiet => LogDestination::File(path.clone()),
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn statics(&self) -> StaticAssetSet {
        if self.static_extensions.is_empty() {
            StaticAssetSet::new(DEFAULT_STATIC_EXTENSIONS)
        } else {
            StaticAssetSet::new(&self.static_extensions)
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
            ..FetchSettings::default()
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            stealth: StealthSettings::default(),
        }
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            headless: !self.headed,
            chrome_executable: self.chrome.clone(),
            request_timeout: Duration::from_secs(self.navigation_timeout_secs),
            ..BrowserSettings::default()
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            scroll: !self.no_scroll,
            settle_delay: Duration::from_millis(self.settle_ms),
            stealth: StealthSettings::default(),
        }
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            max_concurrency: usize::from(self.max_concurrency),
            request_delay: Duration::from_millis(self.request_delay_ms),
            retry: RetrySettings {
                max_retries: self.max_retries,
                backoff: BackoffSchedule::new(
                    Duration::from_millis(self.backoff_base_ms),
                    Duration::from_millis(self.backoff_cap_ms),
                    !self.no_jitter,
                ),
            },
        }
    }
}

fn parse_level(raw: &str) -> Result<LevelFilter, String> {
    raw.parse().map_err(|_| {
        format!("unknown log level {raw:?}; expected off, error, warn, info, debug or trace")
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_engine_defaults() {
        let cli = Cli::try_parse_from(["sitemirror", "--base-url", "https://e.test/"]).unwrap();
        let scheduler = cli.scheduler_settings();
        assert_eq!(scheduler.max_concurrency, 2);
        assert_eq!(scheduler.retry, RetrySettings::default());
        assert_eq!(cli.fetch_settings().user_agent, DEFAULT_USER_AGENT);
        assert!(cli.browser_settings().headless);
        assert!(cli.statics().is_static(&Url::parse("https://e.test/a.woff2").unwrap()));
        assert_eq!(cli.log_level, LevelFilter::Info);
        assert!(!cli.clean);
    }

    #[test]
    fn custom_extensions_replace_the_default_set() {
        let cli = Cli::try_parse_from([
            "sitemirror",
            "--base-url",
            "https://e.test/",
            "--static-extensions",
            "css,.PNG",
            "--max-concurrency",
            "8",
            "--no-jitter",
        ])
        .unwrap();
        let statics = cli.statics();
        assert_eq!(statics.len(), 2);
        assert!(statics.is_static(&Url::parse("https://e.test/x.png").unwrap()));
        assert!(!statics.is_static(&Url::parse("https://e.test/x.js").unwrap()));
        assert_eq!(cli.scheduler_settings().max_concurrency, 8);
        assert!(!cli.scheduler_settings().retry.backoff.jitter);
    }

    #[test]
    fn concurrency_outside_range_is_rejected() {
        for raw in ["0", "70000", "-1"] {
            let parsed = Cli::try_parse_from([
                "sitemirror",
                "--base-url",
                "https://e.test/",
                "--max-concurrency",
                raw,
            ]);
            assert!(parsed.is_err(), "accepted --max-concurrency {raw}");
        }
    }

    #[test]
    fn quiet_logs_to_file_only() {
        let cli = Cli::try_parse_from([
            "sitemirror",
            "--base-url",
            "https://e.test/",
            "--log-file",
            "run.log",
            "--quiet",
        ])
        .unwrap();
        assert_eq!(cli.log_destination(), LogDestination::File(PathBuf::from("run.log")));

        let cli = Cli::try_parse_from([
            "sitemirror",
            "--base-url",
            "https://e.test/",
            "--log-file",
            "run.log",
        ])
        .unwrap();
        assert_eq!(cli.log_destination(), LogDestination::Both(PathBuf::from("run.log")));
    }

    #[test]
    fn quiet_needs_a_log_file() {
        assert!(Cli::try_parse_from(["sitemirror", "--base-url", "https://e.test/", "--quiet"])
            .is_err());
    }

    #[test]
    fn base_url_is_required() {
        assert!(Cli::try_parse_from(["sitemirror"]).is_err());
    }
}
