//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::arbitrage::{AggregatorConfig, CalculatorConfig, MultiplierPolicy};
use crate::error::ConfigError;
use crate::market::{FetchConfig, SeriesFilter};
use crate::matching::MatchConfig;
use crate::pipeline::AnalysisConfig;

/// Upper bound on `LOOKAHEAD_DAYS`, roughly ten years.
pub const MAX_LOOKAHEAD_DAYS: i64 = 3650;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Venue Endpoints ===
    /// Kalshi trade API base URL.
    #[serde(default = "default_kalshi_api_url")]
    pub kalshi_api_url: String,

    /// Polymarket Gamma API base URL.
    #[serde(default = "default_polymarket_gamma_url")]
    pub polymarket_gamma_url: String,

    // === Fetching ===
    /// Only listings expiring within this many days are fetched.
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,

    /// Page size for venue listing requests.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Pagination stops with an error past this many pages.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-request HTTP timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Series ===
    /// Series label carried into results.
    #[serde(default = "default_series_name")]
    pub series_name: String,

    /// Keyword required in titles/questions (empty disables).
    #[serde(default = "default_series_keyword")]
    pub series_keyword: String,

    /// Substring required in Kalshi tickers (empty disables).
    #[serde(default = "default_kalshi_ticker_filter")]
    pub kalshi_ticker_filter: String,

    /// Regex required to match Polymarket questions (empty disables).
    #[serde(default = "default_polymarket_question_pattern")]
    pub polymarket_question_pattern: String,

    // === Analysis ===
    /// Largest strike difference accepted as a match, inclusive.
    #[serde(default = "default_max_strike_diff")]
    pub max_strike_diff: Decimal,

    /// Volume skew weight in [0, 1].
    #[serde(default = "default_max_skew")]
    pub max_skew: Decimal,

    /// Pairs with `upper_multiple` above this are dropped.
    #[serde(default = "default_sanity_ceiling")]
    pub sanity_ceiling: Decimal,

    /// Multiplier policy: equal-profit or volume-skewed.
    #[serde(default)]
    pub multiplier_policy: MultiplierPolicy,

    // === Operation ===
    /// Seconds between cycles in `run`.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Where to write the JSON result set.
    #[serde(default)]
    pub output_path: Option<String>,

    /// Prometheus exporter port (disabled when unset).
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_kalshi_api_url() -> String {
    "https://api.elections.kalshi.com/trade-api/v2".to_string()
}

fn default_polymarket_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_lookahead_days() -> i64 {
    10
}

fn default_page_limit() -> u32 {
    500
}

fn default_max_pages() -> u32 {
    100
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_series_name() -> String {
    "bitcoin".to_string()
}

fn default_series_keyword() -> String {
    "bitcoin".to_string()
}

fn default_kalshi_ticker_filter() -> String {
    "KXBTCD".to_string()
}

fn default_polymarket_question_pattern() -> String {
    r"(?i)\b(above|greater than)\b".to_string()
}

fn default_max_strike_diff() -> Decimal {
    Decimal::new(5, 0) // $5
}

fn default_max_skew() -> Decimal {
    Decimal::new(75, 2) // 0.75
}

fn default_sanity_ceiling() -> Decimal {
    Decimal::new(5, 0)
}

fn default_scan_interval_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kalshi_api_url: default_kalshi_api_url(),
            polymarket_gamma_url: default_polymarket_gamma_url(),
            lookahead_days: default_lookahead_days(),
            page_limit: default_page_limit(),
            max_pages: default_max_pages(),
            http_timeout_ms: default_http_timeout_ms(),
            series_name: default_series_name(),
            series_keyword: default_series_keyword(),
            kalshi_ticker_filter: default_kalshi_ticker_filter(),
            polymarket_question_pattern: default_polymarket_question_pattern(),
            max_strike_diff: default_max_strike_diff(),
            max_skew: default_max_skew(),
            sanity_ceiling: default_sanity_ceiling(),
            multiplier_policy: MultiplierPolicy::default(),
            scan_interval_secs: default_scan_interval_secs(),
            output_path: None,
            metrics_port: None,
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("KALSHI_API_URL", &self.kalshi_api_url)?;
        check_url("POLYMARKET_GAMMA_URL", &self.polymarket_gamma_url)?;

        if !(1..=MAX_LOOKAHEAD_DAYS).contains(&self.lookahead_days) {
            return Err(ConfigError::InvalidLookahead(self.lookahead_days));
        }
        if self.page_limit == 0 {
            return Err(ConfigError::Zero { name: "PAGE_LIMIT" });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Zero { name: "MAX_PAGES" });
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                name: "HTTP_TIMEOUT_MS",
            });
        }
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::Zero {
                name: "SCAN_INTERVAL_SECS",
            });
        }

        // Compiling the filter surfaces a bad pattern.
        self.series_filter()?;
        self.analysis_tolerances()?;

        Ok(())
    }

    /// Series filter built from the series settings.
    pub fn series_filter(&self) -> Result<SeriesFilter, ConfigError> {
        SeriesFilter::new(
            self.series_name.clone(),
            Some(self.series_keyword.clone()),
            Some(self.kalshi_ticker_filter.clone()),
            Some(self.polymarket_question_pattern.as_str()),
        )
    }

    /// Validated analysis settings for the pipeline.
    pub fn analysis(&self) -> Result<AnalysisConfig, ConfigError> {
        let (matching, calculator, aggregator) = self.analysis_tolerances()?;
        Ok(AnalysisConfig {
            series: self.series_filter()?,
            matching,
            calculator,
            aggregator,
        })
    }

    /// Fetch settings for the venue clients.
    pub fn fetch(&self) -> FetchConfig {
        FetchConfig {
            kalshi_api_url: self.kalshi_api_url.trim_end_matches('/').to_string(),
            polymarket_gamma_url: self.polymarket_gamma_url.trim_end_matches('/').to_string(),
            lookahead: time::Duration::days(self.lookahead_days),
            page_limit: self.page_limit,
            max_pages: self.max_pages,
            timeout: Duration::from_millis(self.http_timeout_ms),
        }
    }

    /// Interval between cycles in `run`.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    fn analysis_tolerances(
        &self,
    ) -> Result<(MatchConfig, CalculatorConfig, AggregatorConfig), ConfigError> {
        if self.max_strike_diff < Decimal::ZERO {
            return Err(ConfigError::NegativeStrikeTolerance(self.max_strike_diff));
        }
        if self.max_skew < Decimal::ZERO || self.max_skew > Decimal::ONE {
            return Err(ConfigError::SkewOutOfRange(self.max_skew));
        }
        if self.sanity_ceiling <= Decimal::ZERO {
            return Err(ConfigError::InvalidSanityCeiling(self.sanity_ceiling));
        }

        Ok((
            MatchConfig {
                max_strike_diff: self.max_strike_diff,
            },
            CalculatorConfig {
                policy: self.multiplier_policy,
                max_skew: self.max_skew,
            },
            AggregatorConfig {
                sanity_ceiling: self.sanity_ceiling,
            },
        ))
    }
}

fn check_url(name: &'static str, raw: &str) -> Result<(), ConfigError> {
    Url::parse(raw).map(|_| ()).map_err(|e| ConfigError::InvalidUrl {
        name,
        url: raw.to_string(),
        reason: e.to_string(),
    })
}
