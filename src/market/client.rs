//! Read-only venue listing client for Kalshi and Polymarket Gamma.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use super::parse::parse_expiration_date;
use super::types::{KalshiMarket, KalshiMarketsPage, MarketSnapshot, PolymarketMarket, Venue};
use crate::error::{ArbError, MarketError};
use crate::metrics;

/// Fetch settings shared by both venues.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Kalshi trade API base URL, no trailing slash.
    pub kalshi_api_url: String,
    /// Polymarket Gamma API base URL, no trailing slash.
    pub polymarket_gamma_url: String,
    /// Listings expiring further out than this are not fetched.
    pub lookahead: time::Duration,
    /// Page size.
    pub page_limit: u32,
    /// Page cap per venue per fetch.
    pub max_pages: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// HTTP client for both venues' public listing endpoints.
#[derive(Debug, Clone)]
pub struct VenueClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Endpoints and paging limits.
    config: FetchConfig,
}

impl VenueClient {
    /// Create a client with the configured timeouts.
    pub fn new(config: FetchConfig) -> Result<Self, MarketError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { http, config })
    }

    /// Fetch both venues concurrently; fails if either venue fails.
    #[instrument(skip(self))]
    pub async fn fetch_snapshot(&self) -> Result<MarketSnapshot, MarketError> {
        let now = OffsetDateTime::now_utc();

        let (kalshi, polymarket) = tokio::try_join!(
            self.timed(Venue::Kalshi, self.fetch_kalshi_markets(now)),
            self.timed(Venue::Polymarket, self.fetch_polymarket_markets(now)),
        )?;

        info!(
            kalshi = kalshi.len(),
            polymarket = polymarket.len(),
            "Fetched market snapshot"
        );

        Ok(MarketSnapshot {
            kalshi,
            polymarket,
            captured_at: now,
        })
    }

    async fn timed<T>(
        &self,
        venue: Venue,
        fetch: impl std::future::Future<Output = Result<T, MarketError>>,
    ) -> Result<T, MarketError> {
        let start = Instant::now();
        let result = fetch.await;
        metrics::record_fetch_latency(start, venue);

        if let Err(e) = &result {
            warn!(venue = %venue, error = %e, "Venue fetch failed");
            metrics::inc_fetch_failures(venue);
        }
        result
    }

    /// Fetch open Kalshi markets closing within the lookahead window.
    #[instrument(skip(self))]
    pub async fn fetch_kalshi_markets(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<KalshiMarket>, MarketError> {
        let url = format!("{}/markets", self.config.kalshi_api_url);
        let max_close_ts = (now + self.config.lookahead).unix_timestamp();

        let mut markets = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            if pages >= self.config.max_pages {
                return Err(MarketError::PageLimitExceeded {
                    venue: Venue::Kalshi,
                    pages,
                });
            }

            let query = kalshi_query(self.config.page_limit, max_close_ts, cursor.as_deref());
            let page: KalshiMarketsPage = self.get_json(Venue::Kalshi, &url, &query).await?;
            pages += 1;

            debug!(page = pages, markets = page.markets.len(), "Fetched Kalshi page");
            markets.extend(page.markets);

            match page.cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(markets = markets.len(), pages, "Fetched Kalshi markets");
        Ok(markets)
    }

    /// Fetch open Polymarket markets ending within the lookahead window.
    #[instrument(skip(self))]
    pub async fn fetch_polymarket_markets(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<PolymarketMarket>, MarketError> {
        let url = format!("{}/markets", self.config.polymarket_gamma_url);
        let limit = self.config.page_limit as usize;

        let mut markets = Vec::new();
        let mut pages = 0;

        loop {
            if pages >= self.config.max_pages {
                return Err(MarketError::PageLimitExceeded {
                    venue: Venue::Polymarket,
                    pages,
                });
            }

            let query = polymarket_query(self.config.page_limit, markets.len());
            let page: Vec<PolymarketMarket> =
                self.get_json(Venue::Polymarket, &url, &query).await?;
            pages += 1;

            let short = page.len() < limit;
            debug!(page = pages, markets = page.len(), "Fetched Polymarket page");
            markets.extend(page);

            if short {
                break;
            }
        }

        let fetched = markets.len();
        let end = now + self.config.lookahead;
        markets.retain(|market| within_window(market, now, end));

        info!(
            fetched,
            in_window = markets.len(),
            pages,
            "Fetched Polymarket markets"
        );
        Ok(markets)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        venue: Venue,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, MarketError> {
        let response = self.http.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(MarketError::FetchFailed {
                venue,
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.json().await.map_err(|e| {
            MarketError::ParseError(format!("Failed to parse {} markets page: {}", venue, e))
        })
    }
}

fn kalshi_query(
    limit: u32,
    max_close_ts: i64,
    cursor: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("status", "open".to_string()),
        ("limit", limit.to_string()),
        ("max_close_ts", max_close_ts.to_string()),
    ];
    if let Some(cursor) = cursor {
        query.push(("cursor", cursor.to_string()));
    }
    query
}

fn polymarket_query(limit: u32, offset: usize) -> Vec<(&'static str, String)> {
    vec![
        ("closed", "false".to_string()),
        ("limit", limit.to_string()),
        ("offset", offset.to_string()),
    ]
}

/// Check if a Polymarket market ends between `start` and `end` (by date).
///
/// Markets without a parsable end date are kept; the normalizer decides.
pub fn within_window(
    market: &PolymarketMarket,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> bool {
    let raw = market
        .end_date_iso
        .as_deref()
        .or(market.end_date.as_deref())
        .unwrap_or_default();

    match parse_expiration_date(raw) {
        Some(date) => date >= start.date() && date <= end.date(),
        None => true,
    }
}

/// Saved listings: a bare array or a `{"markets": [...]}` page.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listings<T> {
    Bare(Vec<T>),
    Wrapped { markets: Vec<T> },
}

/// Read saved venue listings from a JSON file.
pub fn read_listings<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ArbError> {
    let raw = std::fs::read_to_string(path)?;
    let listings: Listings<T> = serde_json::from_str(&raw)?;
    Ok(match listings {
        Listings::Bare(markets) | Listings::Wrapped { markets } => markets,
    })
}

/// Load a snapshot from saved Kalshi and Polymarket listings.
pub fn load_snapshot(kalshi: &Path, polymarket: &Path) -> Result<MarketSnapshot, ArbError> {
    Ok(MarketSnapshot::new(
        read_listings(kalshi)?,
        read_listings(polymarket)?,
    ))
}
