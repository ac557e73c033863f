//! Raw venue records to venue-agnostic [`Contract`]s.

use std::collections::HashSet;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::parse::{
    decimal_from_value, extract_number, first_outcome_price, id_from_value,
    parse_expiration_date, strike_from_value,
};
use super::types::{Contract, KalshiMarket, PolymarketMarket, Venue};
use crate::error::{ConfigError, NormalizeError};
use crate::metrics;

/// Kalshi prices are quoted in cents of a 100-cent notional unless stated.
const KALSHI_DEFAULT_NOTIONAL: Decimal = Decimal::ONE_HUNDRED;

/// Which listings belong to the series being compared.
#[derive(Debug, Clone)]
pub struct SeriesFilter {
    /// Series label carried into results (e.g. "bitcoin").
    pub name: String,
    /// Case-insensitive keyword required in the Kalshi title / Polymarket question.
    pub keyword: Option<String>,
    /// Substring required in the Kalshi ticker (e.g. "KXBTCD").
    pub kalshi_ticker_contains: Option<String>,
    /// Pattern the Polymarket question must match.
    pub polymarket_question: Option<Regex>,
}

impl SeriesFilter {
    /// Build a filter, compiling the question pattern.
    pub fn new(
        name: impl Into<String>,
        keyword: Option<String>,
        kalshi_ticker_contains: Option<String>,
        polymarket_question_pattern: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let polymarket_question = polymarket_question_pattern
            .filter(|p| !p.is_empty())
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            name: name.into(),
            keyword: keyword.filter(|k| !k.is_empty()).map(|k| k.to_lowercase()),
            kalshi_ticker_contains: kalshi_ticker_contains.filter(|t| !t.is_empty()),
            polymarket_question,
        })
    }

    /// A filter that accepts every record.
    pub fn unfiltered(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyword: None,
            kalshi_ticker_contains: None,
            polymarket_question: None,
        }
    }

    /// Check if a Kalshi listing belongs to this series.
    pub fn accepts_kalshi(&self, market: &KalshiMarket) -> bool {
        let title = market.title.as_deref().unwrap_or_default();
        let ticker = market.ticker.as_deref().unwrap_or_default();

        self.keyword_in(title)
            && self
                .kalshi_ticker_contains
                .as_deref()
                .map_or(true, |family| ticker.contains(family))
    }

    /// Check if a Polymarket listing belongs to this series.
    pub fn accepts_polymarket(&self, market: &PolymarketMarket) -> bool {
        let question = market.question.as_deref().unwrap_or_default();

        self.keyword_in(question)
            && self
                .polymarket_question
                .as_ref()
                .map_or(true, |pattern| pattern.is_match(question))
    }

    fn keyword_in(&self, text: &str) -> bool {
        self.keyword
            .as_deref()
            .map_or(true, |keyword| text.to_lowercase().contains(keyword))
    }
}

/// Outcome of normalizing one venue's listings.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    /// Venue of every contract in the batch.
    pub venue: Venue,
    /// Contracts in input order.
    pub contracts: Vec<Contract>,
    /// Records outside the configured series.
    pub skipped: usize,
    /// Malformed records, with the reason each was dropped.
    pub dropped: Vec<NormalizeError>,
}

impl NormalizedBatch {
    /// Total records seen.
    pub fn total(&self) -> usize {
        self.contracts.len() + self.skipped + self.dropped.len()
    }
}

/// Convert one Kalshi market into a contract.
pub fn normalize_kalshi(market: &KalshiMarket) -> Result<Contract, NormalizeError> {
    let venue = Venue::Kalshi;
    let id = market
        .ticker
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(NormalizeError::MissingId { venue })?
        .to_string();

    let strike = market
        .floor_strike
        .as_ref()
        .and_then(strike_from_value)
        .or_else(|| market.ceiling_strike.as_ref().and_then(strike_from_value))
        .ok_or_else(|| NormalizeError::MissingStrike {
            venue,
            id: id.clone(),
        })?;

    let expiration_date = expiration(
        venue,
        &id,
        [
            market.expected_expiration_time.as_deref(),
            market.close_time.as_deref(),
        ],
    )?;

    let notional = market
        .notional_value
        .as_ref()
        .and_then(decimal_from_value)
        .filter(|n| n.is_sign_positive() && !n.is_zero())
        .unwrap_or(KALSHI_DEFAULT_NOTIONAL);

    let yes_price = market
        .yes_ask
        .as_ref()
        .and_then(decimal_from_value)
        .or_else(|| market.last_price.as_ref().and_then(decimal_from_value))
        .and_then(|cents| {
            let price = cents.checked_div(notional);
            if price.is_none() {
                debug!(
                    venue = %venue,
                    id = %id,
                    cents = %cents,
                    notional = %notional,
                    "Yes price overflows, ignoring"
                );
            }
            price
        })
        .and_then(|price| probability(venue, &id, price));

    let contracts_traded = market.volume.as_ref().and_then(decimal_from_value);

    Ok(Contract {
        venue,
        title: market.title.clone(),
        strike: Some(strike),
        expiration_date: Some(expiration_date),
        volume: dollars_invested(contracts_traded, yes_price),
        yes_price,
        id,
    })
}

/// Convert one Polymarket market into a contract.
pub fn normalize_polymarket(market: &PolymarketMarket) -> Result<Contract, NormalizeError> {
    let venue = Venue::Polymarket;
    let id = market
        .id
        .as_ref()
        .and_then(id_from_value)
        .ok_or(NormalizeError::MissingId { venue })?;

    let strike = market
        .group_item_title
        .as_deref()
        .and_then(extract_number)
        .or_else(|| market.question.as_deref().and_then(extract_number))
        .ok_or_else(|| NormalizeError::MissingStrike {
            venue,
            id: id.clone(),
        })?;

    let expiration_date = expiration(
        venue,
        &id,
        [market.end_date_iso.as_deref(), market.end_date.as_deref()],
    )?;

    let yes_price = market
        .outcome_prices
        .as_deref()
        .and_then(first_outcome_price)
        .or_else(|| market.last_trade_price.as_ref().and_then(decimal_from_value))
        .and_then(|price| probability(venue, &id, price));

    let traded = market
        .volume_num
        .as_ref()
        .and_then(decimal_from_value)
        .or_else(|| market.volume.as_ref().and_then(decimal_from_value));

    Ok(Contract {
        venue,
        title: market.question.clone(),
        strike: Some(strike),
        expiration_date: Some(expiration_date),
        volume: dollars_invested(traded, yes_price),
        yes_price,
        id,
    })
}

/// Normalize Kalshi listings belonging to `series`.
pub fn normalize_kalshi_batch(markets: &[KalshiMarket], series: &SeriesFilter) -> NormalizedBatch {
    normalize_batch(
        Venue::Kalshi,
        markets,
        |m| series.accepts_kalshi(m),
        normalize_kalshi,
    )
}

/// Normalize Polymarket listings belonging to `series`.
pub fn normalize_polymarket_batch(
    markets: &[PolymarketMarket],
    series: &SeriesFilter,
) -> NormalizedBatch {
    normalize_batch(
        Venue::Polymarket,
        markets,
        |m| series.accepts_polymarket(m),
        normalize_polymarket,
    )
}

fn normalize_batch<T>(
    venue: Venue,
    records: &[T],
    accepts: impl Fn(&T) -> bool,
    convert: impl Fn(&T) -> Result<Contract, NormalizeError>,
) -> NormalizedBatch {
    let mut contracts = Vec::new();
    let mut dropped = Vec::new();
    let mut skipped = 0;
    let mut seen: HashSet<String> = HashSet::new();

    for record in records {
        if !accepts(record) {
            skipped += 1;
            metrics::inc_records_skipped(venue);
            continue;
        }

        let result = convert(record).and_then(|contract| {
            if seen.insert(contract.id.clone()) {
                Ok(contract)
            } else {
                Err(NormalizeError::DuplicateId {
                    venue,
                    id: contract.id,
                })
            }
        });

        match result {
            Ok(contract) => {
                metrics::inc_records_normalized(venue);
                contracts.push(contract);
            }
            Err(e) => {
                debug!(venue = %venue, reason = e.reason(), error = %e, "Dropping record");
                metrics::inc_records_dropped(venue, e.reason());
                dropped.push(e);
            }
        }
    }

    info!(
        venue = %venue,
        total = records.len(),
        contracts = contracts.len(),
        skipped,
        dropped = dropped.len(),
        "Normalized listings"
    );

    NormalizedBatch {
        venue,
        contracts,
        skipped,
        dropped,
    }
}

fn expiration<const N: usize>(
    venue: Venue,
    id: &str,
    fields: [Option<&str>; N],
) -> Result<time::Date, NormalizeError> {
    let raw = fields
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .ok_or_else(|| NormalizeError::MissingExpiration {
            venue,
            id: id.to_string(),
        })?;

    parse_expiration_date(raw).ok_or_else(|| NormalizeError::InvalidExpiration {
        venue,
        id: id.to_string(),
        raw: raw.to_string(),
    })
}

fn probability(venue: Venue, id: &str, price: Decimal) -> Option<Decimal> {
    if price < Decimal::ZERO || price > Decimal::ONE {
        debug!(venue = %venue, id, price = %price, "Yes price outside [0, 1], ignoring");
        return None;
    }
    Some(price)
}

fn dollars_invested(traded: Option<Decimal>, yes_price: Option<Decimal>) -> Decimal {
    match (traded, yes_price) {
        (Some(traded), Some(price)) if traded.is_sign_positive() => traded * price,
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use time::macros::date;

    fn kalshi(raw: serde_json::Value) -> KalshiMarket {
        serde_json::from_value(raw).unwrap()
    }

    fn poly(raw: serde_json::Value) -> PolymarketMarket {
        serde_json::from_value(raw).unwrap()
    }

    fn bitcoin_series() -> SeriesFilter {
        SeriesFilter::new(
            "bitcoin",
            Some("Bitcoin".to_string()),
            Some("KXBTCD".to_string()),
            Some(r"(?i)\b(above|greater than)\b"),
        )
        .unwrap()
    }

    #[test]
    fn normalize_kalshi_maps_fields() {
        let market = kalshi(json!({
            "ticker": "KXBTCD-25JAN3117-T100000",
            "title": "Bitcoin price on Jan 31, 2025?",
            "floor_strike": 100000,
            "expected_expiration_time": "2025-01-31T22:00:00Z",
            "yes_ask": 42,
            "volume": 1000
        }));

        let contract = normalize_kalshi(&market).unwrap();

        assert_eq!(contract.venue, Venue::Kalshi);
        assert_eq!(contract.id, "KXBTCD-25JAN3117-T100000");
        assert_eq!(contract.strike, Some(dec!(100000)));
        assert_eq!(contract.expiration_date, Some(date!(2025 - 01 - 31)));
        assert_eq!(contract.yes_price, Some(dec!(0.42)));
        assert_eq!(contract.volume, dec!(420));
    }

    #[test]
    fn normalize_kalshi_falls_back_to_ceiling_and_last_price() {
        let market = kalshi(json!({
            "ticker": "KXBTCD-X",
            "ceiling_strike": "99,750.5",
            "close_time": "2025-02-01T00:00:00Z",
            "last_price": 60,
            "notional_value": 100
        }));

        let contract = normalize_kalshi(&market).unwrap();

        assert_eq!(contract.strike, Some(dec!(99750.5)));
        assert_eq!(contract.expiration_date, Some(date!(2025 - 02 - 01)));
        assert_eq!(contract.yes_price, Some(dec!(0.6)));
        assert_eq!(contract.volume, Decimal::ZERO);
    }

    #[test]
    fn normalize_kalshi_missing_strike_is_malformed() {
        let market = kalshi(json!({
            "ticker": "KXBTCD-X",
            "expected_expiration_time": "2025-01-31T22:00:00Z"
        }));

        assert_eq!(
            normalize_kalshi(&market),
            Err(NormalizeError::MissingStrike {
                venue: Venue::Kalshi,
                id: "KXBTCD-X".to_string()
            })
        );
    }

    #[test]
    fn normalize_kalshi_bad_date_is_malformed_not_now() {
        let market = kalshi(json!({
            "ticker": "KXBTCD-X",
            "floor_strike": 100000,
            "expected_expiration_time": "next friday"
        }));

        assert!(matches!(
            normalize_kalshi(&market),
            Err(NormalizeError::InvalidExpiration { .. })
        ));
    }

    #[test]
    fn normalize_kalshi_out_of_range_price_is_absent() {
        let market = kalshi(json!({
            "ticker": "KXBTCD-X",
            "floor_strike": 100000,
            "expected_expiration_time": "2025-01-31T22:00:00Z",
            "yes_ask": 150
        }));

        let contract = normalize_kalshi(&market).unwrap();
        assert_eq!(contract.yes_price, None);
    }

    #[test]
    fn normalize_kalshi_overflowing_price_is_absent() {
        let market = kalshi(json!({
            "ticker": "KXBTCD-X",
            "floor_strike": 100000,
            "expected_expiration_time": "2025-01-31T22:00:00Z",
            "yes_ask": 42,
            "notional_value": "0.0000000000000000000000000001",
            "volume": 1000
        }));

        let contract = normalize_kalshi(&market).unwrap();
        assert_eq!(contract.yes_price, None);
        assert_eq!(contract.volume, Decimal::ZERO);
    }

    #[test]
    fn batch_survives_overflowing_price() {
        let markets = vec![
            kalshi(json!({
                "ticker": "KXBTCD-OK", "title": "Bitcoin",
                "floor_strike": 100000, "expected_expiration_time": "2025-01-31T22:00:00Z",
                "yes_ask": 40
            })),
            kalshi(json!({
                "ticker": "KXBTCD-TINY", "title": "Bitcoin",
                "floor_strike": 100500, "expected_expiration_time": "2025-01-31T22:00:00Z",
                "yes_ask": 40, "notional_value": "0.0000000000000000000000000001"
            })),
        ];

        let batch = normalize_kalshi_batch(&markets, &bitcoin_series());

        assert_eq!(batch.contracts.len(), 2);
        assert_eq!(batch.contracts[0].yes_price, Some(dec!(0.4)));
        assert_eq!(batch.contracts[1].yes_price, None);
    }

    #[test]
    fn normalize_polymarket_maps_fields() {
        let market = poly(json!({
            "id": "512345",
            "question": "Will Bitcoin be above $100,000 on January 31?",
            "groupItemTitle": "↑ 100,000",
            "endDateIso": "2025-01-31",
            "outcomePrices": "[\"0.58\", \"0.42\"]",
            "volumeNum": 2000
        }));

        let contract = normalize_polymarket(&market).unwrap();

        assert_eq!(contract.venue, Venue::Polymarket);
        assert_eq!(contract.id, "512345");
        assert_eq!(contract.strike, Some(dec!(100000)));
        assert_eq!(contract.expiration_date, Some(date!(2025 - 01 - 31)));
        assert_eq!(contract.yes_price, Some(dec!(0.58)));
        assert_eq!(contract.volume, dec!(1160));
    }

    #[test]
    fn normalize_polymarket_strike_falls_back_to_question() {
        let market = poly(json!({
            "id": 77,
            "question": "Will Bitcoin be above $98,000 on February 1?",
            "endDate": "2025-02-01T17:00:00Z",
            "lastTradePrice": 0.3
        }));

        let contract = normalize_polymarket(&market).unwrap();

        assert_eq!(contract.id, "77");
        assert_eq!(contract.strike, Some(dec!(98000)));
        assert_eq!(contract.yes_price, Some(dec!(0.3)));
    }

    #[test]
    fn normalize_polymarket_missing_date_is_malformed() {
        let market = poly(json!({
            "id": "1",
            "question": "Will Bitcoin be above $98,000?"
        }));

        assert_eq!(
            normalize_polymarket(&market),
            Err(NormalizeError::MissingExpiration {
                venue: Venue::Polymarket,
                id: "1".to_string()
            })
        );
    }

    #[test]
    fn series_filter_applies_keyword_ticker_and_pattern() {
        let series = bitcoin_series();

        let daily = kalshi(json!({"ticker": "KXBTCD-1", "title": "Bitcoin price today?"}));
        let range = kalshi(json!({"ticker": "KXBTC-1", "title": "Bitcoin range today?"}));
        assert!(series.accepts_kalshi(&daily));
        assert!(!series.accepts_kalshi(&range));

        let above = poly(json!({"question": "Will Bitcoin be above $100,000?"}));
        let below = poly(json!({"question": "Will Bitcoin dip to $80,000?"}));
        let other = poly(json!({"question": "Will Ethereum be above $4,000?"}));
        assert!(series.accepts_polymarket(&above));
        assert!(!series.accepts_polymarket(&below));
        assert!(!series.accepts_polymarket(&other));
    }

    #[test]
    fn series_filter_rejects_bad_pattern() {
        let result = SeriesFilter::new("bitcoin", None, None, Some("(unclosed"));
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn batch_drops_malformed_and_duplicates_without_aborting() {
        let markets = vec![
            kalshi(json!({
                "ticker": "KXBTCD-A", "title": "Bitcoin",
                "floor_strike": 100000, "expected_expiration_time": "2025-01-31T22:00:00Z"
            })),
            kalshi(json!({
                "ticker": "KXBTCD-B", "title": "Bitcoin",
                "expected_expiration_time": "2025-01-31T22:00:00Z"
            })),
            kalshi(json!({
                "ticker": "KXBTCD-A", "title": "Bitcoin",
                "floor_strike": 100500, "expected_expiration_time": "2025-01-31T22:00:00Z"
            })),
            kalshi(json!({"ticker": "KXETHD-C", "title": "Ethereum"})),
            kalshi(json!({
                "ticker": "KXBTCD-D", "title": "Bitcoin",
                "floor_strike": 101000, "close_time": "2025-01-31T22:00:00Z"
            })),
        ];

        let batch = normalize_kalshi_batch(&markets, &bitcoin_series());

        let ids: Vec<&str> = batch.contracts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["KXBTCD-A", "KXBTCD-D"]);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.dropped.len(), 2);
        assert_eq!(batch.dropped[0].reason(), "missing_strike");
        assert_eq!(batch.dropped[1].reason(), "duplicate_id");
        assert_eq!(batch.total(), 5);
    }
}
