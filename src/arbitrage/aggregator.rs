//! Filtering of assessed pairs into the emitted result set.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use super::calculator::{calculate_bound, ArbitrageBound, CalculatorConfig, Multiplier, VenueQuote};
use crate::market::Venue;
use crate::matching::Match;
use crate::metrics;

/// Aggregator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Pairs whose `upper_multiple` exceeds this are dropped.
    pub sanity_ceiling: Decimal,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sanity_ceiling: Decimal::new(5, 0),
        }
    }
}

/// A matched pair with its bound, if both sides are priced.
#[derive(Debug, Clone, PartialEq)]
pub struct PairAssessment {
    /// The matched contracts.
    pub pair: Match,
    /// Interval and multiplier; `None` when either yes-price is missing.
    pub bound: Option<ArbitrageBound>,
}

/// Run the calculator over one match.
pub fn assess(pair: Match, config: &CalculatorConfig) -> PairAssessment {
    let bound = match (
        VenueQuote::from_contract(&pair.a),
        VenueQuote::from_contract(&pair.b),
    ) {
        (Some(a), Some(b)) => Some(calculate_bound(&a, &b, config)),
        _ => None,
    };

    PairAssessment { pair, bound }
}

/// One emitted arbitrage row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitrageRecord {
    /// Series label.
    pub series: String,
    /// Kalshi ticker.
    pub kalshi_id: String,
    /// Polymarket market id.
    pub polymarket_id: String,
    /// Kalshi title.
    pub kalshi_title: Option<String>,
    /// Polymarket question.
    pub polymarket_title: Option<String>,
    /// Shared expiration date, `YYYY-MM-DD`.
    pub expiration_date: String,
    /// Kalshi strike.
    pub kalshi_strike: Decimal,
    /// Polymarket strike.
    pub polymarket_strike: Decimal,
    /// Kalshi yes-probability, unclamped.
    pub kalshi_yes: Decimal,
    /// Polymarket yes-probability, unclamped.
    pub polymarket_yes: Decimal,
    /// Venue to buy "yes" on.
    pub buy_yes_venue: Venue,
    /// Venue to buy "no" on.
    pub buy_no_venue: Venue,
    /// Smallest no-loss multiple.
    pub lower_multiple: Decimal,
    /// Largest no-loss multiple.
    pub upper_multiple: Decimal,
    /// Recommended multiplier.
    pub recommended_multiplier: Multiplier,
    /// Worst-case profit per cheap-yes contract at the recommended multiplier.
    pub guaranteed_profit: Option<Decimal>,
}

impl ArbitrageRecord {
    fn new(series: &str, pair: &Match, bound: &ArbitrageBound) -> Option<Self> {
        let (a, b) = (&pair.a, &pair.b);
        Some(Self {
            series: series.to_string(),
            kalshi_id: a.id.clone(),
            polymarket_id: b.id.clone(),
            kalshi_title: a.title.clone(),
            polymarket_title: b.title.clone(),
            expiration_date: pair.expiration_date.to_string(),
            kalshi_strike: a.strike?,
            polymarket_strike: b.strike?,
            kalshi_yes: a.yes_price?,
            polymarket_yes: b.yes_price?,
            buy_yes_venue: bound.buy_yes_venue,
            buy_no_venue: bound.buy_no_venue,
            lower_multiple: bound.lower_multiple,
            upper_multiple: bound.upper_multiple,
            recommended_multiplier: bound.multiplier,
            guaranteed_profit: bound.multiplier.value().map(|m| bound.guaranteed_profit(m)),
        })
    }
}

/// Emitted records plus per-reason drop counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOutcome {
    /// Records in match order.
    pub records: Vec<ArbitrageRecord>,
    /// Pairs missing a yes-price on either side.
    pub dropped_unpriced: usize,
    /// Pairs with an empty or inverted interval.
    pub dropped_degenerate: usize,
    /// Pairs whose `upper_multiple` exceeds the sanity ceiling.
    pub dropped_over_ceiling: usize,
}

/// Filter assessed pairs and emit the survivors in match order.
pub fn aggregate(
    series: &str,
    assessments: &[PairAssessment],
    config: &AggregatorConfig,
) -> AggregateOutcome {
    let mut outcome = AggregateOutcome::default();

    for assessment in assessments {
        let pair = &assessment.pair;

        let Some(bound) = &assessment.bound else {
            debug!(a = %pair.a.id, b = %pair.b.id, "Dropping unpriced pair");
            outcome.dropped_unpriced += 1;
            continue;
        };

        if bound.is_degenerate() {
            debug!(a = %pair.a.id, b = %pair.b.id, "Dropping degenerate pair");
            metrics::inc_degenerate_pairs();
            outcome.dropped_degenerate += 1;
            continue;
        }

        if bound.upper_multiple > config.sanity_ceiling {
            debug!(
                a = %pair.a.id,
                b = %pair.b.id,
                upper = %bound.upper_multiple,
                ceiling = %config.sanity_ceiling,
                "Dropping pair above sanity ceiling"
            );
            outcome.dropped_over_ceiling += 1;
            continue;
        }

        match ArbitrageRecord::new(series, pair, bound) {
            Some(record) => outcome.records.push(record),
            // A priced bound implies both prices and strikes are present.
            None => outcome.dropped_unpriced += 1,
        }
    }

    metrics::inc_records_emitted(outcome.records.len());

    info!(
        emitted = outcome.records.len(),
        unpriced = outcome.dropped_unpriced,
        degenerate = outcome.dropped_degenerate,
        over_ceiling = outcome.dropped_over_ceiling,
        "Aggregated arbitrage records"
    );

    outcome
}
