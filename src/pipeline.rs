//! One analysis cycle: normalize, match, bound and aggregate a snapshot.

use serde::Serialize;
use tracing::{info, instrument};

use crate::arbitrage::{aggregate, assess, AggregatorConfig, ArbitrageRecord, CalculatorConfig};
use crate::market::{
    normalize_kalshi_batch, normalize_polymarket_batch, MarketSnapshot, SeriesFilter,
};
use crate::matching::{match_contracts, MatchConfig};
use crate::metrics;

/// Everything the core needs, fixed for a whole run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Series filter.
    pub series: SeriesFilter,
    /// Matching tolerances.
    pub matching: MatchConfig,
    /// Multiplier policy.
    pub calculator: CalculatorConfig,
    /// Result filtering.
    pub aggregator: AggregatorConfig,
}

/// Per-cycle counts for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Kalshi listings seen.
    pub kalshi_total: usize,
    /// Polymarket listings seen.
    pub polymarket_total: usize,
    /// Kalshi listings outside the series.
    pub kalshi_skipped: usize,
    /// Polymarket listings outside the series.
    pub polymarket_skipped: usize,
    /// Malformed Kalshi listings.
    pub kalshi_malformed: usize,
    /// Malformed Polymarket listings.
    pub polymarket_malformed: usize,
    /// Committed matches.
    pub matched: usize,
    /// Kalshi contracts with no counterpart.
    pub unmatched_kalshi: usize,
    /// Polymarket contracts never claimed.
    pub unmatched_polymarket: usize,
    /// Matches missing a yes-price.
    pub unpriced: usize,
    /// Matches with no safe multiplier.
    pub degenerate: usize,
    /// Matches above the sanity ceiling.
    pub over_ceiling: usize,
    /// Records emitted.
    pub emitted: usize,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Emitted records in match order.
    pub records: Vec<ArbitrageRecord>,
    /// Counts for the cycle.
    pub stats: CycleStats,
}

/// Analysis pipeline over immutable snapshots.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalysisConfig,
}

impl Pipeline {
    /// Create a pipeline.
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Analyze one snapshot. Deterministic for a given snapshot.
    #[instrument(skip_all, fields(series = %self.config.series.name))]
    pub fn analyze(&self, snapshot: &MarketSnapshot) -> CycleReport {
        let _timer = metrics::timer_cycle();

        let kalshi = normalize_kalshi_batch(&snapshot.kalshi, &self.config.series);
        let polymarket = normalize_polymarket_batch(&snapshot.polymarket, &self.config.series);

        let matched = match_contracts(
            &kalshi.contracts,
            &polymarket.contracts,
            &self.config.matching,
        );
        metrics::inc_matches(matched.matches.len());

        let assessments: Vec<_> = matched
            .matches
            .iter()
            .cloned()
            .map(|pair| assess(pair, &self.config.calculator))
            .collect();

        let outcome = aggregate(
            &self.config.series.name,
            &assessments,
            &self.config.aggregator,
        );

        let stats = CycleStats {
            kalshi_total: kalshi.total(),
            polymarket_total: polymarket.total(),
            kalshi_skipped: kalshi.skipped,
            polymarket_skipped: polymarket.skipped,
            kalshi_malformed: kalshi.dropped.len(),
            polymarket_malformed: polymarket.dropped.len(),
            matched: matched.matches.len(),
            unmatched_kalshi: matched.unmatched_a.len(),
            unmatched_polymarket: matched.unmatched_b.len(),
            unpriced: outcome.dropped_unpriced,
            degenerate: outcome.dropped_degenerate,
            over_ceiling: outcome.dropped_over_ceiling,
            emitted: outcome.records.len(),
        };

        metrics::inc_cycles();
        info!(
            captured_at = %snapshot.captured_at,
            matched = stats.matched,
            emitted = stats.emitted,
            degenerate = stats.degenerate,
            "Cycle analyzed"
        );

        CycleReport {
            records: outcome.records,
            stats,
        }
    }
}
