//! Integration tests for the cross-venue scanner.
//!
//! Offline tests run the full pipeline over saved listings in
//! `tests/fixtures`. Live tests hit the public venue APIs:
//! Run with: cargo test --test integration -- --ignored

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use cross_venue_arb::arbitrage::{Multiplier, MultiplierPolicy};
use cross_venue_arb::config::Config;
use cross_venue_arb::market::{load_snapshot, MarketSnapshot, Venue, VenueClient};
use cross_venue_arb::report::write_json;
use cross_venue_arb::{CycleStats, Pipeline};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn snapshot() -> MarketSnapshot {
    load_snapshot(
        &fixture("kalshi_markets.json"),
        &fixture("polymarket_markets.json"),
    )
    .unwrap()
}

fn pipeline(config: &Config) -> Pipeline {
    Pipeline::new(config.analysis().unwrap())
}

#[test]
fn fixture_listings_produce_one_record() {
    let report = pipeline(&Config::default()).analyze(&snapshot());

    assert_eq!(
        report.stats,
        CycleStats {
            kalshi_total: 7,
            polymarket_total: 7,
            kalshi_skipped: 1,
            polymarket_skipped: 1,
            kalshi_malformed: 1,
            polymarket_malformed: 1,
            matched: 4,
            unmatched_kalshi: 1,
            unmatched_polymarket: 1,
            unpriced: 1,
            degenerate: 1,
            over_ceiling: 1,
            emitted: 1,
        }
    );

    let record = &report.records[0];
    assert_eq!(record.series, "bitcoin");
    assert_eq!(record.kalshi_id, "KXBTCD-25JAN3117-T99999.99");
    assert_eq!(record.polymarket_id, "601");
    assert_eq!(record.expiration_date, "2025-01-31");
    assert_eq!(record.kalshi_strike, dec!(99999.99));
    assert_eq!(record.polymarket_strike, dec!(100000));
    assert_eq!(record.kalshi_yes, dec!(0.4));
    assert_eq!(record.polymarket_yes, dec!(0.60));
    assert_eq!(record.buy_yes_venue, Venue::Kalshi);
    assert_eq!(record.buy_no_venue, Venue::Polymarket);
    assert_eq!(record.upper_multiple, dec!(1.5));
    assert_eq!(record.recommended_multiplier, Multiplier::Recommended(dec!(1)));
    assert_eq!(record.guaranteed_profit, Some(dec!(0.2)));
}

#[test]
fn repeated_runs_are_byte_identical() {
    let pipeline = pipeline(&Config::default());
    let snapshot = snapshot();

    let runs: Vec<String> = (0..3)
        .map(|_| serde_json::to_string(&pipeline.analyze(&snapshot).records).unwrap())
        .collect();

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
}

#[test]
fn tighter_ceiling_and_tolerance_change_the_result_set() {
    let strict = Config {
        sanity_ceiling: dec!(1.4),
        ..Config::default()
    };
    let report = pipeline(&strict).analyze(&snapshot());
    assert_eq!(report.stats.over_ceiling, 2);
    assert!(report.records.is_empty());

    // 0.01 of strike slack is needed for every fixture pair.
    let exact = Config {
        max_strike_diff: dec!(0),
        ..Config::default()
    };
    let report = pipeline(&exact).analyze(&snapshot());
    assert_eq!(report.stats.matched, 0);
    assert_eq!(report.stats.unmatched_kalshi, 5);
}

#[test]
fn volume_skewed_policy_leans_toward_liquid_venue() {
    let skewed = Config {
        multiplier_policy: MultiplierPolicy::VolumeSkewed,
        ..Config::default()
    };
    let report = pipeline(&skewed).analyze(&snapshot());

    let record = &report.records[0];
    let m = record.recommended_multiplier.value().unwrap();
    let mid = (record.lower_multiple + record.upper_multiple) / dec!(2);

    // Polymarket (buy-no side) carries most of the dollar volume.
    assert!(m < mid);
    assert!(m >= record.lower_multiple);
}

#[test]
fn json_output_lists_emitted_records() {
    let report = pipeline(&Config::default()).analyze(&snapshot());
    let path = std::env::temp_dir().join(format!(
        "cross_venue_arb_integration_{}.json",
        std::process::id()
    ));

    write_json(&path, &report.records).unwrap();
    let written: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(written.len(), 1);
    assert_eq!(written[0]["buy_yes_venue"], "kalshi");
    assert_eq!(written[0]["recommended_multiplier"]["status"], "recommended");
}

/// Fetch live listings from both venues and analyze them.
#[tokio::test]
#[ignore = "requires network access to Kalshi and Polymarket"]
async fn test_live_snapshot() {
    let config = Config::default();
    let client = VenueClient::new(config.fetch()).unwrap();

    let snapshot = client.fetch_snapshot().await.unwrap();
    println!(
        "Fetched {} Kalshi and {} Polymarket listings",
        snapshot.kalshi.len(),
        snapshot.polymarket.len()
    );

    let report = pipeline(&config).analyze(&snapshot);
    println!("Stats: {:?}", report.stats);
    assert!(report.stats.emitted <= report.stats.matched);
}
