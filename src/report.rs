//! JSON persistence and terminal rendering of arbitrage records.

use std::fmt::Write as _;
use std::path::Path;

use rust_decimal::Decimal;
use tracing::info;

use crate::arbitrage::{ArbitrageRecord, Multiplier};
use crate::error::Result;
use crate::utils::truncate;

const ID_WIDTH: usize = 28;

/// Write records as a pretty-printed JSON array, replacing the file.
pub fn write_json(path: &Path, records: &[ArbitrageRecord]) -> Result<()> {
    let body = serde_json::to_string_pretty(records)?;
    std::fs::write(path, body)?;
    info!(path = %path.display(), records = records.len(), "Wrote arbitrage records");
    Ok(())
}

/// Render records as a fixed-width table.
pub fn render_table(records: &[ArbitrageRecord]) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<10}  {:<width$}  {:<12}  {:>12}  {:>7}  {:>7}  {:<10}  {:>7}  {:>7}  {:>7}  {:>7}",
        "EXPIRY",
        "KALSHI",
        "POLYMARKET",
        "STRIKE",
        "K YES",
        "P YES",
        "BUY YES",
        "LOWER",
        "UPPER",
        "M",
        "PROFIT",
        width = ID_WIDTH,
    );

    for record in records {
        let multiplier = match record.recommended_multiplier {
            Multiplier::Recommended(m) => fixed(m, 3),
            Multiplier::Degenerate => "-".to_string(),
        };
        let profit = record
            .guaranteed_profit
            .map(|p| fixed(p, 4))
            .unwrap_or_else(|| "-".to_string());

        let _ = writeln!(
            out,
            "{:<10}  {:<width$}  {:<12}  {:>12}  {:>7}  {:>7}  {:<10}  {:>7}  {:>7}  {:>7}  {:>7}",
            record.expiration_date,
            truncate(&record.kalshi_id, ID_WIDTH),
            truncate(&record.polymarket_id, 12),
            fixed(record.kalshi_strike, 2),
            fixed(record.kalshi_yes, 3),
            fixed(record.polymarket_yes, 3),
            record.buy_yes_venue.to_string(),
            fixed(record.lower_multiple, 3),
            fixed(record.upper_multiple, 3),
            multiplier,
            profit,
            width = ID_WIDTH,
        );
    }

    if records.is_empty() {
        out.push_str("(no arbitrage records)\n");
    }

    out
}

fn fixed(value: Decimal, dp: u32) -> String {
    value.round_dp(dp).to_string()
}
