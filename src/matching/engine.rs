//! Greedy one-to-one matching of venue-A contracts to venue-B contracts.
//!
//! Venue-A contracts are visited in input order. Each one takes the unclaimed
//! venue-B contract with the same expiration date and the nearest strike
//! within tolerance; on equal distance the earlier venue-B contract wins.
//! The result depends on input order and is reproducible for a given order.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use time::Date;
use tracing::{debug, info, instrument};

use crate::market::Contract;

/// Matching tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Largest accepted `|strike_a - strike_b|`, inclusive.
    pub max_strike_diff: Decimal,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_strike_diff: Decimal::new(5, 0),
        }
    }
}

/// A committed pairing of one venue-A and one venue-B contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Venue-A contract.
    pub a: Contract,
    /// Venue-B contract.
    pub b: Contract,
    /// Shared expiration date.
    pub expiration_date: Date,
    /// Absolute strike difference.
    pub strike_diff: Decimal,
}

/// Result of one matching run.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Matches in venue-A input order.
    pub matches: Vec<Match>,
    /// Eligible venue-A ids with no counterpart.
    pub unmatched_a: Vec<String>,
    /// Eligible venue-B ids never claimed.
    pub unmatched_b: Vec<String>,
    /// Venue-A contracts lacking strike or date, or repeating an id.
    pub ineligible_a: usize,
    /// Venue-B contracts lacking strike or date, or repeating an id.
    pub ineligible_b: usize,
}

/// Contract with its match key resolved.
#[derive(Debug, Clone, Copy)]
struct Keyed<'a> {
    contract: &'a Contract,
    strike: Decimal,
    date: Date,
}

/// Pair contracts one-to-one by expiration date and nearest strike.
#[instrument(skip_all, fields(a = contracts_a.len(), b = contracts_b.len()))]
pub fn match_contracts(
    contracts_a: &[Contract],
    contracts_b: &[Contract],
    config: &MatchConfig,
) -> MatchOutcome {
    let (side_a, ineligible_a) = eligible(contracts_a);
    let (side_b, ineligible_b) = eligible(contracts_b);

    // Venue-B positions per date, in input order.
    let mut by_date: BTreeMap<Date, Vec<usize>> = BTreeMap::new();
    for (pos, keyed) in side_b.iter().enumerate() {
        by_date.entry(keyed.date).or_default().push(pos);
    }

    // Claims are local to this run.
    let mut claimed = vec![false; side_b.len()];
    let mut matches = Vec::new();
    let mut unmatched_a = Vec::new();

    for keyed_a in &side_a {
        let best = by_date.get(&keyed_a.date).and_then(|positions| {
            nearest_unclaimed(
                positions,
                &side_b,
                &claimed,
                keyed_a.strike,
                config.max_strike_diff,
            )
        });

        match best {
            Some((pos, strike_diff)) => {
                claimed[pos] = true;
                let keyed_b = side_b[pos];
                debug!(
                    a = %keyed_a.contract.id,
                    b = %keyed_b.contract.id,
                    strike_diff = %strike_diff,
                    "Matched contracts"
                );
                matches.push(Match {
                    a: keyed_a.contract.clone(),
                    b: keyed_b.contract.clone(),
                    expiration_date: keyed_a.date,
                    strike_diff,
                });
            }
            None => {
                debug!(
                    a = %keyed_a.contract.id,
                    strike = %keyed_a.strike,
                    date = %keyed_a.date,
                    "No counterpart within tolerance"
                );
                unmatched_a.push(keyed_a.contract.id.clone());
            }
        }
    }

    let unmatched_b: Vec<String> = side_b
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(keyed, _)| keyed.contract.id.clone())
        .collect();

    info!(
        matches = matches.len(),
        unmatched_a = unmatched_a.len(),
        unmatched_b = unmatched_b.len(),
        ineligible_a,
        ineligible_b,
        max_strike_diff = %config.max_strike_diff,
        "Matching complete"
    );

    MatchOutcome {
        matches,
        unmatched_a,
        unmatched_b,
        ineligible_a,
        ineligible_b,
    }
}

/// Contracts with both strike and date, first occurrence of each id only.
fn eligible(contracts: &[Contract]) -> (Vec<Keyed<'_>>, usize) {
    let mut seen = HashSet::new();
    let mut keyed = Vec::with_capacity(contracts.len());

    for contract in contracts {
        let Some((strike, date)) = contract.match_key() else {
            continue;
        };
        if !seen.insert(contract.id.as_str()) {
            continue;
        }
        keyed.push(Keyed {
            contract,
            strike,
            date,
        });
    }

    let ineligible = contracts.len() - keyed.len();
    (keyed, ineligible)
}

/// Nearest unclaimed candidate within tolerance; the first one seen wins ties.
fn nearest_unclaimed(
    positions: &[usize],
    side_b: &[Keyed<'_>],
    claimed: &[bool],
    strike: Decimal,
    max_strike_diff: Decimal,
) -> Option<(usize, Decimal)> {
    let mut best: Option<(usize, Decimal)> = None;

    for &pos in positions {
        if claimed[pos] {
            continue;
        }
        let diff = (strike - side_b[pos].strike).abs();
        if diff > max_strike_diff {
            continue;
        }
        if best.map_or(true, |(_, best_diff)| diff < best_diff) {
            best = Some((pos, diff));
        }
    }

    best
}
