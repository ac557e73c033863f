//! No-loss ratio interval and recommended multiplier for a matched pair.
//!
//! Buy one "yes" contract on the venue with the lower yes-probability `P_L`
//! and `m` "no" contracts on the venue with the higher yes-probability `P_H`.
//! Per yes contract:
//!
//! ```text
//! profit if yes = (1 - P_L) - m (1 - P_H)
//! profit if no  = m P_H - P_L
//! ```
//!
//! Both are positive exactly when `P_L / P_H < m < (1 - P_L) / (1 - P_H)`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::market::{Contract, Venue};

/// Probabilities are clamped into `[EPSILON, 1 - EPSILON]`.
pub const PROBABILITY_EPSILON: Decimal = dec!(0.000000000001);

const HALF: Decimal = dec!(0.5);

/// How the single recommended multiplier is chosen inside the interval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
pub enum MultiplierPolicy {
    /// Point where both outcomes pay the same profit.
    #[default]
    #[strum(to_string = "equal-profit", serialize = "equal_profit")]
    EqualProfit,
    /// Interval midpoint leaned toward the more liquid venue.
    #[strum(to_string = "volume-skewed", serialize = "volume_skewed")]
    VolumeSkewed,
}

/// Calculator settings, fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatorConfig {
    /// Multiplier policy.
    pub policy: MultiplierPolicy,
    /// Largest skew, as a fraction of the half-range (volume-skewed only).
    pub max_skew: Decimal,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            policy: MultiplierPolicy::EqualProfit,
            max_skew: dec!(0.75),
        }
    }
}

/// One venue's side of a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueQuote {
    /// Venue quoting.
    pub venue: Venue,
    /// Yes-probability.
    pub yes_price: Decimal,
    /// Dollars invested.
    pub volume: Decimal,
}

impl VenueQuote {
    /// Create a new quote.
    pub fn new(venue: Venue, yes_price: Decimal, volume: Decimal) -> Self {
        Self {
            venue,
            yes_price,
            volume,
        }
    }

    /// Quote from a contract, if it carries a yes-price.
    pub fn from_contract(contract: &Contract) -> Option<Self> {
        contract
            .yes_price
            .map(|price| Self::new(contract.venue, price, contract.volume))
    }
}

/// Recommended sizing ratio, or an explicit marker that none is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Multiplier {
    /// Safe multiplier inside the interval.
    Recommended(Decimal),
    /// Interval empty or inverted; do not size from this pair.
    Degenerate,
}

impl Multiplier {
    /// The multiplier, if one exists.
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Multiplier::Recommended(m) => Some(*m),
            Multiplier::Degenerate => None,
        }
    }
}

/// Profit per yes contract as a linear function of the multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoffLine {
    /// Profit at `m = 0`.
    pub intercept: Decimal,
    /// Change in profit per unit of `m`.
    pub slope: Decimal,
}

impl PayoffLine {
    /// Evaluate at multiplier `m`.
    pub fn at(&self, m: Decimal) -> Decimal {
        self.intercept + self.slope * m
    }

    /// Multiplier at which two lines pay the same, if they are not parallel.
    pub fn crossing(&self, other: &PayoffLine) -> Option<Decimal> {
        let slope_gap = other.slope - self.slope;
        if slope_gap.is_zero() {
            None
        } else {
            Some((self.intercept - other.intercept) / slope_gap)
        }
    }
}

/// Arbitrage interval for one matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrageBound {
    /// Venue with the cheaper "yes".
    pub buy_yes_venue: Venue,
    /// Venue with the cheaper "no".
    pub buy_no_venue: Venue,
    /// Clamped lower yes-probability.
    pub low_yes: Decimal,
    /// Clamped higher yes-probability.
    pub high_yes: Decimal,
    /// `P_L / P_H`.
    pub lower_multiple: Decimal,
    /// `(1 - P_L) / (1 - P_H)`.
    pub upper_multiple: Decimal,
    /// Recommended multiplier or degenerate marker.
    pub multiplier: Multiplier,
}

impl ArbitrageBound {
    /// Check if no arbitrage-safe ratio exists.
    pub fn is_degenerate(&self) -> bool {
        matches!(self.multiplier, Multiplier::Degenerate)
    }

    /// Profit lines for the "yes" and "no" outcomes.
    pub fn payoff_lines(&self) -> (PayoffLine, PayoffLine) {
        payoff_lines(self.low_yes, self.high_yes)
    }

    /// Profit per yes contract if the event happens.
    pub fn profit_if_yes(&self, m: Decimal) -> Decimal {
        self.payoff_lines().0.at(m)
    }

    /// Profit per yes contract if the event does not happen.
    pub fn profit_if_no(&self, m: Decimal) -> Decimal {
        self.payoff_lines().1.at(m)
    }

    /// Worst-case profit per yes contract at multiplier `m`.
    pub fn guaranteed_profit(&self, m: Decimal) -> Decimal {
        self.profit_if_yes(m).min(self.profit_if_no(m))
    }
}

/// Compute the arbitrage interval and recommended multiplier for two quotes.
///
/// On equal yes-prices the second quote is treated as the cheaper "yes".
pub fn calculate_bound(
    a: &VenueQuote,
    b: &VenueQuote,
    config: &CalculatorConfig,
) -> ArbitrageBound {
    let (low, high) = if b.yes_price > a.yes_price { (a, b) } else { (b, a) };

    let p_low = clamp_probability(low.yes_price);
    let p_high = clamp_probability(high.yes_price);

    let lower_multiple = p_low / p_high;
    let upper_multiple = (Decimal::ONE - p_low) / (Decimal::ONE - p_high);

    let multiplier = if lower_multiple >= upper_multiple {
        Multiplier::Degenerate
    } else {
        let raw = match config.policy {
            MultiplierPolicy::EqualProfit => equal_profit_multiplier(p_low, p_high),
            MultiplierPolicy::VolumeSkewed => volume_skewed_multiplier(
                lower_multiple,
                upper_multiple,
                low.volume,
                high.volume,
                config.max_skew,
            ),
        };
        Multiplier::Recommended(raw.clamp(lower_multiple, upper_multiple))
    };

    ArbitrageBound {
        buy_yes_venue: low.venue,
        buy_no_venue: high.venue,
        low_yes: p_low,
        high_yes: p_high,
        lower_multiple,
        upper_multiple,
        multiplier,
    }
}

/// Clamp into `[EPSILON, 1 - EPSILON]`; monotone, so ordering is kept.
pub fn clamp_probability(p: Decimal) -> Decimal {
    p.max(PROBABILITY_EPSILON)
        .min(Decimal::ONE - PROBABILITY_EPSILON)
}

fn payoff_lines(p_low: Decimal, p_high: Decimal) -> (PayoffLine, PayoffLine) {
    let if_yes = PayoffLine {
        intercept: Decimal::ONE - p_low,
        slope: -(Decimal::ONE - p_high),
    };
    let if_no = PayoffLine {
        intercept: -p_low,
        slope: p_high,
    };
    (if_yes, if_no)
}

/// Multiplier where the two outcome payoffs are equal.
pub fn equal_profit_multiplier(p_low: Decimal, p_high: Decimal) -> Decimal {
    let (if_yes, if_no) = payoff_lines(p_low, p_high);
    // Slopes differ by exactly one, so the lines always cross.
    if_yes.crossing(&if_no).unwrap_or(Decimal::ONE)
}

/// Interval midpoint shifted toward the cheaper-yes side by its volume share.
pub fn volume_skewed_multiplier(
    lower: Decimal,
    upper: Decimal,
    volume_low: Decimal,
    volume_high: Decimal,
    max_skew: Decimal,
) -> Decimal {
    let volume_low = volume_low.max(Decimal::ZERO);
    let volume_high = volume_high.max(Decimal::ZERO);
    let fraction = match volume_low.checked_add(volume_high) {
        Some(total) if total.is_zero() => HALF,
        Some(total) => volume_low / total,
        // Sum overflows: divide through by the larger volume instead.
        None if volume_low >= volume_high => {
            Decimal::ONE / (Decimal::ONE + volume_high / volume_low)
        }
        None => {
            let ratio = volume_low / volume_high;
            ratio / (Decimal::ONE + ratio)
        }
    };

    let skew = (max_skew * (fraction - HALF) * Decimal::TWO).clamp(-max_skew, max_skew);
    let mid = (lower + upper) / Decimal::TWO;
    let half_range = (upper - lower) / Decimal::TWO;

    mid + skew * half_range
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(venue: Venue, yes: Decimal, volume: Decimal) -> VenueQuote {
        VenueQuote::new(venue, yes, volume)
    }

    fn approx(actual: Decimal, expected: Decimal) -> bool {
        (actual - expected).abs() < dec!(0.0001)
    }

    fn skewed() -> CalculatorConfig {
        CalculatorConfig {
            policy: MultiplierPolicy::VolumeSkewed,
            max_skew: dec!(0.75),
        }
    }

    #[test]
    fn symmetric_prices_give_unit_multiplier() {
        let a = quote(Venue::Kalshi, dec!(0.40), dec!(100));
        let b = quote(Venue::Polymarket, dec!(0.60), dec!(100));

        let bound = calculate_bound(&a, &b, &CalculatorConfig::default());

        assert_eq!(bound.buy_yes_venue, Venue::Kalshi);
        assert_eq!(bound.buy_no_venue, Venue::Polymarket);
        assert!(approx(bound.lower_multiple, dec!(0.6667)));
        assert_eq!(bound.upper_multiple, dec!(1.5));
        assert_eq!(bound.multiplier, Multiplier::Recommended(dec!(1)));
    }

    #[test]
    fn identical_prices_are_degenerate() {
        let a = quote(Venue::Kalshi, dec!(0.50), dec!(10));
        let b = quote(Venue::Polymarket, dec!(0.50), dec!(10));

        let bound = calculate_bound(&a, &b, &CalculatorConfig::default());

        assert_eq!(bound.lower_multiple, Decimal::ONE);
        assert_eq!(bound.upper_multiple, Decimal::ONE);
        assert!(bound.is_degenerate());
        assert_eq!(bound.multiplier.value(), None);
    }

    #[test]
    fn tie_buys_yes_on_second_quote() {
        let a = quote(Venue::Kalshi, dec!(0.50), dec!(10));
        let b = quote(Venue::Polymarket, dec!(0.50), dec!(10));

        let bound = calculate_bound(&a, &b, &CalculatorConfig::default());

        assert_eq!(bound.buy_yes_venue, Venue::Polymarket);
        assert_eq!(bound.buy_no_venue, Venue::Kalshi);
    }

    #[test]
    fn extreme_prices_are_clamped_without_flipping() {
        let a = quote(Venue::Kalshi, dec!(0), dec!(0));
        let b = quote(Venue::Polymarket, dec!(1), dec!(0));

        let bound = calculate_bound(&a, &b, &CalculatorConfig::default());

        assert_eq!(bound.buy_yes_venue, Venue::Kalshi);
        assert_eq!(bound.low_yes, PROBABILITY_EPSILON);
        assert_eq!(bound.high_yes, Decimal::ONE - PROBABILITY_EPSILON);
        assert!(bound.lower_multiple < bound.upper_multiple);
        assert!(!bound.is_degenerate());

        let both_zero = calculate_bound(
            &quote(Venue::Kalshi, dec!(0), dec!(0)),
            &quote(Venue::Polymarket, dec!(0), dec!(0)),
            &CalculatorConfig::default(),
        );
        assert!(both_zero.is_degenerate());
    }

    #[test]
    fn equal_profit_multiplier_stays_inside_interval() {
        for low in 1..99 {
            for high in (low + 1)..100 {
                let p_low = Decimal::new(low, 2);
                let p_high = Decimal::new(high, 2);
                let bound = calculate_bound(
                    &quote(Venue::Kalshi, p_low, dec!(1)),
                    &quote(Venue::Polymarket, p_high, dec!(1)),
                    &CalculatorConfig::default(),
                );

                assert!(bound.lower_multiple <= bound.upper_multiple);
                let m = bound.multiplier.value().expect("non-degenerate");
                assert!(m >= bound.lower_multiple && m <= bound.upper_multiple);
                assert!(approx(bound.profit_if_yes(m), bound.profit_if_no(m)));
                assert!(bound.guaranteed_profit(m) > Decimal::ZERO);
            }
        }
    }

    #[test]
    fn profit_vanishes_at_interval_edges() {
        let bound = calculate_bound(
            &quote(Venue::Kalshi, dec!(0.30), dec!(0)),
            &quote(Venue::Polymarket, dec!(0.45), dec!(0)),
            &CalculatorConfig::default(),
        );

        assert!(approx(bound.profit_if_no(bound.lower_multiple), Decimal::ZERO));
        assert!(approx(bound.profit_if_yes(bound.upper_multiple), Decimal::ZERO));
        // At the equal-profit point the edge is P_H - P_L per yes contract.
        assert!(approx(bound.guaranteed_profit(Decimal::ONE), dec!(0.15)));
    }

    #[test]
    fn volume_skew_is_neutral_for_equal_or_zero_volume() {
        let equal = calculate_bound(
            &quote(Venue::Kalshi, dec!(0.40), dec!(100)),
            &quote(Venue::Polymarket, dec!(0.60), dec!(100)),
            &skewed(),
        );
        let mid = (equal.lower_multiple + equal.upper_multiple) / Decimal::TWO;
        assert_eq!(equal.multiplier, Multiplier::Recommended(mid));

        let zero = calculate_bound(
            &quote(Venue::Kalshi, dec!(0.40), dec!(0)),
            &quote(Venue::Polymarket, dec!(0.60), dec!(0)),
            &skewed(),
        );
        assert_eq!(zero.multiplier, Multiplier::Recommended(mid));
    }

    #[test]
    fn volume_skew_leans_toward_liquid_yes_venue() {
        let bound = calculate_bound(
            &quote(Venue::Kalshi, dec!(0.40), dec!(300)),
            &quote(Venue::Polymarket, dec!(0.60), dec!(100)),
            &skewed(),
        );

        let mid = (bound.lower_multiple + bound.upper_multiple) / Decimal::TWO;
        let half = (bound.upper_multiple - bound.lower_multiple) / Decimal::TWO;
        // fraction 0.75 -> skew 0.75 * 0.25 * 2 = 0.375
        let expected = mid + dec!(0.375) * half;

        let m = bound.multiplier.value().unwrap();
        assert!(approx(m, expected));
        assert!(m > mid);
    }

    #[test]
    fn volume_skew_is_bounded_by_max_skew() {
        let lower = dec!(0.5);
        let upper = dec!(2.5);

        let all_low = volume_skewed_multiplier(lower, upper, dec!(1000), dec!(0), dec!(0.75));
        let all_high = volume_skewed_multiplier(lower, upper, dec!(0), dec!(1000), dec!(0.75));

        assert_eq!(all_low, dec!(1.5) + dec!(0.75));
        assert_eq!(all_high, dec!(1.5) - dec!(0.75));
    }

    #[test]
    fn volume_skew_handles_volumes_near_decimal_max() {
        let lower = dec!(0.5);
        let upper = dec!(2.5);
        let big = Decimal::MAX;
        let third = Decimal::MAX / dec!(3);

        let even = volume_skewed_multiplier(lower, upper, big, big, dec!(0.75));
        let low_heavy = volume_skewed_multiplier(lower, upper, big, third, dec!(0.75));
        let high_heavy = volume_skewed_multiplier(lower, upper, third, big, dec!(0.75));

        assert_eq!(even, dec!(1.5));
        assert!(low_heavy > even && low_heavy <= upper);
        assert!(high_heavy < even && high_heavy >= lower);
    }

    #[test]
    fn payoff_lines_cross_once() {
        let parallel = PayoffLine {
            intercept: dec!(1),
            slope: dec!(2),
        };
        assert_eq!(parallel.crossing(&parallel), None);
        assert_eq!(equal_profit_multiplier(dec!(0.2), dec!(0.7)), Decimal::ONE);
    }

    #[test]
    fn multiplier_serializes_with_status_tag() {
        let recommended = serde_json::to_string(&Multiplier::Recommended(dec!(1.25))).unwrap();
        let degenerate = serde_json::to_string(&Multiplier::Degenerate).unwrap();

        assert_eq!(recommended, r#"{"status":"recommended","value":"1.25"}"#);
        assert_eq!(degenerate, r#"{"status":"degenerate"}"#);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        use std::str::FromStr;
        assert_eq!(
            MultiplierPolicy::from_str("volume-skewed").unwrap(),
            MultiplierPolicy::VolumeSkewed
        );
        assert_eq!(
            MultiplierPolicy::from_str("equal_profit").unwrap(),
            MultiplierPolicy::EqualProfit
        );
        assert_eq!(MultiplierPolicy::EqualProfit.to_string(), "equal-profit");
    }
}
