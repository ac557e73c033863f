//! Cross-venue contract matching.

pub mod engine;

pub use engine::{match_contracts, Match, MatchConfig, MatchOutcome};
