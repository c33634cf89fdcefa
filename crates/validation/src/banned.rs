//! Default exclusion lists for valuation systems.

use std::collections::BTreeSet;

/// Indicator names that are excluded outright, compared lowercase and trimmed.
pub const DEFAULT_BANNED_INDICATORS: [&str; 7] = [
    "stock to flow",
    "reserve risk",
    "puell multiple",
    "quiverquant sentiment",
    "augmento sentiment",
    "open interest",
    "liquidity",
];

/// Domains whose data is not accepted, matched as substrings of the source URL.
pub const DEFAULT_BANNED_SOURCES: [&str; 1] = ["woobull.com"];

pub fn default_banned_indicators() -> BTreeSet<String> {
    DEFAULT_BANNED_INDICATORS.iter().map(|s| s.to_string()).collect()
}

pub fn default_banned_sources() -> BTreeSet<String> {
    DEFAULT_BANNED_SOURCES.iter().map(|s| s.to_string()).collect()
}
