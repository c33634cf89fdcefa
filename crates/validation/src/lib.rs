//! Rule checkers for SDCA valuation and LTPI trend systems.

pub mod banned;
pub mod ltpi;
pub mod result;
pub mod sdca;

pub use banned::{DEFAULT_BANNED_INDICATORS, DEFAULT_BANNED_SOURCES};
pub use ltpi::{LtpiRules, LtpiValidator};
pub use result::{Rule, Severity, ValidationIssue, ValidationResult};
pub use sdca::{SdcaRules, SdcaValidator};

use std::collections::BTreeMap;

/// Occurrence counts keyed by value.
pub(crate) fn tally(items: impl IntoIterator<Item = String>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}
