//! Structural rules for SDCA valuation systems.

use serde::{Deserialize, Serialize};
use signal_core::{IndicatorSource, SdcaCategory, SdcaSystem, SignalError};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::banned::{default_banned_indicators, default_banned_sources};
use crate::result::{Report, Rule, ValidationResult};
use crate::tally;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdcaRules {
    pub min_total: usize,
    pub min_fundamental: usize,
    pub min_technical: usize,
    pub min_sentiment: usize,
    /// Indicators taken from the shared reference sheet
    pub max_reference_sheet: usize,
    pub max_per_website_per_category: usize,
    pub max_tv_per_author: usize,
    /// Characters, per documentation field
    pub min_comment_length: usize,
    pub banned_indicators: BTreeSet<String>,
    pub banned_sources: BTreeSet<String>,
}

impl Default for SdcaRules {
    fn default() -> Self {
        Self {
            min_total: 15,
            min_fundamental: 5,
            min_technical: 5,
            min_sentiment: 2,
            max_reference_sheet: 5,
            max_per_website_per_category: 2,
            max_tv_per_author: 2,
            min_comment_length: 50,
            banned_indicators: default_banned_indicators(),
            banned_sources: default_banned_sources(),
        }
    }
}

impl SdcaRules {
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.max_reference_sheet > self.min_total {
            return Err(SignalError::InvalidConfig(format!(
                "max_reference_sheet ({}) cannot exceed min_total ({})",
                self.max_reference_sheet, self.min_total
            )));
        }
        Ok(())
    }

    fn min_for(&self, category: SdcaCategory) -> usize {
        match category {
            SdcaCategory::Fundamental => self.min_fundamental,
            SdcaCategory::Technical => self.min_technical,
            SdcaCategory::Sentiment => self.min_sentiment,
        }
    }
}

type SdcaCheck = fn(&SdcaRules, &SdcaSystem, &mut Report);

/// Run in order; every check sees the whole system and reports independently.
const CHECKS: &[SdcaCheck] = &[
    check_counts,
    check_originality,
    check_banned,
    check_source_diversification,
    check_completeness,
    check_decay,
];

#[derive(Debug, Clone, Default)]
pub struct SdcaValidator {
    rules: SdcaRules,
}

impl SdcaValidator {
    pub fn new(rules: SdcaRules) -> Result<Self, SignalError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &SdcaRules {
        &self.rules
    }

    pub fn validate(&self, system: &SdcaSystem) -> ValidationResult {
        let mut report = Report::default();
        for check in CHECKS {
            check(&self.rules, system, &mut report);
        }
        let result = report.finish();
        debug!(
            asset = %system.asset,
            indicators = system.indicators.len(),
            "SDCA validation: {}",
            result.summary()
        );
        result
    }
}

fn check_counts(rules: &SdcaRules, system: &SdcaSystem, report: &mut Report) {
    let total = system.indicators.len();
    if total < rules.min_total {
        report.error(
            Rule::MinTotal,
            format!("Need at least {} indicators, have {}", rules.min_total, total),
        );
    }

    for category in SdcaCategory::ALL {
        let count = system.count_in(category);
        let minimum = rules.min_for(category);
        if count < minimum {
            let rule = match category {
                SdcaCategory::Fundamental => Rule::MinFundamental,
                SdcaCategory::Technical => Rule::MinTechnical,
                SdcaCategory::Sentiment => Rule::MinSentiment,
            };
            report.error(
                rule,
                format!("Need at least {} {} indicators, have {}", minimum, category, count),
            );
        }
    }
}

fn check_originality(rules: &SdcaRules, system: &SdcaSystem, report: &mut Report) {
    let total = system.indicators.len();
    let from_sheet = system
        .indicators
        .iter()
        .filter(|i| i.provided_by == IndicatorSource::ReferenceSheet)
        .count();

    if from_sheet > rules.max_reference_sheet {
        report.error(
            Rule::MaxReferenceSheet,
            format!(
                "Max {} from reference sheet, have {}",
                rules.max_reference_sheet, from_sheet
            ),
        );
    }

    // Only meaningful once the total itself is satisfied
    let original = total - from_sheet;
    let min_original = rules.min_total.saturating_sub(rules.max_reference_sheet);
    if total >= rules.min_total && original < min_original {
        report.error(
            Rule::MinOriginal,
            format!("Need at least {} original indicators, have {}", min_original, original),
        );
    }
}

fn check_banned(rules: &SdcaRules, system: &SdcaSystem, report: &mut Report) {
    for ind in &system.indicators {
        let name = ind.name.trim().to_lowercase();
        if rules.banned_indicators.contains(&name) {
            report.indicator_error(
                Rule::BannedIndicator,
                &ind.name,
                format!("'{}' is a banned indicator", ind.name),
            );
        }

        let url = ind.source_url.to_lowercase();
        for domain in rules.banned_sources.iter().filter(|d| url.contains(d.as_str())) {
            report.indicator_error(
                Rule::BannedSource,
                &ind.name,
                format!("'{}' uses a banned source ({})", ind.name, domain),
            );
        }
    }
}

fn check_source_diversification(rules: &SdcaRules, system: &SdcaSystem, report: &mut Report) {
    let mut by_category: BTreeMap<SdcaCategory, BTreeMap<String, usize>> = BTreeMap::new();
    for ind in &system.indicators {
        *by_category
            .entry(ind.category)
            .or_default()
            .entry(ind.source_website.clone())
            .or_insert(0) += 1;
    }

    for (category, sites) in &by_category {
        for (site, count) in sites {
            if *count > rules.max_per_website_per_category {
                report.error(
                    Rule::SourceDiversification,
                    format!(
                        "Max {} {} indicators per website, have {} from {}",
                        rules.max_per_website_per_category, category, count, site
                    ),
                );
            }
        }
    }

    let tv_authors = tally(system.indicators.iter().filter_map(|ind| {
        let on_tradingview = ind.source_website.to_lowercase().contains("tradingview");
        match ind.source_author.as_deref() {
            Some(author) if on_tradingview && !author.is_empty() => Some(author.to_string()),
            _ => None,
        }
    }));
    for (author, count) in tv_authors {
        if count > rules.max_tv_per_author {
            report.warning(
                Rule::TvAuthorDiversification,
                format!(
                    "Max {} indicators per TradingView author, have {} from '{}'",
                    rules.max_tv_per_author, count, author
                ),
            );
        }
    }
}

fn check_completeness(rules: &SdcaRules, system: &SdcaSystem, report: &mut Report) {
    for ind in &system.indicators {
        if ind.source_url.trim().is_empty() {
            report.indicator_error(
                Rule::MissingSource,
                &ind.name,
                format!("'{}': Missing source URL", ind.name),
            );
        }

        for (field, text) in ind.comments.fields() {
            let length = text.chars().count();
            if length < rules.min_comment_length {
                report.indicator_warning(
                    Rule::CommentDepth,
                    &ind.name,
                    format!(
                        "'{}': {} is too brief ({} chars, need {}+)",
                        ind.name, field, length, rules.min_comment_length
                    ),
                );
            }
        }
    }
}

fn check_decay(_rules: &SdcaRules, system: &SdcaSystem, report: &mut Report) {
    for ind in &system.indicators {
        let documented = ind
            .decay_description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        if ind.has_decay && !documented {
            report.indicator_error(
                Rule::DecayUndocumented,
                &ind.name,
                format!("'{}' is flagged as decaying but has no decay description", ind.name),
            );
        }
    }
}
