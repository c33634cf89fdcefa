//! Structural rules for LTPI trend systems.

use serde::{Deserialize, Serialize};
use signal_core::{LtpiIndicator, LtpiSystem, SignalError};
use std::collections::BTreeSet;
use tracing::debug;

use crate::result::{Report, Rule, ValidationResult};
use crate::tally;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LtpiRules {
    /// Category 1 (technical) must have exactly this many
    pub c1_exact_count: usize,
    pub c2_min_count: usize,
    pub c2_max_count: usize,
    pub c1_max_per_author: usize,
    pub c2_max_per_author: usize,
    pub max_per_type: usize,
    pub c2_max_per_website: usize,
    pub isp_min_trades: usize,
}

impl Default for LtpiRules {
    fn default() -> Self {
        Self {
            c1_exact_count: 12,
            c2_min_count: 4,
            c2_max_count: 5,
            c1_max_per_author: 1,
            c2_max_per_author: 1,
            max_per_type: 1,
            c2_max_per_website: 2,
            isp_min_trades: 11,
        }
    }
}

impl LtpiRules {
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.c2_min_count > self.c2_max_count {
            return Err(SignalError::InvalidConfig(format!(
                "c2_min_count ({}) exceeds c2_max_count ({})",
                self.c2_min_count, self.c2_max_count
            )));
        }
        if self.max_per_type == 0 {
            return Err(SignalError::InvalidConfig("max_per_type must be at least 1".into()));
        }
        Ok(())
    }
}

type LtpiCheck = fn(&LtpiRules, &LtpiSystem, &mut Report);

const CHECKS: &[LtpiCheck] = &[
    check_counts,
    check_repainting,
    check_author_uniqueness,
    check_cross_category_authors,
    check_type_diversity,
    check_c2_website_diversification,
    check_isp,
    check_completeness,
];

#[derive(Debug, Clone, Default)]
pub struct LtpiValidator {
    rules: LtpiRules,
}

impl LtpiValidator {
    pub fn new(rules: LtpiRules) -> Result<Self, SignalError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &LtpiRules {
        &self.rules
    }

    pub fn validate(&self, system: &LtpiSystem) -> ValidationResult {
        let mut report = Report::default();
        for check in CHECKS {
            check(&self.rules, system, &mut report);
        }
        let result = report.finish();
        debug!(
            asset = %system.asset,
            c1 = system.technical.len(),
            c2 = system.on_chain.len(),
            "LTPI validation: {}",
            result.summary()
        );
        result
    }
}

/// Both categories with their report label.
fn categories(system: &LtpiSystem) -> [(&'static str, &[LtpiIndicator]); 2] {
    [("C1", &system.technical), ("C2", &system.on_chain)]
}

fn check_counts(rules: &LtpiRules, system: &LtpiSystem, report: &mut Report) {
    let c1 = system.technical.len();
    let c2 = system.on_chain.len();

    if c1 != rules.c1_exact_count {
        report.error(
            Rule::C1Count,
            format!(
                "Category 1 requires exactly {} indicators, have {}",
                rules.c1_exact_count, c1
            ),
        );
    }
    if !(rules.c2_min_count..=rules.c2_max_count).contains(&c2) {
        report.error(
            Rule::C2Count,
            format!(
                "Category 2 requires {}-{} indicators, have {}",
                rules.c2_min_count, rules.c2_max_count, c2
            ),
        );
    }
}

fn check_repainting(_rules: &LtpiRules, system: &LtpiSystem, report: &mut Report) {
    for ind in system.all_indicators().filter(|i| i.repaints) {
        report.indicator_error(
            Rule::Repainting,
            &ind.name,
            format!("'{}' repaints, automatic fail", ind.name),
        );
    }
}

fn check_author_uniqueness(rules: &LtpiRules, system: &LtpiSystem, report: &mut Report) {
    for (label, indicators) in categories(system) {
        let (rule, max_per) = if label == "C1" {
            (Rule::C1AuthorUniqueness, rules.c1_max_per_author)
        } else {
            (Rule::C2AuthorUniqueness, rules.c2_max_per_author)
        };
        for (author, count) in tally(indicators.iter().map(|i| i.author.to_lowercase())) {
            if count > max_per {
                report.error(
                    rule,
                    format!(
                        "{}: Max {} indicator per author, have {} from '{}'",
                        label, max_per, count, author
                    ),
                );
            }
        }
    }
}

fn check_cross_category_authors(_rules: &LtpiRules, system: &LtpiSystem, report: &mut Report) {
    let c1: BTreeSet<String> = system.technical.iter().map(|i| i.author.to_lowercase()).collect();
    let c2: BTreeSet<String> = system.on_chain.iter().map(|i| i.author.to_lowercase()).collect();
    let overlap: Vec<&str> = c1.intersection(&c2).map(String::as_str).collect();

    if !overlap.is_empty() {
        report.error(
            Rule::CrossCategoryAuthors,
            format!("Authors used in both C1 and C2: {}", overlap.join(", ")),
        );
    }
}

fn check_type_diversity(rules: &LtpiRules, system: &LtpiSystem, report: &mut Report) {
    for (label, indicators) in categories(system) {
        let rule = if label == "C1" {
            Rule::C1TypeDiversity
        } else {
            Rule::C2TypeDiversity
        };
        for (kind, count) in tally(indicators.iter().map(|i| i.indicator_type.to_lowercase())) {
            if count > rules.max_per_type {
                report.error(
                    rule,
                    format!(
                        "{}: Duplicate indicator type '{}' ({} instances). Max {} per type.",
                        label, kind, count, rules.max_per_type
                    ),
                );
            }
        }
    }
}

fn check_c2_website_diversification(rules: &LtpiRules, system: &LtpiSystem, report: &mut Report) {
    for (site, count) in tally(system.on_chain.iter().map(|i| i.source_website.to_lowercase())) {
        if count > rules.c2_max_per_website {
            report.error(
                Rule::C2WebsiteDiversification,
                format!(
                    "C2: Max {} per website, have {} from '{}'",
                    rules.c2_max_per_website, count, site
                ),
            );
        }
    }
}

fn check_isp(rules: &LtpiRules, system: &LtpiSystem, report: &mut Report) {
    let Some(isp) = &system.isp else {
        report.warning(Rule::IspMissing, "No Intended Signal Period defined");
        return;
    };

    let trades = isp.trade_count();
    if trades < rules.isp_min_trades {
        report.warning(
            Rule::IspMinTrades,
            format!(
                "ISP has {} trades, recommended minimum is {}",
                trades, rules.isp_min_trades
            ),
        );
    }
}

fn check_completeness(_rules: &LtpiRules, system: &LtpiSystem, report: &mut Report) {
    for ind in system.all_indicators() {
        if ind.scoring_criteria.trim().is_empty() {
            report.indicator_error(
                Rule::MissingScoring,
                &ind.name,
                format!("'{}': Missing scoring criteria", ind.name),
            );
        }
        if ind.comment.trim().is_empty() {
            report.indicator_error(
                Rule::MissingComment,
                &ind.name,
                format!("'{}': Missing comment", ind.name),
            );
        }
        if ind.source_url.trim().is_empty() {
            report.indicator_error(
                Rule::MissingSource,
                &ind.name,
                format!("'{}': Missing source URL", ind.name),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use signal_core::{
        AssetClass, IntendedSignalPeriod, IspSignal, LtpiCategory, LtpiIndicatorDraft,
        TrendDirection,
    };

    fn indicator(
        name: &str,
        category: LtpiCategory,
        author: &str,
        kind: &str,
        website: &str,
    ) -> LtpiIndicator {
        LtpiIndicator::new(LtpiIndicatorDraft {
            name: name.to_string(),
            category,
            source_url: format!("https://{}/{}", website, name.to_lowercase().replace(' ', "-")),
            source_website: website.to_string(),
            author: author.to_string(),
            indicator_type: kind.to_string(),
            scoring_criteria: "Long when above zero, short when below".to_string(),
            comment: "Measures momentum on the daily close.".to_string(),
            score: 1,
            repaints: false,
        })
        .unwrap()
    }

    fn isp(directions: usize) -> IntendedSignalPeriod {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        IntendedSignalPeriod {
            start_date: start,
            end_date: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
            timeframe: "1D".to_string(),
            signals: (0..directions)
                .map(|i| IspSignal {
                    date: start + chrono::Duration::days(i as i64),
                    direction: if i % 2 == 0 {
                        TrendDirection::Long
                    } else {
                        TrendDirection::Short
                    },
                })
                .collect(),
        }
    }

    /// 12 C1 and 5 C2 indicators with distinct authors and types.
    fn valid_system() -> LtpiSystem {
        LtpiSystem {
            asset: AssetClass::Btc,
            technical: (0..12)
                .map(|i| {
                    indicator(
                        &format!("Tech {}", i + 1),
                        LtpiCategory::TechnicalBtc,
                        &format!("author_c1_{}", i),
                        &format!("type_{}", i),
                        "tradingview.com",
                    )
                })
                .collect(),
            on_chain: (0..5)
                .map(|i| {
                    indicator(
                        &format!("OnChain {}", i + 1),
                        LtpiCategory::OnChain,
                        &format!("author_c2_{}", i),
                        &format!("onchain_type_{}", i),
                        &format!("onchain-{}.com", i),
                    )
                })
                .collect(),
            isp: Some(isp(14)),
            date_updated: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        }
    }

    fn has_error(result: &ValidationResult, rule: Rule) -> bool {
        result.errors.iter().any(|e| e.rule == rule)
    }

    #[test]
    fn test_valid_system_passes() {
        let result = LtpiValidator::default().validate(&valid_system());
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_wrong_counts() {
        let mut sys = valid_system();
        sys.technical.truncate(10);
        sys.on_chain.truncate(2);
        let result = LtpiValidator::default().validate(&sys);
        assert!(has_error(&result, Rule::C1Count));
        assert!(has_error(&result, Rule::C2Count));
        assert_eq!(
            result.errors[0].message,
            "Category 1 requires exactly 12 indicators, have 10"
        );
        assert_eq!(result.errors[1].message, "Category 2 requires 4-5 indicators, have 2");
    }

    #[test]
    fn test_four_on_chain_is_enough() {
        let mut sys = valid_system();
        sys.on_chain.truncate(4);
        assert!(LtpiValidator::default().validate(&sys).is_valid);
    }

    #[test]
    fn test_duplicate_author_is_case_insensitive() {
        let mut sys = valid_system();
        sys.technical[0].author = "Same_Author".to_string();
        sys.technical[1].author = "same_author".to_string();
        let result = LtpiValidator::default().validate(&sys);
        assert!(has_error(&result, Rule::C1AuthorUniqueness));
        assert!(!has_error(&result, Rule::C2AuthorUniqueness));
    }

    #[test]
    fn test_cross_category_author_overlap() {
        let mut sys = valid_system();
        sys.technical[0].author = "shared_author".to_string();
        sys.on_chain[0].author = "Shared_Author".to_string();
        let result = LtpiValidator::default().validate(&sys);
        assert!(!result.is_valid);
        let err = result
            .errors
            .iter()
            .find(|e| e.rule == Rule::CrossCategoryAuthors)
            .unwrap();
        assert_eq!(err.message, "Authors used in both C1 and C2: shared_author");
    }

    #[test]
    fn test_duplicate_indicator_type() {
        let mut sys = valid_system();
        sys.technical[0].indicator_type = "SuperTrend".to_string();
        sys.technical[1].indicator_type = "supertrend".to_string();
        let result = LtpiValidator::default().validate(&sys);
        assert!(has_error(&result, Rule::C1TypeDiversity));
    }

    #[test]
    fn test_c2_website_diversification() {
        let mut sys = valid_system();
        for ind in sys.on_chain.iter_mut().take(3) {
            ind.source_website = "Glassnode.com".to_string();
        }
        let result = LtpiValidator::default().validate(&sys);
        let err = result
            .errors
            .iter()
            .find(|e| e.rule == Rule::C2WebsiteDiversification)
            .unwrap();
        assert_eq!(err.message, "C2: Max 2 per website, have 3 from 'glassnode.com'");
    }

    #[test]
    fn test_repainting_indicator_fails() {
        let mut sys = valid_system();
        sys.technical[3].repaints = true;
        let result = LtpiValidator::default().validate(&sys);
        assert!(has_error(&result, Rule::Repainting));
        assert_eq!(result.errors[0].indicator_name.as_deref(), Some("Tech 4"));
    }

    #[test]
    fn test_isp_warnings_do_not_invalidate() {
        let mut sys = valid_system();
        sys.isp = None;
        let result = LtpiValidator::default().validate(&sys);
        assert!(result.is_valid);
        assert_eq!(result.warnings[0].rule, Rule::IspMissing);

        // 6 signals give 5 direction changes
        sys.isp = Some(isp(6));
        let result = LtpiValidator::default().validate(&sys);
        assert!(result.is_valid);
        assert_eq!(result.warnings[0].rule, Rule::IspMinTrades);
        assert_eq!(
            result.warnings[0].message,
            "ISP has 5 trades, recommended minimum is 11"
        );
    }

    #[test]
    fn test_missing_fields_are_separate_errors() {
        let mut sys = valid_system();
        sys.on_chain[1].scoring_criteria.clear();
        sys.on_chain[1].comment = " ".to_string();
        sys.on_chain[1].source_url.clear();
        let result = LtpiValidator::default().validate(&sys);
        let rules: Vec<Rule> = result.errors.iter().map(|e| e.rule).collect();
        assert_eq!(
            rules,
            vec![Rule::MissingScoring, Rule::MissingComment, Rule::MissingSource]
        );
        assert!(result
            .errors
            .iter()
            .all(|e| e.indicator_name.as_deref() == Some("OnChain 2")));
    }

    #[test]
    fn test_rules_validate() {
        let rules = LtpiRules {
            c2_min_count: 6,
            ..LtpiRules::default()
        };
        assert!(LtpiValidator::new(rules).is_err());
        assert!(LtpiValidator::new(LtpiRules::default()).is_ok());
    }
}
