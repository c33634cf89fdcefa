use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the rule that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    // Valuation systems
    MinTotal,
    MinFundamental,
    MinTechnical,
    MinSentiment,
    MaxReferenceSheet,
    MinOriginal,
    BannedIndicator,
    BannedSource,
    SourceDiversification,
    TvAuthorDiversification,
    MissingSource,
    CommentDepth,
    DecayUndocumented,
    // Trend systems
    C1Count,
    C2Count,
    Repainting,
    C1AuthorUniqueness,
    C2AuthorUniqueness,
    CrossCategoryAuthors,
    C1TypeDiversity,
    C2TypeDiversity,
    C2WebsiteDiversification,
    IspMissing,
    IspMinTrades,
    MissingScoring,
    MissingComment,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::MinTotal => "min_total",
            Rule::MinFundamental => "min_fundamental",
            Rule::MinTechnical => "min_technical",
            Rule::MinSentiment => "min_sentiment",
            Rule::MaxReferenceSheet => "max_reference_sheet",
            Rule::MinOriginal => "min_original",
            Rule::BannedIndicator => "banned_indicator",
            Rule::BannedSource => "banned_source",
            Rule::SourceDiversification => "source_diversification",
            Rule::TvAuthorDiversification => "tv_author_diversification",
            Rule::MissingSource => "missing_source",
            Rule::CommentDepth => "comment_depth",
            Rule::DecayUndocumented => "decay_undocumented",
            Rule::C1Count => "c1_count",
            Rule::C2Count => "c2_count",
            Rule::Repainting => "repainting",
            Rule::C1AuthorUniqueness => "c1_author_uniqueness",
            Rule::C2AuthorUniqueness => "c2_author_uniqueness",
            Rule::CrossCategoryAuthors => "cross_category_authors",
            Rule::C1TypeDiversity => "c1_type_diversity",
            Rule::C2TypeDiversity => "c2_type_diversity",
            Rule::C2WebsiteDiversification => "c2_website_diversification",
            Rule::IspMissing => "isp_missing",
            Rule::IspMinTrades => "isp_min_trades",
            Rule::MissingScoring => "missing_scoring",
            Rule::MissingComment => "missing_comment",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors block submission, warnings are advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub rule: Rule,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_rule(&self, rule: Rule) -> bool {
        self.errors.iter().chain(&self.warnings).any(|i| i.rule == rule)
    }

    pub fn summary(&self) -> String {
        if self.is_valid {
            format!("Valid ({} warnings)", self.warnings.len())
        } else {
            format!(
                "Invalid: {} errors, {} warnings",
                self.errors.len(),
                self.warnings.len()
            )
        }
    }
}

/// Collects issues while the checkers run.
#[derive(Debug, Default)]
pub struct Report {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Report {
    pub fn error(&mut self, rule: Rule, message: impl Into<String>) {
        self.push(rule, message.into(), Severity::Error, None);
    }

    pub fn indicator_error(&mut self, rule: Rule, indicator: &str, message: impl Into<String>) {
        self.push(rule, message.into(), Severity::Error, Some(indicator));
    }

    pub fn warning(&mut self, rule: Rule, message: impl Into<String>) {
        self.push(rule, message.into(), Severity::Warning, None);
    }

    pub fn indicator_warning(&mut self, rule: Rule, indicator: &str, message: impl Into<String>) {
        self.push(rule, message.into(), Severity::Warning, Some(indicator));
    }

    fn push(&mut self, rule: Rule, message: String, severity: Severity, indicator: Option<&str>) {
        let issue = ValidationIssue {
            rule,
            message,
            severity,
            indicator_name: indicator.map(str::to_string),
        };
        match severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    pub fn finish(self) -> ValidationResult {
        ValidationResult {
            is_valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}
