//! Structurally valid systems shared by the unit tests.

use chrono::NaiveDate;
use signal_core::{
    AssetClass, IndicatorSource, IntendedSignalPeriod, IspSignal, LtpiCategory, LtpiIndicator,
    LtpiIndicatorDraft, LtpiSystem, SdcaCategory, SdcaComments, SdcaIndicator,
    SdcaIndicatorDraft, SdcaSystem, TrendDirection,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sdca_indicator(name: String, category: SdcaCategory, z_score: f64) -> SdcaIndicator {
    let website = format!("{}.example.com", name.to_lowercase().replace(' ', "-"));
    SdcaIndicator::new(SdcaIndicatorDraft {
        name,
        category,
        source_url: format!("https://{}/chart", website),
        source_website: website,
        source_author: None,
        provided_by: IndicatorSource::OwnResearch,
        z_score,
        date_updated: date(2024, 6, 1),
        comments: SdcaComments {
            why_chosen: "W".repeat(60),
            how_it_works: "H".repeat(60),
            scoring_logic: "S".repeat(60),
        },
        has_decay: false,
        decay_description: None,
        is_logarithmic: false,
        is_normalized: false,
    })
    .unwrap()
}

/// 5 fundamental, 7 technical and 3 sentiment indicators, all at `z_score`.
pub fn sdca_system(asset: AssetClass, z_score: f64) -> SdcaSystem {
    let layout = [
        (SdcaCategory::Fundamental, 5),
        (SdcaCategory::Technical, 7),
        (SdcaCategory::Sentiment, 3),
    ];
    let indicators = layout
        .iter()
        .flat_map(|(category, count)| {
            (0..*count).map(move |i| {
                sdca_indicator(format!("{} {}", category, i + 1), *category, z_score)
            })
        })
        .collect();
    SdcaSystem {
        asset,
        indicators,
        date_updated: date(2024, 6, 1),
    }
}

fn ltpi_indicator(name: String, category: LtpiCategory, author: String, score: i32) -> LtpiIndicator {
    let slug = name.to_lowercase().replace(' ', "-");
    LtpiIndicator::new(LtpiIndicatorDraft {
        source_url: format!("https://{}.example.com/script", slug),
        source_website: format!("{}.example.com", slug),
        indicator_type: format!("{}-type", slug),
        name,
        category,
        author,
        scoring_criteria: "Long above the baseline, short below".to_string(),
        comment: "Daily close only, no repainting.".to_string(),
        score,
        repaints: false,
    })
    .unwrap()
}

/// 12 technical and 5 on-chain indicators, all scoring `score`, with an ISP of
/// 13 trades.
pub fn ltpi_system(asset: AssetClass, score: i32) -> LtpiSystem {
    let start = date(2020, 1, 1);
    LtpiSystem {
        asset,
        technical: (0..12)
            .map(|i| {
                ltpi_indicator(
                    format!("Tech {}", i + 1),
                    LtpiCategory::TechnicalBtc,
                    format!("c1_author_{}", i),
                    score,
                )
            })
            .collect(),
        on_chain: (0..5)
            .map(|i| {
                ltpi_indicator(
                    format!("Chain {}", i + 1),
                    LtpiCategory::OnChain,
                    format!("c2_author_{}", i),
                    score,
                )
            })
            .collect(),
        isp: Some(IntendedSignalPeriod {
            start_date: start,
            end_date: date(2024, 1, 1),
            timeframe: "1D".to_string(),
            signals: (0..14)
                .map(|i| IspSignal {
                    date: start + chrono::Duration::days(30 * i),
                    direction: if i % 2 == 0 {
                        TrendDirection::Long
                    } else {
                        TrendDirection::Short
                    },
                })
                .collect(),
        }),
        date_updated: date(2024, 6, 1),
    }
}
