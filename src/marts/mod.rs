//! Mart definitions shared by the batch pipeline and the query facade
//!
//! Each use case names the logical columns it needs and the marts it
//! produces. A mart is a pure function of the enriched records and
//! `MartSettings`, so the batch writer and the facade always agree.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use tracing::debug;

use crate::config::Config;
use crate::constants::*;
use crate::error::{MartError, Result};
use crate::metrics::MartMetrics;
use crate::pipeline::processing::aggregate::MartTable;
use crate::pipeline::processing::enrich::EnrichedRecord;
use crate::pipeline::processing::normalize::LogicalColumn;

pub mod pricing;
pub mod reviews;
pub mod segments;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseCase {
    PricingByTime,
    ReviewsVsPrice,
    MarketSegments,
}

impl UseCase {
    pub const ALL: [UseCase; 3] = [
        UseCase::PricingByTime,
        UseCase::ReviewsVsPrice,
        UseCase::MarketSegments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::PricingByTime => "pricing",
            UseCase::ReviewsVsPrice => "reviews",
            UseCase::MarketSegments => "segments",
        }
    }

    /// Logical columns the source must provide after remapping
    pub fn required_columns(&self) -> &'static [LogicalColumn] {
        match self {
            UseCase::PricingByTime => &[
                LogicalColumn::Name,
                LogicalColumn::Price,
                LogicalColumn::ReleaseDate,
            ],
            UseCase::ReviewsVsPrice => &[
                LogicalColumn::Name,
                LogicalColumn::Price,
                LogicalColumn::Genres,
                LogicalColumn::Publishers,
                LogicalColumn::Positive,
                LogicalColumn::Negative,
            ],
            UseCase::MarketSegments => &[
                LogicalColumn::Name,
                LogicalColumn::Price,
                LogicalColumn::Genres,
            ],
        }
    }

    pub fn marts(&self) -> &'static [MartKind] {
        match self {
            UseCase::PricingByTime => &[
                MartKind::PricingBySeason,
                MartKind::PricingByMonth,
                MartKind::PricingByGenre,
                MartKind::PricingByOwners,
            ],
            UseCase::ReviewsVsPrice => &[
                MartKind::ReviewFeatures,
                MartKind::GenreReviewRatio,
                MartKind::PublisherReviewRatio,
            ],
            UseCase::MarketSegments => &[
                MartKind::SegmentRows,
                MartKind::FreeVsPaid,
                MartKind::GenrePriceSegments,
            ],
        }
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UseCase {
    type Err = MartError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pricing" | "pricing_by_time" | "q1" => Ok(UseCase::PricingByTime),
            "reviews" | "reviews_vs_price" | "q2" => Ok(UseCase::ReviewsVsPrice),
            "segments" | "market_segments" | "q3" => Ok(UseCase::MarketSegments),
            other => Err(MartError::InvalidQuery(format!("unknown use case '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MartKind {
    PricingBySeason,
    PricingByMonth,
    PricingByGenre,
    PricingByOwners,
    ReviewFeatures,
    GenreReviewRatio,
    PublisherReviewRatio,
    SegmentRows,
    FreeVsPaid,
    GenrePriceSegments,
}

impl MartKind {
    pub const ALL: [MartKind; 10] = [
        MartKind::PricingBySeason,
        MartKind::PricingByMonth,
        MartKind::PricingByGenre,
        MartKind::PricingByOwners,
        MartKind::ReviewFeatures,
        MartKind::GenreReviewRatio,
        MartKind::PublisherReviewRatio,
        MartKind::SegmentRows,
        MartKind::FreeVsPaid,
        MartKind::GenrePriceSegments,
    ];

    /// Output table name, also the file stem
    pub fn name(&self) -> &'static str {
        match self {
            MartKind::PricingBySeason => Q1_BY_SEASON,
            MartKind::PricingByMonth => Q1_BY_MONTH,
            MartKind::PricingByGenre => Q1_BY_GENRE,
            MartKind::PricingByOwners => Q1_BY_OWNERS,
            MartKind::ReviewFeatures => Q2_FEATURES,
            MartKind::GenreReviewRatio => Q2_GENRE,
            MartKind::PublisherReviewRatio => Q2_PUBLISHER,
            MartKind::SegmentRows => Q3_ROWS,
            MartKind::FreeVsPaid => Q3_FREE_VS_PAID,
            MartKind::GenrePriceSegments => Q3_GENRE,
        }
    }

    pub fn use_case(&self) -> UseCase {
        match self {
            MartKind::PricingBySeason
            | MartKind::PricingByMonth
            | MartKind::PricingByGenre
            | MartKind::PricingByOwners => UseCase::PricingByTime,
            MartKind::ReviewFeatures
            | MartKind::GenreReviewRatio
            | MartKind::PublisherReviewRatio => UseCase::ReviewsVsPrice,
            MartKind::SegmentRows | MartKind::FreeVsPaid | MartKind::GenrePriceSegments => {
                UseCase::MarketSegments
            }
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }
}

impl fmt::Display for MartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MartKind {
    type Err = MartError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().trim_end_matches(".csv");
        MartKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MartError::InvalidQuery(format!("unknown mart '{}'", s)))
    }
}

/// Thresholds and switches the mart builders read from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MartSettings {
    pub genre_delimiter: String,
    pub paid_only: bool,
    pub min_total_reviews: u64,
    pub min_games_per_publisher: usize,
    pub min_games_per_genre: usize,
}

impl MartSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            genre_delimiter: config.rules.genre_delimiter.clone(),
            paid_only: config.pricing.paid_only,
            min_total_reviews: config.reviews.min_total_reviews,
            min_games_per_publisher: config.reviews.min_games_per_publisher,
            min_games_per_genre: config.segments.min_games_per_genre,
        }
    }
}

impl Default for MartSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Build one mart from enriched records
pub fn build_mart(kind: MartKind, records: &[EnrichedRecord], settings: &MartSettings) -> MartTable {
    let started = Instant::now();
    let delimiter = settings.genre_delimiter.as_str();

    let table = match kind {
        MartKind::PricingBySeason => {
            pricing::by_season(&pricing::time_scope(records, settings.paid_only))
        }
        MartKind::PricingByMonth => {
            pricing::by_month(&pricing::time_scope(records, settings.paid_only))
        }
        MartKind::PricingByGenre => {
            pricing::by_genre(&pricing::price_scope(records, settings.paid_only), delimiter)
        }
        MartKind::PricingByOwners => {
            pricing::by_owners(&pricing::price_scope(records, settings.paid_only))
        }
        MartKind::ReviewFeatures => {
            reviews::features(&reviews::review_scope(records, settings.min_total_reviews))
        }
        MartKind::GenreReviewRatio => reviews::genre_review_ratio(
            &reviews::review_scope(records, settings.min_total_reviews),
            delimiter,
        ),
        MartKind::PublisherReviewRatio => reviews::publisher_review_ratio(
            &reviews::review_scope(records, settings.min_total_reviews),
            delimiter,
            settings.min_games_per_publisher,
        ),
        MartKind::SegmentRows => segments::segment_rows(records),
        MartKind::FreeVsPaid => segments::free_vs_paid(records),
        MartKind::GenrePriceSegments => {
            segments::genre_price_segments(records, delimiter, settings.min_games_per_genre)
        }
    };

    let elapsed = started.elapsed().as_secs_f64();
    MartMetrics::record_build(kind.name(), table.len(), elapsed);
    debug!(mart = kind.name(), rows = table.len(), elapsed_secs = elapsed, "built mart");
    table
}

/// Build every mart of a use case, in declaration order
pub fn build_use_case(
    use_case: UseCase,
    records: &[EnrichedRecord],
    settings: &MartSettings,
) -> Vec<(MartKind, MartTable)> {
    use_case
        .marts()
        .iter()
        .map(|kind| (*kind, build_mart(*kind, records, settings)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::CleanRecord;

    #[test]
    fn test_every_mart_belongs_to_its_use_case() {
        for use_case in UseCase::ALL {
            for kind in use_case.marts() {
                assert_eq!(kind.use_case(), use_case);
            }
        }
        let total: usize = UseCase::ALL.iter().map(|u| u.marts().len()).sum();
        assert_eq!(total, MartKind::ALL.len());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("q3_free_vs_paid".parse::<MartKind>().unwrap(), MartKind::FreeVsPaid);
        assert_eq!(
            "q1_pricing_by_season.csv".parse::<MartKind>().unwrap(),
            MartKind::PricingBySeason
        );
        assert!("q9_nothing".parse::<MartKind>().is_err());
        assert_eq!("Reviews".parse::<UseCase>().unwrap(), UseCase::ReviewsVsPrice);
        assert!("weather".parse::<UseCase>().is_err());
    }

    #[test]
    fn test_reviews_require_review_columns() {
        let required = UseCase::ReviewsVsPrice.required_columns();
        assert!(required.contains(&LogicalColumn::Positive));
        assert!(required.contains(&LogicalColumn::Negative));
        assert!(!UseCase::MarketSegments
            .required_columns()
            .contains(&LogicalColumn::Positive));
    }

    #[test]
    fn test_build_use_case_names_tables() {
        let records = vec![EnrichedRecord::new(CleanRecord::new("A", 4.99))];
        let tables = build_use_case(UseCase::MarketSegments, &records, &MartSettings::default());
        let names: Vec<&str> = tables.iter().map(|(_, t)| t.name.as_str()).collect();
        assert_eq!(names, vec![Q3_ROWS, Q3_FREE_VS_PAID, Q3_GENRE]);
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = Config::default();
        config.segments.min_games_per_genre = 3;
        config.pricing.paid_only = false;
        let settings = MartSettings::from_config(&config);
        assert_eq!(settings.min_games_per_genre, 3);
        assert!(!settings.paid_only);
    }
}
