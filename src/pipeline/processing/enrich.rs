use chrono::Datelike;
use serde::Serialize;
use std::fmt;

use crate::constants::{CHEAP_UPPER_BOUND, PREMIUM_LOWER_BOUND};
use crate::pipeline::processing::normalize::CleanRecord;

/// Release season, a pure function of the release month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Canonical reporting order
    pub const ORDER: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    pub fn from_month(month: u32) -> Option<Season> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Fall),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical price classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PriceBand {
    Free,
    /// 0 < price < 10
    Cheap,
    /// 10 <= price < 30
    Mid,
    /// price >= 30
    Premium,
    Unknown,
}

impl PriceBand {
    pub fn classify(price: f64) -> PriceBand {
        if !price.is_finite() {
            PriceBand::Unknown
        } else if price <= 0.0 {
            PriceBand::Free
        } else if price < CHEAP_UPPER_BOUND {
            PriceBand::Cheap
        } else if price < PREMIUM_LOWER_BOUND {
            PriceBand::Mid
        } else {
            PriceBand::Premium
        }
    }

    /// Classify a price that may not be numeric at all
    pub fn classify_text(raw: &str) -> PriceBand {
        raw.trim()
            .parse::<f64>()
            .map(PriceBand::classify)
            .unwrap_or(PriceBand::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceBand::Free => "Free",
            PriceBand::Cheap => "Cheap",
            PriceBand::Mid => "Mid",
            PriceBand::Premium => "Premium",
            PriceBand::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PriceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields computed from a single clean record; never persisted on their own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedFields {
    pub release_month: Option<u32>,
    pub release_season: Option<Season>,
    pub total_reviews: Option<u64>,
    /// Undefined when there are no reviews at all
    pub review_ratio: Option<f64>,
    pub is_free: bool,
    pub price_band: PriceBand,
}

/// A clean record with its derived fields attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub record: CleanRecord,
    pub derived: DerivedFields,
}

impl EnrichedRecord {
    pub fn new(record: CleanRecord) -> Self {
        let derived = derive(&record);
        Self { record, derived }
    }

    pub fn price(&self) -> f64 {
        self.record.price
    }

    pub fn is_paid(&self) -> bool {
        self.record.price > 0.0
    }
}

/// Positive share of all reviews; `None` when there are no reviews.
pub fn review_ratio(positive: u64, negative: u64) -> Option<f64> {
    let total = positive.checked_add(negative)?;
    if total == 0 {
        None
    } else {
        Some(positive as f64 / total as f64)
    }
}

/// Compute derived fields from one record, independent of every other record.
pub fn derive(record: &CleanRecord) -> DerivedFields {
    let release_month = record.release_date.map(|d| d.month());
    let release_season = release_month.and_then(Season::from_month);

    let (total_reviews, ratio) = match (record.positive_reviews, record.negative_reviews) {
        (Some(pos), Some(neg)) => (pos.checked_add(neg), review_ratio(pos, neg)),
        _ => (None, None),
    };

    DerivedFields {
        release_month,
        release_season,
        total_reviews,
        review_ratio: ratio,
        is_free: record.is_free_flag.unwrap_or(record.price <= 0.0),
        price_band: PriceBand::classify(record.price),
    }
}

pub fn enrich_all(records: Vec<CleanRecord>) -> Vec<EnrichedRecord> {
    records.into_iter().map(EnrichedRecord::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_season_table_is_fixed() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Spring),
            (5, Season::Spring),
            (6, Season::Summer),
            (8, Season::Summer),
            (9, Season::Fall),
            (11, Season::Fall),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), Some(season), "month {}", month);
        }
        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn test_season_depends_only_on_month() {
        let mut a = CleanRecord::new("A", 59.99);
        a.release_date = NaiveDate::from_ymd_opt(2001, 1, 31);
        let mut b = CleanRecord::new("B", 0.0);
        b.release_date = NaiveDate::from_ymd_opt(2023, 1, 2);
        b.genres = Some("Indie".to_string());
        assert_eq!(derive(&a).release_season, Some(Season::Winter));
        assert_eq!(derive(&b).release_season, Some(Season::Winter));
    }

    #[test]
    fn test_review_ratio_undefined_without_reviews() {
        assert_eq!(review_ratio(0, 0), None);
        assert_eq!(review_ratio(3, 1), Some(0.75));
        assert_eq!(review_ratio(0, 4), Some(0.0));

        let mut r = CleanRecord::new("A", 1.0);
        r.positive_reviews = Some(0);
        r.negative_reviews = Some(0);
        let d = derive(&r);
        assert_eq!(d.total_reviews, Some(0));
        assert_eq!(d.review_ratio, None);
    }

    #[test]
    fn test_price_band_thresholds() {
        assert_eq!(PriceBand::classify(0.0), PriceBand::Free);
        assert_eq!(PriceBand::classify(0.01), PriceBand::Cheap);
        assert_eq!(PriceBand::classify(9.99), PriceBand::Cheap);
        assert_eq!(PriceBand::classify(10.0), PriceBand::Mid);
        assert_eq!(PriceBand::classify(29.99), PriceBand::Mid);
        assert_eq!(PriceBand::classify(30.0), PriceBand::Premium);
        assert_eq!(PriceBand::classify(f64::NAN), PriceBand::Unknown);
        assert_eq!(PriceBand::classify_text("N/A"), PriceBand::Unknown);
        assert_eq!(PriceBand::classify_text("45"), PriceBand::Premium);
    }

    #[test]
    fn test_is_free_prefers_source_flag() {
        let free = CleanRecord::new("F", 0.0);
        assert!(derive(&free).is_free);

        let mut flagged = CleanRecord::new("P", 0.0);
        flagged.is_free_flag = Some(false);
        assert!(!derive(&flagged).is_free);

        let paid = CleanRecord::new("Q", 4.99);
        assert!(!derive(&paid).is_free);
    }

    #[test]
    fn test_unparsed_date_keeps_record_without_month() {
        let r = CleanRecord::new("A", 5.0);
        let d = derive(&r);
        assert_eq!(d.release_month, None);
        assert_eq!(d.release_season, None);
    }
}
