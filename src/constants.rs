/// Canonical column names used by the cleaned record set and the marts.
/// Physical source headers are mapped onto these by the normalizer rule set.

// Logical columns of the cleaned record set
pub const COL_NAME: &str = "Name";
pub const COL_RELEASE_DATE: &str = "Release date";
pub const COL_PRICE: &str = "Price";
pub const COL_ESTIMATED_OWNERS: &str = "Estimated owners";
pub const COL_GENRES: &str = "Genres";
pub const COL_PUBLISHERS: &str = "Publishers";
pub const COL_POSITIVE: &str = "Positive";
pub const COL_NEGATIVE: &str = "Negative";
pub const COL_IS_FREE: &str = "IsFree";

// Source column carrying the real game name in the mis-aligned export
pub const COL_APP_ID: &str = "AppID";

// Derived columns
pub const COL_RELEASE_MONTH: &str = "ReleaseMonth";
pub const COL_RELEASE_SEASON: &str = "ReleaseSeason";
pub const COL_TOTAL_REVIEWS: &str = "TotalReviews";
pub const COL_REVIEW_RATIO: &str = "ReviewRatio";
pub const COL_PRICE_BAND: &str = "PriceBand";

// Grouping key columns that only exist in marts
pub const COL_GENRE: &str = "Genre";
pub const COL_PUBLISHER: &str = "Publisher";
pub const COL_MONTH_NAME: &str = "MonthName";
pub const COL_OWNERS_BUCKET: &str = "EstimatedOwners";

/// Sentinel multi-value token that carries no information
pub const UNKNOWN_TOKEN: &str = "unknown";

pub const SEASON_ORDER: [&str; 4] = ["Winter", "Spring", "Summer", "Fall"];

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// Output precisions (decimal places)
pub const CURRENCY_PLACES: u32 = 2;
pub const PERCENT_PLACES: u32 = 2;
pub const RATIO_PLACES: u32 = 3;
pub const ROW_RATIO_PLACES: u32 = 4;
pub const REVIEW_COUNT_PLACES: u32 = 1;

// Price band thresholds for paid games
pub const CHEAP_UPPER_BOUND: f64 = 10.0;
pub const PREMIUM_LOWER_BOUND: f64 = 30.0;

/// Hard ceiling on rows a query may ask for, regardless of configuration
pub const QUERY_LIMIT_CEILING: usize = 10_000;

// Mart file names
pub const CLEAN_FILE: &str = "games_clean.csv";
pub const Q1_BY_SEASON: &str = "q1_pricing_by_season";
pub const Q1_BY_MONTH: &str = "q1_pricing_by_month";
pub const Q1_BY_GENRE: &str = "q1_pricing_by_genre";
pub const Q1_BY_OWNERS: &str = "q1_pricing_by_owners";
pub const Q2_FEATURES: &str = "q2_reviews_features";
pub const Q2_GENRE: &str = "q2_genre_review_ratio";
pub const Q2_PUBLISHER: &str = "q2_publisher_review_ratio";
pub const Q3_ROWS: &str = "q3_market_segments";
pub const Q3_FREE_VS_PAID: &str = "q3_free_vs_paid";
pub const Q3_GENRE: &str = "q3_genre_price_segments";

/// Month number (1..=12) to its short display name.
pub fn month_name(month: u32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_NAMES[(month - 1) as usize])
    } else {
        None
    }
}
