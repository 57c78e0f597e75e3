use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::app::ports::RecordSource;
use crate::config::{Config, QueryConfig};
use crate::constants::QUERY_LIMIT_CEILING;
use crate::error::{MartError, Result};
use crate::marts::{build_mart, MartKind, MartSettings};
use crate::pipeline::processing::enrich::EnrichedRecord;

/// Optional filters a caller may pass to any mart query
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Keep records priced at or below this bound
    pub max_price: Option<f64>,
    /// Case-insensitive substring match on the game name
    pub name_contains: Option<String>,
    pub limit: Option<usize>,
}

impl QueryParams {
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_price {
            if max.is_nan() || max < 0.0 {
                return Err(MartError::InvalidQuery(format!(
                    "max_price must be a non-negative number, got {}",
                    max
                )));
            }
        }
        Ok(())
    }

    /// Requested row cap clamped to `1..=max_limit`
    pub fn effective_limit(&self, config: &QueryConfig) -> usize {
        let ceiling = config.max_limit.clamp(1, QUERY_LIMIT_CEILING);
        self.limit.unwrap_or(config.default_limit).clamp(1, ceiling)
    }

    fn matches(&self, record: &EnrichedRecord, needle: Option<&str>) -> bool {
        if let Some(max) = self.max_price {
            if record.price() > max {
                return false;
            }
        }
        match needle {
            Some(n) => record.record.name.to_lowercase().contains(n),
            None => true,
        }
    }
}

/// Read-only query facade over the marts.
///
/// Filters narrow the record population before aggregation, so grouped
/// statistics describe only the matching games. Results are the same rows the
/// batch pipeline writes, as flat key/value records.
pub struct QueryUseCase {
    source: Box<dyn RecordSource>,
    settings: MartSettings,
    limits: QueryConfig,
}

impl QueryUseCase {
    pub fn new(source: Box<dyn RecordSource>, config: &Config) -> Self {
        Self {
            source,
            settings: MartSettings::from_config(config),
            limits: config.query.clone(),
        }
    }

    pub fn query(&self, kind: MartKind, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        params.validate()?;

        let records = self.source.load(kind.use_case().required_columns())?;
        let loaded = records.len();
        let needle = params
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase);
        let filtered: Vec<EnrichedRecord> = records
            .into_iter()
            .filter(|r| params.matches(r, needle.as_deref()))
            .collect();
        debug!("Query {} kept {} of {} records", kind, filtered.len(), loaded);

        let mut table = build_mart(kind, &filtered, &self.settings);
        table.truncate(params.effective_limit(&self.limits));
        info!("🔎 Query {} returned {} rows", kind, table.len());
        Ok(table.to_records())
    }

    pub fn pricing_by_season(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::PricingBySeason, params)
    }

    pub fn pricing_by_month(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::PricingByMonth, params)
    }

    pub fn pricing_by_genre(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::PricingByGenre, params)
    }

    pub fn pricing_by_owners(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::PricingByOwners, params)
    }

    pub fn review_features(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::ReviewFeatures, params)
    }

    pub fn genre_review_ratio(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::GenreReviewRatio, params)
    }

    pub fn publisher_review_ratio(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::PublisherReviewRatio, params)
    }

    pub fn market_segments(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::SegmentRows, params)
    }

    pub fn free_vs_paid(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::FreeVsPaid, params)
    }

    pub fn genre_price_segments(&self, params: &QueryParams) -> Result<Vec<Map<String, Value>>> {
        self.query(MartKind::GenrePriceSegments, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::pipeline::processing::normalize::{CleanRecord, LogicalColumn};
    use std::sync::{Arc, Mutex};

    struct MockRecordSource {
        records: Vec<EnrichedRecord>,
        missing: Option<LogicalColumn>,
        requests: Arc<Mutex<Vec<Vec<LogicalColumn>>>>,
    }

    impl MockRecordSource {
        fn new(records: Vec<EnrichedRecord>) -> Self {
            Self {
                records,
                missing: None,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl RecordSource for MockRecordSource {
        fn load(&self, required: &[LogicalColumn]) -> Result<Vec<EnrichedRecord>> {
            self.requests.lock().unwrap().push(required.to_vec());
            if let Some(col) = self.missing {
                if required.contains(&col) {
                    return Err(MartError::MissingColumns {
                        missing: vec![col.canonical_name().to_string()],
                        found: vec!["Name".to_string(), "Price".to_string()],
                    });
                }
            }
            Ok(self.records.clone())
        }
    }

    fn game(name: &str, price: f64, genres: &str) -> EnrichedRecord {
        let mut r = CleanRecord::new(name, price);
        r.genres = Some(genres.to_string());
        EnrichedRecord::new(r)
    }

    fn catalog() -> Vec<EnrichedRecord> {
        vec![
            game("Space Quest", 10.0, "Action, Indie"),
            game("Free Racer", 0.0, "Indie"),
            game("Space Siege", 35.0, "Action"),
            game("Farm Days", 4.99, "Casual"),
        ]
    }

    fn facade(source: MockRecordSource) -> QueryUseCase {
        QueryUseCase::new(Box::new(source), &Config::default())
    }

    #[test]
    fn test_genre_prices_match_batch_rows() {
        let q = facade(MockRecordSource::new(catalog()));
        let rows = q.pricing_by_genre(&QueryParams::default()).unwrap();
        assert_eq!(rows[0]["Genre"], Value::from("Action"));
        assert_eq!(rows[0]["releases_count"], Value::from(2));
        assert_eq!(rows[0]["avg_price"], Value::from(22.5));
    }

    #[test]
    fn test_filters_apply_before_aggregation() {
        let q = facade(MockRecordSource::new(catalog()));
        let params = QueryParams {
            max_price: Some(20.0),
            name_contains: Some("SPACE".to_string()),
            limit: None,
        };
        let rows = q.pricing_by_genre(&params).unwrap();
        let action = rows.iter().find(|r| r["Genre"] == "Action").unwrap();
        assert_eq!(action["releases_count"], Value::from(1));
        assert_eq!(action["avg_price"], Value::from(10.0));
        assert!(rows.iter().all(|r| r["Genre"] != "Casual"));
    }

    #[test]
    fn test_limit_is_clamped() {
        let q = facade(MockRecordSource::new(catalog()));
        let one = q
            .market_segments(&QueryParams {
                limit: Some(1),
                ..QueryParams::default()
            })
            .unwrap();
        assert_eq!(one.len(), 1);

        let zero = q
            .market_segments(&QueryParams {
                limit: Some(0),
                ..QueryParams::default()
            })
            .unwrap();
        assert_eq!(zero.len(), 1);

        let limits = QueryConfig::default();
        let huge = QueryParams {
            limit: Some(1_000_000),
            ..QueryParams::default()
        };
        assert_eq!(huge.effective_limit(&limits), limits.max_limit);
        assert_eq!(QueryParams::default().effective_limit(&limits), limits.default_limit);
    }

    #[test]
    fn test_bad_price_bound_is_client_error() {
        let q = facade(MockRecordSource::new(catalog()));
        for bad in [-1.0, f64::NAN] {
            let err = q
                .free_vs_paid(&QueryParams {
                    max_price: Some(bad),
                    ..QueryParams::default()
                })
                .unwrap_err();
            assert_eq!(err.class(), ErrorClass::Client);
        }
    }

    #[test]
    fn test_missing_source_columns_is_server_error() {
        let mut source = MockRecordSource::new(catalog());
        source.missing = Some(LogicalColumn::Positive);
        let requests = source.requests.clone();
        let q = facade(source);

        let err = q.genre_review_ratio(&QueryParams::default()).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Server);
        assert!(matches!(err, MartError::MissingColumns { .. }));
        assert!(requests.lock().unwrap()[0].contains(&LogicalColumn::Negative));

        // segments do not need review counts
        assert!(q.free_vs_paid(&QueryParams::default()).is_ok());
    }

    #[test]
    fn test_free_vs_paid_records() {
        let q = facade(MockRecordSource::new(catalog()));
        let rows = q.free_vs_paid(&QueryParams::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["total_games"], Value::from(4));
        assert_eq!(rows[0]["free_pct"], Value::from(25.0));
        assert_eq!(rows[0]["paid_pct"], Value::from(75.0));
    }
}
