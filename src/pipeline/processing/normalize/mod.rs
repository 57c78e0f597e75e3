use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{PartialRemapPolicy, RulesConfig};
use crate::error::Result;
use crate::metrics::NormalizeMetrics;
use crate::pipeline::ingestion::{RawRecord, RawTable};

pub mod coerce;
pub mod rules;

pub use rules::{ColumnMap, LogicalColumn, RuleSet, RuleVersion};

/// Canonical typed game record. Validated once at the normalizer boundary;
/// everything downstream reads these fields, never raw columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanRecord {
    pub name: String,
    pub release_date: Option<NaiveDate>,
    /// Always present and non-negative
    pub price: f64,
    /// Owner bucket label, e.g. "0 - 20000"
    pub estimated_owners: Option<String>,
    /// Delimited genre list as found in the source
    pub genres: Option<String>,
    /// Delimited publisher list as found in the source
    pub publishers: Option<String>,
    pub positive_reviews: Option<u64>,
    pub negative_reviews: Option<u64>,
    /// Free flag carried by the source, when it has one
    pub is_free_flag: Option<bool>,
}

impl CleanRecord {
    /// Minimal record for a name and price; other fields empty.
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            release_date: None,
            price,
            estimated_owners: None,
            genres: None,
            publishers: None,
            positive_reviews: None,
            negative_reviews: None,
            is_free_flag: None,
        }
    }
}

/// Row accounting for one normalization pass. Row-level problems surface
/// only here, never as errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub rule_version: String,
    pub remapped: bool,
    /// Logical columns the source provided after remapping
    pub columns: Vec<LogicalColumn>,
    pub total_rows: usize,
    pub kept: usize,
    /// Undecodable or over-long source lines
    pub malformed: usize,
    pub missing_name: usize,
    pub invalid_price: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.malformed + self.missing_name + self.invalid_price
    }
}

enum RowOutcome {
    Kept(CleanRecord),
    MissingName,
    InvalidPrice,
}

/// The single schema normalizer. Behaviour differences between source
/// layouts live in the selected `RuleSet`.
#[derive(Debug, Clone)]
pub struct SchemaNormalizer {
    rules: RuleSet,
    policy: PartialRemapPolicy,
}

impl SchemaNormalizer {
    pub fn new(rules: RuleSet, policy: PartialRemapPolicy) -> Self {
        Self { rules, policy }
    }

    pub fn from_config(config: &RulesConfig) -> Result<Self> {
        Ok(Self::new(RuleSet::for_version(&config.version)?, config.partial_remap))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Normalize a raw table. Missing required columns abort the whole pass;
    /// rows missing a name or a usable price are dropped and counted.
    pub fn normalize(
        &self,
        table: &RawTable,
        required: &[LogicalColumn],
    ) -> Result<(Vec<CleanRecord>, NormalizeReport)> {
        let columns = self.rules.resolve(&table.headers, required, self.policy)?;
        if columns.remapped {
            info!("🔀 Applied {} column remap for mis-aligned export", self.rules.version.as_str());
        }

        let mut report = NormalizeReport {
            rule_version: self.rules.version.as_str().to_string(),
            remapped: columns.remapped,
            columns: LogicalColumn::ALL
                .iter()
                .copied()
                .filter(|c| columns.contains(*c))
                .collect(),
            total_rows: table.records.len() + table.malformed,
            malformed: table.malformed,
            ..NormalizeReport::default()
        };

        let mut records = Vec::with_capacity(table.records.len());
        for raw in &table.records {
            match self.normalize_row(&columns, raw) {
                RowOutcome::Kept(record) => records.push(record),
                RowOutcome::MissingName => report.missing_name += 1,
                RowOutcome::InvalidPrice => report.invalid_price += 1,
            }
        }
        report.kept = records.len();

        NormalizeMetrics::record_rows_read(report.total_rows);
        NormalizeMetrics::record_rows_kept(report.kept);
        NormalizeMetrics::record_rows_dropped("malformed", report.malformed);
        NormalizeMetrics::record_rows_dropped("missing_name", report.missing_name);
        NormalizeMetrics::record_rows_dropped("invalid_price", report.invalid_price);

        if report.dropped() > 0 {
            warn!(
                "Dropped {} of {} rows (missing name: {}, invalid price: {}, malformed: {})",
                report.dropped(),
                report.total_rows,
                report.missing_name,
                report.invalid_price,
                report.malformed
            );
        }
        debug!("Normalized {} records with rule set {}", report.kept, report.rule_version);

        Ok((records, report))
    }

    fn normalize_row(&self, columns: &ColumnMap, raw: &RawRecord) -> RowOutcome {
        let cell = |column: LogicalColumn| columns.index(column).and_then(|i| raw.get(i));

        let name = match coerce::clean_text(cell(LogicalColumn::Name)) {
            Some(name) => name,
            None => return RowOutcome::MissingName,
        };

        let price = cell(LogicalColumn::Price).and_then(|p| {
            coerce::parse_price(p, self.rules.free_price_tokens, self.rules.currency_symbols)
        });
        let price = match price {
            Some(p) if p >= 0.0 => p,
            _ => return RowOutcome::InvalidPrice,
        };

        let release_date = cell(LogicalColumn::ReleaseDate).and_then(coerce::parse_release_date);

        RowOutcome::Kept(CleanRecord {
            name,
            release_date,
            price,
            estimated_owners: coerce::clean_text(cell(LogicalColumn::EstimatedOwners)),
            genres: coerce::clean_text(cell(LogicalColumn::Genres)),
            publishers: coerce::clean_text(cell(LogicalColumn::Publishers)),
            positive_reviews: cell(LogicalColumn::Positive).and_then(coerce::parse_count),
            negative_reviews: cell(LogicalColumn::Negative).and_then(coerce::parse_count),
            is_free_flag: coerce::clean_text(cell(LogicalColumn::IsFree)).map(|f| coerce::parse_flag(&f)),
        })
    }
}
