// Batch pipeline: ingestion, processing, and the clean / mart runs that tie them together

pub mod ingestion;
pub mod processing;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::app::ports::{RecordSource, TableSink};
use crate::config::Config;
use crate::constants::*;
use crate::error::Result;
use crate::infra::csv_source::CsvRecordSource;
use crate::marts::{build_use_case, MartKind, MartSettings, UseCase};
use crate::pipeline::ingestion::read_raw_table;
use crate::pipeline::processing::aggregate::{Cell, MartTable};
use crate::pipeline::processing::enrich::{enrich_all, EnrichedRecord};
use crate::pipeline::processing::normalize::{LogicalColumn, NormalizeReport, SchemaNormalizer};
use crate::storage::{DurableTableWriter, WriteOutcome};

/// Columns a raw export must provide for the cleaning run
pub const CLEANING_COLUMNS: [LogicalColumn; 2] = [LogicalColumn::Name, LogicalColumn::Price];

/// Source columns carried into the cleaned record set, in output order
const CARRIED_COLUMNS: [LogicalColumn; 8] = [
    LogicalColumn::Name,
    LogicalColumn::ReleaseDate,
    LogicalColumn::Price,
    LogicalColumn::EstimatedOwners,
    LogicalColumn::Genres,
    LogicalColumn::Publishers,
    LogicalColumn::Positive,
    LogicalColumn::Negative,
];

const DERIVED_COLUMNS: [&str; 6] = [
    COL_RELEASE_MONTH,
    COL_RELEASE_SEASON,
    COL_TOTAL_REVIEWS,
    COL_REVIEW_RATIO,
    COL_IS_FREE,
    COL_PRICE_BAND,
];

/// Result of a cleaning run
#[derive(Debug, Clone, Serialize)]
pub struct CleanRunReport {
    pub source: PathBuf,
    pub normalize: NormalizeReport,
    #[serde(skip)]
    pub write: WriteOutcome,
    pub duration_secs: f64,
}

/// One written mart
#[derive(Debug, Clone, Serialize)]
pub struct MartWrite {
    pub mart: &'static str,
    pub rows: usize,
    /// Requested destination
    pub destination: PathBuf,
    /// Set when the destination was locked
    pub fallback: Option<PathBuf>,
}

impl MartWrite {
    /// The file that now holds the mart
    pub fn written_to(&self) -> &Path {
        self.fallback.as_deref().unwrap_or(&self.destination)
    }
}

/// Result of building and writing one or more use cases
#[derive(Debug, Clone, Default, Serialize)]
pub struct MartBuildReport {
    pub records: usize,
    pub written: Vec<MartWrite>,
}

impl MartBuildReport {
    pub fn fallbacks(&self) -> impl Iterator<Item = &MartWrite> {
        self.written.iter().filter(|w| w.fallback.is_some())
    }
}

fn opt_count(value: Option<u64>) -> Cell {
    value.map(|v| Cell::Int(v as i64)).unwrap_or(Cell::Null)
}

/// Cleaned record set as a table. Source columns the export did not have are
/// left out so readers can still tell which inputs existed; derived columns
/// are always present.
pub fn clean_table(records: &[EnrichedRecord], present: &[LogicalColumn]) -> MartTable {
    let carried: Vec<LogicalColumn> = CARRIED_COLUMNS
        .iter()
        .copied()
        .filter(|c| present.contains(c) || CLEANING_COLUMNS.contains(c))
        .collect();

    let mut header: Vec<&str> = carried.iter().map(|c| c.canonical_name()).collect();
    header.extend(DERIVED_COLUMNS);
    let mut table = MartTable::new(CLEAN_FILE.trim_end_matches(".csv"), header);

    for enriched in records {
        let r = &enriched.record;
        let d = &enriched.derived;
        let mut row = Vec::with_capacity(carried.len() + DERIVED_COLUMNS.len());
        for column in &carried {
            row.push(match column {
                LogicalColumn::Name => Cell::text(&r.name),
                LogicalColumn::ReleaseDate => r
                    .release_date
                    .map(|date| Cell::text(date.format("%Y-%m-%d").to_string()))
                    .unwrap_or(Cell::Null),
                LogicalColumn::Price => Cell::exact(r.price),
                LogicalColumn::EstimatedOwners => Cell::opt_text(r.estimated_owners.as_deref()),
                LogicalColumn::Genres => Cell::opt_text(r.genres.as_deref()),
                LogicalColumn::Publishers => Cell::opt_text(r.publishers.as_deref()),
                LogicalColumn::Positive => opt_count(r.positive_reviews),
                LogicalColumn::Negative => opt_count(r.negative_reviews),
                LogicalColumn::IsFree => Cell::Bool(d.is_free),
            });
        }
        row.push(d.release_month.map(|m| Cell::Int(m as i64)).unwrap_or(Cell::Null));
        row.push(Cell::opt_text(d.release_season.map(|s| s.as_str())));
        row.push(opt_count(d.total_reviews));
        row.push(Cell::decimal(d.review_ratio, ROW_RATIO_PLACES));
        row.push(Cell::Bool(d.is_free));
        row.push(Cell::text(d.price_band.as_str()));
        table.push_row(row);
    }
    table
}

/// Read the raw export, normalize it, derive fields, and publish the
/// cleaned record set. Missing columns abort before anything is written.
#[instrument(skip_all, fields(source = %config.paths.raw_file.display()))]
pub fn run_clean(config: &Config, writer: &DurableTableWriter) -> Result<CleanRunReport> {
    let started = Instant::now();
    info!("🧹 Starting clean run");

    let normalizer = SchemaNormalizer::from_config(&config.rules)?;
    let raw = read_raw_table(&config.paths.raw_file)?;
    let (records, report) = normalizer.normalize(&raw, &CLEANING_COLUMNS)?;
    let enriched = enrich_all(records);

    let table = clean_table(&enriched, &report.columns);
    let write = writer.write_table(&table, &config.paths.clean_file)?;
    if let Some(fallback) = &write.fallback {
        warn!("Cleaned record set written to fallback {}", fallback.display());
    }

    let duration_secs = started.elapsed().as_secs_f64();
    info!(
        "✅ Clean run kept {} of {} rows ({} dropped) in {:.2}s",
        report.kept,
        report.total_rows,
        report.dropped(),
        duration_secs
    );

    Ok(CleanRunReport {
        source: config.paths.raw_file.clone(),
        normalize: report,
        write,
        duration_secs,
    })
}

/// Build every mart of the given use cases from the cleaned record set.
///
/// All tables are computed before the first write, so a missing column in
/// any requested use case leaves the output directory untouched.
#[instrument(skip_all, fields(use_cases = use_cases.len()))]
pub fn build_marts(
    config: &Config,
    use_cases: &[UseCase],
    sink: &dyn TableSink,
) -> Result<MartBuildReport> {
    let source = CsvRecordSource::new(
        config.paths.clean_file.clone(),
        SchemaNormalizer::from_config(&config.rules)?,
    );
    let settings = MartSettings::from_config(config);

    let mut built: Vec<(MartKind, MartTable)> = Vec::new();
    let mut records_seen = 0;
    for use_case in use_cases {
        info!("📊 Building {} marts", use_case);
        let records = source.load(use_case.required_columns())?;
        records_seen = records_seen.max(records.len());
        built.extend(build_use_case(*use_case, &records, &settings));
    }

    let mut report = MartBuildReport {
        records: records_seen,
        written: Vec::with_capacity(built.len()),
    };
    for (kind, table) in &built {
        let outcome = sink.write(table, &kind.file_name())?;
        report.written.push(MartWrite {
            mart: kind.name(),
            rows: table.len(),
            destination: outcome.destination,
            fallback: outcome.fallback,
        });
    }

    info!(
        "✅ Wrote {} marts to {} ({} fallback)",
        report.written.len(),
        sink.location().display(),
        report.fallbacks().count()
    );
    Ok(report)
}

/// Clean, then build every use case
pub fn run_all(
    config: &Config,
    writer: &DurableTableWriter,
    sink: &dyn TableSink,
) -> Result<(CleanRunReport, MartBuildReport)> {
    let clean = run_clean(config, writer)?;
    let marts = build_marts(config, &UseCase::ALL, sink)?;
    Ok((clean, marts))
}
