use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::RecordSource;
use crate::error::Result;
use crate::pipeline::ingestion::read_raw_table;
use crate::pipeline::processing::enrich::{enrich_all, EnrichedRecord};
use crate::pipeline::processing::normalize::{LogicalColumn, NormalizeReport, SchemaNormalizer};

/// File-backed record source. Every load re-reads the file, so a source
/// pointed at the cleaned record set always serves the latest run.
///
/// Works over both the raw export and the cleaned file: the normalizer maps
/// whichever header layout it finds onto logical columns.
pub struct CsvRecordSource {
    path: PathBuf,
    normalizer: SchemaNormalizer,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>, normalizer: SchemaNormalizer) -> Self {
        Self {
            path: path.into(),
            normalizer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and also return the normalizer's drop counts
    pub fn load_with_report(
        &self,
        required: &[LogicalColumn],
    ) -> Result<(Vec<EnrichedRecord>, NormalizeReport)> {
        let raw = read_raw_table(&self.path)?;
        let (records, report) = self.normalizer.normalize(&raw, required)?;
        let enriched = enrich_all(records);
        info!(
            "📚 Loaded {} records from {}",
            enriched.len(),
            self.path.display()
        );
        Ok((enriched, report))
    }
}

impl RecordSource for CsvRecordSource {
    fn load(&self, required: &[LogicalColumn]) -> Result<Vec<EnrichedRecord>> {
        self.load_with_report(required).map(|(records, _)| records)
    }
}
