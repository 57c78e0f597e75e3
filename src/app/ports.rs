use std::path::Path;

use crate::error::Result;
use crate::pipeline::processing::aggregate::MartTable;
use crate::pipeline::processing::enrich::EnrichedRecord;
use crate::pipeline::processing::normalize::LogicalColumn;
use crate::storage::WriteOutcome;

/// Supplies enriched records to mart builders and the query facade.
///
/// Implementations fail with `MissingColumns` when a required logical column
/// cannot be resolved in the underlying data.
pub trait RecordSource: Send + Sync {
    fn load(&self, required: &[LogicalColumn]) -> Result<Vec<EnrichedRecord>>;
}

/// Persists finished tables
pub trait TableSink: Send + Sync {
    fn write(&self, table: &MartTable, file_name: &str) -> Result<WriteOutcome>;

    /// Directory or namespace the sink writes into, for reporting
    fn location(&self) -> &Path;
}
