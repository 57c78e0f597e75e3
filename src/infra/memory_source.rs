use crate::app::ports::RecordSource;
use crate::error::Result;
use crate::pipeline::processing::enrich::EnrichedRecord;
use crate::pipeline::processing::normalize::LogicalColumn;

/// Serves a fixed set of already enriched records. Column requirements are
/// not checked since the records are fully typed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordSource {
    records: Vec<EnrichedRecord>,
}

impl InMemoryRecordSource {
    pub fn new(records: Vec<EnrichedRecord>) -> Self {
        Self { records }
    }
}

impl RecordSource for InMemoryRecordSource {
    fn load(&self, _required: &[LogicalColumn]) -> Result<Vec<EnrichedRecord>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::query_use_case::{QueryParams, QueryUseCase};
    use crate::config::Config;
    use crate::pipeline::processing::normalize::CleanRecord;

    #[test]
    fn test_serves_records_to_the_facade() {
        let source = InMemoryRecordSource::new(vec![
            EnrichedRecord::new(CleanRecord::new("A", 0.0)),
            EnrichedRecord::new(CleanRecord::new("B", 12.0)),
        ]);
        let facade = QueryUseCase::new(Box::new(source), &Config::default());
        let rows = facade.market_segments(&QueryParams::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["PriceBand"], "Mid");
    }
}
