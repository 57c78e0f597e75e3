use std::path::{Path, PathBuf};

use crate::app::ports::TableSink;
use crate::error::Result;
use crate::pipeline::processing::aggregate::MartTable;
use crate::storage::{DurableTableWriter, WriteOutcome};

/// Writes each table as `<dir>/<file_name>` through the durable writer
pub struct DirectoryTableSink {
    dir: PathBuf,
    writer: DurableTableWriter,
}

impl DirectoryTableSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_writer(dir, DurableTableWriter::new())
    }

    pub fn with_writer(dir: impl Into<PathBuf>, writer: DurableTableWriter) -> Self {
        Self {
            dir: dir.into(),
            writer,
        }
    }
}

impl TableSink for DirectoryTableSink {
    fn write(&self, table: &MartTable, file_name: &str) -> Result<WriteOutcome> {
        self.writer.write_table(table, &self.dir.join(file_name))
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}
