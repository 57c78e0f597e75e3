// Pipeline ingestion: reading delimited text exports into untyped raw records

use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{MartError, Result};

/// One untyped source row. Values line up with `RawTable::headers`; columns
/// are not trustworthy by name alone until the normalizer has mapped them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    values: Vec<String>,
}

impl RawRecord {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(|s| s.as_str())
    }
}

/// A raw export: trimmed header row plus every well-formed data row.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
    /// Lines skipped because they could not be decoded or had extra fields
    pub malformed: usize,
}

#[cfg(test)]
impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Look up a value by physical column name
    pub fn value<'a>(&self, record: &'a RawRecord, column: &str) -> Option<&'a str> {
        self.column_index(column).and_then(|i| record.get(i))
    }
}

/// Read a delimited file with a header row.
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    if !path.exists() {
        return Err(MartError::SourceNotFound(path.to_path_buf()));
    }
    info!("📥 Reading raw export {}", path.display());
    let file = std::fs::File::open(path)?;
    let table = read_raw_from(file)?;
    info!(
        "✅ Read {} rows ({} malformed lines skipped)",
        table.records.len(),
        table.malformed
    );
    Ok(table)
}

/// Read from any byte source; used by the file reader and by fixtures.
pub fn read_raw_from<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let width = headers.len();

    let mut records = Vec::new();
    let mut malformed = 0usize;

    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("Skipping undecodable line {}: {}", line + 2, e);
                malformed += 1;
                continue;
            }
        };
        if record.len() > width {
            malformed += 1;
            continue;
        }
        let mut values: Vec<String> = record.iter().map(|v| v.to_string()).collect();
        values.resize(width, String::new());
        records.push(RawRecord::new(values));
    }

    Ok(RawTable {
        headers,
        records,
        malformed,
    })
}
