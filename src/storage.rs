//! Durable table writer
//!
//! Tables are staged into a uniquely named temp file next to the
//! destination, synced, and then renamed over the destination. Readers see
//! either the previous complete file or the new complete file. When the
//! destination is held open by another process the staged file is renamed to
//! a timestamped sibling instead, and the existing file is left untouched.

use chrono::{Local, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::metrics::MartMetrics;
use crate::pipeline::processing::aggregate::MartTable;

// Windows ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
const SHARING_VIOLATION: i32 = 32;
const LOCK_VIOLATION: i32 = 33;

/// The final publish step, swappable so lock conflicts can be simulated
pub trait Replace: Send + Sync {
    fn replace(&self, staged: &Path, destination: &Path) -> io::Result<()>;
}

/// Plain filesystem rename
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReplace;

impl Replace for FsReplace {
    fn replace(&self, staged: &Path, destination: &Path) -> io::Result<()> {
        fs::rename(staged, destination)
    }
}

/// Where a table ended up and what was written
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// Requested destination
    pub destination: PathBuf,
    /// Set when the destination was locked and the table went here instead
    pub fallback: Option<PathBuf>,
    pub bytes: usize,
    /// Hex SHA-256 of the written bytes
    pub sha256: String,
}

impl WriteOutcome {
    /// The file that now holds the table
    pub fn written_to(&self) -> &Path {
        self.fallback.as_deref().unwrap_or(&self.destination)
    }

    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// True when the error means another process holds the destination
pub fn is_lock_conflict(err: &io::Error) -> bool {
    err.kind() == ErrorKind::PermissionDenied
        || matches!(err.raw_os_error(), Some(SHARING_VIOLATION) | Some(LOCK_VIOLATION))
}

/// `<stem>_<YYYYMMDD_HHMMSS><.ext>` alongside the destination
pub fn fallback_path(destination: &Path, at: NaiveDateTime) -> PathBuf {
    let stem = destination
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    let suffix = at.format("%Y%m%d_%H%M%S");
    let name = match destination.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext),
        None => format!("{}_{}", stem, suffix),
    };
    destination.with_file_name(name)
}

/// First fallback name not already taken; repeats within one second get a
/// `_2`, `_3`, ... suffix after the timestamp.
pub fn unused_fallback_path(destination: &Path, at: NaiveDateTime) -> PathBuf {
    let base = fallback_path(destination, at);
    if !base.exists() {
        return base;
    }
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    let ext = base.extension().and_then(|e| e.to_str()).map(str::to_string);
    (2u32..)
        .map(|n| match &ext {
            Some(ext) => base.with_file_name(format!("{}_{}.{}", stem, n, ext)),
            None => base.with_file_name(format!("{}_{}", stem, n)),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

fn staging_path(destination: &Path) -> PathBuf {
    let stem = destination
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    destination.with_file_name(format!("{}.{}.tmp", stem, Uuid::new_v4()))
}

fn stage(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()
}

pub struct DurableTableWriter {
    replace: Box<dyn Replace>,
}

impl Default for DurableTableWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableTableWriter {
    pub fn new() -> Self {
        Self {
            replace: Box::new(FsReplace),
        }
    }

    pub fn with_replace(replace: Box<dyn Replace>) -> Self {
        Self { replace }
    }

    /// Serialize a table as CSV and publish it at `destination`
    pub fn write_table(&self, table: &MartTable, destination: &Path) -> Result<WriteOutcome> {
        let bytes = table.to_csv_bytes()?;
        self.write_bytes(&bytes, destination)
    }

    pub fn write_bytes(&self, bytes: &[u8], destination: &Path) -> Result<WriteOutcome> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let staged = staging_path(destination);
        if let Err(e) = stage(&staged, bytes) {
            let _ = fs::remove_file(&staged);
            return Err(e.into());
        }

        let fallback = match self.replace.replace(&staged, destination) {
            Ok(()) => None,
            Err(e) if is_lock_conflict(&e) => {
                let alternate = unused_fallback_path(destination, Local::now().naive_local());
                if let Err(e) = self.replace.replace(&staged, &alternate) {
                    let _ = fs::remove_file(&staged);
                    return Err(e.into());
                }
                warn!(
                    "⚠️ {} is locked ({}); wrote {} instead",
                    destination.display(),
                    e,
                    alternate.display()
                );
                MartMetrics::record_fallback_write();
                Some(alternate)
            }
            Err(e) => {
                let _ = fs::remove_file(&staged);
                return Err(e.into());
            }
        };

        MartMetrics::record_write(bytes.len());
        let outcome = WriteOutcome {
            destination: destination.to_path_buf(),
            fallback,
            bytes: bytes.len(),
            sha256: hex::encode(Sha256::digest(bytes)),
        };
        debug!(
            "Wrote {} bytes to {} (sha256 {})",
            outcome.bytes,
            outcome.written_to().display(),
            outcome.sha256
        );
        Ok(outcome)
    }
}
