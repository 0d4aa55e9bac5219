//! Upload acceptance rules and CSV row counting.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Default upload cap, 10 MiB.
pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Solo se permiten archivos CSV")]
    NotCsv,
    #[error("Error de carga: File too large")]
    TooLarge,
    #[error("No se recibió archivo")]
    MissingFile,
    #[error("Error procesando CSV")]
    Processing(String),
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for IngestError {
    fn from(e: csv::Error) -> Self {
        IngestError::Processing(e.to_string())
    }
}

/// Acceptance rules applied to an upload before anything touches disk.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_mime: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_mime: "text/csv".to_string(),
        }
    }
}

impl UploadPolicy {
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            ..Self::default()
        }
    }

    /// Accept only the CSV media type; parameters such as charset are ignored.
    pub fn check_content_type(&self, content_type: Option<&str>) -> Result<(), IngestError> {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        match essence {
            Some(ct) if ct == self.allowed_mime => Ok(()),
            other => {
                debug!(content_type = ?other, "upload rejected by type");
                Err(IngestError::NotCsv)
            }
        }
    }

    pub fn check_size(&self, len: usize) -> Result<(), IngestError> {
        if len > self.max_bytes {
            debug!(len, max = self.max_bytes, "upload rejected by size");
            return Err(IngestError::TooLarge);
        }
        Ok(())
    }
}

/// Count data rows of a CSV stream. The first record is the header.
/// Fields are not decoded, so Latin-1 exports count the same as UTF-8.
pub fn count_rows<R: Read>(reader: R) -> Result<usize, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let mut rows = 0usize;
    for record in rdr.byte_records() {
        record?;
        rows += 1;
    }
    Ok(rows)
}

pub fn count_rows_in_file(path: &Path) -> Result<usize, IngestError> {
    let file = File::open(path)?;
    count_rows(file)
}
