use std::io;
use thiserror::Error;

/// Errors produced while decoding an EDF/EDF+ recording.
///
/// Header-stage variants abort a read. Record-stage variants
/// (`TruncatedFile`, `MalformedAnnotation`, `DegenerateScale`) are collected
/// into [`Dataset::diagnostics`](crate::Dataset::diagnostics) instead.
/// Offsets are absolute byte positions in the file.
#[derive(Debug, Error)]
pub enum EdfError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed header field `{field}` at byte {offset}: {value:?}")]
    MalformedHeaderField {
        field: &'static str,
        offset: u64,
        value: String,
    },

    #[error("Unsupported version: {0:?}")]
    UnsupportedVersion(String),

    #[error("Signal header table size mismatch: expected {expected} bytes, got {actual}")]
    SignalCountMismatch { expected: usize, actual: usize },

    #[error("Truncated file at byte {offset}: needed {expected} bytes, {available} available")]
    TruncatedFile {
        offset: u64,
        expected: usize,
        available: usize,
    },

    #[error(
        "Degenerate scale for signal `{label}`: digital [{digital_min}, {digital_max}], physical [{physical_min}, {physical_max}]"
    )]
    DegenerateScale {
        label: String,
        digital_min: i32,
        digital_max: i32,
        physical_min: f64,
        physical_max: f64,
    },

    #[error("Malformed annotation in record {record} (signal {signal}, byte {offset}): {reason}")]
    MalformedAnnotation {
        record: usize,
        signal: usize,
        offset: u64,
        reason: String,
    },

    #[error("Signal index {0} out of range")]
    InvalidSignalIndex(usize),

    #[error("Record index {0} out of range")]
    InvalidRecordIndex(usize),
}

impl EdfError {
    /// Builds a `MalformedHeaderField` from raw field bytes.
    pub(crate) fn malformed_field(field: &'static str, offset: u64, raw: &[u8]) -> Self {
        EdfError::MalformedHeaderField {
            field,
            offset,
            value: String::from_utf8_lossy(raw).into_owned(),
        }
    }

    /// Whether this error only affects one record rather than the whole read.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            EdfError::TruncatedFile { .. }
                | EdfError::MalformedAnnotation { .. }
                | EdfError::DegenerateScale { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EdfError>;
