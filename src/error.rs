use std::path::PathBuf;

use thiserror::Error;

/// Everything that can make the decoder exit non-zero.
///
/// Variant names track the error kinds enumerated for the index-decoding
/// core: bad configuration, a barcode file that won't parse, a malformed
/// per-record barcode/quality pair, inconsistent templates, and I/O
/// failures on the record stream or the metrics file.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    ConfigInvalid(String),

    #[error("could not read barcode file {path}: {source}")]
    BarcodeTableIoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("barcode '{seq}' (line {line}) is a different length to the previous barcodes (expected idx1={expected_idx1}, idx2={expected_idx2})")]
    BarcodeShapeMismatch {
        seq: String,
        line: usize,
        expected_idx1: usize,
        expected_idx2: usize,
    },

    #[error("barcode and quality strings are different lengths ({barcode_len} vs {quality_len})")]
    BarcodeQualityLengthMismatch {
        barcode_len: usize,
        quality_len: usize,
    },

    #[error("record '{read_name}' has two different barcode tags: '{first}' and '{second}'")]
    InconsistentTemplateBarcode {
        read_name: String,
        first: String,
        second: String,
    },

    #[error("stream I/O error: {0}")]
    StreamIoError(#[source] std::io::Error),

    #[error("could not open metrics file {path}: {source}")]
    MetricsIoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
