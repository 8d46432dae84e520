//! Error types for the Themis data pipeline.
//!
//! One error enum per pipeline layer:
//!
//! - [`ConfigError`] - configuration loading and validation
//! - [`LoadError`] - reading, decoding and typing the input CSV
//! - [`TransformError`] - pure stage failures (dates, column map, arithmetic)
//! - [`ExportError`] - writing the CSV and SIDARTHE artifacts
//! - [`VerifyError`] - consistency checks on previously written artifacts
//! - [`PipelineError`] - top-level errors of a pipeline run
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while building a [`crate::config::PipelineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the expected shape.
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A date option does not follow `YYYY-MM-DD`.
    #[error("Invalid date '{value}' for {field}: expected YYYY-MM-DD")]
    InvalidDate { field: String, value: String },

    /// Column map is not total/injective over the input columns.
    #[error("Invalid column map: {0}")]
    InvalidColumnMap(String),

    /// Delimiter option is not a single ASCII character.
    #[error("Invalid delimiter '{0}': expected a single ASCII character")]
    InvalidDelimiter(String),
}

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while reading the input dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Input file missing or unreadable.
    #[error("Failed to read input file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Encoding label not known to `encoding_rs`.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Bytes are not valid in the configured encoding.
    #[error("Input is not valid {0}")]
    Encoding(String),

    /// Malformed CSV.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// No header row.
    #[error("Input file is empty")]
    EmptyFile,

    /// Required source columns absent from the header.
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors raised by the pure pipeline stages.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Date cell does not match the configured format.
    #[error("Line {line}: cannot parse date '{value}' (expected format '{format}')")]
    DateParse {
        line: usize,
        value: String,
        format: String,
    },

    /// A metric cell of a kept row is not a non-negative integer.
    #[error("Line {line}, column '{column}' (value '{value}'): expected a non-negative integer")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },

    /// A column of the table has no counterpart in the column map.
    #[error("Column '{0}' has no mapping")]
    Unmapped(String),

    /// Positivi does not fit in a u64.
    #[error("Positivi overflows on {date}")]
    Overflow { date: NaiveDate },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing output artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Output file or directory could not be written.
    #[error("Failed to write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Output path is taken by something that is not a file.
    #[error("Cannot write '{}': path is a directory", .path.display())]
    NotAFile { path: PathBuf },

    /// CSV serialization failed.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Verification Errors
// =============================================================================

/// Errors while checking written artifacts against each other.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Artifact missing or unreadable.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV artifact could not be parsed back.
    #[error("Invalid CSV artifact: {0}")]
    Csv(#[from] csv::Error),

    /// Artifacts are readable but violate an output invariant.
    #[error("Verification failed: {0}")]
    Mismatch(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::execute`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Input loading error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Stage error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Output error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for stage operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for verification.
pub type VerifyResult<T> = Result<T, VerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // LoadError -> PipelineError
        let load_err = LoadError::MissingColumns(vec!["obitos".into(), "internados_uti".into()]);
        let pipeline_err: PipelineError = load_err.into();
        let msg = pipeline_err.to_string();
        assert!(msg.contains("obitos, internados_uti"));

        // TransformError -> PipelineError
        let transform_err = TransformError::Unmapped("casos".into());
        let pipeline_err: PipelineError = transform_err.into();
        assert!(pipeline_err.to_string().contains("casos"));
    }

    #[test]
    fn test_date_parse_error_format() {
        let err = TransformError::DateParse {
            line: 7,
            value: "03/04/2020".into(),
            format: "%Y-%m-%d".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Line 7"));
        assert!(msg.contains("03/04/2020"));
        assert!(msg.contains("%Y-%m-%d"));
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = LoadError::Io {
            path: PathBuf::from("data/in/missing.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("data/in/missing.csv"));
    }
}
