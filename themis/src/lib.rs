//! # Themis - SIDARTHE input preparation
//!
//! Themis cleans the Pernambuco COVID-19 case-count bulletin and reshapes it
//! into the two artifacts the SIDARTHE simulation workflow needs: a
//! normalized CSV and the Matlab assignment file.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │  Bulletin   │────▶│   Loader    │────▶│   Stages    │────▶│  CSV + .txt  │
//! │    (CSV)    │     │ (enc/delim) │     │   (pure)    │     │  (atomic)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use themis::{execute, PipelineConfig, TransformOptions};
//!
//! let config = PipelineConfig::load(None)?;
//! let run = execute(&config, &TransformOptions::default())?;
//! println!("Wrote {} days", run.dataset.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Layered error types
//! - [`config`] - Pipeline configuration (defaults, JSON, environment)
//! - [`models`] - Domain models (Column, Observation, Record, Dataset)
//! - [`parser`] - CSV loading with encoding and delimiter handling
//! - [`transform`] - Pure stages and the pipeline
//! - [`export`] - CSV and SIDARTHE writers, artifact verification
//! - [`logs`] - Run log
//! - [`report`] - JSON run report

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Loading
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod export;
pub mod report;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ExportError,
    LoadError,
    PipelineError,
    TransformError,
    VerifyError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ColumnMap, PipelineConfig};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Column,
    Dataset,
    Observation,
    Record,
};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    load,
    parse_bytes,
    ParseResult,
    RawRow,
    RawTable,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    execute,
    transform,
    transform_bytes,
    PipelineRun,
    PipelineStats,
    TransformOptions,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{
    format_sidarthe,
    read_csv,
    verify,
    write_csv,
    write_sidarthe,
    VerifySummary,
};

pub use report::RunReport;
