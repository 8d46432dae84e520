//! High-level pipeline API.
//!
//! Combines every step: loading, the pure stages, and both exports.
//!
//! # Example
//!
//! ```rust,ignore
//! use themis::{execute, PipelineConfig, TransformOptions};
//!
//! let config = PipelineConfig::load(None)?;
//! let options = TransformOptions {
//!     start: "2020-04-03".parse().ok(),
//!     end: "2020-05-19".parse().ok(),
//!     ..TransformOptions::default()
//! };
//! let run = execute(&config, &options)?;
//! println!("Wrote {} days", run.dataset.len());
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::stages::{
    add_positivi, filter_by_date, order_by_date, parse_counts, parse_dates,
    remove_invalid_dates, rename_columns,
};
use crate::config::{PipelineConfig, AUTO_ENCODING};
use crate::error::PipelineError;
use crate::export::{format_sidarthe, render_csv, write_all_atomic};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::Dataset;
use crate::parser::{self, ParseResult};

/// Per-run options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Inclusive lower bound; ignored unless `end` is also set
    pub start: Option<NaiveDate>,

    /// Inclusive upper bound; ignored unless `start` is also set
    pub end: Option<NaiveDate>,

    /// Run every stage but write nothing
    pub dry_run: bool,
}

impl TransformOptions {
    /// True when both bounds are set and the range filter applies.
    pub fn has_range(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// Row accounting for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub rows_read: usize,
    pub rows_before_epidemic: usize,
    pub rows_out_of_range: usize,
    pub rows_written: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub range_applied: bool,
    pub encoding: String,
    pub delimiter: char,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Final dataset, as exported
    pub dataset: Dataset,

    /// Row accounting
    pub stats: PipelineStats,
}

/// Run the whole pipeline for `config`.
///
/// 1. Loads the input file
/// 2. Parses, validates, sorts, renames and derives (see [`transform`])
/// 3. Applies the optional date range
/// 4. Writes the CSV and SIDARTHE artifacts (unless `dry_run`)
///
/// Both artifacts are replaced together or not at all: a failed run leaves
/// the previous files (if any) in place.
pub fn execute(
    config: &PipelineConfig,
    options: &TransformOptions,
) -> Result<PipelineRun, PipelineError> {
    config.validate()?;

    log_info(format!("📖 Reading {}...", config.input_path.display()));
    let parsed = parser::load(config)?;

    let run = transform(parsed, config, options)?;

    if options.dry_run {
        log_info("(dry run: no files written)");
        return Ok(run);
    }

    export(config, &run.dataset)?;
    Ok(run)
}

/// Transform in-memory CSV bytes; nothing is read from or written to disk.
pub fn transform_bytes(
    bytes: &[u8],
    config: &PipelineConfig,
    options: &TransformOptions,
) -> Result<PipelineRun, PipelineError> {
    config.validate()?;
    let parsed = parser::parse_bytes(bytes, config)?;
    transform(parsed, config, options)
}

/// Run the pure stages on an already loaded input.
pub fn transform(
    parsed: ParseResult,
    config: &PipelineConfig,
    options: &TransformOptions,
) -> Result<PipelineRun, PipelineError> {
    let rows_read = parsed.table.len();
    log_success(describe_encoding(&parsed.encoding, &config.encoding));
    log_success(format!("Separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", rows_read));

    log_info("🗓️  Parsing dates...");
    let table = parse_dates(parsed.table, &config.date_format)?;

    let table = remove_invalid_dates(table, config.epidemic_start_date);
    let rows_before_epidemic = rows_read - table.len();
    if rows_before_epidemic > 0 {
        log_info_indent(
            format!(
                "Dropped {} rows dated before {}",
                rows_before_epidemic, config.epidemic_start_date
            ),
            1,
        );
    }

    let table = parse_counts(table)?;
    let table = order_by_date(table);

    log_info("🗺️  Renaming columns...");
    for source in &table.columns {
        if let Some(target) = config.column_rename_map.target_for(source) {
            log_info_indent(format!("{} → {}", source, target), 1);
        }
    }
    let observations = rename_columns(table, &config.column_rename_map)?;

    log_info("➕ Computing Positivi...");
    let dataset = add_positivi(observations)?;
    let derived = dataset.len();

    match (options.start, options.end) {
        (Some(start), None) => log_warning(format!(
            "Only a start date ({start}) was given; both bounds are required, no range filter applied"
        )),
        (None, Some(end)) => log_warning(format!(
            "Only an end date ({end}) was given; both bounds are required, no range filter applied"
        )),
        (Some(start), Some(end)) => log_info(format!("📅 Keeping {start} .. {end}")),
        (None, None) => {}
    }
    let dataset = filter_by_date(dataset, options.start, options.end);

    let stats = PipelineStats {
        rows_read,
        rows_before_epidemic,
        rows_out_of_range: derived - dataset.len(),
        rows_written: dataset.len(),
        first_date: dataset.first_date(),
        last_date: dataset.last_date(),
        range_applied: options.has_range(),
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
    };

    match (stats.first_date, stats.last_date) {
        (Some(first), Some(last)) => log_success(format!(
            "{} records from {} to {}",
            stats.rows_written, first, last
        )),
        _ => log_warning("No records left after filtering; writing empty artifacts"),
    }

    Ok(PipelineRun { dataset, stats })
}

/// Render both artifacts, then commit them together.
fn export(config: &PipelineConfig, dataset: &Dataset) -> Result<(), PipelineError> {
    let csv = render_csv(dataset)?;
    let sim = format_sidarthe(dataset);

    write_all_atomic(&[
        (config.output_csv_path.as_path(), csv.as_slice()),
        (config.output_sim_path.as_path(), sim.as_bytes()),
    ])?;

    log_success(format!("💾 CSV written to: {}", config.output_csv_path.display()));
    log_success(format!(
        "💾 SIDARTHE input written to: {}",
        config.output_sim_path.display()
    ));

    Ok(())
}

/// "Detected" only when the encoding was guessed.
fn describe_encoding(used: &str, configured: &str) -> String {
    if configured.eq_ignore_ascii_case(AUTO_ENCODING) {
        format!("Detected encoding: {}", used)
    } else {
        format!("Encoding: {}", used)
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}
