//! JSON run report.
//!
//! Summarizes one pipeline run (paths, bounds, row accounting and the run
//! log) for archiving next to the artifacts.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::{ExportError, ExportResult};
use crate::export::write_atomic;
use crate::logs::{LogEntry, RunLog};
use crate::transform::{PipelineStats, TransformOptions};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub generated_at: String,
    pub input_path: PathBuf,
    pub output_csv_path: PathBuf,
    pub output_sim_path: PathBuf,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub dry_run: bool,
    pub stats: PipelineStats,
    pub logs: Vec<LogEntry>,
}

impl RunReport {
    pub fn new(
        config: &PipelineConfig,
        options: &TransformOptions,
        stats: PipelineStats,
        logs: Vec<LogEntry>,
    ) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            input_path: config.input_path.clone(),
            output_csv_path: config.output_csv_path.clone(),
            output_sim_path: config.output_sim_path.clone(),
            start: options.start,
            end: options.end,
            dry_run: options.dry_run,
            stats,
            logs,
        }
    }

    /// Build a report that owns the entries of `log`, leaving it empty.
    ///
    /// A later run in the same process starts from a clean history.
    pub fn collect(
        config: &PipelineConfig,
        options: &TransformOptions,
        stats: PipelineStats,
        log: &RunLog,
    ) -> Self {
        Self::new(config, options, stats, log.take())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write(&self, path: &Path) -> ExportResult<()> {
        let json = self.to_json().map_err(|e| ExportError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        write_atomic(path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogEntry;
    use tempfile::tempdir;

    fn stats() -> PipelineStats {
        PipelineStats {
            rows_read: 3,
            rows_before_epidemic: 2,
            rows_out_of_range: 0,
            rows_written: 1,
            first_date: NaiveDate::from_ymd_opt(2020, 3, 1),
            last_date: NaiveDate::from_ymd_opt(2020, 3, 1),
            range_applied: false,
            encoding: "utf-8".into(),
            delimiter: ',',
        }
    }

    #[test]
    fn test_report_json_shape() {
        let report = RunReport::new(
            &PipelineConfig::default(),
            &TransformOptions::default(),
            stats(),
            vec![LogEntry::warning("Only a start date was given")],
        );
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["inputPath"], "data/in/pernambuco.csv");
        assert_eq!(json["stats"]["rows_before_epidemic"], 2);
        assert_eq!(json["stats"]["first_date"], "2020-03-01");
        assert_eq!(json["start"], serde_json::Value::Null);
        assert_eq!(json["logs"][0]["level"], "warning");
    }

    #[test]
    fn test_collect_drains_log_between_runs() {
        let log = RunLog::new();
        log.set_quiet(true);
        let config = PipelineConfig::default();
        let options = TransformOptions::default();

        log.log(LogEntry::info("first run"));
        let first = RunReport::collect(&config, &options, stats(), &log);

        log.log(LogEntry::info("second run"));
        let second = RunReport::collect(&config, &options, stats(), &log);

        assert_eq!(first.logs, vec![LogEntry::info("first run")]);
        assert_eq!(second.logs, vec![LogEntry::info("second run")]);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_report_written_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        let report = RunReport::new(
            &PipelineConfig::default(),
            &TransformOptions::default(),
            stats(),
            Vec::new(),
        );

        report.write(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("generatedAt"));
    }
}
