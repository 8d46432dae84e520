//! Consistency checks on written artifacts.
//!
//! Re-reads the CSV and SIDARTHE files and checks the output invariants:
//! canonical header, dates in order, `Positivi` identity, and a SIDARTHE
//! file that matches the CSV series byte for byte.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{VerifyError, VerifyResult};
use crate::models::{Column, Dataset};

use super::sidarthe::format_sidarthe;
use super::table::{parse_csv, read_csv};

/// What a successful verification saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifySummary {
    pub records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Verify the artifacts at `csv_path` and `sim_path`.
pub fn verify(csv_path: &Path, sim_path: &Path) -> VerifyResult<VerifySummary> {
    let (headers, dataset) = read_csv(csv_path)?;
    let sim = fs::read_to_string(sim_path).map_err(|source| VerifyError::Io {
        path: sim_path.to_path_buf(),
        source,
    })?;

    check(&headers, &dataset, &sim)?;
    Ok(summary(&dataset))
}

/// Verify artifact contents already in memory.
pub fn verify_artifacts(csv: &str, sim: &str) -> VerifyResult<VerifySummary> {
    let (headers, dataset) = parse_csv(csv)?;
    check(&headers, &dataset, sim)?;
    Ok(summary(&dataset))
}

fn check(headers: &[String], dataset: &Dataset, sim: &str) -> VerifyResult<()> {
    let expected: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
    if headers != expected.as_slice() {
        return Err(VerifyError::Mismatch(format!(
            "CSV header is '{}', expected '{}'",
            headers.join(","),
            expected.join(",")
        )));
    }

    if let Some(pair) = dataset.records().windows(2).find(|w| w[0].date > w[1].date) {
        return Err(VerifyError::Mismatch(format!(
            "dates out of order: {} before {}",
            pair[0].date, pair[1].date
        )));
    }

    if let Some(record) = dataset
        .iter()
        .find(|r| r.recomputed_positivi() != Some(r.positivi))
    {
        return Err(VerifyError::Mismatch(format!(
            "Positivi on {} is {}, expected Isolamento_domiciliare + Ricoverati_sintomi + Terapia_intensiva",
            record.date, record.positivi
        )));
    }

    let expected_sim = format_sidarthe(dataset);
    if sim != expected_sim {
        let line = sim
            .lines()
            .zip(expected_sim.lines())
            .position(|(a, b)| a != b)
            .map(|i| i + 1)
            .unwrap_or_else(|| sim.lines().count().min(expected_sim.lines().count()) + 1);
        return Err(VerifyError::Mismatch(format!(
            "SIDARTHE file differs from the CSV series at line {line}"
        )));
    }

    Ok(())
}

fn summary(dataset: &Dataset) -> VerifySummary {
    VerifySummary {
        records: dataset.len(),
        first_date: dataset.first_date(),
        last_date: dataset.last_date(),
    }
}
