//! Pure pipeline stages.
//!
//! Each stage takes its input by value and returns the next shape:
//!
//! ```text
//! RawTable ─parse_dates─▶ DatedTable ─remove_invalid_dates─▶ DatedTable
//!     ─parse_counts─▶ CountTable ─order_by_date─▶ CountTable
//!     ─rename_columns─▶ Vec<Observation> ─add_positivi─▶ Dataset
//!     ─filter_by_date─▶ Dataset
//! ```
//!
//! Stages depend on the column names and row set of the previous one and
//! must run in this order.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::ColumnMap;
use crate::error::{TransformError, TransformResult};
use crate::models::{Column, Dataset, Observation};
use crate::parser::RawTable;

/// A loaded row whose date has been parsed. Metric cells are still text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedRow {
    pub line: usize,
    pub date: NaiveDate,
    pub cells: Vec<String>,
}

/// [`RawTable`] with a typed date column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatedTable {
    pub columns: Vec<String>,
    pub rows: Vec<DatedRow>,
}

impl DatedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A dated row with its metric cells typed as counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRow {
    pub line: usize,
    pub date: NaiveDate,
    /// Aligned with `CountTable::columns[1..]`
    pub metrics: Vec<u64>,
}

/// [`DatedTable`] with typed metric columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    pub columns: Vec<String>,
    pub rows: Vec<CountRow>,
}

/// Parse the date column with `format`. Any bad value aborts the run.
pub fn parse_dates(table: RawTable, format: &str) -> TransformResult<DatedTable> {
    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            let date = NaiveDate::parse_from_str(&row.date, format).map_err(|_| {
                TransformError::DateParse {
                    line: row.line,
                    value: row.date.clone(),
                    format: format.to_string(),
                }
            })?;
            Ok(DatedRow {
                line: row.line,
                date,
                cells: row.cells,
            })
        })
        .collect::<TransformResult<Vec<_>>>()?;

    Ok(DatedTable {
        columns: table.columns,
        rows,
    })
}

/// Drop rows dated before `epidemic_start`.
pub fn remove_invalid_dates(table: DatedTable, epidemic_start: NaiveDate) -> DatedTable {
    DatedTable {
        columns: table.columns,
        rows: table
            .rows
            .into_iter()
            .filter(|row| row.date >= epidemic_start)
            .collect(),
    }
}

/// Type every metric cell as a count.
///
/// Runs after [`remove_invalid_dates`]: pre-epidemic rows are never typed.
/// A bad cell in a kept row aborts the run.
pub fn parse_counts(table: DatedTable) -> TransformResult<CountTable> {
    let DatedTable { columns, rows } = table;

    let rows = rows
        .into_iter()
        .map(|row| {
            let metrics = row
                .cells
                .iter()
                .enumerate()
                .map(|(idx, cell)| {
                    parse_count(cell).ok_or_else(|| TransformError::InvalidValue {
                        line: row.line,
                        column: columns.get(idx + 1).cloned().unwrap_or_default(),
                        value: cell.clone(),
                    })
                })
                .collect::<TransformResult<Vec<u64>>>()?;
            Ok(CountRow {
                line: row.line,
                date: row.date,
                metrics,
            })
        })
        .collect::<TransformResult<Vec<_>>>()?;

    Ok(CountTable { columns, rows })
}

/// Parse a count cell. `"12.0"` is accepted as 12; fractions, signs and
/// blanks are not.
fn parse_count(s: &str) -> Option<u64> {
    if !s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(v) = s.parse::<u64>() {
        return Some(v);
    }

    let (int_part, frac) = s.split_once('.')?;
    if !frac.is_empty() && frac.chars().all(|c| c == '0') {
        int_part.parse::<u64>().ok()
    } else {
        None
    }
}

/// Stable ascending sort by date; duplicate dates keep input order.
pub fn order_by_date(mut table: CountTable) -> CountTable {
    table.rows.sort_by_key(|row| row.date);
    table
}

/// Apply the column map, producing canonical observations.
///
/// The map must cover every column of the table and every input column.
pub fn rename_columns(table: CountTable, columns: &ColumnMap) -> TransformResult<Vec<Observation>> {
    let mut positions: HashMap<Column, usize> = HashMap::new();
    for (idx, source) in table.columns.iter().enumerate() {
        let target = columns
            .target_for(source)
            .ok_or_else(|| TransformError::Unmapped(source.clone()))?;
        positions.insert(target, idx);
    }

    if positions.get(&Column::Date) != Some(&0) {
        return Err(TransformError::Unmapped(Column::Date.to_string()));
    }

    // Metric slot inside `CountRow::metrics` for each canonical metric.
    let mut slots = [0usize; 6];
    for (slot, metric) in slots.iter_mut().zip(Column::METRICS) {
        *slot = positions
            .get(&metric)
            .filter(|idx| **idx > 0)
            .map(|idx| idx - 1)
            .ok_or_else(|| TransformError::Unmapped(metric.to_string()))?;
    }

    table
        .rows
        .into_iter()
        .map(|row| {
            let value = |slot: usize| {
                row.metrics
                    .get(slot)
                    .copied()
                    .ok_or_else(|| TransformError::Unmapped(format!("line {} slot {slot}", row.line)))
            };
            Ok(Observation {
                date: row.date,
                casi_totali: value(slots[0])?,
                deceduti: value(slots[1])?,
                guariti: value(slots[2])?,
                isolamento_domiciliare: value(slots[3])?,
                ricoverati_sintomi: value(slots[4])?,
                terapia_intensiva: value(slots[5])?,
            })
        })
        .collect()
}

/// Derive `Positivi` for every observation.
pub fn add_positivi(observations: Vec<Observation>) -> TransformResult<Dataset> {
    observations
        .into_iter()
        .map(|obs| {
            let positivi = obs
                .positivi()
                .ok_or(TransformError::Overflow { date: obs.date })?;
            Ok(obs.into_record(positivi))
        })
        .collect::<TransformResult<Vec<_>>>()
        .map(Dataset::new)
}

/// Keep records with `start <= date <= end`.
///
/// Both bounds or neither: when either bound is missing the dataset is
/// returned untouched, not filtered on the bound that is present.
pub fn filter_by_date(
    dataset: Dataset,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Dataset {
    let (Some(start), Some(end)) = (start, end) else {
        return dataset;
    };

    dataset
        .into_records()
        .into_iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect::<Vec<_>>()
        .into()
}
