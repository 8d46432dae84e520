//! Domain models for the Themis pipeline.
//!
//! - [`Column`] - canonical output columns and their exact names
//! - [`Observation`] - one dated row of source metrics, canonical names applied
//! - [`Record`] - an observation plus the derived `Positivi` count
//! - [`Dataset`] - the ordered sequence of records handed to the exporters

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Columns
// =============================================================================

/// Canonical column of the output dataset.
///
/// Names follow the Italian SIDARTHE convention and are part of the
/// output contract, so they are spelled exactly as the simulation expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    Date,
    /// D+R+T+E+H_diagnosticati
    CasiTotali,
    /// E: deaths
    Deceduti,
    /// H_diagnosticati: recovered
    Guariti,
    /// D: currently positive, isolated at home
    #[serde(rename = "Isolamento_domiciliare")]
    IsolamentoDomiciliare,
    /// R: currently positive, hospitalized
    #[serde(rename = "Ricoverati_sintomi")]
    RicoveratiSintomi,
    /// T: currently positive, in ICU
    #[serde(rename = "Terapia_intensiva")]
    TerapiaIntensiva,
    /// D+R+T: currently positive
    Positivi,
}

impl Column {
    /// All columns in CSV output order.
    pub const ALL: [Column; 8] = [
        Column::Date,
        Column::CasiTotali,
        Column::Deceduti,
        Column::Guariti,
        Column::IsolamentoDomiciliare,
        Column::RicoveratiSintomi,
        Column::TerapiaIntensiva,
        Column::Positivi,
    ];

    /// Columns that must be mapped from a source column. `Positivi` is derived.
    pub const INPUT: [Column; 7] = [
        Column::Date,
        Column::CasiTotali,
        Column::Deceduti,
        Column::Guariti,
        Column::IsolamentoDomiciliare,
        Column::RicoveratiSintomi,
        Column::TerapiaIntensiva,
    ];

    /// Source metric columns, in the order the loader reads them.
    pub const METRICS: [Column; 6] = [
        Column::CasiTotali,
        Column::Deceduti,
        Column::Guariti,
        Column::IsolamentoDomiciliare,
        Column::RicoveratiSintomi,
        Column::TerapiaIntensiva,
    ];

    /// Series written to the SIDARTHE input file, in file order.
    pub const SIDARTHE: [Column; 7] = [
        Column::CasiTotali,
        Column::Deceduti,
        Column::Guariti,
        Column::IsolamentoDomiciliare,
        Column::RicoveratiSintomi,
        Column::TerapiaIntensiva,
        Column::Positivi,
    ];

    /// Exact output name.
    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::CasiTotali => "CasiTotali",
            Column::Deceduti => "Deceduti",
            Column::Guariti => "Guariti",
            Column::IsolamentoDomiciliare => "Isolamento_domiciliare",
            Column::RicoveratiSintomi => "Ricoverati_sintomi",
            Column::TerapiaIntensiva => "Terapia_intensiva",
            Column::Positivi => "Positivi",
        }
    }

    /// Look up a column by its exact output name.
    pub fn from_name(name: &str) -> Option<Self> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// D+R+T, `None` on overflow.
fn currently_positive(isolamento: u64, ricoverati: u64, terapia: u64) -> Option<u64> {
    isolamento.checked_add(ricoverati)?.checked_add(terapia)
}

// =============================================================================
// Observation
// =============================================================================

/// One dated row of source metrics after renaming, before `Positivi` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub date: NaiveDate,
    pub casi_totali: u64,
    pub deceduti: u64,
    pub guariti: u64,
    pub isolamento_domiciliare: u64,
    pub ricoverati_sintomi: u64,
    pub terapia_intensiva: u64,
}

impl Observation {
    /// Isolamento_domiciliare + Ricoverati_sintomi + Terapia_intensiva.
    pub fn positivi(&self) -> Option<u64> {
        currently_positive(
            self.isolamento_domiciliare,
            self.ricoverati_sintomi,
            self.terapia_intensiva,
        )
    }

    /// Attach a precomputed `Positivi` value.
    pub fn into_record(self, positivi: u64) -> Record {
        Record {
            date: self.date,
            casi_totali: self.casi_totali,
            deceduti: self.deceduti,
            guariti: self.guariti,
            isolamento_domiciliare: self.isolamento_domiciliare,
            ricoverati_sintomi: self.ricoverati_sintomi,
            terapia_intensiva: self.terapia_intensiva,
            positivi,
        }
    }
}

// =============================================================================
// Record
// =============================================================================

/// A fully derived output row.
///
/// Field order and serde names define the CSV layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "CasiTotali")]
    pub casi_totali: u64,
    #[serde(rename = "Deceduti")]
    pub deceduti: u64,
    #[serde(rename = "Guariti")]
    pub guariti: u64,
    #[serde(rename = "Isolamento_domiciliare")]
    pub isolamento_domiciliare: u64,
    #[serde(rename = "Ricoverati_sintomi")]
    pub ricoverati_sintomi: u64,
    #[serde(rename = "Terapia_intensiva")]
    pub terapia_intensiva: u64,
    #[serde(rename = "Positivi")]
    pub positivi: u64,
}

impl Record {
    /// Integer value of a metric column; `None` for [`Column::Date`].
    pub fn value(&self, column: Column) -> Option<u64> {
        match column {
            Column::Date => None,
            Column::CasiTotali => Some(self.casi_totali),
            Column::Deceduti => Some(self.deceduti),
            Column::Guariti => Some(self.guariti),
            Column::IsolamentoDomiciliare => Some(self.isolamento_domiciliare),
            Column::RicoveratiSintomi => Some(self.ricoverati_sintomi),
            Column::TerapiaIntensiva => Some(self.terapia_intensiva),
            Column::Positivi => Some(self.positivi),
        }
    }

    /// `Positivi` as it would be derived from this row's sub-populations.
    pub fn recomputed_positivi(&self) -> Option<u64> {
        currently_positive(
            self.isolamento_domiciliare,
            self.ricoverati_sintomi,
            self.terapia_intensiva,
        )
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Ordered sequence of records, as produced by the last pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset(Vec<Record>);

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self(records)
    }

    pub fn records(&self) -> &[Record] {
        &self.0
    }

    pub fn into_records(self) -> Vec<Record> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }

    /// Full ordered series of a metric column; `None` for [`Column::Date`].
    pub fn series(&self, column: Column) -> Option<Vec<u64>> {
        self.0.iter().map(|r| r.value(column)).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.0.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.0.last().map(|r| r.date)
    }

    /// True when dates never decrease from one record to the next.
    pub fn is_sorted_by_date(&self) -> bool {
        self.0.windows(2).all(|w| w[0].date <= w[1].date)
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
