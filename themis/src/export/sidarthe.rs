//! SIDARTHE simulation input.
//!
//! The Matlab simulation reads seven assignments, one per line:
//!
//! ```text
//! CasiTotali=[352 401 459]/popolazione;
//! ```
//!
//! Values are space separated and `popolazione` is left for the simulation
//! to substitute. The file is a byte-exact contract.

use std::path::Path;

use crate::error::ExportResult;
use crate::models::{Column, Dataset};

use super::write_atomic;

/// Placeholder the simulation replaces with the population size.
pub const POPULATION_PLACEHOLDER: &str = "popolazione";

/// One assignment line, without the trailing newline.
pub fn format_series(column: Column, values: &[u64]) -> String {
    let joined = values
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}=[{}]/{};", column.name(), joined, POPULATION_PLACEHOLDER)
}

/// The whole file: one line per [`Column::SIDARTHE`] series.
pub fn format_sidarthe(dataset: &Dataset) -> String {
    let mut output = String::new();
    for column in Column::SIDARTHE {
        let values = dataset.series(column).unwrap_or_default();
        output.push_str(&format_series(column, &values));
        output.push('\n');
    }
    output
}

/// Write the SIDARTHE file for `dataset`, replacing any existing file.
pub fn write_sidarthe(path: &Path, dataset: &Dataset) -> ExportResult<()> {
    write_atomic(path, format_sidarthe(dataset).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use chrono::NaiveDate;
    use regex::Regex;
    use std::fs;
    use tempfile::tempdir;

    fn record(day: u32, values: [u64; 7]) -> Record {
        Record {
            date: NaiveDate::from_ymd_opt(2020, 4, day).unwrap(),
            casi_totali: values[0],
            deceduti: values[1],
            guariti: values[2],
            isolamento_domiciliare: values[3],
            ricoverati_sintomi: values[4],
            terapia_intensiva: values[5],
            positivi: values[6],
        }
    }

    #[test]
    fn test_format_series() {
        assert_eq!(
            format_series(Column::Positivi, &[4]),
            "Positivi=[4]/popolazione;"
        );
        assert_eq!(
            format_series(Column::Deceduti, &[1, 22, 333]),
            "Deceduti=[1 22 333]/popolazione;"
        );
        assert_eq!(format_series(Column::Guariti, &[]), "Guariti=[]/popolazione;");
    }

    #[test]
    fn test_format_sidarthe_exact_bytes() {
        let dataset = Dataset::new(vec![
            record(3, [10, 1, 2, 3, 4, 5, 12]),
            record(4, [11, 1, 3, 4, 4, 5, 13]),
        ]);

        let expected = "CasiTotali=[10 11]/popolazione;\n\
                        Deceduti=[1 1]/popolazione;\n\
                        Guariti=[2 3]/popolazione;\n\
                        Isolamento_domiciliare=[3 4]/popolazione;\n\
                        Ricoverati_sintomi=[4 4]/popolazione;\n\
                        Terapia_intensiva=[5 5]/popolazione;\n\
                        Positivi=[12 13]/popolazione;\n";
        assert_eq!(format_sidarthe(&dataset), expected);
    }

    #[test]
    fn test_write_sidarthe_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("sidarthe.txt");
        let dataset = Dataset::new(vec![record(3, [10, 1, 2, 3, 4, 5, 12])]);

        write_sidarthe(&path, &Dataset::default()).unwrap();
        write_sidarthe(&path, &dataset).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, format_sidarthe(&dataset));
        assert!(text.starts_with("CasiTotali=[10]/popolazione;\n"));
    }

    #[test]
    fn test_empty_dataset_has_empty_brackets() {
        let text = format_sidarthe(&Dataset::default());
        assert_eq!(text.lines().count(), 7);
        assert!(text.lines().all(|l| l.contains("=[]/popolazione;")));
    }

    #[test]
    fn test_lines_match_contract_pattern() {
        let dataset = Dataset::new(vec![
            record(3, [10, 0, 2, 3, 4, 5, 12]),
            record(4, [11, 1, 3, 4, 4, 5, 13]),
            record(5, [12, 1, 3, 4, 4, 5, 13]),
        ]);
        let text = format_sidarthe(&dataset);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);

        for (line, column) in lines.iter().zip(Column::SIDARTHE) {
            let pattern = format!(r"^{}=\[[0-9 ]*\]/popolazione;$", column.name());
            assert!(Regex::new(&pattern).unwrap().is_match(line), "bad line: {line}");
            assert!(!line.contains(" ]"));
            assert!(!line.contains(','));
        }
        assert!(text.ends_with(";\n"));
    }
}
