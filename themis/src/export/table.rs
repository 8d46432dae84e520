//! Normalized CSV artifact.
//!
//! Header is the eight canonical column names, one row per record, no
//! index column, `\n` line endings. An empty dataset still gets its header.

use std::fs;
use std::path::Path;

use crate::error::{ExportError, ExportResult, VerifyError, VerifyResult};
use crate::models::{Column, Dataset, Record};

use super::write_atomic;

/// Serialize `dataset` to CSV bytes.
pub fn render_csv(dataset: &Dataset) -> ExportResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(Column::ALL.iter().map(|c| c.name()))?;
    for record in dataset {
        writer.serialize(record)?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

/// Write `dataset` to `path`, replacing any existing file.
pub fn write_csv(path: &Path, dataset: &Dataset) -> ExportResult<()> {
    write_atomic(path, &render_csv(dataset)?)
}

/// Read a CSV artifact back. Returns its header and records.
pub fn read_csv(path: &Path) -> VerifyResult<(Vec<String>, Dataset)> {
    let content = fs::read_to_string(path).map_err(|source| VerifyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(&content)
}

/// Parse CSV artifact text.
pub fn parse_csv(content: &str) -> VerifyResult<(Vec<String>, Dataset)> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());

    let headers = reader.headers()?.iter().map(String::from).collect();
    let records = reader
        .deserialize::<Record>()
        .collect::<Result<Vec<_>, csv::Error>>()?;

    Ok((headers, Dataset::new(records)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    const HEADER: &str = "Date,CasiTotali,Deceduti,Guariti,Isolamento_domiciliare,Ricoverati_sintomi,Terapia_intensiva,Positivi";

    fn sample() -> Dataset {
        Dataset::new(vec![
            Record {
                date: NaiveDate::from_ymd_opt(2020, 4, 3).unwrap(),
                casi_totali: 352,
                deceduti: 30,
                guariti: 8,
                isolamento_domiciliare: 200,
                ricoverati_sintomi: 90,
                terapia_intensiva: 24,
                positivi: 314,
            },
            Record {
                date: NaiveDate::from_ymd_opt(2020, 4, 4).unwrap(),
                casi_totali: 401,
                deceduti: 34,
                guariti: 10,
                isolamento_domiciliare: 230,
                ricoverati_sintomi: 101,
                terapia_intensiva: 26,
                positivi: 357,
            },
        ])
    }

    #[test]
    fn test_render_csv_layout() {
        let text = String::from_utf8(render_csv(&sample()).unwrap()).unwrap();
        let expected = format!(
            "{HEADER}\n2020-04-03,352,30,8,200,90,24,314\n2020-04-04,401,34,10,230,101,26,357\n"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_dataset_writes_header_only() {
        let text = String::from_utf8(render_csv(&Dataset::default()).unwrap()).unwrap();
        assert_eq!(text, format!("{HEADER}\n"));
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pernambuco.csv");

        write_csv(&path, &sample()).unwrap();
        let (headers, dataset) = read_csv(&path).unwrap();

        let names: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(headers, names);
        assert_eq!(dataset, sample());
    }

    #[test]
    fn test_recomputed_positivi_is_idempotent() {
        let text = String::from_utf8(render_csv(&sample()).unwrap()).unwrap();
        let (_, dataset) = parse_csv(&text).unwrap();

        for record in &dataset {
            assert_eq!(record.recomputed_positivi(), Some(record.positivi));
        }
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_csv(Path::new("no/such/artifact.csv")).unwrap_err();
        assert!(matches!(err, VerifyError::Io { .. }));
    }
}
