//! Input loading: encoding, delimiter and column selection.
//!
//! Reads the state bulletin CSV and keeps only the columns named in the
//! column map. Cells stay as trimmed text: rows dated before the epidemic
//! are noise and are dropped before any metric is typed.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use encoding_rs::Encoding;

use crate::config::{ColumnMap, PipelineConfig, AUTO_ENCODING};
use crate::error::{LoadError, LoadResult};
use crate::models::Column;

/// One selected input row, untyped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line in the input file (header is line 1)
    pub line: usize,
    pub date: String,
    /// Metric cells, aligned with `RawTable::columns[1..]`
    pub cells: Vec<String>,
}

/// Selected columns of the input, in loader order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Source names: date column first, then the metric columns
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of loading with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Selected and typed rows
    pub table: RawTable,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// All column headers of the file
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with an `encoding_rs` label. Malformed input is an error.
pub fn decode_content(bytes: &[u8], label: &str) -> LoadResult<String> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| LoadError::UnknownEncoding(label.to_string()))?;

    // A BOM, if present, wins over the label and is stripped.
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(LoadError::Encoding(used.name().to_string()));
    }
    Ok(text.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Load the configured input file.
pub fn load(config: &PipelineConfig) -> LoadResult<ParseResult> {
    load_file(&config.input_path, config)
}

/// Load `path` with the encoding, delimiter and columns of `config`.
pub fn load_file(path: &Path, config: &PipelineConfig) -> LoadResult<ParseResult> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes(&bytes, config)
}

/// Decode and parse in-memory CSV bytes.
pub fn parse_bytes(bytes: &[u8], config: &PipelineConfig) -> LoadResult<ParseResult> {
    let encoding = if config.encoding.eq_ignore_ascii_case(AUTO_ENCODING) {
        detect_encoding(bytes)
    } else {
        config.encoding.clone()
    };

    let content = decode_content(bytes, &encoding)?;

    let delimiter = config
        .delimiter
        .unwrap_or_else(|| detect_delimiter(&content));

    let (headers, table) = parse_table(&content, delimiter, &config.column_rename_map)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse decoded CSV text, selecting the columns named in `columns`.
///
/// Returns every header of the file and the selected table.
pub fn parse_table(
    content: &str,
    delimiter: char,
    columns: &ColumnMap,
) -> LoadResult<(Vec<String>, RawTable)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_header_name)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::EmptyFile);
    }

    let header_map: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let selected = select_columns(columns, &header_map)?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);

        if record.iter().all(str::is_empty) {
            continue;
        }

        let cell = |i: usize| record.get(i).unwrap_or("").to_string();

        let date = cell(selected[0].1);
        let cells = selected[1..].iter().map(|(_, i)| cell(*i)).collect();

        rows.push(RawRow { line, date, cells });
    }

    let table = RawTable {
        columns: selected.iter().map(|(name, _)| name.to_string()).collect(),
        rows,
    };

    Ok((headers, table))
}

/// Resolve every input column to `(source name, header index)`, date first.
fn select_columns<'a>(
    columns: &'a ColumnMap,
    header_map: &HashMap<&str, usize>,
) -> LoadResult<Vec<(&'a str, usize)>> {
    let mut selected = Vec::with_capacity(Column::INPUT.len());
    let mut missing = Vec::new();

    for column in Column::INPUT {
        match columns.source_for(column) {
            Some(source) => match header_map.get(source) {
                Some(idx) => selected.push((source, *idx)),
                None => missing.push(source.to_string()),
            },
            None => missing.push(format!("<source for {column}>")),
        }
    }

    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }
    Ok(selected)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes keep a BOM on the first header.
    name.trim().trim_start_matches('\u{feff}').to_string()
}
