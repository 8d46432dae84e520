//! Pipeline configuration.
//!
//! Every run is driven by a [`PipelineConfig`]. It is built in layers,
//! lowest precedence first:
//!
//! 1. [`PipelineConfig::default`] - the Pernambuco dataset layout
//! 2. an optional JSON file (all fields optional)
//! 3. `THEMIS_*` environment variables (a `.env` file is loaded if present)
//! 4. command-line flags, applied by the binary
//!
//! ```json
//! {
//!   "input_path": "data/in/pernambuco.csv",
//!   "epidemic_start_date": "2020-02-26",
//!   "column_rename_map": { "dt_referencia": "Date", "obitos": "Deceduti" }
//! }
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::models::Column;

/// Input dataset, relative to the working directory.
pub const DEFAULT_INPUT_PATH: &str = "data/in/pernambuco.csv";

/// Normalized CSV output.
pub const DEFAULT_OUTPUT_CSV_PATH: &str = "data/out/pernambuco.csv";

/// SIDARTHE simulation input.
pub const DEFAULT_OUTPUT_SIM_PATH: &str = "data/out/sidarthe.txt";

/// First confirmed case in the state; earlier rows are feed noise.
pub const COVID_FIRST_CASE_DATE: &str = "2020-02-26";

pub const DATE_ISO_FORMAT: &str = "%Y-%m-%d";

pub const FILE_ENCODING: &str = "utf-8";

/// Encoding value that asks the loader to guess.
pub const AUTO_ENCODING: &str = "auto";

/// Source column names of the state bulletin, mapped to canonical columns.
pub const DEFAULT_COLUMN_RENAME_MAP: [(&str, Column); 7] = [
    ("dt_referencia", Column::Date),
    ("casos_totais", Column::CasiTotali),
    ("obitos", Column::Deceduti),
    ("recuperados", Column::Guariti),
    ("isolamento_domiciliar", Column::IsolamentoDomiciliare),
    ("internados_enfermaria", Column::RicoveratiSintomi),
    ("internados_uti", Column::TerapiaIntensiva),
];

// =============================================================================
// Column map
// =============================================================================

/// Source column name -> canonical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap(BTreeMap<String, Column>);

impl ColumnMap {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(|(s, c)| (s.into(), c)).collect())
    }

    /// Source column feeding `column`, if mapped.
    pub fn source_for(&self, column: Column) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, target)| **target == column)
            .map(|(source, _)| source.as_str())
    }

    /// Canonical column for a source header, if mapped.
    pub fn target_for(&self, source: &str) -> Option<Column> {
        self.0.get(source).copied()
    }

    /// Source names in loader order: date column first, then the metrics.
    pub fn required_sources(&self) -> Vec<&str> {
        Column::INPUT
            .iter()
            .filter_map(|c| self.source_for(*c))
            .collect()
    }

    /// The map must name exactly one source for each input column and
    /// must not target the derived `Positivi` column.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some((source, _)) = self.0.iter().find(|(_, c)| **c == Column::Positivi) {
            return Err(ConfigError::InvalidColumnMap(format!(
                "Positivi is derived and cannot be read from '{source}'"
            )));
        }

        for column in Column::INPUT {
            let sources: Vec<&str> = self
                .0
                .iter()
                .filter(|(_, target)| **target == column)
                .map(|(source, _)| source.as_str())
                .collect();

            match sources.len() {
                0 => {
                    return Err(ConfigError::InvalidColumnMap(format!(
                        "no source column for {column}"
                    )))
                }
                1 => {}
                _ => {
                    return Err(ConfigError::InvalidColumnMap(format!(
                        "multiple source columns for {column}: {}",
                        sources.join(", ")
                    )))
                }
            }
        }

        Ok(())
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMN_RENAME_MAP)
    }
}

// =============================================================================
// Pipeline config
// =============================================================================

/// Options for a pipeline run that do not change between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_csv_path: PathBuf,
    pub output_sim_path: PathBuf,
    pub column_rename_map: ColumnMap,
    pub epidemic_start_date: NaiveDate,
    /// chrono format of the source date column
    pub date_format: String,
    /// `encoding_rs` label, or `auto`
    pub encoding: String,
    /// `None` detects the delimiter from the header line
    pub delimiter: Option<char>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_csv_path: PathBuf::from(DEFAULT_OUTPUT_CSV_PATH),
            output_sim_path: PathBuf::from(DEFAULT_OUTPUT_SIM_PATH),
            column_rename_map: ColumnMap::default(),
            epidemic_start_date: covid_first_case_date(),
            date_format: DATE_ISO_FORMAT.to_string(),
            encoding: FILE_ENCODING.to_string(),
            delimiter: Some(','),
        }
    }
}

impl PipelineConfig {
    /// Defaults, then `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        // Load .env file (if present)
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Override fields from `THEMIS_*` environment variables.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_vars(|key| env::var(key).ok())
    }

    /// Override fields from any variable source (the environment in practice).
    pub fn apply_vars<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("THEMIS_INPUT") {
            self.input_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("THEMIS_OUTPUT_CSV") {
            self.output_csv_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("THEMIS_OUTPUT_SIM") {
            self.output_sim_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("THEMIS_EPIDEMIC_START") {
            self.epidemic_start_date = parse_iso_date("THEMIS_EPIDEMIC_START", &v)?;
        }
        if let Some(v) = lookup("THEMIS_ENCODING") {
            self.encoding = v.trim().to_lowercase();
        }
        if let Some(v) = lookup("THEMIS_DELIMITER") {
            self.delimiter = parse_delimiter(&v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.column_rename_map.validate()?;
        if let Some(d) = self.delimiter {
            if !d.is_ascii() {
                return Err(ConfigError::InvalidDelimiter(d.to_string()));
            }
        }
        Ok(())
    }
}

fn covid_first_case_date() -> NaiveDate {
    NaiveDate::parse_from_str(COVID_FIRST_CASE_DATE, DATE_ISO_FORMAT).unwrap_or(NaiveDate::MIN)
}

/// Parse a `YYYY-MM-DD` option value.
pub fn parse_iso_date(field: &str, value: &str) -> ConfigResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_ISO_FORMAT).map_err(|_| {
        ConfigError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        }
    })
}

/// Parse a delimiter option: a single ASCII character, `tab`/`\t`, or `auto`.
pub fn parse_delimiter(value: &str) -> ConfigResult<Option<char>> {
    match value {
        "auto" => Ok(None),
        "tab" | "\\t" | "\t" => Ok(Some('\t')),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(Some(c)),
                _ => Err(ConfigError::InvalidDelimiter(value.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.epidemic_start_date,
            NaiveDate::from_ymd_opt(2020, 2, 26).unwrap()
        );
        assert_eq!(config.output_sim_path, PathBuf::from("data/out/sidarthe.txt"));
    }

    #[test]
    fn test_required_sources_date_first() {
        let map = ColumnMap::default();
        let sources = map.required_sources();
        assert_eq!(sources.len(), 7);
        assert_eq!(sources[0], "dt_referencia");
        assert_eq!(sources[6], "internados_uti");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{ "input_path": "other.csv", "epidemic_start_date": "2020-03-01" }"#,
        )
        .unwrap();

        assert_eq!(config.input_path, PathBuf::from("other.csv"));
        assert_eq!(
            config.epidemic_start_date,
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
        );
        assert_eq!(config.output_csv_path, PathBuf::from(DEFAULT_OUTPUT_CSV_PATH));
        assert_eq!(config.column_rename_map, ColumnMap::default());
    }

    #[test]
    fn test_column_map_from_json() {
        let config = PipelineConfig::from_json(
            r#"{ "column_rename_map": {
                "data": "Date", "total": "CasiTotali", "mortos": "Deceduti",
                "curados": "Guariti", "casa": "Isolamento_domiciliare",
                "leito": "Ricoverati_sintomi", "uti": "Terapia_intensiva"
            } }"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.column_rename_map.target_for("uti"), Some(Column::TerapiaIntensiva));
        assert_eq!(config.column_rename_map.source_for(Column::Date), Some("data"));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = PipelineConfig {
            delimiter: Some(';'),
            ..PipelineConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(PipelineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_column_map_missing_column_rejected() {
        let map = ColumnMap::new(DEFAULT_COLUMN_RENAME_MAP.into_iter().skip(1));
        let err = map.validate().unwrap_err();
        assert!(err.to_string().contains("no source column for Date"));
    }

    #[test]
    fn test_column_map_duplicate_target_rejected() {
        let mut entries: Vec<(String, Column)> = DEFAULT_COLUMN_RENAME_MAP
            .iter()
            .map(|(s, c)| (s.to_string(), *c))
            .collect();
        entries.push(("obitos_confirmados".to_string(), Column::Deceduti));

        let err = ColumnMap::new(entries).validate().unwrap_err();
        assert!(err.to_string().contains("multiple source columns for Deceduti"));
    }

    #[test]
    fn test_column_map_positivi_rejected() {
        let mut entries: Vec<(String, Column)> = DEFAULT_COLUMN_RENAME_MAP
            .iter()
            .map(|(s, c)| (s.to_string(), *c))
            .collect();
        entries.push(("ativos".to_string(), Column::Positivi));

        let err = ColumnMap::new(entries).validate().unwrap_err();
        assert!(err.to_string().contains("Positivi is derived"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("THEMIS_INPUT", "env.csv"),
            ("THEMIS_EPIDEMIC_START", "2020-03-12"),
            ("THEMIS_DELIMITER", "auto"),
            ("THEMIS_ENCODING", " ISO-8859-1 "),
        ]
        .into_iter()
        .collect();

        let mut config = PipelineConfig::default();
        config
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.input_path, PathBuf::from("env.csv"));
        assert_eq!(
            config.epidemic_start_date,
            NaiveDate::from_ymd_opt(2020, 3, 12).unwrap()
        );
        assert_eq!(config.delimiter, None);
        assert_eq!(config.encoding, "iso-8859-1");
        assert_eq!(config.output_sim_path, PathBuf::from(DEFAULT_OUTPUT_SIM_PATH));
    }

    #[test]
    fn test_env_invalid_date_rejected() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_vars(|k| (k == "THEMIS_EPIDEMIC_START").then(|| "26/02/2020".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDate { .. }));
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";").unwrap(), Some(';'));
        assert_eq!(parse_delimiter("tab").unwrap(), Some('\t'));
        assert_eq!(parse_delimiter("auto").unwrap(), None);
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("é").is_err());
    }
}
