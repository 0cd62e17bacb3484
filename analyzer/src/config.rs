//! Analysis configuration.
//!
//! An [`AnalysisConfig`] is built once at startup (defaults, then an
//! optional JSON file, then environment and command-line overrides) and
//! passed by reference into every stage. Nothing reads configuration from
//! process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

/// Default directory holding input and cleaned data.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default directory for rendered charts.
pub const DEFAULT_PLOTS_DIR: &str = "plots";

/// ISP-RJ municipal monthly base file.
pub const DEFAULT_INPUT_FILE: &str = "BaseMunicipioMensal.csv";

pub const DEFAULT_CLEANED_FILE: &str = "cleaned_rj_lethality_data.csv";

pub const DEFAULT_SUMMARY_FILE: &str = "eda_summary_pt.txt";

pub const DEFAULT_YEAR: i32 = 2024;

pub const DEFAULT_MUNICIPALITY: &str = "RIO DE JANEIRO";

/// Crime-count columns that make up violent lethality.
pub const DEFAULT_LETHALITY_COLUMNS: [&str; 4] = [
    "hom_doloso",
    "latrocinio",
    "lesao_corp_morte",
    "hom_por_interv_policial",
];

// =============================================================================
// Text Encoding
// =============================================================================

/// Text encoding of a delimited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// ISO-8859-1.
    Latin1,
    Utf8,
    Windows1252,
    /// Guess with `chardet`, then decode as the detected charset.
    Auto,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Auto => "auto",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "windows-1252" | "cp1252" => Ok(TextEncoding::Windows1252),
            "auto" => Ok(TextEncoding::Auto),
            other => Err(ConfigError::Invalid(format!("unknown encoding '{}'", other))),
        }
    }
}

// =============================================================================
// Year Selection
// =============================================================================

/// Which year to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearSelection {
    Fixed(i32),
    /// Most recent year with all 12 months present for the municipality,
    /// otherwise the year before it.
    LatestComplete,
}

impl YearSelection {
    pub fn fixed(&self) -> Option<i32> {
        match self {
            YearSelection::Fixed(y) => Some(*y),
            YearSelection::LatestComplete => None,
        }
    }
}

impl fmt::Display for YearSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearSelection::Fixed(y) => write!(f, "{}", y),
            YearSelection::LatestComplete => f.write_str("auto"),
        }
    }
}

impl FromStr for YearSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(YearSelection::LatestComplete);
        }
        s.parse::<i32>()
            .map(YearSelection::Fixed)
            .map_err(|_| ConfigError::Invalid(format!("year must be an integer or 'auto', got '{}'", s)))
    }
}

// =============================================================================
// Column Names
// =============================================================================

/// Canonical column names of the source and cleaned tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub municipality: String,
    pub year: String,
    pub month: String,
    /// Derived first-of-month date.
    pub date: String,
    /// Derived lethality total.
    pub total: String,
    /// Configured lethality components, in report order.
    pub lethality: Vec<String>,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            municipality: "fmun".to_string(),
            year: "ano".to_string(),
            month: "mes".to_string(),
            date: "date".to_string(),
            total: "letalidade_violenta".to_string(),
            lethality: DEFAULT_LETHALITY_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ColumnNames {
    /// Columns whose absence aborts the pipeline.
    pub fn key_columns(&self) -> Vec<String> {
        vec![self.municipality.clone(), self.year.clone(), self.month.clone()]
    }
}

// =============================================================================
// Analysis Config
// =============================================================================

/// Immutable run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub input_file: PathBuf,
    pub cleaned_file: PathBuf,
    pub summary_file: PathBuf,
    pub plots_dir: PathBuf,
    pub year: YearSelection,
    pub municipality: String,
    pub separator: u8,
    pub encoding: TextEncoding,
    pub fallback_encoding: TextEncoding,
    pub columns: ColumnNames,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let data_dir = Path::new(DEFAULT_DATA_DIR);
        Self {
            input_file: data_dir.join(DEFAULT_INPUT_FILE),
            cleaned_file: data_dir.join(DEFAULT_CLEANED_FILE),
            summary_file: PathBuf::from(DEFAULT_SUMMARY_FILE),
            plots_dir: PathBuf::from(DEFAULT_PLOTS_DIR),
            year: YearSelection::Fixed(DEFAULT_YEAR),
            municipality: DEFAULT_MUNICIPALITY.to_string(),
            separator: b';',
            encoding: TextEncoding::Latin1,
            fallback_encoding: TextEncoding::Utf8,
            columns: ColumnNames::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load defaults overlaid with a JSON config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        file.apply(Self::default())
    }

    /// Relocate input and cleaned files under `dir`, keeping file names.
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.input_file = dir.join(file_name_or(&self.input_file, DEFAULT_INPUT_FILE));
        self.cleaned_file = dir.join(file_name_or(&self.cleaned_file, DEFAULT_CLEANED_FILE));
        self
    }

    /// File name shown in report headers.
    pub fn source_name(&self) -> String {
        file_name_or(&self.input_file, DEFAULT_INPUT_FILE)
    }

    /// Reject configurations no stage could run with.
    pub fn validate(self) -> ConfigResult<Self> {
        if self.municipality.trim().is_empty() {
            return Err(ConfigError::Invalid("target municipality is empty".into()));
        }
        if self.columns.lethality.is_empty() {
            return Err(ConfigError::Invalid("no lethality columns configured".into()));
        }
        if !self.separator.is_ascii() || self.separator == b'"' {
            return Err(ConfigError::Invalid(format!(
                "separator must be an ASCII character other than '\"', got byte {}",
                self.separator
            )));
        }

        let cols = &self.columns;
        let mut seen = HashSet::new();
        let all = [&cols.municipality, &cols.year, &cols.month, &cols.date, &cols.total]
            .into_iter()
            .chain(cols.lethality.iter());
        for name in all {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("empty column name".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Invalid(format!("column '{}' configured twice", name)));
            }
        }
        Ok(self)
    }
}

fn file_name_or(path: &Path, default: &str) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(default)
        .to_string()
}

// =============================================================================
// Config File
// =============================================================================

/// Partial configuration read from JSON. Omitted fields keep defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub input_file: Option<PathBuf>,
    pub cleaned_file: Option<PathBuf>,
    pub summary_file: Option<PathBuf>,
    pub plots_dir: Option<PathBuf>,
    pub year: Option<YearField>,
    pub municipality: Option<String>,
    pub separator: Option<char>,
    pub encoding: Option<TextEncoding>,
    pub fallback_encoding: Option<TextEncoding>,
    pub columns: Option<ColumnNames>,
}

/// `"year": 2023` or `"year": "auto"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum YearField {
    Number(i32),
    Text(String),
}

impl ConfigFile {
    pub fn apply(self, mut config: AnalysisConfig) -> ConfigResult<AnalysisConfig> {
        if let Some(dir) = self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(p) = self.input_file {
            config.input_file = p;
        }
        if let Some(p) = self.cleaned_file {
            config.cleaned_file = p;
        }
        if let Some(p) = self.summary_file {
            config.summary_file = p;
        }
        if let Some(p) = self.plots_dir {
            config.plots_dir = p;
        }
        if let Some(year) = self.year {
            config.year = match year {
                YearField::Number(y) => YearSelection::Fixed(y),
                YearField::Text(s) => s.parse()?,
            };
        }
        if let Some(m) = self.municipality {
            config.municipality = m;
        }
        if let Some(sep) = self.separator {
            config.separator = separator_byte(sep)?;
        }
        if let Some(enc) = self.encoding {
            config.encoding = enc;
        }
        if let Some(enc) = self.fallback_encoding {
            config.fallback_encoding = enc;
        }
        if let Some(cols) = self.columns {
            config.columns = cols;
        }
        Ok(config)
    }
}

/// Convert a separator character to the byte the CSV layer expects.
pub fn separator_byte(sep: char) -> ConfigResult<u8> {
    u8::try_from(sep)
        .ok()
        .filter(|b| b.is_ascii())
        .ok_or_else(|| ConfigError::Invalid(format!("separator '{}' is not ASCII", sep)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.year, YearSelection::Fixed(2024));
        assert_eq!(config.municipality, "RIO DE JANEIRO");
        assert_eq!(config.separator, b';');
        assert_eq!(config.encoding, TextEncoding::Latin1);
        assert_eq!(config.fallback_encoding, TextEncoding::Utf8);
        assert_eq!(config.columns.lethality.len(), 4);
        assert_eq!(config.columns.key_columns(), vec!["fmun", "ano", "mes"]);
        assert_eq!(config.source_name(), "BaseMunicipioMensal.csv");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_year_selection_parse() {
        assert_eq!("2023".parse::<YearSelection>().unwrap(), YearSelection::Fixed(2023));
        assert_eq!("AUTO".parse::<YearSelection>().unwrap(), YearSelection::LatestComplete);
        assert!("last".parse::<YearSelection>().is_err());
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!("ISO-8859-1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert_eq!("utf8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert!("ebcdic".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "data_dir": "/srv/isp", "year": "auto", "municipality": "Niterói", "separator": "," }"#,
        )
        .unwrap();

        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.input_file, PathBuf::from("/srv/isp/BaseMunicipioMensal.csv"));
        assert_eq!(config.cleaned_file, PathBuf::from("/srv/isp/cleaned_rj_lethality_data.csv"));
        assert_eq!(config.year, YearSelection::LatestComplete);
        assert_eq!(config.municipality, "Niterói");
        assert_eq!(config.separator, b',');
        assert_eq!(config.columns, ColumnNames::default());
    }

    #[test]
    fn test_numeric_year_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "year": 2019 }"#).unwrap();
        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.year, YearSelection::Fixed(2019));
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AnalysisConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_file(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_columns() {
        let mut config = AnalysisConfig::default();
        config.columns.total = "hom_doloso".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hom_doloso"));
    }

    #[test]
    fn test_validate_rejects_empty_municipality() {
        let config = AnalysisConfig {
            municipality: "  ".into(),
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
