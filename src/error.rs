#[cfg(feature = "python")]
use pyo3::exceptions::{PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodError {
    #[error("Missing required column(s) for {context}: {}", .missing.join(", "))]
    SchemaValidation {
        context: &'static str,
        missing: Vec<String>,
    },

    #[error("Unrecognized table format: {0} (expected .csv or .xlsx)")]
    UnrecognizedFormat(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet read error: {0}")]
    SpreadsheetRead(#[from] calamine::XlsxError),

    #[error("Spreadsheet write error: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),
}

impl PodError {
    pub fn is_schema_validation(&self) -> bool {
        matches!(self, PodError::SchemaValidation { .. })
    }
}

#[cfg(feature = "python")]
impl From<PodError> for PyErr {
    fn from(err: PodError) -> PyErr {
        match err {
            PodError::SchemaValidation { .. }
            | PodError::UnrecognizedFormat(_)
            | PodError::Validation(_) => PyValueError::new_err(err.to_string()),
            other => PyRuntimeError::new_err(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_validation_lists_every_missing_column() {
        let err = PodError::SchemaValidation {
            context: "partition",
            missing: vec!["WHS".into(), "team_id".into()],
        };
        assert!(err.is_schema_validation());
        assert_eq!(
            err.to_string(),
            "Missing required column(s) for partition: WHS, team_id"
        );
    }
}
