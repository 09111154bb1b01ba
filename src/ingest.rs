//! Tabular ingestion: CSV and XLSX uploads become all-text DataFrames.
//!
//! Every column is loaded as String so identifiers such as team ids and
//! tracking numbers keep their exact text. Column names are trimmed.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::PodError;
use crate::table::normalize_frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Csv,
    Xlsx,
}

impl TabularFormat {
    pub fn from_name(name: &str) -> Result<Self, PodError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(TabularFormat::Csv),
            Some("xlsx") => Ok(TabularFormat::Xlsx),
            _ => Err(PodError::UnrecognizedFormat(name.to_string())),
        }
    }
}

/// An uploaded file: its original name and raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PodError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PodError::UnrecognizedFormat(path.display().to_string()))?
            .to_string();
        TabularFormat::from_name(&name)?;
        let bytes = fs::read(path)?;
        Ok(Self { name, bytes })
    }

    /// File name without its final extension, used in artifact names.
    pub fn base_name(&self) -> String {
        base_name(&self.name)
    }

    pub fn format(&self) -> Result<TabularFormat, PodError> {
        TabularFormat::from_name(&self.name)
    }

    pub fn read(&self) -> Result<DataFrame, PodError> {
        let format = self.format()?;
        let df = match format {
            TabularFormat::Csv => read_csv(&self.bytes)?,
            TabularFormat::Xlsx => read_xlsx(&self.name, &self.bytes)?,
        };
        info!(
            upload = %self.name,
            rows = df.height(),
            columns = df.width(),
            "ingested table"
        );
        Ok(df)
    }
}

pub fn base_name(file_name: &str) -> String {
    let file_name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

pub fn read_path(path: impl AsRef<Path>) -> Result<DataFrame, PodError> {
    Upload::from_path(path)?.read()
}

fn read_csv(bytes: &[u8]) -> Result<DataFrame, PodError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    normalize_frame(df)
}

/// Read the first worksheet; its first row is the header.
fn read_xlsx(name: &str, bytes: &[u8]) -> Result<DataFrame, PodError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PodError::InvalidData(format!("{name} contains no worksheets")))??;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell_to_text(cell) {
                Some(text) if !text.trim().is_empty() => text,
                _ => format!("Unnamed: {i}"),
            })
            .collect(),
        None => return Ok(DataFrame::empty()),
    };

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); header.len()];
    for cells in rows {
        for (i, column) in values.iter_mut().enumerate() {
            column.push(cells.get(i).and_then(cell_to_text));
        }
    }
    debug!(sheet_rows = range.height(), "read xlsx worksheet");

    let columns: Vec<Column> = header
        .iter()
        .zip(values)
        .map(|(name, column)| Column::new(name.as_str().into(), column))
        .collect();
    normalize_frame(DataFrame::new(columns)?)
}

fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        // 12.0 renders as "12", matching the CSV text of integer ids
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::cell_text;

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(TabularFormat::from_name("a.CSV").unwrap(), TabularFormat::Csv);
        assert_eq!(
            TabularFormat::from_name("dir/b.xlsx").unwrap(),
            TabularFormat::Xlsx
        );
        for bad in ["report.xls", "report", "report.txt"] {
            assert!(matches!(
                TabularFormat::from_name(bad),
                Err(PodError::UnrecognizedFormat(_))
            ));
        }
    }

    #[test]
    fn base_name_strips_only_the_last_extension() {
        assert_eq!(base_name("jan_report.xlsx"), "jan_report");
        assert_eq!(base_name("a.b.csv"), "a.b");
        assert_eq!(base_name("/tmp/uploads/feb.csv"), "feb");
    }

    #[test]
    fn csv_columns_are_trimmed_and_kept_as_text() {
        let upload = Upload::new(
            "jan.csv",
            b" WHS ,team_id , tno\nSEA,012,0001\nPDX,3,0002\n".to_vec(),
        );
        let df = upload.read().unwrap();
        assert_eq!(df.get_column_names_str(), vec!["WHS", "team_id", "tno"]);
        assert_eq!(cell_text(&df, "team_id", 0).unwrap(), Some("012".into()));
        assert_eq!(cell_text(&df, "tno", 1).unwrap(), Some("0002".into()));
    }

    #[test]
    fn unsupported_upload_fails_before_parsing() {
        let upload = Upload::new("notes.txt", b"garbage".to_vec());
        assert!(matches!(upload.read(), Err(PodError::UnrecognizedFormat(_))));
    }

    #[test]
    fn xlsx_roundtrip_through_exporter() {
        let df = df!(
            "WHS" => ["SEA", "SEA"],
            "team_id" => ["1", "1"],
            "pod_1" => [Some("http://a"), None]
        )
        .unwrap();
        let bytes = crate::export::write_xlsx(&df).unwrap();
        let read = Upload::new("x.xlsx", bytes).read().unwrap();
        assert_eq!(read.shape(), (2, 3));
        assert_eq!(cell_text(&read, "pod_1", 0).unwrap(), Some("http://a".into()));
        assert_eq!(cell_text(&read, "pod_1", 1).unwrap(), None);
    }

    #[test]
    fn reads_upload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feb.csv");
        fs::write(&path, "WHS,team_id\nSEA,1\n").unwrap();
        let upload = Upload::from_path(&path).unwrap();
        assert_eq!(upload.base_name(), "feb");
        assert_eq!(read_path(&path).unwrap().height(), 1);
    }
}
