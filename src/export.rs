//! Export encoders: one-sheet XLSX payloads and the ZIP bundle.

use std::io::{Cursor, Write};

use polars::prelude::*;
use rust_xlsxwriter::Workbook;
// Leading `::` keeps the crate apart from the polars prelude's `zip` module.
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipWriter};

use crate::error::PodError;
use crate::schema::export;
use crate::table::any_value_text;

/// Serialize a frame to a single-sheet workbook: header row, then one row per
/// record. Nulls become blank cells; every value is written as text.
pub fn write_xlsx(df: &DataFrame) -> Result<Vec<u8>, PodError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col_idx = u16::try_from(col_idx).map_err(|_| {
            PodError::InvalidData(format!("Too many columns for a worksheet: {}", df.width()))
        })?;
        worksheet.write_string(0, col_idx, column.name().as_str())?;

        for row_idx in 0..df.height() {
            let Some(text) = any_value_text(column.get(row_idx)?) else {
                continue;
            };
            let row = u32::try_from(row_idx + 1).map_err(|_| {
                PodError::InvalidData(format!("Too many rows for a worksheet: {}", df.height()))
            })?;
            worksheet.write_string(row, col_idx, text)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// A named payload inside the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// The downloadable bundle of every artifact from one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
}

impl Archive {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Zip the artifacts in order, each under its own name.
///
/// Entry timestamps are pinned to the zip epoch so identical inputs produce
/// identical containers.
pub fn build_archive(artifacts: &[Artifact]) -> Result<Archive, PodError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(::zip::DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for artifact in artifacts {
        writer.start_file(artifact.name.as_str(), options)?;
        writer.write_all(&artifact.bytes)?;
    }
    let bytes = writer.finish()?.into_inner();

    Ok(Archive {
        file_name: export::ARCHIVE_NAME,
        content_type: export::ARCHIVE_CONTENT_TYPE,
        bytes,
        entries: artifacts.iter().map(|a| a.name.clone()).collect(),
    })
}
