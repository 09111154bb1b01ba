//! POD failure report pipeline.
//!
//! Splits proof-of-delivery failure tables into per-warehouse/per-team
//! exports and builds localized failure-reason summaries with photo
//! examples. The `python` feature exposes the same pipeline to a Python
//! front-end through PyO3.

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod i18n;
pub mod ingest;
pub mod partition;
pub mod record;
pub mod report;
pub mod schema;
pub mod selection;
pub mod session;
pub mod table;

#[cfg(feature = "python")]
mod model;

pub use cache::ArtifactCache;
pub use config::{AggregationMode, ExampleMode, PipelineConfig};
pub use error::PodError;
pub use i18n::Locale;
pub use ingest::{TabularFormat, Upload};
pub use partition::{artifact_name, PartitionOutput, PartitionRequest, Partitioner};
pub use report::{LocalizedSummary, Report, ReportOutcome, ReportRequest, Reporter};
pub use selection::Selection;
pub use session::Session;
pub use table::NamedTable;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Record
    let columns = PyModule::new(m.py(), "columns")?;
    columns.add("WHS", schema::record::WHS)?;
    columns.add("TEAM_ID", schema::record::TEAM_ID)?;
    columns.add("RESULT", schema::record::RESULT)?;
    columns.add("DRIVER_ID", schema::record::DRIVER_ID)?;
    columns.add("TNO", schema::record::TNO)?;
    columns.add("SOURCE_TABLE", schema::derived::SOURCE_TABLE)?;
    columns.add("PHOTOS", schema::photos::ALL.to_vec())?;
    m.add_submodule(&columns)?;

    // Export
    let export = PyModule::new(m.py(), "export")?;
    export.add("ARCHIVE_NAME", schema::export::ARCHIVE_NAME)?;
    export.add("ARCHIVE_CONTENT_TYPE", schema::export::ARCHIVE_CONTENT_TYPE)?;
    export.add("ARTIFACT_SUFFIX", schema::export::ARTIFACT_SUFFIX)?;
    m.add_submodule(&export)?;

    // Choice
    let choice = PyModule::new(m.py(), "choice")?;
    choice.add("ALL", schema::choice::ALL)?;
    m.add_submodule(&choice)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<model::PodReportModel>()?;
    add_schema_exports(m)?;
    Ok(())
}
