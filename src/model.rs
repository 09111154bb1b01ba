use chrono::NaiveDate;

use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict};
use pyo3_polars::PyDataFrame;

use crate::config::PipelineConfig;
use crate::ingest;
use crate::partition::PartitionRequest;
use crate::record::RecordView;
use crate::report::{ReportOutcome, ReportRequest};
use crate::selection::Selection;
use crate::session::Session;
use crate::table::{normalize_frame, NamedTable};

/// Python-facing handle on one report session.
///
/// The front-end keeps one instance per user session; partition output is
/// cached inside it for later `summarize_cached` calls.
#[pyclass]
pub struct PodReportModel {
    session: Session,
}

#[pymethods]
impl PodReportModel {
    #[new]
    #[pyo3(signature = (config_path=None))]
    fn new(config_path: Option<&str>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        Ok(Self {
            session: Session::new(config),
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load a CSV or XLSX file with all columns as strings and trimmed names.
    fn load_table(&self, path: &str) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ingest::read_path(path)?))
    }

    /// Parse an in-memory upload (file name decides the format).
    fn load_upload(&self, name: &str, data: Vec<u8>) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ingest::Upload::new(name, data).read()?))
    }

    // ── Choices ─────────────────────────────────────────────────────────────

    fn area_options(&self) -> Vec<String> {
        self.session.area_options()
    }

    fn team_options(&self, df: PyDataFrame, area: &str) -> PyResult<Vec<String>> {
        let df = normalize_frame(df.0)?;
        Ok(self.session.team_options(&df, area)?)
    }

    // ── Pipelines ───────────────────────────────────────────────────────────

    /// Partition a table by warehouse and team.
    ///
    /// Returns the zip bundle bytes and `(artifact_name, DataFrame)` pairs.
    #[pyo3(signature = (df, area, teams, base_name))]
    fn partition<'py>(
        &self,
        py: Python<'py>,
        df: PyDataFrame,
        area: &str,
        teams: Vec<String>,
        base_name: &str,
    ) -> PyResult<(Bound<'py, PyBytes>, Vec<(String, PyDataFrame)>)> {
        let request = PartitionRequest {
            area: self.session.config().area_selection(area),
            teams: Selection::from_choices(&teams),
            base_name: ingest::base_name(base_name),
        };
        let output = self.session.partition(&df.0, &request)?;
        let groups = output
            .groups
            .into_iter()
            .map(|g| (g.artifact.name, PyDataFrame(g.frame)))
            .collect();
        Ok((PyBytes::new(py, &output.archive.bytes), groups))
    }

    /// Report over `(label, DataFrame)` pairs.
    #[pyo3(signature = (tables, date, team="All", reason="All"))]
    fn summarize(
        &self,
        py: Python<'_>,
        tables: Vec<(String, PyDataFrame)>,
        date: NaiveDate,
        team: &str,
        reason: &str,
    ) -> PyResult<PyObject> {
        let tables: Vec<NamedTable> = tables
            .into_iter()
            .map(|(name, df)| NamedTable::new(name, df.0))
            .collect();
        let outcome = self.session.summarize(&tables, &request(date, team, reason))?;
        outcome_to_py(py, &outcome)
    }

    /// Report over the groups cached by the last `partition` call.
    #[pyo3(signature = (date, team="All", reason="All"))]
    fn summarize_cached(
        &self,
        py: Python<'_>,
        date: NaiveDate,
        team: &str,
        reason: &str,
    ) -> PyResult<PyObject> {
        let outcome = self
            .session
            .summarize_cached(&request(date, team, reason))?;
        outcome_to_py(py, &outcome)
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn cached_names(&self) -> Vec<String> {
        self.session.cache().names()
    }

    #[getter]
    fn session_id(&self) -> String {
        self.session.id().to_string()
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

fn request(date: NaiveDate, team: &str, reason: &str) -> ReportRequest {
    ReportRequest {
        date,
        team: Selection::from_choice(team),
        reason: Selection::from_choice(reason),
    }
}

fn outcome_to_py(py: Python<'_>, outcome: &ReportOutcome) -> PyResult<PyObject> {
    let dict = PyDict::new(py);
    let report = match outcome {
        ReportOutcome::NoMatchingRecords => {
            dict.set_item("status", "no_matching_records")?;
            return Ok(dict.into_any().unbind());
        }
        ReportOutcome::Report(report) => report,
    };
    dict.set_item("status", "report")?;
    dict.set_item("rows", report.rows)?;

    let summaries = PyDict::new(py);
    for summary in &report.summaries {
        let entry = PyDict::new(py);
        entry.set_item("heading", &summary.heading)?;
        entry.set_item("intro", &summary.intro)?;
        entry.set_item("lines", &summary.lines)?;
        entry.set_item("examples_heading", &summary.examples_heading)?;
        summaries.set_item(summary.locale.code(), entry)?;
    }
    dict.set_item("summaries", summaries)?;

    let reasons: Vec<(String, usize)> = report
        .reasons
        .iter()
        .map(|rc| (rc.reason.clone(), rc.count))
        .collect();
    dict.set_item("reasons", reasons)?;

    let examples = report
        .examples
        .iter()
        .map(|view| view_to_py(py, view))
        .collect::<PyResult<Vec<_>>>()?;
    dict.set_item("examples", examples)?;

    Ok(dict.into_any().unbind())
}

fn view_to_py<'py>(py: Python<'py>, view: &RecordView) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("driver_id", &view.driver_id)?;
    dict.set_item("tracking_number", &view.tracking_number)?;
    dict.set_item("reason", &view.reason)?;
    dict.set_item("caption", view.caption())?;
    dict.set_item("photos", &view.photos)?;
    dict.set_item("source", view.source.as_deref())?;
    dict.set_item("driver_header", view.driver_header)?;
    Ok(dict)
}
