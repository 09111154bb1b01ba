use polars::prelude::DataFrame;
use tracing::info_span;
use uuid::Uuid;

use crate::cache::ArtifactCache;
use crate::config::PipelineConfig;
use crate::error::PodError;
use crate::ingest::Upload;
use crate::partition::{PartitionOutput, PartitionRequest, Partitioner};
use crate::report::{ReportOutcome, ReportRequest, Reporter};
use crate::selection::Selection;
use crate::table::{team_options, NamedTable};

/// One user's working context: configuration plus the artifact cache that
/// carries partition output over to later reports.
///
/// Sessions never share caches.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    config: PipelineConfig,
    cache: ArtifactCache,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            cache: ArtifactCache::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn area_options(&self) -> Vec<String> {
        self.config.area_options()
    }

    /// Team ids available once `area` is applied.
    pub fn team_options(&self, df: &DataFrame, area: &str) -> Result<Vec<String>, PodError> {
        team_options(df, &self.config.area_selection(area))
    }

    pub fn partition(
        &self,
        df: &DataFrame,
        request: &PartitionRequest,
    ) -> Result<PartitionOutput, PodError> {
        let _span = info_span!("partition", session = %self.id).entered();
        Partitioner::new(&self.config).run(df, request, &self.cache)
    }

    /// Read an upload and partition it using the upload's name for artifacts.
    pub fn partition_upload(
        &self,
        upload: &Upload,
        area: &str,
        teams: Selection,
    ) -> Result<PartitionOutput, PodError> {
        let df = upload.read()?;
        let request = PartitionRequest {
            area: self.config.area_selection(area),
            teams,
            base_name: upload.base_name(),
        };
        self.partition(&df, &request)
    }

    pub fn summarize(
        &self,
        tables: &[NamedTable],
        request: &ReportRequest,
    ) -> Result<ReportOutcome, PodError> {
        let _span = info_span!("summarize", session = %self.id).entered();
        Reporter::new(&self.config).summarize(tables, request)
    }

    /// Report over fresh uploads, each labelled by its first warehouse and team.
    pub fn summarize_uploads(
        &self,
        uploads: &[Upload],
        request: &ReportRequest,
    ) -> Result<ReportOutcome, PodError> {
        let tables = read_labelled(uploads)?;
        self.summarize(&tables, request)
    }

    /// Report over the groups cached by the last partition run.
    pub fn summarize_cached(&self, request: &ReportRequest) -> Result<ReportOutcome, PodError> {
        let snapshot = self.cache.snapshot();
        self.summarize(&snapshot, request)
    }

    pub fn summarize_each(
        &self,
        tables: &[NamedTable],
        request: &ReportRequest,
    ) -> Vec<(String, Result<ReportOutcome, PodError>)> {
        let _span = info_span!("summarize_each", session = %self.id).entered();
        Reporter::new(&self.config).summarize_each(tables, request)
    }
}

/// All uploads are read before any is reported on, so a bad file fails the
/// whole batch up front.
pub fn read_labelled(uploads: &[Upload]) -> Result<Vec<NamedTable>, PodError> {
    uploads
        .iter()
        .map(|u| u.read().map(NamedTable::labelled))
        .collect()
}
