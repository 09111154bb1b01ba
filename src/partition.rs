use std::collections::HashMap;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::cache::ArtifactCache;
use crate::config::PipelineConfig;
use crate::error::PodError;
use crate::export::{build_archive, write_xlsx, Archive, Artifact};
use crate::schema::{export, record};
use crate::selection::Selection;
use crate::table::{natural_cmp, normalize_frame, require_columns, text_values, NamedTable};

/// Filters and naming input for one partition run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRequest {
    pub area: Selection,
    pub teams: Selection,
    /// Upload file name without extension.
    pub base_name: String,
}

/// One (warehouse, team) group and its serialized payload.
#[derive(Debug, Clone)]
pub struct GroupExport {
    pub warehouse: String,
    pub team_id: String,
    pub artifact: Artifact,
    pub frame: DataFrame,
}

#[derive(Debug, Clone)]
pub struct PartitionOutput {
    pub archive: Archive,
    pub groups: Vec<GroupExport>,
}

impl PartitionOutput {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// `{warehouse}{team}_{base}_PODfailed.xlsx`
pub fn artifact_name(warehouse: &str, team_id: &str, base_name: &str) -> String {
    format!(
        "{warehouse}{team_id}_{base_name}_{}.{}",
        export::ARTIFACT_SUFFIX,
        export::ARTIFACT_EXTENSION
    )
}

/// Splits one table into per-(warehouse, team) exports.
pub struct Partitioner<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Partitioner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Validate, filter, group and serialize `df`, then swap the groups into
    /// `cache`. On error the cache keeps its previous contents.
    pub fn run(
        &self,
        df: &DataFrame,
        request: &PartitionRequest,
        cache: &ArtifactCache,
    ) -> Result<PartitionOutput, PodError> {
        info!(
            rows = df.height(),
            base = %request.base_name,
            area = ?request.area,
            teams = ?request.teams,
            "partition run started"
        );

        let df = normalize_frame(df.clone())?;
        let filtered = self.filter(&df, request).inspect_err(|e| {
            warn!(error = %e, "partition aborted");
        })?;
        let groups = self.group(&filtered, &request.base_name)?;

        let artifacts: Vec<Artifact> = groups.iter().map(|g| g.artifact.clone()).collect();
        let archive = build_archive(&artifacts)?;

        cache.replace(
            groups
                .iter()
                .map(|g| NamedTable::new(g.artifact.name.clone(), g.frame.clone()))
                .collect(),
        );

        if groups.is_empty() {
            warn!("partition filters matched no rows; archive is empty");
        }
        info!(
            groups = groups.len(),
            rows = filtered.height(),
            archive_bytes = archive.bytes.len(),
            "partition run finished"
        );
        Ok(PartitionOutput { archive, groups })
    }

    /// Rows that survive validation and every configured filter.
    pub fn filter(&self, df: &DataFrame, request: &PartitionRequest) -> Result<DataFrame, PodError> {
        let mut required = vec![record::WHS, record::TEAM_ID];
        if self.config.pre_filter_invalid_only {
            required.push(self.config.validity_column.as_str());
        }
        require_columns(df, &required, "partition")?;

        let df = if self.config.pre_filter_invalid_only {
            let kept = self.invalid_only(df)?;
            debug!(before = df.height(), after = kept.height(), "validity pre-filter");
            kept
        } else {
            df.clone()
        };

        let lazy = request.area.apply(df.lazy(), record::WHS);
        let lazy = request.teams.apply(lazy, record::TEAM_ID);
        let filtered = lazy.collect()?;
        debug!(rows = filtered.height(), "area and team filters applied");
        Ok(filtered)
    }

    fn invalid_only(&self, df: &DataFrame) -> Result<DataFrame, PodError> {
        let marker = self.config.invalid_marker.trim().to_lowercase();
        let flags = df.column(&self.config.validity_column)?.str()?;
        let mask: BooleanChunked = flags
            .into_iter()
            .map(|flag| Some(flag.is_some_and(|f| f.trim().to_lowercase() == marker)))
            .collect();
        Ok(df.filter(&mask)?)
    }

    /// Split into non-empty groups ordered by warehouse, then team.
    fn group(&self, df: &DataFrame, base_name: &str) -> Result<Vec<GroupExport>, PodError> {
        let keyed = df
            .clone()
            .lazy()
            .filter(
                col(record::WHS)
                    .is_not_null()
                    .and(col(record::TEAM_ID).is_not_null()),
            )
            .collect()?;
        if keyed.height() < df.height() {
            warn!(
                dropped = df.height() - keyed.height(),
                "rows without warehouse or team were left out of every group"
            );
        }
        if keyed.height() == 0 {
            return Ok(Vec::new());
        }

        let mut partitions: Vec<(String, String, DataFrame)> = keyed
            .partition_by_stable([record::WHS, record::TEAM_ID], true)?
            .into_iter()
            .map(|part| {
                let warehouse = first_text(&part, record::WHS)?;
                let team_id = first_text(&part, record::TEAM_ID)?;
                Ok((warehouse, team_id, part))
            })
            .collect::<Result<_, PodError>>()?;
        partitions.sort_by(|a, b| natural_cmp(&a.0, &b.0).then_with(|| natural_cmp(&a.1, &b.1)));

        let mut claimed: HashMap<String, (&str, &str)> = HashMap::new();
        for (warehouse, team_id, _) in &partitions {
            let name = artifact_name(warehouse, team_id, base_name);
            if let Some((w, t)) =
                claimed.insert(name.clone(), (warehouse.as_str(), team_id.as_str()))
            {
                return Err(PodError::Validation(format!(
                    "Groups ({w}, {t}) and ({warehouse}, {team_id}) both export as {name}"
                )));
            }
        }

        partitions
            .into_iter()
            .map(|(warehouse, team_id, frame)| {
                let name = artifact_name(&warehouse, &team_id, base_name);
                debug!(artifact = %name, rows = frame.height(), "serializing group");
                let bytes = write_xlsx(&frame)?;
                Ok(GroupExport {
                    warehouse,
                    team_id,
                    artifact: Artifact { name, bytes },
                    frame,
                })
            })
            .collect()
    }
}

fn first_text(df: &DataFrame, column: &str) -> Result<String, PodError> {
    text_values(df, column)?
        .into_iter()
        .next()
        .flatten()
        .ok_or_else(|| PodError::InvalidData(format!("Empty {column} in group key")))
}
