use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::PodError;
use crate::i18n::Locale;
use crate::schema::choice;
use crate::selection::Selection;

/// How failure reasons are reduced before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AggregationMode {
    /// The `n` most frequent reasons. Ties keep first-appearance order.
    TopN { n: usize },
    /// Every reason present, most frequent first.
    FullBreakdown,
}

impl AggregationMode {
    pub fn limit(&self) -> Option<usize> {
        match self {
            AggregationMode::TopN { n } => Some(*n),
            AggregationMode::FullBreakdown => None,
        }
    }
}

/// Which rows are surfaced as examples under the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleMode {
    /// One row per reported reason, from that reason's most frequent driver.
    Representative,
    /// Every filtered row, sorted by driver then parcel.
    Enumerate,
}

/// Pipeline configuration shared by the partitioner and the reporter.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Locales rendered by the reporter, in output order.
    pub locales: Vec<Locale>,
    /// Keep only rows whose validity flag carries the invalid marker.
    pub pre_filter_invalid_only: bool,
    pub validity_column: String,
    pub invalid_marker: String,
    pub aggregation: AggregationMode,
    pub example_mode: ExampleMode,
    /// Append the per-reason count to each summary line.
    pub show_counts: bool,
    /// Individual warehouse codes offered as area choices.
    pub warehouses: Vec<String>,
    /// Named supersets of warehouse codes.
    pub regions: BTreeMap<String, Vec<String>>,
    /// Prefixes a photo slot must start with to count as a URL.
    pub photo_schemes: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let warehouses: Vec<String> = ["BOI", "EUG", "GEG", "PDX", "SEA"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let mut regions = BTreeMap::new();
        regions.insert("All SEA AREAs".to_string(), warehouses.clone());

        Self {
            locales: vec![Locale::En, Locale::Zh],
            pre_filter_invalid_only: false,
            validity_column: "status".to_string(),
            invalid_marker: "invalid".to_string(),
            aggregation: AggregationMode::TopN { n: 3 },
            example_mode: ExampleMode::Representative,
            show_counts: true,
            warehouses,
            regions,
            photo_schemes: vec!["http://".to_string(), "https://".to_string()],
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PodError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading pipeline config");
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, PodError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PodError> {
        if self.locales.is_empty() {
            return Err(PodError::Validation(
                "at least one locale must be configured".into(),
            ));
        }
        if self.aggregation == (AggregationMode::TopN { n: 0 }) {
            return Err(PodError::Validation(
                "top_n aggregation needs n >= 1".into(),
            ));
        }
        if self.pre_filter_invalid_only && self.validity_column.trim().is_empty() {
            return Err(PodError::Validation(
                "pre_filter_invalid_only requires a validity_column".into(),
            ));
        }
        if self.photo_schemes.iter().any(|s| s.is_empty()) {
            return Err(PodError::Validation(
                "photo_schemes must not contain empty prefixes".into(),
            ));
        }
        Ok(())
    }

    /// Area choices in display order: single warehouses, then region names.
    pub fn area_options(&self) -> Vec<String> {
        self.warehouses
            .iter()
            .cloned()
            .chain(self.regions.keys().cloned())
            .collect()
    }

    /// Resolve an area choice to a warehouse selection.
    ///
    /// Region names expand to their member codes; `All` disables the filter;
    /// anything else is matched as a literal warehouse code.
    pub fn area_selection(&self, choice: &str) -> Selection {
        let choice = choice.trim();
        if let Some(codes) = self.regions.get(choice) {
            return Selection::AnyOf(codes.clone());
        }
        if choice == choice::ALL {
            return Selection::All;
        }
        Selection::Exact(choice.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.aggregation, AggregationMode::TopN { n: 3 });
        assert_eq!(config.example_mode, ExampleMode::Representative);
    }

    #[test]
    fn parses_full_breakdown_and_enumerate() {
        let config = PipelineConfig::from_toml_str(
            r#"
            locales = ["zh"]
            pre_filter_invalid_only = true
            invalid_marker = "FAILED"
            aggregation = { mode = "full_breakdown" }
            example_mode = "enumerate"
            show_counts = false

            [regions]
            "North" = ["GEG", "BOI"]
            "#,
        )
        .unwrap();

        assert_eq!(config.locales, vec![Locale::Zh]);
        assert!(config.pre_filter_invalid_only);
        assert_eq!(config.invalid_marker, "FAILED");
        assert_eq!(config.aggregation, AggregationMode::FullBreakdown);
        assert_eq!(config.aggregation.limit(), None);
        assert_eq!(config.example_mode, ExampleMode::Enumerate);
        assert!(!config.show_counts);
        assert_eq!(
            config.area_selection("North"),
            Selection::AnyOf(vec!["GEG".into(), "BOI".into()])
        );
    }

    #[test]
    fn rejects_zero_top_n_and_empty_locales() {
        let err = PipelineConfig::from_toml_str("aggregation = { mode = \"top_n\", n = 0 }")
            .unwrap_err();
        assert!(matches!(err, PodError::Validation(_)));

        let err = PipelineConfig::from_toml_str("locales = []").unwrap_err();
        assert!(matches!(err, PodError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = PipelineConfig::from_toml_str("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, PodError::Config(_)));
    }

    #[test]
    fn area_choices_resolve_to_selections() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.area_selection("SEA"),
            Selection::Exact("SEA".to_string())
        );
        assert_eq!(config.area_selection("All"), Selection::All);
        match config.area_selection("All SEA AREAs") {
            Selection::AnyOf(codes) => assert_eq!(codes.len(), 5),
            other => panic!("expected region, got {other:?}"),
        }
        assert_eq!(
            config.area_options(),
            vec!["BOI", "EUG", "GEG", "PDX", "SEA", "All SEA AREAs"]
        );
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pod.toml");
        fs::write(&path, "show_counts = false\n").unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert!(!config.show_counts);
    }
}
