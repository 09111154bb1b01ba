use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregation::{
    enumerate_by_driver, reason_breakdown, representative, select_reasons, ReasonCount,
};
use crate::config::{ExampleMode, PipelineConfig};
use crate::error::PodError;
use crate::i18n::Locale;
use crate::record::RecordView;
use crate::schema::record;
use crate::selection::Selection;
use crate::table::{normalize_frame, require_columns, union_tables, NamedTable};

/// Caller choices for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub date: NaiveDate,
    pub team: Selection,
    pub reason: Selection,
}

/// Summary text for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedSummary {
    pub locale: Locale,
    pub heading: String,
    pub intro: String,
    pub lines: Vec<String>,
    pub examples_heading: String,
}

impl LocalizedSummary {
    /// Intro followed by one line per reason.
    pub fn text(&self) -> String {
        let mut out = self.intro.clone();
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub summaries: Vec<LocalizedSummary>,
    pub reasons: Vec<ReasonCount>,
    pub examples: Vec<RecordView>,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Report(Report),
    /// Filters removed every row.
    NoMatchingRecords,
}

impl ReportOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            ReportOutcome::Report(r) => Some(r),
            ReportOutcome::NoMatchingRecords => None,
        }
    }
}

/// Builds localized failure-reason summaries from one or more tables.
pub struct Reporter<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Reporter<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Report over the union of `tables`.
    pub fn summarize(
        &self,
        tables: &[NamedTable],
        request: &ReportRequest,
    ) -> Result<ReportOutcome, PodError> {
        info!(
            tables = tables.len(),
            date = %request.date,
            team = ?request.team,
            reason = ?request.reason,
            "report run started"
        );
        if tables.is_empty() {
            warn!("no tables supplied to report");
            return Ok(ReportOutcome::NoMatchingRecords);
        }

        let normalized = tables
            .iter()
            .map(|t| Ok(NamedTable::new(t.name.clone(), normalize_frame(t.frame.clone())?)))
            .collect::<Result<Vec<_>, PodError>>()?;
        let working = union_tables(&normalized)?;
        let filtered = self.filter(&working, request).inspect_err(|e| {
            warn!(error = %e, "report aborted");
        })?;
        if filtered.height() == 0 {
            warn!("report filters matched no rows");
            return Ok(ReportOutcome::NoMatchingRecords);
        }

        let reasons = select_reasons(reason_breakdown(&filtered)?, self.config.aggregation);
        let summaries = self
            .config
            .locales
            .iter()
            .map(|locale| self.render(*locale, request, &reasons))
            .collect();
        let examples = self.examples(&filtered, &reasons)?;

        info!(
            rows = filtered.height(),
            reasons = reasons.len(),
            examples = examples.len(),
            "report run finished"
        );
        Ok(ReportOutcome::Report(Report {
            summaries,
            reasons,
            examples,
            rows: filtered.height(),
        }))
    }

    /// One report per table, in input order.
    pub fn summarize_each(
        &self,
        tables: &[NamedTable],
        request: &ReportRequest,
    ) -> Vec<(String, Result<ReportOutcome, PodError>)> {
        tables
            .iter()
            .map(|t| {
                let outcome = self.summarize(std::slice::from_ref(t), request);
                (t.name.clone(), outcome)
            })
            .collect()
    }

    /// Validate the working table and apply the team and reason filters.
    pub fn filter(&self, df: &DataFrame, request: &ReportRequest) -> Result<DataFrame, PodError> {
        let mut required = vec![record::RESULT, record::DRIVER_ID];
        if !request.team.is_all() {
            required.push(record::TEAM_ID);
        }
        require_columns(df, &required, "report")?;

        let lazy = request.team.apply(df.clone().lazy(), record::TEAM_ID);
        let filtered = request.reason.apply(lazy, record::RESULT).collect()?;
        debug!(before = df.height(), after = filtered.height(), "report filters applied");
        Ok(filtered)
    }

    fn render(
        &self,
        locale: Locale,
        request: &ReportRequest,
        reasons: &[ReasonCount],
    ) -> LocalizedSummary {
        let team_label = locale.team_label(&request.team);
        let lines = reasons
            .iter()
            .map(|rc| {
                let count = self.config.show_counts.then_some(rc.count);
                locale.reason_line(&locale.reason_label(&rc.reason), count)
            })
            .collect();
        LocalizedSummary {
            locale,
            heading: locale.heading().to_string(),
            intro: locale.intro(request.date, &team_label),
            lines,
            examples_heading: locale.examples_heading().to_string(),
        }
    }

    fn examples(
        &self,
        df: &DataFrame,
        reasons: &[ReasonCount],
    ) -> Result<Vec<RecordView>, PodError> {
        let locales = &self.config.locales;
        let schemes = &self.config.photo_schemes;

        match self.config.example_mode {
            ExampleMode::Representative => {
                let mut views = Vec::with_capacity(reasons.len());
                for rc in reasons {
                    match representative(df, &rc.reason)? {
                        Some(rec) => views.push(RecordView::new(&rec, locales, schemes, true)),
                        None => debug!(reason = %rc.reason, "no driver recorded for reason"),
                    }
                }
                Ok(views)
            }
            ExampleMode::Enumerate => {
                let records = enumerate_by_driver(df)?;
                let views = records
                    .iter()
                    .enumerate()
                    .map(|(i, rec)| {
                        let header = i == 0 || records[i - 1].driver_id != rec.driver_id;
                        RecordView::new(rec, locales, schemes, header)
                    })
                    .collect();
                Ok(views)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregationMode;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
    }

    fn request(team: Selection, reason: Selection) -> ReportRequest {
        ReportRequest {
            date: date(),
            team,
            reason,
        }
    }

    fn table() -> NamedTable {
        NamedTable::new(
            "SEA-1",
            df!(
                "team_id" => ["1", "1", "1", "2", "2"],
                "result" => ["No POD", "No POD", "Wrong Address", "No POD", "Location Not Clear"],
                "Driver ID" => ["D1", "D1", "D2", "D3", "D3"],
                "tno" => ["T1", "T2", "T3", "T4", "T5"],
                "pod_1" => ["http://a", "", "https://c", "x", "http://e"]
            )
            .unwrap(),
        )
    }

    #[test]
    fn default_report_lists_top_reasons_with_counts() {
        let config = PipelineConfig::default();
        let outcome = Reporter::new(&config)
            .summarize(&[table()], &request(Selection::All, Selection::All))
            .unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.rows, 5);
        assert_eq!(report.reasons[0].reason, "No POD");
        assert_eq!(report.reasons[0].count, 3);
        assert_eq!(report.reasons.len(), 3);

        let en = &report.summaries[0];
        assert_eq!(en.locale, Locale::En);
        assert_eq!(en.lines[0], "- No POD (3)");
        let zh = &report.summaries[1];
        assert_eq!(zh.lines[0], "- 无POD照片（3）");
        assert!(zh.text().starts_with("2025-01-31 所有团队"));

        assert_eq!(report.examples.len(), 3);
        assert_eq!(report.examples[0].driver_id, "D1");
        assert_eq!(report.examples[0].photos, vec!["http://a"]);
    }

    #[test]
    fn counts_can_be_hidden() {
        let config = PipelineConfig {
            show_counts: false,
            ..PipelineConfig::default()
        };
        let outcome = Reporter::new(&config)
            .summarize(&[table()], &request(Selection::All, Selection::All))
            .unwrap();
        assert_eq!(outcome.report().unwrap().summaries[0].lines[0], "- No POD");
    }

    #[test]
    fn team_and_reason_filters_narrow_rows() {
        let config = PipelineConfig::default();
        let outcome = Reporter::new(&config)
            .summarize(
                &[table()],
                &request(Selection::Exact("1".into()), Selection::Exact("No POD".into())),
            )
            .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.reasons.len(), 1);
        assert!(report.summaries[0].intro.contains("team 1"));
    }

    #[test]
    fn no_matching_rows_is_not_an_error() {
        let config = PipelineConfig::default();
        let outcome = Reporter::new(&config)
            .summarize(
                &[table()],
                &request(Selection::Exact("9".into()), Selection::All),
            )
            .unwrap();
        assert_eq!(outcome, ReportOutcome::NoMatchingRecords);

        let outcome = Reporter::new(&config)
            .summarize(&[], &request(Selection::All, Selection::All))
            .unwrap();
        assert_eq!(outcome, ReportOutcome::NoMatchingRecords);
    }

    #[test]
    fn missing_aggregation_columns_fail_validation() {
        let config = PipelineConfig::default();
        let no_driver = NamedTable::new("x", df!("result" => ["No POD"]).unwrap());
        let err = Reporter::new(&config)
            .summarize(&[no_driver], &request(Selection::All, Selection::All))
            .unwrap_err();
        match err {
            PodError::SchemaValidation { missing, .. } => assert_eq!(missing, vec!["Driver ID"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn enumerate_mode_marks_driver_changes() {
        let config = PipelineConfig {
            aggregation: AggregationMode::FullBreakdown,
            example_mode: ExampleMode::Enumerate,
            ..PipelineConfig::default()
        };
        let outcome = Reporter::new(&config)
            .summarize(&[table()], &request(Selection::All, Selection::All))
            .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.examples.len(), 5);
        let headers: Vec<(&str, bool)> = report
            .examples
            .iter()
            .map(|v| (v.driver_id.as_str(), v.driver_header))
            .collect();
        assert_eq!(
            headers,
            vec![
                ("D1", true),
                ("D1", false),
                ("D2", true),
                ("D3", true),
                ("D3", false),
            ]
        );
        assert_eq!(report.examples[3].photos, Vec::<String>::new());
    }

    #[test]
    fn untrimmed_headers_and_numeric_teams_are_normalized() {
        let config = PipelineConfig::default();
        let raw = NamedTable::new(
            "raw",
            df!(
                "team_id " => [1i64, 1, 2],
                " result" => ["No POD", "Wrong Address", "No POD"],
                "Driver ID" => ["D1", "D2", "D3"]
            )
            .unwrap(),
        );
        let outcome = Reporter::new(&config)
            .summarize(&[raw], &request(Selection::Exact("1".into()), Selection::All))
            .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.reasons.len(), 2);
    }

    #[test]
    fn summarize_each_reports_per_table() {
        let config = PipelineConfig::default();
        let other = NamedTable::new("bad", df!("result" => ["No POD"]).unwrap());
        let results = Reporter::new(&config)
            .summarize_each(&[table(), other], &request(Selection::All, Selection::All));
        assert_eq!(results.len(), 2);
        assert!(results[0].1.as_ref().unwrap().report().is_some());
        assert!(results[1].1.as_ref().unwrap_err().is_schema_validation());
    }
}
