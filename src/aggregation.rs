use polars::prelude::*;

use crate::config::AggregationMode;
use crate::error::PodError;
use crate::record::PodRecord;
use crate::schema::record;
use crate::table::value_counts;

/// How often one failure reason occurs in the filtered rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

/// Every reason present, most frequent first; ties keep first appearance.
pub fn reason_breakdown(df: &DataFrame) -> Result<Vec<ReasonCount>, PodError> {
    Ok(value_counts(df, record::RESULT)?
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason, count })
        .collect())
}

/// Reduce a breakdown according to the aggregation mode.
pub fn select_reasons(breakdown: Vec<ReasonCount>, mode: AggregationMode) -> Vec<ReasonCount> {
    match mode.limit() {
        Some(n) => breakdown.into_iter().take(n).collect(),
        None => breakdown,
    }
}

/// The driver with the most rows for `reason` and that driver's first such
/// row. `None` when no row for the reason names a driver.
pub fn representative(df: &DataFrame, reason: &str) -> Result<Option<PodRecord>, PodError> {
    let subset = df
        .clone()
        .lazy()
        .filter(col(record::RESULT).eq(lit(reason.to_string())))
        .collect()?;

    let Some((driver, _)) = value_counts(&subset, record::DRIVER_ID)?.into_iter().next() else {
        return Ok(None);
    };

    let rows = subset
        .lazy()
        .filter(col(record::DRIVER_ID).eq(lit(driver)))
        .collect()?;
    if rows.height() == 0 {
        return Ok(None);
    }
    Ok(Some(PodRecord::from_row(&rows, 0)?))
}

/// All rows sorted by driver, then tracking number when present. Rows with the
/// same keys keep their input order.
pub fn enumerate_by_driver(df: &DataFrame) -> Result<Vec<PodRecord>, PodError> {
    let mut keys = vec![record::DRIVER_ID];
    if df.column(record::TNO).is_ok() {
        keys.push(record::TNO);
    }
    let sorted = df.sort(keys, SortMultipleOptions::default().with_maintain_order(true))?;
    (0..sorted.height())
        .map(|i| PodRecord::from_row(&sorted, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, usize)]) -> Vec<ReasonCount> {
        pairs
            .iter()
            .map(|(r, c)| ReasonCount {
                reason: r.to_string(),
                count: *c,
            })
            .collect()
    }

    fn rows() -> DataFrame {
        df!(
            "result" => ["No POD", "Wrong Address", "No POD", "No POD", "Wrong Address"],
            "Driver ID" => [Some("D2"), Some("D9"), Some("D1"), Some("D1"), None],
            "tno" => ["T1", "T2", "T3", "T4", "T5"]
        )
        .unwrap()
    }

    #[test]
    fn top_n_is_a_prefix_of_the_breakdown() {
        let full = counts(&[
            ("Wrong Address", 5),
            ("No POD", 3),
            ("Location Not Clear", 3),
            ("No Address Info", 1),
        ]);
        let top = select_reasons(full.clone(), AggregationMode::TopN { n: 3 });
        assert_eq!(top, full[..3].to_vec());
        assert_eq!(
            select_reasons(full.clone(), AggregationMode::FullBreakdown),
            full
        );
    }

    #[test]
    fn representative_picks_most_frequent_driver() {
        let rec = representative(&rows(), "No POD").unwrap().unwrap();
        assert_eq!(rec.driver_id.as_deref(), Some("D1"));
        assert_eq!(rec.tracking_number.as_deref(), Some("T3"));
    }

    #[test]
    fn representative_ignores_rows_without_driver() {
        let rec = representative(&rows(), "Wrong Address").unwrap().unwrap();
        assert_eq!(rec.driver_id.as_deref(), Some("D9"));
        assert!(representative(&rows(), "Dog On Porch").unwrap().is_none());
    }

    #[test]
    fn enumeration_sorts_by_driver_then_parcel() {
        let recs = enumerate_by_driver(&rows()).unwrap();
        let order: Vec<Option<&str>> = recs.iter().map(|r| r.tracking_number.as_deref()).collect();
        assert_eq!(
            order,
            vec![Some("T5"), Some("T3"), Some("T4"), Some("T1"), Some("T2")]
        );
    }
}
