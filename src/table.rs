use std::cmp::Ordering;
use std::collections::BTreeSet;

use polars::prelude::*;

use crate::error::PodError;
use crate::schema::{choice, derived, record};
use crate::selection::Selection;

/// A table tagged with the label it is reported under.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub frame: DataFrame,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }

    /// Label a freshly uploaded table by its first warehouse and team.
    pub fn labelled(frame: DataFrame) -> Self {
        let name = source_label(&frame);
        Self { name, frame }
    }
}

/// Trim column names and cast every column to text.
pub fn normalize_frame(df: DataFrame) -> Result<DataFrame, PodError> {
    let mut df = df;
    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.clone())?;

    let needs_cast = df
        .get_columns()
        .iter()
        .any(|c| c.dtype() != &DataType::String);
    if !needs_cast {
        return Ok(df);
    }

    let casts: Vec<Expr> = trimmed
        .iter()
        .map(|c| col(c.as_str()).cast(DataType::String))
        .collect();
    Ok(df.lazy().with_columns(casts).collect()?)
}

pub fn require_columns(
    df: &DataFrame,
    required: &[&str],
    context: &'static str,
) -> Result<(), PodError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PodError::SchemaValidation { context, missing })
    }
}

/// Text of a single cell; `None` for nulls and missing columns.
pub fn cell_text(df: &DataFrame, column: &str, row: usize) -> Result<Option<String>, PodError> {
    match df.column(column) {
        Ok(c) => Ok(any_value_text(c.get(row)?)),
        Err(_) => Ok(None),
    }
}

pub fn any_value_text(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        other => Some(format!("{other}")),
    }
}

/// Non-null values of a text column in row order.
pub fn text_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>, PodError> {
    let values = df.column(column)?.str()?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Identifier ordering: integers numerically, integers before other text,
/// other text lexically.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Frequency of each non-null value of `column`, most frequent first.
/// Ties keep the order in which values first appear.
pub fn value_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, usize)>, PodError> {
    let counts = df
        .clone()
        .lazy()
        .filter(col(column).is_not_null())
        .group_by_stable([col(column)])
        .agg([len().alias(derived::COUNT)])
        .sort(
            [derived::COUNT],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let keys = counts.column(column)?.str()?;
    let totals = counts.column(derived::COUNT)?.cast(&DataType::UInt64)?;
    let totals = totals.as_materialized_series().u64()?;

    let mut out = Vec::with_capacity(counts.height());
    for i in 0..counts.height() {
        let key = keys
            .get(i)
            .ok_or_else(|| PodError::InvalidData(format!("Null {column} after filtering")))?;
        let total = totals.get(i).unwrap_or(0);
        out.push((key.to_string(), total as usize));
    }
    Ok(out)
}

/// `{first WHS}-{first team_id}` with placeholders for absent values.
pub fn source_label(df: &DataFrame) -> String {
    let first = |column: &str, fallback: &str| {
        cell_text(df, column, 0)
            .ok()
            .flatten()
            .unwrap_or_else(|| fallback.to_string())
    };
    let whs = if df.height() > 0 {
        first(record::WHS, choice::UNKNOWN_WHS)
    } else {
        choice::UNKNOWN_WHS.to_string()
    };
    let team = if df.height() > 0 {
        first(record::TEAM_ID, choice::UNKNOWN_TEAM)
    } else {
        choice::UNKNOWN_TEAM.to_string()
    };
    format!("{whs}-{team}")
}

/// Distinct team ids present in the selected area, in identifier order.
pub fn team_options(df: &DataFrame, area: &Selection) -> Result<Vec<String>, PodError> {
    require_columns(df, &[record::WHS, record::TEAM_ID], "team options")?;
    let in_area = area.apply(df.clone().lazy(), record::WHS).collect()?;
    let teams: BTreeSet<String> = text_values(&in_area, record::TEAM_ID)?
        .into_iter()
        .flatten()
        .collect();
    let mut teams: Vec<String> = teams.into_iter().collect();
    teams.sort_by(|a, b| natural_cmp(a, b));
    Ok(teams)
}

/// Row-wise union of tables, tagging every row with its table's name.
///
/// Columns missing from some inputs are filled with nulls.
pub fn union_tables(tables: &[NamedTable]) -> Result<DataFrame, PodError> {
    let mut tagged: Vec<LazyFrame> = tables
        .iter()
        .map(|t| {
            t.frame
                .clone()
                .lazy()
                .with_column(lit(t.name.clone()).alias(derived::SOURCE_TABLE))
        })
        .collect();

    match tagged.len() {
        0 => Ok(DataFrame::empty()),
        1 => Ok(tagged.remove(0).collect()?),
        _ => Ok(concat_lf_diagonal(tagged, UnionArgs::default())?.collect()?),
    }
}
