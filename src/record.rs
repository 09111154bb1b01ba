use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::PodError;
use crate::i18n::Locale;
use crate::schema::{choice, derived, photos, record};
use crate::table::any_value_text;

/// One POD failure row with its recognized fields pulled out.
///
/// Columns the pipeline does not interpret are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodRecord {
    pub warehouse: Option<String>,
    pub team_id: Option<String>,
    pub reason: Option<String>,
    pub driver_id: Option<String>,
    pub tracking_number: Option<String>,
    pub source: Option<String>,
    pub photos: [Option<String>; 6],
    pub extra: BTreeMap<String, String>,
}

impl PodRecord {
    pub fn from_row(df: &DataFrame, row: usize) -> Result<Self, PodError> {
        let mut rec = PodRecord::default();
        for column in df.get_columns() {
            let Some(value) = any_value_text(column.get(row)?) else {
                continue;
            };
            let name = column.name().as_str();
            match name {
                record::WHS => rec.warehouse = Some(value),
                record::TEAM_ID => rec.team_id = Some(value),
                record::RESULT => rec.reason = Some(value),
                record::DRIVER_ID => rec.driver_id = Some(value),
                record::TNO => rec.tracking_number = Some(value),
                derived::SOURCE_TABLE => rec.source = Some(value),
                _ => match photos::ALL.iter().position(|slot| *slot == name) {
                    Some(i) => rec.photos[i] = Some(value),
                    None => {
                        rec.extra.insert(name.to_string(), value);
                    }
                },
            }
        }
        Ok(rec)
    }

    /// Photo URLs in slot order. A value is kept only if it starts with one of
    /// the given scheme prefixes exactly as written.
    pub fn photo_urls<S: AsRef<str>>(&self, schemes: &[S]) -> Vec<String> {
        self.photos
            .iter()
            .flatten()
            .filter(|url| schemes.iter().any(|s| url.starts_with(s.as_ref())))
            .cloned()
            .collect()
    }
}

/// A record prepared for display under a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    pub driver_id: String,
    pub tracking_number: String,
    pub reason: String,
    /// Reason label per configured locale.
    pub labels: Vec<(Locale, String)>,
    pub photos: Vec<String>,
    pub source: Option<String>,
    /// First row of a new driver in enumerated output.
    pub driver_header: bool,
}

impl RecordView {
    pub fn new<S: AsRef<str>>(
        rec: &PodRecord,
        locales: &[Locale],
        schemes: &[S],
        driver_header: bool,
    ) -> Self {
        let reason = rec.reason.clone().unwrap_or_default();
        Self {
            driver_id: rec.driver_id.clone().unwrap_or_default(),
            tracking_number: rec
                .tracking_number
                .clone()
                .unwrap_or_else(|| choice::UNKNOWN_PARCEL.to_string()),
            labels: locales
                .iter()
                .map(|l| (*l, l.reason_label(&reason)))
                .collect(),
            reason,
            photos: rec.photo_urls(schemes),
            source: rec.source.clone(),
            driver_header,
        }
    }

    /// `Driver D1 - Parcel: `T1`: 无POD照片/ No POD`
    ///
    /// Localized labels are listed most specific first, without repeats.
    pub fn caption(&self) -> String {
        let mut labels: Vec<&str> = Vec::new();
        for (_, label) in self.labels.iter().rev() {
            if !labels.contains(&label.as_str()) {
                labels.push(label.as_str());
            }
        }
        if labels.is_empty() {
            labels.push(self.reason.as_str());
        }
        format!(
            "Driver {} - Parcel: `{}`: {}",
            self.driver_id,
            self.tracking_number,
            labels.join("/ ")
        )
    }
}
