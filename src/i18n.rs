//! Report locales: reason translations and summary sentence templates.
//!
//! Reasons arrive in English. English labels are the trimmed source text;
//! other locales look the trimmed reason up in a static table and fall back
//! to the trimmed source text on a miss.

use std::fmt;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Zh,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Locale::En),
            "zh" => Some(Locale::Zh),
            _ => None,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            Locale::En => "Summary (English)",
            Locale::Zh => "总结（中文）",
        }
    }

    /// Display label for a failure reason.
    pub fn reason_label(&self, reason: &str) -> String {
        let key = reason.trim();
        let table = match self {
            Locale::En => return key.to_string(),
            Locale::Zh => ZH_REASONS,
        };
        table
            .iter()
            .find(|(source, _)| *source == key)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn team_label(&self, team: &Selection) -> String {
        match (self, team) {
            (Locale::En, Selection::All) => "all teams".to_string(),
            (Locale::En, Selection::Exact(t)) => format!("team {t}"),
            (Locale::En, Selection::AnyOf(ts)) => format!("teams {}", ts.join(", ")),
            (Locale::Zh, Selection::All) => "所有团队".to_string(),
            (Locale::Zh, Selection::Exact(t)) => format!("团队{t}"),
            (Locale::Zh, Selection::AnyOf(ts)) => format!("团队{}", ts.join("、")),
        }
    }

    pub fn intro(&self, date: NaiveDate, team_label: &str) -> String {
        let date = date.format("%Y-%m-%d");
        match self {
            Locale::En => format!(
                "{date} POD failures were found for {team_label}. \
                 Please train the drivers below, with a focus on the following issues:"
            ),
            Locale::Zh => format!(
                "{date} {team_label}查到的POD不合格，请DSP对这些司机进行培训，\
                 其中重点注意以下几个问题："
            ),
        }
    }

    pub fn reason_line(&self, label: &str, count: Option<usize>) -> String {
        match (self, count) {
            (_, None) => format!("- {label}"),
            (Locale::En, Some(n)) => format!("- {label} ({n})"),
            (Locale::Zh, Some(n)) => format!("- {label}（{n}）"),
        }
    }

    pub fn examples_heading(&self) -> &'static str {
        match self {
            Locale::En => "Examples of failed deliveries:",
            Locale::Zh => "以下为一些不合格的例子：",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

const ZH_REASONS: &[(&str, &str)] = &[
    ("No Address Info", "地址不清"),
    ("Location Not Clear", "位置不明确"),
    ("No Clear Shipping Label", "运单标签不清晰"),
    ("Public or Unsafe Area", "公共或不安全区域"),
    ("Invalid Mailbox Delivery", "投递至无效邮箱"),
    ("Leave Outside of Building", "包裹留在建筑外"),
    ("Wrong Address", "地址错误"),
    ("Wrong Parcel Photo", "包裹照片错误"),
    ("No POD", "无POD照片"),
    ("Inappropriate Delivery", "投递方式不当"),
];
