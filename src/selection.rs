use polars::prelude::*;

use crate::schema::choice;

/// Caller-supplied filter on a single text column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No filtering.
    All,
    /// Keep rows equal to the value.
    Exact(String),
    /// Keep rows equal to any of the values.
    AnyOf(Vec<String>),
}

impl Selection {
    /// Build a selection from multiselect values.
    ///
    /// Any `All` entry selects everything. An empty choice list selects
    /// nothing.
    pub fn from_choices<S: AsRef<str>>(choices: &[S]) -> Self {
        let values: Vec<String> = choices
            .iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if values.iter().any(|c| c == choice::ALL) {
            return Selection::All;
        }
        match values.as_slice() {
            [single] => Selection::Exact(single.clone()),
            _ => Selection::AnyOf(values),
        }
    }

    pub fn from_choice(value: &str) -> Self {
        Self::from_choices(&[value])
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    /// Predicate over `column`, or `None` when nothing is filtered.
    pub fn predicate(&self, column: &str) -> Option<Expr> {
        match self {
            Selection::All => None,
            Selection::Exact(v) => Some(col(column).eq(lit(v.clone()))),
            Selection::AnyOf(vs) => {
                let values = Series::new("selection".into(), vs.clone());
                Some(col(column).is_in(lit(values), false))
            }
        }
    }

    /// Apply the selection to a lazy frame on a text column.
    pub fn apply(&self, lazy: LazyFrame, column: &str) -> LazyFrame {
        match self.predicate(column) {
            Some(expr) => lazy.filter(expr),
            None => lazy,
        }
    }
}
