use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::columns::ColumnRegistry;
use crate::core::{CellValue, EngineError, Result, RowData};

// ============================================================================
// Filter vocabulary
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    Text,
    Number,
    Enum,
    Bool,
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Enum => write!(f, "enum"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatchMode {
    #[default]
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Equals,
    NotEquals,
}

impl TextMatchMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Contains => "Contains",
            Self::NotContains => "Does Not Contain",
            Self::StartsWith => "Starts With",
            Self::EndsWith => "Ends With",
            Self::Equals => "Equals",
            Self::NotEquals => "Does Not Equal",
        }
    }

    pub const ALL: [TextMatchMode; 6] = [
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Equals,
        Self::NotEquals,
    ];
}

// ============================================================================
// FilterSpec - one predicate per variant
// ============================================================================

/// A closed set of predicates. Each variant carries everything its `matches`
/// arm needs, so the dispatch below stays exhaustive and checkable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSpec {
    Text {
        #[serde(default)]
        mode: TextMatchMode,
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Enum { selected: BTreeSet<String> },
    Bool { value: bool },
}

impl FilterSpec {
    pub fn text(mode: TextMatchMode, value: impl Into<String>) -> Self {
        Self::Text {
            mode,
            value: value.into(),
            case_sensitive: false,
        }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::text(TextMatchMode::Contains, value)
    }

    pub fn case_sensitive(self) -> Self {
        match self {
            Self::Text { mode, value, .. } => Self::Text {
                mode,
                value,
                case_sensitive: true,
            },
            other => other,
        }
    }

    pub fn number_range(min: Option<f64>, max: Option<f64>) -> Self {
        Self::Number { min, max }
    }

    pub fn enum_selection<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            selected: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn bool_equals(value: bool) -> Self {
        Self::Bool { value }
    }

    pub fn filter_type(&self) -> FilterType {
        match self {
            Self::Text { .. } => FilterType::Text,
            Self::Number { .. } => FilterType::Number,
            Self::Enum { .. } => FilterType::Enum,
            Self::Bool { .. } => FilterType::Bool,
        }
    }

    /// Evaluates the predicate against one cell. An absent cell behaves like
    /// `CellValue::Empty`.
    pub fn matches(&self, cell: Option<&CellValue>) -> bool {
        let cell = cell.unwrap_or(&CellValue::Empty);
        match self {
            Self::Text {
                mode,
                value,
                case_sensitive,
            } => match_text(cell, *mode, value, *case_sensitive),

            Self::Number { min, max } => match cell.as_number() {
                Some(n) => {
                    min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi)
                }
                None => false,
            },

            Self::Enum { selected } => selected.contains(cell.render().as_str()),

            Self::Bool { value } => cell.as_bool() == Some(*value),
        }
    }
}

/// Chip text for active-filter bars, e.g. `Contains "john"` or
/// `between 10 and 20`. The column name is the map key; callers prepend it.
impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text {
                mode,
                value,
                case_sensitive,
            } => {
                write!(f, "{} \"{}\"", mode.label(), value)?;
                if *case_sensitive {
                    write!(f, " (case sensitive)")?;
                }
                Ok(())
            }
            Self::Number { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => write!(f, "between {} and {}", lo, hi),
                (Some(lo), None) => write!(f, "at least {}", lo),
                (None, Some(hi)) => write!(f, "at most {}", hi),
                (None, None) => write!(f, "any number"),
            },
            Self::Enum { selected } => {
                if selected.is_empty() {
                    write!(f, "none selected")
                } else {
                    let values: Vec<&str> = selected.iter().map(String::as_str).collect();
                    write!(f, "one of {}", values.join(", "))
                }
            }
            Self::Bool { value } => write!(f, "is {}", value),
        }
    }
}

fn match_text(cell: &CellValue, mode: TextMatchMode, value: &str, case_sensitive: bool) -> bool {
    let (cell_text, needle) = if case_sensitive {
        (cell.render(), value.to_string())
    } else {
        (cell.render().to_lowercase(), value.to_lowercase())
    };

    // An empty cell never matches a non-empty needle, regardless of mode.
    if cell_text.is_empty() && !needle.is_empty() {
        return false;
    }

    match mode {
        TextMatchMode::Contains => cell_text.contains(&needle),
        TextMatchMode::NotContains => !cell_text.contains(&needle),
        TextMatchMode::StartsWith => cell_text.starts_with(&needle),
        TextMatchMode::EndsWith => cell_text.ends_with(&needle),
        TextMatchMode::Equals => cell_text == needle,
        TextMatchMode::NotEquals => cell_text != needle,
    }
}

// ============================================================================
// FilterEngine - per-column specs, AND-composed
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    filters: BTreeMap<String, FilterSpec>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or clears the filter for one column. The spec is validated
    /// against the registry before any state changes: the column must exist,
    /// the spec's type must match the column's effective filter type, and
    /// enum selections must stay inside the declared value domain (when the
    /// column declares one).
    pub fn set_filter(
        &mut self,
        registry: &ColumnRegistry,
        column_id: &str,
        spec: Option<FilterSpec>,
    ) -> Result<()> {
        let def = registry
            .definition(column_id)
            .ok_or_else(|| EngineError::UnknownColumn(column_id.to_string()))?;

        let Some(spec) = spec else {
            if self.filters.remove(column_id).is_some() {
                debug!(column = %column_id, "filter cleared");
            }
            return Ok(());
        };

        let expected = def.effective_filter_type();
        let actual = spec.filter_type();
        if actual != expected {
            return Err(EngineError::FilterTypeMismatch {
                column: column_id.to_string(),
                expected,
                actual,
            });
        }

        if let FilterSpec::Enum { selected } = &spec {
            if !def.enum_values.is_empty() {
                for value in selected {
                    if !def.enum_values.contains(value) {
                        return Err(EngineError::InvalidEnumValue {
                            column: column_id.to_string(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        debug!(column = %column_id, ?spec, "filter set");
        self.filters.insert(column_id.to_string(), spec);
        Ok(())
    }

    pub fn clear_all(&mut self) {
        if !self.filters.is_empty() {
            debug!(count = self.filters.len(), "all filters cleared");
            self.filters.clear();
        }
    }

    /// True when the row passes every active filter. With no filters active
    /// every row passes.
    pub fn evaluate<R: RowData>(&self, row: &R) -> bool {
        self.filters
            .iter()
            .all(|(column_id, spec)| spec.matches(row.cell(column_id)))
    }

    pub fn is_active(&self, column_id: &str) -> bool {
        self.filters.contains_key(column_id)
    }

    pub fn filters(&self) -> &BTreeMap<String, FilterSpec> {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Distinct rendered values of one column across the given rows, sorted.
/// Feeds enum choice lists when a column declares no value domain.
pub fn unique_values<R: RowData>(rows: &[R], column_id: &str) -> Vec<String> {
    let mut values = BTreeSet::new();
    for row in rows {
        let rendered = row
            .cell(column_id)
            .map(CellValue::render)
            .unwrap_or_default();
        values.insert(rendered);
    }
    values.into_iter().collect()
}
