use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::columns::ColumnRegistry;
use crate::core::{CellValue, ColumnType, EngineError, Result, RowData};

// ============================================================================
// Sort keys
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Ascending => ord,
            Self::Descending => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

// ============================================================================
// Typed comparison
// ============================================================================

/// Coerced form of a cell under one sort key. `None` means the cell is
/// absent or does not coerce to the column's type; such rows sort after all
/// comparable ones regardless of direction.
enum SortValue {
    Number(f64),
    Instant(DateTime<Utc>),
    Flag(bool),
    Str(String),
}

fn sort_value(
    column_type: ColumnType,
    cell: Option<&CellValue>,
    case_sensitive: bool,
) -> Option<SortValue> {
    let cell = cell?;
    if cell.is_empty() {
        return None;
    }
    match column_type {
        ColumnType::Number => cell.as_number().map(SortValue::Number),
        ColumnType::Date => cell.as_instant().map(SortValue::Instant),
        ColumnType::Bool => cell.as_bool().map(SortValue::Flag),
        ColumnType::Text | ColumnType::Enum => {
            let rendered = cell.render();
            Some(SortValue::Str(if case_sensitive {
                rendered
            } else {
                rendered.to_lowercase()
            }))
        }
    }
}

fn compare_sort_values(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        // NaN never reaches here, as_number rejects it.
        (SortValue::Number(x), SortValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (SortValue::Instant(x), SortValue::Instant(y)) => x.cmp(y),
        (SortValue::Flag(x), SortValue::Flag(y)) => x.cmp(y),
        (SortValue::Str(x), SortValue::Str(y)) => x.cmp(y),
        // One column type produces one variant, mixed pairs cannot occur.
        _ => Ordering::Equal,
    }
}

// ============================================================================
// SortEngine - ordered keys over registered columns
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SortEngine {
    keys: Vec<SortKey>,
    case_sensitive: bool,
}

impl SortEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the key list. Every referenced column is checked first, so a
    /// failed call leaves the previous keys in place.
    pub fn set_keys(&mut self, registry: &ColumnRegistry, keys: Vec<SortKey>) -> Result<()> {
        for key in &keys {
            if !registry.contains(&key.column) {
                return Err(EngineError::UnknownColumn(key.column.clone()));
            }
        }
        self.keys = keys;
        Ok(())
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Text comparisons fold case unless this is set.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Header-click cycle: unsorted -> ascending -> descending -> unsorted,
    /// replacing any existing keys with the clicked column. Returns the new
    /// direction, `None` once the cycle wraps back to unsorted.
    pub fn toggle(
        &mut self,
        registry: &ColumnRegistry,
        column_id: &str,
    ) -> Result<Option<SortDirection>> {
        if !registry.contains(column_id) {
            return Err(EngineError::UnknownColumn(column_id.to_string()));
        }
        let next = match self.keys.as_slice() {
            [key] if key.column == column_id => match key.direction {
                SortDirection::Ascending => Some(SortDirection::Descending),
                SortDirection::Descending => None,
            },
            _ => Some(SortDirection::Ascending),
        };
        self.keys = match next {
            Some(direction) => vec![SortKey {
                column: column_id.to_string(),
                direction,
            }],
            None => Vec::new(),
        };
        Ok(next)
    }

    /// Compares two rows under the current keys: the first key that orders
    /// the pair decides. Direction flips comparable pairs only, so rows that
    /// do not coerce stay after comparable ones either way.
    pub fn compare<R: RowData>(&self, registry: &ColumnRegistry, a: &R, b: &R) -> Ordering {
        for key in &self.keys {
            let Some(column_type) = registry.column_type(&key.column) else {
                continue;
            };
            let va = sort_value(column_type, a.cell(&key.column), self.case_sensitive);
            let vb = sort_value(column_type, b.cell(&key.column), self.case_sensitive);
            let ord = match (va, vb) {
                (Some(x), Some(y)) => key.direction.apply(compare_sort_values(&x, &y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort; rows comparing equal keep their input order.
    pub fn sort_refs<R: RowData>(&self, registry: &ColumnRegistry, rows: &mut [&R]) {
        if self.keys.is_empty() {
            return;
        }
        rows.sort_by(|a, b| self.compare(registry, a, b));
    }

    /// Sorted view over a slice of rows, leaving the slice itself untouched.
    pub fn sorted<'a, R: RowData>(
        &self,
        registry: &ColumnRegistry,
        rows: &'a [R],
    ) -> Vec<&'a R> {
        let mut refs: Vec<&R> = rows.iter().collect();
        self.sort_refs(registry, &mut refs);
        refs
    }
}
