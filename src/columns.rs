use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{ColumnType, EngineError, Result};
use crate::filter::FilterType;

// ============================================================================
// ColumnDefinition - static description of one column
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub id: String,
    pub title: String,
    pub column_type: ColumnType,
    pub default_width: u32,
    pub default_visible: bool,
    /// Overrides the filter behavior derived from `column_type`.
    pub filter_type: Option<FilterType>,
    /// Declared value domain for enum columns. When empty, choice lists are
    /// built from the live rows instead.
    pub enum_values: Vec<String>,
}

impl ColumnDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            column_type,
            default_width: 100,
            default_visible: true,
            filter_type: None,
            enum_values: Vec::new(),
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.default_width = width;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.default_visible = false;
        self
    }

    pub fn filter_type(mut self, filter_type: FilterType) -> Self {
        self.filter_type = Some(filter_type);
        self
    }

    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Filter behavior of this column: the explicit override when present,
    /// otherwise derived from the declared type. Date cells filter by their
    /// rendered text.
    pub fn effective_filter_type(&self) -> FilterType {
        self.filter_type.unwrap_or(match self.column_type {
            ColumnType::Text => FilterType::Text,
            ColumnType::Number => FilterType::Number,
            ColumnType::Enum => FilterType::Enum,
            ColumnType::Bool => FilterType::Bool,
            ColumnType::Date => FilterType::Text,
        })
    }
}

// ============================================================================
// ColumnViewState - mutable per-column presentation state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnViewState {
    pub order: usize,
    pub width: u32,
    pub visible: bool,
}

/// Saved fragment of one column's view state. Every field is optional so a
/// payload written by an older build still applies partially.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedColumnState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

// ============================================================================
// ColumnRegistry - definitions plus their live view state
// ============================================================================

/// The column set is fixed at construction; only view state (order, width,
/// visibility) changes afterwards.
#[derive(Debug, Clone)]
pub struct ColumnRegistry {
    defs: Vec<ColumnDefinition>,
    views: Vec<ColumnViewState>,
    index: HashMap<String, usize>,
}

impl ColumnRegistry {
    pub fn register(columns: Vec<ColumnDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, def) in columns.iter().enumerate() {
            if def.default_width == 0 {
                return Err(EngineError::InvalidWidth {
                    column: def.id.clone(),
                    width: 0,
                });
            }
            if index.insert(def.id.clone(), i).is_some() {
                return Err(EngineError::DuplicateColumnId(def.id.clone()));
            }
        }

        let views = columns
            .iter()
            .enumerate()
            .map(|(i, def)| ColumnViewState {
                order: i,
                width: def.default_width,
                visible: def.default_visible,
            })
            .collect();

        Ok(Self {
            defs: columns,
            views,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn contains(&self, column_id: &str) -> bool {
        self.index.contains_key(column_id)
    }

    pub fn definition(&self, column_id: &str) -> Option<&ColumnDefinition> {
        self.index.get(column_id).map(|&i| &self.defs[i])
    }

    pub fn view_state(&self, column_id: &str) -> Option<&ColumnViewState> {
        self.index.get(column_id).map(|&i| &self.views[i])
    }

    pub fn column_type(&self, column_id: &str) -> Option<ColumnType> {
        self.definition(column_id).map(|def| def.column_type)
    }

    fn index_of(&self, column_id: &str) -> Result<usize> {
        self.index
            .get(column_id)
            .copied()
            .ok_or_else(|| EngineError::UnknownColumn(column_id.to_string()))
    }

    pub fn set_width(&mut self, column_id: &str, width: u32) -> Result<()> {
        let idx = self.index_of(column_id)?;
        if width == 0 {
            return Err(EngineError::InvalidWidth {
                column: column_id.to_string(),
                width,
            });
        }
        self.views[idx].width = width;
        Ok(())
    }

    pub fn set_visible(&mut self, column_id: &str, visible: bool) -> Result<()> {
        let idx = self.index_of(column_id)?;
        self.views[idx].visible = visible;
        Ok(())
    }

    /// Moves a column to `rank`, shifting the columns in between. Target
    /// ranks past the end clamp to the last position, like dropping a dragged
    /// header past the edge.
    pub fn set_order(&mut self, column_id: &str, rank: usize) -> Result<()> {
        let idx = self.index_of(column_id)?;
        let old = self.views[idx].order;
        let rank = rank.min(self.defs.len() - 1);
        if rank == old {
            return Ok(());
        }
        if rank < old {
            for view in &mut self.views {
                if view.order >= rank && view.order < old {
                    view.order += 1;
                }
            }
        } else {
            for view in &mut self.views {
                if view.order > old && view.order <= rank {
                    view.order -= 1;
                }
            }
        }
        self.views[idx].order = rank;
        Ok(())
    }

    /// Applies a saved overlay. The overlay is advisory: ids no longer
    /// registered are dropped, invalid widths are ignored for that column
    /// only, and the resulting order is renormalized to a dense ranking so
    /// partial or stale rank data cannot corrupt the layout.
    pub fn apply_persisted(&mut self, saved: &BTreeMap<String, PersistedColumnState>) {
        for id in saved.keys() {
            if !self.contains(id) {
                debug!(column = %id, "dropping persisted state for unregistered column");
            }
        }

        let mut ranked: Vec<(usize, usize, usize)> = Vec::with_capacity(self.defs.len());
        for (idx, def) in self.defs.iter().enumerate() {
            let state = saved.get(&def.id);
            if let Some(state) = state {
                match state.width {
                    Some(0) => debug!(column = %def.id, "ignoring persisted zero width"),
                    Some(w) => self.views[idx].width = w,
                    None => {}
                }
                if let Some(v) = state.visible {
                    self.views[idx].visible = v;
                }
            }
            // Persisted ranks win ties against defaults, then registration
            // order keeps the result deterministic.
            let (key, tie) = match state.and_then(|s| s.order) {
                Some(rank) => (rank, 0),
                None => (self.views[idx].order, 1),
            };
            ranked.push((key, tie, idx));
        }

        ranked.sort_by_key(|&(key, tie, idx)| (key, tie, idx));
        for (rank, &(_, _, idx)) in ranked.iter().enumerate() {
            self.views[idx].order = rank;
        }
    }

    /// Current full state of every column, keyed by id. This is what gets
    /// persisted.
    pub fn snapshot(&self) -> BTreeMap<String, PersistedColumnState> {
        self.defs
            .iter()
            .zip(&self.views)
            .map(|(def, view)| {
                (
                    def.id.clone(),
                    PersistedColumnState {
                        order: Some(view.order),
                        width: Some(view.width),
                        visible: Some(view.visible),
                    },
                )
            })
            .collect()
    }

    pub fn columns_in_order(&self) -> Vec<&ColumnDefinition> {
        let mut ordered: Vec<(usize, &ColumnDefinition)> = self
            .defs
            .iter()
            .zip(&self.views)
            .map(|(def, view)| (view.order, def))
            .collect();
        ordered.sort_by_key(|&(order, _)| order);
        ordered.into_iter().map(|(_, def)| def).collect()
    }

    pub fn visible_columns_in_order(&self) -> Vec<&ColumnDefinition> {
        let mut ordered: Vec<(usize, &ColumnDefinition)> = self
            .defs
            .iter()
            .zip(&self.views)
            .filter(|(_, view)| view.visible)
            .map(|(def, view)| (view.order, def))
            .collect();
        ordered.sort_by_key(|&(order, _)| order);
        ordered.into_iter().map(|(_, def)| def).collect()
    }
}
