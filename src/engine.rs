use tracing::{debug, info, warn};

use crate::columns::{ColumnDefinition, ColumnRegistry};
use crate::core::{EngineError, Result, RowData};
use crate::filter::{self, FilterEngine, FilterSpec};
use crate::persist::{PersistedTableState, SettingsStore, TableStateStore, STATE_VERSION};
use crate::pipeline::{PageSize, Pipeline, VisibleWindow};
use crate::sort::{SortDirection, SortKey};

// ============================================================================
// TableEngine - one table view, end to end
// ============================================================================

/// Everything one table view needs behind a single handle: column layout,
/// filters, sorting, pagination and persistence.
///
/// Mutations follow a two-step contract: they change in-memory state only,
/// and nothing touches the settings store until [`TableEngine::save`] is
/// called. `has_unsaved_changes` tells renderers when a save is worthwhile.
///
/// # Examples
///
/// ```
/// use tablekit::{ColumnDefinition, ColumnType, FilterSpec, MemoryStore, Record, TableEngine};
///
/// # fn main() -> tablekit::Result<()> {
/// let columns = vec![
///     ColumnDefinition::new("id", "ID", ColumnType::Number),
///     ColumnDefinition::new("name", "Name", ColumnType::Text),
/// ];
/// let mut engine = TableEngine::open("users", columns, MemoryStore::new())?;
///
/// let rows = vec![
///     Record::new().with("id", 1i64).with("name", "John Doe"),
///     Record::new().with("id", 2i64).with("name", "Jane Smith"),
/// ];
///
/// engine.set_filter("name", Some(FilterSpec::contains("john")))?;
/// let window = engine.refresh(&rows);
/// assert_eq!(window.total_filtered, 1);
///
/// engine.save()?;
/// assert!(!engine.has_unsaved_changes());
/// # Ok(())
/// # }
/// ```
pub struct TableEngine<S: SettingsStore> {
    table_id: String,
    registry: ColumnRegistry,
    pipeline: Pipeline,
    store: TableStateStore<S>,
    dirty: bool,
}

impl<S: SettingsStore> TableEngine<S> {
    /// Registers the columns and restores any state previously saved for
    /// `table_id`. The restore is best-effort: a missing, corrupt or
    /// unreadable save leaves the engine on its defaults (with a warning for
    /// an unreachable store), so opening a table never fails because of old
    /// data. Column registration problems do fail, those are caller bugs.
    pub fn open(
        table_id: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        store: S,
    ) -> Result<Self> {
        let table_id = table_id.into();
        let registry = ColumnRegistry::register(columns)?;
        let mut engine = Self {
            table_id,
            registry,
            pipeline: Pipeline::new(),
            store: TableStateStore::new(store),
            dirty: false,
        };

        match engine.store.load(&engine.table_id) {
            Ok(Some(state)) => {
                engine.restore(state);
                info!(table = %engine.table_id, "restored persisted table state");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    table = %engine.table_id,
                    error = %e,
                    "settings store unavailable, starting from defaults"
                );
            }
        }
        Ok(engine)
    }

    /// Applies a saved state as an advisory overlay: entries referring to
    /// columns that no longer exist are dropped, and a filter that no longer
    /// validates falls back to none for that column only.
    fn restore(&mut self, state: PersistedTableState) {
        self.registry.apply_persisted(&state.columns);

        for (column, spec) in state.filters {
            if let Err(e) =
                self.pipeline
                    .filters_mut()
                    .set_filter(&self.registry, &column, Some(spec))
            {
                debug!(table = %self.table_id, column = %column, error = %e,
                    "dropping persisted filter");
            }
        }

        let keys: Vec<SortKey> = state
            .sort_keys
            .into_iter()
            .filter(|key| {
                let known = self.registry.contains(&key.column);
                if !known {
                    debug!(table = %self.table_id, column = %key.column,
                        "dropping persisted sort key");
                }
                known
            })
            .collect();
        if let Err(e) = self.pipeline.sort_mut().set_keys(&self.registry, keys) {
            debug!(table = %self.table_id, error = %e, "dropping persisted sort keys");
        }

        self.pipeline.pager_mut().set_page_size(state.page_size);
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn visible_columns(&self) -> Vec<&ColumnDefinition> {
        self.registry.visible_columns_in_order()
    }

    // ------------------------------------------------------------------
    // Column view state
    // ------------------------------------------------------------------

    pub fn set_width(&mut self, column_id: &str, width: u32) -> Result<()> {
        self.registry.set_width(column_id, width)?;
        self.dirty = true;
        Ok(())
    }

    pub fn set_visible(&mut self, column_id: &str, visible: bool) -> Result<()> {
        self.registry.set_visible(column_id, visible)?;
        self.dirty = true;
        Ok(())
    }

    pub fn set_order(&mut self, column_id: &str, rank: usize) -> Result<()> {
        self.registry.set_order(column_id, rank)?;
        self.dirty = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    pub fn filters(&self) -> &FilterEngine {
        self.pipeline.filters()
    }

    pub fn set_filter(&mut self, column_id: &str, spec: Option<FilterSpec>) -> Result<()> {
        self.pipeline
            .filters_mut()
            .set_filter(&self.registry, column_id, spec)?;
        self.dirty = true;
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        if !self.pipeline.filters().is_empty() {
            self.pipeline.filters_mut().clear_all();
            self.dirty = true;
        }
    }

    /// Choices for a column's filter popup. A declared enum domain wins;
    /// otherwise the distinct rendered values of the live rows are used.
    pub fn unique_values<R: RowData>(&self, rows: &[R], column_id: &str) -> Result<Vec<String>> {
        let def = self
            .registry
            .definition(column_id)
            .ok_or_else(|| EngineError::UnknownColumn(column_id.to_string()))?;
        if !def.enum_values.is_empty() {
            return Ok(def.enum_values.clone());
        }
        Ok(filter::unique_values(rows, column_id))
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    pub fn sort_keys(&self) -> &[SortKey] {
        self.pipeline.sort().keys()
    }

    pub fn set_sort_keys(&mut self, keys: Vec<SortKey>) -> Result<()> {
        self.pipeline.sort_mut().set_keys(&self.registry, keys)?;
        self.dirty = true;
        Ok(())
    }

    /// Header-click cycle for one column; see [`crate::sort::SortEngine::toggle`].
    pub fn toggle_sort(&mut self, column_id: &str) -> Result<Option<SortDirection>> {
        let direction = self.pipeline.sort_mut().toggle(&self.registry, column_id)?;
        self.dirty = true;
        Ok(direction)
    }

    /// Case sensitivity is an environment preference, not part of the
    /// persisted state.
    pub fn set_sort_case_sensitive(&mut self, case_sensitive: bool) {
        self.pipeline.sort_mut().set_case_sensitive(case_sensitive);
    }

    // ------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------

    pub fn page_size(&self) -> PageSize {
        self.pipeline.pager().page_size()
    }

    pub fn page_index(&self) -> usize {
        self.pipeline.pager().page_index()
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        self.pipeline.pager_mut().set_page_size(size);
        self.dirty = true;
    }

    /// The page index is derived navigation state; it is clamped on refresh
    /// and never persisted, so none of these mark the engine dirty.
    pub fn set_page(&mut self, index: usize) {
        self.pipeline.pager_mut().set_page(index);
    }

    pub fn next_page(&mut self) {
        self.pipeline.pager_mut().next_page();
    }

    pub fn prev_page(&mut self) {
        self.pipeline.pager_mut().prev_page();
    }

    // ------------------------------------------------------------------
    // Derived output
    // ------------------------------------------------------------------

    /// Runs filter, sort and pagination over the caller's rows and returns
    /// the visible window. Call after any mutation; it also restores the
    /// page-index invariant when the filtered count shrank.
    pub fn refresh<'a, R: RowData>(&mut self, rows: &'a [R]) -> VisibleWindow<'a, R> {
        self.pipeline.refresh(&self.registry, rows)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Current state as it would be persisted.
    pub fn snapshot(&self) -> PersistedTableState {
        PersistedTableState {
            version: STATE_VERSION,
            columns: self.registry.snapshot(),
            filters: self.pipeline.filters().filters().clone(),
            sort_keys: self.pipeline.sort().keys().to_vec(),
            page_size: self.pipeline.pager().page_size(),
        }
    }

    /// Writes the current state to the settings store. On success the engine
    /// is clean again; on failure the dirty flag stays set.
    pub fn save(&mut self) -> Result<()> {
        let state = self.snapshot();
        self.store.save(&self.table_id, &state)?;
        self.dirty = false;
        Ok(())
    }

    /// Removes the saved state for this table. The live engine keeps its
    /// current configuration.
    pub fn clear_saved_state(&self) -> Result<()> {
        self.store.clear(&self.table_id)
    }

    pub fn state_store(&self) -> &TableStateStore<S> {
        &self.store
    }
}
