// ============================================================================
// TableKit Library
// ============================================================================

pub mod columns;
pub mod core;
pub mod engine;
pub mod filter;
pub mod persist;
pub mod pipeline;
pub mod sort;

// Re-export main types for convenience
pub use engine::TableEngine;
pub use core::{CellValue, ColumnType, EngineError, Record, Result, RowData};

pub use columns::{ColumnDefinition, ColumnRegistry, ColumnViewState, PersistedColumnState};
pub use filter::{FilterEngine, FilterSpec, FilterType, TextMatchMode, unique_values};
pub use pipeline::{PageSize, PaginationController, Pipeline, VisibleWindow};
pub use sort::{SortDirection, SortEngine, SortKey};

// Re-export the persistence API
pub use persist::{
    FileStore, MemoryStore, PersistedTableState, STATE_VERSION, SettingsStore, TableStateStore,
};
