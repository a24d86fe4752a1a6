use thiserror::Error;

use crate::filter::FilterType;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Column '{0}' is already registered")]
    DuplicateColumnId(String),

    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    #[error("Invalid width {width} for column '{column}': width must be positive")]
    InvalidWidth { column: String, width: u32 },

    #[error("Filter type mismatch on column '{column}': expected {expected}, got {actual}")]
    FilterTypeMismatch {
        column: String,
        expected: FilterType,
        actual: FilterType,
    },

    #[error("Value '{value}' is not a declared enum value of column '{column}'")]
    InvalidEnumValue { column: String, value: String },

    #[error("Persistence read failed: {0}")]
    PersistenceRead(String),

    #[error("Persistence write failed: {0}")]
    PersistenceWrite(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
