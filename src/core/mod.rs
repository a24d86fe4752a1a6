pub mod error;
pub mod row;
pub mod value;

pub use error::{EngineError, Result};
pub use row::{Record, RowData};
pub use value::{CellValue, ColumnType};
