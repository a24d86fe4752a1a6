use std::collections::BTreeMap;

use crate::core::CellValue;

/// Keyed cell access over a caller-owned row model. Returning `None` for a
/// column is equivalent to holding `CellValue::Empty` there.
pub trait RowData {
    fn cell(&self, column_id: &str) -> Option<&CellValue>;
}

impl<R: RowData + ?Sized> RowData for &R {
    fn cell(&self, column_id: &str) -> Option<&CellValue> {
        (**self).cell(column_id)
    }
}

impl<R: RowData + ?Sized> RowData for Box<R> {
    fn cell(&self, column_id: &str) -> Option<&CellValue> {
        (**self).cell(column_id)
    }
}

/// Map-backed row, the ready-made `RowData` implementation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column_id: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(column_id.into(), value.into());
        self
    }

    pub fn set(&mut self, column_id: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(column_id.into(), value.into());
    }

    pub fn remove(&mut self, column_id: &str) -> Option<CellValue> {
        self.cells.remove(column_id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl RowData for Record {
    fn cell(&self, column_id: &str) -> Option<&CellValue> {
        self.cells.get(column_id)
    }
}

impl RowData for BTreeMap<String, CellValue> {
    fn cell(&self, column_id: &str) -> Option<&CellValue> {
        self.get(column_id)
    }
}
