use std::num::NonZeroUsize;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::columns::ColumnRegistry;
use crate::core::RowData;
use crate::filter::FilterEngine;
use crate::sort::SortEngine;

// ============================================================================
// Page size
// ============================================================================

/// Rows per page. Positivity is carried by the type, so a persisted zero
/// fails deserialization instead of needing a runtime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    Rows(NonZeroUsize),
    All,
}

impl PageSize {
    pub const DEFAULT: PageSize = PageSize::Rows(NonZeroUsize::new(25).unwrap());

    /// The usual selector choices. Advisory: any positive size is valid.
    pub const STANDARD_OPTIONS: [usize; 4] = [10, 25, 50, 100];

    pub fn rows(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Self::Rows)
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Rows(n) => Some(n.get()),
            Self::All => None,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// PaginationController
// ============================================================================

/// Zero-based page cursor. The index is a request; `clamp` (called on every
/// refresh) restores `0 <= page_index < max(1, page_count)` once the
/// filtered row count is known.
#[derive(Debug, Clone)]
pub struct PaginationController {
    page_index: usize,
    page_size: PageSize,
    size_options: Vec<NonZeroUsize>,
}

impl Default for PaginationController {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: PageSize::DEFAULT,
            size_options: PageSize::STANDARD_OPTIONS
                .iter()
                .filter_map(|&n| NonZeroUsize::new(n))
                .collect(),
        }
    }
}

impl PaginationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn size_options(&self) -> &[NonZeroUsize] {
        &self.size_options
    }

    pub fn set_size_options(&mut self, options: Vec<NonZeroUsize>) {
        self.size_options = options;
    }

    /// Changing the page size jumps back to the first page, matching what a
    /// page-size selector does.
    pub fn set_page_size(&mut self, size: PageSize) {
        if self.page_size != size {
            self.page_size = size;
            self.page_index = 0;
        }
    }

    pub fn set_page(&mut self, index: usize) {
        self.page_index = index;
    }

    pub fn next_page(&mut self) {
        self.page_index = self.page_index.saturating_add(1);
    }

    pub fn prev_page(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    /// Number of pages the filtered row count yields; 0 when nothing matches.
    pub fn page_count(&self, filtered: usize) -> usize {
        match self.page_size {
            PageSize::All => usize::from(filtered > 0),
            PageSize::Rows(n) => filtered.div_ceil(n.get()),
        }
    }

    pub fn clamp(&mut self, filtered: usize) {
        let pages = self.page_count(filtered);
        if pages == 0 {
            self.page_index = 0;
        } else if self.page_index >= pages {
            self.page_index = pages - 1;
        }
    }

    /// Index range of the current page within the filtered row list.
    pub fn window(&self, filtered: usize) -> Range<usize> {
        match self.page_size {
            PageSize::All => 0..filtered,
            PageSize::Rows(n) => {
                let start = self.page_index.saturating_mul(n.get()).min(filtered);
                let end = start.saturating_add(n.get()).min(filtered);
                start..end
            }
        }
    }
}

// ============================================================================
// Pipeline - filter, then sort, then page
// ============================================================================

/// One page of derived output. Row references borrow from the caller's
/// slice; nothing is copied.
#[derive(Debug)]
pub struct VisibleWindow<'a, R> {
    pub rows: Vec<&'a R>,
    pub total_rows: usize,
    pub total_filtered: usize,
    pub page_count: usize,
    pub page_index: usize,
}

impl<'a, R> VisibleWindow<'a, R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    filters: FilterEngine,
    sort: SortEngine,
    pager: PaginationController,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &FilterEngine {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterEngine {
        &mut self.filters
    }

    pub fn sort(&self) -> &SortEngine {
        &self.sort
    }

    pub fn sort_mut(&mut self) -> &mut SortEngine {
        &mut self.sort
    }

    pub fn pager(&self) -> &PaginationController {
        &self.pager
    }

    pub fn pager_mut(&mut self) -> &mut PaginationController {
        &mut self.pager
    }

    /// Recomputes the visible window from scratch: filter, stable sort, then
    /// page clamping and slicing. Cheap enough to call after every mutation.
    pub fn refresh<'a, R: RowData>(
        &mut self,
        registry: &ColumnRegistry,
        rows: &'a [R],
    ) -> VisibleWindow<'a, R> {
        let total_rows = rows.len();
        let mut kept: Vec<&R> = rows.iter().filter(|row| self.filters.evaluate(row)).collect();
        self.sort.sort_refs(registry, &mut kept);

        let total_filtered = kept.len();
        self.pager.clamp(total_filtered);
        let page_count = self.pager.page_count(total_filtered);
        let range = self.pager.window(total_filtered);
        let rows = kept[range].to_vec();

        trace!(
            total_rows,
            total_filtered,
            page_index = self.pager.page_index(),
            page_count,
            "pipeline refresh"
        );

        VisibleWindow {
            rows,
            total_rows,
            total_filtered,
            page_count,
            page_index: self.pager.page_index(),
        }
    }
}
