use serde::Serialize;

use super::PipelineError;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One page of an ordered list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageWindow<T> {
    pub items: Vec<T>,
    /// Page actually served (1-indexed), after clamping a zero request to 1.
    pub page: usize,
    pub page_size: usize,
    /// `ceil(total / page_size)`; zero for an empty list.
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> PageWindow<T> {
    /// Pages to show in a pager; an empty list still renders one empty page.
    pub fn display_pages(&self) -> usize {
        self.total_pages.max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total_items.div_ceil(page_size)
    }
}

/// Slices `items` to `[(page-1)*page_size, page*page_size)`, clamped to the list.
pub fn paginate<T: Clone>(
    items: &[T],
    page: usize,
    page_size: usize,
) -> Result<PageWindow<T>, PipelineError> {
    if page_size == 0 {
        return Err(PipelineError::InvalidPageSize);
    }
    let page = page.max(1);
    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());

    Ok(PageWindow {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total_pages: total_pages(items.len(), page_size),
        total_items: items.len(),
    })
}
