//! Explicit state machine for one list screen.
//!
//! `ViewState` is immutable: every transition goes through `apply` and
//! returns a new value. Changing what is shown (filters, sort, page size)
//! sends the user back to page 1. Selection is never touched by filter or
//! sort changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::date_range::DateRange;
use super::filter::{filter, FilterCriteria};
use super::paginate::{paginate, total_pages, DEFAULT_PAGE_SIZE};
use super::schema::Record;
use super::selection::{CheckState, SelectionSet};
use super::sort::{sort, SortSpec};
use super::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub criteria: FilterCriteria,
    pub sort: SortSpec,
    pub page: usize,
    pub page_size: usize,
    pub selection: SelectionSet,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            criteria: FilterCriteria::default(),
            sort: SortSpec::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            selection: SelectionSet::default(),
        }
    }
}

/// Wire form: `{"type": "set_page", "value": 2}`, `{"type": "clear_filters"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ViewAction {
    SetSearch(String),
    SetFacet { name: String, value: String },
    ClearFacet(String),
    SetDateRange(Option<DateRange>),
    ClearFilters,
    SetSort(SortSpec),
    SetPage(usize),
    SetPageSize(usize),
    Toggle(String),
    /// Ids currently visible on screen.
    SelectAll(Vec<String>),
    ClearSelection,
}

/// Derived output of one render pass.
#[derive(Debug, Clone, Serialize)]
pub struct ViewOutput<'a, R> {
    pub items: Vec<&'a R>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Pages a pager should draw; an empty result still shows one.
    pub display_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub filtered_count: usize,
    pub total_count: usize,
    pub select_all: CheckState,
    /// Selected ids that still exist in the collection.
    pub selected_count: usize,
}

impl ViewState {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    pub fn apply(&self, action: ViewAction) -> ViewState {
        let mut next = self.clone();
        match action {
            ViewAction::SetSearch(term) => {
                next.criteria.search_term = term;
                next.page = 1;
            }
            ViewAction::SetFacet { name, value } => {
                next.criteria.facets.insert(name, value);
                next.page = 1;
            }
            ViewAction::ClearFacet(name) => {
                next.criteria.facets.remove(&name);
                next.page = 1;
            }
            ViewAction::SetDateRange(range) => {
                next.criteria.date_range = range;
                next.page = 1;
            }
            ViewAction::ClearFilters => {
                next.criteria = FilterCriteria::default();
                next.page = 1;
            }
            ViewAction::SetSort(spec) => {
                next.sort = spec;
                next.page = 1;
            }
            ViewAction::SetPage(page) => next.page = page.max(1),
            ViewAction::SetPageSize(size) => {
                next.page_size = size.max(1);
                next.page = 1;
            }
            ViewAction::Toggle(id) => next.selection.toggle(&id),
            ViewAction::SelectAll(visible) => {
                next.selection.select_all(visible.iter().map(String::as_str))
            }
            ViewAction::ClearSelection => next.selection.clear(),
        }
        next
    }

    /// Runs filter → sort → paginate over `records`.
    ///
    /// A page past the end is clamped to the last page so the window always
    /// lies inside the filtered set.
    pub fn render<'a, R: Record>(
        &self,
        records: &'a [R],
        now: DateTime<Utc>,
    ) -> Result<ViewOutput<'a, R>, PipelineError> {
        let filtered = filter(records, &self.criteria, now)?;
        let sorted = sort(filtered, &self.sort, now)?;

        let last_page = total_pages(sorted.len(), self.page_size.max(1)).max(1);
        let window = paginate(&sorted, self.page.clamp(1, last_page), self.page_size)?;

        let select_all = self.selection.visible_state(window.items.iter().map(|r| r.id()));
        let mut live = self.selection.clone();
        live.retain_existing(records.iter().map(|r| r.id()));

        Ok(ViewOutput {
            select_all,
            selected_count: live.len(),
            display_pages: window.display_pages(),
            has_next: window.has_next(),
            has_prev: window.has_prev(),
            page: window.page,
            page_size: window.page_size,
            total_pages: window.total_pages,
            filtered_count: window.total_items,
            total_count: records.len(),
            items: window.items,
        })
    }
}
