//! Translating request parameters into pipeline state.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::pipeline::date_range::{DateBucket, DateRange};
use crate::pipeline::export::{ExportFormat, ExportRequest, ExportScope};
use crate::pipeline::filter::FilterCriteria;
use crate::pipeline::selection::SelectionSet;
use crate::pipeline::sort::{SortDirection, SortSpec};
use crate::pipeline::view::{ViewAction, ViewState};

const FACET_PREFIX: &str = "facet.";

fn parse_number(key: &str, raw: &str) -> Result<usize, AppError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| {
            AppError::Validation(format!("'{key}' must be a non-negative integer, got '{raw}'"))
        })
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| {
            AppError::Validation(format!("'{key}' must be a YYYY-MM-DD date, got '{raw}'"))
        })
}

/// Builds a `ViewState` from `GET /views/:collection` query pairs.
///
/// State is assembled through the reducer so the same page-reset rules apply
/// as in an interactive session; the requested page is applied last.
pub fn view_state_from_query(
    pairs: &[(String, String)],
    default_page_size: usize,
) -> Result<ViewState, AppError> {
    let mut state = ViewState::with_page_size(default_page_size);
    let mut page = None;
    let mut bucket = None;
    let mut from = None;
    let mut to = None;
    let mut sort_key = None;
    let mut direction = None;

    for (key, value) in pairs {
        match key.as_str() {
            "search" | "q" => state = state.apply(ViewAction::SetSearch(value.clone())),
            "date_range" if !value.is_empty() => {
                bucket = Some(value.parse::<DateBucket>().map_err(AppError::Validation)?)
            }
            "from" if !value.is_empty() => from = Some(parse_date("from", value)?),
            "to" if !value.is_empty() => to = Some(parse_date("to", value)?),
            "sort" if !value.is_empty() => sort_key = Some(value.clone()),
            "direction" if !value.is_empty() => {
                direction = Some(value.parse::<SortDirection>().map_err(AppError::Validation)?)
            }
            "page" => page = Some(parse_number("page", value)?),
            "page_size" => {
                let size = parse_number("page_size", value)?;
                if size == 0 {
                    return Err(AppError::Validation("'page_size' must be at least 1".to_string()));
                }
                state = state.apply(ViewAction::SetPageSize(size));
            }
            "selected" => {
                for id in value.split(',').map(str::trim).filter(|id| !id.is_empty()) {
                    if !state.selection.is_selected(id) {
                        state = state.apply(ViewAction::Toggle(id.to_string()));
                    }
                }
            }
            k if k.starts_with(FACET_PREFIX) => {
                let name = k[FACET_PREFIX.len()..].to_string();
                state = if value.is_empty() {
                    state.apply(ViewAction::ClearFacet(name))
                } else {
                    state.apply(ViewAction::SetFacet {
                        name,
                        value: value.clone(),
                    })
                };
            }
            _ => debug!("Ignoring query parameter '{key}'"),
        }
    }

    let range = match (bucket, from, to) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            return Err(AppError::Validation(
                "use either 'date_range' or 'from'/'to', not both".to_string(),
            ))
        }
        (Some(b), None, None) => Some(DateRange::Bucket(b)),
        (None, None, None) => None,
        (None, from, to) => Some(DateRange::Custom { from, to }),
    };
    if range.is_some() {
        state = state.apply(ViewAction::SetDateRange(range));
    }

    if sort_key.is_some() || direction.is_some() {
        let defaults = SortSpec::default();
        state = state.apply(ViewAction::SetSort(SortSpec::new(
            sort_key.unwrap_or_else(|| String::from(defaults.key)),
            direction.unwrap_or(defaults.direction),
        )));
    }

    if let Some(page) = page {
        state = state.apply(ViewAction::SetPage(page));
    }

    Ok(state)
}

/// Body of `POST /views/:collection/actions`: the client's current state and
/// one transition to apply to it.
#[derive(Debug, Deserialize)]
pub struct ActionBody {
    #[serde(default)]
    pub state: ViewState,
    pub action: ViewAction,
}

/// Body of `POST /views/:collection/export`.
#[derive(Debug, Deserialize)]
pub struct ExportBody {
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    pub scope: ExportScope,
    pub format: ExportFormat,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub selected: Vec<String>,
}

impl ExportBody {
    pub fn request(&self) -> ExportRequest {
        ExportRequest {
            scope: self.scope,
            format: self.format,
            fields: self.fields.clone(),
        }
    }

    pub fn selection(&self) -> SelectionSet {
        self.selected.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sort::SortKey;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_full_query() {
        let state = view_state_from_query(
            &pairs(&[
                ("search", "acme"),
                ("facet.contact_type", "referral"),
                ("date_range", "last-30"),
                ("sort", "relevance"),
                ("direction", "desc"),
                ("page", "2"),
                ("page_size", "5"),
                ("selected", "c1, c2,,c3"),
            ]),
            10,
        )
        .unwrap();

        assert_eq!(state.criteria.search_term, "acme");
        assert_eq!(state.criteria.facets["contact_type"], "referral");
        assert_eq!(state.criteria.date_range, Some(DateRange::Bucket(DateBucket::Last30)));
        assert_eq!(state.sort.key, SortKey::Relevance);
        assert_eq!((state.page, state.page_size), (2, 5));
        assert_eq!(state.selection.len(), 3);
    }

    #[test]
    fn test_empty_facet_clears_earlier_value() {
        let state = view_state_from_query(
            &pairs(&[("facet.company", "Acme"), ("facet.company", "")]),
            10,
        )
        .unwrap();
        assert!(!state.criteria.facets.contains_key("company"));
    }

    #[test]
    fn test_defaults() {
        let state = view_state_from_query(&[], 25).unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, 25);
        assert_eq!(state.sort, SortSpec::default());
        assert!(state.criteria.is_empty());
    }

    #[test]
    fn test_custom_range() {
        let state = view_state_from_query(&pairs(&[("to", "2024-03-10")]), 10).unwrap();
        assert_eq!(
            state.criteria.date_range,
            Some(DateRange::Custom {
                from: None,
                to: NaiveDate::from_ymd_opt(2024, 3, 10)
            })
        );
    }

    #[test]
    fn test_conflicting_ranges_rejected() {
        let query = pairs(&[("date_range", "week"), ("from", "2024-01-01")]);
        let result = view_state_from_query(&query, 10);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(view_state_from_query(&pairs(&[("page_size", "0")]), 10).is_err());
        assert!(view_state_from_query(&pairs(&[("page", "two")]), 10).is_err());
        assert!(view_state_from_query(&pairs(&[("direction", "sideways")]), 10).is_err());
        assert!(view_state_from_query(&pairs(&[("from", "03/10/2024")]), 10).is_err());
    }

    #[test]
    fn test_action_body_defaults_state() {
        let body: ActionBody = serde_json::from_value(serde_json::json!({
            "action": {"type": "toggle", "value": "c1"}
        }))
        .unwrap();
        assert_eq!(body.state, ViewState::default());
        assert_eq!(body.action, ViewAction::Toggle("c1".to_string()));
    }

    #[test]
    fn test_export_body_decodes() {
        let body: ExportBody = serde_json::from_value(serde_json::json!({
            "criteria": {"search_term": "x", "date_range": {"bucket": "week"}},
            "scope": "selected",
            "format": "json",
            "fields": ["name"],
            "selected": ["c1"]
        }))
        .unwrap();
        assert_eq!(body.request().scope, ExportScope::Selected);
        assert!(body.selection().is_selected("c1"));
        assert_eq!(body.criteria.date_range, Some(DateRange::Bucket(DateBucket::Week)));
    }
}
