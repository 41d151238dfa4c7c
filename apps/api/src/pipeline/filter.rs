use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::date_range::{Bounds, DateRange};
use super::schema::{FieldDef, Record};
use super::PipelineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search_term: String,
    /// Facet name → required value. Empty values are ignored.
    #[serde(default)]
    pub facets: BTreeMap<String, String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl FilterCriteria {
    fn search_needle(&self) -> Option<String> {
        if self.search_term.trim().is_empty() {
            None
        } else {
            Some(self.search_term.to_lowercase())
        }
    }

    fn active_facets(&self) -> impl Iterator<Item = (&String, &String)> {
        self.facets.iter().filter(|(_, value)| !value.is_empty())
    }

    fn active_range(&self) -> Option<&DateRange> {
        self.date_range.as_ref().filter(|r| r.is_active())
    }

    /// True when no predicate would constrain anything.
    pub fn is_empty(&self) -> bool {
        self.search_needle().is_none()
            && self.active_facets().next().is_none()
            && self.active_range().is_none()
    }
}

/// Resolved predicates for one record type, validated up front.
struct Predicates<R: 'static> {
    needle: Option<String>,
    searchable: Vec<&'static FieldDef<R>>,
    facets: Vec<(&'static FieldDef<R>, String)>,
    bounds: Option<Bounds>,
}

impl<R: Record> Predicates<R> {
    fn compile(criteria: &FilterCriteria, now: DateTime<Utc>) -> Result<Self, PipelineError> {
        let mut facets = Vec::new();
        for (name, value) in criteria.active_facets() {
            let def = R::field(name).ok_or_else(|| PipelineError::UnknownField {
                collection: R::COLLECTION.slug(),
                field: name.clone(),
            })?;
            if !def.facet {
                return Err(PipelineError::UnsupportedField {
                    field: name.clone(),
                    usage: "facet",
                });
            }
            facets.push((def, value.clone()));
        }

        Ok(Self {
            needle: criteria.search_needle(),
            searchable: R::fields().iter().filter(|f| f.searchable).collect(),
            facets,
            bounds: criteria.active_range().map(|r| r.resolve(now)),
        })
    }

    fn matches(&self, record: &R) -> bool {
        if let Some(needle) = &self.needle {
            let hit = self
                .searchable
                .iter()
                .any(|f| f.value(record).display().to_lowercase().contains(needle.as_str()));
            if !hit {
                return false;
            }
        }

        if !self
            .facets
            .iter()
            .all(|(def, expected)| def.value(record).display() == *expected)
        {
            return false;
        }

        self.bounds
            .map_or(true, |bounds| bounds.contains(record.created_at()))
    }
}

/// Keeps the records matching every active predicate, preserving input order.
///
/// With no active predicate the input is returned as-is.
pub fn filter<'a, R, I>(
    records: I,
    criteria: &FilterCriteria,
    now: DateTime<Utc>,
) -> Result<Vec<&'a R>, PipelineError>
where
    R: Record,
    I: IntoIterator<Item = &'a R>,
{
    let predicates = Predicates::<R>::compile(criteria, now)?;
    if criteria.is_empty() {
        return Ok(records.into_iter().collect());
    }
    Ok(records
        .into_iter()
        .filter(|record| predicates.matches(record))
        .collect())
}
