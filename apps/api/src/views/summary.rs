use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::pipeline::date_range::{DateBucket, DateRange};
use crate::pipeline::filter::{filter, FilterCriteria};
use crate::pipeline::schema::Record;
use crate::pipeline::PipelineError;

/// Breakdown of a collection by each of its facets.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub collection: &'static str,
    pub total: usize,
    /// Facet name → value → record count.
    pub by_facet: BTreeMap<&'static str, BTreeMap<String, usize>>,
    pub created_last_30_days: usize,
    /// Collection-specific figures such as `success_rate` for applications.
    pub metrics: Map<String, Value>,
}

pub fn summarize<R: Record>(
    records: &[R],
    now: DateTime<Utc>,
) -> Result<CollectionSummary, PipelineError> {
    let mut by_facet: BTreeMap<&'static str, BTreeMap<String, usize>> = BTreeMap::new();
    for def in R::fields().iter().filter(|f| f.facet) {
        let counts = by_facet.entry(def.name).or_default();
        for record in records {
            *counts.entry(def.value(record).display()).or_insert(0) += 1;
        }
    }

    let recent = FilterCriteria {
        date_range: Some(DateRange::Bucket(DateBucket::Last30)),
        ..Default::default()
    };

    Ok(CollectionSummary {
        collection: R::COLLECTION.slug(),
        total: records.len(),
        by_facet,
        created_last_30_days: filter(records, &recent, now)?.len(),
        metrics: R::metrics(records),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contact::{Contact, ContactType};
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_counts_by_facet() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let make = |id: &str, company: &str, kind: ContactType, days: i64| Contact {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@x.com"),
            company: company.to_string(),
            role: None,
            linkedin_url: None,
            contact_type: kind,
            notes: None,
            created_at: now - Duration::days(days),
            updated_at: now - Duration::days(days),
        };
        let records = vec![
            make("a", "Acme", ContactType::Referral, 2),
            make("b", "Acme", ContactType::Recruiter, 45),
            make("c", "Globex", ContactType::Referral, 10),
        ];

        let summary = summarize(&records, now).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_facet["company"]["Acme"], 2);
        assert_eq!(summary.by_facet["contact_type"]["referral"], 2);
        assert_eq!(summary.created_last_30_days, 2);
        assert_eq!(summary.collection, "contacts");
        assert!(summary.metrics.is_empty());
    }
}
