use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{deserialize_timestamp, Collection};
use crate::pipeline::schema::{FieldDef, FieldValue, Record};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Interview,
    Offer,
    Rejected,
    Withdrawn,
    Pending,
    #[serde(other)]
    Unknown,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Unknown => "unknown",
        }
    }

    /// Pipeline stage order: offers first when sorting descending.
    pub fn priority(&self) -> i64 {
        match self {
            ApplicationStatus::Offer => 6,
            ApplicationStatus::Interview => 5,
            ApplicationStatus::Applied => 4,
            ApplicationStatus::Pending => 3,
            ApplicationStatus::Rejected => 2,
            ApplicationStatus::Withdrawn => 1,
            ApplicationStatus::Unknown => 0,
        }
    }

    pub fn relevance_weight(&self) -> i64 {
        match self {
            ApplicationStatus::Offer => 10,
            ApplicationStatus::Interview => 8,
            ApplicationStatus::Applied => 6,
            ApplicationStatus::Pending => 4,
            ApplicationStatus::Rejected
            | ApplicationStatus::Withdrawn
            | ApplicationStatus::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationSource {
    Angelist,
    Yc,
    CompanyWebsite,
    Linkedin,
    Indeed,
    Glassdoor,
    Other,
    #[serde(other)]
    Unknown,
}

impl ApplicationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationSource::Angelist => "angelist",
            ApplicationSource::Yc => "yc",
            ApplicationSource::CompanyWebsite => "company_website",
            ApplicationSource::Linkedin => "linkedin",
            ApplicationSource::Indeed => "indeed",
            ApplicationSource::Glassdoor => "glassdoor",
            ApplicationSource::Other => "other",
            ApplicationSource::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub company_name: String,
    pub job_title: String,
    pub job_id: String,
    pub job_url: String,
    #[serde(default)]
    pub portal_url: Option<String>,
    pub status: ApplicationStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date_applied: DateTime<Utc>,
    pub email_used: String,
    pub resume_filename: String,
    pub source: ApplicationSource,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

static APPLICATION_FIELDS: [FieldDef<Application>; 13] = [
    FieldDef::new("company_name", "Company", |a: &Application| {
        FieldValue::text(&a.company_name)
    })
    .searchable()
    .facet()
    .sortable(),
    FieldDef::new("job_title", "Job Title", |a: &Application| {
        FieldValue::text(&a.job_title)
    })
    .searchable()
    .sortable(),
    FieldDef::new("job_id", "Job ID", |a: &Application| FieldValue::text(&a.job_id)).searchable(),
    FieldDef::new("job_url", "Job URL", |a: &Application| FieldValue::text(&a.job_url)),
    FieldDef::new("portal_url", "Portal URL", |a: &Application| {
        FieldValue::optional(&a.portal_url)
    }),
    FieldDef::new("status", "Status", |a: &Application| FieldValue::Choice {
        value: a.status.as_str(),
        rank: a.status.priority(),
    })
    .facet()
    .sortable(),
    FieldDef::new("source", "Source", |a: &Application| {
        FieldValue::text(a.source.as_str())
    })
    .facet()
    .sortable(),
    FieldDef::new("date_applied", "Date Applied", |a: &Application| {
        FieldValue::Timestamp(a.date_applied)
    })
    .sortable(),
    FieldDef::new("email_used", "Email Used", |a: &Application| {
        FieldValue::text(&a.email_used)
    })
    .searchable(),
    FieldDef::new("resume_filename", "Resume", |a: &Application| {
        FieldValue::text(&a.resume_filename)
    }),
    FieldDef::new("notes", "Notes", |a: &Application| FieldValue::optional(&a.notes)).searchable(),
    FieldDef::new("created_at", "Created At", |a: &Application| {
        FieldValue::Timestamp(a.created_at)
    })
    .sortable(),
    FieldDef::new("updated_at", "Updated At", |a: &Application| {
        FieldValue::Timestamp(a.updated_at)
    })
    .sortable(),
];

impl Record for Application {
    const COLLECTION: Collection = Collection::Applications;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn fields() -> &'static [FieldDef<Self>] {
        &APPLICATION_FIELDS
    }

    fn type_score(&self) -> i64 {
        self.status.relevance_weight()
    }

    fn is_rich(&self) -> bool {
        FieldValue::optional(&self.portal_url).is_present()
    }

    /// `success_rate`: share of applications at interview or offer, in
    /// percent rounded to two decimals.
    fn metrics(records: &[Self]) -> Map<String, Value> {
        let successful = records
            .iter()
            .filter(|a| {
                matches!(
                    a.status,
                    ApplicationStatus::Interview | ApplicationStatus::Offer
                )
            })
            .count();
        let rate = if records.is_empty() {
            0.0
        } else {
            successful as f64 / records.len() as f64 * 100.0
        };

        let mut metrics = Map::new();
        metrics.insert("success_rate".to_string(), json!((rate * 100.0).round() / 100.0));
        metrics
    }
}
