use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_timestamp, Collection};
use crate::pipeline::schema::{FieldDef, FieldValue, Record};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Referral,
    Recruiter,
    HiringManager,
    Other,
    #[serde(other)]
    Unknown,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Referral => "referral",
            ContactType::Recruiter => "recruiter",
            ContactType::HiringManager => "hiring_manager",
            ContactType::Other => "other",
            ContactType::Unknown => "unknown",
        }
    }

    /// Sort priority when ordering by `contact_type`.
    pub fn priority(&self) -> i64 {
        match self {
            ContactType::Referral => 4,
            ContactType::HiringManager => 3,
            ContactType::Recruiter => 2,
            ContactType::Other | ContactType::Unknown => 1,
        }
    }

    /// Type component of the relevance score.
    pub fn relevance_weight(&self) -> i64 {
        match self {
            ContactType::Referral => 10,
            ContactType::HiringManager => 8,
            ContactType::Recruiter => 6,
            ContactType::Other => 4,
            ContactType::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    pub contact_type: ContactType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

static CONTACT_FIELDS: [FieldDef<Contact>; 9] = [
    FieldDef::new("name", "Name", |c: &Contact| FieldValue::text(&c.name))
        .searchable()
        .sortable(),
    FieldDef::new("email", "Email", |c: &Contact| FieldValue::text(&c.email))
        .searchable()
        .sortable(),
    FieldDef::new("company", "Company", |c: &Contact| FieldValue::text(&c.company))
        .searchable()
        .facet()
        .sortable(),
    FieldDef::new("role", "Role", |c: &Contact| FieldValue::optional(&c.role))
        .searchable()
        .sortable(),
    FieldDef::new("contact_type", "Contact Type", |c: &Contact| {
        FieldValue::Choice {
            value: c.contact_type.as_str(),
            rank: c.contact_type.priority(),
        }
    })
    .facet()
    .sortable(),
    FieldDef::new("linkedin_url", "LinkedIn URL", |c: &Contact| {
        FieldValue::optional(&c.linkedin_url)
    }),
    FieldDef::new("notes", "Notes", |c: &Contact| FieldValue::optional(&c.notes)).searchable(),
    FieldDef::new("created_at", "Created At", |c: &Contact| {
        FieldValue::Timestamp(c.created_at)
    })
    .sortable(),
    FieldDef::new("updated_at", "Updated At", |c: &Contact| {
        FieldValue::Timestamp(c.updated_at)
    })
    .sortable(),
];

impl Record for Contact {
    const COLLECTION: Collection = Collection::Contacts;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn fields() -> &'static [FieldDef<Self>] {
        &CONTACT_FIELDS
    }

    fn type_score(&self) -> i64 {
        self.contact_type.relevance_weight()
    }

    fn is_rich(&self) -> bool {
        FieldValue::optional(&self.linkedin_url).is_present()
    }
}
