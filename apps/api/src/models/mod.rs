pub mod application;
pub mod contact;
pub mod referral_message;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use application::Application;
pub use contact::Contact;
pub use referral_message::ReferralMessage;

/// The logical collections a list view can operate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Contacts,
    Applications,
    ReferralMessages,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Contacts,
        Collection::Applications,
        Collection::ReferralMessages,
    ];

    /// Slug used in URLs and export filenames.
    pub fn slug(&self) -> &'static str {
        match self {
            Collection::Contacts => "contacts",
            Collection::Applications => "applications",
            Collection::ReferralMessages => "referral-messages",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.slug() == slug)
    }

    pub fn default_route(&self) -> &'static str {
        match self {
            Collection::Contacts => "/contacts/",
            Collection::Applications => "/applications/",
            Collection::ReferralMessages => "/referral-messages/",
        }
    }

    /// The contacts backend declares its item routes as `/{id}/`; the others as `/{id}`.
    pub fn default_item_trailing_slash(&self) -> bool {
        matches!(self, Collection::Contacts)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Accepts RFC 3339 timestamps as well as the naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// form the backend emits. Naive values are UTC.
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}
