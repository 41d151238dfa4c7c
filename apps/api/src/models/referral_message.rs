use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{deserialize_timestamp, Collection};
use crate::pipeline::schema::{FieldDef, FieldValue, Record};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferralMessageType {
    ColdOutreach,
    WarmIntroduction,
    FollowUp,
    ThankYou,
    Networking,
    #[serde(other)]
    Unknown,
}

impl ReferralMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralMessageType::ColdOutreach => "cold_outreach",
            ReferralMessageType::WarmIntroduction => "warm_introduction",
            ReferralMessageType::FollowUp => "follow_up",
            ReferralMessageType::ThankYou => "thank_you",
            ReferralMessageType::Networking => "networking",
            ReferralMessageType::Unknown => "unknown",
        }
    }

    pub fn relevance_weight(&self) -> i64 {
        match self {
            ReferralMessageType::WarmIntroduction => 10,
            ReferralMessageType::FollowUp => 8,
            ReferralMessageType::ColdOutreach => 6,
            ReferralMessageType::Networking | ReferralMessageType::ThankYou => 4,
            ReferralMessageType::Unknown => 0,
        }
    }
}

/// A reusable outreach template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralMessage {
    pub id: String,
    pub title: String,
    pub message_type: ReferralMessageType,
    #[serde(default)]
    pub subject_template: Option<String>,
    pub message_template: String,
    #[serde(default)]
    pub target_company: Option<String>,
    #[serde(default)]
    pub target_position: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Stored as a string by the backend.
    #[serde(default)]
    pub usage_count: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl ReferralMessage {
    /// Usage count if the stored string is a number.
    pub fn parsed_usage(&self) -> Option<u64> {
        self.usage_count
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
    }

    /// Usage count as a number; unparseable counts read as zero.
    pub fn usage(&self) -> u64 {
        self.parsed_usage().unwrap_or(0)
    }
}

static REFERRAL_MESSAGE_FIELDS: [FieldDef<ReferralMessage>; 11] = [
    FieldDef::new("title", "Title", |m: &ReferralMessage| FieldValue::text(&m.title))
        .searchable()
        .sortable(),
    FieldDef::new("message_type", "Message Type", |m: &ReferralMessage| {
        FieldValue::Choice {
            value: m.message_type.as_str(),
            rank: m.message_type.relevance_weight(),
        }
    })
    .facet()
    .sortable(),
    FieldDef::new("subject_template", "Subject", |m: &ReferralMessage| {
        FieldValue::optional(&m.subject_template)
    })
    .searchable(),
    FieldDef::new("message_template", "Message", |m: &ReferralMessage| {
        FieldValue::text(&m.message_template)
    })
    .searchable(),
    FieldDef::new("target_company", "Target Company", |m: &ReferralMessage| {
        FieldValue::optional(&m.target_company)
    })
    .searchable()
    .facet()
    .sortable(),
    FieldDef::new("target_position", "Target Position", |m: &ReferralMessage| {
        FieldValue::optional(&m.target_position)
    })
    .searchable()
    .sortable(),
    FieldDef::new("is_active", "Active", |m: &ReferralMessage| {
        FieldValue::Flag(m.is_active)
    })
    .facet()
    .sortable(),
    FieldDef::new("usage_count", "Usage Count", |m: &ReferralMessage| {
        FieldValue::Text(Some(m.usage().to_string()))
    }),
    FieldDef::new("notes", "Notes", |m: &ReferralMessage| FieldValue::optional(&m.notes))
        .searchable(),
    FieldDef::new("created_at", "Created At", |m: &ReferralMessage| {
        FieldValue::Timestamp(m.created_at)
    })
    .sortable(),
    FieldDef::new("updated_at", "Updated At", |m: &ReferralMessage| {
        FieldValue::Timestamp(m.updated_at)
    })
    .sortable(),
];

impl Record for ReferralMessage {
    const COLLECTION: Collection = Collection::ReferralMessages;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn fields() -> &'static [FieldDef<Self>] {
        &REFERRAL_MESSAGE_FIELDS
    }

    fn type_score(&self) -> i64 {
        self.message_type.relevance_weight()
    }

    fn is_rich(&self) -> bool {
        FieldValue::optional(&self.subject_template).is_present()
    }

    /// Template usage analytics. Templates whose count is not a number are
    /// left out of the usage figures.
    fn metrics(records: &[Self]) -> Map<String, Value> {
        let mut total_usage = 0u64;
        let mut usage_by_type: BTreeMap<&'static str, u64> = BTreeMap::new();
        let mut most_used: Option<(&Self, u64)> = None;

        for message in records {
            let Some(usage) = message.parsed_usage() else {
                continue;
            };
            total_usage += usage;
            *usage_by_type.entry(message.message_type.as_str()).or_insert(0) += usage;
            if usage > most_used.map_or(0, |(_, best)| best) {
                most_used = Some((message, usage));
            }
        }

        let mut metrics = Map::new();
        metrics.insert(
            "active_templates".to_string(),
            json!(records.iter().filter(|m| m.is_active).count()),
        );
        metrics.insert("total_usage".to_string(), json!(total_usage));
        metrics.insert("usage_by_type".to_string(), json!(usage_by_type));
        metrics.insert(
            "most_used_template".to_string(),
            most_used.map_or(Value::Null, |(m, usage)| {
                json!({ "id": m.id, "title": m.title, "usage_count": usage })
            }),
        );
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_count_parsing() {
        let raw = serde_json::json!({
            "id": "m1",
            "title": "Warm intro",
            "message_type": "warm_introduction",
            "message_template": "Hi {contact_name}",
            "usage_count": "12",
            "created_at": "2024-01-05T00:00:00",
            "updated_at": "2024-01-05T00:00:00"
        });
        let msg: ReferralMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.usage(), 12);
        assert!(msg.is_active);
        assert_eq!(msg.type_score(), 10);
    }

    fn message(id: &str, kind: &str, usage: &str, active: bool) -> ReferralMessage {
        serde_json::from_value(json!({
            "id": id,
            "title": format!("Template {id}"),
            "message_type": kind,
            "message_template": "Hi",
            "usage_count": usage,
            "is_active": active,
            "created_at": "2024-01-05T00:00:00",
            "updated_at": "2024-01-05T00:00:00"
        }))
        .unwrap()
    }

    #[test]
    fn test_usage_metrics() {
        let messages = vec![
            message("m1", "cold_outreach", "3", true),
            message("m2", "follow_up", "7", true),
            message("m3", "cold_outreach", "7", false),
            message("m4", "networking", "n/a", true),
        ];
        let metrics = ReferralMessage::metrics(&messages);
        assert_eq!(metrics["active_templates"], 3);
        assert_eq!(metrics["total_usage"], 17);
        assert_eq!(
            metrics["usage_by_type"],
            json!({"cold_outreach": 10, "follow_up": 7})
        );
        // Ties keep the first template reaching the count
        assert_eq!(
            metrics["most_used_template"],
            json!({"id": "m2", "title": "Template m2", "usage_count": 7})
        );
    }

    #[test]
    fn test_no_usage_means_no_most_used() {
        let messages = vec![message("m1", "cold_outreach", "0", true)];
        assert_eq!(ReferralMessage::metrics(&messages)["most_used_template"], Value::Null);
    }

    #[test]
    fn test_bad_usage_count_reads_zero() {
        let raw = serde_json::json!({
            "id": "m2",
            "title": "Thanks",
            "message_type": "thank_you",
            "message_template": "Thank you!",
            "usage_count": "lots",
            "is_active": false,
            "created_at": "2024-01-05T00:00:00",
            "updated_at": "2024-01-05T00:00:00"
        });
        let msg: ReferralMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.usage(), 0);
        assert!(!msg.is_active);
    }
}
