use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schema::{FieldValue, Record};
use super::PipelineError;

/// Bonus when the record's richness field is filled in.
pub const RICHNESS_BONUS: i64 = 5;
/// Recency contribution for a record created today; decays one point per day.
pub const RECENCY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[serde(alias = "ascending")]
    Asc,
    #[default]
    #[serde(alias = "descending")]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{other}'")),
        }
    }
}

/// A schema field name, or the synthetic `relevance` score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortKey {
    Field(String),
    Relevance,
}

impl From<String> for SortKey {
    fn from(s: String) -> Self {
        if s == "relevance" {
            SortKey::Relevance
        } else {
            SortKey::Field(s)
        }
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Field(name) => name,
            SortKey::Relevance => "relevance".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Default for SortSpec {
    /// Newest first.
    fn default() -> Self {
        Self {
            key: SortKey::Field("created_at".to_string()),
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: SortKey::from(key.into()),
            direction,
        }
    }
}

/// Composite ranking: type score + richness bonus + linear recency decay.
///
/// Time dependent, so it is recomputed on every sort rather than stored.
pub fn relevance_score<R: Record>(record: &R, now: DateTime<Utc>) -> i64 {
    let days_since = (now - record.created_at()).num_days().max(0);
    let recency = (RECENCY_WINDOW_DAYS - days_since).max(0);
    let richness = if record.is_rich() { RICHNESS_BONUS } else { 0 };
    record.type_score() + richness + recency
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Text(String),
    Time(DateTime<Utc>),
    Rank(i64),
    Flag(bool),
}

impl From<FieldValue> for SortValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => SortValue::Text(s.unwrap_or_default().to_lowercase()),
            FieldValue::Timestamp(ts) => SortValue::Time(ts),
            FieldValue::Choice { rank, .. } => SortValue::Rank(rank),
            FieldValue::Flag(b) => SortValue::Flag(b),
        }
    }
}

/// Orders records by `spec`. Stable: equal keys keep their input order in
/// either direction.
pub fn sort<'a, R: Record>(
    records: Vec<&'a R>,
    spec: &SortSpec,
    now: DateTime<Utc>,
) -> Result<Vec<&'a R>, PipelineError> {
    let key_of: Box<dyn Fn(&R) -> SortValue> = match &spec.key {
        SortKey::Relevance => Box::new(move |r: &R| SortValue::Rank(relevance_score(r, now))),
        SortKey::Field(name) => {
            let def = R::field(name).ok_or_else(|| PipelineError::UnknownField {
                collection: R::COLLECTION.slug(),
                field: name.clone(),
            })?;
            if !def.sortable {
                return Err(PipelineError::UnsupportedField {
                    field: name.clone(),
                    usage: "sort key",
                });
            }
            Box::new(move |r: &R| SortValue::from(def.value(r)))
        }
    };

    let mut keyed: Vec<(SortValue, &'a R)> = records.into_iter().map(|r| (key_of(r), r)).collect();
    keyed.sort_by(|(a, _), (b, _)| {
        let ord = a.cmp(b);
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    Ok(keyed.into_iter().map(|(_, r)| r).collect())
}
