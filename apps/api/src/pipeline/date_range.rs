use std::ops::{Bound, RangeBounds};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Named creation-date windows offered by list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateBucket {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "quarter")]
    Quarter,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "last-30")]
    Last30,
    #[serde(rename = "last-90")]
    Last90,
}

impl FromStr for DateBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(DateBucket::Today),
            "week" => Ok(DateBucket::Week),
            "month" => Ok(DateBucket::Month),
            "quarter" => Ok(DateBucket::Quarter),
            "year" => Ok(DateBucket::Year),
            "last-30" | "last30" => Ok(DateBucket::Last30),
            "last-90" | "last90" => Ok(DateBucket::Last90),
            other => Err(format!("unknown date range '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    Bucket(DateBucket),
    /// Calendar dates; `to` covers its whole day, fractional seconds included.
    Custom {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

/// Resolved instant bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub start: Bound<DateTime<Utc>>,
    pub end: Bound<DateTime<Utc>>,
}

impl Bounds {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        (self.start, self.end).contains(&ts)
    }
}

impl DateRange {
    pub fn is_active(&self) -> bool {
        match self {
            DateRange::Bucket(_) => true,
            DateRange::Custom { from, to } => from.is_some() || to.is_some(),
        }
    }

    pub fn resolve(&self, now: DateTime<Utc>) -> Bounds {
        match self {
            DateRange::Bucket(bucket) => Bounds {
                start: Bound::Included(bucket_start(*bucket, now)),
                end: Bound::Included(now),
            },
            DateRange::Custom { from, to } => Bounds {
                start: from.map_or(Bound::Unbounded, |d| Bound::Included(start_of_day(d))),
                // Up to, not including, midnight after `to`
                end: to
                    .and_then(|d| d.succ_opt())
                    .map_or(Bound::Unbounded, |next| Bound::Excluded(start_of_day(next))),
            },
        }
    }
}

fn bucket_start(bucket: DateBucket, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    match bucket {
        DateBucket::Today => start_of_day(today),
        DateBucket::Week => now - Duration::days(7),
        DateBucket::Month => start_of_day(first_of_month(today.year(), today.month())),
        DateBucket::Quarter => {
            let quarter_month = (today.month0() / 3) * 3 + 1;
            start_of_day(first_of_month(today.year(), quarter_month))
        }
        DateBucket::Year => start_of_day(first_of_month(today.year(), 1)),
        DateBucket::Last30 => now - Duration::days(30),
        DateBucket::Last90 => now - Duration::days(90),
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // month is always 1..=12 here, so the first of it always exists
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_bucket() {
        let now = at(2024, 3, 15, 12);
        let bounds = DateRange::Bucket(DateBucket::Week).resolve(now);
        assert!(bounds.contains(at(2024, 3, 10, 0)));
        assert!(!bounds.contains(at(2024, 3, 1, 0)));
    }

    #[test]
    fn test_today_starts_at_midnight() {
        let now = at(2024, 3, 15, 12);
        let bounds = DateRange::Bucket(DateBucket::Today).resolve(now);
        assert_eq!(bounds.start, Bound::Included(at(2024, 3, 15, 0)));
        assert!(!bounds.contains(at(2024, 3, 14, 23)));
    }

    #[test]
    fn test_quarter_block_start() {
        let bounds = DateRange::Bucket(DateBucket::Quarter).resolve(at(2024, 8, 20, 9));
        assert_eq!(bounds.start, Bound::Included(at(2024, 7, 1, 0)));
        let bounds = DateRange::Bucket(DateBucket::Quarter).resolve(at(2024, 12, 31, 9));
        assert_eq!(bounds.start, Bound::Included(at(2024, 10, 1, 0)));
    }

    #[test]
    fn test_month_and_year_starts() {
        let now = at(2024, 5, 17, 9);
        assert_eq!(
            DateRange::Bucket(DateBucket::Month).resolve(now).start,
            Bound::Included(at(2024, 5, 1, 0))
        );
        assert_eq!(
            DateRange::Bucket(DateBucket::Year).resolve(now).start,
            Bound::Included(at(2024, 1, 1, 0))
        );
    }

    #[test]
    fn test_future_records_excluded_from_bucket() {
        let now = at(2024, 3, 15, 12);
        let bounds = DateRange::Bucket(DateBucket::Last30).resolve(now);
        assert!(!bounds.contains(at(2024, 3, 16, 0)));
    }

    #[test]
    fn test_custom_to_is_inclusive_end_of_day() {
        let range = DateRange::Custom {
            from: Some(date(2024, 3, 1)),
            to: Some(date(2024, 3, 10)),
        };
        let bounds = range.resolve(at(2030, 1, 1, 0));
        assert!(bounds.contains(Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap()));
        assert!(!bounds.contains(at(2024, 3, 11, 0)));
        assert!(bounds.contains(at(2024, 3, 1, 0)));
    }

    #[test]
    fn test_custom_to_keeps_subsecond_times() {
        let range = DateRange::Custom {
            from: None,
            to: Some(date(2024, 3, 10)),
        };
        let bounds = range.resolve(at(2030, 1, 1, 0));
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap()
            + Duration::milliseconds(500);
        assert!(bounds.contains(late));
        assert_eq!(bounds.end, Bound::Excluded(at(2024, 3, 11, 0)));
    }

    #[test]
    fn test_custom_open_ended() {
        let range = DateRange::Custom {
            from: None,
            to: Some(date(2024, 3, 10)),
        };
        let bounds = range.resolve(at(2030, 1, 1, 0));
        assert!(bounds.contains(at(1999, 1, 1, 0)));
        assert!(!DateRange::Custom { from: None, to: None }.is_active());
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!("last-90".parse::<DateBucket>(), Ok(DateBucket::Last90));
        assert!("fortnight".parse::<DateBucket>().is_err());
    }
}
