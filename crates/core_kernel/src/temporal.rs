//! Business-date handling
//!
//! Package expiry, renewal horizons and priorities are all computed in whole
//! calendar days in the platform's local timezone, not in UTC. A package that
//! ends "tomorrow" in Baghdad must count as one day remaining even when the
//! UTC clock has not yet rolled over.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use std::str::FromStr;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Timezone wrapper for the business calendar
///
/// Wraps chrono_tz::Tz with string serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Converts a UTC datetime to the local timezone
    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<Tz> {
        utc.with_timezone(&self.0)
    }

    /// Returns the business date for the given instant
    pub fn business_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        self.to_local(utc).date_naive()
    }

    /// Returns today's business date
    pub fn today(&self) -> NaiveDate {
        self.business_date(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Asia::Baghdad)
    }
}

/// Whole days from `from` to `to`; negative when `to` is in the past
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_business_date_crosses_midnight_before_utc() {
        // 22:30 UTC is already 01:30 the next day in Baghdad (UTC+3)
        let utc = Utc.with_ymd_and_hms(2025, 3, 10, 22, 30, 0).unwrap();
        let tz = Timezone::default();

        assert_eq!(
            tz.business_date(utc),
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()
        );
    }

    #[test]
    fn test_days_between() {
        let a = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(days_between(a, b), 30);
        assert_eq!(days_between(b, a), -30);
    }

    #[test]
    fn test_timezone_parse() {
        let tz: Timezone = "Asia/Baghdad".parse().unwrap();
        assert_eq!(tz.name(), "Asia/Baghdad");
        assert!("Mars/Olympus".parse::<Timezone>().is_err());
    }

    #[test]
    fn test_timezone_serde() {
        let tz = Timezone::default();
        let json = serde_json::to_string(&tz).unwrap();
        assert_eq!(json, "\"Asia/Baghdad\"");
        let back: Timezone = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tz);
    }
}
