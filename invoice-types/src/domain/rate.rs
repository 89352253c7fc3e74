//! Exchange rate cache entries and resolved rates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// The single persisted USD→EUR rate.
///
/// On disk: `{ "rate": 0.92, "timestamp": "<ISO-8601>", "date": "YYYY-MM-DD" }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedRate {
    pub rate: f64,
    #[serde(rename = "timestamp")]
    pub fetched_at: DateTime<Utc>,
    #[serde(rename = "date")]
    pub fetched_date: NaiveDate,
}

impl CachedRate {
    pub fn new(
        rate: f64,
        fetched_at: DateTime<Utc>,
        fetched_date: NaiveDate,
    ) -> Result<Self, DomainError> {
        validate_rate(rate)?;
        Ok(Self {
            rate,
            fetched_at,
            fetched_date,
        })
    }

    /// True when this entry was fetched on `date`.
    pub fn is_from(&self, date: NaiveDate) -> bool {
        self.fetched_date == date
    }

    /// Checks a deserialized entry; a non-positive rate means the file is unusable.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_rate(self.rate)
    }
}

pub(crate) fn validate_rate(rate: f64) -> Result<(), DomainError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(DomainError::InvalidRate(rate))
    }
}

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateOrigin {
    /// Cached entry fetched today.
    CacheToday,
    /// Fresh live fetch during this resolution.
    Live,
    /// Cached entry from an earlier day, used because the live fetch failed.
    CacheStale,
    /// Configured constant, used when nothing else was available.
    FallbackFixed,
}

impl RateOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateOrigin::CacheToday => "cache-today",
            RateOrigin::Live => "live",
            RateOrigin::CacheStale => "cache-stale",
            RateOrigin::FallbackFixed => "fallback-fixed",
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, RateOrigin::CacheToday | RateOrigin::CacheStale)
    }
}

impl fmt::Display for RateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A usable rate plus its provenance. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateResolution {
    pub rate: f64,
    pub origin: RateOrigin,
    /// Day the rate belongs to: the cache date for cached origins, today otherwise.
    pub rate_date: NaiveDate,
}

impl RateResolution {
    pub fn from_cache(cached: &CachedRate, origin: RateOrigin) -> Self {
        Self {
            rate: cached.rate,
            origin,
            rate_date: cached.fetched_date,
        }
    }

    pub fn live(rate: f64, today: NaiveDate) -> Self {
        Self {
            rate,
            origin: RateOrigin::Live,
            rate_date: today,
        }
    }

    pub fn fallback(rate: f64, today: NaiveDate) -> Self {
        Self {
            rate,
            origin: RateOrigin::FallbackFixed,
            rate_date: today,
        }
    }
}
