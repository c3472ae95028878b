//! Exchange rate data model and loading pipeline
//!
//! This module contains the canonical rate record, the freshness classification
//! used by the cache, the network source that talks to the proxy endpoint, and the
//! service that orchestrates cache and network into a single authoritative rate.

pub mod service;
pub mod source;

pub use service::{LoadState, RateEvent, RateOrigin, RateService};
pub use source::{parse_payload, RateFetcher, RateSource, SourceError};

use chrono::{DateTime, Duration, Utc};

/// A validated exchange rate: units of local currency per 1 USD
///
/// The only way to build one is through [`RateRecord::new`], which rejects
/// non-finite and non-positive values, so every record in circulation is usable
/// for conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    value: f64,
    as_of_date: String,
}

impl RateRecord {
    /// Creates a record, returning `None` unless `value` is finite and positive
    pub fn new(value: f64, as_of_date: impl Into<String>) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            Some(Self {
                value,
                as_of_date: as_of_date.into(),
            })
        } else {
            None
        }
    }

    /// Local currency per 1 USD
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Publication date as reported upstream (not the fetch time)
    pub fn as_of_date(&self) -> &str {
        &self.as_of_date
    }
}

/// Freshness of the persisted rate relative to the cache TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Present and younger than the TTL
    Fresh,
    /// Present but older than the TTL
    Stale,
    /// Nothing usable is stored
    Absent,
}

/// A rate record together with the moment it was retrieved locally
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRateRecord {
    pub record: RateRecord,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRateRecord {
    /// Whether the entry is still fresh at `now` for the given TTL
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }

    /// Classifies the entry at `now`; a present entry is never `Absent`
    pub fn freshness_at(&self, now: DateTime<Utc>, ttl: Duration) -> Freshness {
        if self.is_fresh_at(now, ttl) {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }
}
