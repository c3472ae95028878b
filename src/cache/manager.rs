//! File-backed store for the last retrieved exchange rate
//!
//! Provides a `RateCache` that keeps a single JSON record on disk with the time it
//! was fetched, supporting graceful degradation when the proxy is unavailable.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{CACHE_KEY, CACHE_TTL};
use crate::rate::{CachedRateRecord, Freshness, RateRecord};

/// Errors that can occur reading or writing the persisted rate
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be encoded or decoded
    #[error("stored rate is not valid JSON: {0}")]
    Encode(#[from] serde_json::Error),

    /// The document decoded but does not describe a usable rate
    #[error("stored rate is invalid: {0}")]
    InvalidRecord(String),
}

/// On-disk layout of the persisted rate
///
/// Field names match the record written by the browser widget
/// (`{valor, fecha, timestamp}` with a millisecond epoch timestamp).
#[derive(Debug, Serialize, Deserialize)]
struct StoredRate {
    valor: f64,
    fecha: String,
    timestamp: i64,
}

/// Persisted, single-key store for the current exchange rate
///
/// The record lives at `<cache_dir>/dolarlempira_cache.json`. Reads fail closed:
/// a missing, unreadable or malformed file is reported as absent, never as an error.
#[derive(Debug, Clone)]
pub struct RateCache {
    /// Directory where the cache file is stored
    cache_dir: PathBuf,
    /// How long a record counts as fresh
    ttl: Duration,
}

impl RateCache {
    /// Returns the XDG-compliant cache directory (`~/.cache/dolarlempira/` on Linux)
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn default_dir() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "dolarlempira")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }

    /// Creates a RateCache that stores its record under `cache_dir`
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            ttl: Duration::from_std(CACHE_TTL).unwrap_or_else(|_| Duration::hours(1)),
        }
    }

    /// Path of the single cache file
    fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", CACHE_KEY))
    }

    /// Returns the stored record if it is still fresh
    pub fn get(&self) -> Option<CachedRateRecord> {
        self.get_at(Utc::now())
    }

    /// Returns the stored record if it is fresh at `now`
    pub fn get_at(&self, now: DateTime<Utc>) -> Option<CachedRateRecord> {
        self.get_ignoring_ttl()
            .filter(|cached| cached.is_fresh_at(now, self.ttl))
    }

    /// Returns the stored record regardless of its age
    pub fn get_ignoring_ttl(&self) -> Option<CachedRateRecord> {
        match self.read() {
            Ok(cached) => cached,
            Err(e) => {
                debug!(error = %e, "Treating unreadable rate cache as absent");
                None
            }
        }
    }

    /// Classifies the stored record at `now`
    pub fn freshness_at(&self, now: DateTime<Utc>) -> Freshness {
        match self.get_ignoring_ttl() {
            Some(cached) => cached.freshness_at(now, self.ttl),
            None => Freshness::Absent,
        }
    }

    /// Persists `record` stamped with the current time
    pub fn set(&self, record: &RateRecord) -> Result<(), StorageError> {
        self.set_at(record, Utc::now())
    }

    /// Persists `record` stamped with `fetched_at`, replacing any previous entry
    ///
    /// The document is written to a sibling temp file and renamed into place so a
    /// reader never observes a half-written record.
    pub fn set_at(&self, record: &RateRecord, fetched_at: DateTime<Utc>) -> Result<(), StorageError> {
        fs::create_dir_all(&self.cache_dir)?;

        let stored = StoredRate {
            valor: record.value(),
            fecha: record.as_of_date().to_string(),
            timestamp: fetched_at.timestamp_millis(),
        };
        let json = serde_json::to_string(&stored)?;

        let path = self.cache_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            warn!(error = %e, "Failed to move rate cache into place");
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(valor = record.value(), "Rate cache saved");
        Ok(())
    }

    /// Reads and validates the stored document
    fn read(&self) -> Result<Option<CachedRateRecord>, StorageError> {
        let content = match fs::read_to_string(self.cache_path()) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredRate = serde_json::from_str(&content)?;

        let record = RateRecord::new(stored.valor, stored.fecha)
            .ok_or_else(|| StorageError::InvalidRecord(format!("valor {}", stored.valor)))?;
        let fetched_at = DateTime::from_timestamp_millis(stored.timestamp)
            .ok_or_else(|| StorageError::InvalidRecord(format!("timestamp {}", stored.timestamp)))?;

        Ok(Some(CachedRateRecord { record, fetched_at }))
    }
}
