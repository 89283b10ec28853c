//! Core types shared by the cache and its callers.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Lifetimes of the cached statuses model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheIntervals {
  /// Below this age the cached model is served without any api call
  pub update: Duration,
  /// Above this age the cached model is replaced by a full refresh
  pub refresh: Duration,
}

/// Upper bound of both intervals, one year.
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 3600;

impl CacheIntervals {
  /// Intervals above `MAX_INTERVAL_SECS` are clamped to it.
  pub fn from_secs(update: u64, refresh: u64) -> Self {
    Self {
      update: clamped_seconds(update),
      refresh: clamped_seconds(refresh),
    }
  }
}

fn clamped_seconds(secs: u64) -> Duration {
  let secs = i64::try_from(secs.min(MAX_INTERVAL_SECS)).unwrap_or(i64::MAX);
  Duration::seconds(secs)
}

impl Default for CacheIntervals {
  fn default() -> Self {
    Self::from_secs(30, 3600)
  }
}

/// What a caller must fetch after a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
  /// Replace the whole model
  Full,
  /// Fetch only what changed since the watermark and merge it
  Since(DateTime<Utc>),
}

impl UpdateScope {
  pub fn is_full(&self) -> bool {
    matches!(self, UpdateScope::Full)
  }

  /// ISO 8601 watermark for "changed since" queries, empty on a full refresh.
  pub fn watermark(&self) -> String {
    match self {
      UpdateScope::Full => String::new(),
      UpdateScope::Since(since) => since.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
  }
}

/// Scope returned by `update_since`, stamped with the cache generation.
///
/// The ticket must be handed back to `set_model` with the fetched model. A
/// ticket issued before a hard reset is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateTicket {
  pub scope: UpdateScope,
  pub(crate) generation: u64,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// Fetch error when stale data is served instead
  pub error: Option<String>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      error: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      error: None,
    }
  }

  /// Serve stale cached data because the fetch failed.
  pub fn stale(data: T, error: impl Into<String>) -> Self {
    Self {
      data,
      source: CacheSource::CacheStale,
      error: Some(error.into()),
    }
  }

  /// Data built locally without fetching anything.
  pub fn placeholder(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Placeholder,
      error: None,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Data from cache after a failed fetch
  CacheStale,
  /// Nothing was fetched (e.g. statuses provided by a surrogate)
  Placeholder,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_watermark_format() {
    let since = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 5).unwrap();
    assert_eq!(
      UpdateScope::Since(since).watermark(),
      "2024-03-01T10:00:05.000Z"
    );
    assert_eq!(UpdateScope::Full.watermark(), "");
    assert!(UpdateScope::Full.is_full());
  }

  #[test]
  fn test_intervals_are_clamped() {
    let intervals = CacheIntervals::from_secs(u64::MAX, 10_000_000_000_000);
    let year = Duration::seconds(MAX_INTERVAL_SECS as i64);
    assert_eq!(intervals.update, year);
    assert_eq!(intervals.refresh, year);
    assert!(intervals.update > Duration::zero());
  }
}
