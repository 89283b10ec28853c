//! Statuses model cache.
//!
//! The statuses model (branches, pull requests and their build statuses) comes
//! from expensive GraphQL queries. To minimize the number of calls, the whole
//! model of each provider is kept here and two clocks decide what to fetch:
//!
//! - `update_time`: last time a hit check missed (or a full model was stored).
//!   Within the update interval, the cached model is served as is.
//! - `refresh_time`: last full refresh. Within the refresh interval, a miss
//!   only requires an incremental update of what changed since a watermark.
//!
//! Protocol for callers:
//! 1. Call [`StatusCache::hit`]. If true, use [`StatusCache::model`].
//! 2. Otherwise call [`StatusCache::update_since`] and fetch the returned scope.
//! 3. Store the result with [`StatusCache::set_model`], passing the ticket back.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::traits::{CacheIntervals, UpdateScope, UpdateTicket};
use crate::model::Model;

/// Outcome of storing a fetched model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
  /// Full refresh, the model was replaced
  Replaced,
  /// Partial update merged into the cached model
  Merged,
  /// Partial update for a provider that has no model yet
  SkippedUninitialized,
  /// Ticket issued before a hard reset
  SkippedStale,
}

impl StoreOutcome {
  pub fn stored(&self) -> bool {
    matches!(self, StoreOutcome::Replaced | StoreOutcome::Merged)
  }
}

/// Snapshot of the two clocks of a provider entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryClocks {
  pub update_time: DateTime<Utc>,
  pub refresh_time: DateTime<Utc>,
}

#[derive(Debug)]
struct CacheEntry {
  update_time: DateTime<Utc>,
  refresh_time: DateTime<Utc>,
  model: Option<Model>,
}

pub struct StatusCache {
  clock: Arc<dyn Clock>,
  intervals: CacheIntervals,
  entries: HashMap<String, CacheEntry>,
  /// Incremented by hard resets, see [`UpdateTicket`]
  generation: u64,
}

/// Timestamp older than any real refresh.
pub fn epoch() -> DateTime<Utc> {
  DateTime::<Utc>::default()
}

/// Whole seconds between two instants, regardless of order.
fn seconds_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
  (a - b).num_seconds().abs()
}

impl StatusCache {
  pub fn new(clock: Arc<dyn Clock>, intervals: CacheIntervals) -> Self {
    Self {
      clock,
      intervals,
      entries: HashMap::new(),
      generation: 0,
    }
  }

  pub fn intervals(&self) -> CacheIntervals {
    self.intervals
  }

  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  pub fn has_entry(&self, provider: &str) -> bool {
    self.entries.contains_key(provider)
  }

  pub fn is_initialized(&self, provider: &str) -> bool {
    self
      .entries
      .get(provider)
      .is_some_and(|entry| entry.model.is_some())
  }

  pub fn clocks(&self, provider: &str) -> Option<EntryClocks> {
    self.entries.get(provider).map(|entry| EntryClocks {
      update_time: entry.update_time,
      refresh_time: entry.refresh_time,
    })
  }

  /// Decide whether the cached model can be served without calling the api.
  ///
  /// The first call for a provider creates its entry and always misses. On a
  /// miss the update time is reset immediately, so that quick successive
  /// checks (e.g. fast view switching) do not each trigger a fetch while the
  /// first one is still in flight.
  pub fn hit(&mut self, provider: &str) -> bool {
    let now = self.clock.now();
    if !self.entries.contains_key(provider) {
      info!(provider, "Initialize statuses model");
      self.entries.insert(
        provider.to_string(),
        CacheEntry {
          update_time: now,
          refresh_time: epoch(),
          model: None,
        },
      );
      return false;
    }
    let intervals = self.intervals;
    let Some(entry) = self.entries.get_mut(provider) else {
      return false;
    };

    let update_age = seconds_between(now, entry.update_time);
    let refresh_age = seconds_between(now, entry.refresh_time);
    let present = entry.model.is_some();
    let hit_update = present && update_age < intervals.update.num_seconds();
    let hit_refresh = present && refresh_age < intervals.refresh.num_seconds();
    let is_hit = hit_update && hit_refresh;
    debug!(
      provider,
      update_age,
      max_update = intervals.update.num_seconds(),
      refresh_age,
      max_refresh = intervals.refresh.num_seconds(),
      hit = is_hit,
      "Statuses cache check"
    );

    if !is_hit {
      entry.update_time = now;
    }
    is_hit
  }

  /// Scope of the fetch required after a miss.
  ///
  /// A full refresh claims the refresh slot (`refresh_time = now`) so that
  /// checks made while the fetch is running only ask for partial updates.
  pub fn update_since(&mut self, provider: &str) -> UpdateTicket {
    let now = self.clock.now();
    let intervals = self.intervals;
    let entry = self
      .entries
      .entry(provider.to_string())
      .or_insert_with(|| CacheEntry {
        update_time: now,
        refresh_time: epoch(),
        model: None,
      });

    let scope = if seconds_between(now, entry.refresh_time) < intervals.refresh.num_seconds() {
      let since = now.checked_sub_signed(intervals.refresh).unwrap_or_else(epoch);
      info!(provider, since = %since, "Requires partial update");
      UpdateScope::Since(since)
    } else {
      entry.refresh_time = now;
      info!(
        provider,
        uninitialized = entry.model.is_none(),
        "Requires full refresh"
      );
      UpdateScope::Full
    };

    UpdateTicket {
      scope,
      generation: self.generation,
    }
  }

  /// Store a fetched model: replace it on a full refresh, merge it otherwise.
  pub fn set_model(&mut self, provider: &str, model: Model, ticket: &UpdateTicket) -> StoreOutcome {
    if ticket.generation < self.generation {
      warn!(
        provider,
        ticket = ticket.generation,
        current = self.generation,
        "Discarding statuses fetched before a cache reset"
      );
      return StoreOutcome::SkippedStale;
    }

    match ticket.scope {
      UpdateScope::Full => {
        let now = self.clock.now();
        let entry = self
          .entries
          .entry(provider.to_string())
          .or_insert_with(|| CacheEntry {
            update_time: now,
            refresh_time: now,
            model: None,
          });
        debug!(provider, items = model.len(), "Full refresh of statuses model");
        entry.update_time = now;
        entry.model = Some(model);
        StoreOutcome::Replaced
      }
      UpdateScope::Since(_) => {
        let Some(current) = self
          .entries
          .get_mut(provider)
          .and_then(|entry| entry.model.as_mut())
        else {
          debug!(provider, "Statuses model not set yet, skip partial update");
          return StoreOutcome::SkippedUninitialized;
        };
        debug!(
          provider,
          repos = model.header.repo_names.len(),
          "Merge partial statuses model"
        );
        current.merge_branches_and_prs(model);
        StoreOutcome::Merged
      }
    }
  }

  pub fn model(&self, provider: &str) -> Option<&Model> {
    self.entries.get(provider).and_then(|entry| entry.model.as_ref())
  }

  pub(crate) fn model_mut(&mut self, provider: &str) -> Option<&mut Model> {
    self
      .entries
      .get_mut(provider)
      .and_then(|entry| entry.model.as_mut())
  }

  /// After a failed fetch, move the refresh time back so that the next full
  /// refresh is due after one update interval instead of a whole refresh
  /// interval.
  pub fn schedule_near_refresh(&mut self, provider: &str) {
    let now = self.clock.now();
    let refresh_time = now
      .checked_sub_signed(self.intervals.refresh - self.intervals.update)
      .unwrap_or_else(epoch);
    let entry = self
      .entries
      .entry(provider.to_string())
      .or_insert_with(|| CacheEntry {
        update_time: now,
        refresh_time,
        model: None,
      });
    entry.refresh_time = refresh_time;
    info!(provider, refresh_time = %refresh_time, "Scheduled near refresh");
  }

  /// Invalidate the update time of the given providers, and also the refresh
  /// time when `hard`. A hard reset also invalidates the tickets in flight.
  pub fn reset<S: AsRef<str>>(&mut self, providers: &[S], hard: bool) {
    for provider in providers {
      if let Some(entry) = self.entries.get_mut(provider.as_ref()) {
        entry.update_time = epoch();
        if hard {
          entry.refresh_time = epoch();
        }
      }
    }
    if hard {
      self.generation += 1;
    }
  }
}
