//! Shared handle over the statuses cache and its side caches.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

use super::clock::Clock;
use super::error::CacheError;
use super::side::{LabelCache, LabelMap, NotificationCache, StatusIndex};
use super::status::{EntryClocks, StatusCache, StoreOutcome};
use super::traits::{CacheIntervals, UpdateTicket};
use crate::model::{BuildStatus, IdentityChange, Model, Notification, Rename};

struct CacheState {
  statuses: StatusCache,
  status_index: StatusIndex,
  notifications: NotificationCache,
  labels: LabelCache,
}

struct Shared {
  state: Mutex<CacheState>,
  /// Signalled every time a model is stored
  initialized: Notify,
  /// Configured provider ids, the scope of `reset`
  providers: Vec<String>,
}

/// Cache service shared by every task of the process.
///
/// Cloning is cheap and all clones see the same state. The bookkeeping
/// methods are synchronous; the lock is never held across an await.
#[derive(Clone)]
pub struct CacheService {
  inner: Arc<Shared>,
  init_timeout: Duration,
}

impl CacheService {
  pub fn new(clock: Arc<dyn Clock>, intervals: CacheIntervals, providers: Vec<String>) -> Self {
    Self {
      inner: Arc::new(Shared {
        state: Mutex::new(CacheState {
          statuses: StatusCache::new(clock, intervals),
          status_index: StatusIndex::default(),
          notifications: NotificationCache::default(),
          labels: LabelCache::default(),
        }),
        initialized: Notify::new(),
        providers,
      }),
      init_timeout: Duration::from_secs(10),
    }
  }

  /// Set how long [`ensure_initialized`](Self::ensure_initialized) waits.
  pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
    self.init_timeout = timeout;
    self
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    self
      .inner
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  pub fn providers(&self) -> &[String] {
    &self.inner.providers
  }

  pub fn intervals(&self) -> CacheIntervals {
    self.lock().statuses.intervals()
  }

  /// Current time of the cache clock.
  pub fn now(&self) -> DateTime<Utc> {
    self.lock().statuses.now()
  }

  pub fn is_initialized(&self, provider: &str) -> bool {
    self.lock().statuses.is_initialized(provider)
  }

  pub fn has_entry(&self, provider: &str) -> bool {
    self.lock().statuses.has_entry(provider)
  }

  pub fn clocks(&self, provider: &str) -> Option<EntryClocks> {
    self.lock().statuses.clocks(provider)
  }

  pub fn hit(&self, provider: &str) -> bool {
    self.lock().statuses.hit(provider)
  }

  pub fn update_since(&self, provider: &str) -> UpdateTicket {
    self.lock().statuses.update_since(provider)
  }

  /// Store a fetched statuses model and rebuild the status index of the provider.
  pub fn set_model(&self, provider: &str, model: Model, ticket: &UpdateTicket) -> StoreOutcome {
    let outcome = {
      let mut state = self.lock();
      let outcome = state.statuses.set_model(provider, model, ticket);
      if outcome.stored() {
        let CacheState {
          statuses,
          status_index,
          ..
        } = &mut *state;
        if let Some(stored) = statuses.model(provider) {
          status_index.rebuild(provider, stored);
        }
      }
      outcome
    };
    if outcome.stored() {
      self.inner.initialized.notify_waiters();
    }
    outcome
  }

  /// Copy of the cached statuses model.
  pub fn model(&self, provider: &str) -> Option<Model> {
    self.lock().statuses.model(provider).cloned()
  }

  pub fn schedule_near_refresh(&self, provider: &str) {
    self.lock().statuses.schedule_near_refresh(provider);
  }

  /// Invalidate every configured provider. A hard reset also forces a full
  /// refresh and empties the side caches.
  pub fn reset(&self, hard: bool) {
    let mut state = self.lock();
    state.statuses.reset(&self.inner.providers, hard);
    if hard {
      state.status_index.clear();
      state.notifications.clear();
      state.labels.clear();
    }
    info!(hard, providers = self.inner.providers.len(), "Cache reset");
  }

  /// Wait until the statuses model of the provider has been stored.
  pub async fn ensure_initialized(&self, provider: &str) -> Result<(), CacheError> {
    let wait = async {
      loop {
        let notified = self.inner.initialized.notified();
        tokio::pin!(notified);
        // register before checking, a store in between must not be missed
        notified.as_mut().enable();
        if self.is_initialized(provider) {
          return;
        }
        debug!(provider, "Waiting for statuses model");
        notified.await;
      }
    };
    tokio::time::timeout(self.init_timeout, wait)
      .await
      .map_err(|_| CacheError::InitTimeout {
        provider: provider.to_string(),
        waited: self.init_timeout,
      })
  }

  pub fn status(&self, provider: &str, identity: &str) -> Option<BuildStatus> {
    self.lock().status_index.get(provider, identity)
  }

  /// Every cached status keyed by `provider_identity`.
  pub fn statuses(&self) -> HashMap<String, BuildStatus> {
    self.lock().status_index.flatten()
  }

  pub fn rename_status(&self, provider: &str, old: &str, new: &str) -> bool {
    self.lock().status_index.rename(provider, old, new)
  }

  /// Change the identity of an item of the cached statuses model, moving its
  /// cached status along.
  pub fn rekey_item(
    &self,
    provider: &str,
    identity: &str,
    change: IdentityChange,
  ) -> Result<Rename, CacheError> {
    let mut state = self.lock();
    let model = state
      .statuses
      .model_mut(provider)
      .ok_or_else(|| CacheError::NotInitialized(provider.to_string()))?;
    let rename = model.update_item_identity(identity, change)?;
    state
      .status_index
      .rename(provider, &rename.old, &rename.new);
    Ok(rename)
  }

  /// Replace the notifications of a provider. `None` means the fetch was
  /// skipped and the cached ones are kept.
  pub fn save_notifications(&self, provider: &str, notifications: Option<&[Notification]>) {
    match notifications {
      Some(list) => {
        debug!(provider, count = list.len(), "Save notifications");
        self.lock().notifications.save(provider, list);
      }
      None => debug!(provider, "Notifications not fetched, keep cached"),
    }
  }

  pub fn notification_reason(&self, provider: &str, identity: &str) -> Option<String> {
    self
      .lock()
      .notifications
      .reason(provider, identity)
      .map(str::to_string)
  }

  pub fn mention_count(&self, provider: &str) -> usize {
    self.lock().notifications.mention_count(provider)
  }

  pub fn total_mentions(&self) -> usize {
    self.lock().notifications.total_mentions()
  }

  pub fn labels_for(&self, provider: &str) -> Option<LabelMap> {
    self.lock().labels.get(provider).cloned()
  }

  /// True if the caller must fetch the labels of the provider (only once).
  pub fn claim_label_fetch(&self, provider: &str) -> bool {
    self.lock().labels.claim_fetch(provider)
  }

  pub fn set_labels(&self, provider: &str, labels: LabelMap) {
    self.lock().labels.set(provider, labels);
  }

  pub fn label_color(&self, provider: &str, repo: &str, label: &str) -> Option<String> {
    self
      .lock()
      .labels
      .color(provider, repo, label)
      .map(str::to_string)
  }
}
