//! Orchestration of the provider apis and the cache.
//!
//! A dispatch for a view fetches the work items of every enabled provider in
//! parallel, then refreshes notifications, labels and build statuses. Each
//! failure becomes an alert; the remaining providers are still shown, and a
//! failed statuses fetch keeps serving the previously cached model.

use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheResult, CacheService, LabelMap, StoreOutcome, UpdateTicket};
use crate::config::{Config, ProviderConfig, ProviderKind};
use crate::model::Model;
use crate::provider::ProviderApi;
use crate::services::{filter_items, merge_items, sort_items, ItemFilter};
use crate::view::View;

const NO_PROVIDERS: &str =
  "No providers have been configured, please, complete the setup in the configuration file";
const SURROGATE_MESSAGE: &str =
  "Branch statuses are shown in the surrogate provider defined in the configuration";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
  Warning,
  Danger,
}

/// User visible message about a failed or incomplete dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
  pub level: AlertLevel,
  pub message: String,
}

impl Alert {
  fn warning(message: impl Into<String>) -> Self {
    Self {
      level: AlertLevel::Warning,
      message: message.into(),
    }
  }

  fn api_failure(err: &color_eyre::Report) -> Self {
    Self {
      level: AlertLevel::Danger,
      message: format!("REST api call failed. Message: {}", err),
    }
  }
}

/// Statuses to be shown for a provider.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
  /// Provider the statuses are shown for
  pub provider: String,
  pub model: Model,
  pub labels: Option<LabelMap>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionCount {
  pub provider: String,
  pub mentions: usize,
  /// Mentions across all providers
  pub total: usize,
}

/// Everything produced by one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
  pub view: View,
  pub models: Vec<CacheResult<Model>>,
  pub alerts: Vec<Alert>,
  pub statuses: Vec<StatusUpdate>,
  pub mentions: Vec<MentionCount>,
}

/// Removes a provider from the in-flight set when the fetch ends or is dropped.
struct FetchGuard {
  fetching: Arc<Mutex<HashSet<String>>>,
  provider: String,
}

impl Drop for FetchGuard {
  fn drop(&mut self) {
    self
      .fetching
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.provider);
  }
}

pub struct Dispatcher {
  config: Arc<Config>,
  cache: CacheService,
  apis: HashMap<ProviderKind, Arc<dyn ProviderApi>>,
  /// Providers with a statuses fetch in flight
  fetching: Arc<Mutex<HashSet<String>>>,
}

impl Dispatcher {
  pub fn new(config: Arc<Config>, cache: CacheService) -> Self {
    Self {
      config,
      cache,
      apis: HashMap::new(),
      fetching: Arc::new(Mutex::new(HashSet::new())),
    }
  }

  /// Register the api used for every provider of the given kind.
  pub fn with_api(mut self, kind: ProviderKind, api: Arc<dyn ProviderApi>) -> Self {
    self.apis.insert(kind, api);
    self
  }

  pub fn cache(&self) -> &CacheService {
    &self.cache
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Used for reload operations.
  pub fn reset(&self, hard: bool) {
    self.cache.reset(hard);
  }

  fn api(&self, provider: &ProviderConfig) -> Result<Arc<dyn ProviderApi>> {
    self
      .apis
      .get(&provider.provider)
      .cloned()
      .ok_or_else(|| eyre!("No api available for provider {}", provider.provider.as_str()))
  }

  fn is_fetching(&self, provider: &str) -> bool {
    self
      .fetching
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contains(provider)
  }

  fn start_fetch(&self, provider: &str) -> FetchGuard {
    self
      .fetching
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(provider.to_string());
    FetchGuard {
      fetching: self.fetching.clone(),
      provider: provider.to_string(),
    }
  }

  pub async fn dispatch(&self, view: View) -> DispatchOutcome {
    info!(view = %view, "Dispatch");
    let providers: Vec<&ProviderConfig> = self.config.enabled_providers().collect();
    let mut alerts = Vec::new();
    if providers.is_empty() {
      alerts.push(Alert::warning(NO_PROVIDERS));
    }

    let responses = join_all(providers.iter().map(|p| self.view_model(p, view))).await;
    let mut models = Vec::new();
    for (provider, response) in providers.iter().zip(responses) {
      match response {
        Ok(mut result) => {
          if let Some(err) = &result.error {
            alerts.push(Alert::api_failure(&eyre!("{}", err)));
          }
          self.prepare_items(provider, view, &mut result.data);
          models.push(result);
        }
        Err(e) => {
          error!(view = %view, "REST api call failed: {}", e);
          alerts.push(Alert::api_failure(&e));
        }
      }
    }

    let notified: Vec<&ProviderConfig> = providers
      .iter()
      .copied()
      .filter(|p| p.enable_notifications)
      .collect();
    for (provider, result) in notified
      .iter()
      .zip(join_all(notified.iter().map(|p| self.refresh_notifications(p))).await)
    {
      if let Err(e) = result {
        error!(provider = %provider.uid, "Notifications failed: {}", e);
        alerts.push(Alert::api_failure(&e));
      }
    }
    let mentions = notified
      .iter()
      .map(|p| MentionCount {
        provider: p.uid.clone(),
        mentions: self.cache.mention_count(&p.uid),
        total: self.cache.total_mentions(),
      })
      .collect();

    join_all(providers.iter().map(|p| self.refresh_labels(p))).await;
    for result in &mut models {
      self.fill_label_colors(&mut result.data);
    }

    let mut statuses = Vec::new();
    // the statuses view already read the statuses
    if !view.is_statuses() {
      for result in join_all(providers.iter().map(|p| self.dispatch_provider_statuses(p))).await {
        match result {
          Ok(updates) => statuses.extend(updates),
          Err(e) => alerts.push(Alert::api_failure(&e)),
        }
      }
    }

    DispatchOutcome {
      view,
      models,
      alerts,
      statuses,
      mentions,
    }
  }

  async fn view_model(&self, provider: &ProviderConfig, view: View) -> Result<CacheResult<Model>> {
    if view.is_statuses() {
      return self.statuses_or_cached(provider).await;
    }
    let model = self.api(provider)?.work_items(provider, view).await?;
    Ok(CacheResult::from_network(model))
  }

  /// Merge, sort and filter the items of a model as configured.
  fn prepare_items(&self, provider: &ProviderConfig, view: View, model: &mut Model) {
    merge_items(model);
    sort_items(model, self.config.sorting);
    let filter = ItemFilter {
      view,
      today: self.cache.now(),
      max_age: self.config.max_age,
      label: &provider.filter_if_label,
    };
    filter_items(model, &filter);
  }

  /// Colors of labels that came without one, from the label cache.
  fn fill_label_colors(&self, model: &mut Model) {
    let uid = model.header.uid.clone();
    for item in model.items_mut() {
      let repo = item.repo_name().to_string();
      for label in item.labels.iter_mut().filter(|label| label.color.is_empty()) {
        if let Some(color) = self.cache.label_color(&uid, &repo, &label.name) {
          label.color = color;
        }
      }
    }
  }

  /// Model of the statuses view, from the cache if it has not expired.
  ///
  /// When another task is fetching the first model of the provider, waits
  /// for it instead of issuing a second full query.
  pub async fn statuses_or_cached(&self, provider: &ProviderConfig) -> Result<CacheResult<Model>> {
    let uid = provider.uid.as_str();
    if self.config.status_surrogate(uid).is_some() {
      return Ok(CacheResult::placeholder(empty_model(provider, SURROGATE_MESSAGE)));
    }

    if !self.cache.is_initialized(uid) && self.is_fetching(uid) {
      self.cache.ensure_initialized(uid).await?;
    }

    if self.cache.hit(uid) {
      if let Some(model) = self.cache.model(uid) {
        debug!(provider = uid, "Get statuses from cache");
        return Ok(CacheResult::from_cache(model));
      }
    }

    let ticket = self.cache.update_since(uid);
    match self.fetch_statuses(provider, ticket).await {
      Ok(_) => self
        .cache
        .model(uid)
        .map(CacheResult::from_network)
        .ok_or_else(|| eyre!("{}: Status cache is not initialized", uid)),
      Err(e) => match self.cache.model(uid) {
        Some(model) => Ok(CacheResult::stale(model, e.to_string())),
        None => Err(e),
      },
    }
  }

  /// Fetch the scope of the ticket and store it. On failure, a near refresh is
  /// scheduled and the cached model is left untouched.
  async fn fetch_statuses(&self, provider: &ProviderConfig, ticket: UpdateTicket) -> Result<StoreOutcome> {
    let uid = provider.uid.as_str();
    let _guard = self.start_fetch(uid);
    let scope = ticket.scope;
    info!(
      provider = uid,
      since = %scope.watermark(),
      full = scope.is_full(),
      "Get statuses from the api"
    );
    let fetched = match self.api(provider) {
      Ok(api) => api.statuses(provider, scope).await,
      Err(e) => Err(e),
    };
    match fetched {
      Ok(model) => Ok(self.cache.set_model(uid, model, &ticket)),
      Err(e) => {
        warn!(provider = uid, "Statuses fetch failed: {}", e);
        self.cache.schedule_near_refresh(uid);
        Err(e)
      }
    }
  }

  /// Statuses to show for a provider after a work items view, fetched only
  /// when the cache misses.
  pub async fn dispatch_provider_statuses(&self, provider: &ProviderConfig) -> Result<Vec<StatusUpdate>> {
    let uid = provider.uid.as_str();
    if let Some(surrogate) = self.config.status_surrogate(uid) {
      debug!(provider = uid, surrogate = %surrogate.uid, "Statuses from surrogate provider");
      return Ok(Vec::new());
    }
    if self.cache.hit(uid) {
      debug!(provider = uid, "Update statuses from cache");
      return Ok(self.status_updates(uid));
    }
    let ticket = self.cache.update_since(uid);
    self.fetch_statuses(provider, ticket).await?;
    if self.cache.is_initialized(uid) {
      Ok(self.status_updates(uid))
    } else {
      Ok(Vec::new())
    }
  }

  /// The cached statuses of a provider, also published under every provider
  /// that takes its statuses from it.
  pub fn status_updates(&self, uid: &str) -> Vec<StatusUpdate> {
    let Some(model) = self.cache.model(uid) else {
      return Vec::new();
    };
    let mut updates = vec![StatusUpdate {
      provider: uid.to_string(),
      model: model.clone(),
      labels: self.cache.labels_for(uid),
    }];
    for surrogated in self.config.status_surrogated_ids(uid) {
      updates.push(StatusUpdate {
        labels: self.cache.labels_for(&surrogated),
        provider: surrogated,
        model: model.clone(),
      });
    }
    updates
  }

  pub async fn refresh_notifications(&self, provider: &ProviderConfig) -> Result<()> {
    let notifications = self.api(provider)?.notifications(provider).await?;
    self
      .cache
      .save_notifications(&provider.uid, notifications.as_deref());
    Ok(())
  }

  /// Fetch the label colors of a provider, only the first time. A failure is
  /// not retried until the next hard reset.
  pub async fn refresh_labels(&self, provider: &ProviderConfig) {
    if !self.cache.claim_label_fetch(&provider.uid) {
      return;
    }
    let labels = match self.api(provider) {
      Ok(api) => api.labels(provider).await,
      Err(e) => Err(e),
    };
    match labels {
      Ok(Some(labels)) => {
        debug!(provider = %provider.uid, count = labels.len(), "Labels cached");
        self.cache.set_labels(&provider.uid, labels);
      }
      Ok(None) => {}
      Err(e) => warn!(provider = %provider.uid, "Labels fetch failed: {}", e),
    }
  }
}

fn empty_model(provider: &ProviderConfig, message: &str) -> Model {
  debug!(provider = %provider.uid, "{}", message);
  let mut model = Model::new().set_header(
    provider.provider.as_str(),
    provider.uid.as_str(),
    provider.user.as_str(),
    "",
  );
  model.header.message = Some(message.to_string());
  model
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{label_key, CacheIntervals, CacheSource, Clock, ManualClock, UpdateScope};
  use crate::model::{BuildStatus, ItemKind, NewItem, Notification};
  use async_trait::async_trait;
  use chrono::{TimeZone, Utc};
  use std::collections::BTreeMap;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use tokio::sync::Notify;

  #[derive(Default)]
  struct FakeApi {
    fail: AtomicBool,
    status_calls: AtomicUsize,
    label_calls: AtomicUsize,
    scopes: Mutex<Vec<UpdateScope>>,
    /// Work items returned instead of the default issue, with an uncolored label
    items: Mutex<Vec<(NewItem, Option<&'static str>)>>,
    /// When set, statuses calls block until `gate` is notified
    gated: AtomicBool,
    gate: Notify,
  }

  #[async_trait]
  impl ProviderApi for FakeApi {
    async fn work_items(&self, provider: &ProviderConfig, view: View) -> Result<Model> {
      if self.fail.load(Ordering::SeqCst) {
        return Err(eyre!("Bad credentials"));
      }
      let mut m = Model::new().set_header(
        provider.provider.as_str(),
        &provider.uid,
        &provider.user,
        &provider.url,
      );
      m.header.target = view.as_str().to_string();
      let items = self.items.lock().unwrap().clone();
      if items.is_empty() {
        m.add_item(NewItem::new("org/repo", ItemKind::Issue, "1").title("Issue"));
      }
      for (item, label) in items {
        m.add_item(item);
        if let Some(label) = label {
          m.add_last_item_label(label, "")?;
        }
      }
      Ok(m)
    }

    async fn statuses(&self, provider: &ProviderConfig, scope: UpdateScope) -> Result<Model> {
      self.status_calls.fetch_add(1, Ordering::SeqCst);
      self.scopes.lock().unwrap().push(scope);
      if self.gated.load(Ordering::SeqCst) {
        self.gate.notified().await;
      }
      if self.fail.load(Ordering::SeqCst) {
        return Err(eyre!("Bad GraphQL query"));
      }
      let mut m = Model::new().set_header(
        provider.provider.as_str(),
        &provider.uid,
        &provider.user,
        &provider.url,
      );
      m.header.add_repo_name("org/repo");
      m.add_item(
        NewItem::new("org/repo", ItemKind::Branch, "")
          .branch("main")
          .status(BuildStatus::Success),
      );
      Ok(m)
    }

    async fn notifications(&self, _provider: &ProviderConfig) -> Result<Option<Vec<Notification>>> {
      Ok(Some(vec![Notification {
        repo_name: "org/repo".to_string(),
        kind: ItemKind::Issue,
        iid: "1".to_string(),
        reason: "mention".to_string(),
      }]))
    }

    async fn labels(&self, _provider: &ProviderConfig) -> Result<Option<LabelMap>> {
      self.label_calls.fetch_add(1, Ordering::SeqCst);
      let mut labels = LabelMap::new();
      labels.insert(label_key("org/repo", "bug"), "#d73a4a".to_string());
      Ok(Some(labels))
    }
  }

  const CONFIG: &str = r#"
providers:
  - provider: GitHub
    user: usr1
  - provider: GitHub
    user: bot
    status_surrogate_user: usr1
    enable_notifications: false
"#;

  fn setup(yaml: &str) -> (Arc<ManualClock>, Arc<FakeApi>, Dispatcher) {
    let config = Arc::new(Config::from_yaml_str(yaml).unwrap());
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let cache = CacheService::new(clock.clone(), CacheIntervals::default(), config.provider_ids());
    let api = Arc::new(FakeApi::default());
    let dispatcher = Dispatcher::new(config, cache).with_api(ProviderKind::GitHub, api.clone());
    (clock, api, dispatcher)
  }

  #[tokio::test]
  async fn test_no_providers_raises_warning() {
    let (_clock, _api, dispatcher) = setup("providers: []\n");
    let outcome = dispatcher.dispatch(View::Assigned).await;
    assert!(outcome.models.is_empty());
    assert_eq!(outcome.alerts, vec![Alert::warning(NO_PROVIDERS)]);
  }

  #[tokio::test]
  async fn test_work_items_dispatch_updates_side_data() {
    let (_clock, api, dispatcher) = setup(CONFIG);
    let outcome = dispatcher.dispatch(View::Assigned).await;

    assert!(outcome.alerts.is_empty());
    assert_eq!(outcome.models.len(), 2);
    assert_eq!(outcome.models[0].data.header.target, "assigned");

    // notifications only for the provider that enables them
    assert_eq!(
      outcome.mentions,
      vec![MentionCount {
        provider: "0-github".to_string(),
        mentions: 1,
        total: 1,
      }]
    );
    assert_eq!(
      dispatcher
        .cache()
        .notification_reason("0-github", "org-repo_issue_1")
        .as_deref(),
      Some("mention")
    );

    // the surrogated provider does not query statuses but gets those of usr1
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
    let providers: Vec<&str> = outcome.statuses.iter().map(|s| s.provider.as_str()).collect();
    assert_eq!(providers, vec!["0-github", "1-github"]);
    assert_eq!(
      dispatcher.cache().status("0-github", "org-repo_branch_main"),
      Some(BuildStatus::Success)
    );
    assert!(outcome.statuses[0].labels.is_some());
  }

  #[tokio::test]
  async fn test_statuses_view_served_from_cache() {
    let (clock, api, dispatcher) = setup(CONFIG);
    let first = dispatcher.dispatch(View::Statuses).await;
    assert_eq!(first.models[0].source, CacheSource::Network);
    assert!(first.statuses.is_empty());

    clock.advance(10);
    let second = dispatcher.dispatch(View::Statuses).await;
    assert_eq!(second.models[0].source, CacheSource::CacheFresh);
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);

    clock.advance(30);
    dispatcher.dispatch(View::Statuses).await;
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 2);
    let scopes = api.scopes.lock().unwrap().clone();
    assert!(scopes[0].is_full());
    assert!(!scopes[1].is_full());
  }

  #[tokio::test]
  async fn test_statuses_wait_for_fetch_in_flight() {
    let (_clock, api, dispatcher) = setup(CONFIG);
    api.gated.store(true, Ordering::SeqCst);
    let provider = dispatcher.config().providers[0].clone();

    let fetch_started = async {
      while api.status_calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
      }
    };
    let (first, second) = tokio::join!(dispatcher.statuses_or_cached(&provider), async {
      fetch_started.await;
      assert!(dispatcher.is_fetching(&provider.uid));
      assert!(!dispatcher.cache().is_initialized(&provider.uid));

      let waiting = dispatcher.statuses_or_cached(&provider);
      tokio::pin!(waiting);
      assert!(futures::poll!(waiting.as_mut()).is_pending());
      api.gate.notify_one();
      waiting.await
    });

    assert_eq!(first.unwrap().source, CacheSource::Network);
    let second = second.unwrap();
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(second.data.len(), 1);
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
    assert!(!dispatcher.is_fetching(&provider.uid));
  }

  #[tokio::test]
  async fn test_work_items_merged_sorted_and_filtered() {
    let yaml = r#"
max_age: 5
providers:
  - provider: GitHub
    user: usr1
    filter_if_label: wontfix
  - provider: GitHub
    user: usr2
"#;
    let (_clock, api, dispatcher) = setup(yaml);
    let pr = |iid: &str, created: &str, updated: &str| NewItem {
      title: format!("PR {}", iid),
      created_at: created.to_string(),
      updated_at: updated.to_string(),
      ..NewItem::new("org/repo", ItemKind::Pr, iid)
    };
    *api.items.lock().unwrap() = vec![
      (pr("1", "2024-04-28T00:00:00Z", "2024-04-30T00:00:00Z"), Some("bug")),
      (
        NewItem {
          actions: BTreeMap::from([("follow_up".to_string(), true)]),
          ..pr("1", "2024-05-01T10:00:00Z", "2024-05-01T10:00:00Z")
        },
        None,
      ),
      // not updated for 21 days
      (pr("2", "2024-04-29T00:00:00Z", "2024-04-10T00:00:00Z"), None),
      (pr("3", "2024-04-30T00:00:00Z", "2024-04-30T00:00:00Z"), Some("wontfix")),
    ];

    let outcome = dispatcher.dispatch(View::Assigned).await;
    assert!(outcome.alerts.is_empty());

    let first = &outcome.models[0].data;
    assert_eq!(first.len(), 1);
    let merged = &first.items()[0];
    assert_eq!(merged.title, "PR 1");
    assert_eq!(merged.updated_at, "2024-05-01T10:00:00Z");
    assert_eq!(merged.actions.get("follow_up"), Some(&true));
    assert_eq!(merged.labels[0].color, "#d73a4a");

    // no label filter on the second provider, newest first
    let second = &outcome.models[1].data;
    let iids: Vec<&str> = second.items().iter().map(|i| i.iid()).collect();
    assert_eq!(iids, vec!["3", "1"]);
    assert_eq!(second.items()[0].labels[0].color, "");
  }

  #[tokio::test]
  async fn test_surrogated_statuses_view_is_placeholder() {
    let (_clock, _api, dispatcher) = setup(CONFIG);
    let outcome = dispatcher.dispatch(View::Statuses).await;
    let surrogated = &outcome.models[1];
    assert_eq!(surrogated.source, CacheSource::Placeholder);
    assert!(surrogated.data.is_empty());
    assert_eq!(surrogated.data.header.message.as_deref(), Some(SURROGATE_MESSAGE));
  }

  #[tokio::test]
  async fn test_failed_statuses_keep_cached_model() {
    let (clock, api, dispatcher) = setup(CONFIG);
    dispatcher.dispatch(View::Statuses).await;

    clock.advance(40);
    api.fail.store(true, Ordering::SeqCst);
    let outcome = dispatcher.dispatch(View::Statuses).await;

    let served = &outcome.models[0];
    assert_eq!(served.source, CacheSource::CacheStale);
    assert_eq!(served.data.len(), 1);
    assert_eq!(
      outcome.alerts,
      vec![Alert {
        level: AlertLevel::Danger,
        message: "REST api call failed. Message: Bad GraphQL query".to_string(),
      }]
    );

    // near refresh: a full refresh is due after one update interval
    let clocks = dispatcher.cache().clocks("0-github").unwrap();
    assert_eq!(
      clocks.refresh_time,
      clock.now() - chrono::Duration::seconds(3600 - 30)
    );
    api.fail.store(false, Ordering::SeqCst);
    clock.advance(30);
    dispatcher.dispatch(View::Statuses).await;
    assert!(api.scopes.lock().unwrap().last().unwrap().is_full());
  }

  #[tokio::test]
  async fn test_failed_work_items_raise_alerts() {
    let (_clock, api, dispatcher) = setup(CONFIG);
    api.fail.store(true, Ordering::SeqCst);
    let outcome = dispatcher.dispatch(View::Created).await;
    assert!(outcome.models.is_empty());
    // two work item failures plus the statuses fetch of the first provider
    assert_eq!(outcome.alerts.len(), 3);
    assert!(outcome
      .alerts
      .iter()
      .all(|a| a.level == AlertLevel::Danger && a.message.starts_with("REST api call failed")));
  }

  #[tokio::test]
  async fn test_labels_fetched_once_until_hard_reset() {
    let (_clock, api, dispatcher) = setup(CONFIG);
    dispatcher.dispatch(View::Assigned).await;
    dispatcher.dispatch(View::Involved).await;
    assert_eq!(api.label_calls.load(Ordering::SeqCst), 2);

    dispatcher.reset(false);
    dispatcher.dispatch(View::Assigned).await;
    assert_eq!(api.label_calls.load(Ordering::SeqCst), 2);

    dispatcher.reset(true);
    dispatcher.dispatch(View::Assigned).await;
    assert_eq!(api.label_calls.load(Ordering::SeqCst), 4);
  }

  #[tokio::test]
  async fn test_missing_api_is_an_alert() {
    let config = Arc::new(
      Config::from_yaml_str("providers:\n  - provider: GitLab\n    user: u\n    url: https://gitlab.com\n")
        .unwrap(),
    );
    let cache = CacheService::new(
      Arc::new(ManualClock::default()),
      CacheIntervals::default(),
      config.provider_ids(),
    );
    let dispatcher = Dispatcher::new(config, cache);
    let outcome = dispatcher.dispatch(View::Assigned).await;
    assert!(outcome
      .alerts
      .iter()
      .any(|a| a.message.contains("No api available for provider GitLab")));
  }
}
