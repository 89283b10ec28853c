//! Side caches keyed by item identity: build statuses, notifications, labels.

use std::collections::HashMap;

use crate::model::{item_identity, BuildStatus, Model, Notification};

/// Label colors indexed by `repo-label`
pub type LabelMap = HashMap<String, String>;

/// Notification reasons counted as mentions
pub const MENTION_REASONS: &[&str] = &["mention", "mentioned", "directly_addressed"];

/// Key of a status for the view layer: `provider_identity`.
pub fn status_key(provider: &str, identity: &str) -> String {
  format!("{}_{}", provider, identity)
}

/// Key of a label color: `repo-label`.
pub fn label_key(repo: &str, label: &str) -> String {
  format!("{}-{}", repo, label)
}

/// Build status of each item, for direct access without walking the model.
#[derive(Debug, Default)]
pub struct StatusIndex {
  by_provider: HashMap<String, HashMap<String, BuildStatus>>,
}

impl StatusIndex {
  /// Replace the statuses of a provider with those of its current model.
  pub fn rebuild(&mut self, provider: &str, model: &Model) {
    let statuses = model
      .items()
      .iter()
      .filter_map(|item| item.status.map(|status| (item.identity().to_string(), status)))
      .collect();
    self.by_provider.insert(provider.to_string(), statuses);
  }

  pub fn get(&self, provider: &str, identity: &str) -> Option<BuildStatus> {
    self.by_provider.get(provider)?.get(identity).copied()
  }

  /// Move a status to the new identity of an item. Returns false when there
  /// was nothing cached under the old identity.
  pub fn rename(&mut self, provider: &str, old: &str, new: &str) -> bool {
    let Some(statuses) = self.by_provider.get_mut(provider) else {
      return false;
    };
    match statuses.remove(old) {
      Some(status) => {
        statuses.insert(new.to_string(), status);
        true
      }
      None => false,
    }
  }

  /// All statuses keyed by [`status_key`].
  pub fn flatten(&self) -> HashMap<String, BuildStatus> {
    self
      .by_provider
      .iter()
      .flat_map(|(provider, statuses)| {
        statuses
          .iter()
          .map(move |(identity, status)| (status_key(provider, identity), *status))
      })
      .collect()
  }

  pub fn clear(&mut self) {
    self.by_provider.clear();
  }
}

/// Notifications obtained asynchronously, stored to be displayed with the
/// work items. Each provider maps item identities to a reason.
#[derive(Debug, Default)]
pub struct NotificationCache {
  by_provider: HashMap<String, HashMap<String, String>>,
}

impl NotificationCache {
  /// Replace the notifications of a provider.
  ///
  /// The list comes newest first. When several notifications refer to the
  /// same item, the newest one is kept.
  pub fn save(&mut self, provider: &str, notifications: &[Notification]) {
    let mut reasons = HashMap::new();
    for notification in notifications.iter().rev() {
      let identity = item_identity(
        &notification.repo_name,
        notification.kind,
        &notification.iid,
        None,
      );
      reasons.insert(identity, notification.reason.clone());
    }
    self.by_provider.insert(provider.to_string(), reasons);
  }

  pub fn reason(&self, provider: &str, identity: &str) -> Option<&str> {
    self
      .by_provider
      .get(provider)?
      .get(identity)
      .map(String::as_str)
  }

  pub fn mention_count(&self, provider: &str) -> usize {
    self.by_provider.get(provider).map_or(0, |reasons| {
      reasons
        .values()
        .filter(|reason| MENTION_REASONS.contains(&reason.as_str()))
        .count()
    })
  }

  /// Mentions across every provider with cached notifications.
  pub fn total_mentions(&self) -> usize {
    self
      .by_provider
      .keys()
      .map(|provider| self.mention_count(provider))
      .sum()
  }

  pub fn clear(&mut self) {
    self.by_provider.clear();
  }
}

/// Label colors, fetched at most once per provider (they rarely change and
/// GitLab requires a separate query). An empty map means "already attempted".
#[derive(Debug, Default)]
pub struct LabelCache {
  by_provider: HashMap<String, LabelMap>,
}

impl LabelCache {
  /// Returns true if the caller must fetch the labels. The attempt is
  /// recorded, so later calls return false even if the fetch yields nothing.
  pub fn claim_fetch(&mut self, provider: &str) -> bool {
    if self.by_provider.contains_key(provider) {
      return false;
    }
    self.by_provider.insert(provider.to_string(), LabelMap::new());
    true
  }

  pub fn set(&mut self, provider: &str, labels: LabelMap) {
    self.by_provider.insert(provider.to_string(), labels);
  }

  pub fn get(&self, provider: &str) -> Option<&LabelMap> {
    self.by_provider.get(provider)
  }

  /// Color of a label of a repo, once the labels of the provider are fetched.
  pub fn color(&self, provider: &str, repo: &str, label: &str) -> Option<&str> {
    self
      .by_provider
      .get(provider)?
      .get(&label_key(repo, label))
      .map(String::as_str)
  }

  pub fn clear(&mut self) {
    self.by_provider.clear();
  }
}
