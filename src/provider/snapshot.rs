//! Provider api backed by JSON snapshots on disk.
//!
//! Layout: `<root>/<provider uid>/` containing `<view>.json` for each work
//! item view, `statuses.json`, and optionally `notifications.json` and
//! `labels.json`.

use async_trait::async_trait;
use chrono::DateTime;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ProviderApi;
use crate::cache::{LabelMap, UpdateScope};
use crate::config::ProviderConfig;
use crate::model::{Header, Model, Notification};
use crate::view::View;

pub struct SnapshotApi {
  root: PathBuf,
}

impl SnapshotApi {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn path(&self, provider: &ProviderConfig, name: &str) -> PathBuf {
    self.root.join(&provider.uid).join(format!("{}.json", name))
  }

  async fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = tokio::fs::read_to_string(path)
      .await
      .map_err(|e| eyre!("Failed to read snapshot {}: {}", path.display(), e))?;
    serde_json::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse snapshot {}: {}", path.display(), e))
  }

  /// Read an optional file, `None` when it does not exist.
  async fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
      debug!(path = %path.display(), "No snapshot file");
      return Ok(None);
    }
    Self::read(path).await.map(Some)
  }

  async fn read_model(&self, provider: &ProviderConfig, name: &str) -> Result<Model> {
    let mut model: Model = Self::read(&self.path(provider, name)).await?;
    let Header {
      repo_names,
      message,
      ..
    } = std::mem::take(&mut model.header);
    let mut model = model.set_header(
      provider.provider.as_str(),
      provider.uid.as_str(),
      provider.user.as_str(),
      provider.url.as_str(),
    );
    model.header.repo_names = repo_names;
    model.header.message = message;
    model.header.target = name.to_string();
    Ok(model)
  }
}

/// Keep only the repositories with an item updated at or after `since`.
/// Dates that cannot be parsed count as updated.
fn changed_since(model: &mut Model, since: DateTime<chrono::Utc>) {
  let changed: BTreeSet<String> = model
    .items()
    .iter()
    .filter(|item| {
      DateTime::parse_from_rfc3339(&item.updated_at)
        .map(|updated| updated >= since)
        .unwrap_or(true)
    })
    .map(|item| item.repo_name().to_string())
    .collect();
  model.retain(|item| changed.contains(item.repo_name()));
  model.header.repo_names.retain(|repo| changed.contains(repo));
}

#[async_trait]
impl ProviderApi for SnapshotApi {
  async fn work_items(&self, provider: &ProviderConfig, view: View) -> Result<Model> {
    self.read_model(provider, view.as_str()).await
  }

  async fn statuses(&self, provider: &ProviderConfig, scope: UpdateScope) -> Result<Model> {
    let mut model = self.read_model(provider, View::Statuses.as_str()).await?;
    if let UpdateScope::Since(since) = scope {
      changed_since(&mut model, since);
      debug!(
        provider = %provider.uid,
        since = %scope.watermark(),
        repos = model.header.repo_names.len(),
        "Partial statuses snapshot"
      );
    }
    Ok(model)
  }

  async fn notifications(&self, provider: &ProviderConfig) -> Result<Option<Vec<Notification>>> {
    Self::read_optional(&self.path(provider, "notifications")).await
  }

  async fn labels(&self, provider: &ProviderConfig) -> Result<Option<LabelMap>> {
    Self::read_optional(&self.path(provider, "labels")).await
  }
}
