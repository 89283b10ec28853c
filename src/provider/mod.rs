//! Provider api seam.
//!
//! Adapters for the git providers implement [`ProviderApi`] and return their
//! results as provider-independent models.

mod snapshot;

use async_trait::async_trait;
use color_eyre::Result;

use crate::cache::{LabelMap, UpdateScope};
use crate::config::ProviderConfig;
use crate::model::{Model, Notification};
use crate::view::View;

pub use snapshot::SnapshotApi;

#[async_trait]
pub trait ProviderApi: Send + Sync {
  /// Work items of a view (issues and pull requests).
  async fn work_items(&self, provider: &ProviderConfig, view: View) -> Result<Model>;

  /// Branches and pull requests with their build statuses. On a partial
  /// scope, only the repositories changed since the watermark are returned,
  /// listed in the model header.
  async fn statuses(&self, provider: &ProviderConfig, scope: UpdateScope) -> Result<Model>;

  /// Notifications, newest first. `None` when the fetch was skipped (e.g. the
  /// provider poll interval has not elapsed) and the cached ones still apply.
  async fn notifications(&self, provider: &ProviderConfig) -> Result<Option<Vec<Notification>>>;

  /// Label colors, for providers that do not embed them in the work items.
  async fn labels(&self, _provider: &ProviderConfig) -> Result<Option<LabelMap>> {
    Ok(None)
  }
}
