use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
  Issue,
  Pr,
  Branch,
}

impl ItemKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ItemKind::Issue => "issue",
      ItemKind::Pr => "pr",
      ItemKind::Branch => "branch",
    }
  }

  /// Branches and pull requests form the statuses part of a model.
  pub fn is_branch_or_pr(&self) -> bool {
    matches!(self, ItemKind::Branch | ItemKind::Pr)
  }
}

impl fmt::Display for ItemKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Build status of a branch or pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
  Success,
  Failure,
  Pending,
  /// The head commit has no checks at all
  NotAvailable,
}

impl BuildStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      BuildStatus::Success => "success",
      BuildStatus::Failure => "failure",
      BuildStatus::Pending => "pending",
      BuildStatus::NotAvailable => "notavailable",
    }
  }

  /// Map a GitHub `statusCheckRollup.state` (None when the commit has no rollup).
  pub fn from_github_rollup(state: Option<&str>) -> Self {
    let Some(state) = state else {
      return BuildStatus::NotAvailable;
    };
    match state.to_uppercase().as_str() {
      "SUCCESS" => BuildStatus::Success,
      "FAILURE" | "ERROR" => BuildStatus::Failure,
      // EXPECTED, PENDING: there is a check that has not finished
      _ => BuildStatus::Pending,
    }
  }

  /// Map a GitLab pipeline status.
  pub fn from_gitlab_pipeline(status: &str) -> Self {
    match status.to_lowercase().as_str() {
      "success" => BuildStatus::Success,
      "failed" | "canceled" | "skipped" => BuildStatus::Failure,
      _ => BuildStatus::Pending,
    }
  }
}

impl fmt::Display for BuildStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
  pub name: String,
  pub color: String,
}

/// Attributes supplied by an adapter when adding an item to a model.
#[derive(Debug, Clone)]
pub struct NewItem {
  pub repo_name: String,
  pub kind: ItemKind,
  pub iid: String,
  pub branch_name: Option<String>,
  pub title: String,
  pub author: String,
  pub assignees: Vec<String>,
  pub created_at: String,
  pub updated_at: String,
  pub url: String,
  pub branch_url: String,
  pub repo_url: String,
  pub actions: BTreeMap<String, bool>,
  pub status: Option<BuildStatus>,
}

impl NewItem {
  /// Minimal attributes: everything else starts empty.
  pub fn new(repo_name: impl Into<String>, kind: ItemKind, iid: impl Into<String>) -> Self {
    Self {
      repo_name: repo_name.into(),
      kind,
      iid: iid.into(),
      branch_name: None,
      title: String::new(),
      author: String::new(),
      assignees: Vec::new(),
      created_at: String::new(),
      updated_at: String::new(),
      url: String::new(),
      branch_url: String::new(),
      repo_url: String::new(),
      actions: BTreeMap::new(),
      status: None,
    }
  }

  pub fn branch(mut self, branch_name: impl Into<String>) -> Self {
    self.branch_name = Some(branch_name.into());
    self
  }

  pub fn title(mut self, title: impl Into<String>) -> Self {
    self.title = title.into();
    self
  }

  pub fn status(mut self, status: BuildStatus) -> Self {
    self.status = Some(status);
    self
  }
}

/// A work item stored in a model (issue, pull request or branch).
///
/// The fields that define the identity are private: they can only change
/// through [`Model::update_item_identity`](super::Model::update_item_identity),
/// which keeps the model index in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  /// Recomputed from the other identity fields on deserialization
  #[serde(default)]
  pub(super) identity: String,
  pub(super) repo_name: String,
  pub(super) kind: ItemKind,
  #[serde(default)]
  pub(super) iid: String,
  #[serde(default)]
  pub(super) branch_name: Option<String>,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub author: String,
  #[serde(default)]
  pub assignees: Vec<String>,
  #[serde(default)]
  pub created_at: String,
  #[serde(default)]
  pub updated_at: String,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub branch_url: String,
  #[serde(default)]
  pub repo_url: String,
  #[serde(default)]
  pub labels: Vec<Label>,
  #[serde(default)]
  pub actions: BTreeMap<String, bool>,
  #[serde(default)]
  pub status: Option<BuildStatus>,
}

impl Item {
  pub(super) fn from_new(identity: String, value: NewItem) -> Self {
    Self {
      identity,
      repo_name: value.repo_name,
      kind: value.kind,
      iid: value.iid,
      branch_name: value.branch_name,
      title: value.title,
      author: value.author,
      assignees: value.assignees,
      created_at: value.created_at,
      updated_at: value.updated_at,
      url: value.url,
      branch_url: value.branch_url,
      repo_url: value.repo_url,
      labels: Vec::new(),
      actions: value.actions,
      status: value.status,
    }
  }

  pub fn identity(&self) -> &str {
    &self.identity
  }

  pub fn repo_name(&self) -> &str {
    &self.repo_name
  }

  pub fn kind(&self) -> ItemKind {
    self.kind
  }

  pub fn iid(&self) -> &str {
    &self.iid
  }

  pub fn branch_name(&self) -> Option<&str> {
    self.branch_name.as_deref()
  }

  /// Display form of the iid (`#12`), empty for branches
  pub fn iid_str(&self) -> String {
    if self.iid.is_empty() {
      String::new()
    } else {
      format!("#{}", self.iid)
    }
  }
}

/// Header of a model: metadata about the provider and the view it was built for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
  /// Provider type name (GitHub, GitLab)
  pub provider: String,
  /// Provider instance id (e.g. "0-github")
  pub uid: String,
  pub user: String,
  pub url: String,
  /// Repositories covered by this model; drives repo by repo merges
  pub repo_names: Vec<String>,
  /// View the model was built for
  pub target: String,
  pub message: Option<String>,
}

impl Header {
  /// Add a repository name if not already listed.
  pub fn add_repo_name(&mut self, name: impl Into<String>) {
    let name = name.into();
    if !self.repo_names.contains(&name) {
      self.repo_names.push(name);
    }
  }
}

/// A notification as delivered by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub repo_name: String,
  pub kind: ItemKind,
  pub iid: String,
  /// Free text reason (mention, review_requested, ...)
  pub reason: String,
}
