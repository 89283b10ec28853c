//! Provider-independent model of the work items.
//!
//! Adapters transform provider API results into a [`Model`]: a [`Header`] with
//! metadata about the provider and view, plus an ordered list of [`Item`]s.
//! Items must be added through [`Model::add_item`] so that each one gets a
//! stable identity and is reachable through the identity index.

mod identity;
mod types;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

pub use identity::{item_identity, sanitize};
pub use types::{BuildStatus, Header, Item, ItemKind, Label, NewItem, Notification};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
  #[error("cannot add label {0}: the model has no items")]
  NoItems(String),
  #[error("no item with identity {0}")]
  UnknownIdentity(String),
}

/// New values for the attributes that define an item identity.
#[derive(Debug, Clone)]
pub struct IdentityChange {
  pub kind: ItemKind,
  pub iid: String,
  pub branch_name: Option<String>,
}

/// Result of an identity change, consumed by side caches keyed by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
  pub old: String,
  pub new: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ModelData")]
pub struct Model {
  pub header: Header,
  items: Vec<Item>,
  /// identity -> position in `items`
  #[serde(skip)]
  index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct ModelData {
  #[serde(default)]
  header: Header,
  #[serde(default)]
  items: Vec<Item>,
}

impl From<ModelData> for Model {
  fn from(data: ModelData) -> Self {
    let mut items = data.items;
    for item in &mut items {
      item.identity = item_identity(
        &item.repo_name,
        item.kind,
        &item.iid,
        item.branch_name.as_deref(),
      );
    }
    let mut model = Model {
      header: data.header,
      items,
      index: HashMap::new(),
    };
    model.reindex();
    model
  }
}

impl PartialEq for Model {
  fn eq(&self, other: &Self) -> bool {
    self.header == other.header && self.items == other.items
  }
}

impl Eq for Model {}

impl Model {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reset the header for the given provider. Intended for chained construction:
  /// `Model::new().set_header(...)`.
  pub fn set_header(
    mut self,
    provider: impl Into<String>,
    uid: impl Into<String>,
    user: impl Into<String>,
    url: impl Into<String>,
  ) -> Self {
    self.header = Header {
      provider: provider.into(),
      uid: uid.into(),
      user: user.into(),
      url: url.into(),
      ..Header::default()
    };
    self
  }

  pub fn items(&self) -> &[Item] {
    &self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Add an item and index it, returning its identity.
  ///
  /// A repeated identity never panics, the index points to the last item.
  /// Work item views list the same item once per matching query until
  /// [`Model::dedup_with`] merges them, so a repeat of the same repository is
  /// only logged at debug level. Distinct repositories that sanitize to the
  /// same name (`org/repo` and `org-repo`) are logged as a warning and listed
  /// by [`Model::duplicate_identities`].
  pub fn add_item(&mut self, value: NewItem) -> String {
    let identity = item_identity(
      &value.repo_name,
      value.kind,
      &value.iid,
      value.branch_name.as_deref(),
    );
    if let Some(&pos) = self.index.get(&identity) {
      if self.items[pos].repo_name == value.repo_name {
        debug!(provider = %self.header.uid, identity = %identity, "Item listed again");
      } else {
        warn!(
          provider = %self.header.uid,
          identity = %identity,
          repo = %value.repo_name,
          other = %self.items[pos].repo_name,
          "Identity collision between repositories, last one wins"
        );
      }
    }
    self.items.push(Item::from_new(identity.clone(), value));
    self.index.insert(identity.clone(), self.items.len() - 1);
    identity
  }

  /// Append a label to the most recently added item.
  pub fn add_last_item_label(
    &mut self,
    name: impl Into<String>,
    color: impl Into<String>,
  ) -> Result<(), ModelError> {
    let name = name.into();
    let item = self
      .items
      .last_mut()
      .ok_or_else(|| ModelError::NoItems(name.clone()))?;
    item.labels.push(Label {
      name,
      color: color.into(),
    });
    Ok(())
  }

  pub fn get_item_by_identity(&self, identity: &str) -> Option<&Item> {
    self.index.get(identity).and_then(|&pos| self.items.get(pos))
  }

  /// Mutable access to every item. Identity attributes stay read-only.
  pub fn items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
    self.items.iter_mut()
  }

  /// Mutable access to an item. Identity attributes stay read-only.
  pub fn item_mut(&mut self, identity: &str) -> Option<&mut Item> {
    let pos = *self.index.get(identity)?;
    self.items.get_mut(pos)
  }

  /// Change the identity-defining attributes of an item and re-index it.
  ///
  /// E.g. a branch that is discovered to have an open merge request becomes
  /// a `pr` and gets the merge request iid.
  pub fn update_item_identity(
    &mut self,
    identity: &str,
    change: IdentityChange,
  ) -> Result<Rename, ModelError> {
    let pos = self
      .index
      .remove(identity)
      .ok_or_else(|| ModelError::UnknownIdentity(identity.to_string()))?;
    let item = &mut self.items[pos];
    item.kind = change.kind;
    item.iid = change.iid;
    item.branch_name = change.branch_name;
    item.identity = item_identity(
      &item.repo_name,
      item.kind,
      &item.iid,
      item.branch_name.as_deref(),
    );
    let new = item.identity.clone();
    self.index.insert(new.clone(), pos);
    Ok(Rename {
      old: identity.to_string(),
      new,
    })
  }

  /// Merge branches and pull requests from a partial model, repo by repo.
  ///
  /// Every repository named in `other.header.repo_names` has its branches and
  /// pull requests replaced by those in `other`. Issues and repositories not
  /// named in the other header are kept.
  pub fn merge_branches_and_prs(&mut self, other: Model) {
    let repos = &other.header.repo_names;
    self
      .items
      .retain(|item| !(item.kind.is_branch_or_pr() && repos.contains(&item.repo_name)));
    self.items.extend(
      other
        .items
        .into_iter()
        .filter(|item| item.kind.is_branch_or_pr()),
    );
    self.reindex();
  }

  /// Keep only the items matching the predicate.
  pub fn retain(&mut self, f: impl FnMut(&Item) -> bool) {
    self.items.retain(f);
    self.reindex();
  }

  /// Stable sort of the items.
  pub fn sort_by(&mut self, compare: impl FnMut(&Item, &Item) -> Ordering) {
    self.items.sort_by(compare);
    self.reindex();
  }

  /// Collapse the items sharing an identity into the first of them. Each later
  /// duplicate is handed to `merge` together with the kept item.
  pub fn dedup_with(&mut self, mut merge: impl FnMut(Item, &mut Item)) {
    let mut kept: Vec<Item> = Vec::with_capacity(self.items.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for item in std::mem::take(&mut self.items) {
      match positions.get(&item.identity) {
        Some(&pos) => merge(item, &mut kept[pos]),
        None => {
          positions.insert(item.identity.clone(), kept.len());
          kept.push(item);
        }
      }
    }
    self.items = kept;
    self.index = positions;
  }

  /// Rebuild the identity index from the items.
  pub fn reindex(&mut self) {
    self.index = self
      .items
      .iter()
      .enumerate()
      .map(|(pos, item)| (item.identity.clone(), pos))
      .collect();
  }

  /// Identities shared by more than one item.
  pub fn duplicate_identities(&self) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in &self.items {
      *counts.entry(item.identity.as_str()).or_default() += 1;
    }
    let mut duplicates: Vec<String> = counts
      .into_iter()
      .filter(|(_, count)| *count > 1)
      .map(|(identity, _)| identity.to_string())
      .collect();
    duplicates.sort();
    duplicates
  }
}
