//! Processing of the work item models before they are shown: duplicates
//! merged, items sorted by date and filtered by age, author or label.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::cmp::Ordering;
use tracing::debug;

use crate::model::{Item, ItemKind, Model};
use crate::view::View;

const FOLLOW_UP: &str = "follow_up";
const DEPENDABOT: &str = "dependabot";

/// Order of the work items. The direction refers to their age: `Descending`
/// shows the oldest items first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Sorting {
  #[default]
  #[serde(rename = "ascending,created_at")]
  AscendingCreatedAt,
  #[serde(rename = "descending,created_at")]
  DescendingCreatedAt,
  #[serde(rename = "ascending,updated_at")]
  AscendingUpdatedAt,
  #[serde(rename = "descending,updated_at")]
  DescendingUpdatedAt,
}

impl Sorting {
  fn date(self, item: &Item) -> &str {
    match self {
      Sorting::AscendingCreatedAt | Sorting::DescendingCreatedAt => &item.created_at,
      Sorting::AscendingUpdatedAt | Sorting::DescendingUpdatedAt => &item.updated_at,
    }
  }

  fn compare(self, a: &Item, b: &Item) -> Ordering {
    let (a_date, b_date) = (self.date(a), self.date(b));
    match self {
      Sorting::DescendingCreatedAt | Sorting::DescendingUpdatedAt => a_date.cmp(b_date),
      Sorting::AscendingCreatedAt | Sorting::AscendingUpdatedAt => b_date.cmp(a_date),
    }
  }
}

/// Criteria of [`filter_items`].
#[derive(Debug, Clone, Copy)]
pub struct ItemFilter<'a> {
  pub view: View,
  pub today: DateTime<Utc>,
  /// Days without updates after which an item is hidden, 0 keeps all
  pub max_age: u32,
  /// Items carrying this label are hidden, empty keeps all
  pub label: &'a str,
}

impl ItemFilter<'_> {
  fn hides(&self, item: &Item) -> bool {
    if self.max_age > 0 {
      if let Some(days) = days_since(&item.updated_at, self.today) {
        if days > i64::from(self.max_age) {
          return true;
        }
      }
    }
    // already listed in the dependabot view
    if self.view == View::Unassigned
      && item.kind() == ItemKind::Pr
      && item.author.to_lowercase().starts_with(DEPENDABOT)
    {
      return true;
    }
    !self.label.is_empty() && item.labels.iter().any(|label| label.name == self.label)
  }
}

/// Whole calendar days from `date` to `today`. None if `date` is not a valid
/// timestamp.
fn days_since(date: &str, today: DateTime<Utc>) -> Option<i64> {
  let date: NaiveDate = DateTime::parse_from_rfc3339(date)
    .ok()?
    .with_timezone(&Utc)
    .date_naive();
  Some((today.date_naive() - date).num_days())
}

/// Merge the items listed more than once into their first occurrence.
pub fn merge_items(model: &mut Model) {
  model.dedup_with(merge_item);
}

/// Merge `source` into `target`, an item with the same identity.
///
/// The actions of both are combined. When a follow-up is involved, the
/// attributes of the regular item are kept and the latest update wins.
fn merge_item(source: Item, target: &mut Item) {
  let source_follow_up = is_follow_up(&source);
  let target_follow_up = is_follow_up(target);
  if source_follow_up || target_follow_up {
    if source.updated_at > target.updated_at {
      target.updated_at = source.updated_at.clone();
    }
    if target_follow_up {
      target.created_at = source.created_at;
      target.title = source.title;
      target.author = source.author;
      target.assignees = source.assignees;
      target.labels = source.labels;
    }
  }
  for (action, enabled) in source.actions {
    let current = target.actions.entry(action).or_insert(false);
    *current |= enabled;
  }
}

fn is_follow_up(item: &Item) -> bool {
  item.actions.get(FOLLOW_UP).copied().unwrap_or(false)
}

pub fn sort_items(model: &mut Model, sorting: Sorting) {
  model.sort_by(|a, b| sorting.compare(a, b));
}

pub fn filter_items(model: &mut Model, filter: &ItemFilter<'_>) {
  let before = model.len();
  model.retain(|item| !filter.hides(item));
  if model.len() < before {
    debug!(
      provider = %model.header.uid,
      hidden = before - model.len(),
      "Filtered work items"
    );
  }
}
