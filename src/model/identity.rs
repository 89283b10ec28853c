//! Stable identities for work items.
//!
//! An identity is `repo_kind_iid`, or `repo_kind_branch` when the item has no
//! iid (plain branches). The result is used as a lookup key by the side caches
//! and by the view layer, so only ASCII alphanumerics, `-` and `_` may appear.

use super::types::ItemKind;

/// Replace every run of characters outside `[a-zA-Z0-9]` by a single `-`.
pub fn sanitize(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  let mut in_run = false;
  for c in value.chars() {
    if c.is_ascii_alphanumeric() {
      out.push(c);
      in_run = false;
    } else if !in_run {
      out.push('-');
      in_run = true;
    }
  }
  out
}

/// Compute the identity of an item from the attributes that define it.
pub fn item_identity(repo: &str, kind: ItemKind, iid: &str, branch_name: Option<&str>) -> String {
  let suffix = if iid.is_empty() {
    sanitize(branch_name.unwrap_or_default())
  } else {
    iid.to_string()
  };
  format!("{}_{}_{}", sanitize(repo), kind.as_str(), suffix)
}
