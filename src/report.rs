//! Plain text rendering of a dispatch for the command line.

use crate::cache::{CacheSource, CacheResult};
use crate::controller::{AlertLevel, DispatchOutcome};
use crate::model::{Item, Model};

fn source_tag(result: &CacheResult<Model>) -> &'static str {
  match result.source {
    CacheSource::Network => "",
    CacheSource::CacheFresh => " (cached)",
    CacheSource::CacheStale => " (stale)",
    CacheSource::Placeholder => "",
  }
}

fn item_line(item: &Item) -> String {
  let mut parts = vec![format!("  {}", item.kind()), item.repo_name().to_string()];
  if !item.iid().is_empty() {
    parts.push(item.iid_str());
  }
  if let Some(branch) = item.branch_name() {
    parts.push(format!("[{}]", branch));
  }
  if !item.title.is_empty() {
    parts.push(item.title.clone());
  }
  if let Some(status) = item.status {
    parts.push(format!("({})", status));
  }
  if !item.labels.is_empty() {
    let names: Vec<&str> = item.labels.iter().map(|l| l.name.as_str()).collect();
    parts.push(format!("{{{}}}", names.join(", ")));
  }
  parts.join(" ")
}

/// One line per alert, model header, item, provider statuses and mention count.
pub fn render_outcome(outcome: &DispatchOutcome) -> String {
  let mut lines = Vec::new();
  for alert in &outcome.alerts {
    let level = match alert.level {
      AlertLevel::Warning => "WARNING",
      AlertLevel::Danger => "ERROR",
    };
    lines.push(format!("{}: {}", level, alert.message));
  }

  for result in &outcome.models {
    let header = &result.data.header;
    lines.push(format!(
      "== {} {} ({}) {}{}",
      header.uid,
      header.user,
      header.provider,
      outcome.view,
      source_tag(result)
    ));
    if let Some(message) = &header.message {
      lines.push(format!("  {}", message));
    }
    lines.extend(result.data.items().iter().map(item_line));
  }

  for update in &outcome.statuses {
    let statuses: Vec<String> = update
      .model
      .items()
      .iter()
      .filter_map(|item| item.status.map(|s| format!("{}={}", item.identity(), s)))
      .collect();
    if !statuses.is_empty() {
      lines.push(format!("statuses {}: {}", update.provider, statuses.join(" ")));
    }
  }

  for count in &outcome.mentions {
    if count.mentions > 0 {
      lines.push(format!(
        "mentions {}: {} of {}",
        count.provider, count.mentions, count.total
      ));
    }
  }

  let mut out = lines.join("\n");
  if !out.is_empty() {
    out.push('\n');
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::controller::{Alert, MentionCount, StatusUpdate};
  use crate::model::{BuildStatus, ItemKind, NewItem};
  use crate::view::View;

  #[test]
  fn test_render_outcome() {
    let mut model = Model::new().set_header("GitLab", "1-gitlab", "usr2", "https://gitlab.com");
    model.add_item(NewItem::new("group/proj", ItemKind::Pr, "12").branch("fix").title("Fix it"));
    model.add_last_item_label("bug", "#d73a4a").unwrap();

    let mut statuses = model.clone();
    statuses
      .item_mut("group-proj_pr_12")
      .unwrap()
      .status = Some(BuildStatus::Failure);

    let outcome = DispatchOutcome {
      view: View::Assigned,
      models: vec![CacheResult::stale(model, "timeout")],
      alerts: vec![Alert {
        level: AlertLevel::Danger,
        message: "REST api call failed. Message: timeout".to_string(),
      }],
      statuses: vec![StatusUpdate {
        provider: "1-gitlab".to_string(),
        model: statuses,
        labels: None,
      }],
      mentions: vec![MentionCount {
        provider: "1-gitlab".to_string(),
        mentions: 2,
        total: 3,
      }],
    };

    let text = render_outcome(&outcome);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
      lines,
      vec![
        "ERROR: REST api call failed. Message: timeout",
        "== 1-gitlab usr2 (GitLab) assigned (stale)",
        "  pr group/proj #12 [fix] Fix it {bug}",
        "statuses 1-gitlab: group-proj_pr_12=failure",
        "mentions 1-gitlab: 2 of 3",
      ]
    );
  }

  #[test]
  fn test_render_placeholder_and_branch() {
    let mut model = Model::new().set_header("GitHub", "0-github", "usr1", "");
    model.header.message = Some("Nothing to show".to_string());
    model.add_item(
      NewItem::new("org/repo", ItemKind::Branch, "")
        .branch("main")
        .status(BuildStatus::Success),
    );
    let outcome = DispatchOutcome {
      view: View::Statuses,
      models: vec![CacheResult::from_cache(model)],
      alerts: Vec::new(),
      statuses: Vec::new(),
      mentions: vec![MentionCount {
        provider: "0-github".to_string(),
        mentions: 0,
        total: 0,
      }],
    };

    assert_eq!(
      render_outcome(&outcome),
      "== 0-github usr1 (GitHub) statuses (cached)\n  Nothing to show\n  branch org/repo [main] (success)\n"
    );
  }

  #[test]
  fn test_render_empty_outcome() {
    let outcome = DispatchOutcome {
      view: View::Assigned,
      models: Vec::new(),
      alerts: Vec::new(),
      statuses: Vec::new(),
      mentions: Vec::new(),
    };
    assert_eq!(render_outcome(&outcome), "");
  }
}
