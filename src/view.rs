use clap::ValueEnum;
use std::fmt;

/// Dashboard views. All but `Statuses` are work item views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum View {
  Assigned,
  Created,
  Involved,
  Unassigned,
  Dependabot,
  FollowUp,
  Statuses,
}

impl View {
  pub fn as_str(&self) -> &'static str {
    match self {
      View::Assigned => "assigned",
      View::Created => "created",
      View::Involved => "involved",
      View::Unassigned => "unassigned",
      View::Dependabot => "dependabot",
      View::FollowUp => "follow-up",
      View::Statuses => "statuses",
    }
  }

  pub fn is_statuses(&self) -> bool {
    matches!(self, View::Statuses)
  }
}

impl fmt::Display for View {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
