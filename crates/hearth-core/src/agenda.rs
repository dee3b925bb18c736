use crate::date::DateKey;
use crate::project::{
  self,
  DueMilestone,
  Project
};
use crate::task::Task;

/// Tasks occurring on `date`, in input
/// order.
#[must_use]
pub fn for_date(
  tasks: &[Task],
  date: DateKey
) -> Vec<&Task> {
  tasks
    .iter()
    .filter(|task| task.occurs_on(date))
    .collect()
}

/// Tasks occurring on `date` that are
/// still open.
#[must_use]
pub fn open_for_date(
  tasks: &[Task],
  date: DateKey
) -> Vec<&Task> {
  tasks
    .iter()
    .filter(|task| {
      !task.completed
        && task.occurs_on(date)
    })
    .collect()
}

/// Project milestones due on `date`.
#[must_use]
pub fn milestones_for_date(
  projects: &[Project],
  date: DateKey
) -> Vec<DueMilestone<'_>> {
  project::due_on(projects, date)
}

/// Milestones due on `date` that are
/// not yet done.
#[must_use]
pub fn open_milestones_for_date(
  projects: &[Project],
  date: DateKey
) -> Vec<DueMilestone<'_>> {
  project::due_on(projects, date)
    .into_iter()
    .filter(|due| {
      !due.milestone.completed
    })
    .collect()
}
