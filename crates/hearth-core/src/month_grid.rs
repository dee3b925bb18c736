use crate::date::{
  CalendarMonth,
  DateKey
};
use crate::project::{
  self,
  DueMilestone,
  Project
};
use crate::task::Task;

/// One slot of a month view.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
  /// Padding before the 1st so it lands
  /// under its weekday column.
  Blank,
  Day {
    date:        DateKey,
    occurrences: Vec<&'a Task>,
    milestones:  Vec<DueMilestone<'a>>
  }
}

impl<'a> Cell<'a> {
  #[must_use]
  pub fn is_blank(&self) -> bool {
    matches!(self, Cell::Blank)
  }

  #[must_use]
  pub fn date(&self) -> Option<DateKey> {
    match self {
      | Cell::Blank => None,
      | Cell::Day { date, .. } => {
        Some(*date)
      }
    }
  }

  #[must_use]
  pub fn occurrences(&self) -> &[&'a Task] {
    match self {
      | Cell::Blank => &[],
      | Cell::Day {
        occurrences,
        ..
      } => occurrences
    }
  }

  #[must_use]
  pub fn milestones(
    &self
  ) -> &[DueMilestone<'a>] {
    match self {
      | Cell::Blank => &[],
      | Cell::Day {
        milestones,
        ..
      } => milestones
    }
  }

  /// Anything at all happens that day.
  #[must_use]
  pub fn is_busy(&self) -> bool {
    !self.occurrences().is_empty()
      || !self.milestones().is_empty()
  }
}

/// Lays out `month` as leading blanks
/// (one per weekday before the 1st,
/// Sunday first) followed by one cell per
/// day carrying the tasks that occur on
/// it.
#[must_use]
pub fn build(
  month: CalendarMonth,
  tasks: &[Task]
) -> Vec<Cell<'_>> {
  build_with_projects(month, tasks, &[])
}

/// `build`, with each day also carrying
/// the project milestones due on it.
#[must_use]
pub fn build_with_projects<'a>(
  month: CalendarMonth,
  tasks: &'a [Task],
  projects: &'a [Project]
) -> Vec<Cell<'a>> {
  let leading =
    month.start_weekday() as usize;
  let days = month.days();

  let mut cells = Vec::with_capacity(
    leading + days as usize
  );
  cells.extend(
    std::iter::repeat_with(|| {
      Cell::Blank
    })
    .take(leading)
  );

  let first = month.first_day();
  for offset in 0..days {
    let date =
      first.add_days(i64::from(offset));
    let occurrences = tasks
      .iter()
      .filter(|task| task.occurs_on(date))
      .collect();
    cells.push(Cell::Day {
      date,
      occurrences,
      milestones: project::due_on(
        projects, date
      )
    });
  }

  tracing::trace!(
    month = %month,
    leading,
    days,
    tasks = tasks.len(),
    projects = projects.len(),
    "built month grid"
  );
  cells
}

/// Splits a grid into calendar rows of
/// seven; the last row may be short.
#[must_use]
pub fn weeks<'c, 'a>(
  cells: &'c [Cell<'a>]
) -> Vec<&'c [Cell<'a>]> {
  cells.chunks(7).collect()
}
