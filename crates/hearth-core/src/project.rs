use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date::DateKey;
use crate::recurrence::RecurrenceRule;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub uuid: Uuid,

    pub title: String,

    #[serde(default, rename = "due_date")]
    pub due: Option<DateKey>,

    #[serde(default)]
    pub completed: bool,
}

impl Milestone {
    pub fn new(title: String, due: Option<DateKey>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title,
            due,
            completed: false,
        }
    }

    /// A due date is a one-off occurrence; undated milestones never occur.
    pub fn due_rule(&self) -> Option<RecurrenceRule> {
        self.due.map(RecurrenceRule::once)
    }

    pub fn is_due_on(&self, date: DateKey) -> bool {
        self.due_rule().is_some_and(|rule| rule.occurs_on(date))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub uuid: Uuid,

    #[serde(default)]
    pub id: Option<u64>,

    pub name: String,

    #[serde(default)]
    pub milestones: Vec<Milestone>,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

impl Project {
    pub fn new(name: String, now: DateTime<Utc>, id: u64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            id: Some(id),
            name,
            milestones: Vec::new(),
            created: now,
            modified: now,
        }
    }

    /// Appends a milestone and returns its 1-based number.
    pub fn add_milestone(&mut self, milestone: Milestone, now: DateTime<Utc>) -> usize {
        self.milestones.push(milestone);
        self.modified = now;
        self.milestones.len()
    }

    pub fn milestone_mut(&mut self, number: usize) -> Option<&mut Milestone> {
        number.checked_sub(1).and_then(|idx| self.milestones.get_mut(idx))
    }

    /// `(completed, total)` milestones.
    pub fn progress(&self) -> (usize, usize) {
        let done = self.milestones.iter().filter(|m| m.completed).count();
        (done, self.milestones.len())
    }

    pub fn is_complete(&self) -> bool {
        !self.milestones.is_empty() && self.milestones.iter().all(|m| m.completed)
    }
}

/// A milestone together with the project it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueMilestone<'a> {
    pub project: &'a Project,
    pub number: usize,
    pub milestone: &'a Milestone,
}

impl DueMilestone<'_> {
    pub fn reference(&self) -> String {
        let project = self
            .project
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| self.project.uuid.to_string());
        format!("{project}.{}", self.number)
    }
}

/// Milestones due on `date`, in project then milestone order.
pub fn due_on(projects: &[Project], date: DateKey) -> Vec<DueMilestone<'_>> {
    projects
        .iter()
        .flat_map(move |project| {
            project
                .milestones
                .iter()
                .enumerate()
                .filter(move |(_, milestone)| milestone.is_due_on(date))
                .map(move |(idx, milestone)| DueMilestone {
                    project,
                    number: idx + 1,
                    milestone,
                })
        })
        .collect()
}

/// `<project id>.<milestone number>`, e.g. `2.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneRef {
    pub project: u64,
    pub number: usize,
}

impl FromStr for MilestoneRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || anyhow!("expected PROJECT.MILESTONE (e.g. 2.1), got: {s}");
        let (project, number) = s.split_once('.').ok_or_else(bad)?;
        let project = project.parse::<u64>().map_err(|_| bad())?;
        let number = number.parse::<usize>().map_err(|_| bad())?;
        if number == 0 {
            return Err(bad());
        }
        Ok(Self { project, number })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Milestone, MilestoneRef, Project, due_on};
    use crate::date::DateKey;

    fn date(raw: &str) -> DateKey {
        DateKey::parse(raw).expect("valid test date")
    }

    fn kitchen() -> Project {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).single().expect("valid now");
        let mut project = Project::new("kitchen remodel".to_string(), now, 3);
        project.add_milestone(Milestone::new("order cabinets".to_string(), Some(date("2024-02-01"))), now);
        project.add_milestone(Milestone::new("pick tiles".to_string(), None), now);
        project.add_milestone(Milestone::new("install sink".to_string(), Some(date("2024-02-01"))), now);
        project
    }

    #[test]
    fn due_date_occurs_once() {
        let milestone = Milestone::new("paint hall".to_string(), Some(date("2024-03-10")));
        assert!(milestone.is_due_on(date("2024-03-10")));
        assert!(!milestone.is_due_on(date("2024-03-09")));
        assert!(!milestone.is_due_on(date("2024-03-17")));
        assert!(!Milestone::new("someday".to_string(), None).is_due_on(date("2024-03-10")));
    }

    #[test]
    fn due_on_reports_project_and_number() {
        let projects = vec![kitchen()];
        let due = due_on(&projects, date("2024-02-01"));
        let refs: Vec<String> = due.iter().map(|d| d.reference()).collect();
        assert_eq!(refs, vec!["3.1", "3.3"]);
        assert!(due_on(&projects, date("2024-02-02")).is_empty());
    }

    #[test]
    fn progress_counts_completed_milestones() {
        let mut project = kitchen();
        assert_eq!(project.progress(), (0, 3));
        assert!(project.milestone_mut(0).is_none());
        assert!(project.milestone_mut(4).is_none());

        for number in 1..=3 {
            project.milestone_mut(number).expect("milestone").completed = true;
        }
        assert_eq!(project.progress(), (3, 3));
        assert!(project.is_complete());
    }

    #[test]
    fn milestone_refs_parse_strictly() {
        assert_eq!(
            "2.1".parse::<MilestoneRef>().expect("ref"),
            MilestoneRef { project: 2, number: 1 }
        );
        for bad in ["2", "2.0", "a.1", "2.x", ""] {
            assert!(bad.parse::<MilestoneRef>().is_err(), "{bad}");
        }
    }
}
