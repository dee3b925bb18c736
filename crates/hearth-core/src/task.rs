use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date::DateKey;
use crate::recurrence::RecurrenceRule;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub uuid: Uuid,

    #[serde(default)]
    pub id: Option<u64>,

    pub content: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(flatten)]
    pub rule: RecurrenceRule,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

impl Task {
    pub fn new(content: String, rule: RecurrenceRule, now: DateTime<Utc>, id: u64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            id: Some(id),
            content,
            completed: false,
            rule,
            created: now,
            modified: now,
        }
    }

    pub fn occurs_on(&self, date: DateKey) -> bool {
        self.rule.occurs_on(date)
    }

    pub fn scheduled_for(&self) -> DateKey {
        self.rule.base_date
    }

    pub fn toggle_completed(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.modified = now;
    }
}
