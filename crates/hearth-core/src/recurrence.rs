use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Deserializer,
  Serialize
};

use crate::date::DateKey;
use crate::matcher;

/// How a task repeats after its base
/// date.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecurrenceKind {
  #[default]
  None,
  Daily,
  Weekly,
  Monthly,
  Yearly
}

impl RecurrenceKind {
  pub const ALL: [RecurrenceKind; 5] = [
    RecurrenceKind::None,
    RecurrenceKind::Daily,
    RecurrenceKind::Weekly,
    RecurrenceKind::Monthly,
    RecurrenceKind::Yearly
  ];

  #[must_use]
  pub fn is_repeating(&self) -> bool {
    !matches!(self, RecurrenceKind::None)
  }

  #[must_use]
  pub fn label(&self) -> &'static str {
    match self {
      | RecurrenceKind::None => "none",
      | RecurrenceKind::Daily => "daily",
      | RecurrenceKind::Weekly => {
        "weekly"
      }
      | RecurrenceKind::Monthly => {
        "monthly"
      }
      | RecurrenceKind::Yearly => {
        "yearly"
      }
    }
  }
}

impl fmt::Display for RecurrenceKind {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for RecurrenceKind {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let lower =
      s.trim().to_ascii_lowercase();
    Self::ALL
      .into_iter()
      .find(|kind| kind.label() == lower)
      .ok_or_else(|| {
        anyhow!(
          "unknown recurrence {s:?}; \
           expected one of none, \
           daily, weekly, monthly, \
           yearly"
        )
      })
  }
}

/// Stored records may carry a null
/// recurrence; that is the same as no
/// recurrence at all.
fn kind_or_none<'de, D>(
  deserializer: D
) -> Result<RecurrenceKind, D::Error>
where
  D: Deserializer<'de>
{
  Ok(
    Option::<RecurrenceKind>::deserialize(
      deserializer
    )?
    .unwrap_or_default()
  )
}

/// The repetition attached to one task.
///
/// `end_date` is inclusive: a target on
/// the end date can still occur. Field
/// names on the wire follow the task
/// store's record shape.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct RecurrenceRule {
  #[serde(
    rename = "recurrence",
    default,
    deserialize_with = "kind_or_none"
  )]
  pub kind:      RecurrenceKind,
  #[serde(rename = "scheduled_for")]
  pub base_date: DateKey,
  #[serde(
    rename = "recurrence_end_date",
    default
  )]
  pub end_date:  Option<DateKey>
}

impl RecurrenceRule {
  #[must_use]
  pub fn new(
    kind: RecurrenceKind,
    base_date: DateKey,
    end_date: Option<DateKey>
  ) -> Self {
    Self {
      kind,
      base_date,
      end_date
    }
  }

  /// A rule that occurs on `date` only.
  #[must_use]
  pub fn once(date: DateKey) -> Self {
    Self::new(
      RecurrenceKind::None,
      date,
      None
    )
  }

  /// The start/end clipping shared by
  /// every kind.
  #[must_use]
  pub fn is_within_bounds(
    &self,
    target: DateKey
  ) -> bool {
    if target < self.base_date {
      return false;
    }
    match self.end_date {
      | Some(end) => target <= end,
      | None => true
    }
  }

  #[must_use]
  pub fn occurs_on(
    &self,
    target: DateKey
  ) -> bool {
    matcher::occurs_on(self, target)
  }
}
