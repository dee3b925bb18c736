use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{
  Datelike,
  Days,
  Local,
  Months,
  NaiveDate
};
use regex::Regex;
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};
use thiserror::Error;

#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
pub enum InvalidDateError {
  #[error(
    "expected a YYYY-MM-DD date, got \
     {input:?}"
  )]
  Malformed { input: String },
  #[error(
    "{input:?} is not a real calendar \
     date"
  )]
  NotOnCalendar { input: String },
  #[error(
    "month {month} is outside 1..=12"
  )]
  MonthOutOfRange { month: u32 },
  #[error(
    "{input:?} lands outside the \
     supported calendar range"
  )]
  OutOfRange { input: String }
}

fn iso_date_re() -> Option<&'static Regex>
{
  static ISO_DATE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  ISO_DATE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})$",
      )
      .ok()
    })
    .as_ref()
}

fn iso_month_re()
-> Option<&'static Regex> {
  static ISO_MONTH: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  ISO_MONTH
    .get_or_init(|| {
      Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})$",
      )
      .ok()
    })
    .as_ref()
}

fn relative_re()
-> Option<&'static Regex> {
  static RELATIVE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  RELATIVE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$",
      )
      .ok()
    })
    .as_ref()
}

/// A calendar day with no time of day
/// and no timezone.
///
/// Ordering is chronological, which is
/// the same as lexicographic ordering on
/// `(year, month, day)`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub struct DateKey(NaiveDate);

impl DateKey {
  pub fn from_ymd(
    year: i32,
    month: u32,
    day: u32
  ) -> Result<Self, InvalidDateError> {
    NaiveDate::from_ymd_opt(
      year, month, day
    )
    .map(Self)
    .ok_or_else(|| {
      InvalidDateError::NotOnCalendar {
        input: format!(
          "{year:04}-{month:02}-{day:02}"
        )
      }
    })
  }

  /// Parses a strict `YYYY-MM-DD`
  /// string. Surrounding whitespace is
  /// malformed too.
  pub fn parse(
    input: &str
  ) -> Result<Self, InvalidDateError> {
    let malformed = || {
      InvalidDateError::Malformed {
        input: input.to_string()
      }
    };

    let caps = iso_date_re()
      .and_then(|re| {
        re.captures(input)
      })
      .ok_or_else(malformed)?;

    let year = caps["year"]
      .parse::<i32>()
      .map_err(|_| malformed())?;
    let month = caps["month"]
      .parse::<u32>()
      .map_err(|_| malformed())?;
    let day = caps["day"]
      .parse::<u32>()
      .map_err(|_| malformed())?;

    NaiveDate::from_ymd_opt(
      year, month, day
    )
    .map(Self)
    .ok_or_else(|| {
      InvalidDateError::NotOnCalendar {
        input: input.to_string()
      }
    })
  }

  /// The current date on the local wall
  /// clock. Callers that need
  /// determinism inject a fixed date
  /// instead.
  #[must_use]
  pub fn today() -> Self {
    Self(Local::now().date_naive())
  }

  #[must_use]
  pub fn to_iso(&self) -> String {
    self
      .0
      .format("%Y-%m-%d")
      .to_string()
  }

  #[must_use]
  pub fn year(&self) -> i32 {
    self.0.year()
  }

  /// 1-based month.
  #[must_use]
  pub fn month(&self) -> u32 {
    self.0.month()
  }

  #[must_use]
  pub fn day(&self) -> u32 {
    self.0.day()
  }

  /// 0 = Sunday .. 6 = Saturday.
  #[must_use]
  pub fn weekday_index(&self) -> u32 {
    self
      .0
      .weekday()
      .num_days_from_sunday()
  }

  /// Shifts by `days` whole days, or
  /// `None` past the ends of the
  /// supported calendar range.
  #[must_use]
  pub fn checked_add_days(
    &self,
    days: i64
  ) -> Option<Self> {
    let span =
      Days::new(days.unsigned_abs());
    if days >= 0 {
      self.0.checked_add_days(span)
    } else {
      self.0.checked_sub_days(span)
    }
    .map(Self)
  }

  /// Like `checked_add_days`, saturating
  /// at the range ends.
  #[must_use]
  pub fn add_days(
    &self,
    days: i64
  ) -> Self {
    self
      .checked_add_days(days)
      .unwrap_or(if days >= 0 {
        Self(NaiveDate::MAX)
      } else {
        Self(NaiveDate::MIN)
      })
  }

  /// Signed whole days from `from` to
  /// `to`; positive when `to` is later.
  #[must_use]
  pub fn days_between(
    from: Self,
    to: Self
  ) -> i64 {
    to.0
      .signed_duration_since(from.0)
      .num_days()
  }

  #[must_use]
  pub fn as_naive(&self) -> NaiveDate {
    self.0
  }
}

impl From<NaiveDate> for DateKey {
  fn from(date: NaiveDate) -> Self {
    Self(date)
  }
}

impl fmt::Display for DateKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.to_iso())
  }
}

impl FromStr for DateKey {
  type Err = InvalidDateError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl Serialize for DateKey {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer
      .serialize_str(&self.to_iso())
  }
}

impl<'de> Deserialize<'de> for DateKey {
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    Self::parse(&raw)
      .map_err(serde::de::Error::custom)
  }
}

/// A validated (year, month) pair, the
/// unit a month view is built for.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub struct CalendarMonth {
  first: NaiveDate
}

impl CalendarMonth {
  pub fn new(
    year: i32,
    month: u32
  ) -> Result<Self, InvalidDateError> {
    if !(1..=12).contains(&month) {
      return Err(
        InvalidDateError::MonthOutOfRange {
          month
        }
      );
    }

    NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .map(|first| Self { first })
    .ok_or_else(|| {
      InvalidDateError::NotOnCalendar {
        input: format!(
          "{year:04}-{month:02}"
        )
      }
    })
  }

  /// Parses a strict `YYYY-MM` string.
  pub fn parse(
    input: &str
  ) -> Result<Self, InvalidDateError> {
    let malformed = || {
      InvalidDateError::Malformed {
        input: input.to_string()
      }
    };

    let caps = iso_month_re()
      .and_then(|re| {
        re.captures(input)
      })
      .ok_or_else(malformed)?;
    let year = caps["year"]
      .parse::<i32>()
      .map_err(|_| malformed())?;
    let month = caps["month"]
      .parse::<u32>()
      .map_err(|_| malformed())?;

    Self::new(year, month)
  }

  #[must_use]
  pub fn of(date: DateKey) -> Self {
    Self {
      first: date
        .as_naive()
        .with_day(1)
        .unwrap_or(date.as_naive())
    }
  }

  #[must_use]
  pub fn year(&self) -> i32 {
    self.first.year()
  }

  #[must_use]
  pub fn month(&self) -> u32 {
    self.first.month()
  }

  #[must_use]
  pub fn first_day(&self) -> DateKey {
    DateKey(self.first)
  }

  #[must_use]
  pub fn days(&self) -> u32 {
    // Only December of the last
    // supported year has no successor.
    self
      .first
      .checked_add_months(Months::new(1))
      .map(|next| {
        next
          .signed_duration_since(
            self.first
          )
          .num_days() as u32
      })
      .unwrap_or(31)
  }

  /// Weekday of the 1st, 0 = Sunday.
  #[must_use]
  pub fn start_weekday(&self) -> u32 {
    self.first_day().weekday_index()
  }

  #[must_use]
  pub fn day(
    &self,
    day: u32
  ) -> Option<DateKey> {
    self
      .first
      .with_day(day)
      .map(DateKey)
  }

  #[must_use]
  pub fn prev(&self) -> Self {
    self
      .first
      .checked_sub_months(Months::new(1))
      .map(|first| Self { first })
      .unwrap_or(*self)
  }

  #[must_use]
  pub fn next(&self) -> Self {
    self
      .first
      .checked_add_months(Months::new(1))
      .map(|first| Self { first })
      .unwrap_or(*self)
  }
}

impl fmt::Display for CalendarMonth {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{}",
      self.first.format("%Y-%m")
    )
  }
}

/// Resolves a user-typed date against an
/// injected `today`.
///
/// Accepts `today`, `tomorrow`,
/// `yesterday`, `+Nd`/`-Nd`, `+Nw`/`-Nw`
/// and strict `YYYY-MM-DD`. Whitespace
/// around the token is ignored.
pub fn resolve_date_expr(
  input: &str,
  today: DateKey
) -> Result<DateKey, InvalidDateError> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let shift = |days: i64| {
    today.checked_add_days(days).ok_or_else(
      || InvalidDateError::OutOfRange {
        input: token.to_string()
      }
    )
  };

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => return shift(1),
    | "yesterday" => return shift(-1),
    | _ => {}
  }

  if let Some(caps) = relative_re()
    .and_then(|re| re.captures(&lower))
  {
    let num = caps["num"]
      .parse::<i64>()
      .map_err(|_| {
        InvalidDateError::OutOfRange {
          input: token.to_string()
        }
      })?;
    let days = match &caps["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    let signed = if &caps["sign"] == "-"
    {
      -days
    } else {
      days
    };
    return shift(signed);
  }

  DateKey::parse(token)
}
