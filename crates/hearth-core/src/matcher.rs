use crate::date::DateKey;
use crate::recurrence::{
  RecurrenceKind,
  RecurrenceRule
};

/// Decides whether a rule produces an
/// occurrence on `target`.
///
/// Bounds are checked first for every
/// kind. Monthly and yearly rules match
/// the exact day of month and never clamp
/// to a shorter month's last day, so a
/// rule based on the 31st skips months
/// without one.
#[must_use]
pub fn occurs_on(
  rule: &RecurrenceRule,
  target: DateKey
) -> bool {
  if !rule.is_within_bounds(target) {
    return false;
  }

  let base = rule.base_date;
  match rule.kind {
    | RecurrenceKind::None => {
      target == base
    }
    | RecurrenceKind::Daily => true,
    | RecurrenceKind::Weekly => {
      // non-negative after the bounds
      // check
      DateKey::days_between(
        base, target
      )
      .rem_euclid(7)
        == 0
    }
    | RecurrenceKind::Monthly => {
      target.day() == base.day()
    }
    | RecurrenceKind::Yearly => {
      target.day() == base.day()
        && target.month()
          == base.month()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::occurs_on;
  use crate::date::DateKey;
  use crate::recurrence::{
    RecurrenceKind,
    RecurrenceRule
  };

  fn date(raw: &str) -> DateKey {
    DateKey::parse(raw)
      .expect("valid test date")
  }

  fn rule(
    kind: RecurrenceKind,
    base: &str,
    end: Option<&str>
  ) -> RecurrenceRule {
    RecurrenceRule::new(
      kind,
      date(base),
      end.map(date)
    )
  }

  #[test]
  fn daily_runs_through_inclusive_end(
  ) {
    let daily = rule(
      RecurrenceKind::Daily,
      "2024-01-01",
      Some("2024-01-03")
    );
    for hit in [
      "2024-01-01",
      "2024-01-02",
      "2024-01-03"
    ] {
      assert!(
        occurs_on(&daily, date(hit)),
        "{hit} should occur"
      );
    }
    for miss in
      ["2023-12-31", "2024-01-04"]
    {
      assert!(
        !occurs_on(&daily, date(miss)),
        "{miss} should not occur"
      );
    }
  }

  #[test]
  fn weekly_matches_seven_day_multiples(
  ) {
    let weekly = rule(
      RecurrenceKind::Weekly,
      "2024-01-01",
      None
    );
    assert!(occurs_on(
      &weekly,
      date("2024-01-08")
    ));
    assert!(occurs_on(
      &weekly,
      date("2024-01-15")
    ));
    assert!(!occurs_on(
      &weekly,
      date("2024-01-10")
    ));
  }

  #[test]
  fn weekly_periodicity_holds_across_years(
  ) {
    let base = date("2023-11-29");
    let weekly = RecurrenceRule::new(
      RecurrenceKind::Weekly,
      base,
      None
    );
    for k in 0..120_i64 {
      assert!(occurs_on(
        &weekly,
        base.add_days(7 * k)
      ));
      for r in 1..7_i64 {
        assert!(!occurs_on(
          &weekly,
          base.add_days(7 * k + r)
        ));
      }
    }
  }

  #[test]
  fn monthly_does_not_clamp_short_months(
  ) {
    let monthly = rule(
      RecurrenceKind::Monthly,
      "2024-01-31",
      None
    );
    assert!(occurs_on(
      &monthly,
      date("2024-03-31")
    ));
    assert!(!occurs_on(
      &monthly,
      date("2024-02-29")
    ));
    assert!(!occurs_on(
      &monthly,
      date("2024-02-28")
    ));
    assert!(!occurs_on(
      &monthly,
      date("2024-04-30")
    ));
  }

  #[test]
  fn yearly_matches_month_and_day() {
    let yearly = rule(
      RecurrenceKind::Yearly,
      "2023-02-28",
      None
    );
    assert!(occurs_on(
      &yearly,
      date("2024-02-28")
    ));
    assert!(!occurs_on(
      &yearly,
      date("2024-02-29")
    ));
    assert!(!occurs_on(
      &yearly,
      date("2024-03-28")
    ));
  }

  #[test]
  fn none_occurs_on_base_date_only() {
    let once = rule(
      RecurrenceKind::None,
      "2024-05-10",
      None
    );
    let base = date("2024-05-10");
    assert!(occurs_on(&once, base));
    for offset in [-365, -1, 1, 7, 30, 365]
    {
      assert!(!occurs_on(
        &once,
        base.add_days(offset)
      ));
    }
  }

  #[test]
  fn nothing_occurs_before_base_date() {
    for kind in RecurrenceKind::ALL {
      let r =
        rule(kind, "2024-06-15", None);
      for back in 1..40_i64 {
        assert!(!occurs_on(
          &r,
          date("2024-06-15")
            .add_days(-back)
        ));
      }
    }
  }

  #[test]
  fn nothing_occurs_after_end_date() {
    for kind in RecurrenceKind::ALL {
      let r = rule(
        kind,
        "2024-01-01",
        Some("2024-03-01")
      );
      for ahead in 1..400_i64 {
        assert!(!occurs_on(
          &r,
          date("2024-03-01")
            .add_days(ahead)
        ));
      }
    }
  }

  #[test]
  fn end_date_itself_can_occur() {
    let monthly = rule(
      RecurrenceKind::Monthly,
      "2024-01-15",
      Some("2024-04-15")
    );
    assert!(occurs_on(
      &monthly,
      date("2024-04-15")
    ));
  }
}
