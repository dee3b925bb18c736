use std::fs;

use chrono::{TimeZone, Utc};
use hearth_core::agenda;
use hearth_core::datastore::DataStore;
use hearth_core::month_grid;
use hearth_core::{CalendarMonth, DateKey, RecurrenceKind, RecurrenceRule, Task};
use tempfile::tempdir;

fn date(raw: &str) -> DateKey {
    DateKey::parse(raw).expect("valid test date")
}

#[test]
fn datastore_roundtrip_and_agenda() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).single().expect("valid now");

    let tasks = store.load_tasks().expect("load empty");
    assert!(tasks.is_empty());

    let bins = Task::new(
        "take out bins".to_string(),
        RecurrenceRule::new(RecurrenceKind::Weekly, date("2024-01-02"), None),
        now,
        store.next_id(&tasks),
    );
    let tasks = store.add_task(tasks, bins).expect("add bins");
    let vacuum = Task::new(
        "vacuum stairs".to_string(),
        RecurrenceRule::new(RecurrenceKind::Daily, date("2024-01-05"), Some(date("2024-01-10"))),
        now,
        store.next_id(&tasks),
    );
    store.add_task(tasks, vacuum).expect("add vacuum");

    let loaded = store.load_tasks().expect("reload");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].id, Some(2));
    assert_eq!(loaded[1].rule.end_date, Some(date("2024-01-10")));

    let day = agenda::for_date(&loaded, date("2024-01-09"));
    let names: Vec<&str> = day.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(names, vec!["take out bins", "vacuum stairs"]);

    let mut bins = loaded[0].clone();
    bins.toggle_completed(now);
    store.update_task(&bins).expect("update bins");

    let reloaded = store.load_tasks().expect("reload after update");
    let open = agenda::open_for_date(&reloaded, date("2024-01-09"));
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].content, "vacuum stairs");

    let removed = store.delete_task(reloaded[1].uuid).expect("delete vacuum");
    assert_eq!(removed.content, "vacuum stairs");
    assert_eq!(store.load_tasks().expect("reload after delete").len(), 1);
}

#[test]
fn month_grid_over_stored_tasks() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).single().expect("valid now");

    let rent = Task::new(
        "pay rent".to_string(),
        RecurrenceRule::new(RecurrenceKind::Monthly, date("2024-01-31"), None),
        now,
        1,
    );
    store.add_task(vec![], rent).expect("add rent");
    let tasks = store.load_tasks().expect("load");

    let feb = month_grid::build(CalendarMonth::new(2024, 2).expect("feb"), &tasks);
    assert!(feb.iter().all(|cell| cell.occurrences().is_empty()));

    let mar = month_grid::build(CalendarMonth::new(2024, 3).expect("mar"), &tasks);
    let busy: Vec<DateKey> = mar
        .iter()
        .filter(|cell| !cell.occurrences().is_empty())
        .filter_map(|cell| cell.date())
        .collect();
    assert_eq!(busy, vec![date("2024-03-31")]);
}

#[test]
fn store_records_use_scheduling_field_names() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).single().expect("valid now");

    let task = Task::new(
        "renew passport".to_string(),
        RecurrenceRule::new(RecurrenceKind::Yearly, date("2024-06-01"), None),
        now,
        1,
    );
    store.add_task(vec![], task).expect("add task");

    let raw = fs::read_to_string(&store.tasks_path).expect("read tasks.data");
    let record: serde_json::Value = serde_json::from_str(raw.trim()).expect("json line");
    assert_eq!(record["scheduled_for"], "2024-06-01");
    assert_eq!(record["recurrence"], "YEARLY");
    assert!(record["recurrence_end_date"].is_null());
    assert_eq!(record["completed"], false);
}

#[test]
fn malformed_stored_date_fails_loudly() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    fs::write(
        &store.tasks_path,
        concat!(
            r#"{"uuid":"7b0a3c9e-2f1d-4d7a-9a51-0f2f3f6b8e11","id":1,"content":"ghost","#,
            r#""completed":false,"scheduled_for":"2024-02-30","recurrence":"DAILY","#,
            r#""created":"2024-01-01T00:00:00Z","modified":"2024-01-01T00:00:00Z"}"#,
            "\n"
        ),
    )
    .expect("write corrupt record");

    let err = store.load_tasks().expect_err("invalid date must not load");
    assert!(format!("{err:#}").contains("line 1"));
}
