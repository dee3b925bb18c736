use std::ffi::OsString;

use chrono::{DateTime, TimeZone, Utc};
use hearth_core::agenda;
use hearth_core::cli::Invocation;
use hearth_core::commands;
use hearth_core::config::Config;
use hearth_core::datastore::DataStore;
use hearth_core::month_grid;
use hearth_core::render::Renderer;
use hearth_core::{CalendarMonth, DateKey, RecurrenceKind};
use tempfile::{TempDir, tempdir};

fn date(raw: &str) -> DateKey {
    DateKey::parse(raw).expect("valid test date")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 7, 30, 0).single().expect("valid now")
}

fn store() -> (TempDir, DataStore) {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    (temp, store)
}

fn hearth(store: &mut DataStore, args: &[&str]) -> anyhow::Result<()> {
    let cfg = Config::default();
    let rest: Vec<OsString> = args.iter().map(OsString::from).collect();
    let inv = Invocation::parse(&cfg, rest)?;
    commands::dispatch(store, &cfg, &mut Renderer::plain(), inv, date("2024-01-10"), now())
}

#[test]
fn add_schedules_for_today_unless_told_otherwise() {
    let (_temp, mut store) = store();

    hearth(&mut store, &["add", "water", "plants"]).expect("add plants");
    hearth(&mut store, &["add", "bins", "on:2024-01-01", "recur:weekly", "until:2024-01-15"]).expect("add bins");

    let tasks = store.load_tasks().expect("load");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, Some(1));
    assert_eq!(tasks[0].content, "water plants");
    assert_eq!(tasks[0].rule.base_date, date("2024-01-10"));
    assert_eq!(tasks[0].rule.kind, RecurrenceKind::None);
    assert_eq!(tasks[0].created, now());

    assert_eq!(tasks[1].rule.base_date, date("2024-01-01"));
    assert_eq!(tasks[1].rule.kind, RecurrenceKind::Weekly);
    assert_eq!(tasks[1].rule.end_date, Some(date("2024-01-15")));
}

#[test]
fn add_rejects_until_on_one_off_task() {
    let (_temp, mut store) = store();
    assert!(hearth(&mut store, &["add", "dentist", "until:2024-02-01"]).is_err());
    assert!(store.load_tasks().expect("load").is_empty());
}

#[test]
fn done_toggles_back_to_open() {
    let (_temp, mut store) = store();
    hearth(&mut store, &["add", "rent", "recur:monthly"]).expect("add rent");

    hearth(&mut store, &["1", "done"]).expect("complete");
    assert!(store.load_tasks().expect("load")[0].completed);
    assert!(agenda::open_for_date(&store.load_tasks().expect("load"), date("2024-02-10")).is_empty());

    hearth(&mut store, &["1", "done"]).expect("reopen");
    assert!(!store.load_tasks().expect("load")[0].completed);
}

#[test]
fn modify_reports_the_offending_task() {
    let (_temp, mut store) = store();
    hearth(&mut store, &["add", "rent", "recur:monthly"]).expect("add rent");
    hearth(&mut store, &["add", "bins", "on:2024-01-01", "recur:weekly"]).expect("add bins");

    let err = hearth(&mut store, &["2", "modify", "until:2023-12-01"]).expect_err("until before base");
    assert_eq!(
        format!("{err:#}"),
        "task 2: until date 2023-12-01 is before the scheduled date 2024-01-01"
    );
    assert_eq!(store.load_tasks().expect("load")[1].rule.end_date, None);

    hearth(&mut store, &["2", "mod", "until:2024-03-01"]).expect("valid until");
    assert_eq!(store.load_tasks().expect("load")[1].rule.end_date, Some(date("2024-03-01")));

    hearth(&mut store, &["2", "modify", "recur:none"]).expect("drop recurrence");
    let tasks = store.load_tasks().expect("load");
    let bins = &tasks[1];
    assert_eq!(bins.rule.kind, RecurrenceKind::None);
    assert_eq!(bins.rule.end_date, None);
    assert_eq!(bins.modified, now());
}

#[test]
fn delete_removes_only_selected_ids() {
    let (_temp, mut store) = store();
    for chore in ["sweep", "dust", "mop"] {
        hearth(&mut store, &["add", chore]).expect("add chore");
    }

    hearth(&mut store, &["1", "3", "delete"]).expect("delete two");

    let left = store.load_tasks().expect("load");
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, Some(2));
    assert_eq!(left[0].content, "dust");

    assert!(hearth(&mut store, &["7", "delete"]).is_err());
    assert_eq!(store.load_tasks().expect("load").len(), 1);
}

#[test]
fn calendar_navigation_and_bad_months() {
    let (_temp, mut store) = store();
    hearth(&mut store, &["add", "bins", "recur:weekly"]).expect("add bins");

    let views: [&[&str]; 4] = [&["calendar"], &["cal", "prev"], &["calendar", "next"], &["calendar", "2023-02"]];
    for args in views {
        hearth(&mut store, args).expect("calendar renders");
    }
    assert!(hearth(&mut store, &["calendar", "2024-13"]).is_err());
    assert!(hearth(&mut store, &["calendar", "someday"]).is_err());
}

#[test]
fn selection_commands_need_ids() {
    let (_temp, mut store) = store();
    hearth(&mut store, &["add", "sweep"]).expect("add");
    assert!(hearth(&mut store, &["done"]).is_err());
    assert!(hearth(&mut store, &["info"]).is_err());
    hearth(&mut store, &["1"]).expect("bare id shows info");
}

#[test]
fn project_milestones_show_up_on_their_due_day() {
    let (_temp, mut store) = store();

    hearth(&mut store, &["project", "add", "kitchen", "remodel"]).expect("add project");
    hearth(&mut store, &["project", "milestone", "1", "order", "cabinets", "due:2024-02-01"]).expect("dated");
    hearth(&mut store, &["project", "milestone", "1", "pick", "tiles"]).expect("undated");
    hearth(&mut store, &["project", "done", "1.1"]).expect("complete milestone");
    hearth(&mut store, &["project"]).expect("list projects");
    hearth(&mut store, &["agenda", "2024-02-01"]).expect("agenda with milestone");

    let projects = store.load_projects().expect("load projects");
    assert_eq!(projects.len(), 1);
    let kitchen = &projects[0];
    assert_eq!(kitchen.name, "kitchen remodel");
    assert_eq!(kitchen.progress(), (1, 2));
    assert_eq!(kitchen.milestones[0].due, Some(date("2024-02-01")));
    assert_eq!(kitchen.milestones[1].due, None);

    assert_eq!(agenda::milestones_for_date(&projects, date("2024-02-01")).len(), 1);
    assert!(agenda::open_milestones_for_date(&projects, date("2024-02-01")).is_empty());

    let feb = CalendarMonth::new(2024, 2).expect("valid month");
    let cells = month_grid::build_with_projects(feb, &[], &projects);
    let busy: Vec<DateKey> = cells.iter().filter(|c| c.is_busy()).filter_map(|c| c.date()).collect();
    assert_eq!(busy, vec![date("2024-02-01")]);

    assert!(hearth(&mut store, &["project", "done", "1.3"]).is_err());
    assert!(hearth(&mut store, &["project", "milestone", "9", "ghost"]).is_err());
    assert!(hearth(&mut store, &["project", "add"]).is_err());
}
