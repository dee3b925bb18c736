use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::agenda;
use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::date::{CalendarMonth, DateKey, resolve_date_expr};
use crate::month_grid;
use crate::project::{Milestone, MilestoneRef, Project};
use crate::recurrence::{RecurrenceKind, RecurrenceRule};
use crate::render::Renderer;
use crate::task::Task;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "agenda", "calendar", "delete", "done", "export", "help", "info", "list", "modify",
        "project", "show", "today", "version",
    ]
}

/// Exact names win; otherwise a prefix must be unambiguous.
pub fn expand_command_abbrev(token: &str, known: &[&'static str]) -> Option<&'static str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }
    if token.is_empty() {
        return None;
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Runs one invocation. `today` and `now` come from the caller so every
/// date decision below is deterministic.
#[instrument(skip(store, cfg, renderer, inv, now), fields(command = %inv.command))]
pub fn dispatch(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
    today: DateKey,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    debug!(
        selectors = ?inv.selectors,
        args = ?inv.command_args,
        "dispatching command"
    );

    match inv.command.as_str() {
        "add" => cmd_add(store, &inv.command_args, today, now),
        "list" => cmd_list(store, renderer),
        "agenda" => cmd_agenda(store, renderer, &inv.command_args, today),
        "today" => cmd_today(store, renderer, today),
        "calendar" => cmd_calendar(store, renderer, &inv.command_args, today),
        "done" => cmd_done(store, &inv.selectors, now),
        "delete" => cmd_delete(store, &inv.selectors),
        "modify" => cmd_modify(store, &inv.selectors, &inv.command_args, today, now),
        "info" => cmd_info(store, renderer, &inv.selectors),
        "export" => cmd_export(store),
        "project" => cmd_project(store, renderer, &inv.command_args, today, now),
        "show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, args, now))]
fn cmd_add(
    store: &mut DataStore,
    args: &[String],
    today: DateKey,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let (content, mods) = parse_content_and_mods(args, today)?;
    let mut rule = RecurrenceRule::once(today);
    apply_mods(&mut rule, &mods);
    validate_rule(&rule)?;

    let tasks = store.load_tasks()?;
    let id = store.next_id(&tasks);
    let task = Task::new(content, rule, now, id);
    let tasks = store.add_task(tasks, task)?;

    debug!(task_count = tasks.len(), "task added");
    println!("Created task {id}.");
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_list(store: &mut DataStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command list");

    let mut tasks = store.load_tasks()?;
    tasks.sort_by_key(|task| (task.scheduled_for(), task.id));
    let rows: Vec<&Task> = tasks.iter().collect();
    renderer.print_task_table(&rows)
}

#[instrument(skip(store, renderer, args))]
fn cmd_agenda(
    store: &mut DataStore,
    renderer: &mut Renderer,
    args: &[String],
    today: DateKey,
) -> anyhow::Result<()> {
    info!("command agenda");

    let date = match args {
        [] => today,
        [expr] => resolve_date_expr(expr, today)?,
        _ => bail!("agenda takes at most one date"),
    };

    let tasks = store.load_tasks()?;
    let projects = store.load_projects()?;
    let day = agenda::for_date(&tasks, date);
    let due = agenda::milestones_for_date(&projects, date);
    debug!(date = %date, matched = day.len(), milestones = due.len(), "agenda resolved");
    renderer.print_agenda(date, &day, &due)
}

#[instrument(skip(store, renderer))]
fn cmd_today(store: &mut DataStore, renderer: &mut Renderer, today: DateKey) -> anyhow::Result<()> {
    info!("command today");

    let tasks = store.load_tasks()?;
    let projects = store.load_projects()?;
    let open = agenda::open_for_date(&tasks, today);
    let due = agenda::open_milestones_for_date(&projects, today);
    renderer.print_agenda(today, &open, &due)
}

#[instrument(skip(store, renderer, args))]
fn cmd_calendar(
    store: &mut DataStore,
    renderer: &mut Renderer,
    args: &[String],
    today: DateKey,
) -> anyhow::Result<()> {
    info!("command calendar");

    let month = select_month(args, today)?;
    let tasks = store.load_tasks()?;
    let projects = store.load_projects()?;
    let cells = month_grid::build_with_projects(month, &tasks, &projects);
    renderer.print_month(month, &cells, today)
}

fn select_month(args: &[String], today: DateKey) -> anyhow::Result<CalendarMonth> {
    let current = CalendarMonth::of(today);
    match args {
        [] => Ok(current),
        [arg] => match arg.to_ascii_lowercase().as_str() {
            "prev" => Ok(current.prev()),
            "next" => Ok(current.next()),
            _ => Ok(CalendarMonth::parse(arg)?),
        },
        _ => bail!("calendar takes at most one month (YYYY-MM, prev or next)"),
    }
}

#[instrument(skip(store, selectors, now))]
fn cmd_done(store: &mut DataStore, selectors: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command done");

    let mut tasks = store.load_tasks()?;
    let picked = select_indices(&tasks, selectors, "done")?;

    for idx in picked {
        let task = &mut tasks[idx];
        task.toggle_completed(now);
        let state = if task.completed { "Completed" } else { "Reopened" };
        println!("{state} task {} '{}'.", display_id(task), task.content);
    }

    store.save_tasks(&tasks)
}

#[instrument(skip(store, selectors))]
fn cmd_delete(store: &mut DataStore, selectors: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let tasks = store.load_tasks()?;
    let picked: Vec<uuid::Uuid> = select_indices(&tasks, selectors, "delete")?
        .into_iter()
        .map(|idx| tasks[idx].uuid)
        .collect();

    for uuid in &picked {
        store.delete_task(*uuid)?;
    }

    println!("Deleted {} task(s).", picked.len());
    Ok(())
}

#[instrument(skip(store, selectors, args, now))]
fn cmd_modify(
    store: &mut DataStore,
    selectors: &[String],
    args: &[String],
    today: DateKey,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command modify");

    let mods = parse_mods(args, today)?;
    if mods.is_empty() {
        bail!("modify requires at least one of on:, recur:, until:");
    }

    let mut tasks = store.load_tasks()?;
    let picked = select_indices(&tasks, selectors, "modify")?;

    for idx in &picked {
        let task = &mut tasks[*idx];
        let mut rule = task.rule.clone();
        apply_mods(&mut rule, &mods);
        validate_rule(&rule).with_context(|| format!("task {}", display_id(task)))?;
        task.rule = rule;
        task.modified = now;
    }

    store.save_tasks(&tasks)?;
    println!("Modified {} task(s).", picked.len());
    Ok(())
}

#[instrument(skip(store, renderer, selectors))]
fn cmd_info(store: &mut DataStore, renderer: &mut Renderer, selectors: &[String]) -> anyhow::Result<()> {
    info!("command info");

    let tasks = store.load_tasks()?;
    for idx in select_indices(&tasks, selectors, "info")? {
        renderer.print_task_info(&tasks[idx])?;
    }
    Ok(())
}

#[instrument(skip(store))]
fn cmd_export(store: &mut DataStore) -> anyhow::Result<()> {
    info!("command export");

    let tasks = store.load_tasks()?;
    let json = serde_json::to_string_pretty(&tasks).context("failed to serialize tasks")?;
    println!("{json}");
    Ok(())
}

#[instrument(skip(cfg))]
fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    info!("command show");

    for file in &cfg.loaded_files {
        println!("# {}", file.display());
    }
    for (key, value) in cfg.iter() {
        println!("{key} = {value}");
    }
    Ok(())
}

const PROJECT_SUBCOMMANDS: [&str; 4] = ["add", "done", "list", "milestone"];

/// `project [list]`, `project add <name...>`,
/// `project milestone <id> <title...> [due:DATE]`, `project done <id.n>...`
#[instrument(skip(store, renderer, args, now))]
fn cmd_project(
    store: &mut DataStore,
    renderer: &mut Renderer,
    args: &[String],
    today: DateKey,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command project");

    let (sub, rest) = match args.split_first() {
        None => ("list", &[][..]),
        Some((first, rest)) => {
            let sub = expand_command_abbrev(first, &PROJECT_SUBCOMMANDS)
                .ok_or_else(|| anyhow!("unknown project subcommand: {first}"))?;
            (sub, rest)
        }
    };
    debug!(subcommand = sub, "project subcommand resolved");

    let mut projects = store.load_projects()?;
    match sub {
        "list" => renderer.print_projects(&projects),
        "add" => {
            let name = rest.join(" ").trim().to_string();
            if name.is_empty() {
                bail!("project add: a project name is required");
            }
            let id = store.next_project_id(&projects);
            store.add_project(projects, Project::new(name, now, id))?;
            println!("Created project {id}.");
            Ok(())
        }
        "milestone" => {
            let Some((target, words)) = rest.split_first() else {
                bail!("project milestone: expected <project id> <title...> [due:DATE]");
            };
            let (title, due) = parse_title_and_due(words, today)?;
            let project = find_project(&mut projects, target)?;
            let number = project.add_milestone(Milestone::new(title, due), now);
            let reference = format!("{target}.{number}");
            store.save_projects(&projects)?;
            println!("Added milestone {reference}.");
            Ok(())
        }
        "done" => {
            if rest.is_empty() {
                bail!("project done: expected one or more PROJECT.MILESTONE references");
            }
            for raw in rest {
                let reference: MilestoneRef = raw.parse()?;
                let project = find_project(&mut projects, &reference.project.to_string())?;
                project.modified = now;
                let milestone = project
                    .milestone_mut(reference.number)
                    .ok_or_else(|| anyhow!("no milestone matches {raw}"))?;
                milestone.completed = !milestone.completed;
                let state = if milestone.completed { "Completed" } else { "Reopened" };
                println!("{state} milestone {raw} '{}'.", milestone.title);
            }
            store.save_projects(&projects)
        }
        other => Err(anyhow!("unknown project subcommand: {other}")),
    }
}

fn find_project<'p>(projects: &'p mut [Project], selector: &str) -> anyhow::Result<&'p mut Project> {
    let id = selector
        .parse::<u64>()
        .map_err(|_| anyhow!("not a project id: {selector}"))?;
    projects
        .iter_mut()
        .find(|p| p.id == Some(id))
        .ok_or_else(|| anyhow!("no project matches {selector}"))
}

/// Milestone words plus an optional `due:` date; `--` ends modifier parsing.
fn parse_title_and_due(args: &[String], today: DateKey) -> anyhow::Result<(String, Option<DateKey>)> {
    let mut words = Vec::new();
    let mut due = None;

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }
        if !literal
            && let Some((key, value)) = arg.split_once(':')
            && key.eq_ignore_ascii_case("due")
        {
            due = Some(resolve_date_expr(value, today)?);
            continue;
        }
        words.push(arg.as_str());
    }

    let title = words.join(" ").trim().to_string();
    if title.is_empty() {
        bail!("project milestone: a title is required");
    }
    Ok((title, due))
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "usage: hearth [ids...] <command> [args...]\n\
         \n\
         add <content...> [on:DATE] [recur:KIND] [until:DATE]\n\
         list                     all tasks by scheduled date\n\
         agenda [DATE]            tasks occurring on DATE (default today)\n\
         today                    open tasks occurring today\n\
         calendar [YYYY-MM|prev|next]\n\
         <ids> done               toggle completion\n\
         <ids> delete             remove tasks\n\
         <ids> modify [on:DATE] [recur:KIND] [until:DATE|none]\n\
         <ids> info               task details\n\
         export                   all tasks as JSON\n\
         project [list]           projects and their milestones\n\
         project add <name...>\n\
         project milestone <id> <title...> [due:DATE]\n\
         project done <id.n>...   toggle milestone completion\n\
         show                     effective configuration\n\
         \n\
         DATE: YYYY-MM-DD, today, tomorrow, yesterday, +Nd, -Nd, +Nw, -Nw\n\
         KIND: none, daily, weekly, monthly, yearly"
    );
    Ok(())
}

/// Resolves numeric ids or uuids to positions in `tasks`, in selector order.
fn select_indices(tasks: &[Task], selectors: &[String], command: &str) -> anyhow::Result<Vec<usize>> {
    if selectors.is_empty() {
        bail!("{command} requires one or more task ids");
    }

    let mut picked = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let position = if let Ok(id) = selector.parse::<u64>() {
            tasks.iter().position(|t| t.id == Some(id))
        } else if let Ok(uuid) = uuid::Uuid::parse_str(selector) {
            tasks.iter().position(|t| t.uuid == uuid)
        } else {
            bail!("not a task id or uuid: {selector}");
        };

        let idx = position.ok_or_else(|| anyhow!("no task matches {selector}"))?;
        if !picked.contains(&idx) {
            picked.push(idx);
        }
    }

    Ok(picked)
}

fn display_id(task: &Task) -> String {
    task.id
        .map(|id| id.to_string())
        .unwrap_or_else(|| task.uuid.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mod {
    On(DateKey),
    Recur(RecurrenceKind),
    Until(Option<DateKey>),
}

fn parse_content_and_mods(args: &[String], today: DateKey) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut words = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, today)? {
            mods.push(one_mod);
            continue;
        }

        words.push(arg.as_str());
    }

    let content = words.join(" ").trim().to_string();
    if content.is_empty() {
        bail!("add: task content is required");
    }

    Ok((content, mods))
}

fn parse_mods(args: &[String], today: DateKey) -> anyhow::Result<Vec<Mod>> {
    let mut mods = Vec::new();
    for arg in args {
        match parse_one_mod(arg, today)? {
            Some(one_mod) => mods.push(one_mod),
            None => warn!(arg = %arg, "unrecognized modifier token ignored"),
        }
    }
    Ok(mods)
}

fn parse_one_mod(tok: &str, today: DateKey) -> anyhow::Result<Option<Mod>> {
    let Some((key, value)) = tok.split_once(':').or_else(|| tok.split_once('=')) else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "on" | "date" | "scheduled" => Ok(Some(Mod::On(resolve_date_expr(value, today)?))),
        "recur" | "repeat" | "recurrence" => Ok(Some(Mod::Recur(value.parse()?))),
        "until" | "end" => {
            if value.is_empty() || value.eq_ignore_ascii_case("none") {
                Ok(Some(Mod::Until(None)))
            } else {
                Ok(Some(Mod::Until(Some(resolve_date_expr(value, today)?))))
            }
        }
        _ => Ok(None),
    }
}

fn apply_mods(rule: &mut RecurrenceRule, mods: &[Mod]) {
    for one_mod in mods {
        match one_mod {
            Mod::On(date) => rule.base_date = *date,
            Mod::Recur(kind) => rule.kind = *kind,
            Mod::Until(end) => rule.end_date = *end,
        }
    }

    let explicit_until = mods.iter().any(|m| matches!(m, Mod::Until(Some(_))));
    if !rule.kind.is_repeating() && rule.end_date.is_some() && !explicit_until {
        debug!("dropping end date from non-repeating rule");
        rule.end_date = None;
    }
}

fn validate_rule(rule: &RecurrenceRule) -> anyhow::Result<()> {
    match rule.end_date {
        Some(_) if !rule.kind.is_repeating() => {
            bail!("until: needs a repeating recurrence (recur:daily, weekly, monthly or yearly)")
        }
        Some(end) if end < rule.base_date => {
            bail!("until date {end} is before the scheduled date {}", rule.base_date)
        }
        _ => Ok(()),
    }
}
