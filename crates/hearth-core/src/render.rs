use std::io::{self, IsTerminal, Write};

use anyhow::Context;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::date::{CalendarMonth, DateKey};
use crate::month_grid::{self, Cell};
use crate::project::{DueMilestone, Project};
use crate::task::Task;

const WEEKDAY_HEADER: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg
            .get_bool("color")
            .context("failed to read color setting")?
            .unwrap_or(true);
        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&mut self, tasks: &[&Task]) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_task_table(out, tasks)
    }

    #[tracing::instrument(skip(self, tasks, milestones))]
    pub fn print_agenda(
        &mut self,
        date: DateKey,
        tasks: &[&Task],
        milestones: &[DueMilestone<'_>],
    ) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_agenda(out, date, tasks, milestones)
    }

    #[tracing::instrument(skip(self, task), fields(uuid = %task.uuid))]
    pub fn print_task_info(&mut self, task: &Task) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        write_task_info(out, task)
    }

    #[tracing::instrument(skip(self, projects))]
    pub fn print_projects(&mut self, projects: &[Project]) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_projects(out, projects)
    }

    #[tracing::instrument(skip(self, cells))]
    pub fn print_month(&mut self, month: CalendarMonth, cells: &[Cell<'_>], today: DateKey) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_month(out, month, cells, today)
    }

    fn write_task_table<W: Write>(&self, out: W, tasks: &[&Task]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Date".to_string(),
            "Repeats".to_string(),
            "Until".to_string(),
            "Done".to_string(),
            "Content".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let id = task
                    .id
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let done = if task.completed { self.paint("x", "32") } else { String::new() };
                vec![
                    self.paint(&id, "33"),
                    task.rule.base_date.to_string(),
                    task.rule.kind.label().to_string(),
                    task.rule.end_date.map(|end| end.to_string()).unwrap_or_default(),
                    done,
                    task.content.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    fn write_agenda<W: Write>(
        &self,
        mut out: W,
        date: DateKey,
        tasks: &[&Task],
        milestones: &[DueMilestone<'_>],
    ) -> anyhow::Result<()> {
        let weekday = date.as_naive().format("%A");
        writeln!(out, "{weekday} {date}")?;
        if tasks.is_empty() && milestones.is_empty() {
            writeln!(out, "Nothing scheduled.")?;
            return Ok(());
        }

        if !tasks.is_empty() {
            self.write_task_table(&mut out, tasks)?;
        }
        if !milestones.is_empty() {
            writeln!(out)?;
            writeln!(out, "Milestones due:")?;
            for due in milestones {
                let mark = if due.milestone.completed { "x" } else { " " };
                writeln!(
                    out,
                    "  [{mark}] {} {}: {}",
                    due.reference(),
                    due.project.name,
                    due.milestone.title
                )?;
            }
        }
        Ok(())
    }

    /// One block per project: a progress header, then its numbered milestones.
    fn write_projects<W: Write>(&self, mut out: W, projects: &[Project]) -> anyhow::Result<()> {
        if projects.is_empty() {
            writeln!(out, "No projects.")?;
            return Ok(());
        }

        for project in projects {
            let (done, total) = project.progress();
            let id = project
                .id
                .map(|value| value.to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(out, "{} {}  ({done}/{total})", self.paint(&id, "33"), project.name)?;
            if project.milestones.is_empty() {
                writeln!(out, "  no milestones yet")?;
            }
            for (idx, milestone) in project.milestones.iter().enumerate() {
                let mark = if milestone.completed { "x" } else { " " };
                let due = milestone
                    .due
                    .map(|date| format!("  due {date}"))
                    .unwrap_or_default();
                writeln!(out, "  {id}.{} [{mark}] {}{due}", idx + 1, milestone.title)?;
            }
        }
        Ok(())
    }

    /// Sunday-first month grid; busy days are marked `*`, today is
    /// bracketed. A per-day count list follows the grid.
    fn write_month<W: Write>(
        &self,
        mut out: W,
        month: CalendarMonth,
        cells: &[Cell<'_>],
        today: DateKey,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", month.first_day().as_naive().format("%B %Y"))?;
        let header: String = WEEKDAY_HEADER.iter().map(|d| format!(" {d}  ")).collect();
        writeln!(out, "{}", header.trim_end())?;

        for row in month_grid::weeks(cells) {
            let line: String = row.iter().map(|cell| self.month_cell(cell, today)).collect();
            writeln!(out, "{}", line.trim_end())?;
        }

        let busy: Vec<(DateKey, usize, usize)> = cells
            .iter()
            .filter(|cell| cell.is_busy())
            .filter_map(|cell| {
                cell.date()
                    .map(|date| (date, cell.occurrences().len(), cell.milestones().len()))
            })
            .collect();

        if !busy.is_empty() {
            writeln!(out)?;
            for (date, tasks, milestones) in busy {
                let mut parts = Vec::new();
                if tasks > 0 {
                    parts.push(format!("{tasks} task(s)"));
                }
                if milestones > 0 {
                    parts.push(format!("{milestones} milestone(s)"));
                }
                writeln!(out, "{date}  {}", parts.join(", "))?;
            }
        }

        Ok(())
    }

    /// Five columns per day: ` dd* ` normally, `[dd]*` for today.
    fn month_cell(&self, cell: &Cell<'_>, today: DateKey) -> String {
        let Some(date) = cell.date() else {
            return "     ".to_string();
        };

        let marker = if cell.is_busy() { '*' } else { ' ' };
        if date == today {
            let day = self.paint(&format!("[{:>2}]", date.day()), "7");
            format!("{day}{marker}")
        } else {
            format!(" {:>2}{marker} ", date.day())
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_task_info<W: Write>(mut out: W, task: &Task) -> anyhow::Result<()> {
    writeln!(
        out,
        "id         {}",
        task.id
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string())
    )?;
    writeln!(out, "uuid       {}", task.uuid)?;
    writeln!(out, "content    {}", task.content)?;
    writeln!(out, "completed  {}", if task.completed { "yes" } else { "no" })?;
    writeln!(out, "scheduled  {}", task.rule.base_date)?;
    writeln!(out, "repeats    {}", repeat_summary(task))?;
    if let Some(end) = task.rule.end_date {
        writeln!(out, "until      {end}")?;
    }
    writeln!(out, "created    {}", task.created.format("%Y-%m-%d %H:%M:%SZ"))?;
    writeln!(out, "modified   {}", task.modified.format("%Y-%m-%d %H:%M:%SZ"))?;
    writeln!(out)?;

    Ok(())
}

fn repeat_summary(task: &Task) -> &'static str {
    if task.rule.kind.is_repeating() {
        task.rule.kind.label()
    } else {
        "once"
    }
}

fn write_table<W: Write>(mut writer: W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| UnicodeWidthStr::width(h.as_str())).collect();

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .zip(widths.iter().copied())
        .map(|(header, width)| format!("{header:width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule_line = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>().join(" ");
    writeln!(writer, "{rule_line}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(widths.iter().copied())
            .map(|(cell, width)| {
                let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                format!("{cell}{}", " ".repeat(width.saturating_sub(visible)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            escaped = ch != 'm';
            continue;
        }
        if ch == '\x1b' {
            escaped = true;
            continue;
        }
        out.push(ch);
    }

    out
}
