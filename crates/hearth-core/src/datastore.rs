use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::project::Project;
use crate::task::Task;

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub projects_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        let projects_path = data_dir.join("projects.data");
        for path in [&tasks_path, &projects_path] {
            if !path.exists() {
                fs::write(path, "").with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            projects = %projects_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            projects_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    pub fn next_id(&self, tasks: &[Task]) -> u64 {
        tasks.iter().filter_map(|t| t.id).max().unwrap_or(0) + 1
    }

    #[tracing::instrument(skip(self, tasks, task), fields(id = ?task.id, uuid = %task.uuid))]
    pub fn add_task(&self, mut tasks: Vec<Task>, task: Task) -> anyhow::Result<Vec<Task>> {
        tasks.push(task);
        sort_tasks(&mut tasks);
        self.save_tasks(&tasks)?;
        Ok(tasks)
    }

    /// Replaces the stored record with the same uuid.
    #[tracing::instrument(skip(self, task), fields(uuid = %task.uuid))]
    pub fn update_task(&self, task: &Task) -> anyhow::Result<()> {
        let mut tasks = self.load_tasks()?;
        let slot = tasks
            .iter_mut()
            .find(|t| t.uuid == task.uuid)
            .ok_or_else(|| anyhow!("task not found: {}", task.uuid))?;
        *slot = task.clone();
        self.save_tasks(&tasks)
    }

    #[tracing::instrument(skip(self), fields(uuid = %uuid))]
    pub fn delete_task(&self, uuid: Uuid) -> anyhow::Result<Task> {
        let mut tasks = self.load_tasks()?;
        let idx = tasks
            .iter()
            .position(|t| t.uuid == uuid)
            .ok_or_else(|| anyhow!("task not found: {uuid}"))?;
        let removed = tasks.remove(idx);
        self.save_tasks(&tasks)?;
        info!(remaining = tasks.len(), "deleted task");
        Ok(removed)
    }

    #[tracing::instrument(skip(self))]
    pub fn load_projects(&self) -> anyhow::Result<Vec<Project>> {
        load_jsonl(&self.projects_path).context("failed to load projects.data")
    }

    #[tracing::instrument(skip(self, projects))]
    pub fn save_projects(&self, projects: &[Project]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.projects_path, projects).context("failed to save projects.data")
    }

    pub fn next_project_id(&self, projects: &[Project]) -> u64 {
        projects.iter().filter_map(|p| p.id).max().unwrap_or(0) + 1
    }

    #[tracing::instrument(skip(self, projects, project), fields(id = ?project.id, uuid = %project.uuid))]
    pub fn add_project(&self, mut projects: Vec<Project>, project: Project) -> anyhow::Result<Vec<Project>> {
        projects.push(project);
        projects.sort_by_key(|p| p.id.unwrap_or(u64::MAX));
        self.save_projects(&projects)?;
        Ok(projects)
    }
}

fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.id.unwrap_or(u64::MAX));
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
