//! JSONL storage for projects
//!
//! Projects live in `.strata/projects.jsonl`, one per line.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Duration;

use super::jsonl::{JsonlFile, StorageError};
use crate::domain::{Project, ProjectId};

pub struct ProjectStore {
    file: JsonlFile,
}

impl ProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonlFile::new(path),
        }
    }

    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self::new(workspace_root.join(".strata").join("projects.jsonl"))
    }

    /// All projects, oldest first
    pub fn list(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.file.read_records()?;
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    pub fn get(&self, id: &ProjectId) -> Result<Project> {
        self.list()?
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| StorageError::ProjectNotFound(id.clone()).into())
    }

    pub fn create(&self, name: &str, description: Option<String>) -> Result<Project> {
        let _lock = self.file.lock()?;

        let latest = self
            .file
            .read_records::<Project>()?
            .into_iter()
            .map(|p| p.created_at)
            .max();

        let mut project = match description {
            Some(description) => Project::new(name).with_description(description),
            None => Project::new(name),
        };
        if let Some(latest) = latest.filter(|latest| *latest >= project.created_at) {
            project.created_at = latest + Duration::microseconds(1);
        }
        self.file.append_record(&project)?;

        tracing::debug!(id = %project.id, name, "created project");
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_list_and_get() {
        let dir = TempDir::new().unwrap();
        let store = ProjectStore::new(dir.path().join("projects.jsonl"));

        let harbor = store.create("Harbor survey", None).unwrap();
        let ridge = store
            .create("Ridge line", Some("Second site".to_string()))
            .unwrap();

        let names: Vec<_> = store.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Harbor survey", "Ridge line"]);
        assert_eq!(store.get(&ridge.id).unwrap().description.as_deref(), Some("Second site"));
        assert_eq!(store.get(&harbor.id).unwrap(), harbor);
    }

    #[test]
    fn get_missing_project_fails() {
        let dir = TempDir::new().unwrap();
        let store = ProjectStore::new(dir.path().join("projects.jsonl"));
        let missing: ProjectId = "p-fffffff".parse().unwrap();

        let err = store.get(&missing).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StorageError>(),
            Some(&StorageError::ProjectNotFound(missing))
        );
    }
}
