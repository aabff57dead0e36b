//! Workspace management
//!
//! A workspace is a directory with a `.strata/` folder. It owns the stores
//! and the configuration, and wires the engine's validation into every
//! write so nothing reaches the stores unchecked.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, DecisionStore, ProjectStore, StorageError};
use crate::domain::{
    Decision, DecisionId, DecisionSet, LayerLimits, NewDecision, Project, ProjectId,
    StructuralChange, Timeline,
};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not in a strata workspace. Run 'strata init' first.")]
    NotInWorkspace,

    #[error("No project selected. Pass --project or run 'strata project use <id>'.")]
    NoProjectSelected,

    #[error("Decision {decision} belongs to project {owner}, not the selected project {selected}")]
    DecisionOutsideProject {
        decision: DecisionId,
        owner: ProjectId,
        selected: ProjectId,
    },
}

const DEFAULT_CONFIG: &str = r#"# strata configuration

# Project used when --project is not given
# default_project = "p-1234567"

# Maximum number of layers (root decisions) per decision type.
# Types without an entry are unlimited.
[layers.max_per_type]
# focus = 3
# scope = 3
# configuration = 3
"#;

const GITIGNORE: &str = r#"# Lock and temp files from concurrent writes
*.lock
*.tmp
"#;

pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(".strata").is_dir() {
            return Err(WorkspaceError::NotInWorkspace.into());
        }

        let config = Config::for_workspace(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the workspace at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let root = Config::find_workspace_root_from(&cwd).ok_or(WorkspaceError::NotInWorkspace)?;

        Self::open(root)
    }

    /// Initializes a workspace at the given path; existing files are kept
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let strata_dir = root.join(".strata");

        fs::create_dir_all(&strata_dir).with_context(|| {
            format!("Failed to create .strata directory: {}", strata_dir.display())
        })?;

        let config_path = strata_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = strata_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        tracing::debug!(root = %root.display(), "initialized workspace");
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strata_dir(&self) -> PathBuf {
        self.root.join(".strata")
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn decision_store(&self) -> DecisionStore {
        DecisionStore::for_workspace(&self.root)
    }

    pub fn project_store(&self) -> ProjectStore {
        ProjectStore::for_workspace(&self.root)
    }

    /// Configured layer maxima
    pub fn limits(&self) -> &LayerLimits {
        &self.config.workspace.layers.max_per_type
    }

    /// Resolves the explicit project, falling back to the configured default
    pub fn resolve_project(&self, explicit: Option<&ProjectId>) -> Result<Project> {
        let id = explicit
            .or(self.config.workspace.default_project.as_ref())
            .ok_or(WorkspaceError::NoProjectSelected)?;

        self.project_store().get(id)
    }

    /// Creates a project; the first one becomes the default
    pub fn create_project(&mut self, name: &str, description: Option<String>) -> Result<Project> {
        let project = self.project_store().create(name, description)?;

        if self.config.workspace.default_project.is_none() {
            self.use_project(&project.id)?;
        }

        Ok(project)
    }

    /// Makes a project the default for commands without `--project`
    pub fn use_project(&mut self, id: &ProjectId) -> Result<Project> {
        let project = self.project_store().get(id)?;

        self.config.workspace.default_project = Some(project.id.clone());
        self.config.save_workspace()?;

        Ok(project)
    }

    /// Loads a decision of the selected project
    ///
    /// Ids are unique across the workspace, so an id from another project is
    /// refused rather than reported missing.
    pub fn decision_in_project(&self, project_id: &ProjectId, id: &DecisionId) -> Result<Decision> {
        let decision = self
            .decision_store()
            .get(id)?
            .ok_or_else(|| StorageError::DecisionNotFound(id.clone()))?;

        if &decision.project_id != project_id {
            return Err(WorkspaceError::DecisionOutsideProject {
                decision: decision.id,
                owner: decision.project_id,
                selected: project_id.clone(),
            }
            .into());
        }

        Ok(decision)
    }

    /// Decisions of one project
    pub fn snapshot(&self, project_id: &ProjectId) -> Result<DecisionSet> {
        self.decision_store().snapshot(project_id)
    }

    /// Creates a decision after the engine's checks pass
    ///
    /// A root is refused when its type is at the configured maximum; a
    /// derived decision needs an existing parent in the same project. Both
    /// checks run under the store's write lock.
    pub fn create_decision(&self, draft: NewDecision) -> Result<Decision> {
        let limits = self.limits().clone();

        self.decision_store().create_with(draft, |existing, draft| {
            match &draft.parent_id {
                Some(parent) => existing.check_parent(&draft.project_id, parent)?,
                None => {
                    let in_project = existing
                        .iter()
                        .filter(|d| d.project_id == draft.project_id);
                    let count = Timeline::build(in_project).layer_count(draft.decision_type);
                    limits.ensure(draft.decision_type, count)?;
                }
            }
            Ok(())
        })
    }

    /// Clears the parent of a decision. `None` if it already was a root.
    pub fn promote(&self, id: &DecisionId) -> Result<Option<StructuralChange>> {
        self.decision_store().mutate(|set| set.plan_promote(id))
    }

    /// Moves a decision under a new parent. `None` if nothing changed.
    pub fn reparent(&self, id: &DecisionId, parent: &DecisionId) -> Result<Option<StructuralChange>> {
        self.decision_store().mutate(|set| set.plan_reparent(id, parent))
    }

    /// Deletes a decision without children
    pub fn delete(&self, id: &DecisionId) -> Result<StructuralChange> {
        let change = self
            .decision_store()
            .mutate(|set| set.plan_delete(id).map(Some))?;

        change.ok_or_else(|| anyhow::anyhow!("Delete of {} produced no change", id))
    }
}
