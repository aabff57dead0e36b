//! Project CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::{truncate, Output};
use crate::domain::ProjectId;
use crate::storage::Workspace;

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project (the first one becomes the default)
    New {
        /// Project name
        name: String,

        /// Longer description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// List projects
    List,

    /// Make a project the default
    Use {
        /// Project ID
        id: ProjectId,
    },
}

pub fn run(cmd: ProjectCommands, output: &Output) -> Result<()> {
    match cmd {
        ProjectCommands::New { name, description } => new_project(output, &name, description),
        ProjectCommands::List => list_projects(output),
        ProjectCommands::Use { id } => use_project(output, &id),
    }
}

fn new_project(output: &Output, name: &str, description: Option<String>) -> Result<()> {
    let mut workspace = Workspace::open_current()?;
    let project = workspace.create_project(name, description)?;
    let is_default = workspace.config().workspace.default_project.as_ref() == Some(&project.id);

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": project.id.to_string(),
            "name": project.name,
            "default": is_default,
        }));
    } else {
        output.success(&format!("Created project: {} - {}", project.id, project.name));
        if is_default {
            output.hint("Set as default project");
        }
    }

    Ok(())
}

fn list_projects(output: &Output) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let projects = workspace.project_store().list()?;
    let default = workspace.config().workspace.default_project.as_ref();

    output.verbose_ctx("project", &format!("Found {} projects", projects.len()));

    if output.is_json() {
        let items: Vec<_> = projects
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id.to_string(),
                    "name": p.name,
                    "description": p.description,
                    "created_at": p.created_at,
                    "default": Some(&p.id) == default,
                })
            })
            .collect();
        output.data(&items);
    } else if projects.is_empty() {
        println!("No projects. Create one with 'strata project new <name>'.");
    } else {
        println!("  {:<12} {:<18} NAME", "ID", "CREATED");
        println!("{}", "-".repeat(60));

        for project in &projects {
            let marker = if Some(&project.id) == default { "*" } else { " " };
            println!(
                "{} {:<12} {:<18} {}",
                marker,
                project.id,
                project.created_at.format("%Y-%m-%d %H:%M"),
                truncate(&project.name, 40)
            );
        }
    }

    Ok(())
}

fn use_project(output: &Output, id: &ProjectId) -> Result<()> {
    let mut workspace = Workspace::open_current()?;
    let project = workspace.use_project(id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": project.id.to_string(),
            "name": project.name,
            "default": true,
        }));
    } else {
        output.success(&format!("Now using project: {} - {}", project.id, project.name));
    }

    Ok(())
}
