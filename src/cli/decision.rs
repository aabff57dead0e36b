//! Decision CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::output::{truncate, Output};
use crate::domain::{
    Decision, DecisionId, DecisionType, NewDecision, ProjectId, StructuralChange, Urgency,
};
use crate::storage::{DecisionPatch, Workspace};

#[derive(Subcommand)]
pub enum DecisionCommands {
    /// Add a decision (a new layer, or derived with --parent)
    ///
    /// Examples:
    ///   strata decision add focus "Survey the east pier"
    ///   strata decision add scope "Sediment only" --parent d-1234567
    Add {
        /// Decision type (focus, scope, configuration)
        #[arg(value_name = "TYPE")]
        decision_type: DecisionType,

        /// Decision title
        title: String,

        /// Parent decision; without it the decision starts a new layer
        #[arg(long, short)]
        parent: Option<DecisionId>,

        /// Urgency (low, medium, high, critical)
        #[arg(long, short, default_value = "medium")]
        urgency: Urgency,

        /// Longer description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// List decisions of the project in timeline order
    List {
        /// Only list decisions of this type
        #[arg(long = "type", value_name = "TYPE")]
        decision_type: Option<DecisionType>,
    },

    /// Show decision details
    Show {
        /// Decision ID
        id: DecisionId,
    },

    /// Edit decision content
    Edit {
        /// Decision ID
        id: DecisionId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        urgency: Option<Urgency>,
    },

    /// Set a payload field
    Meta {
        /// Decision ID
        id: DecisionId,

        /// Payload key
        key: String,

        /// Payload value (JSON, or a plain string)
        value: String,
    },

    /// Detach a decision from its parent so it becomes a layer
    Promote {
        /// Decision ID
        id: DecisionId,
    },

    /// Move a decision under another parent
    Reparent {
        /// Decision ID
        id: DecisionId,

        /// New parent decision ID
        parent: DecisionId,
    },

    /// Delete a decision that nothing derives from
    Delete {
        /// Decision ID
        id: DecisionId,
    },
}

pub fn run(cmd: DecisionCommands, output: &Output, project: Option<&ProjectId>) -> Result<()> {
    match cmd {
        DecisionCommands::Add {
            decision_type,
            title,
            parent,
            urgency,
            description,
        } => {
            let workspace = Workspace::open_current()?;
            let project = workspace.resolve_project(project)?;

            let mut draft = NewDecision::new(project.id, decision_type, title).with_urgency(urgency);
            if let Some(parent) = parent {
                draft = draft.with_parent(parent);
            }
            if let Some(description) = description {
                draft = draft.with_description(description);
            }

            add_decision(output, &workspace, draft)
        }
        DecisionCommands::List { decision_type } => list_decisions(output, project, decision_type),
        DecisionCommands::Show { id } => show_decision(output, project, &id),
        DecisionCommands::Edit {
            id,
            title,
            description,
            urgency,
        } => {
            let patch = DecisionPatch {
                title,
                description,
                urgency,
                payload: Vec::new(),
            };
            edit_decision(output, project, &id, patch)
        }
        DecisionCommands::Meta { id, key, value } => set_meta(output, project, &id, &key, &value),
        DecisionCommands::Promote { id } => promote(output, project, &id),
        DecisionCommands::Reparent { id, parent } => reparent(output, project, &id, &parent),
        DecisionCommands::Delete { id } => delete(output, project, &id),
    }
}

/// Opens the workspace and loads `id`, refusing decisions of other projects
fn open_scoped(project: Option<&ProjectId>, id: &DecisionId) -> Result<(Workspace, Decision)> {
    let workspace = Workspace::open_current()?;
    let project = workspace.resolve_project(project)?;
    let decision = workspace.decision_in_project(&project.id, id)?;
    Ok((workspace, decision))
}

fn decision_json(decision: &Decision) -> serde_json::Value {
    serde_json::json!({
        "id": decision.id.to_string(),
        "type": decision.decision_type,
        "title": decision.title,
        "urgency": decision.urgency,
        "parent_id": decision.parent_id.as_ref().map(|p| p.to_string()),
        "created_at": decision.created_at,
    })
}

fn add_decision(output: &Output, workspace: &Workspace, draft: NewDecision) -> Result<()> {
    output.verbose_ctx(
        "decision",
        &format!(
            "Adding {} decision to {} (parent: {:?})",
            draft.decision_type, draft.project_id, draft.parent_id
        ),
    );

    let decision = workspace.create_decision(draft)?;

    if output.is_json() {
        output.data(&decision_json(&decision));
    } else if let Some(parent) = &decision.parent_id {
        output.success(&format!(
            "Created {} decision: {} - {} (derived from {})",
            decision.decision_type, decision.id, decision.title, parent
        ));
    } else {
        let layer = workspace
            .snapshot(&decision.project_id)?
            .timeline()
            .layer_number(&decision.id)
            .map(|(_, n)| n);
        output.success(&format!(
            "Created {} layer {}: {} - {}",
            decision.decision_type,
            layer.map_or_else(|| "?".to_string(), |n| n.to_string()),
            decision.id,
            decision.title
        ));
    }

    Ok(())
}

fn list_decisions(
    output: &Output,
    project: Option<&ProjectId>,
    filter: Option<DecisionType>,
) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let project = workspace.resolve_project(project)?;

    let decisions: Vec<Decision> = workspace
        .decision_store()
        .list_decisions(&project.id)?
        .into_iter()
        .filter(|d| filter.map_or(true, |t| d.decision_type == t))
        .collect();

    output.verbose_ctx("decision", &format!("Found {} decisions", decisions.len()));

    if output.is_json() {
        let items: Vec<_> = decisions.iter().map(decision_json).collect();
        output.data(&items);
    } else if decisions.is_empty() {
        match filter {
            Some(t) => println!("No {} decisions in {}", t, project.name),
            None => println!("No decisions in {}", project.name),
        }
    } else {
        println!(
            "{:<12} {:<14} {:<9} {:<12} TITLE",
            "ID", "TYPE", "URGENCY", "PARENT"
        );
        println!("{}", "-".repeat(80));

        for decision in &decisions {
            let parent = decision
                .parent_id
                .as_ref()
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            println!(
                "{:<12} {:<14} {:<9} {:<12} {}",
                decision.id,
                decision.decision_type,
                decision.urgency,
                parent,
                truncate(&decision.title, 40)
            );
        }
    }

    Ok(())
}

fn show_decision(output: &Output, project: Option<&ProjectId>, id: &DecisionId) -> Result<()> {
    let (workspace, decision) = open_scoped(project, id)?;

    let snapshot = workspace.snapshot(&decision.project_id)?;
    let timeline = snapshot.timeline();
    let layer = timeline.layer_number(&decision.id).map(|(_, n)| n);
    let children = timeline.children(&decision.id);

    if output.is_json() {
        output.data(&serde_json::json!({
            "decision": decision,
            "layer": layer,
            "children": children.iter().map(|c| c.id.to_string()).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    println!("Decision: {}", decision.id);
    println!("Title: {}", decision.title);
    println!("Type: {}", decision.decision_type);
    println!("Urgency: {}", decision.urgency);
    println!("Project: {}", decision.project_id);
    match (&decision.parent_id, layer) {
        (Some(parent), _) => println!("Derived from: {}", parent),
        (None, Some(n)) => println!("Layer: {}", n),
        (None, None) => {}
    }
    println!("Created: {}", decision.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", decision.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(desc) = &decision.description {
        println!("\nDescription:");
        println!("{}", desc);
    }

    if !decision.payload.is_empty() {
        println!("\nPayload:");
        let mut fields: Vec<_> = decision.payload.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in fields {
            println!("  {}: {}", key, value);
        }
    }

    if !children.is_empty() {
        println!("\nDerived decisions:");
        for child in children {
            println!("  {} [{}] {}", child.id, child.decision_type, child.title);
        }
    }

    Ok(())
}

fn edit_decision(
    output: &Output,
    project: Option<&ProjectId>,
    id: &DecisionId,
    patch: DecisionPatch,
) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to change. Pass --title, --description or --urgency.");
    }

    let (workspace, _) = open_scoped(project, id)?;
    let decision = workspace.decision_store().patch(id, patch)?;

    if output.is_json() {
        output.data(&decision_json(&decision));
    } else {
        output.success(&format!("Updated decision: {} - {}", decision.id, decision.title));
    }

    Ok(())
}

fn set_meta(
    output: &Output,
    project: Option<&ProjectId>,
    id: &DecisionId,
    key: &str,
    value_str: &str,
) -> Result<()> {
    let (workspace, _) = open_scoped(project, id)?;

    // Plain strings need no quoting
    let value: serde_json::Value = serde_json::from_str(value_str)
        .unwrap_or_else(|_| serde_json::Value::String(value_str.to_string()));

    let patch = DecisionPatch {
        payload: vec![(key.to_string(), value.clone())],
        ..DecisionPatch::default()
    };
    let decision = workspace.decision_store().patch(id, patch)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": decision.id.to_string(),
            "key": key,
            "value": value,
        }));
    } else {
        output.success(&format!("Set {} = {} on {}", key, value, decision.id));
    }

    Ok(())
}

fn report_change(output: &Output, id: &DecisionId, change: Option<StructuralChange>, unchanged: &str) {
    let parent = match &change {
        Some(StructuralChange::SetParent { parent, .. }) => parent.as_ref(),
        _ => None,
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id.to_string(),
            "changed": change.is_some(),
            "parent_id": parent.map(|p| p.to_string()),
        }));
        return;
    }

    match (&change, parent) {
        (None, _) => output.success(unchanged),
        (Some(_), Some(parent)) => output.success(&format!("{} now derives from {}", id, parent)),
        (Some(_), None) => output.success(&format!("Promoted {} to a layer", id)),
    }
}

fn promote(output: &Output, project: Option<&ProjectId>, id: &DecisionId) -> Result<()> {
    let (workspace, _) = open_scoped(project, id)?;
    let change = workspace.promote(id)?;

    report_change(output, id, change, &format!("{} is already a layer", id));
    Ok(())
}

fn reparent(
    output: &Output,
    project: Option<&ProjectId>,
    id: &DecisionId,
    parent: &DecisionId,
) -> Result<()> {
    let (workspace, _) = open_scoped(project, id)?;
    let change = workspace.reparent(id, parent)?;

    report_change(
        output,
        id,
        change,
        &format!("{} already derives from {}", id, parent),
    );
    Ok(())
}

fn delete(output: &Output, project: Option<&ProjectId>, id: &DecisionId) -> Result<()> {
    let (workspace, _) = open_scoped(project, id)?;
    workspace.delete(id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id.to_string(),
            "deleted": true,
        }));
    } else {
        output.success(&format!("Deleted decision: {}", id));
    }

    Ok(())
}
