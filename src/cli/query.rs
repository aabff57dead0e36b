//! Query commands (timeline, latest, stats, limits, check)
//!
//! Read-only views over a project's snapshot.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use super::output::{truncate, Output};
use crate::domain::{
    aggregate, all_layers_of, integrity, latest_layer_of, DecisionType, Layer, ProjectId,
};
use crate::storage::Workspace;

const TYPE_HINT: &str = "Pick a decision type: focus, scope or configuration";

fn print_layer(layer: &Layer<'_>) {
    let decision = layer.decision;
    println!(
        "{:>3}  {:<12} {:<9} {:<17} {}",
        layer.number,
        decision.id,
        decision.urgency,
        decision.created_at.format("%Y-%m-%d %H:%M"),
        truncate(&decision.title, 40)
    );
    for child in layer.children {
        println!(
            "       └ {:<12} [{}] {}",
            child.id,
            child.decision_type,
            truncate(&child.title, 40)
        );
    }
}

/// Show the layer thread of one type
pub fn timeline(
    output: &Output,
    project: Option<&ProjectId>,
    decision_type: Option<DecisionType>,
) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let project = workspace.resolve_project(project)?;
    let snapshot = workspace.snapshot(&project.id)?;
    let timeline = snapshot.timeline();

    let layers = all_layers_of(&timeline, decision_type);
    output.verbose_ctx("timeline", &format!("Found {} layers", layers.len()));

    if output.is_json() {
        output.data(&layers);
        return Ok(());
    }

    let Some(decision_type) = decision_type else {
        output.hint(TYPE_HINT);
        return Ok(());
    };

    if layers.is_empty() {
        println!("No {} layers in {}", decision_type, project.name);
        return Ok(());
    }

    println!("{} thread of {} ({} layers):", decision_type, project.name, layers.len());
    println!("{:>3}  {:<12} {:<9} {:<17} TITLE", "#", "ID", "URGENCY", "CREATED");
    println!("{}", "-".repeat(80));
    for layer in &layers {
        print_layer(layer);
    }

    Ok(())
}

/// Show the latest layer of one type, or of each type
pub fn latest(
    output: &Output,
    project: Option<&ProjectId>,
    decision_type: Option<DecisionType>,
) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let project = workspace.resolve_project(project)?;
    let snapshot = workspace.snapshot(&project.id)?;
    let timeline = snapshot.timeline();

    let types: Vec<DecisionType> = match decision_type {
        Some(t) => vec![t],
        None => DecisionType::ALL.to_vec(),
    };
    let latest: BTreeMap<DecisionType, Option<Layer<'_>>> = types
        .iter()
        .map(|t| (*t, latest_layer_of(&timeline, *t)))
        .collect();

    if output.is_json() {
        match decision_type {
            Some(t) => output.data(&latest.get(&t).copied().flatten()),
            None => output.data(&latest),
        }
        return Ok(());
    }

    println!("{:>3}  {:<12} {:<9} {:<17} TITLE", "#", "ID", "URGENCY", "CREATED");
    for (decision_type, layer) in &latest {
        println!("{}", "-".repeat(80));
        println!("{}", decision_type);
        match layer {
            Some(layer) => print_layer(layer),
            None => println!("     (no layers)"),
        }
    }

    Ok(())
}

/// Show decision counts
pub fn stats(
    output: &Output,
    project: Option<&ProjectId>,
    decision_type: Option<DecisionType>,
) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let project = workspace.resolve_project(project)?;
    let snapshot = workspace.snapshot(&project.id)?;

    let stats = aggregate(snapshot.iter(), decision_type);

    if output.is_json() {
        output.data(&stats);
        return Ok(());
    }

    match decision_type {
        Some(t) => println!("{} decisions in {}", t, project.name),
        None => println!("Decisions in {}", project.name),
    }
    println!("{}", "-".repeat(40));
    println!("Total:    {}", stats.total);
    println!("Layers:   {}", stats.roots);
    println!("Derived:  {}", stats.derived);

    println!("\nBy type:");
    for (t, count) in &stats.by_type {
        println!("  {:<14} {}", t, count);
    }

    println!("\nBy urgency:");
    for (urgency, count) in &stats.by_urgency {
        println!("  {:<14} {}", urgency, count);
    }

    Ok(())
}

/// Show configured layer limits against current layer counts
pub fn limits(output: &Output, project: Option<&ProjectId>) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let project = workspace.resolve_project(project)?;
    let snapshot = workspace.snapshot(&project.id)?;
    let timeline = snapshot.timeline();
    let limits = workspace.limits();

    let rows: Vec<_> = DecisionType::ALL
        .iter()
        .map(|t| {
            let layers = timeline.layer_count(*t);
            (*t, layers, limits.max_for(*t), limits.allowance(*t, layers))
        })
        .collect();

    if output.is_json() {
        let items: Vec<_> = rows
            .iter()
            .map(|(t, layers, max, allowance)| {
                serde_json::json!({
                    "type": t,
                    "layers": layers,
                    "max": max,
                    "allowed": allowance.map_or(true, |a| a.allowed),
                    "remaining": allowance.map(|a| a.remaining),
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    println!("{:<14} {:>6} {:>6} {:>9}", "TYPE", "LAYERS", "MAX", "REMAINING");
    println!("{}", "-".repeat(40));
    for (t, layers, max, allowance) in &rows {
        let max = max.map_or_else(|| "-".to_string(), |m| m.to_string());
        let remaining = allowance.map_or_else(|| "unlimited".to_string(), |a| a.remaining.to_string());
        println!("{:<14} {:>6} {:>6} {:>9}", t, layers, max, remaining);
    }

    Ok(())
}

/// Check every stored decision; fails when anything is found
pub fn check(output: &Output) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let decisions = workspace.decision_store().read_all()?;

    let report = integrity::check(decisions.iter());
    output.verbose_ctx(
        "check",
        &format!("Checked {} decisions, {} issues", decisions.len(), report.issue_count()),
    );

    if output.is_json() {
        output.data(&report);
    } else if report.is_clean() {
        println!("No issues found in {} decisions", decisions.len());
    } else {
        for link in &report.dangling {
            println!("dangling parent: {} -> {}", link.decision, link.parent);
        }
        for link in &report.cross_project {
            println!("cross-project parent: {} -> {}", link.decision, link.parent);
        }
        for cycle in &report.cycles {
            let members: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
            println!("parent cycle: {}", members.join(" -> "));
        }
        for (a, b) in &report.timestamp_ties {
            println!("timestamp tie: {} and {}", a, b);
        }
    }

    if !report.is_clean() {
        bail!("{} integrity issue(s) found", report.issue_count());
    }

    Ok(())
}
