//! Assignment listing and details

use anyhow::{Context, Result};

use mentora_client::MentoraContext;

use crate::style::*;

pub async fn list(ctx: &MentoraContext, json: bool) -> Result<()> {
    let assignments = ctx
        .assignments()?
        .get_all_assignments()
        .await
        .context("Failed to load assignments")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assignments)?);
        return Ok(());
    }

    print_header("Assignments");
    if assignments.is_empty() {
        print_info("No assignments yet");
        return Ok(());
    }

    let mut table = table(&["ID", "Title", "Checkpoints", "Created", "Active"]);
    for a in &assignments {
        table.add_row(vec![
            a.id.to_string(),
            truncate(&a.title, 48),
            a.checkpoints().len().to_string(),
            a.created_at.format("%Y-%m-%d").to_string(),
            if a.is_active { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn show(ctx: &MentoraContext, id: u64, json: bool) -> Result<()> {
    let assignment = ctx
        .assignments()?
        .get_assignment(id)
        .await
        .with_context(|| format!("Failed to load assignment {id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assignment)?);
        return Ok(());
    }

    print_header(&assignment.title);
    print_field("ID", assignment.id);
    print_field("Creator", assignment.creator);
    print_field(
        "Created",
        assignment.created_at.format("%Y-%m-%d %H:%M UTC"),
    );
    print_field("Active", assignment.is_active);
    println!();
    for line in assignment.description.lines() {
        println!("  {line}");
    }

    print_header("Question");
    for line in assignment.question.lines() {
        println!("  {line}");
    }

    let checkpoints = assignment.checkpoints();
    if !checkpoints.is_empty() {
        print_header("Checkpoints");
        for cp in &checkpoints {
            println!("  {}. {}", cp.id, console::style(&cp.title).bold());
            for line in cp.description.lines() {
                println!("     {line}");
            }
        }
    }
    println!();
    Ok(())
}
