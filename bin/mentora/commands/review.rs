//! Assignment drafting, grading and project breakdown

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use mentora_client::{Difficulty, MentoraContext};

use crate::style::*;

fn thinking(msg: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("  {spinner:.magenta} {msg}")?);
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("  {}", console::style(title).bold());
    for item in items {
        println!("    • {item}");
    }
}

pub async fn generate(
    ctx: &MentoraContext,
    topic: &str,
    difficulty: Difficulty,
    solution: Option<&Path>,
    json: bool,
) -> Result<()> {
    let reviewer = ctx.reviewer();

    let spinner = thinking("Drafting assignment...")?;
    let drafted = reviewer.generate_assignment(topic, difficulty).await;
    spinner.finish_and_clear();
    let assignment = drafted.context("Failed to generate assignment")?;

    if json && solution.is_none() {
        println!("{}", serde_json::to_string_pretty(&assignment)?);
        return Ok(());
    }

    print_header(&assignment.title);
    print_field("Difficulty", difficulty);
    print_field("Estimated", &assignment.estimated_time);
    println!();
    for line in assignment.description.lines() {
        println!("  {line}");
    }
    print_list("Requirements", &assignment.requirements);
    print_list("Hints", &assignment.hints);
    println!();

    let Some(path) = solution else {
        return Ok(());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let spinner = thinking("Grading solution...")?;
    let graded = reviewer.check_assignment(&assignment, &text).await;
    spinner.finish_and_clear();
    let evaluation = graded.context("Failed to grade solution")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }

    print_header("Evaluation");
    let score = format!("{:.1}/10", evaluation.score);
    let score = if evaluation.score >= 7.0 {
        console::style(score).green().bold()
    } else if evaluation.score >= 4.0 {
        console::style(score).yellow().bold()
    } else {
        console::style(score).red().bold()
    };
    print_field("Score", score);
    println!();
    for line in evaluation.analysis.lines() {
        println!("  {line}");
    }
    print_list("Strengths", &evaluation.strength_points);
    print_list("Weaknesses", &evaluation.weakness_points);
    print_list("Suggestions", &evaluation.suggestions);
    println!();
    Ok(())
}

pub async fn breakdown(ctx: &MentoraContext, project: &str, json: bool) -> Result<()> {
    let spinner = thinking("Breaking down project...")?;
    let result = ctx.reviewer().break_down_problem(project).await;
    spinner.finish_and_clear();
    let breakdown = result.context("Failed to break down project")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
        return Ok(());
    }

    print_header("Project Steps");
    for (i, step) in breakdown.steps.iter().enumerate() {
        println!();
        println!(
            "  {}. {} {}",
            i + 1,
            console::style(&step.title).bold(),
            console::style(format!("({})", step.estimated_time)).dim()
        );
        for line in step.description.lines() {
            println!("     {line}");
        }
        for req in &step.requirements {
            println!("     - {req}");
        }
        for res in &step.resources {
            println!("     {} {res}", console::style("→").cyan());
        }
    }
    println!();
    Ok(())
}
