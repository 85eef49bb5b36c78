//! Talk to the review agent

use anyhow::{Context, Result};

use mentora_client::{extract_github_url, MentoraContext, MessageKind, Submission};

use crate::style::*;

/// Send one submission and stream the agent's replies. Stops at the first
/// `response` or `error` unless `follow` is set, then only when the agent
/// closes the channel.
///
/// With an assignment id the assignment's meta-prompt is sent with the
/// repository URL filled in.
pub async fn run(
    ctx: &MentoraContext,
    message: &str,
    assignment: Option<u64>,
    follow: bool,
) -> Result<()> {
    let assignment = match assignment {
        Some(id) => Some(
            ctx.assignments()?
                .get_assignment(id)
                .await
                .with_context(|| format!("Failed to load assignment {id}"))?,
        ),
        None => None,
    };

    let mut session = ctx
        .connect_agent()
        .await
        .context("Failed to reach the review agent")?;
    print_info(&format!("Connected to {}", session.url()));

    match &assignment {
        Some(a) => {
            let repo = extract_github_url(message)
                .context("A GitHub repository URL is required to submit a solution")?;
            print_info(&format!("Submitting {repo} for \"{}\"", a.title));
            session.submit_solution(a, repo).await?;
        }
        None => {
            let submission = if extract_github_url(message).is_some() {
                Submission::Repository(message.to_string())
            } else {
                Submission::Text(message.to_string())
            };
            session.send(&submission).await?;
        }
    }

    while let Some(msg) = session.next_message().await? {
        print_agent_message(&msg.kind, msg.heading.as_deref(), &msg.content);
        if !follow && matches!(msg.kind, MessageKind::Response | MessageKind::Error) {
            break;
        }
    }

    session.close().await?;
    Ok(())
}
