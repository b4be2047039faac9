//! One-shot ingest command.

use anyhow::Result;
use console::style;
use tokio_util::sync::CancellationToken;

use parley_core::pipeline::{InboundMessage, InteractionOutcome};

use crate::state::AppState;

/// Run one inbound message through the full workflow and report the outcome.
pub async fn ingest(state: &AppState, phone: &str, name: &str, text: &str, json: bool) -> Result<()> {
    let orchestrator = state.orchestrator()?;
    let cancel = CancellationToken::new();
    let outcome = orchestrator
        .handle(InboundMessage::new(phone, name, text), &cancel)
        .await?;

    if json {
        let out = match outcome {
            InteractionOutcome::Ignored => serde_json::json!({ "outcome": "ignored" }),
            InteractionOutcome::Replied {
                created_session,
                interests_added,
                follow_up_sent,
            } => serde_json::json!({
                "outcome": "replied",
                "created_session": created_session,
                "interests_added": interests_added,
                "follow_up_sent": follow_up_sent,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match outcome {
        InteractionOutcome::Ignored => {
            println!(
                "  {} Blank message ignored",
                style("i").blue().bold()
            );
        }
        InteractionOutcome::Replied {
            created_session,
            interests_added,
            follow_up_sent,
        } => {
            println!(
                "  {} Replied to {}{}",
                style("✓").green().bold(),
                style(phone).cyan(),
                if created_session { " (new session)" } else { "" }
            );
            if interests_added > 0 {
                println!("    {interests_added} new interest(s) recorded");
            }
            if follow_up_sent {
                println!("    Follow-up question sent");
            }
        }
    }
    Ok(())
}
