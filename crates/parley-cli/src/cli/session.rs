//! Session inspection commands: list, show.
//!
//! Reads the ephemeral store directly; a show also lists the correspondent's
//! archived threads from the durable database.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use tracing::warn;

use parley_core::repository::archive::ArchiveRepository;
use parley_types::session::{Direction, SessionDocument};

use crate::state::AppState;

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List active sessions.
    #[command(alias = "ls")]
    List,

    /// Show one correspondent's active session and archive history.
    Show {
        /// Correspondent phone number.
        phone: String,
    },
}

pub async fn dispatch(state: &AppState, action: &SessionCommand, json: bool) -> Result<()> {
    match action {
        SessionCommand::List => list_sessions(state, json).await,
        SessionCommand::Show { phone } => show_session(state, phone, json).await,
    }
}

async fn load_sessions(state: &AppState) -> Result<Vec<SessionDocument>> {
    let mut sessions = Vec::new();
    for id in state.sessions.list_ids().await? {
        match state.sessions.get(&id).await {
            Ok(Some(session)) => sessions.push(session),
            Ok(None) => {}
            Err(e) => warn!(correspondent = %id, error = %e, "Skipping unreadable session"),
        }
    }
    sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
    Ok(sessions)
}

fn format_idle(session: &SessionDocument, now: chrono::DateTime<chrono::Utc>) -> String {
    let idle = now - session.last_activity_at;
    let minutes = idle.num_minutes().max(0);
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let sessions = load_sessions(state).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!("  {} No active sessions.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let now = chrono::Utc::now();
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Phone").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Started").fg(Color::White),
        Cell::new("Idle").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
    ]);
    for session in &sessions {
        table.add_row(vec![
            Cell::new(session.correspondent_id()).fg(Color::Cyan),
            Cell::new(&session.user_info.display_name).fg(Color::White),
            Cell::new(session.started_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::White),
            Cell::new(format_idle(session, now)).fg(Color::DarkGrey),
            Cell::new(session.messages.len().to_string()).fg(Color::White),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} active session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

async fn show_session(state: &AppState, phone: &str, json: bool) -> Result<()> {
    let session = state.sessions.get(phone).await?;
    let interests = match &session {
        Some(session) => state
            .sessions
            .get_interests(&session.analysis_thread_id)
            .await?
            .map(|record| record.interests)
            .unwrap_or_default(),
        None => Vec::new(),
    };
    let archived = state.archive_repo().list_threads_for(phone).await?;

    if json {
        let out = serde_json::json!({
            "session": session,
            "interests": interests,
            "archived_threads": archived,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    match &session {
        Some(session) => {
            println!(
                "  {} ({})",
                style(&session.user_info.display_name).cyan().bold(),
                phone
            );
            println!(
                "  Started {}, last activity {}",
                session.started_at.format("%Y-%m-%d %H:%M:%S"),
                session.last_activity_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            for entry in &session.messages {
                let who = match entry.direction {
                    Direction::Incoming => style(entry.sender.as_str()).cyan(),
                    Direction::Outgoing => style(entry.sender.as_str()).green(),
                };
                println!(
                    "  {} {}: {}",
                    style(entry.timestamp.format("%H:%M:%S")).dim(),
                    who,
                    entry.text
                );
            }
            println!();
            if interests.is_empty() {
                println!("  {}", style("No interests recorded yet").dim());
            } else {
                println!("  {}", style("── Interests ──").dim());
                for interest in &interests {
                    println!("  • {interest}");
                }
            }
        }
        None => {
            println!(
                "  {} No active session for {}",
                style("i").blue().bold(),
                style(phone).cyan()
            );
        }
    }

    if !archived.is_empty() {
        println!();
        println!("  {}", style("── Archived threads ──").dim());
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Started").fg(Color::White),
            Cell::new("Ended").fg(Color::White),
            Cell::new("Messages").fg(Color::White),
            Cell::new("Interests").fg(Color::White),
        ]);
        for thread in &archived {
            table.add_row(vec![
                Cell::new(thread.started_at.format("%Y-%m-%d %H:%M").to_string()),
                Cell::new(thread.ended_at.format("%Y-%m-%d %H:%M").to_string()),
                Cell::new(thread.message_count.to_string()),
                Cell::new(thread.interest_count.to_string()),
            ]);
        }
        println!("{table}");
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use parley_types::session::{CorrespondentInfo, TranscriptEntry};

    fn session_idle_for(minutes: i64) -> SessionDocument {
        let now = Utc::now();
        let mut session = SessionDocument::start(
            CorrespondentInfo {
                id: "1".into(),
                display_name: "Ana".into(),
            },
            "conv-1".into(),
            "an-1".into(),
            TranscriptEntry::incoming("hola", "Ana", now),
        );
        session.last_activity_at = now - Duration::minutes(minutes);
        session
    }

    #[test]
    fn format_idle_buckets() {
        let now = Utc::now();
        assert_eq!(format_idle(&session_idle_for(0), now), "just now");
        assert_eq!(format_idle(&session_idle_for(5), now), "5m");
        assert_eq!(format_idle(&session_idle_for(125), now), "2h 5m");
    }
}
