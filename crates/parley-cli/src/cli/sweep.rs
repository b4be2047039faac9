//! One-shot sweep command.

use anyhow::Result;
use chrono::Utc;
use console::style;

use crate::state::AppState;

/// Migrate every session idle longer than the configured threshold, once.
pub async fn sweep(state: &AppState, json: bool, quiet: bool) -> Result<()> {
    let sweeper = state.sweeper();
    let rebuild = state.sessions.rebuild_activity_index().await?;
    let report = sweeper.sweep_once(Utc::now()).await;

    if json {
        let out = serde_json::json!({
            "indexed": rebuild.indexed,
            "report": report,
            "counters": state.counters.snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    println!(
        "  {} Sweep complete ({} active session{} indexed)",
        style("✓").green().bold(),
        rebuild.indexed,
        if rebuild.indexed == 1 { "" } else { "s" }
    );
    println!();
    println!("  Candidates:  {}", style(report.scanned).bold());
    println!("  Migrated:    {}", style(report.migrated).green());
    if report.skipped_recent > 0 {
        println!("  Still active: {}", style(report.skipped_recent).dim());
    }
    if report.skipped_busy > 0 {
        println!("  Busy:        {}", style(report.skipped_busy).dim());
    }
    if report.skipped_malformed > 0 {
        println!("  Malformed:   {}", style(report.skipped_malformed).yellow());
    }
    if report.failed > 0 {
        println!("  Failed:      {}", style(report.failed).red());
    }
    println!();
    Ok(())
}
