//! System status dashboard command.

use anyhow::Result;
use console::style;

use parley_core::repository::archive::ArchiveRepository;

use crate::state::AppState;

/// Display active session, catalog and archive counts.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let active = state.sessions.list_ids().await?.len();
    let archived = state.archive_repo().count_threads().await?;
    let catalog = state.catalog.snapshot();

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "ephemeral_backend": state.config.ephemeral.backend,
            "active_sessions": active,
            "archived_threads": archived,
            "catalog_entries": catalog.len(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Parley v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Sessions ──").dim());
    println!("  Active:   {}", style(active).green());
    println!("  Archived: {}", style(archived).dim());
    println!();

    println!("  {}", style("── Catalog ──").dim());
    println!("  Entries:  {}", style(catalog.len()).bold());
    println!();

    println!("  {}", style("── System ──").dim());
    println!(
        "  Data dir:  {}",
        style(state.data_dir.display()).dim()
    );
    println!(
        "  Ephemeral: {}",
        style(format!("{:?}", state.config.ephemeral.backend)).dim()
    );
    println!(
        "  Database:  {}",
        style("SQLite (WAL mode)").dim()
    );
    println!();

    Ok(())
}
