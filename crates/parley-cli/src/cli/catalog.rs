//! Interest catalog commands: list, reload, import.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use parley_types::catalog::{CatalogEntry, CatalogFile};

use crate::state::AppState;

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List the loaded catalog entries.
    #[command(alias = "ls")]
    List,

    /// Re-read the catalog from the durable database.
    Reload,

    /// Replace the catalog with the entries of a TOML file.
    Import {
        /// TOML file with `[[entries]]` tables of `code` and `description`.
        file: PathBuf,

        /// Replace without confirmation.
        #[arg(long)]
        force: bool,
    },
}

pub async fn dispatch(state: &AppState, action: &CatalogCommand, json: bool) -> Result<()> {
    match action {
        CatalogCommand::List => list(state, json),
        CatalogCommand::Reload => reload(state, json).await,
        CatalogCommand::Import { file, force } => import(state, file, *force, json).await,
    }
}

fn list(state: &AppState, json: bool) -> Result<()> {
    let snapshot = state.catalog.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(snapshot.entries())?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!();
        println!(
            "  {} The interest catalog is empty. Import one with: {}",
            style("i").blue().bold(),
            style("parley catalog import <file.toml>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Code").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);
    for entry in snapshot.entries() {
        table.add_row(vec![
            Cell::new(&entry.code).fg(Color::Cyan),
            Cell::new(&entry.description).fg(Color::White),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} entr{} (loaded {})",
        style(snapshot.len()).bold(),
        if snapshot.len() == 1 { "y" } else { "ies" },
        snapshot.loaded_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    Ok(())
}

async fn reload(state: &AppState, json: bool) -> Result<()> {
    let snapshot = state.catalog.reload(&state.catalog_repo()).await?;
    if json {
        let out = serde_json::json!({
            "generation": snapshot.generation(),
            "entries": snapshot.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "  {} Catalog reloaded: {} entries",
            style("✓").green().bold(),
            style(snapshot.len()).bold()
        );
    }
    Ok(())
}

fn read_catalog_file(path: &Path, content: &str) -> Result<Vec<CatalogEntry>> {
    let file: CatalogFile =
        toml::from_str(content).with_context(|| format!("invalid catalog file {}", path.display()))?;
    let entries: Vec<CatalogEntry> = file
        .entries
        .into_iter()
        .map(|e| CatalogEntry::new(e.code.trim(), e.description.trim()))
        .collect();
    // Interest lines split on the first space, so a code can never contain one.
    if let Some(bad) = entries
        .iter()
        .find(|e| e.code.is_empty() || e.code.contains(char::is_whitespace))
    {
        anyhow::bail!("invalid catalog code {:?} in {}", bad.code, path.display());
    }
    Ok(entries)
}

async fn import(state: &AppState, path: &Path, force: bool, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let entries = read_catalog_file(path, &content)?;

    let current = state.catalog.snapshot();
    if !force && !current.is_empty() {
        if json {
            anyhow::bail!(
                "catalog already has {} entries; pass --force to replace it",
                current.len()
            );
        }
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Replace {} catalog entries with {} from {}?",
                style(current.len()).red().bold(),
                entries.len(),
                path.display()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let snapshot = state.catalog.replace(&state.catalog_repo(), entries).await?;
    if json {
        let out = serde_json::json!({
            "generation": snapshot.generation(),
            "entries": snapshot.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "  {} Imported {} catalog entries",
            style("✓").green().bold(),
            style(snapshot.len()).bold()
        );
    }
    Ok(())
}
