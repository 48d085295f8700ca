//! Manage the `journals` target table.
//!
//! # Usage
//!
//! ```bash
//! crossref-journals --db ./data/crossref.db seed
//! crossref-journals --db ./data/crossref.db add "Genetics in Medicine"
//! crossref-journals --db ./data/crossref.db disable "Familial Cancer"
//! crossref-journals --db ./data/crossref.db list
//! crossref-journals --db ./data/crossref.db show Heredity
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossref_extract::catalog::{self, JournalRow};
use rusqlite::Connection;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Manage the journals that crossref-extract treats as targets.
#[derive(Parser, Debug)]
#[command(name = "crossref-journals")]
#[command(about = "List, seed and toggle target journals in the SQLite catalog")]
struct Args {
    /// SQLite database holding the journals table
    #[arg(long, default_value = "./data/crossref.db", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print every journal and whether it is enabled
    List {
        /// Print a JSON array instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Print one journal
    Show { name: String },
    /// Insert the built-in genetics journals (enabled), keeping existing rows
    Seed,
    /// Add a journal, or update its flag if it already exists
    Add {
        name: String,
        /// Add it disabled
        #[arg(long, default_value = "false")]
        disabled: bool,
    },
    /// Enable a known journal
    Enable { name: String },
    /// Disable a known journal
    Disable { name: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args = Args::parse();
    let conn = catalog::open_database(&args.db)
        .with_context(|| format!("Failed to open {}", args.db.display()))?;

    let stdout = std::io::stdout();
    execute(&conn, &args.command, &mut stdout.lock())
}

fn execute(conn: &Connection, command: &Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::List { json } => {
            let rows = catalog::list_journals(conn)?;
            if *json {
                serde_json::to_writer_pretty(&mut *out, &rows)?;
                writeln!(out)?;
            } else {
                let version = catalog::schema_version(conn)?;
                write_table(out, &rows, version)?;
            }
        }
        Command::Show { name } => {
            let row = catalog::get_journal(conn, name)?
                .ok_or_else(|| anyhow::anyhow!("unknown journal '{}'", name))?;
            let flag = if row.enabled { "enabled" } else { "disabled" };
            writeln!(out, "{}  {}  {}", row.name, flag, row.added_at)?;
        }
        Command::Seed => {
            let inserted = catalog::seed_builtin(conn)?;
            writeln!(out, "Seeded {} journals", inserted)?;
        }
        Command::Add { name, disabled } => {
            catalog::upsert_journal(conn, name, !disabled)?;
            let state = if *disabled { "disabled" } else { "enabled" };
            writeln!(out, "Added '{}' ({})", name.trim(), state)?;
        }
        Command::Enable { name } => {
            catalog::set_enabled(conn, name, true)?;
            writeln!(out, "Enabled '{}'", name)?;
        }
        Command::Disable { name } => {
            catalog::set_enabled(conn, name, false)?;
            writeln!(out, "Disabled '{}'", name)?;
        }
    }
    Ok(())
}

fn write_table(
    out: &mut impl Write,
    rows: &[JournalRow],
    schema_version: i32,
) -> std::io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "No journals (run `crossref-journals seed`)");
    }

    let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0);
    for row in rows {
        let flag = if row.enabled { "enabled " } else { "disabled" };
        writeln!(
            out,
            "{:<width$}  {}  {}",
            row.name,
            flag,
            row.added_at,
            width = width
        )?;
    }
    let enabled = rows.iter().filter(|row| row.enabled).count();
    writeln!(
        out,
        "\n{} journals, {} enabled (schema v{})",
        rows.len(),
        enabled,
        schema_version
    )
}
