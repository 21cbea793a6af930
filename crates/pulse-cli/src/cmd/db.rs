use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use clap::Subcommand;
use pulse_core::store::{RecordStore, SqliteStore};

#[derive(Subcommand)]
pub enum DbSubcommand {
    /// Apply pending schema migrations
    Migrate,

    /// Show the current and latest schema versions
    Status,
}

pub fn run(ctx: &Context, subcmd: DbSubcommand) -> anyhow::Result<()> {
    match subcmd {
        DbSubcommand::Migrate => migrate(ctx),
        DbSubcommand::Status => status(ctx),
    }
}

// ---------------------------------------------------------------------------
// migrate
// ---------------------------------------------------------------------------

fn migrate(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let previous = store.schema_version()?;
    let current = store.migrate().context("failed to migrate database")?;

    if ctx.json {
        print_json(&serde_json::json!({
            "database": config.database.path,
            "previous_version": previous,
            "schema_version": current,
        }))?;
    } else if previous == current {
        println!("Schema is up to date (v{current}).");
    } else {
        println!("Migrated {} from v{previous} to v{current}.", config.database.path);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

fn status(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let current = store.schema_version()?;
    let latest = SqliteStore::latest_version();
    let pending = latest.saturating_sub(current);

    if ctx.json {
        print_json(&serde_json::json!({
            "database": config.database.path,
            "schema_version": current,
            "latest_version": latest,
            "pending": pending,
        }))?;
    } else {
        println!("database:  {}", config.database.path);
        println!("schema:    v{current} (latest v{latest})");
        if current > latest {
            println!("status:    database is newer than this binary");
        } else if pending > 0 {
            println!("status:    {pending} migration(s) pending; run `pulse db migrate`");
        } else {
            println!("status:    up to date");
        }
    }
    Ok(())
}
